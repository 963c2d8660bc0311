//! Error types for the galaxy simulation.
//!
//! Every failure in the core is recoverable by the caller. Variants are
//! grouped into a small taxonomy via [`GameError::kind`] so presentation
//! layers can react without matching every case.

use thiserror::Error;

use crate::account::AccountId;
use crate::planet::PlanetId;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Coarse classification of a [`GameError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The caller passed a value that can never be valid.
    InvalidArgument,
    /// The request is well-formed but the current state does not allow it.
    PreconditionFailed,
    /// A lookup by id or name missed.
    NotFound,
    /// Serialization, IO or data loading failed.
    Internal,
}

impl ErrorKind {
    /// Stable snake_case name for wire formats.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::InvalidArgument => "invalid_argument",
            Self::PreconditionFailed => "precondition_failed",
            Self::NotFound => "not_found",
            Self::Internal => "internal",
        }
    }
}

/// Top-level error type for all simulation errors.
#[derive(Debug, Error)]
pub enum GameError {
    /// Planet identifier is not registered.
    #[error("Planet not found: {0}")]
    PlanetNotFound(PlanetId),

    /// Account identifier is not registered.
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    /// No account carries this name.
    #[error("Account not found for name '{0}'")]
    AccountNameNotFound(String),

    /// An account with this name already exists.
    #[error("Account '{0}' already exists")]
    DuplicateAccount(String),

    /// Planet index outside the owned planet list.
    #[error("Planet index {index} out of range (account owns {count})")]
    PlanetIndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of owned planets.
        count: usize,
    },

    /// An attack was requested with no ships.
    #[error("Attack requires at least one ship")]
    NoShipsCommitted,

    /// Fraction of ships outside `0..=1` or not finite.
    #[error("Ship fraction must be within 0..=1, got {0}")]
    InvalidShipFraction(f64),

    /// Negative, NaN or infinite quantity.
    #[error("Invalid amount: {0}")]
    InvalidAmount(f64),

    /// Negative elapsed time.
    #[error("Elapsed time must not be negative")]
    NegativeElapsed,

    /// A planet cannot attack itself.
    #[error("Planet {0} cannot attack itself")]
    SelfAttack(PlanetId),

    /// Not enough ships on the attacking planet.
    #[error("Insufficient ships: need {required}, have {available}")]
    InsufficientShips {
        /// Ships requested.
        required: u64,
        /// Ships available on the planet.
        available: u64,
    },

    /// Insufficient currency for an upgrade or purchase.
    #[error("Insufficient {resource}: need {required:.2}, have {available:.2}")]
    InsufficientResources {
        /// Resource name.
        resource: &'static str,
        /// Amount required.
        required: f64,
        /// Amount available.
        available: f64,
    },

    /// The planet already has an attack in flight or cooling down.
    #[error("Planet {0} is busy with an attack")]
    AttackInProgress(PlanetId),

    /// The planet takes part in an unresolved attack.
    #[error("Planet {0} is engaged in an active attack")]
    PlanetEngaged(PlanetId),

    /// Configuration value outside its valid range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Data file parsing error.
    #[error("Failed to parse data '{path}': {message}")]
    DataParseError {
        /// Path (or label) of the data that failed to parse.
        path: String,
        /// Error message.
        message: String,
    },

    /// Invalid game state.
    #[error("Invalid game state: {0}")]
    InvalidState(String),
}

impl GameError {
    /// Classify this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::PlanetIndexOutOfRange { .. }
            | Self::NoShipsCommitted
            | Self::InvalidShipFraction(_)
            | Self::InvalidAmount(_)
            | Self::NegativeElapsed
            | Self::SelfAttack(_)
            | Self::InvalidConfig(_) => ErrorKind::InvalidArgument,
            Self::DuplicateAccount(_)
            | Self::InsufficientShips { .. }
            | Self::InsufficientResources { .. }
            | Self::AttackInProgress(_)
            | Self::PlanetEngaged(_) => ErrorKind::PreconditionFailed,
            Self::PlanetNotFound(_) | Self::AccountNotFound(_) | Self::AccountNameNotFound(_) => {
                ErrorKind::NotFound
            }
            Self::DataParseError { .. } | Self::InvalidState(_) => ErrorKind::Internal,
        }
    }
}

/// Reject negative, NaN and infinite quantities.
pub(crate) fn ensure_amount(amount: f64) -> Result<f64> {
    if amount.is_finite() && amount >= 0.0 {
        Ok(amount)
    } else {
        Err(GameError::InvalidAmount(amount))
    }
}
