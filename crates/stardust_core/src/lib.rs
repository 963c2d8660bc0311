//! # Stardust Core
//!
//! Deterministic simulation core for a persistent-economy strategy game.
//!
//! Players own planets that produce ships and stardust over time, upgrade
//! them at a growing price, and attack each other's planets through timed
//! attack sessions.
//!
//! This crate contains **only** simulation logic:
//! - No rendering
//! - No wall clock (time only moves through explicit `tick(dt)` calls)
//! - No globals (registries are owned values)
//! - No system randomness
//!
//! This separation enables:
//! - Headless drivers and scripted scenarios
//! - Replay systems
//! - Determinism testing
//!
//! ## Crate Structure
//!
//! - [`planet`] - Production and upgrade model
//! - [`combat`] - Pure combat resolution
//! - [`attack`] - Timed attack state machine
//! - [`account`] - Player accounts and planet purchases
//! - [`registry`] - Id-keyed planet and account storage
//! - [`shop`] - Stardust-priced bundles
//! - [`galaxy`] - Facade owning all state and driving ticks
//! - [`replay`] - Command recording and playback
//! - [`config`] - Tuning values loadable from RON
//! - [`math`] - Fixed-point time and rounding helpers

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod account;
pub mod attack;
pub mod combat;
pub mod config;
pub mod error;
pub mod galaxy;
pub mod math;
pub mod planet;
pub mod registry;
pub mod replay;
pub mod shop;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::account::{Account, AccountId, AccountView, Currency};
    pub use crate::attack::{AttackEvent, AttackPhase, AttackSession, LaunchReport};
    pub use crate::combat::{AttackResult, CombatOutcome, DefenderState};
    pub use crate::config::GameConfig;
    pub use crate::error::{ErrorKind, GameError, Result};
    pub use crate::galaxy::{CommandOutcome, Galaxy, GalaxyCommand, TickEvents};
    pub use crate::math::{seconds, Fixed};
    pub use crate::planet::{Planet, PlanetId, PlanetView, UpgradeReport};
    pub use crate::registry::{AccountRegistry, PlanetRegistry};
    pub use crate::replay::{Replay, ReplayPlayer};
    pub use crate::shop::{Purchase, Shop};
}
