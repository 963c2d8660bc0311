//! JSON-lines protocol for driving a galaxy over stdin/stdout.
//!
//! Each input line is one [`Request`]; each output line is one [`Response`].
//!
//! ```text
//! {"cmd":"create_account","name":"Alice"}
//! {"cmd":"launch","attacker":1,"defender":2,"fraction":0.5}
//! {"cmd":"tick","seconds":60}
//! {"cmd":"query"}
//! ```

use serde::{Deserialize, Serialize};
use stardust_core::account::AccountId;
use stardust_core::attack::AttackEvent;
use stardust_core::error::GameError;
use stardust_core::galaxy::{CommandOutcome, GalaxyCommand, GalaxyView};
use stardust_core::math::Fixed;
use stardust_core::planet::PlanetId;

/// Protocol version reported in the `ready` line.
pub const PROTOCOL_VERSION: &str = "1.0";

/// Commands accepted on stdin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Request {
    /// Advance simulated time.
    Tick {
        /// Seconds to advance.
        seconds: f64,
    },
    /// Create an account with its initial planet.
    CreateAccount {
        /// Unique account name.
        name: String,
    },
    /// Create a planet.
    CreatePlanet {
        /// Owning account, if any.
        #[serde(default)]
        owner: Option<AccountId>,
    },
    /// Launch a fraction of a planet's ships.
    Launch {
        /// Attacking planet.
        attacker: PlanetId,
        /// Target planet.
        defender: PlanetId,
        /// Fraction of ships, within `0..=1`.
        fraction: f64,
    },
    /// Launch an exact ship count.
    LaunchShips {
        /// Attacking planet.
        attacker: PlanetId,
        /// Target planet.
        defender: PlanetId,
        /// Ships to commit.
        ships: u64,
    },
    /// Upgrade a planet.
    Upgrade {
        /// Planet to upgrade.
        planet: PlanetId,
    },
    /// Buy a planet with moongems.
    BuyPlanet {
        /// Buying account.
        account: AccountId,
    },
    /// Buy the ship bundle.
    BuyShips {
        /// Buying account.
        account: AccountId,
    },
    /// Buy the moongem bundle.
    BuyMoongems {
        /// Buying account.
        account: AccountId,
    },
    /// Pause or resume production.
    SetProducing {
        /// Target planet.
        planet: PlanetId,
        /// New production state.
        producing: bool,
    },
    /// Delete a planet.
    RemovePlanet {
        /// Planet to delete.
        planet: PlanetId,
    },
    /// Delete an account.
    RemoveAccount {
        /// Account to delete.
        account: AccountId,
    },
    /// Request the full galaxy view.
    Query,
    /// Request the state hash.
    Hash,
    /// End the session.
    Quit,
}

/// What a [`Request`] asks the runner to do.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Apply a command to the galaxy.
    Galaxy(GalaxyCommand),
    /// Report the galaxy view.
    Query,
    /// Report the state hash.
    Hash,
    /// Stop reading input.
    Quit,
}

impl Request {
    /// Parse from a JSON line.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Get command name for acknowledgment.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Tick { .. } => "tick",
            Self::CreateAccount { .. } => "create_account",
            Self::CreatePlanet { .. } => "create_planet",
            Self::Launch { .. } => "launch",
            Self::LaunchShips { .. } => "launch_ships",
            Self::Upgrade { .. } => "upgrade",
            Self::BuyPlanet { .. } => "buy_planet",
            Self::BuyShips { .. } => "buy_ships",
            Self::BuyMoongems { .. } => "buy_moongems",
            Self::SetProducing { .. } => "set_producing",
            Self::RemovePlanet { .. } => "remove_planet",
            Self::RemoveAccount { .. } => "remove_account",
            Self::Query => "query",
            Self::Hash => "hash",
            Self::Quit => "quit",
        }
    }

    /// Convert into a runner action.
    ///
    /// # Errors
    /// Returns [`GameError::InvalidAmount`] when `tick` seconds are not a
    /// representable time.
    pub fn into_action(self) -> Result<Action, GameError> {
        let command = match self {
            Self::Tick { seconds } => GalaxyCommand::Tick {
                seconds: Fixed::checked_from_num(seconds)
                    .ok_or(GameError::InvalidAmount(seconds))?,
            },
            Self::CreateAccount { name } => GalaxyCommand::CreateAccount { name },
            Self::CreatePlanet { owner } => GalaxyCommand::CreatePlanet { owner },
            Self::Launch {
                attacker,
                defender,
                fraction,
            } => GalaxyCommand::Launch {
                attacker,
                defender,
                fraction,
            },
            Self::LaunchShips {
                attacker,
                defender,
                ships,
            } => GalaxyCommand::LaunchShips {
                attacker,
                defender,
                ships,
            },
            Self::Upgrade { planet } => GalaxyCommand::Upgrade { planet },
            Self::BuyPlanet { account } => GalaxyCommand::BuyPlanet { account },
            Self::BuyShips { account } => GalaxyCommand::BuyShips { account },
            Self::BuyMoongems { account } => GalaxyCommand::BuyMoongems { account },
            Self::SetProducing { planet, producing } => {
                GalaxyCommand::SetProducing { planet, producing }
            }
            Self::RemovePlanet { planet } => GalaxyCommand::RemovePlanet { planet },
            Self::RemoveAccount { account } => GalaxyCommand::RemoveAccount { account },
            Self::Query => return Ok(Action::Query),
            Self::Hash => return Ok(Action::Hash),
            Self::Quit => return Ok(Action::Quit),
        };
        Ok(Action::Galaxy(command))
    }
}

/// Responses written to stdout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Runner is ready for input.
    Ready {
        /// Protocol version.
        version: String,
        /// Simulated seconds at startup.
        elapsed_seconds: f64,
    },
    /// A command was applied.
    Ack {
        /// Command name.
        cmd: String,
        /// What the command did.
        outcome: CommandOutcome,
    },
    /// Time advanced.
    Events {
        /// Simulated seconds after the tick.
        elapsed_seconds: f64,
        /// Attack transitions during the tick.
        events: Vec<AttackEvent>,
    },
    /// Full galaxy view.
    State {
        /// State hash at the time of the view.
        hash: u64,
        /// The view itself.
        view: GalaxyView,
    },
    /// State hash only.
    Hash {
        /// Simulated seconds.
        elapsed_seconds: f64,
        /// Hash value.
        hash: u64,
    },
    /// A request failed.
    Error {
        /// Error message.
        message: String,
        /// Error classification, absent for malformed input.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        kind: Option<String>,
        /// Command that failed, if parsed.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cmd: Option<String>,
    },
    /// Session ended.
    Bye,
}

impl Response {
    /// Create a ready response.
    #[must_use]
    pub fn ready(elapsed_seconds: f64) -> Self {
        Self::Ready {
            version: PROTOCOL_VERSION.to_string(),
            elapsed_seconds,
        }
    }

    /// Create an acknowledgment.
    #[must_use]
    pub fn ack(cmd: &str, outcome: CommandOutcome) -> Self {
        Self::Ack {
            cmd: cmd.to_string(),
            outcome,
        }
    }

    /// Create an error response for input that did not parse.
    #[must_use]
    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
            kind: None,
            cmd: None,
        }
    }

    /// Create an error response for a refused command.
    #[must_use]
    pub fn game_error(error: &GameError, cmd: &str) -> Self {
        Self::Error {
            message: error.to_string(),
            kind: Some(error.kind().name().to_string()),
            cmd: Some(cmd.to_string()),
        }
    }

    /// Serialize to JSON line (with newline).
    #[must_use]
    pub fn to_json_line(&self) -> String {
        let mut json = serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"type":"error","message":"Serialization failed: {e}"}}"#)
        });
        json.push('\n');
        json
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stardust_core::math::seconds;

    #[test]
    fn test_parse_tick_request() {
        let request = Request::from_json(r#"{"cmd":"tick","seconds":60}"#).unwrap();
        assert_eq!(request, Request::Tick { seconds: 60.0 });
        assert_eq!(
            request.into_action().unwrap(),
            Action::Galaxy(GalaxyCommand::Tick {
                seconds: seconds(60)
            })
        );
    }

    #[test]
    fn test_parse_launch_request() {
        let json = r#"{"cmd":"launch","attacker":1,"defender":2,"fraction":0.5}"#;
        let request = Request::from_json(json).unwrap();
        assert_eq!(request.name(), "launch");
        assert!(matches!(
            request.into_action().unwrap(),
            Action::Galaxy(GalaxyCommand::Launch {
                attacker: PlanetId(1),
                defender: PlanetId(2),
                ..
            })
        ));
    }

    #[test]
    fn test_create_planet_owner_is_optional() {
        let request = Request::from_json(r#"{"cmd":"create_planet"}"#).unwrap();
        assert_eq!(request, Request::CreatePlanet { owner: None });

        let request = Request::from_json(r#"{"cmd":"create_planet","owner":3}"#).unwrap();
        assert_eq!(
            request,
            Request::CreatePlanet {
                owner: Some(AccountId(3))
            }
        );
    }

    #[test]
    fn test_control_requests() {
        for (json, action) in [
            (r#"{"cmd":"query"}"#, Action::Query),
            (r#"{"cmd":"hash"}"#, Action::Hash),
            (r#"{"cmd":"quit"}"#, Action::Quit),
        ] {
            assert_eq!(Request::from_json(json).unwrap().into_action().unwrap(), action);
        }
    }

    #[test]
    fn test_unrepresentable_tick_is_refused() {
        let request = Request::Tick { seconds: 1e12 };
        assert!(matches!(
            request.into_action(),
            Err(GameError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_unknown_command_fails_to_parse() {
        assert!(Request::from_json(r#"{"cmd":"teleport"}"#).is_err());
        assert!(Request::from_json("not json").is_err());
    }

    #[test]
    fn test_response_serialization() {
        let line = Response::ready(0.0).to_json_line();
        assert!(line.ends_with('\n'));
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["type"], "ready");
        assert_eq!(value["version"], PROTOCOL_VERSION);

        let value: serde_json::Value =
            serde_json::from_str(&Response::Bye.to_json_line()).unwrap();
        assert_eq!(value["type"], "bye");
    }

    #[test]
    fn test_error_response_carries_kind() {
        let error = GameError::AttackInProgress(PlanetId(4));
        let value: serde_json::Value =
            serde_json::from_str(&Response::game_error(&error, "launch").to_json_line()).unwrap();
        assert_eq!(value["type"], "error");
        assert_eq!(value["kind"], "precondition_failed");
        assert_eq!(value["cmd"], "launch");

        let value: serde_json::Value =
            serde_json::from_str(&Response::parse_error("bad").to_json_line()).unwrap();
        assert!(value.get("kind").is_none());
    }
}
