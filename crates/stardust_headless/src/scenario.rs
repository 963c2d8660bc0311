//! Scripted scenarios.
//!
//! A scenario names the accounts to create, an optional tuning override,
//! a list of galaxy commands to apply in order and expectations to check
//! against the final state. Scenarios are written in RON:
//!
//! ```ron
//! Scenario(
//!     name: "Raid",
//!     accounts: ["Alice", "Bob"],
//!     steps: [
//!         launch(attacker: PlanetId(1), defender: PlanetId(2), fraction: 1.0),
//!         tick(seconds: 90.0),
//!     ],
//!     expectations: [
//!         attack_phase(attacker: PlanetId(1), phase: Idle),
//!     ],
//! )
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use stardust_core::account::{AccountId, Currency};
use stardust_core::attack::{AttackEvent, AttackPhase};
use stardust_core::config::GameConfig;
use stardust_core::error::GameError;
use stardust_core::galaxy::{CommandOutcome, Galaxy, GalaxyCommand, GalaxyView};
use stardust_core::planet::PlanetId;
use stardust_core::replay::Replay;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read or write a file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// Setup failed inside the simulation.
    #[error("Scenario setup failed: {0}")]
    Game(#[from] GameError),
    /// Failed to write a JSON report.
    #[error("Failed to serialize report: {0}")]
    Report(#[from] serde_json::Error),
}

/// A check against the final galaxy state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expectation {
    /// Whole ships on a planet.
    PlanetShips {
        /// Planet to inspect.
        planet: PlanetId,
        /// Expected count.
        ships: u64,
    },
    /// Whole stardust on a planet.
    PlanetStardust {
        /// Planet to inspect.
        planet: PlanetId,
        /// Expected count.
        stardust: u64,
    },
    /// Planet level.
    PlanetLevel {
        /// Planet to inspect.
        planet: PlanetId,
        /// Expected level.
        level: u32,
    },
    /// Fragments collected by a planet.
    PlanetFragments {
        /// Planet to inspect.
        planet: PlanetId,
        /// Expected count.
        fragments: u64,
    },
    /// Attack phase of a planet.
    AttackPhase {
        /// Attacking planet.
        attacker: PlanetId,
        /// Expected phase.
        phase: AttackPhase,
    },
    /// Account currency balance.
    AccountBalance {
        /// Account to inspect.
        account: AccountId,
        /// Currency.
        currency: Currency,
        /// Expected balance.
        amount: f64,
    },
    /// Number of planets an account owns.
    PlanetCount {
        /// Account to inspect.
        account: AccountId,
        /// Expected count.
        count: usize,
    },
    /// Number of steps the galaxy refused.
    RefusedSteps(usize),
}

impl Expectation {
    /// Compare against `galaxy`, returning the observed value on mismatch.
    fn check(&self, galaxy: &Galaxy, refused: usize) -> Result<(), String> {
        let observed = match self {
            Self::PlanetShips { planet, ships } => {
                planet_value(galaxy, *planet, |p| p.ships()).map(|v| (v == *ships, v.to_string()))
            }
            Self::PlanetStardust { planet, stardust } => {
                planet_value(galaxy, *planet, |p| p.stardust())
                    .map(|v| (v == *stardust, v.to_string()))
            }
            Self::PlanetLevel { planet, level } => {
                planet_value(galaxy, *planet, |p| p.level()).map(|v| (v == *level, v.to_string()))
            }
            Self::PlanetFragments { planet, fragments } => {
                planet_value(galaxy, *planet, |p| p.fragments())
                    .map(|v| (v == *fragments, v.to_string()))
            }
            Self::AttackPhase { attacker, phase } => {
                let actual = galaxy.attack_phase(*attacker);
                Ok((actual == *phase, format!("{actual:?}")))
            }
            Self::AccountBalance {
                account,
                currency,
                amount,
            } => galaxy
                .account(*account)
                .map(|a| a.balance(*currency))
                .map(|v| ((v - amount).abs() < 1e-6, v.to_string()))
                .ok_or_else(|| format!("account {account} missing")),
            Self::PlanetCount { account, count } => galaxy
                .account(*account)
                .map(|a| (a.planet_count() == *count, a.planet_count().to_string()))
                .ok_or_else(|| format!("account {account} missing")),
            Self::RefusedSteps(count) => Ok((refused == *count, refused.to_string())),
        };

        match observed {
            Ok((true, _)) => Ok(()),
            Ok((false, actual)) => Err(actual),
            Err(missing) => Err(missing),
        }
    }
}

fn planet_value<T>(
    galaxy: &Galaxy,
    planet: PlanetId,
    read: impl Fn(&stardust_core::planet::Planet) -> T,
) -> Result<T, String> {
    galaxy
        .planet(planet)
        .map(read)
        .ok_or_else(|| format!("planet {planet} missing"))
}

/// A complete scenario definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Tuning override; defaults apply when absent.
    #[serde(default)]
    pub config: Option<GameConfig>,
    /// Account names, created in order before the first step.
    #[serde(default)]
    pub accounts: Vec<String>,
    /// Commands applied in order.
    #[serde(default)]
    pub steps: Vec<GalaxyCommand>,
    /// Checks against the final state.
    #[serde(default)]
    pub expectations: Vec<Expectation>,
}

impl Scenario {
    /// Load a scenario from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        let scenario: Scenario = ron::from_str(&contents)?;
        Ok(scenario)
    }

    /// Load from a RON string (useful for embedded scenarios).
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = ron::from_str(ron)?;
        Ok(scenario)
    }

    /// A two-player raid that runs through a full attack cycle.
    #[must_use]
    pub fn raid_1v1() -> Self {
        Self {
            name: "Raid 1v1".to_string(),
            description: "Alice raids Bob with every ship and waits out the cooldown".to_string(),
            config: None,
            accounts: vec!["Alice".to_string(), "Bob".to_string()],
            steps: vec![
                GalaxyCommand::Tick {
                    seconds: stardust_core::math::seconds(3600),
                },
                GalaxyCommand::Upgrade {
                    planet: PlanetId(1),
                },
                GalaxyCommand::Launch {
                    attacker: PlanetId(1),
                    defender: PlanetId(2),
                    fraction: 1.0,
                },
                GalaxyCommand::Tick {
                    seconds: stardust_core::math::seconds(90),
                },
            ],
            expectations: vec![Expectation::AttackPhase {
                attacker: PlanetId(1),
                phase: AttackPhase::Idle,
            }],
        }
    }

    /// Build the starting galaxy: configuration plus accounts.
    pub fn build_galaxy(&self) -> Result<Galaxy, ScenarioError> {
        let mut galaxy = Galaxy::new(self.config.clone().unwrap_or_default())?;
        for name in &self.accounts {
            galaxy.create_account(name)?;
        }
        Ok(galaxy)
    }

    /// Run every step, check expectations and record a replay.
    pub fn run(&self) -> Result<ScenarioRun, ScenarioError> {
        let mut galaxy = self.build_galaxy()?;
        let mut replay = Replay::new(self.name.clone(), &galaxy)?;
        let mut steps = Vec::with_capacity(self.steps.len());
        let mut events = Vec::new();

        info!(scenario = %self.name, steps = self.steps.len(), "Running scenario");

        for (index, command) in self.steps.iter().enumerate() {
            match replay.apply_and_record(&mut galaxy, command.clone()) {
                Ok(outcome) => {
                    if let CommandOutcome::Ticked(tick) = &outcome {
                        events.extend(tick.attack_events.iter().copied());
                    }
                    steps.push(StepResult {
                        index,
                        outcome: Some(outcome),
                        error: None,
                    });
                }
                Err(e) => {
                    debug!(index, error = %e, "Scenario step refused");
                    steps.push(StepResult {
                        index,
                        outcome: None,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        let refused = steps.iter().filter(|s| s.error.is_some()).count();
        let expectations: Vec<ExpectationResult> = self
            .expectations
            .iter()
            .map(|expectation| {
                let result = expectation.check(&galaxy, refused);
                if let Err(actual) = &result {
                    warn!(?expectation, actual = %actual, "Expectation failed");
                }
                ExpectationResult {
                    expectation: expectation.clone(),
                    passed: result.is_ok(),
                    actual: result.err(),
                }
            })
            .collect();

        let final_hash = galaxy.state_hash();
        replay.finalize(final_hash);

        let report = ScenarioReport {
            scenario: self.name.clone(),
            passed: expectations.iter().all(|e| e.passed),
            refused,
            steps,
            events,
            expectations,
            final_hash,
            final_state: galaxy.view(),
        };
        info!(
            scenario = %self.name,
            passed = report.passed,
            refused,
            final_hash,
            "Scenario finished"
        );

        Ok(ScenarioRun { report, replay })
    }

    /// Run the scenario and return only the final state hash.
    pub fn final_hash(&self) -> Result<u64, ScenarioError> {
        let mut galaxy = self.build_galaxy()?;
        for command in &self.steps {
            let _ = galaxy.apply(command.clone());
        }
        Ok(galaxy.state_hash())
    }
}

/// Outcome of one scenario step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    /// Position in the step list.
    pub index: usize,
    /// What the step did, if accepted.
    pub outcome: Option<CommandOutcome>,
    /// Why the step was refused.
    pub error: Option<String>,
}

/// Result of one expectation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpectationResult {
    /// The check.
    pub expectation: Expectation,
    /// Whether it held.
    pub passed: bool,
    /// Observed value when it did not.
    pub actual: Option<String>,
}

/// JSON report of a scenario run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioReport {
    /// Scenario name.
    pub scenario: String,
    /// Whether every expectation held.
    pub passed: bool,
    /// Number of refused steps.
    pub refused: usize,
    /// Per-step results.
    pub steps: Vec<StepResult>,
    /// Every attack event, in order.
    pub events: Vec<AttackEvent>,
    /// Expectation results.
    pub expectations: Vec<ExpectationResult>,
    /// Final state hash.
    pub final_hash: u64,
    /// Final galaxy view.
    pub final_state: GalaxyView,
}

impl ScenarioReport {
    /// Pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, ScenarioError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Save the report as JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ScenarioError> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

/// A finished scenario run.
#[derive(Debug, Clone)]
pub struct ScenarioRun {
    /// What happened.
    pub report: ScenarioReport,
    /// Replay reproducing the run.
    pub replay: Replay,
}

#[cfg(test)]
mod tests {
    use super::*;
    use stardust_core::math::seconds;

    const RAID_RON: &str = r#"
        Scenario(
            name: "Raid",
            config: Some(GameConfig(
                planet: PlanetConfig(starting_ships: 400.0),
            )),
            accounts: ["Alice", "Bob"],
            steps: [
                set_producing(planet: PlanetId(1), producing: false),
                set_producing(planet: PlanetId(2), producing: false),
                launch(attacker: PlanetId(1), defender: PlanetId(2), fraction: 1.0),
                launch(attacker: PlanetId(1), defender: PlanetId(2), fraction: 0.5),
                tick(seconds: 60.0),
                tick(seconds: 30.0),
            ],
            expectations: [
                planet_ships(planet: PlanetId(1), ships: 100),
                planet_stardust(planet: PlanetId(1), stardust: 160),
                planet_stardust(planet: PlanetId(2), stardust: 40),
                planet_fragments(planet: PlanetId(2), fragments: 240),
                attack_phase(attacker: PlanetId(1), phase: Idle),
                account_balance(account: AccountId(1), currency: stardust, amount: 1000.0),
                planet_count(account: AccountId(2), count: 1),
                refused_steps(1),
            ],
        )
    "#;

    #[test]
    fn test_parse_from_ron() {
        let scenario = Scenario::from_ron_str(RAID_RON).unwrap();
        assert_eq!(scenario.name, "Raid");
        assert_eq!(scenario.accounts.len(), 2);
        assert_eq!(scenario.steps.len(), 6);
        assert_eq!(
            scenario.steps[4],
            GalaxyCommand::Tick {
                seconds: seconds(60)
            }
        );
        let config = scenario.config.unwrap();
        assert_eq!(config.planet.starting_ships, 400.0);
        // Unspecified values keep their defaults
        assert_eq!(config.planet.starting_stardust, 100.0);
    }

    #[test]
    fn test_minimal_scenario_uses_defaults() {
        let scenario = Scenario::from_ron_str(r#"Scenario(name: "Empty")"#).unwrap();
        assert!(scenario.config.is_none());
        assert!(scenario.steps.is_empty());

        let run = scenario.run().unwrap();
        assert!(run.report.passed);
        assert_eq!(run.report.final_state.planets.len(), 0);
    }

    #[test]
    fn test_raid_scenario_expectations_hold() {
        let scenario = Scenario::from_ron_str(RAID_RON).unwrap();
        let run = scenario.run().unwrap();

        for result in &run.report.expectations {
            assert!(result.passed, "{:?} observed {:?}", result.expectation, result.actual);
        }
        assert!(run.report.passed);
        assert_eq!(run.report.refused, 1);
        assert!(run.report.steps[3].error.is_some());
        assert!(matches!(
            run.report.events.as_slice(),
            [
                AttackEvent::Resolved { .. },
                AttackEvent::CooldownEnded {
                    loot_credited: 60,
                    ..
                }
            ]
        ));
    }

    #[test]
    fn test_failed_expectation_reports_actual() {
        let mut scenario = Scenario::from_ron_str(RAID_RON).unwrap();
        scenario.expectations = vec![Expectation::PlanetLevel {
            planet: PlanetId(1),
            level: 5,
        }];

        let report = scenario.run().unwrap().report;
        assert!(!report.passed);
        assert_eq!(report.expectations[0].actual.as_deref(), Some("1"));
    }

    #[test]
    fn test_duplicate_account_fails_setup() {
        let scenario = Scenario {
            accounts: vec!["Alice".to_string(), "Alice".to_string()],
            ..Scenario::raid_1v1()
        };
        assert!(matches!(
            scenario.run(),
            Err(ScenarioError::Game(GameError::DuplicateAccount(_)))
        ));
    }

    #[test]
    fn test_run_replay_matches_report() {
        let run = Scenario::raid_1v1().run().unwrap();
        assert_eq!(run.replay.final_hash, run.report.final_hash);
        assert_eq!(run.replay.command_count(), 4);
        assert_eq!(Scenario::raid_1v1().final_hash().unwrap(), run.report.final_hash);

        let mut player = stardust_core::replay::ReplayPlayer::new(run.replay).unwrap();
        assert!(player.verify().unwrap());
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            Scenario::load("/definitely/not/here.ron"),
            Err(ScenarioError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_report_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");

        let report = Scenario::raid_1v1().run().unwrap().report;
        report.save(&path).unwrap();

        let loaded: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded["scenario"], "Raid 1v1");
        assert_eq!(loaded["passed"], true);
    }
}
