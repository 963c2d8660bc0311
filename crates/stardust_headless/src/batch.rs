//! Parallel determinism checks.
//!
//! Runs the same scenario on rayon worker threads, one galaxy per run, and
//! compares the final state hashes.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::scenario::{Scenario, ScenarioError};

/// Result of a parallel determinism check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeterminismReport {
    /// Scenario name.
    pub scenario: String,
    /// Final hash of every run, in run order.
    pub hashes: Vec<u64>,
    /// Whether every run agreed.
    pub is_deterministic: bool,
}

impl DeterminismReport {
    /// Number of distinct hashes observed.
    #[must_use]
    pub fn unique_hashes(&self) -> usize {
        let mut unique = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique.len()
    }
}

/// Run `scenario` `runs` times in parallel and compare final hashes.
///
/// # Errors
/// Returns the first setup error any run hit.
pub fn verify_determinism(
    scenario: &Scenario,
    runs: usize,
) -> Result<DeterminismReport, ScenarioError> {
    info!(scenario = %scenario.name, runs, "Verifying determinism");

    let hashes = (0..runs)
        .into_par_iter()
        .map(|run| {
            let hash = scenario.final_hash()?;
            debug!(run, hash, "Run finished");
            Ok(hash)
        })
        .collect::<Result<Vec<u64>, ScenarioError>>()?;

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);
    Ok(DeterminismReport {
        scenario: scenario.name.clone(),
        hashes,
        is_deterministic,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_determinism() {
        let report = verify_determinism(&Scenario::raid_1v1(), 8).unwrap();
        assert!(report.is_deterministic);
        assert_eq!(report.hashes.len(), 8);
        assert_eq!(report.unique_hashes(), 1);
    }

    #[test]
    fn test_setup_error_propagates() {
        let scenario = Scenario {
            accounts: vec!["Bob".to_string(), "Bob".to_string()],
            ..Scenario::raid_1v1()
        };
        assert!(verify_determinism(&scenario, 3).is_err());
    }

    #[test]
    fn test_zero_runs() {
        let report = verify_determinism(&Scenario::raid_1v1(), 0).unwrap();
        assert!(report.is_deterministic);
        assert_eq!(report.unique_hashes(), 0);
    }
}
