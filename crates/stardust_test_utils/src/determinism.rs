//! Determinism testing utilities.
//!
//! Provides a harness for verifying that a galaxy produces identical results
//! given identical inputs.
//!
//! # Sources of non-determinism
//!
//! - **HashMap iteration order**: the registries hash with random keys, so
//!   everything that touches state iterates sorted ids instead.
//! - **Accumulated time**: phase timers use [`stardust_core::math::Fixed`],
//!   so summing many small steps lands exactly on a duration.
//! - **Wall clocks**: nothing in the core reads one; time only moves
//!   through `tick(dt)`.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use stardust_core::galaxy::Galaxy;
use stardust_core::math::Fixed;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of steps simulated.
    pub steps: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for deterministic simulation).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the runs agreed, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Galaxy is non-deterministic!\n\
                 Runs: {}\n\
                 Steps: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.steps,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a simulation multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run the simulation
/// * `steps` - Number of steps per run
/// * `setup` - Function to create initial state
/// * `step` - Function to advance the state by one step
/// * `hash` - Function to compute a state hash
///
/// # Example
///
/// ```
/// use stardust_test_utils::determinism::verify_determinism;
/// use stardust_test_utils::fixtures::{populated_galaxy, ring_raid, secs};
/// use stardust_core::config::GameConfig;
///
/// let result = verify_determinism(
///     3,
///     50,
///     || populated_galaxy(GameConfig::default(), 3),
///     |galaxy| ring_raid(galaxy, 0.5, secs(7)),
///     |galaxy| galaxy.state_hash(),
/// );
/// result.assert_deterministic();
/// ```
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    steps: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..steps {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        steps,
    }
}

/// Run a galaxy twice with the same setup and tick size and compare hashes.
///
/// # Panics
///
/// Panics if a tick is refused, such as for a negative `dt`.
pub fn verify_galaxy_determinism<F>(setup_fn: F, dt: Fixed, num_ticks: u64) -> bool
where
    F: Fn() -> Galaxy,
{
    verify_determinism(
        2,
        num_ticks,
        &setup_fn,
        |galaxy| {
            galaxy.tick(dt).expect("galaxy tick refused");
        },
        Galaxy::state_hash,
    )
    .is_deterministic
}

/// Run N galaxies on scoped threads and collect their final hashes.
///
/// # Panics
///
/// Panics if a worker thread panics.
pub fn run_parallel_galaxies<F, Step>(
    setup_fn: F,
    step: Step,
    num_galaxies: usize,
    num_steps: u64,
) -> DeterminismResult
where
    F: Fn() -> Galaxy + Sync,
    Step: Fn(&mut Galaxy) + Sync,
{
    let hashes: Vec<u64> = thread::scope(|s| {
        let handles: Vec<_> = (0..num_galaxies)
            .map(|_| {
                s.spawn(|| {
                    let mut galaxy = setup_fn();
                    for _ in 0..num_steps {
                        step(&mut galaxy);
                    }
                    galaxy.state_hash()
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().expect("galaxy thread panicked"))
            .collect()
    });

    DeterminismResult {
        is_deterministic: hashes.windows(2).all(|w| w[0] == w[1]),
        hashes,
        steps: num_steps,
    }
}

/// Compare two galaxy runs step by step, finding the first divergence.
///
/// Returns `None` if the runs agree, `Some(step)` at the first step whose
/// hashes differ (0 means the setups already differ).
pub fn find_first_divergence<F, Step>(setup_fn: F, step: Step, num_steps: u64) -> Option<u64>
where
    F: Fn() -> Galaxy,
    Step: Fn(&mut Galaxy),
{
    let mut first = setup_fn();
    let mut second = setup_fn();

    if first.state_hash() != second.state_hash() {
        return Some(0);
    }

    for n in 1..=num_steps {
        step(&mut first);
        step(&mut second);

        if first.state_hash() != second.state_hash() {
            return Some(n);
        }
    }

    None
}

/// Verify that a bincode snapshot taken mid-run continues identically.
pub fn verify_snapshot_continuation<F, Step>(setup_fn: F, step: Step, before: u64, after: u64) -> bool
where
    F: Fn() -> Galaxy,
    Step: Fn(&mut Galaxy),
{
    let mut galaxy = setup_fn();
    for _ in 0..before {
        step(&mut galaxy);
    }

    let Ok(bytes) = galaxy.serialize() else {
        return false;
    };
    let Ok(mut restored) = Galaxy::deserialize(&bytes) else {
        return false;
    };
    if restored.state_hash() != galaxy.state_hash() {
        return false;
    }

    for _ in 0..after {
        step(&mut galaxy);
        step(&mut restored);
    }
    restored.state_hash() == galaxy.state_hash()
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for simulation inputs.
pub mod strategies {
    use proptest::prelude::*;
    use stardust_core::galaxy::GalaxyCommand;
    use stardust_core::math::Fixed;
    use stardust_core::planet::PlanetId;

    /// Elapsed time between 0 and 10 minutes, in quarter seconds.
    pub fn arb_dt() -> impl Strategy<Value = Fixed> {
        (0i32..2400).prop_map(|quarters| Fixed::from_num(quarters) / 4)
    }

    /// Ship or stardust counter, including fractional production.
    pub fn arb_counter() -> impl Strategy<Value = f64> {
        (0u32..100_000, 0u32..100).prop_map(|(whole, hundredths)| {
            f64::from(whole) + f64::from(hundredths) / 100.0
        })
    }

    /// Whole ship count.
    pub fn arb_ships() -> impl Strategy<Value = u64> {
        0u64..10_000
    }

    /// Effective defense value.
    pub fn arb_defense() -> impl Strategy<Value = u64> {
        0u64..20_000
    }

    /// Launch fraction within `0..=1`.
    pub fn arb_fraction() -> impl Strategy<Value = f64> {
        (0u32..=100).prop_map(|pct| f64::from(pct) / 100.0)
    }

    /// Planet id among the first `max` ids, which may not exist.
    pub fn arb_planet_id(max: u32) -> impl Strategy<Value = PlanetId> {
        (1..=max).prop_map(PlanetId)
    }

    /// Any command a player could issue against planets `1..=planets`.
    pub fn arb_command(planets: u32) -> impl Strategy<Value = GalaxyCommand> {
        prop_oneof![
            3 => (arb_planet_id(planets), arb_planet_id(planets), arb_fraction()).prop_map(
                |(attacker, defender, fraction)| GalaxyCommand::Launch {
                    attacker,
                    defender,
                    fraction,
                }
            ),
            2 => arb_planet_id(planets).prop_map(|planet| GalaxyCommand::Upgrade { planet }),
            1 => (arb_planet_id(planets), any::<bool>())
                .prop_map(|(planet, producing)| GalaxyCommand::SetProducing { planet, producing }),
            4 => arb_dt().prop_map(|seconds| GalaxyCommand::Tick { seconds }),
        ]
    }

    /// A sequence of commands.
    pub fn arb_command_sequence(
        planets: u32,
        max_len: usize,
    ) -> impl Strategy<Value = Vec<GalaxyCommand>> {
        proptest::collection::vec(arb_command(planets), 0..max_len)
    }
}

#[cfg(test)]
mod tests {
    use super::strategies::*;
    use super::*;
    use crate::fixtures::{populated_galaxy, ring_raid, secs};
    use proptest::prelude::*;
    use stardust_core::config::GameConfig;

    fn three_players() -> Galaxy {
        populated_galaxy(GameConfig::default(), 3)
    }

    #[test]
    fn test_verify_determinism_simple() {
        let result = verify_determinism(3, 100, || 0u64, |n| *n += 1, |n| *n);

        assert!(result.is_deterministic);
        assert_eq!(result.hashes, vec![100, 100, 100]);
    }

    #[test]
    fn test_empty_galaxy_determinism() {
        assert!(verify_galaxy_determinism(Galaxy::default, secs(1), 100));
    }

    #[test]
    #[should_panic(expected = "galaxy tick refused")]
    fn test_refused_tick_fails_loudly() {
        verify_galaxy_determinism(three_players, secs(-1), 10);
    }

    #[test]
    fn test_ring_raid_determinism() {
        let result = verify_determinism(
            5,
            200,
            three_players,
            |galaxy| ring_raid(galaxy, 0.6, secs(13)),
            Galaxy::state_hash,
        );
        result.assert_deterministic();
    }

    #[test]
    fn test_parallel_galaxies_agree() {
        let result = run_parallel_galaxies(
            three_players,
            |galaxy| ring_raid(galaxy, 0.4, secs(11)),
            4,
            150,
        );
        result.assert_deterministic();
        assert_eq!(result.hashes.len(), 4);
    }

    #[test]
    fn test_no_divergence() {
        let divergence =
            find_first_divergence(three_players, |g| ring_raid(g, 1.0, secs(29)), 100);
        assert!(divergence.is_none(), "Expected no divergence");
    }

    #[test]
    fn test_snapshot_mid_attack_continues_identically() {
        // 45 s steps leave sessions mid-flight at the snapshot
        assert!(verify_snapshot_continuation(
            three_players,
            |g| ring_raid(g, 0.5, secs(45)),
            3,
            20
        ));
    }

    #[test]
    fn test_compute_hash_stable() {
        assert_eq!(compute_hash(&42u64), compute_hash(&42u64));
        assert_ne!(compute_hash(&1u64), compute_hash(&2u64));
    }

    proptest! {
        #[test]
        fn prop_command_sequences_are_deterministic(
            commands in arb_command_sequence(4, 40),
        ) {
            let run = |commands: &[stardust_core::galaxy::GalaxyCommand]| {
                let mut galaxy = populated_galaxy(GameConfig::default(), 3);
                for command in commands {
                    let _ = galaxy.apply(command.clone());
                }
                galaxy.state_hash()
            };
            prop_assert_eq!(run(&commands), run(&commands));
        }
    }
}
