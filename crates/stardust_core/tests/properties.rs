//! Property tests for production, upgrades, combat and snapshots.

use proptest::prelude::*;

use stardust_core::combat::{defender_ship_loss, resolve, DefenderState};
use stardust_core::config::{CombatConfig, PlanetConfig};
use stardust_core::math::to_seconds_f64;
use stardust_core::prelude::*;
use stardust_test_utils::determinism::strategies::{
    arb_command_sequence, arb_counter, arb_defense, arb_dt, arb_ships,
};
use stardust_test_utils::fixtures::populated_galaxy;

fn planet(ships: f64, stardust: f64) -> Planet {
    Planet::new(PlanetId(1), None, &PlanetConfig::default())
        .with_ships(ships)
        .with_stardust(stardust)
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
}

proptest! {
    #[test]
    fn prop_accrue_adds_rate_times_dt(
        ships in arb_counter(),
        stardust in arb_counter(),
        dt in arb_dt(),
        producing in any::<bool>(),
    ) {
        let mut p = planet(ships, stardust);
        p.set_producing(producing);
        p.accrue(dt).unwrap();

        let secs = to_seconds_f64(dt);
        if producing {
            prop_assert!(close(p.ships_exact(), ships + p.ship_rate_per_second() * secs));
            prop_assert!(close(p.stardust_exact(), stardust + p.stardust_rate_per_second() * secs));
        } else {
            prop_assert_eq!(p.ships_exact(), ships);
            prop_assert_eq!(p.stardust_exact(), stardust);
        }
    }

    #[test]
    fn prop_failed_upgrade_changes_nothing(stardust in 0.0f64..99.99) {
        let mut p = planet(100.0, stardust);
        let before = p.clone();
        prop_assert!(p.upgrade().is_err());
        prop_assert_eq!(p, before);
    }

    #[test]
    fn prop_upgrade_cost_compounds(n in 1u32..20) {
        let mut p = planet(0.0, 1e12);
        for _ in 0..n {
            p.upgrade().unwrap();
        }
        let expected = 100.0 * 1.5f64.powi(n as i32);
        prop_assert!(close(p.upgrade_cost(), expected));
        prop_assert_eq!(p.level(), n + 1);
    }

    #[test]
    fn prop_victory_iff_attack_exceeds_defense(
        attacking in arb_ships(),
        ships in arb_ships(),
        stardust in arb_ships(),
        defense in arb_defense(),
    ) {
        let defender = DefenderState { ships, stardust, effective_defense: defense };
        let outcome = resolve(attacking, &defender, &CombatConfig::default());

        prop_assert_eq!(outcome.result == AttackResult::Victory, attacking > defense);
        prop_assert_eq!(
            outcome.defender_ships_lost + outcome.defender_ships_remaining,
            ships
        );
        prop_assert!(outcome.looted_stardust <= stardust);
        if outcome.result == AttackResult::Loss {
            prop_assert!(outcome.defender_ships_lost <= attacking);
            prop_assert_eq!(outcome.surviving_ships, 0);
        }
    }

    #[test]
    fn prop_defender_loss_never_exceeds_fleet(
        ships in arb_ships(),
        defense in arb_defense(),
        attacking in arb_ships(),
    ) {
        let lost = defender_ship_loss(ships, defense, attacking);
        prop_assert!(lost <= ships);
        prop_assert!(lost <= attacking);
    }

    #[test]
    fn prop_planet_snapshot_reproduces_behaviour(
        ships in arb_counter(),
        stardust in arb_counter(),
        upgrades in 0u32..5,
        dt in arb_dt(),
    ) {
        let mut original = planet(ships, stardust + 10_000.0);
        for _ in 0..upgrades {
            original.upgrade().unwrap();
        }

        let bytes = bincode::serialize(&original).unwrap();
        let mut restored: Planet = bincode::deserialize(&bytes).unwrap();
        prop_assert_eq!(&restored, &original);

        prop_assert_eq!(restored.accrue(dt).unwrap(), original.accrue(dt).unwrap());
        prop_assert_eq!(restored.upgrade().ok(), original.upgrade().ok());
        prop_assert_eq!(restored, original);
    }

    #[test]
    fn prop_counters_never_negative(commands in arb_command_sequence(4, 60)) {
        let mut galaxy = populated_galaxy(GameConfig::default(), 3);
        for command in commands {
            let _ = galaxy.apply(command);
            for id in galaxy.planets().sorted_ids() {
                let p = galaxy.planet(id).unwrap();
                prop_assert!(p.ships_exact() >= 0.0);
                prop_assert!(p.stardust_exact() >= 0.0);
            }
        }
        prop_assert!(galaxy.check_invariants().is_ok());
    }
}
