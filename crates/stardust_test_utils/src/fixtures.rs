//! Test fixtures and helpers.
//!
//! Pre-built planets and galaxies for consistent testing.

use fixed::types::I32F32;

use stardust_core::config::{GameConfig, PlanetConfig};
use stardust_core::galaxy::Galaxy;
use stardust_core::planet::{Planet, PlanetId};

/// Whole seconds as fixed-point time.
#[must_use]
pub fn secs(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Fractional seconds as fixed-point time (for tests only).
#[must_use]
pub fn secs_f(n: f64) -> I32F32 {
    I32F32::from_num(n)
}

/// A default planet that does not produce, so counters stay exact.
#[must_use]
pub fn idle_planet(ships: f64, stardust: f64) -> Planet {
    let mut planet = Planet::new(PlanetId(0), None, &PlanetConfig::default())
        .with_ships(ships)
        .with_stardust(stardust);
    planet.set_producing(false);
    planet
}

/// Two unowned, non-producing planets with the given counters.
#[derive(Debug, Clone)]
pub struct Duel {
    /// The galaxy holding both planets.
    pub galaxy: Galaxy,
    /// Attacking planet.
    pub attacker: PlanetId,
    /// Defending planet.
    pub defender: PlanetId,
}

/// Build a galaxy with an attacker and a defender that do not produce.
///
/// # Panics
///
/// Panics if the planets cannot be registered, which only happens on a
/// broken galaxy.
#[must_use]
pub fn duel(attacker: Planet, defender: Planet) -> Duel {
    let mut galaxy = Galaxy::default();
    let attacker = galaxy
        .insert_planet(attacker)
        .expect("unowned planet registers");
    let defender = galaxy
        .insert_planet(defender)
        .expect("unowned planet registers");
    Duel {
        galaxy,
        attacker,
        defender,
    }
}

/// A galaxy with `players` accounts named `Player1..` and their initial
/// planets, using `config`.
///
/// # Panics
///
/// Panics if the configuration is invalid.
#[must_use]
pub fn populated_galaxy(config: GameConfig, players: usize) -> Galaxy {
    let mut galaxy = Galaxy::new(config).expect("valid config");
    for i in 1..=players {
        galaxy
            .create_account(&format!("Player{i}"))
            .expect("unique player name");
    }
    galaxy
}

/// Drive every planet to attack its neighbour in a ring, then tick.
///
/// Refused launches are ignored so the same script works at any point of a
/// run.
pub fn ring_raid(galaxy: &mut Galaxy, fraction: f64, dt: I32F32) {
    let ids = galaxy.planets().sorted_ids();
    for (i, attacker) in ids.iter().enumerate() {
        let defender = ids[(i + 1) % ids.len()];
        let _ = galaxy.launch_attack(*attacker, defender, fraction);
    }
    let _ = galaxy.tick(dt);
}
