//! Fleet-versus-planet combat resolution.
//!
//! Combat is a pure function of the committed fleet and the defender's state
//! at the moment the attack lands:
//! - Surviving ships are whatever exceeds the defender's effective defense
//! - Any survivor means victory: the defender's fleet is wiped and part of its
//!   stardust is looted
//! - A loss destroys the whole fleet but still costs the defender ships in
//!   proportion to the attack's strength
//! - Destroyed ships turn into fragments for the side that lost them
//!
//! The defender is read at resolution time, not at launch. A defender that
//! upgrades or produces ships while an attack is in flight can flip the
//! outcome.

use serde::{Deserialize, Serialize};

use crate::config::CombatConfig;
use crate::math::round_half_up;
use crate::planet::Planet;

/// Outcome tag of a resolved attack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttackResult {
    /// At least one attacking ship survived.
    Victory,
    /// The whole attacking fleet was destroyed.
    Loss,
}

/// Defender values the resolver reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefenderState {
    /// Whole ships docked at the defender.
    pub ships: u64,
    /// Whole stardust held by the defender.
    pub stardust: u64,
    /// Base defense plus ship bonus.
    pub effective_defense: u64,
}

impl DefenderState {
    /// Read the current state of a planet.
    #[must_use]
    pub fn of(planet: &Planet) -> Self {
        Self {
            ships: planet.ships(),
            stardust: planet.stardust(),
            effective_defense: planet.effective_defense(),
        }
    }
}

/// Everything a resolved attack changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatOutcome {
    /// Victory or loss.
    pub result: AttackResult,
    /// Ships that were committed.
    pub attacking_ships: u64,
    /// Ships returning to the attacker.
    pub surviving_ships: u64,
    /// Stardust taken from the defender, held until cooldown ends.
    pub looted_stardust: u64,
    /// Ships the defender lost.
    pub defender_ships_lost: u64,
    /// Ships the defender keeps.
    pub defender_ships_remaining: u64,
    /// Fragments awarded to the defender.
    pub defender_fragments: u64,
    /// Fragments awarded to the attacker.
    pub attacker_fragments: u64,
}

/// Ships left over once the defense has been absorbed.
#[must_use]
pub const fn surviving_ships(attacking_ships: u64, effective_defense: u64) -> u64 {
    attacking_ships.saturating_sub(effective_defense)
}

/// Ships a defender loses when it repels an attack.
///
/// An attack at least as strong as the defense destroys up to its own size.
/// A weaker attack destroys a share of the defender's ships proportional to
/// `attacking / defense`, still capped at the attack size. The first branch
/// also covers a zero defense, so the division never sees zero.
#[must_use]
pub fn defender_ship_loss(defender_ships: u64, effective_defense: u64, attacking_ships: u64) -> u64 {
    if attacking_ships >= effective_defense {
        attacking_ships.min(defender_ships)
    } else {
        let share = attacking_ships as f64 / effective_defense as f64;
        round_half_up(defender_ships as f64 * share).min(attacking_ships)
    }
}

/// Resolve an attack against the defender's current state.
#[must_use]
pub fn resolve(
    attacking_ships: u64,
    defender: &DefenderState,
    config: &CombatConfig,
) -> CombatOutcome {
    let surviving = surviving_ships(attacking_ships, defender.effective_defense);

    if surviving > 0 {
        CombatOutcome {
            result: AttackResult::Victory,
            attacking_ships,
            surviving_ships: surviving,
            looted_stardust: round_half_up(config.loot_fraction * defender.stardust as f64),
            defender_ships_lost: defender.ships,
            defender_ships_remaining: 0,
            defender_fragments: round_half_up(config.fragment_fraction * defender.ships as f64),
            attacker_fragments: 0,
        }
    } else {
        let lost = defender_ship_loss(
            defender.ships,
            defender.effective_defense,
            attacking_ships,
        );
        let remaining = defender.ships.saturating_sub(lost);
        let defender_fragments = if remaining == 0 {
            round_half_up(config.fragment_fraction * lost as f64)
        } else {
            0
        };

        CombatOutcome {
            result: AttackResult::Loss,
            attacking_ships,
            surviving_ships: 0,
            looted_stardust: 0,
            defender_ships_lost: lost,
            defender_ships_remaining: remaining,
            defender_fragments,
            attacker_fragments: round_half_up(config.fragment_fraction * attacking_ships as f64),
        }
    }
}

/// Apply an outcome to both planets.
///
/// Looted stardust leaves the defender here; crediting it to the attacker is
/// the attack session's job once the cooldown is over.
pub fn apply_outcome(outcome: &CombatOutcome, attacker: &mut Planet, defender: &mut Planet) {
    match outcome.result {
        AttackResult::Victory => {
            defender.take_stardust(outcome.looted_stardust);
            attacker.receive_ships(outcome.surviving_ships);
        }
        AttackResult::Loss => {
            attacker.collect_fragments(outcome.attacker_fragments);
        }
    }
    defender.set_ships(outcome.defender_ships_remaining);
    if outcome.defender_fragments > 0 {
        defender.collect_fragments(outcome.defender_fragments);
    }
}
