//! Timed attack sessions.
//!
//! Each planet owns at most one attack session. A session moves through
//! three phases:
//!
//! ```text
//! Idle --launch--> Attacking --attack_duration--> Cooldown --cooldown_duration--> Idle
//! ```
//!
//! - **Launch** deducts the committed ships from the attacker immediately.
//! - **Attacking → Cooldown** resolves combat exactly once against the
//!   defender's state at that instant and applies every ship and fragment
//!   transfer. Looted stardust is held by the session.
//! - **Cooldown → Idle** credits the held loot to the attacker.
//!
//! Time only moves through [`AttackSession::tick`]. Surplus time carries over
//! from one phase to the next. [`crate::galaxy::Galaxy::tick`] splits its
//! steps at every due transition, so production never runs ahead of a
//! resolution and a single large step behaves the same as many small ones.

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::combat::{apply_outcome, resolve, AttackResult, CombatOutcome, DefenderState};
use crate::config::{AttackConfig, CombatConfig};
use crate::error::{GameError, Result};
use crate::math::{fixed_serde, round_half_up, to_seconds_f64, Fixed};
use crate::planet::PlanetId;
use crate::registry::PlanetRegistry;

/// Phase of an attack session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AttackPhase {
    /// Ready to launch.
    #[default]
    Idle,
    /// Ships are in flight.
    Attacking,
    /// Waiting for loot to arrive; no new launch allowed.
    Cooldown,
}

/// Result of a successful launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchReport {
    /// Attacking planet.
    pub attacker: PlanetId,
    /// Target planet.
    pub defender: PlanetId,
    /// Ships committed to the attack.
    pub ships: u64,
}

/// Something that happened while a session was ticking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttackEvent {
    /// Combat was resolved and applied.
    Resolved {
        /// Attacking planet.
        attacker: PlanetId,
        /// Target planet.
        defender: PlanetId,
        /// Full combat outcome.
        outcome: CombatOutcome,
    },
    /// The cooldown ended and any held loot was credited.
    CooldownEnded {
        /// Attacking planet.
        attacker: PlanetId,
        /// Stardust credited to the attacker.
        loot_credited: u64,
    },
    /// A participating planet vanished before the session could finish.
    Aborted {
        /// Attacking planet.
        attacker: PlanetId,
        /// Target planet.
        defender: PlanetId,
        /// The planet that could not be found.
        missing: PlanetId,
    },
}

/// Per-attacker attack state machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackSession {
    attacker: PlanetId,
    phase: AttackPhase,
    defender: Option<PlanetId>,
    committed_ships: u64,
    #[serde(with = "fixed_serde")]
    attack_elapsed: Fixed,
    #[serde(with = "fixed_serde")]
    cooldown_elapsed: Fixed,
    last_outcome: Option<AttackResult>,
    pending_loot: u64,
    timing: AttackConfig,
    combat: CombatConfig,
}

impl AttackSession {
    /// Create an idle session for `attacker`.
    #[must_use]
    pub fn new(attacker: PlanetId, timing: AttackConfig, combat: CombatConfig) -> Self {
        Self {
            attacker,
            phase: AttackPhase::Idle,
            defender: None,
            committed_ships: 0,
            attack_elapsed: Fixed::ZERO,
            cooldown_elapsed: Fixed::ZERO,
            last_outcome: None,
            pending_loot: 0,
            timing,
            combat,
        }
    }

    /// The attacking planet this session belongs to.
    #[must_use]
    pub const fn attacker(&self) -> PlanetId {
        self.attacker
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> AttackPhase {
        self.phase
    }

    /// Whether a launch would be refused because the session is busy.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.phase != AttackPhase::Idle
    }

    /// Target of the current attack.
    #[must_use]
    pub const fn defender(&self) -> Option<PlanetId> {
        self.defender
    }

    /// Ships committed at launch (zero when idle).
    #[must_use]
    pub const fn committed_ships(&self) -> u64 {
        self.committed_ships
    }

    /// Outcome of the resolved attack, kept until the cooldown ends.
    #[must_use]
    pub const fn last_outcome(&self) -> Option<AttackResult> {
        self.last_outcome
    }

    /// Stardust held until the cooldown ends.
    #[must_use]
    pub const fn pending_loot(&self) -> u64 {
        self.pending_loot
    }

    /// Time left in the current phase, or `None` when idle.
    #[must_use]
    pub fn remaining(&self) -> Option<Fixed> {
        match self.phase {
            AttackPhase::Idle => None,
            AttackPhase::Attacking => Some(self.timing.attack_duration - self.attack_elapsed),
            AttackPhase::Cooldown => Some(self.timing.cooldown_duration - self.cooldown_elapsed),
        }
    }

    /// Whole seconds left in the current phase, rounded up for countdowns.
    #[must_use]
    pub fn remaining_whole_seconds(&self) -> Option<u64> {
        self.remaining().map(|r| r.ceil().to_num::<i64>().max(0) as u64)
    }

    /// Launch with a fraction of the attacker's whole ships.
    ///
    /// The committed count is `round(ships * fraction)`.
    ///
    /// # Errors
    /// See [`Self::launch_ships`]; additionally
    /// [`GameError::InvalidShipFraction`] for a fraction outside `0..=1`.
    pub fn launch(
        &mut self,
        planets: &mut PlanetRegistry,
        defender: PlanetId,
        fraction: f64,
    ) -> Result<LaunchReport> {
        self.ensure_idle()?;
        if !fraction.is_finite() || !(0.0..=1.0).contains(&fraction) {
            return Err(GameError::InvalidShipFraction(fraction));
        }
        let available = planets.require(self.attacker)?.ships();
        let ships = round_half_up(available as f64 * fraction);
        self.launch_ships(planets, defender, ships)
    }

    /// Launch with an explicit ship count.
    ///
    /// Nothing changes unless every check passes.
    ///
    /// # Errors
    /// - [`GameError::AttackInProgress`] while attacking or cooling down
    /// - [`GameError::SelfAttack`] when targeting the attacker
    /// - [`GameError::PlanetNotFound`] when either planet is missing
    /// - [`GameError::NoShipsCommitted`] for zero ships
    /// - [`GameError::InsufficientShips`] when the attacker has too few
    pub fn launch_ships(
        &mut self,
        planets: &mut PlanetRegistry,
        defender: PlanetId,
        ships: u64,
    ) -> Result<LaunchReport> {
        self.ensure_idle()?;
        let (attacker_planet, _) = planets.pair_mut(self.attacker, defender)?;

        if ships == 0 {
            return Err(GameError::NoShipsCommitted);
        }
        let available = attacker_planet.ships();
        if available < ships {
            return Err(GameError::InsufficientShips {
                required: ships,
                available,
            });
        }

        attacker_planet.commit_ships(ships);
        self.phase = AttackPhase::Attacking;
        self.defender = Some(defender);
        self.committed_ships = ships;
        self.attack_elapsed = Fixed::ZERO;
        self.cooldown_elapsed = Fixed::ZERO;
        self.last_outcome = None;
        self.pending_loot = 0;

        info!(
            attacker = %self.attacker,
            defender = %defender,
            ships,
            "Attack launched"
        );
        Ok(LaunchReport {
            attacker: self.attacker,
            defender,
            ships,
        })
    }

    fn ensure_idle(&self) -> Result<()> {
        if self.is_busy() {
            warn!(
                attacker = %self.attacker,
                phase = ?self.phase,
                "Cannot start a new attack while in progress or during cooldown"
            );
            return Err(GameError::AttackInProgress(self.attacker));
        }
        Ok(())
    }

    /// Advance the active phase by `dt`, performing every transition that
    /// falls due.
    ///
    /// # Errors
    /// Returns [`GameError::NegativeElapsed`] for a negative `dt`.
    pub fn tick(&mut self, dt: Fixed, planets: &mut PlanetRegistry) -> Result<Vec<AttackEvent>> {
        if dt < Fixed::ZERO {
            return Err(GameError::NegativeElapsed);
        }

        let mut events = Vec::new();
        let mut budget = dt;

        loop {
            match self.phase {
                AttackPhase::Idle => break,
                AttackPhase::Attacking => {
                    let needed = self.timing.attack_duration - self.attack_elapsed;
                    if budget < needed {
                        self.attack_elapsed += budget;
                        break;
                    }
                    budget -= needed;
                    self.attack_elapsed = self.timing.attack_duration;
                    events.push(self.finish_attack(planets));
                }
                AttackPhase::Cooldown => {
                    let needed = self.timing.cooldown_duration - self.cooldown_elapsed;
                    if budget < needed {
                        self.cooldown_elapsed += budget;
                        break;
                    }
                    budget -= needed;
                    self.cooldown_elapsed = self.timing.cooldown_duration;
                    events.push(self.finish_cooldown(planets));
                }
            }
        }

        Ok(events)
    }

    fn finish_attack(&mut self, planets: &mut PlanetRegistry) -> AttackEvent {
        let Some(defender_id) = self.defender else {
            return self.abort(self.attacker, self.attacker);
        };

        let (attacker, defender) = match planets.pair_mut(self.attacker, defender_id) {
            Ok(pair) => pair,
            Err(GameError::PlanetNotFound(missing)) => return self.abort(defender_id, missing),
            Err(_) => return self.abort(defender_id, defender_id),
        };

        let outcome = resolve(
            self.committed_ships,
            &DefenderState::of(defender),
            &self.combat,
        );
        apply_outcome(&outcome, attacker, defender);

        self.phase = AttackPhase::Cooldown;
        self.cooldown_elapsed = Fixed::ZERO;
        self.last_outcome = Some(outcome.result);
        self.pending_loot = outcome.looted_stardust;

        info!(
            attacker = %self.attacker,
            defender = %defender_id,
            result = ?outcome.result,
            surviving = outcome.surviving_ships,
            looted = outcome.looted_stardust,
            attacker_fragments = outcome.attacker_fragments,
            defender_fragments = outcome.defender_fragments,
            "Attack resolved"
        );

        AttackEvent::Resolved {
            attacker: self.attacker,
            defender: defender_id,
            outcome,
        }
    }

    fn finish_cooldown(&mut self, planets: &mut PlanetRegistry) -> AttackEvent {
        let defender = self.defender.unwrap_or(self.attacker);
        let Some(attacker) = planets.get_mut(self.attacker) else {
            return self.abort(defender, self.attacker);
        };

        let loot = self.pending_loot;
        if loot > 0 {
            attacker.receive_stardust(loot);
            debug!(attacker = %self.attacker, loot, "Looted stardust added to attacker");
        }
        self.reset();
        debug!(attacker = %self.attacker, "Cooldown ended");

        AttackEvent::CooldownEnded {
            attacker: self.attacker,
            loot_credited: loot,
        }
    }

    fn abort(&mut self, defender: PlanetId, missing: PlanetId) -> AttackEvent {
        warn!(
            attacker = %self.attacker,
            defender = %defender,
            missing = %missing,
            ships_lost = self.committed_ships,
            loot_lost = self.pending_loot,
            "Attack aborted: planet no longer exists"
        );
        self.reset();
        AttackEvent::Aborted {
            attacker: self.attacker,
            defender,
            missing,
        }
    }

    fn reset(&mut self) {
        self.phase = AttackPhase::Idle;
        self.defender = None;
        self.committed_ships = 0;
        self.attack_elapsed = Fixed::ZERO;
        self.cooldown_elapsed = Fixed::ZERO;
        self.last_outcome = None;
        self.pending_loot = 0;
    }

    /// Read-only snapshot for presentation layers.
    #[must_use]
    pub fn view(&self) -> AttackView {
        AttackView {
            attacker: self.attacker,
            defender: self.defender,
            phase: self.phase,
            committed_ships: self.committed_ships,
            remaining_seconds: self.remaining().map_or(0.0, to_seconds_f64),
            last_outcome: self.last_outcome,
            pending_loot: self.pending_loot,
        }
    }

    /// Feed the session state into a state hasher.
    pub fn hash_state<H: Hasher>(&self, hasher: &mut H) {
        self.attacker.hash(hasher);
        self.phase.hash(hasher);
        self.defender.hash(hasher);
        self.committed_ships.hash(hasher);
        self.attack_elapsed.to_bits().hash(hasher);
        self.cooldown_elapsed.to_bits().hash(hasher);
        self.last_outcome.hash(hasher);
        self.pending_loot.hash(hasher);
    }
}

/// Attack session state as shown to a player.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttackView {
    /// Attacking planet.
    pub attacker: PlanetId,
    /// Target planet, while active.
    pub defender: Option<PlanetId>,
    /// Current phase.
    pub phase: AttackPhase,
    /// Ships in flight.
    pub committed_ships: u64,
    /// Seconds left in the current phase.
    pub remaining_seconds: f64,
    /// Outcome held during cooldown.
    pub last_outcome: Option<AttackResult>,
    /// Loot held during cooldown.
    pub pending_loot: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlanetConfig;
    use crate::math::seconds;
    use crate::planet::Planet;

    struct Setup {
        planets: PlanetRegistry,
        session: AttackSession,
        attacker: PlanetId,
        defender: PlanetId,
    }

    fn setup() -> Setup {
        let config = PlanetConfig::default();
        let mut planets = PlanetRegistry::new();
        let attacker = planets.insert(Planet::new(PlanetId(0), None, &config).with_ships(300.0));
        let defender = planets.insert(Planet::new(PlanetId(0), None, &config).with_ships(0.0));
        // Production would blur the exact numbers below
        planets.get_mut(attacker).unwrap().set_producing(false);
        planets.get_mut(defender).unwrap().set_producing(false);

        Setup {
            planets,
            session: AttackSession::new(attacker, AttackConfig::default(), CombatConfig::default()),
            attacker,
            defender,
        }
    }

    #[test]
    fn test_launch_deducts_ships_immediately() {
        let mut s = setup();
        let report = s
            .session
            .launch_ships(&mut s.planets, s.defender, 150)
            .unwrap();

        assert_eq!(report.ships, 150);
        assert_eq!(s.session.phase(), AttackPhase::Attacking);
        assert_eq!(s.planets.get(s.attacker).unwrap().ships(), 150);
        assert_eq!(s.session.remaining_whole_seconds(), Some(60));
    }

    #[test]
    fn test_launch_by_fraction_rounds() {
        let mut s = setup();
        // round(300 * 0.125) = round(37.5) = 38
        let report = s.session.launch(&mut s.planets, s.defender, 0.125).unwrap();
        assert_eq!(report.ships, 38);
    }

    #[test]
    fn test_launch_rejections_leave_state_untouched() {
        let mut s = setup();
        let before = s.planets.get(s.attacker).unwrap().clone();

        assert!(matches!(
            s.session.launch(&mut s.planets, s.defender, 0.0),
            Err(GameError::NoShipsCommitted)
        ));
        assert!(matches!(
            s.session.launch(&mut s.planets, s.defender, 1.5),
            Err(GameError::InvalidShipFraction(_))
        ));
        assert!(matches!(
            s.session.launch_ships(&mut s.planets, s.defender, 301),
            Err(GameError::InsufficientShips {
                required: 301,
                available: 300
            })
        ));
        assert!(matches!(
            s.session.launch_ships(&mut s.planets, s.attacker, 10),
            Err(GameError::SelfAttack(_))
        ));
        assert!(matches!(
            s.session.launch_ships(&mut s.planets, PlanetId(42), 10),
            Err(GameError::PlanetNotFound(PlanetId(42)))
        ));

        assert_eq!(s.session.phase(), AttackPhase::Idle);
        assert_eq!(s.planets.get(s.attacker).unwrap(), &before);
    }

    #[test]
    fn test_second_launch_refused_while_busy() {
        let mut s = setup();
        s.session
            .launch_ships(&mut s.planets, s.defender, 150)
            .unwrap();
        let snapshot = s.session.clone();

        assert!(matches!(
            s.session.launch_ships(&mut s.planets, s.defender, 10),
            Err(GameError::AttackInProgress(_))
        ));
        assert_eq!(s.session, snapshot);
        assert_eq!(s.planets.get(s.attacker).unwrap().ships(), 150);

        s.session.tick(seconds(60), &mut s.planets).unwrap();
        assert_eq!(s.session.phase(), AttackPhase::Cooldown);
        assert!(matches!(
            s.session.launch(&mut s.planets, s.defender, 0.5),
            Err(GameError::AttackInProgress(_))
        ));
    }

    #[test]
    fn test_full_cycle_victory() {
        let mut s = setup();
        s.session
            .launch_ships(&mut s.planets, s.defender, 150)
            .unwrap();

        let events = s.session.tick(seconds(59), &mut s.planets).unwrap();
        assert!(events.is_empty());
        assert_eq!(s.session.phase(), AttackPhase::Attacking);

        let events = s.session.tick(seconds(1), &mut s.planets).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(s.session.phase(), AttackPhase::Cooldown);
        assert_eq!(s.session.last_outcome(), Some(AttackResult::Victory));
        assert_eq!(s.session.pending_loot(), 60);

        // Survivors are home, loot is not
        let attacker = s.planets.get(s.attacker).unwrap();
        assert_eq!(attacker.ships(), 200);
        assert_eq!(attacker.stardust(), 100);
        assert_eq!(s.planets.get(s.defender).unwrap().stardust(), 40);

        let events = s.session.tick(seconds(29), &mut s.planets).unwrap();
        assert!(events.is_empty());
        assert_eq!(s.planets.get(s.attacker).unwrap().stardust(), 100);

        let events = s.session.tick(seconds(1), &mut s.planets).unwrap();
        assert_eq!(
            events,
            vec![AttackEvent::CooldownEnded {
                attacker: s.attacker,
                loot_credited: 60
            }]
        );
        assert_eq!(s.session.phase(), AttackPhase::Idle);
        assert_eq!(s.session.last_outcome(), None);
        assert_eq!(s.session.pending_loot(), 0);
        assert_eq!(s.planets.get(s.attacker).unwrap().stardust(), 160);
    }

    #[test]
    fn test_large_step_carries_across_phases() {
        let mut s = setup();
        s.session
            .launch_ships(&mut s.planets, s.defender, 150)
            .unwrap();

        let events = s.session.tick(seconds(95), &mut s.planets).unwrap();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], AttackEvent::Resolved { .. }));
        assert!(matches!(
            events[1],
            AttackEvent::CooldownEnded {
                loot_credited: 60,
                ..
            }
        ));
        assert_eq!(s.session.phase(), AttackPhase::Idle);
    }

    #[test]
    fn test_resolution_is_applied_once() {
        let mut s = setup();
        s.session
            .launch_ships(&mut s.planets, s.defender, 50)
            .unwrap();
        s.session.tick(seconds(60), &mut s.planets).unwrap();
        let fragments = s.planets.get(s.attacker).unwrap().fragments();
        assert_eq!(fragments, 30);

        // Further ticks inside the cooldown never resolve again
        for _ in 0..29 {
            s.session.tick(seconds(1), &mut s.planets).unwrap();
        }
        assert_eq!(s.planets.get(s.attacker).unwrap().fragments(), fragments);
    }

    #[test]
    fn test_defender_upgrading_mid_flight_flips_outcome() {
        let mut s = setup();
        // 105 beats base defense 100 at launch time
        s.session
            .launch_ships(&mut s.planets, s.defender, 105)
            .unwrap();

        let defender = s.planets.get_mut(s.defender).unwrap();
        defender.upgrade().unwrap();
        assert_eq!(defender.effective_defense(), 106);

        s.session.tick(seconds(60), &mut s.planets).unwrap();
        assert_eq!(s.session.last_outcome(), Some(AttackResult::Loss));
    }

    #[test]
    fn test_missing_defender_aborts() {
        let mut s = setup();
        s.session
            .launch_ships(&mut s.planets, s.defender, 100)
            .unwrap();
        s.planets.remove(s.defender);

        let events = s.session.tick(seconds(60), &mut s.planets).unwrap();
        assert_eq!(
            events,
            vec![AttackEvent::Aborted {
                attacker: s.attacker,
                defender: s.defender,
                missing: s.defender
            }]
        );
        assert_eq!(s.session.phase(), AttackPhase::Idle);
        assert_eq!(s.planets.get(s.attacker).unwrap().ships(), 200);
    }

    #[test]
    fn test_negative_tick_rejected() {
        let mut s = setup();
        assert!(matches!(
            s.session.tick(seconds(-1), &mut s.planets),
            Err(GameError::NegativeElapsed)
        ));
    }
}
