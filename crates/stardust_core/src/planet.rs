//! Planet production and upgrade model.
//!
//! A planet passively accrues ships and stardust, can be upgraded for a
//! stardust price that grows with every level, and derives its effective
//! defense from its base defense plus half of its docked ships.
//!
//! Nothing here reads a clock: [`Planet::accrue`] takes the elapsed time
//! explicitly so a driver can replay any timeline exactly.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::account::AccountId;
use crate::config::{PlanetConfig, SECONDS_PER_HOUR};
use crate::error::{ensure_amount, GameError, Result};
use crate::math::{floor_count, round_half_up, to_seconds_f64, Fixed};

/// Unique identifier for planets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlanetId(pub u32);

impl fmt::Display for PlanetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Multipliers applied by a single upgrade.
///
/// Carried by every planet so a restored planet keeps upgrading along the
/// curve it was created with.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UpgradeCurve {
    /// Ship rate multiplier.
    pub ship_rate: f64,
    /// Stardust rate multiplier.
    pub stardust_rate: f64,
    /// Base defense multiplier (result is floored).
    pub defense: f64,
    /// Upgrade cost multiplier.
    pub cost: f64,
}

impl From<&PlanetConfig> for UpgradeCurve {
    fn from(config: &PlanetConfig) -> Self {
        Self {
            ship_rate: config.ship_rate_multiplier,
            stardust_rate: config.stardust_rate_multiplier,
            defense: config.defense_multiplier,
            cost: config.upgrade_cost_multiplier,
        }
    }
}

/// Resources added by one call to [`Planet::accrue`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Accrual {
    /// Ships added.
    pub ships: f64,
    /// Stardust added.
    pub stardust: f64,
}

/// Summary of a successful upgrade.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UpgradeReport {
    /// Level reached.
    pub level: u32,
    /// Stardust spent.
    pub cost_paid: f64,
    /// Price of the next upgrade.
    pub next_cost: f64,
    /// Base defense after the upgrade.
    pub base_defense: u64,
}

/// A planet with its own resource counters and production state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Planet {
    id: PlanetId,
    owner: Option<AccountId>,
    level: u32,
    ships: f64,
    stardust: f64,
    fragments_collected: u64,
    base_defense: u64,
    ship_rate_per_second: f64,
    stardust_rate_per_second: f64,
    upgrade_cost: f64,
    producing: bool,
    curve: UpgradeCurve,
}

impl Planet {
    /// Create a level 1 planet from configured starting values.
    #[must_use]
    pub fn new(id: PlanetId, owner: Option<AccountId>, config: &PlanetConfig) -> Self {
        Self {
            id,
            owner,
            level: 1,
            ships: config.starting_ships,
            stardust: config.starting_stardust,
            fragments_collected: 0,
            base_defense: config.starting_base_defense,
            ship_rate_per_second: config.ship_rate_per_hour / SECONDS_PER_HOUR,
            stardust_rate_per_second: config.stardust_rate_per_hour / SECONDS_PER_HOUR,
            upgrade_cost: config.starting_upgrade_cost,
            producing: true,
            curve: UpgradeCurve::from(config),
        }
    }

    /// Builder method to set the ship count. Negative values clamp to zero.
    #[must_use]
    pub fn with_ships(mut self, ships: f64) -> Self {
        self.ships = ships.max(0.0);
        self
    }

    /// Builder method to set the stardust stock. Negative values clamp to zero.
    #[must_use]
    pub fn with_stardust(mut self, stardust: f64) -> Self {
        self.stardust = stardust.max(0.0);
        self
    }

    /// Builder method to set the base defense level.
    #[must_use]
    pub const fn with_base_defense(mut self, base_defense: u64) -> Self {
        self.base_defense = base_defense;
        self
    }

    /// Planet identifier.
    #[must_use]
    pub const fn id(&self) -> PlanetId {
        self.id
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> String {
        format!("Planet {}", self.id)
    }

    /// Owning account, if assigned.
    #[must_use]
    pub const fn owner(&self) -> Option<AccountId> {
        self.owner
    }

    /// Assign or clear the owning account.
    pub fn set_owner(&mut self, owner: Option<AccountId>) {
        self.owner = owner;
    }

    /// Current level (starts at 1).
    #[must_use]
    pub const fn level(&self) -> u32 {
        self.level
    }

    /// Exact ship count, including fractional production.
    #[must_use]
    pub const fn ships_exact(&self) -> f64 {
        self.ships
    }

    /// Whole ships available for display and combat.
    #[must_use]
    pub fn ships(&self) -> u64 {
        floor_count(self.ships)
    }

    /// Exact stardust stock.
    #[must_use]
    pub const fn stardust_exact(&self) -> f64 {
        self.stardust
    }

    /// Whole stardust for display and looting.
    #[must_use]
    pub fn stardust(&self) -> u64 {
        floor_count(self.stardust)
    }

    /// Fragments collected so far.
    #[must_use]
    pub const fn fragments(&self) -> u64 {
        self.fragments_collected
    }

    /// Base defense level, without the ship bonus.
    #[must_use]
    pub const fn base_defense(&self) -> u64 {
        self.base_defense
    }

    /// Base defense plus half of the docked ships (rounded down).
    #[must_use]
    pub fn effective_defense(&self) -> u64 {
        self.base_defense + self.ships() / 2
    }

    /// Stardust price of the next upgrade.
    #[must_use]
    pub const fn upgrade_cost(&self) -> f64 {
        self.upgrade_cost
    }

    /// Ship production per second.
    #[must_use]
    pub const fn ship_rate_per_second(&self) -> f64 {
        self.ship_rate_per_second
    }

    /// Stardust production per second.
    #[must_use]
    pub const fn stardust_rate_per_second(&self) -> f64 {
        self.stardust_rate_per_second
    }

    /// Ship production per hour.
    #[must_use]
    pub fn ship_rate_per_hour(&self) -> f64 {
        self.ship_rate_per_second * SECONDS_PER_HOUR
    }

    /// Stardust production per hour.
    #[must_use]
    pub fn stardust_rate_per_hour(&self) -> f64 {
        self.stardust_rate_per_second * SECONDS_PER_HOUR
    }

    /// Whether production is running.
    #[must_use]
    pub const fn is_producing(&self) -> bool {
        self.producing
    }

    /// Enable or disable production.
    pub fn set_producing(&mut self, producing: bool) {
        self.producing = producing;
    }

    /// The multipliers applied on upgrade.
    #[must_use]
    pub const fn upgrade_curve(&self) -> UpgradeCurve {
        self.curve
    }

    /// Add `rate * dt` of ships and stardust if production is running.
    ///
    /// # Errors
    /// Returns [`GameError::NegativeElapsed`] for a negative `dt`.
    pub fn accrue(&mut self, dt: Fixed) -> Result<Accrual> {
        if dt < Fixed::ZERO {
            return Err(GameError::NegativeElapsed);
        }
        if !self.producing {
            return Ok(Accrual::default());
        }

        let secs = to_seconds_f64(dt);
        let accrual = Accrual {
            ships: self.ship_rate_per_second * secs,
            stardust: self.stardust_rate_per_second * secs,
        };
        self.ships += accrual.ships;
        self.stardust += accrual.stardust;
        Ok(accrual)
    }

    /// Spend stardust to gain a level and compound every rate.
    ///
    /// # Errors
    /// Returns [`GameError::InsufficientResources`] without touching any
    /// field when stardust is below the upgrade cost.
    pub fn upgrade(&mut self) -> Result<UpgradeReport> {
        if self.stardust < self.upgrade_cost {
            warn!(
                planet = %self.id,
                stardust = self.stardust,
                cost = self.upgrade_cost,
                "Not enough stardust to upgrade"
            );
            return Err(GameError::InsufficientResources {
                resource: "stardust",
                required: self.upgrade_cost,
                available: self.stardust,
            });
        }

        let cost_paid = self.upgrade_cost;
        self.stardust -= cost_paid;
        self.level += 1;
        self.ship_rate_per_second *= self.curve.ship_rate;
        self.stardust_rate_per_second *= self.curve.stardust_rate;
        self.base_defense = (self.base_defense as f64 * self.curve.defense).floor() as u64;
        self.upgrade_cost *= self.curve.cost;

        debug!(
            planet = %self.id,
            level = self.level,
            ship_rate_per_hour = self.ship_rate_per_hour(),
            stardust_rate_per_hour = self.stardust_rate_per_hour(),
            base_defense = self.base_defense,
            next_cost = self.upgrade_cost,
            "Planet upgraded"
        );

        Ok(UpgradeReport {
            level: self.level,
            cost_paid,
            next_cost: self.upgrade_cost,
            base_defense: self.base_defense,
        })
    }

    /// Add fragments to the collected total.
    pub fn collect_fragments(&mut self, fragments: u64) {
        self.fragments_collected = self.fragments_collected.saturating_add(fragments);
        debug!(
            planet = %self.id,
            fragments,
            total = self.fragments_collected,
            "Collected fragments"
        );
    }

    /// Add a fractional fragment amount, rounded half-up.
    ///
    /// Returns the whole number of fragments added.
    ///
    /// # Errors
    /// Returns [`GameError::InvalidAmount`] for negative or non-finite input.
    pub fn collect_fragments_rounded(&mut self, fragments: f64) -> Result<u64> {
        let whole = round_half_up(ensure_amount(fragments)?);
        self.collect_fragments(whole);
        Ok(whole)
    }

    /// Read-only snapshot for presentation layers.
    #[must_use]
    pub fn view(&self) -> PlanetView {
        PlanetView {
            id: self.id,
            name: self.name(),
            owner: self.owner,
            level: self.level,
            ships: self.ships(),
            stardust: self.stardust(),
            fragments: self.fragments_collected,
            defense: self.effective_defense(),
            upgrade_cost: self.upgrade_cost,
            ship_rate_per_hour: self.ship_rate_per_hour(),
            stardust_rate_per_hour: self.stardust_rate_per_hour(),
            producing: self.producing,
        }
    }

    /// Feed every field into a state hasher.
    pub fn hash_state<H: Hasher>(&self, hasher: &mut H) {
        self.id.hash(hasher);
        self.owner.hash(hasher);
        self.level.hash(hasher);
        self.ships.to_bits().hash(hasher);
        self.stardust.to_bits().hash(hasher);
        self.fragments_collected.hash(hasher);
        self.base_defense.hash(hasher);
        self.ship_rate_per_second.to_bits().hash(hasher);
        self.stardust_rate_per_second.to_bits().hash(hasher);
        self.upgrade_cost.to_bits().hash(hasher);
        self.producing.hash(hasher);
    }

    pub(crate) fn reassign_id(&mut self, id: PlanetId) {
        self.id = id;
    }

    // Combat bookkeeping, driven by the attack session.

    pub(crate) fn commit_ships(&mut self, ships: u64) {
        self.ships = (self.ships - ships as f64).max(0.0);
    }

    pub(crate) fn receive_ships(&mut self, ships: u64) {
        self.ships += ships as f64;
    }

    pub(crate) fn set_ships(&mut self, ships: u64) {
        self.ships = ships as f64;
    }

    pub(crate) fn take_stardust(&mut self, stardust: u64) {
        self.stardust = (self.stardust - stardust as f64).max(0.0);
    }

    pub(crate) fn receive_stardust(&mut self, stardust: u64) {
        self.stardust += stardust as f64;
    }
}

/// Floor-truncated planet state as shown to a player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanetView {
    /// Planet identifier.
    pub id: PlanetId,
    /// Display name.
    pub name: String,
    /// Owning account.
    pub owner: Option<AccountId>,
    /// Level.
    pub level: u32,
    /// Whole ships.
    pub ships: u64,
    /// Whole stardust.
    pub stardust: u64,
    /// Fragments collected.
    pub fragments: u64,
    /// Effective defense.
    pub defense: u64,
    /// Next upgrade price.
    pub upgrade_cost: f64,
    /// Ship production per hour.
    pub ship_rate_per_hour: f64,
    /// Stardust production per hour.
    pub stardust_rate_per_hour: f64,
    /// Whether production is running.
    pub producing: bool,
}
