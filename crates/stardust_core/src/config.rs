//! Tuning configuration for planets, combat, attacks, accounts and the shop.
//!
//! Every constant the simulation uses lives here with its default value.
//! Defaults are starting points, not fixed truths: a galaxy can be built
//! from any validated [`GameConfig`], typically loaded from a RON file.
//!
//! # Example RON
//!
//! ```ron
//! GameConfig(
//!     planet: (upgrade_cost_multiplier: 1.4),
//!     attack: (attack_duration: 45.0, cooldown_duration: 15.0),
//! )
//! ```
//!
//! Omitted sections and fields keep their defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::math::{seconds, seconds_serde, Fixed};

/// Seconds in an hour, for converting per-hour rates.
pub const SECONDS_PER_HOUR: f64 = 3600.0;

/// Starting values and upgrade multipliers for newly created planets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanetConfig {
    /// Ships on a fresh planet.
    pub starting_ships: f64,
    /// Stardust on a fresh planet.
    pub starting_stardust: f64,
    /// Base defense level on a fresh planet.
    pub starting_base_defense: u64,
    /// Stardust cost of the first upgrade.
    pub starting_upgrade_cost: f64,
    /// Ship production per hour at level 1.
    pub ship_rate_per_hour: f64,
    /// Stardust production per hour at level 1.
    pub stardust_rate_per_hour: f64,
    /// Ship rate multiplier applied per upgrade.
    pub ship_rate_multiplier: f64,
    /// Stardust rate multiplier applied per upgrade.
    pub stardust_rate_multiplier: f64,
    /// Base defense multiplier applied per upgrade (result is floored).
    pub defense_multiplier: f64,
    /// Upgrade cost multiplier applied per upgrade.
    pub upgrade_cost_multiplier: f64,
}

impl Default for PlanetConfig {
    fn default() -> Self {
        Self {
            starting_ships: 100.0,
            starting_stardust: 100.0,
            starting_base_defense: 100,
            starting_upgrade_cost: 100.0,
            ship_rate_per_hour: 100.0,
            stardust_rate_per_hour: 100.0,
            ship_rate_multiplier: 1.13,
            stardust_rate_multiplier: 1.10,
            defense_multiplier: 1.06,
            upgrade_cost_multiplier: 1.5,
        }
    }
}

/// Loot and fragment fractions used by the combat resolver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    /// Fraction of defender stardust looted on victory.
    pub loot_fraction: f64,
    /// Fraction of destroyed ships converted into fragments.
    pub fragment_fraction: f64,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            loot_fraction: 0.6,
            fragment_fraction: 0.6,
        }
    }
}

/// Phase durations for attack sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttackConfig {
    /// Seconds an attack spends in flight before resolving.
    #[serde(with = "seconds_serde")]
    pub attack_duration: Fixed,
    /// Seconds of cooldown before loot is released.
    #[serde(with = "seconds_serde")]
    pub cooldown_duration: Fixed,
}

impl Default for AttackConfig {
    fn default() -> Self {
        Self {
            attack_duration: seconds(60),
            cooldown_duration: seconds(30),
        }
    }
}

/// Starting currency and planet pricing for new accounts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountConfig {
    /// Account stardust at creation.
    pub starting_stardust: f64,
    /// Account moongems at creation.
    pub starting_moongems: f64,
    /// Account ships at creation.
    pub starting_ships: f64,
    /// Moongem price of the first purchased planet.
    pub planet_base_price: f64,
    /// Price multiplier applied after each successful purchase.
    pub planet_price_factor: f64,
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            starting_stardust: 1000.0,
            starting_moongems: 50.0,
            starting_ships: 100.0,
            planet_base_price: 100.0,
            planet_price_factor: 1.8,
        }
    }
}

/// Shop offers paid in account stardust.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShopConfig {
    /// Ships delivered by one ship bundle.
    pub ship_bundle_size: f64,
    /// Stardust price of one ship bundle.
    pub ship_bundle_cost: f64,
    /// Moongems delivered by one moongem bundle.
    pub moongem_bundle_size: f64,
    /// Stardust price of a single moongem.
    pub moongem_price: f64,
}

impl Default for ShopConfig {
    fn default() -> Self {
        Self {
            ship_bundle_size: 500.0,
            ship_bundle_cost: 200.0,
            moongem_bundle_size: 50.0,
            moongem_price: 10.0,
        }
    }
}

/// Complete tuning configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Planet starting values and upgrade curve.
    pub planet: PlanetConfig,
    /// Combat fractions.
    pub combat: CombatConfig,
    /// Attack phase durations.
    pub attack: AttackConfig,
    /// Account starting values and planet pricing.
    pub account: AccountConfig,
    /// Shop offers.
    pub shop: ShopConfig,
}

impl GameConfig {
    /// Load and validate a configuration from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| GameError::DataParseError {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let config: Self = ron::from_str(&contents).map_err(|e| GameError::DataParseError {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a configuration from a RON string.
    pub fn from_ron_str(ron: &str) -> Result<Self> {
        let config: Self = ron::from_str(ron).map_err(|e| GameError::DataParseError {
            path: "<inline>".to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check every value against the invariants the simulation relies on.
    pub fn validate(&self) -> Result<()> {
        let p = &self.planet;
        positive("planet.starting_upgrade_cost", p.starting_upgrade_cost)?;
        positive("planet.ship_rate_per_hour", p.ship_rate_per_hour)?;
        positive("planet.stardust_rate_per_hour", p.stardust_rate_per_hour)?;
        at_least_one("planet.ship_rate_multiplier", p.ship_rate_multiplier)?;
        at_least_one("planet.stardust_rate_multiplier", p.stardust_rate_multiplier)?;
        at_least_one("planet.defense_multiplier", p.defense_multiplier)?;
        at_least_one("planet.upgrade_cost_multiplier", p.upgrade_cost_multiplier)?;
        non_negative("planet.starting_ships", p.starting_ships)?;
        non_negative("planet.starting_stardust", p.starting_stardust)?;

        fraction("combat.loot_fraction", self.combat.loot_fraction)?;
        fraction("combat.fragment_fraction", self.combat.fragment_fraction)?;

        if self.attack.attack_duration < Fixed::ZERO || self.attack.cooldown_duration < Fixed::ZERO
        {
            return Err(GameError::InvalidConfig(
                "attack durations must not be negative".to_string(),
            ));
        }

        let a = &self.account;
        non_negative("account.starting_stardust", a.starting_stardust)?;
        non_negative("account.starting_moongems", a.starting_moongems)?;
        non_negative("account.starting_ships", a.starting_ships)?;
        positive("account.planet_base_price", a.planet_base_price)?;
        at_least_one("account.planet_price_factor", a.planet_price_factor)?;

        let s = &self.shop;
        non_negative("shop.ship_bundle_size", s.ship_bundle_size)?;
        non_negative("shop.ship_bundle_cost", s.ship_bundle_cost)?;
        non_negative("shop.moongem_bundle_size", s.moongem_bundle_size)?;
        non_negative("shop.moongem_price", s.moongem_price)?;
        Ok(())
    }
}

fn positive(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(GameError::InvalidConfig(format!("{name} must be > 0, got {value}")))
    }
}

fn non_negative(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(GameError::InvalidConfig(format!("{name} must be >= 0, got {value}")))
    }
}

// Costs and rates never shrink on upgrade or purchase.
fn at_least_one(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 1.0 {
        Ok(())
    } else {
        Err(GameError::InvalidConfig(format!("{name} must be >= 1, got {value}")))
    }
}

fn fraction(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(GameError::InvalidConfig(format!("{name} must be within 0..=1, got {value}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(GameConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_ron_keeps_defaults() {
        let config = GameConfig::from_ron_str(
            "(attack: (attack_duration: 45.0), planet: (upgrade_cost_multiplier: 1.4))",
        )
        .unwrap();

        assert_eq!(config.attack.attack_duration, seconds(45));
        assert_eq!(config.attack.cooldown_duration, seconds(30));
        assert_eq!(config.planet.upgrade_cost_multiplier, 1.4);
        assert_eq!(config.planet.ship_rate_multiplier, 1.13);
        assert_eq!(config.account, AccountConfig::default());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = GameConfig::from_ron_str("(combat: (loot_fraction: 1.5))").unwrap_err();
        assert!(matches!(err, GameError::InvalidConfig(_)));

        let err = GameConfig::from_ron_str("(planet: (ship_rate_per_hour: 0.0))").unwrap_err();
        assert!(matches!(err, GameError::InvalidConfig(_)));

        let err = GameConfig::from_ron_str("(attack: (cooldown_duration: -1.0))").unwrap_err();
        assert!(matches!(err, GameError::InvalidConfig(_)));
    }

    #[test]
    fn test_malformed_ron() {
        let err = GameConfig::from_ron_str("(planet: [").unwrap_err();
        assert!(matches!(err, GameError::DataParseError { .. }));
    }

    #[test]
    fn test_ron_roundtrip() {
        let config = GameConfig::default();
        let text = ron::to_string(&config).unwrap();
        let restored = GameConfig::from_ron_str(&text).unwrap();
        assert_eq!(config, restored);
    }
}
