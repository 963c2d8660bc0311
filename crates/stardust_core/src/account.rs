//! Player accounts: account-level currency and owned planets.
//!
//! Account currency is separate from the counters on each planet. Planet
//! counters fund upgrades and fight battles; account currency pays for
//! cross-planet purchases such as new planets and shop bundles.
//!
//! Spending never fails for lack of funds: it clamps the balance at zero.
//! Purchases that must not happen partially (planets, shop bundles) check
//! the balance first and refuse instead.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::AccountConfig;
use crate::error::{ensure_amount, GameError, Result};
use crate::planet::PlanetId;

/// Unique identifier for accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccountId(pub u32);

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Account-level currencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Currency {
    /// Soft currency earned by planets.
    Stardust,
    /// Premium currency used to buy planets.
    Moongems,
    /// Account ship reserve.
    Ships,
}

impl Currency {
    /// Lowercase name used in messages.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Stardust => "stardust",
            Self::Moongems => "moongems",
            Self::Ships => "ships",
        }
    }
}

/// A player account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    id: AccountId,
    name: String,
    stardust: f64,
    moongems: f64,
    ships: f64,
    planets: Vec<PlanetId>,
    planet_price: f64,
    planet_price_factor: f64,
}

impl Account {
    /// Create an account with configured starting currency and no planets.
    #[must_use]
    pub fn new(id: AccountId, name: impl Into<String>, config: &AccountConfig) -> Self {
        Self {
            id,
            name: name.into(),
            stardust: config.starting_stardust,
            moongems: config.starting_moongems,
            ships: config.starting_ships,
            planets: Vec::new(),
            planet_price: config.planet_base_price,
            planet_price_factor: config.planet_price_factor,
        }
    }

    /// Account identifier.
    #[must_use]
    pub const fn id(&self) -> AccountId {
        self.id
    }

    /// Unique account name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current balance of a currency.
    #[must_use]
    pub const fn balance(&self, kind: Currency) -> f64 {
        match kind {
            Currency::Stardust => self.stardust,
            Currency::Moongems => self.moongems,
            Currency::Ships => self.ships,
        }
    }

    /// Whether the balance covers `amount`.
    #[must_use]
    pub fn can_afford(&self, kind: Currency, amount: f64) -> bool {
        self.balance(kind) >= amount
    }

    fn balance_mut(&mut self, kind: Currency) -> &mut f64 {
        match kind {
            Currency::Stardust => &mut self.stardust,
            Currency::Moongems => &mut self.moongems,
            Currency::Ships => &mut self.ships,
        }
    }

    /// Deduct `amount`, clamping the balance at zero.
    ///
    /// Returns the amount actually deducted, which is less than `amount`
    /// when the balance was short.
    ///
    /// # Errors
    /// Returns [`GameError::InvalidAmount`] for negative or non-finite input.
    pub fn spend(&mut self, kind: Currency, amount: f64) -> Result<f64> {
        let amount = ensure_amount(amount)?;
        let balance = self.balance_mut(kind);
        let deducted = amount.min(*balance);
        *balance = (*balance - amount).max(0.0);
        if deducted < amount {
            debug!(
                currency = kind.name(),
                requested = amount,
                deducted,
                "Spend clamped at zero"
            );
        }
        Ok(deducted)
    }

    /// Add `amount` to a balance.
    ///
    /// # Errors
    /// Returns [`GameError::InvalidAmount`] for negative or non-finite input.
    pub fn add(&mut self, kind: Currency, amount: f64) -> Result<()> {
        let amount = ensure_amount(amount)?;
        *self.balance_mut(kind) += amount;
        Ok(())
    }

    /// Number of owned planets.
    #[must_use]
    pub fn planet_count(&self) -> usize {
        self.planets.len()
    }

    /// Owned planets in acquisition order.
    #[must_use]
    pub fn planets(&self) -> &[PlanetId] {
        &self.planets
    }

    /// Planet at `index` in acquisition order.
    ///
    /// # Errors
    /// Returns [`GameError::PlanetIndexOutOfRange`] past the end of the list.
    pub fn planet_at(&self, index: usize) -> Result<PlanetId> {
        self.planets
            .get(index)
            .copied()
            .ok_or(GameError::PlanetIndexOutOfRange {
                index,
                count: self.planets.len(),
            })
    }

    /// Whether this account owns `planet`.
    #[must_use]
    pub fn owns(&self, planet: PlanetId) -> bool {
        self.planets.contains(&planet)
    }

    /// Append a planet to the owned list.
    ///
    /// Returns `false` if the planet was already owned.
    pub fn add_planet(&mut self, planet: PlanetId) -> bool {
        if self.owns(planet) {
            return false;
        }
        self.planets.push(planet);
        true
    }

    /// Drop a planet from the owned list, keeping the order of the rest.
    pub fn remove_planet(&mut self, planet: PlanetId) -> bool {
        let before = self.planets.len();
        self.planets.retain(|p| *p != planet);
        self.planets.len() != before
    }

    /// Step through owned planets, wrapping at both ends.
    ///
    /// Returns `None` when the account owns no planets.
    #[must_use]
    pub fn cycle_planet(&self, current: usize, step: isize) -> Option<usize> {
        let count = self.planets.len();
        if count == 0 {
            return None;
        }
        let count = count as isize;
        let current = (current % self.planets.len()) as isize;
        Some((current + step).rem_euclid(count) as usize)
    }

    /// Moongem price of the next planet.
    #[must_use]
    pub const fn planet_price(&self) -> f64 {
        self.planet_price
    }

    /// Whether the account can pay for the next planet.
    #[must_use]
    pub fn can_buy_planet(&self) -> bool {
        self.moongems >= self.planet_price
    }

    /// Pay for `planet` in moongems and take ownership of it.
    ///
    /// On success the price escalates by the configured factor and the price
    /// paid is returned. A failed purchase changes nothing.
    ///
    /// # Errors
    /// Returns [`GameError::InsufficientResources`] when moongems are short.
    pub fn buy_planet(&mut self, planet: PlanetId) -> Result<f64> {
        if !self.can_buy_planet() {
            warn!(
                account = %self.id,
                moongems = self.moongems,
                price = self.planet_price,
                "Not enough moongems to buy a planet"
            );
            return Err(GameError::InsufficientResources {
                resource: Currency::Moongems.name(),
                required: self.planet_price,
                available: self.moongems,
            });
        }

        let price = self.planet_price;
        self.spend(Currency::Moongems, price)?;
        self.add_planet(planet);
        self.planet_price *= self.planet_price_factor;

        info!(
            account = %self.id,
            planet = %planet,
            price,
            next_price = self.planet_price,
            "Bought planet"
        );
        Ok(price)
    }

    /// Read-only snapshot for presentation layers.
    #[must_use]
    pub fn view(&self) -> AccountView {
        AccountView {
            id: self.id,
            name: self.name.clone(),
            stardust: self.stardust,
            moongems: self.moongems,
            ships: self.ships,
            planets: self.planets.clone(),
            planet_price: self.planet_price,
        }
    }

    /// Feed every field into a state hasher.
    pub fn hash_state<H: Hasher>(&self, hasher: &mut H) {
        self.id.hash(hasher);
        self.name.hash(hasher);
        self.stardust.to_bits().hash(hasher);
        self.moongems.to_bits().hash(hasher);
        self.ships.to_bits().hash(hasher);
        self.planets.hash(hasher);
        self.planet_price.to_bits().hash(hasher);
    }
}

/// Account state as shown to a player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountView {
    /// Account identifier.
    pub id: AccountId,
    /// Account name.
    pub name: String,
    /// Stardust balance.
    pub stardust: f64,
    /// Moongem balance.
    pub moongems: f64,
    /// Ship reserve.
    pub ships: f64,
    /// Owned planets in acquisition order.
    pub planets: Vec<PlanetId>,
    /// Price of the next planet.
    pub planet_price: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account() -> Account {
        Account::new(AccountId(1), "PlayerOne", &AccountConfig::default())
    }

    #[test]
    fn test_starting_balances() {
        let a = account();
        assert_eq!(a.balance(Currency::Stardust), 1000.0);
        assert_eq!(a.balance(Currency::Moongems), 50.0);
        assert_eq!(a.balance(Currency::Ships), 100.0);
        assert_eq!(a.planet_count(), 0);
        assert_eq!(a.planet_price(), 100.0);
    }

    #[test]
    fn test_spend_clamps_at_zero() {
        let mut a = account();
        assert_eq!(a.spend(Currency::Moongems, 20.0).unwrap(), 20.0);
        assert_eq!(a.balance(Currency::Moongems), 30.0);

        // Overspend does not fail
        assert_eq!(a.spend(Currency::Moongems, 45.0).unwrap(), 30.0);
        assert_eq!(a.balance(Currency::Moongems), 0.0);
    }

    #[test]
    fn test_spend_and_add_reject_negative() {
        let mut a = account();
        assert!(matches!(
            a.spend(Currency::Stardust, -5.0),
            Err(GameError::InvalidAmount(_))
        ));
        assert!(a.add(Currency::Ships, f64::NAN).is_err());
        assert_eq!(a.balance(Currency::Stardust), 1000.0);
        assert_eq!(a.balance(Currency::Ships), 100.0);
    }

    #[test]
    fn test_add() {
        let mut a = account();
        a.add(Currency::Ships, 500.0).unwrap();
        a.add(Currency::Moongems, 2.5).unwrap();
        assert_eq!(a.balance(Currency::Ships), 600.0);
        assert_eq!(a.balance(Currency::Moongems), 52.5);
    }

    #[test]
    fn test_planet_list_order_and_index() {
        let mut a = account();
        assert!(a.add_planet(PlanetId(7)));
        assert!(a.add_planet(PlanetId(3)));
        assert!(!a.add_planet(PlanetId(7)));

        assert_eq!(a.planet_count(), 2);
        assert_eq!(a.planet_at(0).unwrap(), PlanetId(7));
        assert_eq!(a.planet_at(1).unwrap(), PlanetId(3));
        assert!(matches!(
            a.planet_at(2),
            Err(GameError::PlanetIndexOutOfRange { index: 2, count: 2 })
        ));

        assert!(a.remove_planet(PlanetId(7)));
        assert_eq!(a.planet_at(0).unwrap(), PlanetId(3));
    }

    #[test]
    fn test_cycle_planet_wraps() {
        let mut a = account();
        assert_eq!(a.cycle_planet(0, 1), None);

        a.add_planet(PlanetId(1));
        a.add_planet(PlanetId(2));
        a.add_planet(PlanetId(3));
        assert_eq!(a.cycle_planet(2, 1), Some(0));
        assert_eq!(a.cycle_planet(0, -1), Some(2));
        assert_eq!(a.cycle_planet(1, 1), Some(2));
    }

    #[test]
    fn test_buy_planet_escalates_price() {
        let mut a = account();
        a.add(Currency::Moongems, 250.0).unwrap();

        assert_eq!(a.buy_planet(PlanetId(10)).unwrap(), 100.0);
        assert_eq!(a.balance(Currency::Moongems), 200.0);
        assert!((a.planet_price() - 180.0).abs() < 1e-9);
        assert!(a.owns(PlanetId(10)));

        assert!((a.buy_planet(PlanetId(11)).unwrap() - 180.0).abs() < 1e-9);
        assert!((a.planet_price() - 324.0).abs() < 1e-9);
    }

    #[test]
    fn test_failed_purchase_keeps_price() {
        let mut a = account();
        let before = a.clone();

        let err = a.buy_planet(PlanetId(10)).unwrap_err();
        assert!(matches!(
            err,
            GameError::InsufficientResources {
                resource: "moongems",
                ..
            }
        ));
        assert_eq!(a, before);
    }
}
