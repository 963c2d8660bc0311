//! Galaxy: the single owner of all simulation state.
//!
//! A [`Galaxy`] holds the planet and account registries plus every active
//! attack session and advances them together through [`Galaxy::tick`].
//! Drivers talk to it either through its methods or through serialisable
//! [`GalaxyCommand`]s, which is what replays record.
//!
//! # Tick order
//!
//! Each tick runs in a fixed order so identical inputs give identical state:
//! 1. **Production** - every planet accrues, ascending planet id
//! 2. **Attacks** - every active session advances, ascending attacker id
//!
//! A tick that crosses a phase transition is split at that instant and the
//! two steps repeat for each piece, so combat reads the defender as it was
//! when the attack landed. One large tick and many small ones agree.
//!
//! # Example
//!
//! ```
//! use stardust_core::galaxy::Galaxy;
//! use stardust_core::math::seconds;
//!
//! let mut galaxy = Galaxy::default();
//! let alice = galaxy.create_account("Alice").unwrap();
//! let bob = galaxy.create_account("Bob").unwrap();
//!
//! galaxy.launch_attack(alice.planet, bob.planet, 1.0).unwrap();
//! let events = galaxy.tick(seconds(60)).unwrap();
//! assert_eq!(events.attack_events.len(), 1);
//! ```

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::account::{Account, AccountId, AccountView, Currency};
use crate::attack::{AttackEvent, AttackPhase, AttackSession, AttackView, LaunchReport};
use crate::config::GameConfig;
use crate::error::{GameError, Result};
use crate::math::{fixed_serde, seconds_serde, to_seconds_f64, Fixed};
use crate::planet::{Planet, PlanetId, PlanetView, UpgradeReport};
use crate::registry::{AccountRegistry, PlanetRegistry};
use crate::shop::{Purchase, Shop};

/// Ids created for a new account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountCreated {
    /// The new account.
    pub account: AccountId,
    /// Its initial planet.
    pub planet: PlanetId,
}

/// Events produced by one [`Galaxy::tick`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TickEvents {
    /// Time advanced by this tick.
    #[serde(with = "seconds_serde")]
    pub dt: Fixed,
    /// Attack transitions, in attacker id order.
    pub attack_events: Vec<AttackEvent>,
}

/// A serialisable request against a galaxy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GalaxyCommand {
    /// Create an account and its initial planet.
    CreateAccount {
        /// Unique account name.
        name: String,
    },
    /// Create a planet, optionally owned by an existing account.
    CreatePlanet {
        /// Owning account.
        owner: Option<AccountId>,
    },
    /// Launch a fraction of the attacker's ships.
    Launch {
        /// Attacking planet.
        attacker: PlanetId,
        /// Target planet.
        defender: PlanetId,
        /// Fraction of whole ships, within `0..=1`.
        fraction: f64,
    },
    /// Launch an exact number of ships.
    LaunchShips {
        /// Attacking planet.
        attacker: PlanetId,
        /// Target planet.
        defender: PlanetId,
        /// Ships to commit.
        ships: u64,
    },
    /// Upgrade a planet.
    Upgrade {
        /// Planet to upgrade.
        planet: PlanetId,
    },
    /// Buy a new planet with account moongems.
    BuyPlanet {
        /// Buying account.
        account: AccountId,
    },
    /// Buy the shop's ship bundle.
    BuyShips {
        /// Buying account.
        account: AccountId,
    },
    /// Buy the shop's moongem bundle.
    BuyMoongems {
        /// Buying account.
        account: AccountId,
    },
    /// Pause or resume production on a planet.
    SetProducing {
        /// Target planet.
        planet: PlanetId,
        /// New production state.
        producing: bool,
    },
    /// Delete a planet.
    RemovePlanet {
        /// Planet to delete.
        planet: PlanetId,
    },
    /// Delete an account, leaving its planets unowned.
    RemoveAccount {
        /// Account to delete.
        account: AccountId,
    },
    /// Advance time.
    Tick {
        /// Seconds to advance.
        #[serde(with = "seconds_serde")]
        seconds: Fixed,
    },
}

/// Result of a successfully applied [`GalaxyCommand`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandOutcome {
    /// Account and initial planet created.
    AccountCreated(AccountCreated),
    /// Planet created.
    PlanetCreated(PlanetId),
    /// Attack launched.
    Launched(LaunchReport),
    /// Planet upgraded.
    Upgraded(UpgradeReport),
    /// Planet bought.
    PlanetBought {
        /// The new planet.
        planet: PlanetId,
        /// Moongems paid.
        price: f64,
    },
    /// Shop purchase completed.
    Purchased(Purchase),
    /// Production flag changed.
    ProducingSet,
    /// Planet deleted.
    PlanetRemoved(PlanetId),
    /// Account deleted.
    AccountRemoved(AccountId),
    /// Time advanced.
    Ticked(TickEvents),
}

/// Whole-galaxy snapshot for presentation layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GalaxyView {
    /// Simulated seconds since creation.
    pub elapsed_seconds: f64,
    /// Planets in id order.
    pub planets: Vec<PlanetView>,
    /// Accounts in id order.
    pub accounts: Vec<AccountView>,
    /// Active attacks in attacker id order.
    pub attacks: Vec<AttackView>,
}

/// The complete simulation state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Galaxy {
    config: GameConfig,
    #[serde(with = "fixed_serde")]
    elapsed: Fixed,
    planets: PlanetRegistry,
    accounts: AccountRegistry,
    /// Only sessions that are attacking or cooling down are kept.
    sessions: BTreeMap<PlanetId, AttackSession>,
    shop: Shop,
}

impl Galaxy {
    /// Create an empty galaxy with a validated configuration.
    ///
    /// # Errors
    /// Returns [`GameError::InvalidConfig`] if the configuration is invalid.
    pub fn new(config: GameConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_config_unchecked(config))
    }

    fn with_config_unchecked(config: GameConfig) -> Self {
        let shop = Shop::new(config.shop.clone());
        Self {
            config,
            elapsed: Fixed::ZERO,
            planets: PlanetRegistry::new(),
            accounts: AccountRegistry::new(),
            sessions: BTreeMap::new(),
            shop,
        }
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Simulated time since creation.
    #[must_use]
    pub const fn elapsed(&self) -> Fixed {
        self.elapsed
    }

    /// Planet registry.
    #[must_use]
    pub const fn planets(&self) -> &PlanetRegistry {
        &self.planets
    }

    /// Account registry.
    #[must_use]
    pub const fn accounts(&self) -> &AccountRegistry {
        &self.accounts
    }

    /// Get a planet by id.
    #[must_use]
    pub fn planet(&self, id: PlanetId) -> Option<&Planet> {
        self.planets.get(id)
    }

    /// Get an account by id.
    #[must_use]
    pub fn account(&self, id: AccountId) -> Option<&Account> {
        self.accounts.get(id)
    }

    /// Get an account by name.
    ///
    /// # Errors
    /// Returns [`GameError::AccountNameNotFound`] for an unknown name.
    pub fn account_by_name(&self, name: &str) -> Result<&Account> {
        self.accounts
            .get_by_name(name)
            .ok_or_else(|| GameError::AccountNameNotFound(name.to_string()))
    }

    /// Active session for an attacking planet.
    #[must_use]
    pub fn session(&self, attacker: PlanetId) -> Option<&AttackSession> {
        self.sessions.get(&attacker)
    }

    /// Attack phase of a planet; idle when it has no active session.
    #[must_use]
    pub fn attack_phase(&self, attacker: PlanetId) -> AttackPhase {
        self.sessions
            .get(&attacker)
            .map_or(AttackPhase::Idle, AttackSession::phase)
    }

    /// Create an account with its initial planet.
    ///
    /// # Errors
    /// Returns [`GameError::DuplicateAccount`] if the name is taken.
    pub fn create_account(&mut self, name: &str) -> Result<AccountCreated> {
        let account = self.accounts.create(name, &self.config.account)?;
        let planet = self.planets.create(Some(account), &self.config.planet);
        self.accounts.require_mut(account)?.add_planet(planet);

        info!(account = %account, name, planet = %planet, "Account created");
        Ok(AccountCreated { account, planet })
    }

    /// Create a planet from configured defaults.
    ///
    /// # Errors
    /// Returns [`GameError::AccountNotFound`] for an unknown owner.
    pub fn create_planet(&mut self, owner: Option<AccountId>) -> Result<PlanetId> {
        let planet = Planet::new(PlanetId(0), owner, &self.config.planet);
        self.insert_planet(planet)
    }

    /// Register a planet built elsewhere; it receives the next free id.
    ///
    /// An owned planet is appended to its owner's planet list.
    ///
    /// # Errors
    /// Returns [`GameError::AccountNotFound`] for an unknown owner.
    pub fn insert_planet(&mut self, planet: Planet) -> Result<PlanetId> {
        if let Some(owner) = planet.owner() {
            self.accounts.require(owner)?;
        }
        let owner = planet.owner();
        let id = self.planets.insert(planet);
        if let Some(owner) = owner {
            self.accounts.require_mut(owner)?.add_planet(id);
        }
        debug!(planet = %id, ?owner, "Planet registered");
        Ok(id)
    }

    /// Delete a planet that is not part of an active attack.
    ///
    /// # Errors
    /// - [`GameError::PlanetNotFound`] for an unknown planet
    /// - [`GameError::PlanetEngaged`] while it attacks or is being attacked
    pub fn remove_planet(&mut self, id: PlanetId) -> Result<Planet> {
        self.planets.require(id)?;
        let engaged = self
            .sessions
            .values()
            .any(|s| s.attacker() == id || s.defender() == Some(id));
        if engaged {
            warn!(planet = %id, "Cannot remove a planet engaged in an attack");
            return Err(GameError::PlanetEngaged(id));
        }

        let planet = self.planets.remove(id).ok_or(GameError::PlanetNotFound(id))?;
        if let Some(account) = planet.owner().and_then(|owner| self.accounts.get_mut(owner)) {
            account.remove_planet(id);
        }
        info!(planet = %id, "Planet removed");
        Ok(planet)
    }

    /// Delete an account. Its planets stay in the galaxy without an owner.
    ///
    /// # Errors
    /// Returns [`GameError::AccountNotFound`] for an unknown account.
    pub fn remove_account(&mut self, id: AccountId) -> Result<Account> {
        let account = self.accounts.remove(id).ok_or(GameError::AccountNotFound(id))?;
        for planet in account.planets() {
            if let Some(planet) = self.planets.get_mut(*planet) {
                planet.set_owner(None);
            }
        }
        info!(account = %id, planets = account.planet_count(), "Account removed");
        Ok(account)
    }

    fn with_session<T>(
        &mut self,
        attacker: PlanetId,
        f: impl FnOnce(&mut AttackSession, &mut PlanetRegistry) -> Result<T>,
    ) -> Result<T> {
        let mut session = self.sessions.remove(&attacker).unwrap_or_else(|| {
            AttackSession::new(
                attacker,
                self.config.attack.clone(),
                self.config.combat.clone(),
            )
        });
        let result = f(&mut session, &mut self.planets);
        if session.is_busy() {
            self.sessions.insert(attacker, session);
        }
        result
    }

    /// Launch a fraction of the attacker's whole ships.
    ///
    /// # Errors
    /// See [`AttackSession::launch`].
    pub fn launch_attack(
        &mut self,
        attacker: PlanetId,
        defender: PlanetId,
        fraction: f64,
    ) -> Result<LaunchReport> {
        self.with_session(attacker, |session, planets| {
            session.launch(planets, defender, fraction)
        })
    }

    /// Launch an exact number of ships.
    ///
    /// # Errors
    /// See [`AttackSession::launch_ships`].
    pub fn launch_ships(
        &mut self,
        attacker: PlanetId,
        defender: PlanetId,
        ships: u64,
    ) -> Result<LaunchReport> {
        self.with_session(attacker, |session, planets| {
            session.launch_ships(planets, defender, ships)
        })
    }

    /// Upgrade a planet with its own stardust.
    ///
    /// # Errors
    /// [`GameError::PlanetNotFound`] or [`GameError::InsufficientResources`].
    pub fn upgrade_planet(&mut self, id: PlanetId) -> Result<UpgradeReport> {
        self.planets.require_mut(id)?.upgrade()
    }

    /// Pause or resume production on a planet.
    ///
    /// # Errors
    /// Returns [`GameError::PlanetNotFound`] for an unknown planet.
    pub fn set_producing(&mut self, id: PlanetId, producing: bool) -> Result<()> {
        self.planets.require_mut(id)?.set_producing(producing);
        debug!(planet = %id, producing, "Production toggled");
        Ok(())
    }

    /// Buy a new planet with account moongems.
    ///
    /// A refused purchase creates nothing.
    ///
    /// # Errors
    /// [`GameError::AccountNotFound`] or [`GameError::InsufficientResources`].
    pub fn buy_planet(&mut self, account_id: AccountId) -> Result<(PlanetId, f64)> {
        let account = self.accounts.require(account_id)?;
        if !account.can_buy_planet() {
            return Err(GameError::InsufficientResources {
                resource: "moongems",
                required: account.planet_price(),
                available: account.balance(Currency::Moongems),
            });
        }

        let planet = self.planets.create(Some(account_id), &self.config.planet);
        match self.accounts.require_mut(account_id)?.buy_planet(planet) {
            Ok(price) => Ok((planet, price)),
            Err(e) => {
                self.planets.remove(planet);
                Err(e)
            }
        }
    }

    /// Buy the shop's ship bundle.
    ///
    /// # Errors
    /// [`GameError::AccountNotFound`] or [`GameError::InsufficientResources`].
    pub fn buy_ship_bundle(&mut self, account: AccountId) -> Result<Purchase> {
        let account = self.accounts.require_mut(account)?;
        self.shop.buy_ship_bundle(account)
    }

    /// Buy the shop's moongem bundle.
    ///
    /// # Errors
    /// [`GameError::AccountNotFound`] or [`GameError::InsufficientResources`].
    pub fn buy_moongems(&mut self, account: AccountId) -> Result<Purchase> {
        let account = self.accounts.require_mut(account)?;
        self.shop.buy_moongems(account)
    }

    /// Advance the whole galaxy by `dt`.
    ///
    /// # Errors
    /// Returns [`GameError::NegativeElapsed`] for a negative `dt`; nothing
    /// changes in that case.
    pub fn tick(&mut self, dt: Fixed) -> Result<TickEvents> {
        if dt < Fixed::ZERO {
            return Err(GameError::NegativeElapsed);
        }

        let mut attack_events = Vec::new();
        let mut left = dt;
        loop {
            // Stop at the next due transition so it sees planets as of that instant
            let step = self
                .sessions
                .values()
                .filter_map(AttackSession::remaining)
                .min()
                .map_or(left, |due| due.clamp(Fixed::ZERO, left));

            // 1. Production
            for id in self.planets.sorted_ids() {
                self.planets.require_mut(id)?.accrue(step)?;
            }

            // 2. Attack sessions
            for session in self.sessions.values_mut() {
                attack_events.extend(session.tick(step, &mut self.planets)?);
            }
            self.sessions.retain(|_, session| session.is_busy());

            left -= step;
            if left <= Fixed::ZERO {
                break;
            }
        }

        self.elapsed = self.elapsed.saturating_add(dt);

        #[cfg(feature = "debug-validation")]
        self.check_invariants()?;

        #[cfg(debug_assertions)]
        {
            let hash = self.state_hash();
            debug!(
                elapsed = to_seconds_f64(self.elapsed),
                state_hash = hash,
                "Galaxy state hash"
            );
        }

        Ok(TickEvents { dt, attack_events })
    }

    /// Apply a command.
    ///
    /// # Errors
    /// Propagates the error of the underlying operation.
    pub fn apply(&mut self, command: GalaxyCommand) -> Result<CommandOutcome> {
        match command {
            GalaxyCommand::CreateAccount { name } => {
                self.create_account(&name).map(CommandOutcome::AccountCreated)
            }
            GalaxyCommand::CreatePlanet { owner } => {
                self.create_planet(owner).map(CommandOutcome::PlanetCreated)
            }
            GalaxyCommand::Launch {
                attacker,
                defender,
                fraction,
            } => self
                .launch_attack(attacker, defender, fraction)
                .map(CommandOutcome::Launched),
            GalaxyCommand::LaunchShips {
                attacker,
                defender,
                ships,
            } => self
                .launch_ships(attacker, defender, ships)
                .map(CommandOutcome::Launched),
            GalaxyCommand::Upgrade { planet } => {
                self.upgrade_planet(planet).map(CommandOutcome::Upgraded)
            }
            GalaxyCommand::BuyPlanet { account } => self
                .buy_planet(account)
                .map(|(planet, price)| CommandOutcome::PlanetBought { planet, price }),
            GalaxyCommand::BuyShips { account } => {
                self.buy_ship_bundle(account).map(CommandOutcome::Purchased)
            }
            GalaxyCommand::BuyMoongems { account } => {
                self.buy_moongems(account).map(CommandOutcome::Purchased)
            }
            GalaxyCommand::SetProducing { planet, producing } => self
                .set_producing(planet, producing)
                .map(|()| CommandOutcome::ProducingSet),
            GalaxyCommand::RemovePlanet { planet } => self
                .remove_planet(planet)
                .map(|p| CommandOutcome::PlanetRemoved(p.id())),
            GalaxyCommand::RemoveAccount { account } => self
                .remove_account(account)
                .map(|a| CommandOutcome::AccountRemoved(a.id())),
            GalaxyCommand::Tick { seconds } => self.tick(seconds).map(CommandOutcome::Ticked),
        }
    }

    /// Verify ownership links and planet counters.
    ///
    /// # Errors
    /// Returns [`GameError::InvalidState`] describing the first violation.
    pub fn check_invariants(&self) -> Result<()> {
        for id in self.planets.sorted_ids() {
            let planet = self.planets.require(id)?;
            if planet.ships_exact() < 0.0 || planet.stardust_exact() < 0.0 {
                return Err(GameError::InvalidState(format!(
                    "planet {id} has negative resources"
                )));
            }
            if planet.level() < 1 || planet.upgrade_cost() <= 0.0 {
                return Err(GameError::InvalidState(format!(
                    "planet {id} has an invalid level or upgrade cost"
                )));
            }
            if let Some(owner) = planet.owner() {
                if !self.accounts.get(owner).is_some_and(|a| a.owns(id)) {
                    return Err(GameError::InvalidState(format!(
                        "planet {id} is not listed by its owner {owner}"
                    )));
                }
            }
        }

        for id in self.accounts.sorted_ids() {
            let account = self.accounts.require(id)?;
            for planet in account.planets() {
                if self.planets.get(*planet).and_then(Planet::owner) != Some(id) {
                    return Err(GameError::InvalidState(format!(
                        "account {id} lists planet {planet} it does not own"
                    )));
                }
            }
        }

        for attacker in self.sessions.keys() {
            if !self.planets.contains(*attacker) {
                return Err(GameError::InvalidState(format!(
                    "attack session for missing planet {attacker}"
                )));
            }
        }
        Ok(())
    }

    /// Snapshot of everything a player can see.
    #[must_use]
    pub fn view(&self) -> GalaxyView {
        GalaxyView {
            elapsed_seconds: to_seconds_f64(self.elapsed),
            planets: self
                .planets
                .sorted_ids()
                .into_iter()
                .filter_map(|id| self.planets.get(id).map(Planet::view))
                .collect(),
            accounts: self
                .accounts
                .sorted_ids()
                .into_iter()
                .filter_map(|id| self.accounts.get(id).map(Account::view))
                .collect(),
            attacks: self.sessions.values().map(AttackSession::view).collect(),
        }
    }

    /// Hash of the complete simulation state.
    ///
    /// Two galaxies that went through the same commands produce the same
    /// hash.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.elapsed.to_bits().hash(&mut hasher);

        let planet_ids = self.planets.sorted_ids();
        planet_ids.len().hash(&mut hasher);
        for planet in planet_ids.into_iter().filter_map(|id| self.planets.get(id)) {
            planet.hash_state(&mut hasher);
        }

        let account_ids = self.accounts.sorted_ids();
        account_ids.len().hash(&mut hasher);
        for account in account_ids.into_iter().filter_map(|id| self.accounts.get(id)) {
            account.hash_state(&mut hasher);
        }

        self.sessions.len().hash(&mut hasher);
        for session in self.sessions.values() {
            session.hash_state(&mut hasher);
        }

        hasher.finish()
    }

    /// Serialize the galaxy for snapshots and replays.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| GameError::InvalidState(format!("Failed to serialize galaxy: {e}")))
    }

    /// Restore a galaxy from [`Self::serialize`] output.
    ///
    /// # Errors
    /// Returns an error if the bytes do not decode to a galaxy.
    pub fn deserialize(data: &[u8]) -> Result<Self> {
        bincode::deserialize(data)
            .map_err(|e| GameError::InvalidState(format!("Failed to deserialize galaxy: {e}")))
    }
}

impl Default for Galaxy {
    fn default() -> Self {
        Self::with_config_unchecked(GameConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::AttackResult;
    use crate::math::seconds;

    #[test]
    fn test_create_account_gets_initial_planet() {
        let mut galaxy = Galaxy::default();
        let created = galaxy.create_account("Alice").unwrap();

        assert_eq!(created.account, AccountId(1));
        assert_eq!(created.planet, PlanetId(1));
        let account = galaxy.account(created.account).unwrap();
        assert_eq!(account.planets(), &[created.planet]);
        assert_eq!(
            galaxy.planet(created.planet).unwrap().owner(),
            Some(created.account)
        );
        assert_eq!(galaxy.account_by_name("Alice").unwrap().id(), created.account);
        assert!(matches!(
            galaxy.account_by_name("Nobody"),
            Err(GameError::AccountNameNotFound(_))
        ));
    }

    #[test]
    fn test_duplicate_account_creates_nothing() {
        let mut galaxy = Galaxy::default();
        galaxy.create_account("Alice").unwrap();
        assert!(galaxy.create_account("Alice").is_err());
        assert_eq!(galaxy.planets().len(), 1);
    }

    #[test]
    fn test_tick_accrues_then_attacks() {
        let mut galaxy = Galaxy::default();
        let alice = galaxy.create_account("Alice").unwrap();
        let bob = galaxy.create_account("Bob").unwrap();

        let report = galaxy.launch_attack(alice.planet, bob.planet, 1.0).unwrap();
        assert_eq!(report.ships, 100);
        assert_eq!(galaxy.attack_phase(alice.planet), AttackPhase::Attacking);

        let events = galaxy.tick(seconds(60)).unwrap();
        assert_eq!(events.attack_events.len(), 1);
        // 100 ships against 100 base + 101 / 2 = 150 defense
        assert_eq!(
            galaxy.session(alice.planet).unwrap().last_outcome(),
            Some(AttackResult::Loss)
        );
        assert_eq!(galaxy.attack_phase(alice.planet), AttackPhase::Cooldown);

        galaxy.tick(seconds(30)).unwrap();
        assert_eq!(galaxy.attack_phase(alice.planet), AttackPhase::Idle);
        assert!(galaxy.session(alice.planet).is_none());
        assert_eq!(galaxy.elapsed(), seconds(90));
    }

    #[test]
    fn test_zero_durations_finish_within_zero_tick() {
        let mut config = GameConfig::default();
        config.attack.attack_duration = Fixed::ZERO;
        config.attack.cooldown_duration = Fixed::ZERO;
        let mut galaxy = Galaxy::new(config).unwrap();
        let alice = galaxy.create_account("Alice").unwrap();
        let bob = galaxy.create_account("Bob").unwrap();

        galaxy.launch_attack(alice.planet, bob.planet, 1.0).unwrap();
        let events = galaxy.tick(Fixed::ZERO).unwrap();
        assert_eq!(events.attack_events.len(), 2);
        assert!(galaxy.session(alice.planet).is_none());
        assert_eq!(galaxy.elapsed(), Fixed::ZERO);
    }

    #[test]
    fn test_failed_launch_keeps_no_session() {
        let mut galaxy = Galaxy::default();
        let alice = galaxy.create_account("Alice").unwrap();
        let hash = galaxy.state_hash();

        assert!(galaxy
            .launch_attack(alice.planet, PlanetId(77), 0.5)
            .is_err());
        assert!(galaxy.session(alice.planet).is_none());
        assert_eq!(galaxy.state_hash(), hash);
    }

    #[test]
    fn test_remove_engaged_planet_refused() {
        let mut galaxy = Galaxy::default();
        let alice = galaxy.create_account("Alice").unwrap();
        let bob = galaxy.create_account("Bob").unwrap();
        galaxy.launch_attack(alice.planet, bob.planet, 0.5).unwrap();

        assert!(matches!(
            galaxy.remove_planet(bob.planet),
            Err(GameError::PlanetEngaged(_))
        ));
        assert!(matches!(
            galaxy.remove_planet(alice.planet),
            Err(GameError::PlanetEngaged(_))
        ));

        galaxy.tick(seconds(90)).unwrap();
        let removed = galaxy.remove_planet(bob.planet).unwrap();
        assert_eq!(removed.id(), bob.planet);
        assert_eq!(galaxy.account(bob.account).unwrap().planet_count(), 0);
    }

    #[test]
    fn test_remove_account_orphans_planets() {
        let mut galaxy = Galaxy::default();
        let alice = galaxy.create_account("Alice").unwrap();

        galaxy.remove_account(alice.account).unwrap();
        assert!(galaxy.planet(alice.planet).unwrap().owner().is_none());
        assert!(galaxy.account_by_name("Alice").is_err());
        assert!(galaxy.create_account("Alice").is_ok());
    }

    #[test]
    fn test_buy_planet() {
        let mut galaxy = Galaxy::default();
        let alice = galaxy.create_account("Alice").unwrap();

        // 50 starting moongems is not enough for the first planet
        assert!(galaxy.buy_planet(alice.account).is_err());
        assert_eq!(galaxy.planets().len(), 1);

        galaxy.buy_moongems(alice.account).unwrap();
        let (planet, price) = galaxy.buy_planet(alice.account).unwrap();
        assert_eq!(price, 100.0);

        let account = galaxy.account(alice.account).unwrap();
        assert_eq!(account.planets(), &[alice.planet, planet]);
        assert_eq!(account.balance(Currency::Moongems), 0.0);
        assert_eq!(galaxy.planet(planet).unwrap().owner(), Some(alice.account));
        assert!(galaxy.check_invariants().is_ok());
    }

    #[test]
    fn test_negative_tick_changes_nothing() {
        let mut galaxy = Galaxy::default();
        galaxy.create_account("Alice").unwrap();
        let hash = galaxy.state_hash();

        assert!(matches!(
            galaxy.tick(seconds(-5)),
            Err(GameError::NegativeElapsed)
        ));
        assert_eq!(galaxy.state_hash(), hash);
    }

    #[test]
    fn test_apply_commands() {
        let mut galaxy = Galaxy::default();
        let outcome = galaxy
            .apply(GalaxyCommand::CreateAccount {
                name: "Alice".to_string(),
            })
            .unwrap();
        let CommandOutcome::AccountCreated(alice) = outcome else {
            panic!("unexpected outcome: {outcome:?}");
        };

        let outcome = galaxy
            .apply(GalaxyCommand::CreatePlanet { owner: None })
            .unwrap();
        assert_eq!(outcome, CommandOutcome::PlanetCreated(PlanetId(2)));

        galaxy
            .apply(GalaxyCommand::LaunchShips {
                attacker: alice.planet,
                defender: PlanetId(2),
                ships: 10,
            })
            .unwrap();
        let outcome = galaxy
            .apply(GalaxyCommand::Tick {
                seconds: seconds(60),
            })
            .unwrap();
        assert!(matches!(outcome, CommandOutcome::Ticked(ref e) if e.attack_events.len() == 1));

        assert!(galaxy
            .apply(GalaxyCommand::Upgrade {
                planet: PlanetId(9)
            })
            .is_err());
    }

    #[test]
    fn test_serialize_roundtrip_preserves_hash() {
        let mut galaxy = Galaxy::default();
        let alice = galaxy.create_account("Alice").unwrap();
        let bob = galaxy.create_account("Bob").unwrap();
        galaxy.launch_attack(alice.planet, bob.planet, 0.75).unwrap();
        galaxy.tick(seconds(20)).unwrap();

        let bytes = galaxy.serialize().unwrap();
        let mut restored = Galaxy::deserialize(&bytes).unwrap();
        assert_eq!(restored.state_hash(), galaxy.state_hash());

        galaxy.tick(seconds(70)).unwrap();
        restored.tick(seconds(70)).unwrap();
        assert_eq!(restored.state_hash(), galaxy.state_hash());
        assert_eq!(restored.view(), galaxy.view());
    }

    #[test]
    fn test_view_lists_in_id_order() {
        let mut galaxy = Galaxy::default();
        galaxy.create_account("Bob").unwrap();
        galaxy.create_account("Alice").unwrap();

        let view = galaxy.view();
        assert_eq!(view.accounts[0].name, "Bob");
        assert_eq!(view.planets[1].id, PlanetId(2));
        assert!(view.attacks.is_empty());
    }
}
