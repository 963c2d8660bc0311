//! Id-keyed storage for planets and accounts.
//!
//! Registries are plain owned values passed to whoever needs them. Ids are
//! assigned from a monotonically increasing counter starting at 1 and are
//! never reused, even after removal. Iteration that affects simulation state
//! goes through `sorted_ids` so results do not depend on hash order.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::account::{Account, AccountId};
use crate::config::{AccountConfig, PlanetConfig};
use crate::error::{GameError, Result};
use crate::planet::{Planet, PlanetId};

/// Storage for all planets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanetRegistry {
    planets: HashMap<PlanetId, Planet>,
    next_id: u32,
}

impl PlanetRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            planets: HashMap::new(),
            next_id: 1,
        }
    }

    /// Create a fresh planet and return its id.
    pub fn create(&mut self, owner: Option<AccountId>, config: &PlanetConfig) -> PlanetId {
        let id = PlanetId(self.next_id);
        self.next_id += 1;
        self.planets.insert(id, Planet::new(id, owner, config));
        debug!(planet = %id, ?owner, "Created planet");
        id
    }

    /// Insert a planet built elsewhere, assigning it the next id.
    ///
    /// The planet's own id is replaced.
    pub fn insert(&mut self, planet: Planet) -> PlanetId {
        let id = PlanetId(self.next_id);
        self.next_id += 1;
        let mut planet = planet;
        planet.reassign_id(id);
        self.planets.insert(id, planet);
        id
    }

    /// Remove a planet by id.
    pub fn remove(&mut self, id: PlanetId) -> Option<Planet> {
        let removed = self.planets.remove(&id);
        if removed.is_some() {
            debug!(planet = %id, "Removed planet");
        }
        removed
    }

    /// Get a planet by id.
    #[must_use]
    pub fn get(&self, id: PlanetId) -> Option<&Planet> {
        self.planets.get(&id)
    }

    /// Get a mutable reference to a planet by id.
    pub fn get_mut(&mut self, id: PlanetId) -> Option<&mut Planet> {
        self.planets.get_mut(&id)
    }

    /// Get a planet by id or fail with [`GameError::PlanetNotFound`].
    pub fn require(&self, id: PlanetId) -> Result<&Planet> {
        self.get(id).ok_or(GameError::PlanetNotFound(id))
    }

    /// Mutable variant of [`Self::require`].
    pub fn require_mut(&mut self, id: PlanetId) -> Result<&mut Planet> {
        self.get_mut(id).ok_or(GameError::PlanetNotFound(id))
    }

    /// Borrow two distinct planets mutably at once.
    ///
    /// # Errors
    /// Returns [`GameError::SelfAttack`] when `a == b` and
    /// [`GameError::PlanetNotFound`] when either id is missing.
    pub fn pair_mut(&mut self, a: PlanetId, b: PlanetId) -> Result<(&mut Planet, &mut Planet)> {
        if a == b {
            return Err(GameError::SelfAttack(a));
        }

        let mut first = None;
        let mut second = None;
        for (id, planet) in &mut self.planets {
            if *id == a {
                first = Some(planet);
            } else if *id == b {
                second = Some(planet);
            }
        }

        match (first, second) {
            (Some(first), Some(second)) => Ok((first, second)),
            (None, _) => Err(GameError::PlanetNotFound(a)),
            (_, None) => Err(GameError::PlanetNotFound(b)),
        }
    }

    /// Check if a planet exists.
    #[must_use]
    pub fn contains(&self, id: PlanetId) -> bool {
        self.planets.contains_key(&id)
    }

    /// Number of planets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.planets.len()
    }

    /// Check if the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.planets.is_empty()
    }

    /// Planet ids in ascending order for deterministic iteration.
    #[must_use]
    pub fn sorted_ids(&self) -> Vec<PlanetId> {
        let mut ids: Vec<_> = self.planets.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Iterate over all planets (not in deterministic order).
    pub fn iter(&self) -> impl Iterator<Item = (&PlanetId, &Planet)> {
        self.planets.iter()
    }
}

impl Default for PlanetRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Storage for all accounts, indexed by id and by unique name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountRegistry {
    accounts: HashMap<AccountId, Account>,
    names: HashMap<String, AccountId>,
    next_id: u32,
}

impl AccountRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            accounts: HashMap::new(),
            names: HashMap::new(),
            next_id: 1,
        }
    }

    /// Create an account with configured starting currency.
    ///
    /// # Errors
    /// Returns [`GameError::DuplicateAccount`] if the name is taken.
    pub fn create(&mut self, name: &str, config: &AccountConfig) -> Result<AccountId> {
        if self.names.contains_key(name) {
            warn!(name, "Account already exists");
            return Err(GameError::DuplicateAccount(name.to_string()));
        }

        let id = AccountId(self.next_id);
        self.next_id += 1;
        self.accounts.insert(id, Account::new(id, name, config));
        self.names.insert(name.to_string(), id);
        debug!(account = %id, name, "Created account");
        Ok(id)
    }

    /// Remove an account by id.
    pub fn remove(&mut self, id: AccountId) -> Option<Account> {
        let removed = self.accounts.remove(&id)?;
        self.names.remove(removed.name());
        debug!(account = %id, "Removed account");
        Some(removed)
    }

    /// Get an account by id.
    #[must_use]
    pub fn get(&self, id: AccountId) -> Option<&Account> {
        self.accounts.get(&id)
    }

    /// Get a mutable reference to an account by id.
    pub fn get_mut(&mut self, id: AccountId) -> Option<&mut Account> {
        self.accounts.get_mut(&id)
    }

    /// Get an account by id or fail with [`GameError::AccountNotFound`].
    pub fn require(&self, id: AccountId) -> Result<&Account> {
        self.get(id).ok_or(GameError::AccountNotFound(id))
    }

    /// Mutable variant of [`Self::require`].
    pub fn require_mut(&mut self, id: AccountId) -> Result<&mut Account> {
        self.get_mut(id).ok_or(GameError::AccountNotFound(id))
    }

    /// Resolve an account name to its id.
    #[must_use]
    pub fn id_by_name(&self, name: &str) -> Option<AccountId> {
        self.names.get(name).copied()
    }

    /// Get an account by name.
    #[must_use]
    pub fn get_by_name(&self, name: &str) -> Option<&Account> {
        self.id_by_name(name).and_then(|id| self.accounts.get(&id))
    }

    /// Number of accounts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// Check if the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Account ids in ascending order for deterministic iteration.
    #[must_use]
    pub fn sorted_ids(&self) -> Vec<AccountId> {
        let mut ids: Vec<_> = self.accounts.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

impl Default for AccountRegistry {
    fn default() -> Self {
        Self::new()
    }
}
