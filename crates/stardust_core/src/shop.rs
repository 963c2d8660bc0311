//! Stardust-priced shop offers.
//!
//! Both offers are all-or-nothing: the account is checked before anything is
//! deducted, so a refused purchase leaves it untouched.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::account::{Account, Currency};
use crate::config::ShopConfig;
use crate::error::{GameError, Result};

/// What a completed purchase moved.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Purchase {
    /// Currency paid.
    pub paid_with: Currency,
    /// Amount paid.
    pub cost: f64,
    /// Currency received.
    pub received: Currency,
    /// Amount received.
    pub amount: f64,
}

/// Shop offers with their configured prices.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Shop {
    config: ShopConfig,
}

impl Shop {
    /// Create a shop selling at the configured prices.
    #[must_use]
    pub const fn new(config: ShopConfig) -> Self {
        Self { config }
    }

    /// Configured prices.
    #[must_use]
    pub const fn config(&self) -> &ShopConfig {
        &self.config
    }

    /// Stardust price of a full moongem bundle.
    #[must_use]
    pub fn moongem_bundle_cost(&self) -> f64 {
        self.config.moongem_bundle_size * self.config.moongem_price
    }

    /// Trade stardust for a bundle of account ships.
    ///
    /// # Errors
    /// Returns [`GameError::InsufficientResources`] when stardust is short.
    pub fn buy_ship_bundle(&self, account: &mut Account) -> Result<Purchase> {
        self.trade(
            account,
            Currency::Stardust,
            self.config.ship_bundle_cost,
            Currency::Ships,
            self.config.ship_bundle_size,
        )
    }

    /// Trade stardust for a bundle of moongems.
    ///
    /// # Errors
    /// Returns [`GameError::InsufficientResources`] when stardust is short.
    pub fn buy_moongems(&self, account: &mut Account) -> Result<Purchase> {
        self.trade(
            account,
            Currency::Stardust,
            self.moongem_bundle_cost(),
            Currency::Moongems,
            self.config.moongem_bundle_size,
        )
    }

    fn trade(
        &self,
        account: &mut Account,
        paid_with: Currency,
        cost: f64,
        received: Currency,
        amount: f64,
    ) -> Result<Purchase> {
        if !account.can_afford(paid_with, cost) {
            warn!(
                account = %account.id(),
                currency = paid_with.name(),
                cost,
                balance = account.balance(paid_with),
                "Purchase refused"
            );
            return Err(GameError::InsufficientResources {
                resource: paid_with.name(),
                required: cost,
                available: account.balance(paid_with),
            });
        }

        account.spend(paid_with, cost)?;
        account.add(received, amount)?;
        info!(
            account = %account.id(),
            paid = cost,
            paid_with = paid_with.name(),
            received = amount,
            item = received.name(),
            "Purchase completed"
        );

        Ok(Purchase {
            paid_with,
            cost,
            received,
            amount,
        })
    }
}
