//! Point balance spent on seeds and earned from harvests.

use huerto_common::{GardenError, GardenResult};
use serde::{Deserialize, Serialize};

/// A player's point balance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Points {
    balance: u64,
}

impl Points {
    /// Creates a balance holding `initial` points.
    #[must_use]
    pub const fn new(initial: u64) -> Self {
        Self { balance: initial }
    }

    /// Returns the current balance.
    #[must_use]
    pub const fn balance(&self) -> u64 {
        self.balance
    }

    /// Whether the balance covers `amount`.
    #[must_use]
    pub const fn can_afford(&self, amount: u64) -> bool {
        self.balance >= amount
    }

    /// Adds points to the balance.
    pub fn earn(&mut self, amount: u64) {
        self.balance = self.balance.saturating_add(amount);
    }

    /// Removes points from the balance, failing without change if short.
    pub fn spend(&mut self, amount: u64) -> GardenResult<()> {
        if !self.can_afford(amount) {
            return Err(GardenError::InsufficientFunds {
                needed: amount,
                have: self.balance,
            });
        }
        self.balance -= amount;
        Ok(())
    }

    /// Replaces the balance with an authoritative value from the backend.
    pub fn reset(&mut self, balance: u64) {
        self.balance = balance;
    }
}
