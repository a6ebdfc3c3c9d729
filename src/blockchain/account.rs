use std::collections::HashMap;

use thiserror::Error;

use super::crypto::Address;

/// Errors that can occur when moving balances
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccountError {
    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: i64, available: i64 },

    #[error("Balance of {0} would overflow")]
    Overflow(Address),
}

/// Running balances keyed by address.
///
/// Every validation pass builds its own sheet from nothing and throws it away
/// afterwards, so replaying an untrusted chain never touches live state.
#[derive(Debug, Clone, Default)]
pub struct BalanceSheet {
    balances: HashMap<Address, i64>,
}

impl BalanceSheet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Balance of `address`, zero if it has never been seen
    pub fn balance_of(&self, address: &Address) -> i64 {
        self.balances.get(address).copied().unwrap_or(0)
    }

    /// Adds `amount` to `address`, leaving the balance unchanged on overflow
    pub fn credit(&mut self, address: &Address, amount: i64) -> Result<(), AccountError> {
        let balance = self
            .balance_of(address)
            .checked_add(amount)
            .ok_or_else(|| AccountError::Overflow(address.clone()))?;
        self.balances.insert(address.clone(), balance);
        Ok(())
    }

    /// Takes `amount` from `address` if it can cover it
    ///
    /// # Returns
    ///
    /// `InsufficientFunds` (and no change) when the balance is below `amount`
    pub fn debit(&mut self, address: &Address, amount: i64) -> Result<(), AccountError> {
        let available = self.balance_of(address);
        if available < amount {
            return Err(AccountError::InsufficientFunds {
                required: amount,
                available,
            });
        }

        let balance = available
            .checked_sub(amount)
            .ok_or_else(|| AccountError::Overflow(address.clone()))?;
        self.balances.insert(address.clone(), balance);
        Ok(())
    }

    /// Moves `amount` from `from` to `to`; neither balance changes on failure
    pub fn transfer(&mut self, from: &Address, to: &Address, amount: i64) -> Result<(), AccountError> {
        let before = self.balance_of(from);
        self.debit(from, amount)?;
        if let Err(err) = self.credit(to, amount) {
            self.balances.insert(from.clone(), before);
            return Err(err);
        }
        Ok(())
    }
}
