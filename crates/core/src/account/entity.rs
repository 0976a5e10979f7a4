//! Account entity.

use chrono::{DateTime, Utc};
use payv_shared::types::{AccountId, LedgerId, Money, MoneyError};
use serde::{Deserialize, Serialize};

use crate::error::{EntityKind, LedgerError};

/// An account holding a running balance within one ledger.
///
/// Balances never go negative: a debit larger than the balance is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    id: AccountId,
    ledger_id: LedgerId,
    name: String,
    #[serde(default)]
    balance: Money,
    /// Optimistic concurrency counter, bumped by the store on every save.
    #[serde(default)]
    version: u64,
    created_at: DateTime<Utc>,
}

impl Account {
    /// Opens a new account with a zero balance.
    ///
    /// # Errors
    ///
    /// Returns `InvalidName` if the trimmed name is empty.
    pub fn open(ledger_id: LedgerId, name: &str) -> Result<Self, LedgerError> {
        Ok(Self {
            id: AccountId::new(),
            ledger_id,
            name: normalize_name(name)?,
            balance: Money::ZERO,
            version: 0,
            created_at: Utc::now(),
        })
    }

    /// Returns the account ID.
    #[must_use]
    pub const fn id(&self) -> AccountId {
        self.id
    }

    /// Returns the owning ledger.
    #[must_use]
    pub const fn ledger_id(&self) -> LedgerId {
        self.ledger_id
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the current balance.
    #[must_use]
    pub const fn balance(&self) -> Money {
        self.balance
    }

    /// Returns the version this copy was loaded at.
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Returns when the account was opened.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Increases the balance.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAmount` if the balance would overflow.
    pub fn credit(&mut self, amount: Money) -> Result<(), LedgerError> {
        self.balance = self.balance.checked_add(amount)?;
        Ok(())
    }

    /// Decreases the balance. The balance is left untouched on failure.
    ///
    /// # Errors
    ///
    /// Returns `InsufficientFunds` if the balance is smaller than `amount`.
    pub fn debit(&mut self, amount: Money) -> Result<(), LedgerError> {
        self.balance = self.balance.checked_sub(amount).map_err(|err| match err {
            MoneyError::NegativeResult { .. } => LedgerError::InsufficientFunds {
                account_id: self.id,
                balance: self.balance,
                requested: amount,
            },
            other => LedgerError::InvalidAmount(other),
        })?;
        Ok(())
    }

    /// Renames the account.
    ///
    /// # Errors
    ///
    /// Returns `InvalidName` if the trimmed name is empty.
    pub fn rename(&mut self, name: &str) -> Result<(), LedgerError> {
        self.name = normalize_name(name)?;
        Ok(())
    }

    /// Returns the copy a store persists when it accepts a save of this account.
    ///
    /// The version wraps at `u64::MAX`; stores only compare it for equality.
    #[must_use]
    pub fn committed(&self) -> Self {
        Self {
            version: self.version.wrapping_add(1),
            ..self.clone()
        }
    }
}

fn normalize_name(name: &str) -> Result<String, LedgerError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(LedgerError::InvalidName(EntityKind::Account));
    }
    Ok(trimmed.to_string())
}
