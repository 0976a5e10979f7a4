//! Account maintenance operations.

use std::sync::Arc;

use payv_shared::types::{AccountId, LedgerId};
use tracing::info;

use crate::account::Account;
use crate::error::{ensure_ledger, EntityKind, LedgerError};
use crate::store::{in_unit_of_work, load_account, AccountStore, LedgerStore};

/// Opens, renames and reads accounts.
///
/// Balances are never touched here; they move only through posting.
pub struct AccountService<S> {
    store: Arc<S>,
}

impl<S: LedgerStore> AccountService<S> {
    /// Creates a service backed by `store`.
    #[must_use]
    pub const fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Opens a new account with a zero balance.
    ///
    /// # Errors
    ///
    /// Returns `InvalidName` for a blank name or a storage error.
    pub fn open(&self, ledger_id: LedgerId, name: &str) -> Result<Account, LedgerError> {
        in_unit_of_work(self.store.as_ref(), "account.open", |txn| {
            let account = Account::open(ledger_id, name)?;
            txn.save_account(&account)?;
            info!(account_id = %account.id(), ledger_id = %ledger_id, "Account opened");
            Ok(account.committed())
        })
    }

    /// Renames an account of `ledger_id`.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound`, `LedgerMismatch` or `InvalidName`.
    pub fn rename(
        &self,
        ledger_id: LedgerId,
        account_id: AccountId,
        name: &str,
    ) -> Result<Account, LedgerError> {
        in_unit_of_work(self.store.as_ref(), "account.rename", |txn| {
            let mut account = load_account(txn, account_id)?;
            ensure_ledger(EntityKind::Account, ledger_id, account.ledger_id())?;
            account.rename(name)?;
            txn.save_account(&account)?;
            info!(account_id = %account_id, "Account renamed");
            Ok(account.committed())
        })
    }

    /// Lists the accounts of a ledger ordered by name.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub fn list_by_ledger(&self, ledger_id: LedgerId) -> Result<Vec<Account>, LedgerError> {
        in_unit_of_work(self.store.as_ref(), "account.list", |txn| {
            let mut accounts = txn.find_accounts_by_ledger(ledger_id)?;
            accounts.sort_by(|a, b| a.name().cmp(b.name()).then(a.id().cmp(&b.id())));
            Ok(accounts)
        })
    }

    /// Loads a single account.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` or a storage error.
    pub fn get_details(&self, account_id: AccountId) -> Result<Account, LedgerError> {
        in_unit_of_work(self.store.as_ref(), "account.get", |txn| {
            load_account(txn, account_id)
        })
    }
}
