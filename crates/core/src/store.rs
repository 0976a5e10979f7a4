//! Store abstractions consumed by the posting engine.
//!
//! Implementations live outside this crate. Every public engine operation
//! runs inside a single [`StoreTransaction`]: reads and writes go through it,
//! [`StoreTransaction::commit`] publishes them, and dropping it without a
//! commit discards every write.

use chrono::NaiveDate;
use payv_shared::types::{AccountId, CategoryId, LedgerId, TransactionId};
use thiserror::Error;
use tracing::warn;

use crate::account::Account;
use crate::category::Category;
use crate::error::LedgerError;
use crate::transaction::Transaction;

/// Errors raised by store implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The account was changed by another unit of work since it was loaded.
    #[error("Account {account_id} was modified concurrently: expected version {expected}, found {actual}")]
    VersionConflict {
        /// The account ID.
        account_id: AccountId,
        /// The version carried by the entity being saved.
        expected: u64,
        /// The version currently stored.
        actual: u64,
    },

    /// The transaction row changed since this unit of work first read it.
    #[error("Transaction {0} was modified concurrently")]
    StaleTransaction(TransactionId),

    /// The category row changed since this unit of work first read it.
    #[error("Category {0} was modified concurrently")]
    StaleCategory(CategoryId),

    /// Another live category in the ledger already holds the name.
    #[error("Category name '{name}' is already taken in ledger {ledger_id}")]
    DuplicateCategoryName {
        /// The ledger.
        ledger_id: LedgerId,
        /// The clashing name.
        name: String,
    },

    /// A lock guarding the store was poisoned by a panicking writer.
    #[error("Store lock poisoned")]
    Poisoned,

    /// Any other backend failure.
    #[error("Store backend error: {0}")]
    Backend(String),
}

/// Account persistence.
pub trait AccountStore {
    /// Finds an account by ID.
    fn find_account(&self, id: AccountId) -> Result<Option<Account>, StoreError>;

    /// Lists the accounts of a ledger.
    fn find_accounts_by_ledger(&self, ledger_id: LedgerId) -> Result<Vec<Account>, StoreError>;

    /// Inserts or updates an account.
    ///
    /// Updates must fail with [`StoreError::VersionConflict`] when the stored
    /// version differs from `account.version()`.
    fn save_account(&mut self, account: &Account) -> Result<(), StoreError>;
}

/// Category persistence. Soft-deleted categories are invisible to every finder.
pub trait CategoryStore {
    /// Finds a live category by ID.
    fn find_category(&self, id: CategoryId) -> Result<Option<Category>, StoreError>;

    /// Finds a live category by its exact (trimmed) name within a ledger.
    fn find_category_by_ledger_and_name(
        &self,
        ledger_id: LedgerId,
        name: &str,
    ) -> Result<Option<Category>, StoreError>;

    /// Lists the live categories of a ledger.
    fn find_categories_by_ledger(&self, ledger_id: LedgerId) -> Result<Vec<Category>, StoreError>;

    /// Inserts or updates a category.
    fn save_category(&mut self, category: &Category) -> Result<(), StoreError>;

    /// Soft-deletes a category together with its children in the same ledger.
    fn delete_category(&mut self, ledger_id: LedgerId, id: CategoryId) -> Result<(), StoreError>;
}

/// Transaction persistence.
pub trait TransactionStore {
    /// Finds a transaction by ID.
    fn find_transaction(&self, id: TransactionId) -> Result<Option<Transaction>, StoreError>;

    /// Inserts or updates a transaction.
    fn save_transaction(&mut self, transaction: &Transaction) -> Result<(), StoreError>;

    /// Removes a transaction.
    fn delete_transaction(&mut self, id: TransactionId) -> Result<(), StoreError>;

    /// Lists a ledger's transactions dated within `from..=to`, ordered by
    /// date then creation time.
    fn find_transactions_by_ledger_and_date_range(
        &self,
        ledger_id: LedgerId,
        from: NaiveDate,
        to: NaiveDate,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<Transaction>, StoreError>;
}

/// One all-or-nothing unit of work against the backing store.
pub trait StoreTransaction: AccountStore + CategoryStore + TransactionStore + Sized {
    /// Publishes every write made through this transaction.
    ///
    /// Fails without publishing anything when a row written here was changed
    /// by another unit of work since this one read it, or when a saved
    /// category name clashes with a live category of the same ledger.
    fn commit(self) -> Result<(), StoreError>;
}

/// A backing store able to open units of work.
pub trait LedgerStore {
    /// The unit-of-work type.
    type Transaction<'a>: StoreTransaction
    where
        Self: 'a;

    /// Opens a unit of work.
    fn begin(&self) -> Result<Self::Transaction<'_>, StoreError>;
}

/// Runs `work` inside one unit of work, committing only if it succeeds.
pub(crate) fn in_unit_of_work<'s, S, T, F>(
    store: &'s S,
    operation: &'static str,
    work: F,
) -> Result<T, LedgerError>
where
    S: LedgerStore + ?Sized,
    F: FnOnce(&mut S::Transaction<'s>) -> Result<T, LedgerError>,
{
    let mut txn = store.begin()?;
    match work(&mut txn) {
        Ok(value) => {
            txn.commit()?;
            Ok(value)
        }
        Err(err) => {
            warn!(
                operation,
                error_code = err.error_code(),
                error = %err,
                "Unit of work rolled back"
            );
            Err(err)
        }
    }
}

pub(crate) fn load_account<S: AccountStore + ?Sized>(
    store: &S,
    id: AccountId,
) -> Result<Account, LedgerError> {
    store.find_account(id)?.ok_or(LedgerError::AccountNotFound(id))
}

pub(crate) fn load_category<S: CategoryStore + ?Sized>(
    store: &S,
    id: CategoryId,
) -> Result<Category, LedgerError> {
    store.find_category(id)?.ok_or(LedgerError::CategoryNotFound(id))
}

pub(crate) fn load_transaction<S: TransactionStore + ?Sized>(
    store: &S,
    id: TransactionId,
) -> Result<Transaction, LedgerError> {
    store
        .find_transaction(id)?
        .ok_or(LedgerError::TransactionNotFound(id))
}
