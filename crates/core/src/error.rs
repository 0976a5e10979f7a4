//! Ledger error types for validation, posting-state and storage errors.
//!
//! Most failures are local precondition failures found before the unit of
//! work commits. The concurrency variants come from a rejected commit and are
//! the only retryable ones; the engine never retries them itself.

use chrono::NaiveDate;
use payv_shared::types::{AccountId, CategoryId, LedgerId, Money, MoneyError, TransactionId};
use thiserror::Error;

use crate::store::StoreError;

/// The kind of entity an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    /// An account.
    Account,
    /// A category.
    Category,
    /// A transaction.
    Transaction,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Account => write!(f, "account"),
            Self::Category => write!(f, "category"),
            Self::Transaction => write!(f, "transaction"),
        }
    }
}

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ========== Lookup Errors ==========
    /// Account not found.
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    /// Category not found (or soft-deleted).
    #[error("Category not found: {0}")]
    CategoryNotFound(CategoryId),

    /// Transaction not found.
    #[error("Transaction not found: {0}")]
    TransactionNotFound(TransactionId),

    // ========== Ledger Membership Errors ==========
    /// An account or category belongs to another ledger.
    #[error("The {entity} belongs to ledger {actual}, expected ledger {expected}")]
    LedgerMismatch {
        /// Which entity failed the check.
        entity: EntityKind,
        /// The ledger the operation is scoped to.
        expected: LedgerId,
        /// The ledger the entity actually belongs to.
        actual: LedgerId,
    },

    /// The account handed to post/unpost is not the one the transaction references.
    #[error("Transaction references account {expected}, got {actual}")]
    WrongAccount {
        /// The referenced account.
        expected: AccountId,
        /// The account supplied.
        actual: AccountId,
    },

    // ========== Posting State Errors ==========
    /// Attempted to post an already posted transaction.
    #[error("Transaction {0} is already posted")]
    AlreadyPosted(TransactionId),

    /// Attempted to unpost a transaction that is not posted.
    #[error("Transaction {0} is not posted")]
    NotPosted(TransactionId),

    /// Attempted to change a field of a posted transaction.
    #[error("Cannot modify posted transaction {0}; unpost it first")]
    TransactionAlreadyPosted(TransactionId),

    /// Attempted to delete a posted transaction.
    #[error("Cannot delete posted transaction {0}; unpost it first")]
    CannotDeletePosted(TransactionId),

    // ========== Money Errors ==========
    /// A debit would drive the account balance negative.
    #[error("Insufficient funds in account {account_id}: balance {balance}, requested {requested}")]
    InsufficientFunds {
        /// The account being debited.
        account_id: AccountId,
        /// The balance before the attempted debit.
        balance: Money,
        /// The amount requested.
        requested: Money,
    },

    /// Malformed monetary value.
    #[error("Invalid amount: {0}")]
    InvalidAmount(#[from] MoneyError),

    // ========== Naming Errors ==========
    /// A name is empty after trimming.
    #[error("The {0} name cannot be empty")]
    InvalidName(EntityKind),

    /// A live category with the same name exists in the ledger.
    #[error("A category named '{0}' already exists in this ledger")]
    DuplicateCategoryName(String),

    /// The parent category is itself a child (maximum depth is 2).
    #[error("Category {0} is not a root category; maximum category depth is 2")]
    CategoryDepthExceeded(CategoryId),

    // ========== Query Errors ==========
    /// The period start is after its end.
    #[error("Invalid period: {from} is after {to}")]
    InvalidPeriod {
        /// Period start.
        from: NaiveDate,
        /// Period end.
        to: NaiveDate,
    },

    /// The year/month pair is not a calendar month.
    #[error("Invalid month: {year}-{month}")]
    InvalidMonth {
        /// Year.
        year: i32,
        /// Month (1-12).
        month: u32,
    },

    // ========== Concurrency Errors ==========
    /// Account version mismatch.
    #[error("Account version mismatch for account {account_id}: expected {expected}, got {actual}")]
    AccountVersionMismatch {
        /// The account ID.
        account_id: AccountId,
        /// The version the caller loaded.
        expected: u64,
        /// The version found in the store.
        actual: u64,
    },

    /// The transaction was changed by a concurrent operation.
    #[error("Transaction {0} was modified concurrently; reload and retry")]
    TransactionModified(TransactionId),

    /// The category was changed by a concurrent operation.
    #[error("Category {0} was modified concurrently; reload and retry")]
    CategoryModified(CategoryId),

    // ========== Storage Errors ==========
    /// Storage backend error.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::VersionConflict {
                account_id,
                expected,
                actual,
            } => Self::AccountVersionMismatch {
                account_id,
                expected,
                actual,
            },
            StoreError::StaleTransaction(id) => Self::TransactionModified(id),
            StoreError::StaleCategory(id) => Self::CategoryModified(id),
            StoreError::DuplicateCategoryName { name, .. } => Self::DuplicateCategoryName(name),
            other => Self::Storage(other.to_string()),
        }
    }
}

/// Fails with `LedgerMismatch` unless `actual` is `expected`.
pub(crate) fn ensure_ledger(
    entity: EntityKind,
    expected: LedgerId,
    actual: LedgerId,
) -> Result<(), LedgerError> {
    if expected == actual {
        Ok(())
    } else {
        Err(LedgerError::LedgerMismatch {
            entity,
            expected,
            actual,
        })
    }
}

impl LedgerError {
    /// Returns the stable error code.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::CategoryNotFound(_) => "CATEGORY_NOT_FOUND",
            Self::TransactionNotFound(_) => "TRANSACTION_NOT_FOUND",
            Self::LedgerMismatch { .. } => "LEDGER_MISMATCH",
            Self::WrongAccount { .. } => "WRONG_ACCOUNT",
            Self::AlreadyPosted(_) => "ALREADY_POSTED",
            Self::NotPosted(_) => "NOT_POSTED",
            Self::TransactionAlreadyPosted(_) => "TRANSACTION_ALREADY_POSTED",
            Self::CannotDeletePosted(_) => "CANNOT_DELETE_POSTED",
            Self::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            Self::InvalidAmount(_) => "INVALID_AMOUNT",
            Self::InvalidName(_) => "INVALID_NAME",
            Self::DuplicateCategoryName(_) => "DUPLICATE_CATEGORY_NAME",
            Self::CategoryDepthExceeded(_) => "CATEGORY_DEPTH_EXCEEDED",
            Self::InvalidPeriod { .. } => "INVALID_PERIOD",
            Self::InvalidMonth { .. } => "INVALID_MONTH",
            Self::AccountVersionMismatch { .. } => "ACCOUNT_VERSION_MISMATCH",
            Self::TransactionModified(_) => "TRANSACTION_MODIFIED",
            Self::CategoryModified(_) => "CATEGORY_MODIFIED",
            Self::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// Returns the HTTP-equivalent status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - malformed input
            Self::InvalidAmount(_)
            | Self::InvalidName(_)
            | Self::InvalidPeriod { .. }
            | Self::InvalidMonth { .. } => 400,

            // 404 Not Found
            Self::AccountNotFound(_)
            | Self::CategoryNotFound(_)
            | Self::TransactionNotFound(_) => 404,

            // 409 Conflict - duplicates and concurrency errors
            Self::DuplicateCategoryName(_)
            | Self::AccountVersionMismatch { .. }
            | Self::TransactionModified(_)
            | Self::CategoryModified(_) => 409,

            // 422 Unprocessable - business rule violations
            Self::LedgerMismatch { .. }
            | Self::WrongAccount { .. }
            | Self::AlreadyPosted(_)
            | Self::NotPosted(_)
            | Self::TransactionAlreadyPosted(_)
            | Self::CannotDeletePosted(_)
            | Self::InsufficientFunds { .. }
            | Self::CategoryDepthExceeded(_) => 422,

            // 500 Internal Server Error
            Self::Storage(_) => 500,
        }
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::AccountVersionMismatch { .. }
                | Self::TransactionModified(_)
                | Self::CategoryModified(_)
        )
    }
}
