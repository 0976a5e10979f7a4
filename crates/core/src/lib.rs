//! Core business logic for payv.
//!
//! This crate contains the household-ledger domain with ZERO storage or
//! transport dependencies. Persistence is reached only through the traits in
//! [`store`].
//!
//! # Modules
//!
//! - `account` - Accounts and their running balances
//! - `category` - Two-level category tree
//! - `transaction` - Transactions and the posted/unposted state machine
//! - `posting` - The posting engine orchestrating units of work
//! - `store` - Store traits and the unit-of-work contract

pub mod account;
pub mod category;
pub mod error;
pub mod posting;
pub mod store;
pub mod transaction;

pub use account::{Account, AccountService};
pub use category::{Category, CategoryService, NewCategory};
pub use error::{EntityKind, LedgerError};
pub use posting::PostingEngine;
pub use store::{
    AccountStore, CategoryStore, LedgerStore, StoreError, StoreTransaction, TransactionStore,
};
pub use transaction::{
    PostingStatus, Transaction, TransactionChanges, TransactionDraft, TransactionEdit,
    TransactionType,
};
