//! Transactions and their posted/unposted lifecycle.

pub mod entity;
pub mod types;

#[cfg(test)]
mod entity_props;

pub use entity::Transaction;
pub use types::{PostingStatus, TransactionChanges, TransactionDraft, TransactionEdit, TransactionType};
