//! Versioned JSON snapshots of a [`MemoryStore`].
//!
//! Every entity is written with all of its fields. Older snapshots that omit
//! optional fields still load through serde defaults.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use payv_core::store::StoreError;
use payv_core::{Account, Category, Transaction};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::memory::{MemoryStore, Tables};

/// Snapshot layout version written by this crate.
pub const SCHEMA_VERSION: u32 = 1;

/// Errors raised while reading or writing snapshots.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The snapshot was written by an incompatible version.
    #[error("Unsupported snapshot schema version {found} (supported: {supported})")]
    UnsupportedVersion {
        /// Version found in the file.
        found: u32,
        /// Version this build reads.
        supported: u32,
    },

    /// Reading or writing the file failed.
    #[error("Snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The JSON is malformed.
    #[error("Snapshot format error: {0}")]
    Json(#[from] serde_json::Error),

    /// The store could not be read.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A category together with its soft-delete marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRecord {
    /// The category itself.
    #[serde(flatten)]
    pub category: Category,
    /// When the category was soft-deleted.
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl CategoryRecord {
    /// Wraps a category that has not been deleted.
    #[must_use]
    pub const fn live(category: Category) -> Self {
        Self {
            category,
            deleted_at: None,
        }
    }

    /// Returns true unless the category was soft-deleted.
    #[must_use]
    pub const fn is_live(&self) -> bool {
        self.deleted_at.is_none()
    }
}

/// Serialized form of a whole store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Layout version; see [`SCHEMA_VERSION`].
    pub schema_version: u32,
    /// Every account.
    #[serde(default)]
    pub accounts: Vec<Account>,
    /// Every category, including soft-deleted ones.
    #[serde(default)]
    pub categories: Vec<CategoryRecord>,
    /// Every transaction.
    #[serde(default)]
    pub transactions: Vec<Transaction>,
}

impl Snapshot {
    /// Parses a snapshot from JSON.
    ///
    /// # Errors
    ///
    /// Returns `Json` for malformed input or `UnsupportedVersion`.
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        let snapshot: Self = serde_json::from_str(json)?;
        if snapshot.schema_version != SCHEMA_VERSION {
            return Err(SnapshotError::UnsupportedVersion {
                found: snapshot.schema_version,
                supported: SCHEMA_VERSION,
            });
        }
        Ok(snapshot)
    }

    /// Renders the snapshot as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns `Json` if serialization fails.
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reads a snapshot file.
    ///
    /// # Errors
    ///
    /// Returns `Io`, `Json` or `UnsupportedVersion`.
    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Writes the snapshot to `path`, replacing any existing file.
    ///
    /// # Errors
    ///
    /// Returns `Io` or `Json`.
    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        fs::write(path, self.to_json()?)?;
        info!(
            path = %path.display(),
            accounts = self.accounts.len(),
            categories = self.categories.len(),
            transactions = self.transactions.len(),
            "Snapshot written"
        );
        Ok(())
    }
}

impl MemoryStore {
    /// Captures the committed state of the store.
    ///
    /// Entries are sorted by ID so equal stores produce identical files.
    ///
    /// # Errors
    ///
    /// Returns `Store` if the store lock is poisoned.
    pub fn snapshot(&self) -> Result<Snapshot, SnapshotError> {
        let tables = self.read_tables()?;

        let mut accounts: Vec<Account> = tables.accounts.into_values().collect();
        accounts.sort_by_key(Account::id);
        let mut categories: Vec<CategoryRecord> = tables.categories.into_values().collect();
        categories.sort_by_key(|record| record.category.id());
        let mut transactions: Vec<Transaction> = tables.transactions.into_values().collect();
        transactions.sort_by_key(Transaction::id);

        Ok(Snapshot {
            schema_version: SCHEMA_VERSION,
            accounts,
            categories,
            transactions,
        })
    }

    /// Builds a store holding exactly the contents of `snapshot`.
    #[must_use]
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let tables = Tables {
            accounts: snapshot
                .accounts
                .into_iter()
                .map(|account| (account.id(), account))
                .collect(),
            categories: snapshot
                .categories
                .into_iter()
                .map(|record| (record.category.id(), record))
                .collect(),
            transactions: snapshot
                .transactions
                .into_iter()
                .map(|transaction| (transaction.id(), transaction))
                .collect(),
        };
        Self::from_tables(tables)
    }
}
