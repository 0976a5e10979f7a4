//! Category entity.
//!
//! A category is either a root (no parent) or a child of a root. The entity
//! stores no depth counter; [`CategoryService`](super::CategoryService)
//! checks the parent before building a child.

use payv_shared::types::{CategoryId, LedgerId};
use serde::{Deserialize, Serialize};

use crate::error::{EntityKind, LedgerError};

/// A classification for transactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    id: CategoryId,
    ledger_id: LedgerId,
    name: String,
    #[serde(default)]
    parent_id: Option<CategoryId>,
    #[serde(default)]
    sort_order: i32,
    #[serde(default)]
    is_system: bool,
}

impl Category {
    /// Builds a root category.
    ///
    /// Name uniqueness within the ledger is the caller's responsibility.
    ///
    /// # Errors
    ///
    /// Returns `InvalidName` if the trimmed name is empty.
    pub fn create_root(
        ledger_id: LedgerId,
        name: &str,
        is_system: bool,
        sort_order: i32,
    ) -> Result<Self, LedgerError> {
        Ok(Self {
            id: CategoryId::new(),
            ledger_id,
            name: normalize_name(name)?,
            parent_id: None,
            sort_order,
            is_system,
        })
    }

    /// Builds a child of `parent_id`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidName` if the trimmed name is empty.
    pub fn create_child(
        ledger_id: LedgerId,
        parent_id: CategoryId,
        name: &str,
        is_system: bool,
        sort_order: i32,
    ) -> Result<Self, LedgerError> {
        Ok(Self {
            parent_id: Some(parent_id),
            ..Self::create_root(ledger_id, name, is_system, sort_order)?
        })
    }

    /// Replaces the name after trimming.
    ///
    /// # Errors
    ///
    /// Returns `InvalidName` if the trimmed name is empty.
    pub fn rename(&mut self, new_name: &str) -> Result<(), LedgerError> {
        self.name = normalize_name(new_name)?;
        Ok(())
    }

    /// Returns true if the category has no parent.
    #[must_use]
    pub const fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Returns the category ID.
    #[must_use]
    pub const fn id(&self) -> CategoryId {
        self.id
    }

    /// Returns the owning ledger.
    #[must_use]
    pub const fn ledger_id(&self) -> LedgerId {
        self.ledger_id
    }

    /// Returns the name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the parent, if any.
    #[must_use]
    pub const fn parent_id(&self) -> Option<CategoryId> {
        self.parent_id
    }

    /// Returns the sort order.
    #[must_use]
    pub const fn sort_order(&self) -> i32 {
        self.sort_order
    }

    /// Returns true for categories provisioned by the system.
    #[must_use]
    pub const fn is_system(&self) -> bool {
        self.is_system
    }
}

pub(crate) fn normalize_name(name: &str) -> Result<String, LedgerError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(LedgerError::InvalidName(EntityKind::Category));
    }
    Ok(trimmed.to_string())
}
