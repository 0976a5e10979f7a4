//! Category application service.
//!
//! Enforces the rules the entity cannot see on its own: name uniqueness
//! within a ledger and the two-level depth bound.

use std::sync::Arc;

use payv_shared::types::{CategoryId, LedgerId};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::category::entity::normalize_name;
use crate::category::Category;
use crate::error::{ensure_ledger, EntityKind, LedgerError};
use crate::store::{in_unit_of_work, load_category, CategoryStore, LedgerStore};

/// Input for creating a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCategory {
    /// Owning ledger.
    pub ledger_id: LedgerId,
    /// Display name; trimmed before use.
    pub name: String,
    /// Provisioned by the system rather than the user.
    #[serde(default)]
    pub is_system: bool,
    /// Position among siblings.
    #[serde(default)]
    pub sort_order: i32,
}

/// Creates, renames, deletes and lists categories.
pub struct CategoryService<S> {
    store: Arc<S>,
}

impl<S: LedgerStore> CategoryService<S> {
    /// Creates a service backed by `store`.
    #[must_use]
    pub const fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Creates a root category.
    ///
    /// # Errors
    ///
    /// Returns `InvalidName` or `DuplicateCategoryName`.
    pub fn create_root(&self, input: &NewCategory) -> Result<Category, LedgerError> {
        in_unit_of_work(self.store.as_ref(), "category.create_root", |txn| {
            let name = normalize_name(&input.name)?;
            ensure_unique(txn, input.ledger_id, &name)?;

            let category =
                Category::create_root(input.ledger_id, &name, input.is_system, input.sort_order)?;
            txn.save_category(&category)?;
            info!(category_id = %category.id(), ledger_id = %input.ledger_id, "Root category created");
            Ok(category)
        })
    }

    /// Creates a child under `parent_id`.
    ///
    /// # Arguments
    /// * `parent_id` - An existing root category of the same ledger
    /// * `input` - Name, flags and ordering of the new child
    ///
    /// # Errors
    ///
    /// Returns `CategoryNotFound` if the parent is missing, `LedgerMismatch`
    /// if it belongs to another ledger, `CategoryDepthExceeded` if it is
    /// itself a child, or `DuplicateCategoryName`.
    pub fn create_child(
        &self,
        parent_id: CategoryId,
        input: &NewCategory,
    ) -> Result<Category, LedgerError> {
        in_unit_of_work(self.store.as_ref(), "category.create_child", |txn| {
            let parent = load_category(txn, parent_id)?;
            ensure_ledger(EntityKind::Category, input.ledger_id, parent.ledger_id())?;
            if !parent.is_root() {
                return Err(LedgerError::CategoryDepthExceeded(parent_id));
            }

            let name = normalize_name(&input.name)?;
            ensure_unique(txn, input.ledger_id, &name)?;

            let category = Category::create_child(
                input.ledger_id,
                parent_id,
                &name,
                input.is_system,
                input.sort_order,
            )?;
            txn.save_category(&category)?;
            info!(
                category_id = %category.id(),
                parent_id = %parent_id,
                "Child category created"
            );
            Ok(category)
        })
    }

    /// Renames a category, re-checking uniqueness only when the name changes.
    ///
    /// # Errors
    ///
    /// Returns `CategoryNotFound`, `LedgerMismatch`, `InvalidName` or
    /// `DuplicateCategoryName`.
    pub fn rename(
        &self,
        ledger_id: LedgerId,
        category_id: CategoryId,
        new_name: &str,
    ) -> Result<Category, LedgerError> {
        in_unit_of_work(self.store.as_ref(), "category.rename", |txn| {
            let mut category = load_category(txn, category_id)?;
            ensure_ledger(EntityKind::Category, ledger_id, category.ledger_id())?;

            let name = normalize_name(new_name)?;
            if name == category.name() {
                debug!(category_id = %category_id, "Category name unchanged");
                return Ok(category);
            }
            ensure_unique(txn, ledger_id, &name)?;

            category.rename(&name)?;
            txn.save_category(&category)?;
            info!(category_id = %category_id, "Category renamed");
            Ok(category)
        })
    }

    /// Soft-deletes a category and its children.
    ///
    /// # Errors
    ///
    /// Returns `CategoryNotFound` or `LedgerMismatch`.
    pub fn delete(&self, ledger_id: LedgerId, category_id: CategoryId) -> Result<(), LedgerError> {
        in_unit_of_work(self.store.as_ref(), "category.delete", |txn| {
            let category = load_category(txn, category_id)?;
            ensure_ledger(EntityKind::Category, ledger_id, category.ledger_id())?;
            txn.delete_category(ledger_id, category_id)?;
            info!(category_id = %category_id, ledger_id = %ledger_id, "Category deleted");
            Ok(())
        })
    }

    /// Lists every live category of a ledger, ordered by sort order then
    /// case-insensitive name.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub fn list_by_ledger(&self, ledger_id: LedgerId) -> Result<Vec<Category>, LedgerError> {
        in_unit_of_work(self.store.as_ref(), "category.list", |txn| {
            let mut categories = txn.find_categories_by_ledger(ledger_id)?;
            sort_categories(&mut categories);
            Ok(categories)
        })
    }

    /// Lists the root categories of a ledger in display order.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub fn list_roots(&self, ledger_id: LedgerId) -> Result<Vec<Category>, LedgerError> {
        let mut roots = self.list_by_ledger(ledger_id)?;
        roots.retain(Category::is_root);
        Ok(roots)
    }

    /// Loads a single live category.
    ///
    /// # Errors
    ///
    /// Returns `CategoryNotFound` if it does not exist or was deleted.
    pub fn get_details(&self, category_id: CategoryId) -> Result<Category, LedgerError> {
        in_unit_of_work(self.store.as_ref(), "category.get", |txn| {
            load_category(txn, category_id)
        })
    }
}

fn ensure_unique<S: CategoryStore + ?Sized>(
    store: &S,
    ledger_id: LedgerId,
    name: &str,
) -> Result<(), LedgerError> {
    match store.find_category_by_ledger_and_name(ledger_id, name)? {
        Some(_) => Err(LedgerError::DuplicateCategoryName(name.to_string())),
        None => Ok(()),
    }
}

fn sort_categories(categories: &mut [Category]) {
    categories.sort_by(|a, b| {
        a.sort_order()
            .cmp(&b.sort_order())
            .then_with(|| a.name().to_lowercase().cmp(&b.name().to_lowercase()))
            .then_with(|| a.id().cmp(&b.id()))
    });
}
