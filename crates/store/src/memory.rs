//! In-memory store.
//!
//! Intended for tests, the seeder and single-process use. Not optimized for
//! large ledgers: every unit of work clones the tables it reads from.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use chrono::{NaiveDate, Utc};
use payv_core::store::{
    AccountStore, CategoryStore, LedgerStore, StoreError, StoreTransaction, TransactionStore,
};
use payv_core::{Account, Category, Transaction};
use payv_shared::types::{AccountId, CategoryId, LedgerId, TransactionId};
use tracing::{debug, warn};

use crate::snapshot::CategoryRecord;

#[derive(Debug, Clone, Default)]
pub(crate) struct Tables {
    pub(crate) accounts: HashMap<AccountId, Account>,
    pub(crate) categories: HashMap<CategoryId, CategoryRecord>,
    pub(crate) transactions: HashMap<TransactionId, Transaction>,
}

/// Thread-safe in-memory implementation of [`LedgerStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_tables(tables: Tables) -> Self {
        Self {
            tables: RwLock::new(tables),
        }
    }

    /// Returns a copy of the live tables.
    pub(crate) fn read_tables(&self) -> Result<Tables, StoreError> {
        self.tables
            .read()
            .map(|tables| tables.clone())
            .map_err(|_| StoreError::Poisoned)
    }
}

impl LedgerStore for MemoryStore {
    type Transaction<'a> = MemoryTransaction<'a>;

    fn begin(&self) -> Result<MemoryTransaction<'_>, StoreError> {
        Ok(MemoryTransaction {
            store: self,
            working: self.read_tables()?,
            read_versions: BTreeMap::new(),
            read_categories: BTreeMap::new(),
            read_transactions: BTreeMap::new(),
        })
    }
}

/// One unit of work against a [`MemoryStore`].
///
/// Writes land in a private working copy. [`commit`](StoreTransaction::commit)
/// publishes them; dropping the value discards them.
///
/// The first write to a row records the row as this unit saw it. Commit
/// rejects the whole unit if any such row has since changed in the live
/// tables.
#[derive(Debug)]
pub struct MemoryTransaction<'a> {
    store: &'a MemoryStore,
    working: Tables,
    /// Version each saved account had when this unit first saved it.
    read_versions: BTreeMap<AccountId, u64>,
    read_categories: BTreeMap<CategoryId, Option<CategoryRecord>>,
    read_transactions: BTreeMap<TransactionId, Option<Transaction>>,
}

impl AccountStore for MemoryTransaction<'_> {
    fn find_account(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        Ok(self.working.accounts.get(&id).cloned())
    }

    fn find_accounts_by_ledger(&self, ledger_id: LedgerId) -> Result<Vec<Account>, StoreError> {
        Ok(self
            .working
            .accounts
            .values()
            .filter(|account| account.ledger_id() == ledger_id)
            .cloned()
            .collect())
    }

    fn save_account(&mut self, account: &Account) -> Result<(), StoreError> {
        if let Some(stored) = self.working.accounts.get(&account.id())
            && stored.version() != account.version()
        {
            return Err(StoreError::VersionConflict {
                account_id: account.id(),
                expected: account.version(),
                actual: stored.version(),
            });
        }
        self.read_versions
            .entry(account.id())
            .or_insert(account.version());
        self.working
            .accounts
            .insert(account.id(), account.committed());
        Ok(())
    }
}

impl CategoryStore for MemoryTransaction<'_> {
    fn find_category(&self, id: CategoryId) -> Result<Option<Category>, StoreError> {
        Ok(self
            .working
            .categories
            .get(&id)
            .filter(|record| record.is_live())
            .map(|record| record.category.clone()))
    }

    fn find_category_by_ledger_and_name(
        &self,
        ledger_id: LedgerId,
        name: &str,
    ) -> Result<Option<Category>, StoreError> {
        Ok(self
            .working
            .categories
            .values()
            .filter(|record| record.is_live())
            .map(|record| &record.category)
            .find(|category| category.ledger_id() == ledger_id && category.name() == name)
            .cloned())
    }

    fn find_categories_by_ledger(&self, ledger_id: LedgerId) -> Result<Vec<Category>, StoreError> {
        Ok(self
            .working
            .categories
            .values()
            .filter(|record| record.is_live() && record.category.ledger_id() == ledger_id)
            .map(|record| record.category.clone())
            .collect())
    }

    fn save_category(&mut self, category: &Category) -> Result<(), StoreError> {
        let previous = self
            .working
            .categories
            .insert(category.id(), CategoryRecord::live(category.clone()));
        self.read_categories.entry(category.id()).or_insert(previous);
        Ok(())
    }

    fn delete_category(&mut self, ledger_id: LedgerId, id: CategoryId) -> Result<(), StoreError> {
        let now = Utc::now();
        for record in self.working.categories.values_mut() {
            let category = &record.category;
            let targeted = category.id() == id || category.parent_id() == Some(id);
            if targeted && category.ledger_id() == ledger_id && record.is_live() {
                self.read_categories
                    .entry(category.id())
                    .or_insert_with(|| Some(record.clone()));
                record.deleted_at = Some(now);
            }
        }
        Ok(())
    }
}

impl TransactionStore for MemoryTransaction<'_> {
    fn find_transaction(&self, id: TransactionId) -> Result<Option<Transaction>, StoreError> {
        Ok(self.working.transactions.get(&id).cloned())
    }

    fn save_transaction(&mut self, transaction: &Transaction) -> Result<(), StoreError> {
        let previous = self
            .working
            .transactions
            .insert(transaction.id(), transaction.clone());
        self.read_transactions.entry(transaction.id()).or_insert(previous);
        Ok(())
    }

    fn delete_transaction(&mut self, id: TransactionId) -> Result<(), StoreError> {
        let previous = self.working.transactions.remove(&id);
        self.read_transactions.entry(id).or_insert(previous);
        Ok(())
    }

    fn find_transactions_by_ledger_and_date_range(
        &self,
        ledger_id: LedgerId,
        from: NaiveDate,
        to: NaiveDate,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<Transaction>, StoreError> {
        let mut matching: Vec<&Transaction> = self
            .working
            .transactions
            .values()
            .filter(|txn| txn.ledger_id() == ledger_id && (from..=to).contains(&txn.date()))
            .collect();
        matching.sort_by_key(|txn| (txn.date(), txn.created_at(), txn.id()));

        let skip = usize::try_from(offset).unwrap_or(usize::MAX);
        let take = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(matching.into_iter().skip(skip).take(take).cloned().collect())
    }
}

impl MemoryTransaction<'_> {
    fn validate(&self, live: &Tables) -> Result<(), StoreError> {
        for (account_id, expected) in &self.read_versions {
            let actual = live.accounts.get(account_id).map_or(0, Account::version);
            if actual != *expected {
                warn!(account_id = %account_id, expected, actual, "Commit rejected: stale account");
                return Err(StoreError::VersionConflict {
                    account_id: *account_id,
                    expected: *expected,
                    actual,
                });
            }
        }
        for (transaction_id, seen) in &self.read_transactions {
            if live.transactions.get(transaction_id) != seen.as_ref() {
                warn!(transaction_id = %transaction_id, "Commit rejected: stale transaction");
                return Err(StoreError::StaleTransaction(*transaction_id));
            }
        }
        for (category_id, seen) in &self.read_categories {
            if live.categories.get(category_id) != seen.as_ref() {
                warn!(category_id = %category_id, "Commit rejected: stale category");
                return Err(StoreError::StaleCategory(*category_id));
            }
        }
        self.validate_category_names(live)
    }

    /// Rows this unit did not write are checked as they are live.
    fn validate_category_names(&self, live: &Tables) -> Result<(), StoreError> {
        let saved = self
            .read_categories
            .keys()
            .filter_map(|id| self.working.categories.get(id))
            .filter(|record| record.is_live())
            .map(|record| &record.category);

        for category in saved {
            let taken = live
                .categories
                .iter()
                .filter(|(id, _)| !self.read_categories.contains_key(*id))
                .map(|(_, record)| record)
                .filter(|record| record.is_live())
                .any(|record| {
                    record.category.ledger_id() == category.ledger_id()
                        && record.category.name() == category.name()
                });
            if taken {
                warn!(
                    ledger_id = %category.ledger_id(),
                    name = category.name(),
                    "Commit rejected: duplicate category name"
                );
                return Err(StoreError::DuplicateCategoryName {
                    ledger_id: category.ledger_id(),
                    name: category.name().to_string(),
                });
            }
        }
        Ok(())
    }
}

impl StoreTransaction for MemoryTransaction<'_> {
    fn commit(self) -> Result<(), StoreError> {
        let mut live = self.store.tables.write().map_err(|_| StoreError::Poisoned)?;
        self.validate(&live)?;

        for account_id in self.read_versions.keys() {
            if let Some(account) = self.working.accounts.get(account_id) {
                live.accounts.insert(*account_id, account.clone());
            }
        }
        for category_id in self.read_categories.keys() {
            if let Some(record) = self.working.categories.get(category_id) {
                live.categories.insert(*category_id, record.clone());
            }
        }
        for transaction_id in self.read_transactions.keys() {
            match self.working.transactions.get(transaction_id) {
                Some(transaction) => {
                    live.transactions.insert(*transaction_id, transaction.clone());
                }
                None => {
                    live.transactions.remove(transaction_id);
                }
            }
        }

        debug!(
            accounts = self.read_versions.len(),
            categories = self.read_categories.len(),
            transactions = self.read_transactions.len(),
            "Unit of work committed"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use payv_core::{TransactionDraft, TransactionType};
    use payv_shared::types::Money;

    fn open_account(store: &MemoryStore, ledger: LedgerId) -> Account {
        let account = Account::open(ledger, "Wallet").unwrap();
        let mut txn = store.begin().unwrap();
        txn.save_account(&account).unwrap();
        txn.commit().unwrap();
        account.committed()
    }

    #[test]
    fn test_save_bumps_version() {
        let store = MemoryStore::new();
        let account = open_account(&store, LedgerId::new());

        let txn = store.begin().unwrap();
        let stored = txn.find_account(account.id()).unwrap().unwrap();
        assert_eq!(stored.version(), 1);
    }

    #[test]
    fn test_drop_discards_writes() {
        let store = MemoryStore::new();
        let ledger = LedgerId::new();
        {
            let mut txn = store.begin().unwrap();
            txn.save_account(&Account::open(ledger, "Ghost").unwrap())
                .unwrap();
        }
        let txn = store.begin().unwrap();
        assert!(txn.find_accounts_by_ledger(ledger).unwrap().is_empty());
    }

    #[test]
    fn test_stale_save_within_unit_conflicts() {
        let store = MemoryStore::new();
        let account = open_account(&store, LedgerId::new());

        let mut txn = store.begin().unwrap();
        txn.save_account(&account).unwrap();
        let err = txn.save_account(&account).unwrap_err();
        assert!(matches!(
            err,
            StoreError::VersionConflict {
                expected: 1,
                actual: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_concurrent_commit_conflicts() {
        let store = MemoryStore::new();
        let account = open_account(&store, LedgerId::new());

        let mut first = store.begin().unwrap();
        let mut second = store.begin().unwrap();
        first.save_account(&account).unwrap();
        second.save_account(&account).unwrap();

        first.commit().unwrap();
        assert!(matches!(
            second.commit(),
            Err(StoreError::VersionConflict {
                expected: 1,
                actual: 2,
                ..
            })
        ));
    }

    #[test]
    fn test_delete_category_cascades_within_ledger() {
        let store = MemoryStore::new();
        let ledger = LedgerId::new();
        let root = Category::create_root(ledger, "Food", false, 0).unwrap();
        let child = Category::create_child(ledger, root.id(), "Snacks", false, 0).unwrap();
        let other = Category::create_root(ledger, "Rent", false, 1).unwrap();

        let mut txn = store.begin().unwrap();
        for category in [&root, &child, &other] {
            txn.save_category(category).unwrap();
        }
        txn.delete_category(ledger, root.id()).unwrap();
        txn.commit().unwrap();

        let txn = store.begin().unwrap();
        assert!(txn.find_category(root.id()).unwrap().is_none());
        assert!(txn.find_category(child.id()).unwrap().is_none());
        assert!(txn.find_category_by_ledger_and_name(ledger, "Food").unwrap().is_none());
        assert_eq!(txn.find_categories_by_ledger(ledger).unwrap(), vec![other]);
    }

    #[test]
    fn test_delete_category_ignores_other_ledger() {
        let store = MemoryStore::new();
        let ledger = LedgerId::new();
        let root = Category::create_root(ledger, "Food", false, 0).unwrap();

        let mut txn = store.begin().unwrap();
        txn.save_category(&root).unwrap();
        txn.delete_category(LedgerId::new(), root.id()).unwrap();
        txn.commit().unwrap();

        let txn = store.begin().unwrap();
        assert!(txn.find_category(root.id()).unwrap().is_some());
    }

    fn saved_transaction(store: &MemoryStore) -> Transaction {
        let ledger = LedgerId::new();
        let account = Account::open(ledger, "Wallet").unwrap();
        let category = Category::create_root(ledger, "Food", false, 0).unwrap();
        let draft = TransactionDraft {
            ledger_id: ledger,
            account_id: account.id(),
            category_id: category.id(),
            transaction_type: TransactionType::Expense,
            date: NaiveDate::from_ymd_opt(2026, 2, 3).unwrap(),
            amount: Money::won(120).unwrap(),
            memo: None,
        };
        let transaction = Transaction::create(&draft, &account, &category).unwrap();

        let mut txn = store.begin().unwrap();
        txn.save_account(&account).unwrap();
        txn.save_category(&category).unwrap();
        txn.save_transaction(&transaction).unwrap();
        txn.commit().unwrap();
        transaction
    }

    #[test]
    fn test_stale_transaction_row_cannot_commit() {
        let store = MemoryStore::new();
        let transaction = saved_transaction(&store);

        let mut stale = store.begin().unwrap();
        let mut fresh = store.begin().unwrap();
        fresh.delete_transaction(transaction.id()).unwrap();
        fresh.commit().unwrap();

        stale.save_transaction(&transaction).unwrap();
        assert!(matches!(
            stale.commit(),
            Err(StoreError::StaleTransaction(id)) if id == transaction.id()
        ));

        let txn = store.begin().unwrap();
        assert!(txn.find_transaction(transaction.id()).unwrap().is_none());
    }

    #[test]
    fn test_delete_of_changed_transaction_cannot_commit() {
        let store = MemoryStore::new();
        let transaction = saved_transaction(&store);

        let mut stale = store.begin().unwrap();
        let mut fresh = store.begin().unwrap();
        let mut edited = fresh.find_transaction(transaction.id()).unwrap().unwrap();
        edited.change_amount(Money::won(90).unwrap()).unwrap();
        fresh.save_transaction(&edited).unwrap();
        fresh.commit().unwrap();

        stale.delete_transaction(transaction.id()).unwrap();
        assert!(matches!(stale.commit(), Err(StoreError::StaleTransaction(_))));

        let txn = store.begin().unwrap();
        assert_eq!(txn.find_transaction(transaction.id()).unwrap(), Some(edited));
    }

    #[test]
    fn test_duplicate_category_name_rejected_at_commit() {
        let store = MemoryStore::new();
        let ledger = LedgerId::new();

        let mut first = store.begin().unwrap();
        let mut second = store.begin().unwrap();
        first
            .save_category(&Category::create_root(ledger, "Travel", false, 0).unwrap())
            .unwrap();
        second
            .save_category(&Category::create_root(ledger, "Travel", false, 1).unwrap())
            .unwrap();

        first.commit().unwrap();
        assert!(matches!(
            second.commit(),
            Err(StoreError::DuplicateCategoryName { name, .. }) if name == "Travel"
        ));

        let txn = store.begin().unwrap();
        assert_eq!(txn.find_categories_by_ledger(ledger).unwrap().len(), 1);
    }

    #[test]
    fn test_name_freed_and_reused_in_one_unit_commits() {
        let store = MemoryStore::new();
        let ledger = LedgerId::new();
        let mut food = Category::create_root(ledger, "Food", false, 0).unwrap();
        let mut txn = store.begin().unwrap();
        txn.save_category(&food).unwrap();
        txn.commit().unwrap();

        let mut txn = store.begin().unwrap();
        food.rename("Groceries").unwrap();
        txn.save_category(&food).unwrap();
        txn.save_category(&Category::create_root(ledger, "Food", false, 1).unwrap())
            .unwrap();
        txn.commit().unwrap();

        let txn = store.begin().unwrap();
        assert_eq!(txn.find_categories_by_ledger(ledger).unwrap().len(), 2);
    }

    #[test]
    fn test_category_rename_racing_delete_cannot_commit() {
        let store = MemoryStore::new();
        let ledger = LedgerId::new();
        let mut food = Category::create_root(ledger, "Food", false, 0).unwrap();
        let mut txn = store.begin().unwrap();
        txn.save_category(&food).unwrap();
        txn.commit().unwrap();

        let mut stale = store.begin().unwrap();
        let mut fresh = store.begin().unwrap();
        fresh.delete_category(ledger, food.id()).unwrap();
        fresh.commit().unwrap();

        food.rename("Meals").unwrap();
        stale.save_category(&food).unwrap();
        assert!(matches!(stale.commit(), Err(StoreError::StaleCategory(_))));

        let txn = store.begin().unwrap();
        assert!(txn.find_category(food.id()).unwrap().is_none());
    }
}
