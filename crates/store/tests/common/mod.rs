//! Shared fixtures for store-backed engine tests.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::NaiveDate;
use payv_core::{
    Account, AccountService, Category, CategoryService, NewCategory, PostingEngine, Transaction,
    TransactionDraft, TransactionType,
};
use payv_shared::config::LedgerConfig;
use payv_shared::types::{AccountId, CategoryId, LedgerId, Money};
use payv_store::MemoryStore;

pub fn won(units: i64) -> Money {
    Money::won(units).unwrap()
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

/// One ledger with an income and an expense category, backed by a fresh store.
pub struct TestLedger {
    pub store: Arc<MemoryStore>,
    pub engine: PostingEngine<MemoryStore>,
    pub accounts: AccountService<MemoryStore>,
    pub categories: CategoryService<MemoryStore>,
    pub ledger_id: LedgerId,
    pub salary: Category,
    pub groceries: Category,
}

impl TestLedger {
    pub fn new() -> Self {
        Self::with_config(LedgerConfig::default())
    }

    pub fn with_config(config: LedgerConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        Self::on_store(store, LedgerId::new(), config)
    }

    /// Adds a second ledger on the same store.
    pub fn sibling(&self) -> Self {
        Self::on_store(Arc::clone(&self.store), LedgerId::new(), LedgerConfig::default())
    }

    fn on_store(store: Arc<MemoryStore>, ledger_id: LedgerId, config: LedgerConfig) -> Self {
        let categories = CategoryService::new(Arc::clone(&store));
        let salary = categories
            .create_root(&new_category(ledger_id, "Salary", 0))
            .unwrap();
        let groceries = categories
            .create_root(&new_category(ledger_id, "Groceries", 1))
            .unwrap();

        Self {
            engine: PostingEngine::with_config(Arc::clone(&store), config),
            accounts: AccountService::new(Arc::clone(&store)),
            categories,
            store,
            ledger_id,
            salary,
            groceries,
        }
    }

    pub fn open_account(&self, name: &str) -> Account {
        self.accounts.open(self.ledger_id, name).unwrap()
    }

    /// Opens an account and posts an opening income of `units`.
    pub fn funded_account(&self, name: &str, units: i64) -> Account {
        let account = self.open_account(name);
        if units > 0 {
            self.engine
                .one_click_create(&self.draft(account.id(), TransactionType::Income, units))
                .unwrap();
        }
        self.accounts.get_details(account.id()).unwrap()
    }

    pub fn draft(
        &self,
        account_id: AccountId,
        transaction_type: TransactionType,
        units: i64,
    ) -> TransactionDraft {
        let category_id = match transaction_type {
            TransactionType::Income => self.salary.id(),
            TransactionType::Expense => self.groceries.id(),
        };
        self.draft_on(account_id, category_id, transaction_type, units, date(2026, 1, 1))
    }

    pub fn draft_on(
        &self,
        account_id: AccountId,
        category_id: CategoryId,
        transaction_type: TransactionType,
        units: i64,
        on: NaiveDate,
    ) -> TransactionDraft {
        TransactionDraft {
            ledger_id: self.ledger_id,
            account_id,
            category_id,
            transaction_type,
            date: on,
            amount: won(units),
            memo: None,
        }
    }

    pub fn balance(&self, account_id: AccountId) -> Money {
        self.accounts.get_details(account_id).unwrap().balance()
    }

    pub fn reload(&self, transaction: &Transaction) -> Transaction {
        self.engine.get_details(transaction.id()).unwrap()
    }
}

pub fn new_category(ledger_id: LedgerId, name: &str, sort_order: i32) -> NewCategory {
    NewCategory {
        ledger_id,
        name: name.to_string(),
        is_system: false,
        sort_order,
    }
}
