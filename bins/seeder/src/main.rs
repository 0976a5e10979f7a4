//! Demo ledger seeder for Payv development and testing.
//!
//! Builds a household ledger through the public posting operations, logs the
//! resulting balances and writes a snapshot when `store.snapshot_path` is set.
//!
//! Usage: cargo run --bin payv-seeder

use std::sync::Arc;

use chrono::{Datelike, NaiveDate, Utc};
use payv_core::{
    AccountService, CategoryService, LedgerStore, NewCategory, PostingEngine, TransactionDraft,
    TransactionEdit, TransactionType,
};
use payv_shared::types::{AccountId, CategoryId, LedgerId, Money};
use payv_shared::AppConfig;
use payv_store::{MemoryStore, Snapshot};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log.filter.as_str().into()),
        )
        .with(config.log.json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!config.log.json).then(tracing_subscriber::fmt::layer))
        .init();

    let store = Arc::new(open_store(&config)?);
    let seeder = Seeder::new(Arc::clone(&store), &config);
    let ledger_id = LedgerId::new();
    seeder.seed(ledger_id)?;

    if let Some(path) = &config.store.snapshot_path {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        store.snapshot()?.save(path)?;
    }

    info!(ledger_id = %ledger_id, "Seeding complete");
    Ok(())
}

fn open_store(config: &AppConfig) -> anyhow::Result<MemoryStore> {
    match &config.store.snapshot_path {
        Some(path) if path.exists() => {
            let snapshot = Snapshot::load(path)?;
            info!(
                path = %path.display(),
                accounts = snapshot.accounts.len(),
                transactions = snapshot.transactions.len(),
                "Loaded existing snapshot"
            );
            Ok(MemoryStore::from_snapshot(snapshot))
        }
        _ => Ok(MemoryStore::new()),
    }
}

struct Seeder<S> {
    engine: PostingEngine<S>,
    accounts: AccountService<S>,
    categories: CategoryService<S>,
}

impl<S: LedgerStore> Seeder<S> {
    fn new(store: Arc<S>, config: &AppConfig) -> Self {
        Self {
            engine: PostingEngine::with_config(Arc::clone(&store), config.ledger),
            accounts: AccountService::new(Arc::clone(&store)),
            categories: CategoryService::new(store),
        }
    }

    fn seed(&self, ledger_id: LedgerId) -> anyhow::Result<()> {
        let today = Utc::now().date_naive();
        let day = |d: u32| {
            NaiveDate::from_ymd_opt(today.year(), today.month(), d).unwrap_or(today)
        };

        info!(ledger_id = %ledger_id, "Seeding categories...");
        let salary = self.root(ledger_id, "Salary", 0)?;
        let housing = self.root(ledger_id, "Housing", 1)?;
        let food = self.root(ledger_id, "Food", 2)?;
        let rent = self.child(ledger_id, housing, "Rent", 0)?;
        let groceries = self.child(ledger_id, food, "Groceries", 0)?;
        let dining = self.child(ledger_id, food, "Dining Out", 1)?;

        info!("Seeding accounts...");
        let checking = self.accounts.open(ledger_id, "Checking")?.id();
        let savings = self.accounts.open(ledger_id, "Savings")?.id();
        let cash = self.accounts.open(ledger_id, "Cash")?.id();

        info!("Seeding transactions...");
        let draft = |account_id: AccountId,
                     category_id: CategoryId,
                     transaction_type: TransactionType,
                     units: i64,
                     date: NaiveDate,
                     memo: &str|
         -> anyhow::Result<TransactionDraft> {
            Ok(TransactionDraft {
                ledger_id,
                account_id,
                category_id,
                transaction_type,
                date,
                amount: Money::won(units)?,
                memo: Some(memo.to_string()),
            })
        };

        self.engine.one_click_create(&draft(
            checking, salary, TransactionType::Income, 3_200_000, day(1), "Monthly salary",
        )?)?;
        self.engine.one_click_create(&draft(
            savings, salary, TransactionType::Income, 500_000, day(1), "Savings transfer",
        )?)?;
        self.engine.one_click_create(&draft(
            checking, rent, TransactionType::Expense, 950_000, day(2), "Rent",
        )?)?;
        self.engine.one_click_create(&draft(
            cash, salary, TransactionType::Income, 100_000, day(3), "Cash on hand",
        )?)?;
        let groceries_run = self.engine.one_click_create(&draft(
            checking, groceries, TransactionType::Expense, 84_300, day(5), "Weekly groceries",
        )?)?;
        let dinner = self.engine.create(&draft(
            cash, dining, TransactionType::Expense, 42_000, day(6), "Dinner",
        )?)?;
        self.engine.post(dinner.id())?;

        // Receipt turned out larger and was paid in cash.
        self.engine.one_click_update(
            groceries_run.id(),
            &TransactionEdit {
                account_id: cash,
                transaction_type: TransactionType::Expense,
                date: groceries_run.date(),
                amount: Money::won(51_700)?,
                category_id: groceries,
                memo: Some("Weekly groceries (cash)".to_string()),
            },
        )?;

        let mistaken = self.engine.one_click_create(&draft(
            checking, dining, TransactionType::Expense, 12_000, day(7), "Duplicate entry",
        )?)?;
        self.engine.one_click_delete(mistaken.id())?;

        self.engine.create(&draft(
            checking, groceries, TransactionType::Expense, 30_000, day(8), "Planned groceries",
        )?)?;

        for account in self.accounts.list_by_ledger(ledger_id)? {
            info!(
                account_id = %account.id(),
                name = account.name(),
                balance = %account.balance(),
                "Account balance"
            );
        }
        let listed = self.engine.list_by_month(
            ledger_id,
            today.year(),
            today.month(),
            &self.engine.default_page(),
        )?;
        let posted = listed.iter().filter(|txn| txn.is_posted()).count();
        info!(
            total = listed.len(),
            posted,
            unposted = listed.len() - posted,
            "Transactions this month"
        );
        Ok(())
    }

    fn root(&self, ledger_id: LedgerId, name: &str, sort_order: i32) -> anyhow::Result<CategoryId> {
        let category = self.categories.create_root(&NewCategory {
            ledger_id,
            name: name.to_string(),
            is_system: false,
            sort_order,
        })?;
        Ok(category.id())
    }

    fn child(
        &self,
        ledger_id: LedgerId,
        parent_id: CategoryId,
        name: &str,
        sort_order: i32,
    ) -> anyhow::Result<CategoryId> {
        let category = self.categories.create_child(
            parent_id,
            &NewCategory {
                ledger_id,
                name: name.to_string(),
                is_system: false,
                sort_order,
            },
        )?;
        Ok(category.id())
    }
}
