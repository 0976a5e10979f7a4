//! Posting engine operations.

use std::sync::Arc;

use chrono::{Months, NaiveDate};
use payv_shared::config::LedgerConfig;
use payv_shared::types::{LedgerId, PageRequest, TransactionId};
use tracing::{debug, info};

use crate::account::Account;
use crate::error::{ensure_ledger, EntityKind, LedgerError};
use crate::store::{
    in_unit_of_work, load_account, load_category, load_transaction, AccountStore, LedgerStore,
    StoreTransaction, TransactionStore,
};
use crate::transaction::entity::normalize_memo;
use crate::transaction::{Transaction, TransactionChanges, TransactionDraft, TransactionEdit};

/// Moves transactions between the unposted and posted states while keeping
/// account balances consistent.
///
/// Each public method is one all-or-nothing unit of work: any failure
/// discards every load and save made by that call.
pub struct PostingEngine<S> {
    store: Arc<S>,
    config: LedgerConfig,
}

impl<S: LedgerStore> PostingEngine<S> {
    /// Creates an engine with default listing limits.
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self::with_config(store, LedgerConfig::default())
    }

    /// Creates an engine with explicit listing limits.
    #[must_use]
    pub const fn with_config(store: Arc<S>, config: LedgerConfig) -> Self {
        Self { store, config }
    }

    /// Returns the first page at the configured default size.
    #[must_use]
    pub const fn default_page(&self) -> PageRequest {
        PageRequest::new(1, self.config.default_page_size)
    }

    /// Creates an unposted transaction.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound`, `CategoryNotFound` or `LedgerMismatch`.
    pub fn create(&self, draft: &TransactionDraft) -> Result<Transaction, LedgerError> {
        in_unit_of_work(self.store.as_ref(), "transaction.create", |txn| {
            let transaction = build(txn, draft)?;
            txn.save_transaction(&transaction)?;
            info!(
                transaction_id = %transaction.id(),
                ledger_id = %transaction.ledger_id(),
                amount = %transaction.amount(),
                "Transaction created"
            );
            Ok(transaction)
        })
    }

    /// Applies a transaction's amount to its account.
    ///
    /// # Errors
    ///
    /// Returns `TransactionNotFound`, `AccountNotFound`, `AlreadyPosted` or
    /// `InsufficientFunds`.
    pub fn post(&self, id: TransactionId) -> Result<Transaction, LedgerError> {
        in_unit_of_work(self.store.as_ref(), "transaction.post", |txn| {
            let mut transaction = load_transaction(txn, id)?;
            let mut account = load_account(txn, transaction.account_id())?;

            transaction.post(&mut account)?;
            txn.save_transaction(&transaction)?;
            txn.save_account(&account)?;
            log_posted(&transaction, &account);
            Ok(transaction)
        })
    }

    /// Reverses a posted transaction's effect on its account.
    ///
    /// # Errors
    ///
    /// Returns `TransactionNotFound`, `AccountNotFound`, `NotPosted` or
    /// `InsufficientFunds` when reversing income would overdraw the account.
    pub fn unpost(&self, id: TransactionId) -> Result<Transaction, LedgerError> {
        in_unit_of_work(self.store.as_ref(), "transaction.unpost", |txn| {
            let mut transaction = load_transaction(txn, id)?;
            let mut account = load_account(txn, transaction.account_id())?;

            transaction.unpost(&mut account)?;
            txn.save_transaction(&transaction)?;
            txn.save_account(&account)?;
            info!(
                transaction_id = %id,
                account_id = %account.id(),
                balance = %account.balance(),
                "Transaction unposted"
            );
            Ok(transaction)
        })
    }

    /// Edits the present fields of an unposted transaction.
    ///
    /// Does not unpost: a posted transaction is rejected outright. Fields
    /// equal to the current value are skipped.
    ///
    /// # Errors
    ///
    /// Returns `TransactionAlreadyPosted`, the not-found errors for a new
    /// account or category, or `LedgerMismatch`.
    pub fn update_details(
        &self,
        id: TransactionId,
        changes: &TransactionChanges,
    ) -> Result<Transaction, LedgerError> {
        in_unit_of_work(self.store.as_ref(), "transaction.update_details", |txn| {
            let mut transaction = load_transaction(txn, id)?;
            if transaction.is_posted() {
                return Err(LedgerError::TransactionAlreadyPosted(id));
            }

            let mut changed = false;
            if let Some(account_id) = changes.account_id.filter(|a| *a != transaction.account_id()) {
                let account = load_account(txn, account_id)?;
                transaction.change_account(&account)?;
                changed = true;
            }
            if let Some(kind) = changes
                .transaction_type
                .filter(|k| *k != transaction.transaction_type())
            {
                transaction.change_type(kind)?;
                changed = true;
            }
            if let Some(date) = changes.date.filter(|d| *d != transaction.date()) {
                transaction.change_date(date)?;
                changed = true;
            }
            if let Some(amount) = changes.amount.filter(|a| *a != transaction.amount()) {
                transaction.change_amount(amount)?;
                changed = true;
            }
            if let Some(category_id) = changes
                .category_id
                .filter(|c| *c != transaction.category_id())
            {
                let category = load_category(txn, category_id)?;
                transaction.change_category(&category)?;
                changed = true;
            }
            if let Some(memo) = changes.memo.as_deref()
                && normalize_memo(Some(memo)).as_deref() != transaction.memo()
            {
                transaction.change_memo(Some(memo))?;
                changed = true;
            }

            if changed {
                txn.save_transaction(&transaction)?;
                info!(transaction_id = %id, "Transaction details updated");
            } else {
                debug!(transaction_id = %id, "No transaction fields changed");
            }
            Ok(transaction)
        })
    }

    /// Deletes an unposted transaction.
    ///
    /// # Errors
    ///
    /// Returns `TransactionNotFound` or `CannotDeletePosted`.
    pub fn delete(&self, id: TransactionId) -> Result<(), LedgerError> {
        in_unit_of_work(self.store.as_ref(), "transaction.delete", |txn| {
            let transaction = load_transaction(txn, id)?;
            txn.delete_transaction(transaction.discard()?)?;
            info!(transaction_id = %id, "Transaction deleted");
            Ok(())
        })
    }

    /// Creates a transaction and posts it in the same unit of work.
    ///
    /// # Errors
    ///
    /// Returns any error of [`create`](Self::create) or
    /// [`post`](Self::post); nothing is persisted on failure.
    pub fn one_click_create(&self, draft: &TransactionDraft) -> Result<Transaction, LedgerError> {
        in_unit_of_work(self.store.as_ref(), "transaction.one_click_create", |txn| {
            let mut transaction = build(txn, draft)?;
            let mut account = load_account(txn, transaction.account_id())?;

            transaction.post(&mut account)?;
            txn.save_transaction(&transaction)?;
            txn.save_account(&account)?;
            log_posted(&transaction, &account);
            Ok(transaction)
        })
    }

    /// Replaces every field of a transaction and leaves it posted.
    ///
    /// # Arguments
    /// * `id` - The transaction to edit
    /// * `edit` - The complete set of new field values
    ///
    /// The current effect is reversed on the old account before any field
    /// changes, then the new values are posted against the target account.
    /// When the account is unchanged the same loaded account is unposted from
    /// and posted to.
    ///
    /// # Errors
    ///
    /// Returns the not-found errors, `LedgerMismatch`, or `InsufficientFunds`
    /// from either the reversal or the repost. Nothing is persisted on failure.
    pub fn one_click_update(
        &self,
        id: TransactionId,
        edit: &TransactionEdit,
    ) -> Result<Transaction, LedgerError> {
        in_unit_of_work(self.store.as_ref(), "transaction.one_click_update", |txn| {
            let mut transaction = load_transaction(txn, id)?;
            let mut current = load_account(txn, transaction.account_id())?;

            let mut target = if edit.account_id == current.id() {
                None
            } else {
                let account = load_account(txn, edit.account_id)?;
                ensure_ledger(EntityKind::Account, transaction.ledger_id(), account.ledger_id())?;
                Some(account)
            };
            let category = if edit.category_id == transaction.category_id() {
                None
            } else {
                let category = load_category(txn, edit.category_id)?;
                ensure_ledger(EntityKind::Category, transaction.ledger_id(), category.ledger_id())?;
                Some(category)
            };

            let was_posted = transaction.is_posted();
            if was_posted {
                transaction.unpost(&mut current)?;
                debug!(transaction_id = %id, account_id = %current.id(), "Reversed before edit");
            }

            if let Some(account) = &target {
                transaction.change_account(account)?;
            }
            transaction.change_type(edit.transaction_type)?;
            transaction.change_date(edit.date)?;
            transaction.change_amount(edit.amount)?;
            if let Some(category) = &category {
                transaction.change_category(category)?;
            }
            transaction.change_memo(edit.memo.as_deref())?;

            match target.as_mut() {
                Some(account) => transaction.post(account)?,
                None => transaction.post(&mut current)?,
            }

            txn.save_transaction(&transaction)?;
            if was_posted || target.is_none() {
                txn.save_account(&current)?;
            }
            if let Some(account) = &target {
                txn.save_account(account)?;
            }
            info!(
                transaction_id = %id,
                account_id = %transaction.account_id(),
                amount = %transaction.amount(),
                reposted = was_posted,
                "Transaction edited and posted"
            );
            Ok(transaction)
        })
    }

    /// Deletes a transaction, reversing its balance effect first if posted.
    ///
    /// # Errors
    ///
    /// Returns `TransactionNotFound`, `AccountNotFound`, or
    /// `InsufficientFunds` when reversing income would overdraw the account.
    pub fn one_click_delete(&self, id: TransactionId) -> Result<(), LedgerError> {
        in_unit_of_work(self.store.as_ref(), "transaction.one_click_delete", |txn| {
            let mut transaction = load_transaction(txn, id)?;
            if transaction.is_posted() {
                let mut account = load_account(txn, transaction.account_id())?;
                transaction.unpost(&mut account)?;
                txn.save_account(&account)?;
                debug!(transaction_id = %id, account_id = %account.id(), "Reversed before delete");
            }
            txn.delete_transaction(transaction.discard()?)?;
            info!(transaction_id = %id, "Transaction deleted");
            Ok(())
        })
    }

    /// Loads a single transaction.
    ///
    /// # Errors
    ///
    /// Returns `TransactionNotFound`.
    pub fn get_details(&self, id: TransactionId) -> Result<Transaction, LedgerError> {
        in_unit_of_work(self.store.as_ref(), "transaction.get", |txn| {
            load_transaction(txn, id)
        })
    }

    /// Lists a ledger's transactions dated within `from..=to`, ordered by
    /// date then creation time.
    ///
    /// The page size is clamped to the configured maximum.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPeriod` if `from` is after `to`.
    pub fn list_by_ledger_and_period(
        &self,
        ledger_id: LedgerId,
        from: NaiveDate,
        to: NaiveDate,
        page: &PageRequest,
    ) -> Result<Vec<Transaction>, LedgerError> {
        if from > to {
            return Err(LedgerError::InvalidPeriod { from, to });
        }
        let page = page.clamped(self.config.max_page_size);

        in_unit_of_work(self.store.as_ref(), "transaction.list", |txn| {
            let items = txn.find_transactions_by_ledger_and_date_range(
                ledger_id,
                from,
                to,
                page.limit(),
                page.offset(),
            )?;
            debug!(
                ledger_id = %ledger_id,
                %from,
                %to,
                page = page.page,
                count = items.len(),
                "Listed transactions"
            );
            Ok(items)
        })
    }

    /// Lists a ledger's transactions within one calendar month.
    ///
    /// # Errors
    ///
    /// Returns `InvalidMonth` if `month` is not in `1..=12` or the year is out
    /// of range.
    pub fn list_by_month(
        &self,
        ledger_id: LedgerId,
        year: i32,
        month: u32,
        page: &PageRequest,
    ) -> Result<Vec<Transaction>, LedgerError> {
        let (from, to) = month_bounds(year, month).ok_or(LedgerError::InvalidMonth { year, month })?;
        self.list_by_ledger_and_period(ledger_id, from, to, page)
    }
}

/// Loads and validates the references of a draft, then builds the transaction.
fn build<T: StoreTransaction>(
    txn: &T,
    draft: &TransactionDraft,
) -> Result<Transaction, LedgerError> {
    let account = load_account(txn, draft.account_id)?;
    let category = load_category(txn, draft.category_id)?;
    Transaction::create(draft, &account, &category)
}

fn log_posted(transaction: &Transaction, account: &Account) {
    info!(
        transaction_id = %transaction.id(),
        account_id = %account.id(),
        transaction_type = %transaction.transaction_type(),
        amount = %transaction.amount(),
        balance = %account.balance(),
        "Transaction posted"
    );
}

fn month_bounds(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let last = first.checked_add_months(Months::new(1))?.pred_opt()?;
    Some((first, last))
}
