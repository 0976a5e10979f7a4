//! Transaction entity and its posting state machine.
//!
//! ```text
//! Unposted --post--> Posted --unpost--> Unposted --discard--> (deleted)
//! ```
//!
//! Field mutators only work while unposted. Posting applies the amount to the
//! referenced account exactly once; unposting applies the exact inverse.

use chrono::{DateTime, NaiveDate, Utc};
use payv_shared::types::{AccountId, CategoryId, LedgerId, Money, TransactionId};
use serde::{Deserialize, Serialize};

use crate::account::Account;
use crate::category::Category;
use crate::error::{ensure_ledger, EntityKind, LedgerError};
use crate::transaction::types::{PostingStatus, TransactionDraft, TransactionType};

/// A ledger-scoped movement of money against one account and one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    id: TransactionId,
    ledger_id: LedgerId,
    account_id: AccountId,
    category_id: CategoryId,
    transaction_type: TransactionType,
    date: NaiveDate,
    amount: Money,
    #[serde(default)]
    memo: Option<String>,
    #[serde(default)]
    status: PostingStatus,
    created_at: DateTime<Utc>,
}

impl Transaction {
    /// Creates an unposted transaction against `account` and `category`.
    ///
    /// # Errors
    ///
    /// Returns `LedgerMismatch` if either belongs to another ledger than the
    /// draft.
    pub fn create(
        draft: &TransactionDraft,
        account: &Account,
        category: &Category,
    ) -> Result<Self, LedgerError> {
        ensure_ledger(EntityKind::Account, draft.ledger_id, account.ledger_id())?;
        ensure_ledger(EntityKind::Category, draft.ledger_id, category.ledger_id())?;

        Ok(Self {
            id: TransactionId::new(),
            ledger_id: draft.ledger_id,
            account_id: account.id(),
            category_id: category.id(),
            transaction_type: draft.transaction_type,
            date: draft.date,
            amount: draft.amount,
            memo: normalize_memo(draft.memo.as_deref()),
            status: PostingStatus::Unposted,
            created_at: Utc::now(),
        })
    }

    /// Applies the amount to `account`: expenses debit, income credits.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyPosted`, `LedgerMismatch`, `WrongAccount`, or
    /// `InsufficientFunds` when an expense exceeds the balance.
    pub fn post(&mut self, account: &mut Account) -> Result<(), LedgerError> {
        if self.is_posted() {
            return Err(LedgerError::AlreadyPosted(self.id));
        }
        self.check_account(account)?;

        match self.transaction_type {
            TransactionType::Expense => account.debit(self.amount)?,
            TransactionType::Income => account.credit(self.amount)?,
        }
        self.status = PostingStatus::Posted {
            posted_at: Utc::now(),
        };
        Ok(())
    }

    /// Reverses a previous [`post`](Self::post) against `account`.
    ///
    /// # Errors
    ///
    /// Returns `NotPosted`, `LedgerMismatch`, `WrongAccount`, or
    /// `InsufficientFunds` when reversing income would overdraw the account.
    pub fn unpost(&mut self, account: &mut Account) -> Result<(), LedgerError> {
        if !self.is_posted() {
            return Err(LedgerError::NotPosted(self.id));
        }
        self.check_account(account)?;

        match self.transaction_type {
            TransactionType::Expense => account.credit(self.amount)?,
            TransactionType::Income => account.debit(self.amount)?,
        }
        self.status = PostingStatus::Unposted;
        Ok(())
    }

    /// Points the transaction at another account of the same ledger.
    ///
    /// # Errors
    ///
    /// Returns `TransactionAlreadyPosted` or `LedgerMismatch`.
    pub fn change_account(&mut self, account: &Account) -> Result<(), LedgerError> {
        self.ensure_unposted()?;
        ensure_ledger(EntityKind::Account, self.ledger_id, account.ledger_id())?;
        self.account_id = account.id();
        Ok(())
    }

    /// Changes the direction.
    ///
    /// # Errors
    ///
    /// Returns `TransactionAlreadyPosted`.
    pub fn change_type(&mut self, transaction_type: TransactionType) -> Result<(), LedgerError> {
        self.ensure_unposted()?;
        self.transaction_type = transaction_type;
        Ok(())
    }

    /// Changes the value date.
    ///
    /// # Errors
    ///
    /// Returns `TransactionAlreadyPosted`.
    pub fn change_date(&mut self, date: NaiveDate) -> Result<(), LedgerError> {
        self.ensure_unposted()?;
        self.date = date;
        Ok(())
    }

    /// Changes the amount.
    ///
    /// # Errors
    ///
    /// Returns `TransactionAlreadyPosted`.
    pub fn change_amount(&mut self, amount: Money) -> Result<(), LedgerError> {
        self.ensure_unposted()?;
        self.amount = amount;
        Ok(())
    }

    /// Reclassifies under another category of the same ledger.
    ///
    /// # Errors
    ///
    /// Returns `TransactionAlreadyPosted` or `LedgerMismatch`.
    pub fn change_category(&mut self, category: &Category) -> Result<(), LedgerError> {
        self.ensure_unposted()?;
        ensure_ledger(EntityKind::Category, self.ledger_id, category.ledger_id())?;
        self.category_id = category.id();
        Ok(())
    }

    /// Replaces the memo. Blank input clears it.
    ///
    /// # Errors
    ///
    /// Returns `TransactionAlreadyPosted`.
    pub fn change_memo(&mut self, memo: Option<&str>) -> Result<(), LedgerError> {
        self.ensure_unposted()?;
        self.memo = normalize_memo(memo);
        Ok(())
    }

    /// Consumes an unposted transaction for deletion, returning its ID.
    ///
    /// # Errors
    ///
    /// Returns `CannotDeletePosted` while posted.
    pub fn discard(self) -> Result<TransactionId, LedgerError> {
        if self.is_posted() {
            return Err(LedgerError::CannotDeletePosted(self.id));
        }
        Ok(self.id)
    }

    /// Returns true while the amount is applied to the account.
    #[must_use]
    pub const fn is_posted(&self) -> bool {
        matches!(self.status, PostingStatus::Posted { .. })
    }

    /// Returns when the transaction was posted, if it is.
    #[must_use]
    pub const fn posted_at(&self) -> Option<DateTime<Utc>> {
        match self.status {
            PostingStatus::Posted { posted_at } => Some(posted_at),
            PostingStatus::Unposted => None,
        }
    }

    /// Returns the posting status.
    #[must_use]
    pub const fn status(&self) -> PostingStatus {
        self.status
    }

    /// Returns the transaction ID.
    #[must_use]
    pub const fn id(&self) -> TransactionId {
        self.id
    }

    /// Returns the owning ledger.
    #[must_use]
    pub const fn ledger_id(&self) -> LedgerId {
        self.ledger_id
    }

    /// Returns the referenced account.
    #[must_use]
    pub const fn account_id(&self) -> AccountId {
        self.account_id
    }

    /// Returns the referenced category.
    #[must_use]
    pub const fn category_id(&self) -> CategoryId {
        self.category_id
    }

    /// Returns the direction.
    #[must_use]
    pub const fn transaction_type(&self) -> TransactionType {
        self.transaction_type
    }

    /// Returns the value date.
    #[must_use]
    pub const fn date(&self) -> NaiveDate {
        self.date
    }

    /// Returns the amount.
    #[must_use]
    pub const fn amount(&self) -> Money {
        self.amount
    }

    /// Returns the memo.
    #[must_use]
    pub fn memo(&self) -> Option<&str> {
        self.memo.as_deref()
    }

    /// Returns the creation time.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn ensure_unposted(&self) -> Result<(), LedgerError> {
        if self.is_posted() {
            Err(LedgerError::TransactionAlreadyPosted(self.id))
        } else {
            Ok(())
        }
    }

    fn check_account(&self, account: &Account) -> Result<(), LedgerError> {
        ensure_ledger(EntityKind::Account, self.ledger_id, account.ledger_id())?;
        if account.id() != self.account_id {
            return Err(LedgerError::WrongAccount {
                expected: self.account_id,
                actual: account.id(),
            });
        }
        Ok(())
    }
}

pub(crate) fn normalize_memo(memo: Option<&str>) -> Option<String> {
    memo.map(str::trim)
        .filter(|memo| !memo.is_empty())
        .map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        ledger: LedgerId,
        account: Account,
        category: Category,
    }

    fn won(units: i64) -> Money {
        Money::won(units).unwrap()
    }

    fn fixture(opening: i64) -> Fixture {
        let ledger = LedgerId::new();
        let mut account = Account::open(ledger, "Checking").unwrap();
        account.credit(won(opening)).unwrap();
        let category = Category::create_root(ledger, "Salary", false, 0).unwrap();
        Fixture {
            ledger,
            account,
            category,
        }
    }

    fn draft(fx: &Fixture, transaction_type: TransactionType, amount: i64) -> TransactionDraft {
        TransactionDraft {
            ledger_id: fx.ledger,
            account_id: fx.account.id(),
            category_id: fx.category.id(),
            transaction_type,
            date: NaiveDate::from_ymd_opt(2026, 3, 14).unwrap(),
            amount: won(amount),
            memo: Some("  monthly  ".to_string()),
        }
    }

    #[test]
    fn test_create_is_unposted_and_trims_memo() {
        let fx = fixture(0);
        let txn = Transaction::create(&draft(&fx, TransactionType::Income, 300), &fx.account, &fx.category)
            .unwrap();
        assert!(!txn.is_posted());
        assert_eq!(txn.posted_at(), None);
        assert_eq!(txn.memo(), Some("monthly"));
        assert_eq!(txn.account_id(), fx.account.id());
    }

    #[test]
    fn test_create_rejects_foreign_category() {
        let fx = fixture(0);
        let foreign = Category::create_root(LedgerId::new(), "Other", false, 0).unwrap();
        let err = Transaction::create(&draft(&fx, TransactionType::Income, 1), &fx.account, &foreign)
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::LedgerMismatch {
                entity: EntityKind::Category,
                ..
            }
        ));
    }

    #[test]
    fn test_income_post_then_unpost_restores_balance() {
        let mut fx = fixture(1_000);
        let mut txn =
            Transaction::create(&draft(&fx, TransactionType::Income, 300), &fx.account, &fx.category)
                .unwrap();

        txn.post(&mut fx.account).unwrap();
        assert_eq!(fx.account.balance(), won(1_300));
        assert!(txn.is_posted());
        assert!(txn.posted_at().is_some());

        txn.unpost(&mut fx.account).unwrap();
        assert_eq!(fx.account.balance(), won(1_000));
        assert!(!txn.is_posted());
        assert_eq!(txn.posted_at(), None);
    }

    #[test]
    fn test_expense_post_rejects_overdraft() {
        let mut fx = fixture(0);
        let mut txn =
            Transaction::create(&draft(&fx, TransactionType::Expense, 500), &fx.account, &fx.category)
                .unwrap();

        let err = txn.post(&mut fx.account).unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientFunds { .. }));
        assert_eq!(fx.account.balance(), Money::ZERO);
        assert!(!txn.is_posted());
    }

    #[test]
    fn test_double_post_and_double_unpost_fail() {
        let mut fx = fixture(100);
        let mut txn =
            Transaction::create(&draft(&fx, TransactionType::Expense, 40), &fx.account, &fx.category)
                .unwrap();

        assert!(matches!(txn.unpost(&mut fx.account), Err(LedgerError::NotPosted(_))));
        txn.post(&mut fx.account).unwrap();
        assert!(matches!(txn.post(&mut fx.account), Err(LedgerError::AlreadyPosted(_))));
        assert_eq!(fx.account.balance(), won(60));
    }

    #[test]
    fn test_post_rejects_other_account() {
        let mut fx = fixture(100);
        let mut txn =
            Transaction::create(&draft(&fx, TransactionType::Income, 10), &fx.account, &fx.category)
                .unwrap();

        let mut other = Account::open(fx.ledger, "Savings").unwrap();
        assert!(matches!(
            txn.post(&mut other),
            Err(LedgerError::WrongAccount { .. })
        ));

        let mut foreign = Account::open(LedgerId::new(), "Elsewhere").unwrap();
        assert!(matches!(
            txn.post(&mut foreign),
            Err(LedgerError::LedgerMismatch { .. })
        ));
        assert_eq!(other.balance(), Money::ZERO);
        assert_eq!(foreign.balance(), Money::ZERO);
    }

    #[test]
    fn test_mutators_rejected_while_posted() {
        let mut fx = fixture(1_000);
        let mut txn =
            Transaction::create(&draft(&fx, TransactionType::Expense, 200), &fx.account, &fx.category)
                .unwrap();
        txn.post(&mut fx.account).unwrap();
        let before = txn.clone();

        assert!(matches!(
            txn.change_amount(won(500)),
            Err(LedgerError::TransactionAlreadyPosted(_))
        ));
        assert!(txn.change_type(TransactionType::Income).is_err());
        assert!(txn.change_date(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()).is_err());
        assert!(txn.change_category(&fx.category).is_err());
        assert!(txn.change_account(&fx.account).is_err());
        assert!(txn.change_memo(Some("late")).is_err());

        assert_eq!(txn, before);
        assert_eq!(fx.account.balance(), won(800));
    }

    #[test]
    fn test_mutators_apply_while_unposted() {
        let fx = fixture(0);
        let mut txn =
            Transaction::create(&draft(&fx, TransactionType::Expense, 200), &fx.account, &fx.category)
                .unwrap();
        let savings = Account::open(fx.ledger, "Savings").unwrap();

        txn.change_account(&savings).unwrap();
        txn.change_type(TransactionType::Income).unwrap();
        txn.change_amount(won(75)).unwrap();
        txn.change_memo(Some("   ")).unwrap();

        assert_eq!(txn.account_id(), savings.id());
        assert_eq!(txn.transaction_type(), TransactionType::Income);
        assert_eq!(txn.amount(), won(75));
        assert_eq!(txn.memo(), None);
    }

    #[test]
    fn test_discard_requires_unposted() {
        let mut fx = fixture(500);
        let mut txn =
            Transaction::create(&draft(&fx, TransactionType::Expense, 100), &fx.account, &fx.category)
                .unwrap();
        let id = txn.id();
        txn.post(&mut fx.account).unwrap();

        assert!(matches!(
            txn.clone().discard(),
            Err(LedgerError::CannotDeletePosted(_))
        ));
        txn.unpost(&mut fx.account).unwrap();
        assert_eq!(txn.discard().unwrap(), id);
    }
}
