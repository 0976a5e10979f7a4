//! Property-based tests for the transaction state machine.
//!
//! - Post then unpost restores the account balance exactly
//! - Balances never go negative under arbitrary post/unpost sequences
//! - Posted transactions keep their fields and their single balance effect
//! - Account and category always share the transaction's ledger

use chrono::NaiveDate;
use payv_shared::types::{LedgerId, Money};
use proptest::prelude::*;

use super::entity::Transaction;
use super::types::{TransactionDraft, TransactionType};
use crate::account::Account;
use crate::category::Category;
use crate::error::LedgerError;

fn won(units: i64) -> Money {
    Money::won(units).unwrap()
}

/// Strategy to generate whole-unit amounts.
fn amount_strategy() -> impl Strategy<Value = i64> {
    0i64..1_000_000
}

/// Strategy to generate a transaction direction.
fn type_strategy() -> impl Strategy<Value = TransactionType> {
    prop_oneof![Just(TransactionType::Income), Just(TransactionType::Expense)]
}

/// Helper to build an account with an opening balance and a category in one ledger.
fn setup(opening: i64) -> (Account, Category) {
    let ledger = LedgerId::new();
    let mut account = Account::open(ledger, "Checking").unwrap();
    account.credit(won(opening)).unwrap();
    let category = Category::create_root(ledger, "General", false, 0).unwrap();
    (account, category)
}

/// Helper to create an unposted transaction.
fn make_transaction(
    account: &Account,
    category: &Category,
    transaction_type: TransactionType,
    amount: i64,
) -> Transaction {
    let draft = TransactionDraft {
        ledger_id: account.ledger_id(),
        account_id: account.id(),
        category_id: category.id(),
        transaction_type,
        date: NaiveDate::from_ymd_opt(2026, 5, 1).unwrap(),
        amount: won(amount),
        memo: None,
    };
    Transaction::create(&draft, account, category).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Posting then unposting leaves the balance exactly where it started.
    #[test]
    fn prop_post_unpost_round_trip(
        opening in amount_strategy(),
        amount in amount_strategy(),
        transaction_type in type_strategy(),
    ) {
        let (mut account, category) = setup(opening);
        let mut txn = make_transaction(&account, &category, transaction_type, amount);

        match txn.post(&mut account) {
            Ok(()) => {
                txn.unpost(&mut account).unwrap();
                prop_assert_eq!(account.balance(), won(opening));
            }
            Err(LedgerError::InsufficientFunds { .. }) => {
                prop_assert_eq!(transaction_type, TransactionType::Expense);
                prop_assert!(amount > opening);
                prop_assert_eq!(account.balance(), won(opening));
            }
            Err(other) => prop_assert!(false, "unexpected error: {other}"),
        }
    }

    /// Any sequence of post/unpost toggles keeps the balance non-negative and
    /// equal to the opening balance plus the effect of posted transactions.
    #[test]
    fn prop_balance_matches_posted_set(
        opening in 0i64..10_000,
        specs in prop::collection::vec((type_strategy(), 0i64..5_000), 1..8),
        toggles in prop::collection::vec(0usize..8, 0..40),
    ) {
        let (mut account, category) = setup(opening);
        let mut txns: Vec<Transaction> = specs
            .iter()
            .map(|(kind, amount)| make_transaction(&account, &category, *kind, *amount))
            .collect();

        for index in toggles {
            let Some(txn) = txns.get_mut(index % specs.len()) else { continue };
            let before = account.balance();
            let result = if txn.is_posted() {
                txn.unpost(&mut account)
            } else {
                txn.post(&mut account)
            };
            if result.is_err() {
                prop_assert_eq!(account.balance(), before);
            }
        }

        let mut expected = opening;
        for (txn, (kind, amount)) in txns.iter().zip(&specs) {
            if txn.is_posted() {
                match kind {
                    TransactionType::Income => expected += amount,
                    TransactionType::Expense => expected -= amount,
                }
            }
        }
        prop_assert!(expected >= 0);
        prop_assert_eq!(account.balance(), won(expected));
    }

    /// A posted transaction rejects every field mutation and keeps its state.
    #[test]
    fn prop_posted_transaction_is_frozen(
        amount in 0i64..1_000,
        new_amount in amount_strategy(),
    ) {
        let (mut account, category) = setup(1_000);
        let mut txn = make_transaction(&account, &category, TransactionType::Expense, amount);
        txn.post(&mut account).unwrap();
        let snapshot = txn.clone();

        prop_assert!(txn.change_amount(won(new_amount)).is_err());
        prop_assert!(txn.change_type(TransactionType::Income).is_err());
        prop_assert!(txn.change_category(&category).is_err());
        prop_assert_eq!(&txn, &snapshot);
        prop_assert_eq!(account.balance(), won(1_000 - amount));
    }

    /// Accounts and categories from another ledger are never attached.
    #[test]
    fn prop_ledger_containment(amount in amount_strategy()) {
        let (account, category) = setup(0);
        let mut txn = make_transaction(&account, &category, TransactionType::Income, amount);
        let foreign_ledger = LedgerId::new();
        let foreign_account = Account::open(foreign_ledger, "Foreign").unwrap();
        let foreign_category = Category::create_root(foreign_ledger, "Foreign", false, 0).unwrap();

        prop_assert!(txn.change_account(&foreign_account).is_err());
        prop_assert!(txn.change_category(&foreign_category).is_err());
        prop_assert_eq!(txn.account_id(), account.id());
        prop_assert_eq!(txn.category_id(), category.id());
        prop_assert_eq!(txn.ledger_id(), account.ledger_id());
        prop_assert_eq!(txn.ledger_id(), category.ledger_id());
    }
}
