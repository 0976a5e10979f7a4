//! Domain types for transaction creation and editing.

use chrono::{DateTime, NaiveDate, Utc};
use payv_shared::types::{AccountId, CategoryId, LedgerId, Money};
use serde::{Deserialize, Serialize};

/// Direction of a transaction's effect on its account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    /// Money coming in; posting credits the account.
    Income,
    /// Money going out; posting debits the account.
    Expense,
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Income => write!(f, "INCOME"),
            Self::Expense => write!(f, "EXPENSE"),
        }
    }
}

impl std::str::FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "INCOME" => Ok(Self::Income),
            "EXPENSE" => Ok(Self::Expense),
            _ => Err(format!("Unknown transaction type: {s}")),
        }
    }
}

/// Whether a transaction's amount is currently applied to its account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PostingStatus {
    /// Draft; no balance effect.
    #[default]
    Unposted,
    /// Applied to the account balance exactly once.
    Posted {
        /// When the amount was applied.
        posted_at: DateTime<Utc>,
    },
}

/// Input for creating a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionDraft {
    /// Owning ledger.
    pub ledger_id: LedgerId,
    /// Account the amount is posted against.
    pub account_id: AccountId,
    /// Classification.
    pub category_id: CategoryId,
    /// Income or expense.
    pub transaction_type: TransactionType,
    /// Value date.
    pub date: NaiveDate,
    /// Amount; the sign is carried by `transaction_type`.
    pub amount: Money,
    /// Free-form note.
    #[serde(default)]
    pub memo: Option<String>,
}

/// Partial edit of an unposted transaction. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionChanges {
    /// New account.
    #[serde(default)]
    pub account_id: Option<AccountId>,
    /// New direction.
    #[serde(default)]
    pub transaction_type: Option<TransactionType>,
    /// New value date.
    #[serde(default)]
    pub date: Option<NaiveDate>,
    /// New amount.
    #[serde(default)]
    pub amount: Option<Money>,
    /// New category.
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    /// New memo; a blank string clears it.
    #[serde(default)]
    pub memo: Option<String>,
}

/// Full replacement of a transaction's fields, applied by the one-click edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionEdit {
    /// Account to post against afterwards.
    pub account_id: AccountId,
    /// Direction.
    pub transaction_type: TransactionType,
    /// Value date.
    pub date: NaiveDate,
    /// Amount.
    pub amount: Money,
    /// Category.
    pub category_id: CategoryId,
    /// Memo; `None` or blank clears it.
    #[serde(default)]
    pub memo: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_type_round_trip() {
        assert_eq!("expense".parse::<TransactionType>().unwrap(), TransactionType::Expense);
        assert_eq!(TransactionType::Income.to_string(), "INCOME");
        assert!("TRANSFER".parse::<TransactionType>().is_err());
        assert_eq!(
            serde_json::to_string(&TransactionType::Expense).unwrap(),
            r#""EXPENSE""#
        );
    }

    #[test]
    fn test_posting_status_serde() {
        let json = serde_json::to_value(PostingStatus::Unposted).unwrap();
        assert_eq!(json, serde_json::json!({ "state": "unposted" }));

        let posted: PostingStatus = serde_json::from_value(serde_json::json!({
            "state": "posted",
            "posted_at": "2026-03-01T09:30:00Z"
        }))
        .unwrap();
        assert!(matches!(posted, PostingStatus::Posted { .. }));
    }

    #[test]
    fn test_changes_default_is_empty() {
        let changes: TransactionChanges = serde_json::from_str("{}").unwrap();
        assert_eq!(changes, TransactionChanges::default());
    }
}
