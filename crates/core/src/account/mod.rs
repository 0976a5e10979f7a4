//! Accounts and their running balances.
//!
//! An account balance is the single source of truth for how much money the
//! account holds. It only moves through [`Account::credit`] and
//! [`Account::debit`], which the posting protocol invokes.

pub mod entity;
pub mod service;

pub use entity::Account;
pub use service::AccountService;
