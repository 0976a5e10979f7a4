//! Two-level category tree scoped to a ledger.

pub mod entity;
pub mod service;

pub use entity::Category;
pub use service::{CategoryService, NewCategory};
