//! Posting engine: orchestrates transactions, accounts and categories inside
//! one unit of work per operation.
//!
//! The engine never recomputes a balance by summing transactions. Every post
//! is mirrored by an equal and opposite unpost, so the account balance stays
//! the single source of truth.

pub mod service;

pub use service::PostingEngine;
