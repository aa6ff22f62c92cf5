//! `karatbook-core`: shared domain building blocks.
//!
//! This crate contains **pure domain** primitives (no IO, no HTTP, no storage).

pub mod entity;
pub mod error;
pub mod id;
pub mod timestamp;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{HistoryId, LedgerEntryId, StockId};
pub use timestamp::Timestamp;
