//! Inventory domain module for a jewelry shop.
//!
//! This crate contains the business rules for on-hand stock, the daily
//! "given out" ledger, its history, and metal prices, implemented purely as
//! deterministic domain logic (no IO, no HTTP, no storage).

pub mod display;
pub mod history;
pub mod ledger;
pub mod material;
pub mod price;
pub mod query;
pub mod stock;
pub mod weight;
mod wire;

pub use history::{HistoryRecord, NewHistoryRecord};
pub use ledger::{DailyLedgerEntry, Disposition, LedgerDraft, LedgerStatus, NewLedgerEntry};
pub use material::{Material, MaterialFilter};
pub use price::{CurrentPrices, PriceHistoryQuery, PriceOrder, PriceProjection, PriceRecord};
pub use query::{DateRange, LedgerQuery, LedgerRow, LedgerSort, StatusFilter};
pub use stock::{
    StockDraft, StockItem, StockPatch, StockQuantity, StockQuery, StockRecord, StockSort,
    find_matching_stock,
};
pub use weight::Weight;
