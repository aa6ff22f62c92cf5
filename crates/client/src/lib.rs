//! `karatbook-client`: the jewelry inventory client.
//!
//! Everything here talks to the remote backend through [`InventoryApi`]:
//! - [`DailyLedger`]: today's given-out items and their disposition workflow
//! - [`StockBook`], [`HistoryBook`], [`PriceBoard`]: the other list views
//! - [`SessionManager`]: login state persisted in a [`ClientStore`]
//!
//! Filtering and sorting run locally on fetched snapshots (see
//! `karatbook_inventory`).

pub mod api;
pub mod config;
pub mod error;
pub mod history;
pub mod http;
pub mod in_memory;
pub mod notice;
pub mod prices;
pub mod reconciler;
pub mod sequence;
pub mod session;
pub mod stock_book;
pub mod store;

pub use api::InventoryApi;
pub use config::{ClientConfig, ConfigError};
pub use error::{ApiError, ApiResult, ServiceError, ServiceResult};
pub use history::HistoryBook;
pub use http::HttpApi;
pub use in_memory::{Endpoint, InMemoryApi};
pub use notice::{Notice, NoticeLevel};
pub use prices::PriceBoard;
pub use reconciler::{DailyLedger, Disposal, SagaStep};
pub use sequence::{FetchSequencer, FetchTicket};
pub use session::{
    AccountUpdate, Credentials, GateDecision, SessionContext, SessionManager, SettingsUpdate,
    UserProfile,
};
pub use stock_book::StockBook;
pub use store::{ClientStore, MemoryStore, SqliteStore, StoreError};
