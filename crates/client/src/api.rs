//! The remote backend, as the client sees it.

use async_trait::async_trait;

use karatbook_core::{LedgerEntryId, StockId};
use karatbook_inventory::{
    CurrentPrices, DailyLedgerEntry, HistoryRecord, Material, NewHistoryRecord, NewLedgerEntry,
    PriceRecord, StockItem, StockPatch, StockRecord,
};

use crate::error::ApiResult;
use crate::session::{AccountUpdate, Credentials, UserProfile};

/// One method per backend endpoint. Implementations perform exactly one
/// request per call and never retry.
#[async_trait]
pub trait InventoryApi: Send + Sync {
    /// `GET /stocks`
    async fn list_stock(&self) -> ApiResult<Vec<StockItem>>;

    /// `POST /add-stock`
    async fn add_stock(&self, record: &StockRecord) -> ApiResult<StockItem>;

    /// `PUT /stocks/{id}` with a full body.
    async fn replace_stock(&self, id: &StockId, record: &StockRecord) -> ApiResult<StockItem>;

    /// `PUT /stocks/{id}` with `{weight, pieces}`.
    ///
    /// `Ok(None)` means the patch was applied but the reply carried no stock
    /// document.
    async fn update_stock_quantity(
        &self,
        id: &StockId,
        patch: StockPatch,
    ) -> ApiResult<Option<StockItem>>;

    /// `DELETE /stocks/{id}`
    async fn delete_stock(&self, id: &StockId) -> ApiResult<()>;

    /// `GET /todays-stock`
    async fn list_ledger(&self) -> ApiResult<Vec<DailyLedgerEntry>>;

    /// `POST /todays-stock`
    async fn create_ledger_entry(&self, entry: &NewLedgerEntry) -> ApiResult<DailyLedgerEntry>;

    /// `DELETE /todays-stock/{id}`
    async fn delete_ledger_entry(&self, id: &LedgerEntryId) -> ApiResult<()>;

    /// `POST /alltodayshistory`
    async fn create_history(&self, record: &NewHistoryRecord) -> ApiResult<HistoryRecord>;

    /// `GET /alltodayshistory`
    async fn list_history(&self) -> ApiResult<Vec<HistoryRecord>>;

    /// `GET /prices`
    async fn current_prices(&self) -> ApiResult<CurrentPrices>;

    /// `PUT /prices/{gold|silver}`
    async fn set_price(&self, material: Material, amount: f64) -> ApiResult<CurrentPrices>;

    /// `GET /price-history`
    async fn price_history(&self) -> ApiResult<Vec<PriceRecord>>;

    /// `POST /login`
    async fn login(&self, credentials: &Credentials) -> ApiResult<UserProfile>;

    /// `PUT /login`
    async fn update_account(&self, update: &AccountUpdate) -> ApiResult<()>;

    /// `GET /user-details?username=...`
    async fn user_details(&self, username: &str) -> ApiResult<UserProfile>;
}
