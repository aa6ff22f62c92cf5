//! In-process stand-in for the backend.
//!
//! Holds documents in memory, records every call, and can be told to fail a
//! specific endpoint. Used by tests and for offline demos.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use tokio::sync::Mutex;

use karatbook_core::{HistoryId, LedgerEntryId, StockId, Timestamp};
use karatbook_inventory::{
    CurrentPrices, DailyLedgerEntry, HistoryRecord, Material, NewHistoryRecord, NewLedgerEntry,
    PriceRecord, StockItem, StockPatch, StockRecord,
};

use crate::api::InventoryApi;
use crate::error::{ApiError, ApiResult};
use crate::session::{AccountUpdate, Credentials, UserProfile};

/// Identifies an [`InventoryApi`] method, for failure injection and call logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    ListStock,
    AddStock,
    ReplaceStock,
    UpdateStockQuantity,
    DeleteStock,
    ListLedger,
    CreateLedgerEntry,
    DeleteLedgerEntry,
    CreateHistory,
    ListHistory,
    CurrentPrices,
    SetPrice,
    PriceHistory,
    Login,
    UpdateAccount,
    UserDetails,
}

#[derive(Debug, Default)]
struct FakeState {
    stock: Vec<StockItem>,
    ledger: Vec<DailyLedgerEntry>,
    history: Vec<HistoryRecord>,
    prices: CurrentPrices,
    price_log: Vec<PriceRecord>,
    users: Vec<(UserProfile, String)>,
    /// Scripted outcomes per endpoint; `None` lets one call through.
    failures: HashMap<Endpoint, VecDeque<Option<ApiError>>>,
    calls: Vec<Endpoint>,
}

impl FakeState {
    /// Log the call, then fail it if a failure is queued for the endpoint.
    fn enter(&mut self, endpoint: Endpoint) -> ApiResult<()> {
        self.calls.push(endpoint);
        match self.failures.get_mut(&endpoint).and_then(VecDeque::pop_front) {
            Some(Some(err)) => Err(err),
            _ => Ok(()),
        }
    }

    fn stock_mut(&mut self, id: &StockId) -> ApiResult<&mut StockItem> {
        self.stock
            .iter_mut()
            .find(|s| &s.id == id)
            .ok_or_else(|| ApiError::NotFound(format!("stocks/{id}")))
    }
}

#[derive(Debug, Default)]
pub struct InMemoryApi {
    state: Mutex<FakeState>,
}

fn mint_id() -> String {
    uuid::Uuid::now_v7().simple().to_string()
}

fn minted<T, E>(make: impl FnOnce(String) -> Result<T, E>) -> ApiResult<T>
where
    E: core::fmt::Display,
{
    make(mint_id()).map_err(|err| ApiError::Parse(err.to_string()))
}

impl InMemoryApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stock(mut self, stock: Vec<StockItem>) -> Self {
        self.state.get_mut().stock = stock;
        self
    }

    pub fn with_ledger(mut self, ledger: Vec<DailyLedgerEntry>) -> Self {
        self.state.get_mut().ledger = ledger;
        self
    }

    pub fn with_history(mut self, history: Vec<HistoryRecord>) -> Self {
        self.state.get_mut().history = history;
        self
    }

    pub fn with_prices(mut self, prices: CurrentPrices) -> Self {
        self.state.get_mut().prices = prices;
        self
    }

    pub fn with_price_log(mut self, log: Vec<PriceRecord>) -> Self {
        self.state.get_mut().price_log = log;
        self
    }

    pub fn with_user(mut self, profile: UserProfile, password: impl Into<String>) -> Self {
        self.state.get_mut().users.push((profile, password.into()));
        self
    }

    /// Queue a failure for the next call to `endpoint`. Queued outcomes are
    /// consumed in order, one per call.
    pub async fn fail_next(&self, endpoint: Endpoint, error: ApiError) {
        self.script(endpoint, Some(error)).await;
    }

    /// Queue a success, so a failure queued after it hits a later call.
    pub async fn pass_next(&self, endpoint: Endpoint) {
        self.script(endpoint, None).await;
    }

    async fn script(&self, endpoint: Endpoint, outcome: Option<ApiError>) {
        self.state
            .lock()
            .await
            .failures
            .entry(endpoint)
            .or_default()
            .push_back(outcome);
    }

    pub async fn calls(&self) -> Vec<Endpoint> {
        self.state.lock().await.calls.clone()
    }

    pub async fn call_count(&self, endpoint: Endpoint) -> usize {
        self.state
            .lock()
            .await
            .calls
            .iter()
            .filter(|c| **c == endpoint)
            .count()
    }

    pub async fn stock(&self) -> Vec<StockItem> {
        self.state.lock().await.stock.clone()
    }

    pub async fn ledger(&self) -> Vec<DailyLedgerEntry> {
        self.state.lock().await.ledger.clone()
    }

    pub async fn history(&self) -> Vec<HistoryRecord> {
        self.state.lock().await.history.clone()
    }

    pub async fn price_log(&self) -> Vec<PriceRecord> {
        self.state.lock().await.price_log.clone()
    }

    /// Insert a ledger entry behind the client's back (another terminal).
    pub async fn push_ledger_entry(&self, entry: DailyLedgerEntry) {
        self.state.lock().await.ledger.push(entry);
    }
}

#[async_trait]
impl InventoryApi for InMemoryApi {
    async fn list_stock(&self) -> ApiResult<Vec<StockItem>> {
        let mut state = self.state.lock().await;
        state.enter(Endpoint::ListStock)?;
        Ok(state.stock.clone())
    }

    async fn add_stock(&self, record: &StockRecord) -> ApiResult<StockItem> {
        let mut state = self.state.lock().await;
        state.enter(Endpoint::AddStock)?;
        let item = record.clone().into_item(minted(StockId::new)?);
        state.stock.push(item.clone());
        Ok(item)
    }

    async fn replace_stock(&self, id: &StockId, record: &StockRecord) -> ApiResult<StockItem> {
        let mut state = self.state.lock().await;
        state.enter(Endpoint::ReplaceStock)?;
        let slot = state.stock_mut(id)?;
        *slot = record.clone().into_item(id.clone());
        Ok(slot.clone())
    }

    async fn update_stock_quantity(
        &self,
        id: &StockId,
        patch: StockPatch,
    ) -> ApiResult<Option<StockItem>> {
        let mut state = self.state.lock().await;
        state.enter(Endpoint::UpdateStockQuantity)?;
        let slot = state.stock_mut(id)?;
        slot.weight = patch.weight;
        slot.pieces = patch.pieces;
        Ok(Some(slot.clone()))
    }

    async fn delete_stock(&self, id: &StockId) -> ApiResult<()> {
        let mut state = self.state.lock().await;
        state.enter(Endpoint::DeleteStock)?;
        let before = state.stock.len();
        state.stock.retain(|s| &s.id != id);
        if state.stock.len() == before {
            return Err(ApiError::NotFound(format!("stocks/{id}")));
        }
        Ok(())
    }

    async fn list_ledger(&self) -> ApiResult<Vec<DailyLedgerEntry>> {
        let mut state = self.state.lock().await;
        state.enter(Endpoint::ListLedger)?;
        Ok(state.ledger.clone())
    }

    async fn create_ledger_entry(&self, entry: &NewLedgerEntry) -> ApiResult<DailyLedgerEntry> {
        let mut state = self.state.lock().await;
        state.enter(Endpoint::CreateLedgerEntry)?;
        let created = entry.clone().into_entry(minted(LedgerEntryId::new)?);
        state.ledger.push(created.clone());
        Ok(created)
    }

    async fn delete_ledger_entry(&self, id: &LedgerEntryId) -> ApiResult<()> {
        let mut state = self.state.lock().await;
        state.enter(Endpoint::DeleteLedgerEntry)?;
        let before = state.ledger.len();
        state.ledger.retain(|e| &e.id != id);
        if state.ledger.len() == before {
            return Err(ApiError::NotFound(format!("todays-stock/{id}")));
        }
        Ok(())
    }

    async fn create_history(&self, record: &NewHistoryRecord) -> ApiResult<HistoryRecord> {
        let mut state = self.state.lock().await;
        state.enter(Endpoint::CreateHistory)?;
        let stored = record.clone().into_record(Some(minted(HistoryId::new)?));
        state.history.push(stored.clone());
        Ok(stored)
    }

    async fn list_history(&self) -> ApiResult<Vec<HistoryRecord>> {
        let mut state = self.state.lock().await;
        state.enter(Endpoint::ListHistory)?;
        Ok(state.history.clone())
    }

    async fn current_prices(&self) -> ApiResult<CurrentPrices> {
        let mut state = self.state.lock().await;
        state.enter(Endpoint::CurrentPrices)?;
        Ok(state.prices)
    }

    async fn set_price(&self, material: Material, amount: f64) -> ApiResult<CurrentPrices> {
        let mut state = self.state.lock().await;
        state.enter(Endpoint::SetPrice)?;
        state.prices.set(material, amount);
        state.price_log.push(PriceRecord {
            material,
            price: amount,
            updated_at: Timestamp::now(),
        });
        Ok(CurrentPrices::single(material, amount))
    }

    async fn price_history(&self) -> ApiResult<Vec<PriceRecord>> {
        let mut state = self.state.lock().await;
        state.enter(Endpoint::PriceHistory)?;
        Ok(state.price_log.clone())
    }

    async fn login(&self, credentials: &Credentials) -> ApiResult<UserProfile> {
        let mut state = self.state.lock().await;
        state.enter(Endpoint::Login)?;
        state
            .users
            .iter()
            .find(|(profile, password)| {
                profile.username == credentials.username && *password == credentials.password
            })
            .map(|(profile, _)| profile.clone())
            .ok_or(ApiError::Unauthorized)
    }

    async fn update_account(&self, update: &AccountUpdate) -> ApiResult<()> {
        let mut state = self.state.lock().await;
        state.enter(Endpoint::UpdateAccount)?;
        let (profile, password) = state
            .users
            .iter_mut()
            .find(|(profile, _)| profile.username == update.original_username)
            .ok_or_else(|| ApiError::NotFound(format!("user {}", update.original_username)))?;
        profile.name = update.name.clone();
        profile.username = update.username.clone();
        *password = update.password.clone();
        Ok(())
    }

    async fn user_details(&self, username: &str) -> ApiResult<UserProfile> {
        let mut state = self.state.lock().await;
        state.enter(Endpoint::UserDetails)?;
        state
            .users
            .iter()
            .find(|(profile, _)| profile.username == username)
            .map(|(profile, _)| UserProfile {
                name: profile.name.clone(),
                username: profile.username.clone(),
                ..UserProfile::default()
            })
            .ok_or_else(|| ApiError::NotFound(format!("user {username}")))
    }
}
