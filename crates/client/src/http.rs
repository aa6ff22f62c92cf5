//! reqwest-backed [`InventoryApi`].

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;

use karatbook_core::{HistoryId, LedgerEntryId, StockId};
use karatbook_inventory::{
    CurrentPrices, DailyLedgerEntry, HistoryRecord, Material, NewHistoryRecord, NewLedgerEntry,
    PriceRecord, StockItem, StockPatch, StockRecord,
};

use crate::api::InventoryApi;
use crate::config::ClientConfig;
use crate::error::{ApiError, ApiResult};
use crate::session::{AccountUpdate, Credentials, UserProfile};

/// Client for the backend's JSON API.
#[derive(Debug, Clone)]
pub struct HttpApi {
    client: Client,
    base: Url,
}

impl HttpApi {
    pub fn new(config: &ClientConfig) -> ApiResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;
        Self::with_client(client, &config.api_url)
    }

    pub fn with_client(client: Client, api_url: &str) -> ApiResult<Self> {
        let base = Url::parse(api_url).map_err(|e| ApiError::InvalidUrl(format!("{api_url}: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(api_url.to_string()));
        }
        Ok(Self { client, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Base URL with `segments` appended, each percent-encoded.
    fn url(&self, segments: &[&str]) -> ApiResult<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> ApiResult<RequestBuilder> {
        let url = self.url(segments)?;
        tracing::debug!(%method, %url, "api request");
        Ok(self.client.request(method, url))
    }

    async fn send(&self, req: RequestBuilder) -> ApiResult<String> {
        let resp = req.send().await.map_err(|e| ApiError::Network(e.to_string()))?;
        let status = resp.status();
        let path = resp.url().path().to_string();
        let body = resp.text().await.unwrap_or_default();

        match status {
            s if s.is_success() => Ok(body),
            StatusCode::UNAUTHORIZED => Err(ApiError::Unauthorized),
            StatusCode::NOT_FOUND => Err(ApiError::NotFound(path)),
            s => Err(ApiError::Api {
                status: s.as_u16(),
                body,
            }),
        }
    }

    async fn json<T: DeserializeOwned>(&self, req: RequestBuilder) -> ApiResult<T> {
        let body = self.send(req).await?;
        serde_json::from_str(&body).map_err(|e| ApiError::Parse(e.to_string()))
    }

    async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> ApiResult<T> {
        self.json(self.request(Method::GET, segments)?).await
    }

    async fn with_body<B, T>(&self, method: Method, segments: &[&str], body: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.json(self.request(method, segments)?.json(body)).await
    }

    /// POST a new document. Returns the reply's `_id`, if it names one; the
    /// document is stored either way once the reply is 2xx.
    async fn create<B: Serialize + ?Sized>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> ApiResult<Option<String>> {
        let text = self
            .send(self.request(Method::POST, segments)?.json(body))
            .await?;
        let id = created_id(&text);
        if id.is_none() {
            tracing::warn!(path = segments.join("/"), "created document without an _id in the reply");
        }
        Ok(id)
    }

    /// Send a write whose 2xx reply may or may not echo the stored document.
    async fn write<B, T>(&self, method: Method, segments: &[&str], body: &B) -> ApiResult<Option<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let text = self.send(self.request(method, segments)?.json(body)).await?;
        Ok(echoed(&text))
    }
}

/// The stored document, when a 2xx write reply carries one.
fn echoed<T: DeserializeOwned>(body: &str) -> Option<T> {
    match serde_json::from_str(body) {
        Ok(doc) => Some(doc),
        Err(err) => {
            tracing::debug!(error = %err, "write reply carries no document");
            None
        }
    }
}

/// `_id` of a created document, whether the backend returns the document
/// itself or wraps it (`{"data": {...}}`).
fn created_id(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let doc = value.get("data").unwrap_or(&value);
    doc.get("_id")
        .and_then(|id| id.as_str())
        .map(str::to_string)
}

fn parse_id<T>(raw: String, parse: impl FnOnce(String) -> Result<T, karatbook_core::DomainError>) -> ApiResult<T> {
    parse(raw).map_err(|e| ApiError::Parse(e.to_string()))
}

#[async_trait]
impl InventoryApi for HttpApi {
    async fn list_stock(&self) -> ApiResult<Vec<StockItem>> {
        self.get(&["stocks"]).await
    }

    async fn add_stock(&self, record: &StockRecord) -> ApiResult<StockItem> {
        if let Some(id) = self.create(&["add-stock"], record).await? {
            return Ok(record.clone().into_item(parse_id(id, StockId::new)?));
        }
        // Stored without a reported id: find it by what was sent.
        self.list_stock()
            .await?
            .into_iter()
            .rev()
            .find(|s| {
                s.item_name == record.item_name
                    && s.material == record.material
                    && s.updated_at.as_str() == record.updated_at.as_str()
            })
            .ok_or_else(|| ApiError::Parse("added stock item not found in stock list".into()))
    }

    async fn replace_stock(&self, id: &StockId, record: &StockRecord) -> ApiResult<StockItem> {
        let echoed = self
            .write(Method::PUT, &["stocks", id.as_str()], record)
            .await?;
        Ok(echoed.unwrap_or_else(|| record.clone().into_item(id.clone())))
    }

    async fn update_stock_quantity(
        &self,
        id: &StockId,
        patch: StockPatch,
    ) -> ApiResult<Option<StockItem>> {
        self.write(Method::PUT, &["stocks", id.as_str()], &patch)
            .await
    }

    async fn delete_stock(&self, id: &StockId) -> ApiResult<()> {
        self.send(self.request(Method::DELETE, &["stocks", id.as_str()])?)
            .await
            .map(drop)
    }

    async fn list_ledger(&self) -> ApiResult<Vec<DailyLedgerEntry>> {
        self.get(&["todays-stock"]).await
    }

    async fn create_ledger_entry(&self, entry: &NewLedgerEntry) -> ApiResult<DailyLedgerEntry> {
        if let Some(id) = self.create(&["todays-stock"], entry).await? {
            return Ok(entry.clone().into_entry(parse_id(id, LedgerEntryId::new)?));
        }
        self.list_ledger()
            .await?
            .into_iter()
            .rev()
            .find(|e| {
                e.item_name == entry.item_name
                    && e.recipient == entry.recipient
                    && e.issued_at.as_str() == entry.issued_at.as_str()
            })
            .ok_or_else(|| ApiError::Parse("created ledger entry not found in ledger".into()))
    }

    async fn delete_ledger_entry(&self, id: &LedgerEntryId) -> ApiResult<()> {
        self.send(self.request(Method::DELETE, &["todays-stock", id.as_str()])?)
            .await
            .map(drop)
    }

    async fn create_history(&self, record: &NewHistoryRecord) -> ApiResult<HistoryRecord> {
        let text = self
            .send(self.request(Method::POST, &["alltodayshistory"])?.json(record))
            .await?;
        // The write is durable once the backend answers 2xx, id or not.
        let id = created_id(&text).and_then(|raw| HistoryId::new(raw).ok());
        Ok(record.clone().into_record(id))
    }

    async fn list_history(&self) -> ApiResult<Vec<HistoryRecord>> {
        self.get(&["alltodayshistory"]).await
    }

    async fn current_prices(&self) -> ApiResult<CurrentPrices> {
        self.get(&["prices"]).await
    }

    async fn set_price(&self, material: Material, amount: f64) -> ApiResult<CurrentPrices> {
        self.with_body(
            Method::PUT,
            &["prices", material.key()],
            &CurrentPrices::single(material, amount),
        )
        .await
    }

    async fn price_history(&self) -> ApiResult<Vec<PriceRecord>> {
        self.get(&["price-history"]).await
    }

    async fn login(&self, credentials: &Credentials) -> ApiResult<UserProfile> {
        self.with_body(Method::POST, &["login"], credentials).await
    }

    async fn update_account(&self, update: &AccountUpdate) -> ApiResult<()> {
        self.send(self.request(Method::PUT, &["login"])?.json(update))
            .await
            .map(drop)
    }

    async fn user_details(&self, username: &str) -> ApiResult<UserProfile> {
        let req = self
            .request(Method::GET, &["user-details"])?
            .query(&[("username", username)]);
        self.json(req).await
    }
}
