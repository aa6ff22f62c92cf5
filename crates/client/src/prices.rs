//! Live metal prices and the price log.

use std::sync::Arc;

use karatbook_inventory::{CurrentPrices, Material, PriceHistoryQuery, PriceProjection, PriceRecord};

use crate::api::InventoryApi;
use crate::error::ServiceResult;

pub struct PriceBoard<A: ?Sized> {
    api: Arc<A>,
    current: CurrentPrices,
    log: Vec<PriceRecord>,
}

impl<A: InventoryApi + ?Sized> PriceBoard<A> {
    pub fn new(api: Arc<A>) -> Self {
        Self {
            api,
            current: CurrentPrices::default(),
            log: Vec::new(),
        }
    }

    /// Prices as last displayed.
    pub fn current(&self) -> CurrentPrices {
        self.current
    }

    pub async fn load(&mut self) -> ServiceResult<CurrentPrices> {
        self.current = self.api.current_prices().await?;
        Ok(self.current)
    }

    /// Replace one material's price.
    ///
    /// Without an override the displayed price is resubmitted as-is. Returns
    /// the price the backend now reports.
    pub async fn update(&mut self, material: Material, override_amount: Option<f64>) -> ServiceResult<f64> {
        let amount = self.current.resolve_update(material, override_amount)?;
        let echoed = self.api.set_price(material, amount).await?;
        let now = echoed.get(material).unwrap_or(amount);
        self.current.set(material, now);
        tracing::info!(material = %material, price = now, "price updated");
        Ok(now)
    }

    pub async fn load_history(&mut self) -> ServiceResult<&[PriceRecord]> {
        self.log = self.api.price_history().await?;
        Ok(&self.log)
    }

    pub fn history_view(&self, query: &PriceHistoryQuery) -> Vec<&PriceRecord> {
        query.apply(&self.log)
    }

    /// Current prices as the loaded log implies them.
    pub fn projection(&self) -> PriceProjection {
        PriceProjection::from_log(&self.log)
    }
}
