//! Metal prices: the live projection and its append-only log.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use karatbook_core::{DomainError, DomainResult, Timestamp};

use crate::material::{Material, MaterialFilter};
use crate::query::DateRange;
use crate::wire;

/// One entry of the price log (`GET /price-history`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    #[serde(rename = "type")]
    pub material: Material,
    #[serde(deserialize_with = "wire::lenient_f64")]
    pub price: f64,
    #[serde(default)]
    pub updated_at: Timestamp,
}

/// Current price per material, as `GET /prices` returns it.
///
/// A material the backend has never priced is `None`. Also used as the
/// single-field body of `PUT /prices/{material}`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CurrentPrices {
    #[serde(
        default,
        deserialize_with = "wire::lenient_opt_f64",
        skip_serializing_if = "Option::is_none"
    )]
    pub gold_price: Option<f64>,
    #[serde(
        default,
        deserialize_with = "wire::lenient_opt_f64",
        skip_serializing_if = "Option::is_none"
    )]
    pub silver_price: Option<f64>,
}

impl CurrentPrices {
    /// Body carrying just one material's price.
    pub fn single(material: Material, amount: f64) -> Self {
        let mut prices = Self::default();
        prices.set(material, amount);
        prices
    }

    pub fn get(&self, material: Material) -> Option<f64> {
        match material {
            Material::Gold => self.gold_price,
            Material::Silver => self.silver_price,
        }
    }

    /// Replace one material's price wholesale.
    pub fn set(&mut self, material: Material, amount: f64) {
        match material {
            Material::Gold => self.gold_price = Some(amount),
            Material::Silver => self.silver_price = Some(amount),
        }
    }

    /// The amount an update submits: the override if given, else the price
    /// currently displayed.
    pub fn resolve_update(&self, material: Material, override_amount: Option<f64>) -> DomainResult<f64> {
        let amount = override_amount.or(self.get(material)).ok_or_else(|| {
            DomainError::validation(format!("no {} price entered or displayed", material.key()))
        })?;
        validate_price(amount)
    }
}

/// Prices must be finite and non-negative.
pub fn validate_price(amount: f64) -> DomainResult<f64> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(DomainError::validation(format!("invalid price: {amount}")));
    }
    Ok(amount)
}

/// Current prices derived from the log: the latest `updated_at` per material.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceProjection {
    gold: Option<PriceRecord>,
    silver: Option<PriceRecord>,
}

impl PriceProjection {
    /// On equal timestamps the record appearing later in the log wins.
    pub fn from_log(log: &[PriceRecord]) -> Self {
        let mut projection = Self::default();
        for record in log {
            let slot = match record.material {
                Material::Gold => &mut projection.gold,
                Material::Silver => &mut projection.silver,
            };
            let newer = slot
                .as_ref()
                .is_none_or(|current| record.updated_at >= current.updated_at);
            if newer {
                *slot = Some(record.clone());
            }
        }
        projection
    }

    pub fn latest(&self, material: Material) -> Option<&PriceRecord> {
        match material {
            Material::Gold => self.gold.as_ref(),
            Material::Silver => self.silver.as_ref(),
        }
    }

    pub fn current(&self) -> CurrentPrices {
        CurrentPrices {
            gold_price: self.gold.as_ref().map(|r| r.price),
            silver_price: self.silver.as_ref().map(|r| r.price),
        }
    }
}

/// Ordering of the price-history view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PriceOrder {
    Asc,
    #[default]
    Desc,
}

impl FromStr for PriceOrder {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(PriceOrder::Asc),
            "" | "desc" => Ok(PriceOrder::Desc),
            other => Err(DomainError::validation(format!("unknown order '{other}'"))),
        }
    }
}

/// Filter parameters of the price-history view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PriceHistoryQuery {
    pub range: DateRange,
    pub material: MaterialFilter,
    pub order: PriceOrder,
}

impl PriceHistoryQuery {
    pub fn apply<'a>(&self, log: &'a [PriceRecord]) -> Vec<&'a PriceRecord> {
        let mut view: Vec<&PriceRecord> = log
            .iter()
            .filter(|r| self.material.matches(r.material) && self.range.contains(&r.updated_at))
            .collect();
        match self.order {
            PriceOrder::Asc => view.sort_by(|a, b| a.updated_at.cmp(&b.updated_at)),
            PriceOrder::Desc => view.sort_by(|a, b| b.updated_at.cmp(&a.updated_at)),
        }
        view
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(material: Material, price: f64, at: &str) -> PriceRecord {
        PriceRecord {
            material,
            price,
            updated_at: Timestamp::parse(at),
        }
    }

    fn log() -> Vec<PriceRecord> {
        vec![
            record(Material::Gold, 7_100.0, "2026-10-17T09:00:00Z"),
            record(Material::Silver, 92.5, "2026-10-18T09:00:00Z"),
            record(Material::Gold, 7_250.0, "2026-10-19T09:00:00Z"),
            record(Material::Gold, 7_180.0, "2026-10-18T09:00:00Z"),
        ]
    }

    #[test]
    fn projection_takes_latest_per_material() {
        let projection = PriceProjection::from_log(&log());
        let current = projection.current();
        assert_eq!(current.gold_price, Some(7_250.0));
        assert_eq!(current.silver_price, Some(92.5));
        assert!(PriceProjection::from_log(&[]).latest(Material::Gold).is_none());
    }

    #[test]
    fn update_falls_back_to_displayed_value() {
        let prices = CurrentPrices {
            gold_price: Some(7_000.0),
            silver_price: None,
        };
        assert_eq!(prices.resolve_update(Material::Gold, None).unwrap(), 7_000.0);
        assert_eq!(prices.resolve_update(Material::Gold, Some(7_300.0)).unwrap(), 7_300.0);
        assert!(matches!(
            prices.resolve_update(Material::Silver, None),
            Err(DomainError::Validation(_))
        ));
        assert!(prices.resolve_update(Material::Silver, Some(-1.0)).is_err());
        assert!(prices.resolve_update(Material::Silver, Some(f64::NAN)).is_err());
    }

    #[test]
    fn single_body_carries_one_field() {
        let body = serde_json::to_value(CurrentPrices::single(Material::Silver, 95.0)).unwrap();
        assert_eq!(body, serde_json::json!({ "silver_price": 95.0 }));
    }

    #[test]
    fn decodes_string_prices_and_lowercase_type() {
        let record: PriceRecord = serde_json::from_value(serde_json::json!({
            "type": "gold",
            "price": "7250",
            "updated_at": "2026-10-19T09:00:00.000Z"
        }))
        .unwrap();
        assert_eq!(record.material, Material::Gold);
        assert_eq!(record.price, 7_250.0);

        let prices: CurrentPrices =
            serde_json::from_value(serde_json::json!({ "gold_price": "7000", "silver_price": null }))
                .unwrap();
        assert_eq!(prices.gold_price, Some(7_000.0));
        assert_eq!(prices.silver_price, None);
    }

    #[test]
    fn history_query_filters_range_and_material_newest_first() {
        let log = log();
        let query = PriceHistoryQuery {
            range: DateRange::new(NaiveDate::from_ymd_opt(2026, 10, 18), None),
            material: MaterialFilter::Only(Material::Gold),
            order: PriceOrder::default(),
        };
        let prices: Vec<f64> = query.apply(&log).iter().map(|r| r.price).collect();
        assert_eq!(prices, vec![7_250.0, 7_180.0]);

        let asc = PriceHistoryQuery {
            order: "asc".parse().unwrap(),
            ..PriceHistoryQuery::default()
        };
        let first = asc.apply(&log)[0];
        assert_eq!(first.price, 7_100.0);
    }
}
