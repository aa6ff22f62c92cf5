//! On-hand stock.
//!
//! The stock list is the authoritative count of metal in the shop. Sales from
//! the daily ledger withdraw from it; withdrawals never go below zero.

use core::cmp::{Ordering, Reverse};
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use karatbook_core::{DomainError, DomainResult, Entity, StockId, Timestamp};

use crate::ledger::DailyLedgerEntry;
use crate::material::{Material, MaterialFilter};
use crate::query::{DateRange, contains_ignore_case};
use crate::weight::Weight;
use crate::wire;

/// A stock document (read model of `GET /stocks`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockItem {
    #[serde(rename = "_id")]
    pub id: StockId,
    #[serde(rename = "itemname")]
    pub item_name: String,
    #[serde(default)]
    pub weight: Weight,
    #[serde(default, deserialize_with = "wire::lenient_u32")]
    pub pieces: u32,
    #[serde(rename = "type")]
    pub material: Material,
    #[serde(default)]
    pub author: String,
    #[serde(rename = "date", default)]
    pub updated_at: Timestamp,
}

/// Weight and piece count held for one stock item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StockQuantity {
    pub weight: Weight,
    pub pieces: u32,
}

impl StockItem {
    pub fn quantity(&self) -> StockQuantity {
        StockQuantity {
            weight: self.weight,
            pieces: self.pieces,
        }
    }

    /// Same item name (case-insensitive) and same material.
    pub fn matches_ledger_item(&self, item_name: &str, material: Material) -> bool {
        self.material == material && self.item_name.to_lowercase() == item_name.to_lowercase()
    }

    /// Quantity left after taking `weight` and `pieces` out.
    ///
    /// Fails without side effects when either result would be negative.
    pub fn withdraw(&self, weight: Weight, pieces: u32) -> DomainResult<StockQuantity> {
        let remaining_weight = self.weight.checked_sub(weight).ok_or_else(|| {
            DomainError::insufficient_stock(format!(
                "{} has {} g on hand, {} g requested",
                self.item_name, self.weight, weight
            ))
        })?;
        let remaining_pieces = self.pieces.checked_sub(pieces).ok_or_else(|| {
            DomainError::insufficient_stock(format!(
                "{} has {} pieces on hand, {} requested",
                self.item_name, self.pieces, pieces
            ))
        })?;
        Ok(StockQuantity {
            weight: remaining_weight,
            pieces: remaining_pieces,
        })
    }

    pub fn with_quantity(mut self, quantity: StockQuantity) -> Self {
        self.weight = quantity.weight;
        self.pieces = quantity.pieces;
        self
    }
}

impl Entity for StockItem {
    type Id = StockId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// The stock item a ledger entry was drawn from.
pub fn find_matching_stock<'a>(
    stock: &'a [StockItem],
    entry: &DailyLedgerEntry,
) -> Option<&'a StockItem> {
    stock
        .iter()
        .find(|item| item.matches_ledger_item(&entry.item_name, entry.material))
}

/// Body of the quantity-only `PUT /stocks/{id}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockPatch {
    pub weight: Weight,
    #[serde(deserialize_with = "wire::lenient_u32")]
    pub pieces: u32,
}

impl From<StockQuantity> for StockPatch {
    fn from(value: StockQuantity) -> Self {
        Self {
            weight: value.weight,
            pieces: value.pieces,
        }
    }
}

/// Form input for adding or editing stock.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StockDraft {
    pub item_name: String,
    pub weight: Option<Weight>,
    pub pieces: Option<u32>,
    pub material: Option<Material>,
}

/// Full stock body of `POST /add-stock` and the editing `PUT /stocks/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockRecord {
    #[serde(rename = "itemname")]
    pub item_name: String,
    pub weight: Weight,
    #[serde(default, deserialize_with = "wire::lenient_u32")]
    pub pieces: u32,
    #[serde(rename = "type")]
    pub material: Material,
    #[serde(rename = "date")]
    pub updated_at: Timestamp,
    pub author: String,
}

impl StockRecord {
    /// New stock. Item name and weight are required; pieces default to 0 and
    /// material to Gold.
    pub fn from_draft(draft: StockDraft, author: &str, now: Timestamp) -> DomainResult<Self> {
        let item_name = draft.item_name.trim();
        let mut missing = Vec::new();
        if item_name.is_empty() {
            missing.push("item name");
        }
        if draft.weight.is_none() {
            missing.push("weight");
        }
        if !missing.is_empty() {
            return Err(DomainError::validation(format!(
                "required fields missing: {}",
                missing.join(", ")
            )));
        }

        Ok(Self {
            item_name: item_name.to_string(),
            weight: draft.weight.unwrap_or_default(),
            pieces: draft.pieces.unwrap_or(0),
            material: draft.material.unwrap_or_default(),
            updated_at: now,
            author: author.to_string(),
        })
    }

    /// Replacement body for `current`: fields left empty in the draft keep
    /// their current value, author and date are restamped.
    pub fn edited(current: &StockItem, draft: StockDraft, author: &str, now: Timestamp) -> Self {
        let item_name = draft.item_name.trim();
        Self {
            item_name: if item_name.is_empty() {
                current.item_name.clone()
            } else {
                item_name.to_string()
            },
            weight: draft.weight.unwrap_or(current.weight),
            pieces: draft.pieces.unwrap_or(current.pieces),
            material: draft.material.unwrap_or(current.material),
            updated_at: now,
            author: author.to_string(),
        }
    }

    pub fn into_item(self, id: StockId) -> StockItem {
        StockItem {
            id,
            item_name: self.item_name,
            weight: self.weight,
            pieces: self.pieces,
            material: self.material,
            author: self.author,
            updated_at: self.updated_at,
        }
    }
}

/// Sort key of the stock view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StockSort {
    #[default]
    ItemNameAsc,
    ItemNameDesc,
    DateAsc,
    DateDesc,
    /// Name, then date.
    AllAsc,
    /// Name descending, then date descending.
    AllDesc,
}

impl StockSort {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockSort::ItemNameAsc => "itemNameAsc",
            StockSort::ItemNameDesc => "itemNameDesc",
            StockSort::DateAsc => "dateAsc",
            StockSort::DateDesc => "dateDesc",
            StockSort::AllAsc => "allAsc",
            StockSort::AllDesc => "allDesc",
        }
    }

    fn sort(&self, rows: &mut [&StockItem]) {
        match self {
            StockSort::ItemNameAsc => rows.sort_by_cached_key(|s| s.item_name.to_lowercase()),
            StockSort::ItemNameDesc => {
                rows.sort_by_cached_key(|s| Reverse(s.item_name.to_lowercase()))
            }
            StockSort::DateAsc => rows.sort_by(|a, b| a.updated_at.cmp(&b.updated_at)),
            StockSort::DateDesc => rows.sort_by(|a, b| b.updated_at.cmp(&a.updated_at)),
            StockSort::AllAsc => rows.sort_by(|a, b| name_then_date(a, b)),
            StockSort::AllDesc => rows.sort_by(|a, b| name_then_date(b, a)),
        }
    }
}

fn name_then_date(a: &StockItem, b: &StockItem) -> Ordering {
    a.item_name
        .to_lowercase()
        .cmp(&b.item_name.to_lowercase())
        .then_with(|| a.updated_at.cmp(&b.updated_at))
}

impl FromStr for StockSort {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "itemnameasc" => Ok(StockSort::ItemNameAsc),
            "itemnamedesc" => Ok(StockSort::ItemNameDesc),
            "dateasc" => Ok(StockSort::DateAsc),
            "datedesc" => Ok(StockSort::DateDesc),
            "allasc" => Ok(StockSort::AllAsc),
            "alldesc" => Ok(StockSort::AllDesc),
            other => Err(DomainError::validation(format!("unknown sort key '{other}'"))),
        }
    }
}

/// Filter parameters of the stock view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StockQuery {
    pub range: DateRange,
    pub material: MaterialFilter,
    pub item_name: String,
    pub sort: StockSort,
}

impl StockQuery {
    pub fn matches(&self, item: &StockItem) -> bool {
        self.range.contains(&item.updated_at)
            && self.material.matches(item.material)
            && contains_ignore_case(&item.item_name, &self.item_name)
    }

    pub fn apply<'a>(&self, stock: &'a [StockItem]) -> Vec<&'a StockItem> {
        let mut view: Vec<&StockItem> = stock.iter().filter(|s| self.matches(s)).collect();
        self.sort.sort(&mut view);
        view
    }
}
