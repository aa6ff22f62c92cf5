//! Daily ledger: items given out today and their disposition lifecycle.
//!
//! Lifecycle:
//! - an entry is created `Pending` when an item is handed to someone
//! - it is disposed exactly once, as `Selled` or `Returned`
//! - disposal snapshots it into a [`NewHistoryRecord`] and removes it from the
//!   active ledger
//!
//! Terminal states never transition again.

use core::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use karatbook_core::{DomainError, DomainResult, Entity, LedgerEntryId, Timestamp};

use crate::history::NewHistoryRecord;
use crate::material::Material;
use crate::weight::Weight;
use crate::wire;

/// Ledger entry status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum LedgerStatus {
    #[default]
    Pending,
    Selled,
    Returned,
}

/// Final outcome of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Disposition {
    Selled,
    Returned,
}

impl LedgerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerStatus::Pending => "Pending",
            LedgerStatus::Selled => "Selled",
            LedgerStatus::Returned => "Returned",
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, LedgerStatus::Pending)
    }

    /// The only legal transitions are `Pending -> Selled` and `Pending -> Returned`.
    pub fn transition(self, to: Disposition) -> DomainResult<LedgerStatus> {
        match self {
            LedgerStatus::Pending => Ok(to.into()),
            terminal => Err(DomainError::invalid_transition(terminal, to)),
        }
    }
}

impl Disposition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Disposition::Selled => "Selled",
            Disposition::Returned => "Returned",
        }
    }

    /// Whether this disposition decrements on-hand stock.
    ///
    /// Only sales do. Returned items are recorded without touching stock.
    pub fn adjusts_stock(self) -> bool {
        matches!(self, Disposition::Selled)
    }
}

impl From<Disposition> for LedgerStatus {
    fn from(value: Disposition) -> Self {
        match value {
            Disposition::Selled => LedgerStatus::Selled,
            Disposition::Returned => LedgerStatus::Returned,
        }
    }
}

impl core::fmt::Display for LedgerStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::fmt::Display for Disposition {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LedgerStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "pending" => Ok(LedgerStatus::Pending),
            "selled" => Ok(LedgerStatus::Selled),
            "returned" => Ok(LedgerStatus::Returned),
            other => Err(DomainError::validation(format!("unknown ledger status '{other}'"))),
        }
    }
}

impl FromStr for Disposition {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.parse::<LedgerStatus>()? {
            LedgerStatus::Selled => Ok(Disposition::Selled),
            LedgerStatus::Returned => Ok(Disposition::Returned),
            LedgerStatus::Pending => Err(DomainError::validation(
                "disposition must be Selled or Returned",
            )),
        }
    }
}

impl<'de> Deserialize<'de> for LedgerStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
        raw.parse().map_err(serde::de::Error::custom)
    }
}

impl<'de> Deserialize<'de> for Disposition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// An item currently given out (read model of `/todays-stock`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyLedgerEntry {
    #[serde(rename = "_id")]
    pub id: LedgerEntryId,
    pub item_name: String,
    #[serde(rename = "productGivenTo")]
    pub recipient: String,
    #[serde(default)]
    pub weight: Weight,
    #[serde(default, deserialize_with = "wire::lenient_u32")]
    pub pieces: u32,
    #[serde(rename = "ornamentType")]
    pub material: Material,
    #[serde(default)]
    pub author: String,
    #[serde(rename = "date", default)]
    pub issued_at: Timestamp,
    #[serde(default)]
    pub status: LedgerStatus,
}

impl DailyLedgerEntry {
    /// Snapshot this entry as a finalized history record.
    ///
    /// Runs the status transition first, so a terminal entry cannot be
    /// finalized twice.
    pub fn finalize(
        &self,
        disposition: Disposition,
        disposed_at: Timestamp,
    ) -> DomainResult<NewHistoryRecord> {
        self.status.transition(disposition)?;
        Ok(NewHistoryRecord::snapshot(self, disposition, disposed_at))
    }
}

impl Entity for DailyLedgerEntry {
    type Id = LedgerEntryId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Form input for a new ledger entry, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerDraft {
    pub item_name: String,
    pub recipient: String,
    pub weight: Option<Weight>,
    pub pieces: Option<u32>,
    pub material: Option<Material>,
}

/// Body of `POST /todays-stock`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLedgerEntry {
    pub item_name: String,
    #[serde(rename = "productGivenTo")]
    pub recipient: String,
    pub weight: Weight,
    #[serde(default, deserialize_with = "wire::lenient_u32")]
    pub pieces: u32,
    #[serde(rename = "ornamentType")]
    pub material: Material,
    #[serde(rename = "date")]
    pub issued_at: Timestamp,
    pub author: String,
}

impl NewLedgerEntry {
    /// Validate a draft. Item name, recipient and a positive weight are required;
    /// pieces default to 0 and material to Gold.
    pub fn from_draft(draft: LedgerDraft, author: &str, now: Timestamp) -> DomainResult<Self> {
        let mut missing = Vec::new();
        if draft.item_name.trim().is_empty() {
            missing.push("item name");
        }
        if draft.recipient.trim().is_empty() {
            missing.push("recipient");
        }
        let weight = draft.weight.filter(|w| !w.is_zero());
        if weight.is_none() {
            missing.push("weight");
        }
        if !missing.is_empty() {
            return Err(DomainError::validation(format!(
                "required fields missing: {}",
                missing.join(", ")
            )));
        }

        Ok(Self {
            item_name: draft.item_name.trim().to_string(),
            recipient: draft.recipient.trim().to_string(),
            weight: weight.unwrap_or_default(),
            pieces: draft.pieces.unwrap_or(0),
            material: draft.material.unwrap_or_default(),
            issued_at: now,
            author: author.to_string(),
        })
    }

    /// Materialize the created entry once the backend assigned an id.
    pub fn into_entry(self, id: LedgerEntryId) -> DailyLedgerEntry {
        DailyLedgerEntry {
            id,
            item_name: self.item_name,
            recipient: self.recipient,
            weight: self.weight,
            pieces: self.pieces,
            material: self.material,
            author: self.author,
            issued_at: self.issued_at,
            status: LedgerStatus::Pending,
        }
    }
}
