//! Finalized ledger entries.
//!
//! A history record is written once, when a ledger entry is disposed, and
//! never changes afterwards. Fields are private and exposed through getters.

use serde::{Deserialize, Serialize};

use karatbook_core::{HistoryId, Timestamp};

use crate::ledger::{DailyLedgerEntry, Disposition};
use crate::material::Material;
use crate::weight::Weight;
use crate::wire;

/// A stored history record (read model of `GET /alltodayshistory`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    id: Option<HistoryId>,
    item_name: String,
    #[serde(rename = "productGivenTo")]
    recipient: String,
    #[serde(default)]
    weight: Weight,
    #[serde(default, deserialize_with = "wire::lenient_u32")]
    pieces: u32,
    #[serde(rename = "ornamentType")]
    material: Material,
    #[serde(default)]
    author: String,
    #[serde(rename = "date", default)]
    issued_at: Timestamp,
    #[serde(rename = "status")]
    disposition: Disposition,
    #[serde(rename = "deletionDate", default)]
    disposed_at: Timestamp,
}

impl HistoryRecord {
    pub fn id(&self) -> Option<&HistoryId> {
        self.id.as_ref()
    }

    pub fn item_name(&self) -> &str {
        &self.item_name
    }

    pub fn recipient(&self) -> &str {
        &self.recipient
    }

    pub fn weight(&self) -> Weight {
        self.weight
    }

    pub fn pieces(&self) -> u32 {
        self.pieces
    }

    pub fn material(&self) -> Material {
        self.material
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn issued_at(&self) -> &Timestamp {
        &self.issued_at
    }

    pub fn disposition(&self) -> Disposition {
        self.disposition
    }

    pub fn disposed_at(&self) -> &Timestamp {
        &self.disposed_at
    }
}

/// Body of `POST /alltodayshistory`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewHistoryRecord {
    item_name: String,
    #[serde(rename = "productGivenTo")]
    recipient: String,
    weight: Weight,
    pieces: u32,
    #[serde(rename = "ornamentType")]
    material: Material,
    #[serde(rename = "date")]
    issued_at: Timestamp,
    author: String,
    #[serde(rename = "status")]
    disposition: Disposition,
    #[serde(rename = "deletionDate")]
    disposed_at: Timestamp,
}

impl NewHistoryRecord {
    /// Only [`DailyLedgerEntry::finalize`] builds these, after the transition check.
    pub(crate) fn snapshot(
        entry: &DailyLedgerEntry,
        disposition: Disposition,
        disposed_at: Timestamp,
    ) -> Self {
        Self {
            item_name: entry.item_name.clone(),
            recipient: entry.recipient.clone(),
            weight: entry.weight,
            pieces: entry.pieces,
            material: entry.material,
            issued_at: entry.issued_at.clone(),
            author: entry.author.clone(),
            disposition,
            disposed_at,
        }
    }

    pub fn item_name(&self) -> &str {
        &self.item_name
    }

    pub fn issued_at(&self) -> &Timestamp {
        &self.issued_at
    }

    pub fn disposition(&self) -> Disposition {
        self.disposition
    }

    pub fn disposed_at(&self) -> &Timestamp {
        &self.disposed_at
    }

    /// The stored record, once the backend accepted it.
    pub fn into_record(self, id: Option<HistoryId>) -> HistoryRecord {
        HistoryRecord {
            id,
            item_name: self.item_name,
            recipient: self.recipient,
            weight: self.weight,
            pieces: self.pieces,
            material: self.material,
            author: self.author,
            issued_at: self.issued_at,
            disposition: self.disposition,
            disposed_at: self.disposed_at,
        }
    }
}
