//! Disposed-ledger history view.

use std::sync::Arc;

use karatbook_inventory::{HistoryRecord, LedgerQuery};

use crate::api::InventoryApi;
use crate::error::ServiceResult;
use crate::sequence::{FetchSequencer, FetchTicket};

pub struct HistoryBook<A: ?Sized> {
    api: Arc<A>,
    records: Vec<HistoryRecord>,
    sequencer: FetchSequencer,
}

impl<A: InventoryApi + ?Sized> HistoryBook<A> {
    pub fn new(api: Arc<A>) -> Self {
        Self {
            api,
            records: Vec::new(),
            sequencer: FetchSequencer::new(),
        }
    }

    pub fn records(&self) -> &[HistoryRecord] {
        &self.records
    }

    /// Filtered, sorted view; `show_all` on the query returns fetch order.
    pub fn view(&self, query: &LedgerQuery) -> Vec<&HistoryRecord> {
        query.apply(&self.records)
    }

    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.sequencer.issue()
    }

    pub fn complete_fetch(&mut self, ticket: FetchTicket, records: Vec<HistoryRecord>) -> bool {
        if !self.sequencer.is_current(ticket) {
            tracing::debug!(?ticket, "dropping stale history fetch");
            return false;
        }
        self.records = records;
        true
    }

    pub async fn load(&mut self) -> ServiceResult<&[HistoryRecord]> {
        let ticket = self.begin_fetch();
        let records = self.api.list_history().await?;
        self.complete_fetch(ticket, records);
        Ok(&self.records)
    }
}
