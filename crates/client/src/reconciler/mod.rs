//! Daily-ledger reconciler.
//!
//! Keeps the working set of items currently given out and runs their
//! disposition: a sale decrements on-hand stock and writes history, a return
//! only writes history. Either way the entry then leaves the active ledger.
//!
//! Failure handling:
//! - nothing committed: plain error, state unchanged
//! - history write failed after a stock decrement: the decrement is undone
//!   (`RolledBack`), or reported as `PartiallyApplied` if undoing fails
//! - ledger removal failed after history was written: the entry is parked as
//!   pending removal and hidden, so it cannot be disposed twice
//!   (`PartiallyApplied`; see [`DailyLedger::retry_pending_removals`])

mod saga;

pub use saga::SagaStep;

use std::sync::Arc;

use karatbook_core::{LedgerEntryId, Timestamp, entity::find_by_id};
use karatbook_inventory::{
    DailyLedgerEntry, Disposition, HistoryRecord, LedgerDraft, LedgerQuery, NewLedgerEntry,
    StockItem,
};

use crate::api::InventoryApi;
use crate::error::{ApiError, ServiceError, ServiceResult};
use crate::sequence::{FetchSequencer, FetchTicket};
use crate::session::SessionContext;

/// Result of a completed disposition.
#[derive(Debug, Clone, PartialEq)]
pub struct Disposal {
    pub entry: DailyLedgerEntry,
    pub disposition: Disposition,
    pub history: HistoryRecord,
    /// The stock item after the decrement (sales only).
    pub stock: Option<StockItem>,
}

pub struct DailyLedger<A: ?Sized> {
    api: Arc<A>,
    entries: Vec<DailyLedgerEntry>,
    pending_removal: Vec<DailyLedgerEntry>,
    sequencer: FetchSequencer,
}

impl<A: InventoryApi + ?Sized> DailyLedger<A> {
    pub fn new(api: Arc<A>) -> Self {
        Self {
            api,
            entries: Vec::new(),
            pending_removal: Vec::new(),
            sequencer: FetchSequencer::new(),
        }
    }

    /// Current working set, in fetch order.
    pub fn entries(&self) -> &[DailyLedgerEntry] {
        &self.entries
    }

    pub fn view(&self, query: &LedgerQuery) -> Vec<&DailyLedgerEntry> {
        query.apply(&self.entries)
    }

    /// Disposed entries whose removal from the backend ledger is still owed.
    pub fn pending_removals(&self) -> &[DailyLedgerEntry] {
        &self.pending_removal
    }

    /// Park entries whose removal an earlier session still owes. They stay
    /// hidden from fetched ledgers until [`retry_pending_removals`] clears them.
    ///
    /// [`retry_pending_removals`]: Self::retry_pending_removals
    pub fn park(&mut self, owed: impl IntoIterator<Item = DailyLedgerEntry>) {
        for entry in owed {
            if find_by_id(&self.pending_removal, &entry.id).is_none() {
                self.entries.retain(|e| e.id != entry.id);
                self.pending_removal.push(entry);
            }
        }
    }

    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.sequencer.issue()
    }

    /// Apply a fetched ledger if `ticket` is still the latest one issued.
    /// Returns whether it was applied.
    pub fn complete_fetch(&mut self, ticket: FetchTicket, rows: Vec<DailyLedgerEntry>) -> bool {
        if !self.sequencer.is_current(ticket) {
            tracing::debug!(?ticket, "dropping stale ledger fetch");
            return false;
        }
        let visible: Vec<DailyLedgerEntry> = rows
            .into_iter()
            .filter(|row| !self.pending_removal.iter().any(|p| p.id == row.id))
            .collect();
        self.entries = visible;
        true
    }

    pub async fn refresh(&mut self) -> ServiceResult<()> {
        let ticket = self.begin_fetch();
        let rows = self.api.list_ledger().await?;
        self.complete_fetch(ticket, rows);
        Ok(())
    }

    /// Record an item as given out. Invalid drafts never reach the backend.
    pub async fn issue(
        &mut self,
        draft: LedgerDraft,
        session: &SessionContext,
    ) -> ServiceResult<DailyLedgerEntry> {
        let entry = NewLedgerEntry::from_draft(draft, session.author(), Timestamp::now())?;
        let created = self.api.create_ledger_entry(&entry).await?;
        tracing::info!(entry_id = %created.id, item = %created.item_name, "ledger entry issued");

        self.refresh_best_effort().await;
        if find_by_id(&self.entries, &created.id).is_none() {
            self.entries.push(created.clone());
        }
        Ok(created)
    }

    /// Sell the entry: decrement matching stock, write history, remove it.
    pub async fn mark_selled(&mut self, id: &LedgerEntryId) -> ServiceResult<Disposal> {
        self.dispose(id, Disposition::Selled).await
    }

    /// Return the entry: write history and remove it. On-hand stock is left
    /// as it is.
    pub async fn mark_returned(&mut self, id: &LedgerEntryId) -> ServiceResult<Disposal> {
        self.dispose(id, Disposition::Returned).await
    }

    async fn dispose(
        &mut self,
        id: &LedgerEntryId,
        disposition: Disposition,
    ) -> ServiceResult<Disposal> {
        let entry = find_by_id(&self.entries, id)
            .cloned()
            .ok_or_else(|| ServiceError::not_found(format!("ledger entry {id}")))?;

        let committed = saga::record_disposition(self.api.as_ref(), &entry, disposition).await?;

        // History is durable from here on; the entry must not be disposed again.
        self.entries.retain(|e| &e.id != id);

        if let Err(cause) = self.api.delete_ledger_entry(id).await {
            tracing::warn!(entry_id = %id, error = %cause, "ledger removal failed; parked for retry");
            self.pending_removal.push(entry);
            return Err(ServiceError::PartiallyApplied {
                failed: SagaStep::RemoveEntry,
                committed: committed.steps,
                cause,
            });
        }
        tracing::info!(entry_id = %id, disposition = %disposition, "ledger entry disposed");

        self.refresh_best_effort().await;
        Ok(Disposal {
            entry,
            disposition,
            history: committed.history,
            stock: committed.stock,
        })
    }

    /// Re-issue the removal of parked entries. Returns how many were removed;
    /// the ones that fail again stay parked.
    pub async fn retry_pending_removals(&mut self) -> ServiceResult<usize> {
        let parked = std::mem::take(&mut self.pending_removal);
        let mut removed = 0;
        let mut first_error = None;

        for entry in parked {
            match self.api.delete_ledger_entry(&entry.id).await {
                // Someone else already removed it.
                Ok(()) | Err(ApiError::NotFound(_)) => removed += 1,
                Err(err) => {
                    tracing::warn!(entry_id = %entry.id, error = %err, "ledger removal failed again");
                    first_error.get_or_insert(err);
                    self.pending_removal.push(entry);
                }
            }
        }

        match first_error {
            Some(err) => Err(err.into()),
            None => Ok(removed),
        }
    }

    async fn refresh_best_effort(&mut self) {
        if let Err(err) = self.refresh().await {
            tracing::warn!(error = %err, "ledger refresh failed; keeping local working set");
        }
    }
}
