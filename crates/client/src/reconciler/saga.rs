//! Disposition saga: decrement on-hand stock, then write the history record.
//!
//! Steps run strictly in order and each one is a separate request. When the
//! history write fails after the stock decrement committed, the decrement is
//! compensated by writing the previous quantity back.

use core::fmt;

use karatbook_core::{StockId, Timestamp};
use karatbook_inventory::{
    DailyLedgerEntry, Disposition, HistoryRecord, StockItem, StockQuantity, find_matching_stock,
};

use crate::api::InventoryApi;
use crate::error::{ApiError, ServiceError, ServiceResult};

/// A remote step of the disposition workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SagaStep {
    DecrementStock,
    WriteHistory,
    RemoveEntry,
}

impl SagaStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            SagaStep::DecrementStock => "stock decrement",
            SagaStep::WriteHistory => "history write",
            SagaStep::RemoveEntry => "ledger removal",
        }
    }

    pub(crate) fn join(steps: &[SagaStep]) -> String {
        steps
            .iter()
            .map(SagaStep::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for SagaStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the saga made durable on the backend.
#[derive(Debug)]
pub(crate) struct Committed {
    pub history: HistoryRecord,
    pub stock: Option<StockItem>,
    pub steps: Vec<SagaStep>,
}

struct Decrement {
    id: StockId,
    previous: StockQuantity,
    updated: StockItem,
}

/// Run the saga up to and including the history write.
///
/// The transition check happens before any request, so a terminal entry
/// never reaches the backend.
pub(crate) async fn record_disposition<A>(
    api: &A,
    entry: &DailyLedgerEntry,
    disposition: Disposition,
) -> ServiceResult<Committed>
where
    A: InventoryApi + ?Sized,
{
    let history = entry.finalize(disposition, Timestamp::now())?;

    let decrement = if disposition.adjusts_stock() {
        Some(decrement_stock(api, entry).await?)
    } else {
        None
    };

    match api.create_history(&history).await {
        Ok(record) => {
            let mut steps = Vec::with_capacity(2);
            if decrement.is_some() {
                steps.push(SagaStep::DecrementStock);
            }
            steps.push(SagaStep::WriteHistory);
            tracing::info!(
                entry_id = %entry.id,
                disposition = %disposition,
                "history record written"
            );
            Ok(Committed {
                history: record,
                stock: decrement.map(|d| d.updated),
                steps,
            })
        }
        Err(cause) => Err(compensate(api, decrement, cause).await),
    }
}

async fn decrement_stock<A>(api: &A, entry: &DailyLedgerEntry) -> ServiceResult<Decrement>
where
    A: InventoryApi + ?Sized,
{
    let stock = api.list_stock().await?;
    let item = find_matching_stock(&stock, entry).ok_or_else(|| {
        ServiceError::not_found(format!(
            "stock item '{}' ({})",
            entry.item_name, entry.material
        ))
    })?;
    let remaining = item.withdraw(entry.weight, entry.pieces)?;

    // Any 2xx commits the decrement, echoed document or not.
    let updated = api
        .update_stock_quantity(&item.id, remaining.into())
        .await?
        .unwrap_or_else(|| item.clone().with_quantity(remaining));
    tracing::info!(
        stock_id = %item.id,
        weight = %remaining.weight,
        pieces = remaining.pieces,
        "stock decremented"
    );

    Ok(Decrement {
        id: item.id.clone(),
        previous: item.quantity(),
        updated,
    })
}

async fn compensate<A>(api: &A, decrement: Option<Decrement>, cause: ApiError) -> ServiceError
where
    A: InventoryApi + ?Sized,
{
    let Some(decrement) = decrement else {
        return ServiceError::Network(cause);
    };

    tracing::warn!(
        stock_id = %decrement.id,
        error = %cause,
        "history write failed; restoring stock"
    );
    match api
        .update_stock_quantity(&decrement.id, decrement.previous.into())
        .await
    {
        Ok(_) => ServiceError::RolledBack {
            failed: SagaStep::WriteHistory,
            cause,
        },
        Err(restore_err) => {
            tracing::error!(
                stock_id = %decrement.id,
                error = %restore_err,
                "stock restore failed; on-hand stock stays decremented"
            );
            ServiceError::PartiallyApplied {
                failed: SagaStep::WriteHistory,
                committed: vec![SagaStep::DecrementStock],
                cause,
            }
        }
    }
}
