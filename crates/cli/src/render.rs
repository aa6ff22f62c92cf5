//! Text and JSON rendering of command output.

use serde::Serialize;

use karatbook_client::UserProfile;
use karatbook_inventory::display::{capitalize_first, format_long_date, format_time};
use karatbook_inventory::{CurrentPrices, DailyLedgerEntry, HistoryRecord, PriceRecord, StockItem};

/// Pretty JSON, for `--json`.
pub fn json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value)
        .unwrap_or_else(|err| format!("{{\"error\": \"unserializable output: {err}\"}}"))
}

/// Left-aligned columns separated by two spaces.
fn table(headers: &[&str], rows: Vec<Vec<String>>) -> String {
    if rows.is_empty() {
        return "(no records)\n".to_string();
    }

    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let line = |cells: Vec<String>| {
        let padded: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(cell, w)| format!("{cell:<w$}"))
            .collect();
        format!("{}\n", padded.join("  ").trim_end())
    };

    let mut out = line(headers.iter().map(|h| h.to_string()).collect());
    for row in rows {
        out.push_str(&line(row));
    }
    out
}

fn price(amount: Option<f64>) -> String {
    amount.map_or_else(|| "-".to_string(), |p| format!("₹{p}"))
}

pub fn stock(items: &[&StockItem]) -> String {
    let rows = items
        .iter()
        .map(|s| {
            vec![
                s.id.to_string(),
                capitalize_first(&s.item_name),
                s.material.to_string(),
                s.weight.to_string(),
                s.pieces.to_string(),
                capitalize_first(&s.author),
                format_long_date(&s.updated_at),
            ]
        })
        .collect();
    table(
        &["ID", "ITEM", "TYPE", "WEIGHT (g)", "PIECES", "AUTHOR", "UPDATED"],
        rows,
    )
}

pub fn ledger(entries: &[&DailyLedgerEntry]) -> String {
    let rows = entries
        .iter()
        .map(|e| {
            vec![
                e.id.to_string(),
                capitalize_first(&e.item_name),
                capitalize_first(&e.recipient),
                e.material.to_string(),
                e.weight.to_string(),
                e.pieces.to_string(),
                format!("{} {}", format_long_date(&e.issued_at), format_time(&e.issued_at)),
                e.status.to_string(),
            ]
        })
        .collect();
    table(
        &["ID", "ITEM", "GIVEN TO", "TYPE", "WEIGHT (g)", "PIECES", "ISSUED", "STATUS"],
        rows,
    )
}

pub fn history(records: &[&HistoryRecord]) -> String {
    let rows = records
        .iter()
        .map(|r| {
            vec![
                capitalize_first(r.item_name()),
                capitalize_first(r.recipient()),
                r.material().to_string(),
                r.weight().to_string(),
                r.pieces().to_string(),
                r.disposition().to_string(),
                format_long_date(r.issued_at()),
                format!("{} {}", format_long_date(r.disposed_at()), format_time(r.disposed_at())),
            ]
        })
        .collect();
    table(
        &["ITEM", "GIVEN TO", "TYPE", "WEIGHT (g)", "PIECES", "STATUS", "ISSUED", "CLOSED"],
        rows,
    )
}

pub fn price_log(records: &[&PriceRecord]) -> String {
    let rows = records
        .iter()
        .map(|r| {
            vec![
                r.material.to_string(),
                price(Some(r.price)),
                format!("{} {}", format_long_date(&r.updated_at), format_time(&r.updated_at)),
            ]
        })
        .collect();
    table(&["TYPE", "PRICE", "UPDATED"], rows)
}

pub fn prices(current: &CurrentPrices) -> String {
    format!(
        "Gold Price: {}\nSilver Price: {}\n",
        price(current.gold_price),
        price(current.silver_price)
    )
}

pub fn profile(profile: &UserProfile) -> String {
    format!(
        "Name: {}\nUsername: {}\n",
        capitalize_first(&profile.name),
        profile.username
    )
}
