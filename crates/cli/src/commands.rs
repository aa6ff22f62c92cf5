//! Subcommand execution against any backend and session store.

use std::sync::Arc;

use serde::Serialize;

use karatbook_client::{
    ClientStore, Credentials, DailyLedger, HistoryBook, InventoryApi, Notice, PriceBoard,
    ServiceResult, SessionManager, SettingsUpdate, StockBook,
};
use karatbook_inventory::display::capitalize_first;
use karatbook_inventory::{
    DailyLedgerEntry, DateRange, LedgerDraft, LedgerQuery, PriceHistoryQuery, StockDraft,
    StockQuery,
};

use crate::render;
use crate::{
    Command, HistoryCommand, LedgerCommand, LedgerFilterArgs, PriceCommand, RangeArgs,
    SettingsCommand, StockCommand, StockItemArgs,
};

/// Ledger entries whose backend removal is still owed, as JSON.
pub const PENDING_REMOVALS_KEY: &str = "pendingRemovals";

/// What a command prints: output on stdout, a notice on stderr.
#[derive(Debug, Default)]
pub struct Report {
    pub output: Option<String>,
    pub notice: Option<Notice>,
}

impl Report {
    pub fn notice(notice: Notice) -> Self {
        Self {
            output: None,
            notice: Some(notice),
        }
    }

    fn with_notice(mut self, notice: Notice) -> Self {
        self.notice = Some(notice);
        self
    }
}

struct Output {
    json: bool,
}

impl Output {
    fn report<T: Serialize + ?Sized>(&self, value: &T, text: impl FnOnce(&T) -> String) -> Report {
        let output = if self.json {
            format!("{}\n", render::json(value))
        } else {
            text(value)
        };
        Report {
            output: Some(output),
            notice: None,
        }
    }
}

pub async fn execute<S: ClientStore>(
    command: Command,
    session: &SessionManager<S>,
    api: Arc<dyn InventoryApi>,
    json: bool,
) -> ServiceResult<Report> {
    let out = Output { json };
    match command {
        Command::Login { username, password } => {
            let ctx = session
                .login(api.as_ref(), &Credentials::new(username, password))
                .await?;
            Ok(out
                .report(ctx.profile(), render::profile)
                .with_notice(Notice::success(
                    "Logged in",
                    format!("Welcome, {}", capitalize_first(ctx.author())),
                )))
        }
        Command::Logout => {
            session.logout().await?;
            Ok(Report::notice(Notice::success("Logged out", "Session cleared")))
        }
        Command::Whoami => {
            let ctx = session.require().await?;
            Ok(out.report(ctx.profile(), render::profile))
        }
        Command::Stock(cmd) => stock(cmd, session, api, &out).await,
        Command::Ledger(cmd) => ledger(cmd, session, api, &out).await,
        Command::History(HistoryCommand::List { filter, all }) => {
            session.require().await?;
            let mut book = HistoryBook::new(api);
            book.load().await?;
            let mut query = ledger_query(filter);
            query.show_all = all;
            let rows = book.view(&query);
            Ok(out.report(&rows, |rows| render::history(rows)))
        }
        Command::Price(cmd) => price(cmd, session, api, &out).await,
        Command::Settings(cmd) => settings(cmd, session, api, &out).await,
    }
}

async fn stock<S: ClientStore>(
    cmd: StockCommand,
    session: &SessionManager<S>,
    api: Arc<dyn InventoryApi>,
    out: &Output,
) -> ServiceResult<Report> {
    let ctx = session.require().await?;
    let mut book = StockBook::new(api);

    match cmd {
        StockCommand::List {
            range,
            material,
            name,
            sort,
        } => {
            book.load().await?;
            let query = StockQuery {
                range: date_range(range),
                material: material.unwrap_or_default(),
                item_name: name.unwrap_or_default(),
                sort: sort.unwrap_or_default(),
            };
            let rows = book.view(&query);
            Ok(out.report(&rows, |rows| render::stock(rows)))
        }
        StockCommand::Add { item } => {
            let added = book.add(stock_draft(item), &ctx).await?;
            let description = format!("{} ({})", capitalize_first(&added.item_name), added.material);
            Ok(out
                .report(&added, |item| render::stock(&[item]))
                .with_notice(Notice::success("Stock added", description)))
        }
        StockCommand::Edit { id, item } => {
            book.load().await?;
            let edited = book.edit(&id, stock_draft(item), &ctx).await?;
            let description = format!("{} ({})", capitalize_first(&edited.item_name), edited.material);
            Ok(out
                .report(&edited, |item| render::stock(&[item]))
                .with_notice(Notice::success("Stock updated", description)))
        }
        StockCommand::Delete { id } => {
            book.delete(&id).await?;
            Ok(Report::notice(Notice::success("Stock deleted", id.to_string())))
        }
    }
}

async fn ledger<S: ClientStore>(
    cmd: LedgerCommand,
    session: &SessionManager<S>,
    api: Arc<dyn InventoryApi>,
    out: &Output,
) -> ServiceResult<Report> {
    let ctx = session.require().await?;
    let mut ledger = DailyLedger::new(api);
    ledger.park(load_parked(session.store()).await?);

    let result = run_ledger(cmd, &mut ledger, &ctx, out).await;

    // Removals owed after a partial disposition outlive this process.
    let saved = save_parked(session.store(), ledger.pending_removals()).await;
    settle(result, saved)
}

/// The ledger outcome wins over a failed save; the save error is only
/// returned when the ledger command itself succeeded.
fn settle(result: ServiceResult<Report>, saved: ServiceResult<()>) -> ServiceResult<Report> {
    match (result, saved) {
        (Err(err), Err(store_err)) => {
            tracing::error!(error = %store_err, "pending removals not saved after failed ledger command");
            Err(err)
        }
        (Ok(_), Err(store_err)) => Err(store_err),
        (result, Ok(())) => result,
    }
}

async fn run_ledger(
    cmd: LedgerCommand,
    ledger: &mut DailyLedger<dyn InventoryApi>,
    ctx: &karatbook_client::SessionContext,
    out: &Output,
) -> ServiceResult<Report> {
    match cmd {
        LedgerCommand::List { filter } => {
            ledger.refresh().await?;
            let rows = ledger.view(&ledger_query(filter));
            Ok(out.report(&rows, |rows| render::ledger(rows)))
        }
        LedgerCommand::Issue {
            item,
            recipient,
            weight,
            pieces,
            material,
        } => {
            let draft = LedgerDraft {
                item_name: item.unwrap_or_default(),
                recipient: recipient.unwrap_or_default(),
                weight,
                pieces,
                material,
            };
            let created = ledger.issue(draft, ctx).await?;
            let description = format!(
                "{} given to {}",
                capitalize_first(&created.item_name),
                capitalize_first(&created.recipient)
            );
            Ok(out
                .report(&created, |entry| render::ledger(&[entry]))
                .with_notice(Notice::success("Ledger entry added", description)))
        }
        LedgerCommand::Sell { id } => {
            ledger.refresh().await?;
            let disposal = ledger.mark_selled(&id).await?;
            let description = match &disposal.stock {
                Some(stock) => format!(
                    "{} sold; {} g and {} pieces left in stock",
                    capitalize_first(&disposal.entry.item_name),
                    stock.weight,
                    stock.pieces
                ),
                None => format!("{} sold", capitalize_first(&disposal.entry.item_name)),
            };
            Ok(out
                .report(&disposal.history, |record| render::history(&[record]))
                .with_notice(Notice::success("Marked as selled", description)))
        }
        LedgerCommand::Return { id } => {
            ledger.refresh().await?;
            let disposal = ledger.mark_returned(&id).await?;
            let description = format!("{} returned", capitalize_first(&disposal.entry.item_name));
            Ok(out
                .report(&disposal.history, |record| render::history(&[record]))
                .with_notice(Notice::success("Marked as returned", description)))
        }
        LedgerCommand::Retry => {
            let owed = ledger.pending_removals().len();
            if owed == 0 {
                return Ok(Report::notice(Notice::success(
                    "Nothing to retry",
                    "No ledger removals are pending",
                )));
            }
            let removed = ledger.retry_pending_removals().await?;
            Ok(Report::notice(Notice::success(
                "Ledger cleaned up",
                format!("{removed} of {owed} pending removals completed"),
            )))
        }
    }
}

async fn price<S: ClientStore>(
    cmd: PriceCommand,
    session: &SessionManager<S>,
    api: Arc<dyn InventoryApi>,
    out: &Output,
) -> ServiceResult<Report> {
    session.require().await?;
    let mut board = PriceBoard::new(api);

    match cmd {
        PriceCommand::Show => {
            let current = board.load().await?;
            Ok(out.report(&current, render::prices))
        }
        PriceCommand::Set { material, amount } => {
            board.load().await?;
            let now = board.update(material, amount).await?;
            Ok(out
                .report(&board.current(), render::prices)
                .with_notice(Notice::success(
                    "Price updated",
                    format!("{material} is now ₹{now}"),
                )))
        }
        PriceCommand::History {
            range,
            material,
            order,
        } => {
            board.load_history().await?;
            let query = PriceHistoryQuery {
                range: date_range(range),
                material: material.unwrap_or_default(),
                order: order.unwrap_or_default(),
            };
            let rows = board.history_view(&query);
            Ok(out.report(&rows, |rows| render::price_log(rows)))
        }
    }
}

async fn settings<S: ClientStore>(
    cmd: SettingsCommand,
    session: &SessionManager<S>,
    api: Arc<dyn InventoryApi>,
    out: &Output,
) -> ServiceResult<Report> {
    let mut ctx = session.require().await?;
    match cmd {
        SettingsCommand::Show => {
            session.fetch_profile(api.as_ref(), &mut ctx).await?;
            Ok(out.report(ctx.profile(), render::profile))
        }
        SettingsCommand::Update {
            name,
            username,
            password,
        } => {
            let update = SettingsUpdate {
                name,
                username,
                password,
            };
            session.update_settings(api.as_ref(), &mut ctx, update).await?;
            Ok(out
                .report(ctx.profile(), render::profile)
                .with_notice(Notice::success("Settings saved", "Account details updated")))
        }
    }
}

fn date_range(range: RangeArgs) -> DateRange {
    DateRange::new(range.from, range.to)
}

fn ledger_query(filter: LedgerFilterArgs) -> LedgerQuery {
    LedgerQuery {
        item_name: filter.name.unwrap_or_default(),
        recipient: filter.recipient.unwrap_or_default(),
        material: filter.material.unwrap_or_default(),
        status: filter.status.unwrap_or_default(),
        sort: filter.sort.unwrap_or_default(),
        show_all: false,
    }
}

fn stock_draft(item: StockItemArgs) -> StockDraft {
    StockDraft {
        item_name: item.name.unwrap_or_default(),
        weight: item.weight,
        pieces: item.pieces,
        material: item.material,
    }
}

async fn load_parked<S: ClientStore>(store: &S) -> ServiceResult<Vec<DailyLedgerEntry>> {
    let Some(raw) = store.get(PENDING_REMOVALS_KEY).await? else {
        return Ok(Vec::new());
    };
    match serde_json::from_str(&raw) {
        Ok(entries) => Ok(entries),
        Err(err) => {
            tracing::warn!(error = %err, "discarding unreadable pending removals");
            Ok(Vec::new())
        }
    }
}

async fn save_parked<S: ClientStore>(store: &S, owed: &[DailyLedgerEntry]) -> ServiceResult<()> {
    if owed.is_empty() {
        store.remove(PENDING_REMOVALS_KEY).await?;
        return Ok(());
    }
    match serde_json::to_string(owed) {
        Ok(raw) => store.set(PENDING_REMOVALS_KEY, &raw).await?,
        Err(err) => tracing::warn!(error = %err, "pending removals not saved"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use karatbook_client::{ApiError, Endpoint, InMemoryApi, MemoryStore, ServiceError, UserProfile};
    use karatbook_core::{LedgerEntryId, StockId, Timestamp};
    use karatbook_inventory::{LedgerStatus, Material, PriceRecord, StockItem, Weight};

    use crate::Cli;

    fn ring_entry() -> DailyLedgerEntry {
        DailyLedgerEntry {
            id: LedgerEntryId::new("led-ring").unwrap(),
            item_name: "ring".into(),
            recipient: "asha".into(),
            weight: Weight::from_milligrams(10_000),
            pieces: 1,
            material: Material::Gold,
            author: "Meera".into(),
            issued_at: Timestamp::parse("2026-10-19T09:00:00.000Z"),
            status: LedgerStatus::Pending,
        }
    }

    fn ring_stock() -> StockItem {
        StockItem {
            id: StockId::new("stk-ring").unwrap(),
            item_name: "Ring".into(),
            weight: Weight::from_milligrams(50_000),
            pieces: 5,
            material: Material::Gold,
            author: "Meera".into(),
            updated_at: Timestamp::parse("2026-10-01T09:00:00.000Z"),
        }
    }

    fn shop() -> Arc<InMemoryApi> {
        let profile = UserProfile {
            name: "meera".into(),
            username: "meera".into(),
            ..UserProfile::default()
        };
        Arc::new(
            InMemoryApi::new()
                .with_user(profile, "s3cret")
                .with_stock(vec![ring_stock()])
                .with_ledger(vec![ring_entry()]),
        )
    }

    async fn run(
        args: &[&str],
        session: &SessionManager<MemoryStore>,
        api: &Arc<InMemoryApi>,
    ) -> ServiceResult<Report> {
        let cli = Cli::try_parse_from(args).unwrap();
        let api: Arc<dyn InventoryApi> = api.clone();
        execute(cli.command, session, api, cli.json).await
    }

    async fn logged_in(api: &Arc<InMemoryApi>) -> SessionManager<MemoryStore> {
        let session = SessionManager::new(MemoryStore::new());
        run(
            &["karatbook", "login", "--username", "meera", "--password", "s3cret"],
            &session,
            api,
        )
        .await
        .unwrap();
        session
    }

    fn store_failure() -> ServiceError {
        ServiceError::Store(karatbook_client::StoreError::CreateDir {
            path: "/nonexistent/state".into(),
            source: std::io::Error::other("read-only file system"),
        })
    }

    #[test]
    fn ledger_failure_outranks_a_failed_save() {
        let disposition = ServiceError::PartiallyApplied {
            failed: karatbook_client::SagaStep::RemoveEntry,
            committed: Vec::new(),
            cause: ApiError::Network("offline".into()),
        };

        let err = settle(Err(disposition), Err(store_failure())).unwrap_err();
        assert!(matches!(err, ServiceError::PartiallyApplied { .. }));

        let err = settle(Ok(Report::default()), Err(store_failure())).unwrap_err();
        assert!(matches!(err, ServiceError::Store(_)));

        let err = settle(Err(ServiceError::NotLoggedIn), Ok(())).unwrap_err();
        assert!(matches!(err, ServiceError::NotLoggedIn));
        assert!(settle(Ok(Report::default()), Ok(())).is_ok());
    }

    #[tokio::test]
    async fn protected_commands_require_login() {
        let api = shop();
        let session = SessionManager::new(MemoryStore::new());

        let err = run(&["karatbook", "stock", "list"], &session, &api)
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::NotLoggedIn));
        assert!(api.calls().await.is_empty());
    }

    #[tokio::test]
    async fn login_greets_user_and_whoami_reads_store() {
        let api = shop();
        let session = SessionManager::new(MemoryStore::new());

        let report = run(
            &["karatbook", "login", "--username", "meera", "--password", "s3cret"],
            &session,
            &api,
        )
        .await
        .unwrap();
        assert_eq!(report.notice.unwrap().description, "Welcome, Meera");

        let report = run(&["karatbook", "whoami"], &session, &api).await.unwrap();
        assert_eq!(report.output.unwrap(), "Name: Meera\nUsername: meera\n");
        assert_eq!(api.call_count(Endpoint::Login).await, 1);
    }

    #[tokio::test]
    async fn selling_reports_remaining_stock() {
        let api = shop();
        let session = logged_in(&api).await;

        let report = run(&["karatbook", "ledger", "sell", "led-ring"], &session, &api)
            .await
            .unwrap();

        let notice = report.notice.unwrap();
        assert_eq!(notice.title, "Marked as selled");
        assert_eq!(notice.description, "Ring sold; 40 g and 4 pieces left in stock");
        assert!(api.ledger().await.is_empty());
        assert_eq!(api.history().await.len(), 1);
    }

    #[tokio::test]
    async fn failed_removal_is_remembered_and_retried() {
        let api = shop();
        let session = logged_in(&api).await;
        api.fail_next(Endpoint::DeleteLedgerEntry, ApiError::Network("offline".into()))
            .await;

        let err = run(&["karatbook", "ledger", "return", "led-ring"], &session, &api)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::PartiallyApplied { .. }));
        assert!(
            session
                .store()
                .get(PENDING_REMOVALS_KEY)
                .await
                .unwrap()
                .is_some()
        );

        // A later run must not offer the entry again.
        let report = run(&["karatbook", "ledger", "list", "--json"], &session, &api)
            .await
            .unwrap();
        assert_eq!(report.output.unwrap().trim(), "[]");

        let report = run(&["karatbook", "ledger", "retry"], &session, &api)
            .await
            .unwrap();
        assert_eq!(
            report.notice.unwrap().description,
            "1 of 1 pending removals completed"
        );
        assert!(api.ledger().await.is_empty());
        assert_eq!(session.store().get(PENDING_REMOVALS_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn stock_list_filters_by_name() {
        let api = shop();
        let session = logged_in(&api).await;

        let report = run(
            &["karatbook", "stock", "list", "--name", "chain"],
            &session,
            &api,
        )
        .await
        .unwrap();
        assert_eq!(report.output.unwrap(), "(no records)\n");

        let report = run(&["karatbook", "stock", "list", "--name", "RIN"], &session, &api)
            .await
            .unwrap();
        assert!(report.output.unwrap().contains("stk-ring"));
    }

    #[tokio::test]
    async fn price_history_lists_one_material_newest_first() {
        let record = |material, price, at: &str| PriceRecord {
            material,
            price,
            updated_at: Timestamp::parse(at),
        };
        let api = Arc::new(
            InMemoryApi::new()
                .with_user(
                    UserProfile {
                        name: "meera".into(),
                        username: "meera".into(),
                        ..UserProfile::default()
                    },
                    "s3cret",
                )
                .with_price_log(vec![
                    record(Material::Gold, 7000.0, "2026-10-01T10:00:00Z"),
                    record(Material::Silver, 90.0, "2026-10-05T10:00:00Z"),
                    record(Material::Gold, 7250.0, "2026-10-18T10:00:00Z"),
                ]),
        );
        let session = logged_in(&api).await;

        let report = run(
            &["karatbook", "price", "history", "--type", "gold"],
            &session,
            &api,
        )
        .await
        .unwrap();

        let output = report.output.unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].contains("₹7250"));
        assert!(lines[2].contains("₹7000"));
    }

    #[tokio::test]
    async fn issuing_without_weight_sends_nothing() {
        let api = shop();
        let session = logged_in(&api).await;
        let before = api.calls().await.len();

        let err = run(
            &["karatbook", "ledger", "issue", "--item", "Chain", "--to", "Ravi"],
            &session,
            &api,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ServiceError::Validation(msg) if msg.contains("weight")));
        assert_eq!(api.calls().await.len(), before);
    }
}
