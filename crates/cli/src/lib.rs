//! `karatbook` command line: argument parsing and dispatch.
//!
//! Every subcommand maps onto one client operation. Output goes to stdout
//! (a table, or JSON with `--json`); the outcome notice goes to stderr.

mod commands;
pub mod render;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use karatbook_client::config::{API_URL_VAR, STATE_DB_VAR, TIMEOUT_VAR};
use karatbook_client::{
    ClientConfig, ConfigError, HttpApi, InventoryApi, Notice, ServiceResult, SessionManager,
    SqliteStore,
};
use karatbook_core::{LedgerEntryId, StockId};
use karatbook_inventory::{
    LedgerSort, Material, MaterialFilter, PriceOrder, StatusFilter, StockSort, Weight,
};
use karatbook_observability::LogFormat;

pub use commands::{Report, execute};

#[derive(Debug, Parser)]
#[command(name = "karatbook")]
#[command(about = "Jewelry shop inventory: stock, daily ledger, history and metal prices")]
pub struct Cli {
    /// Print command output as JSON.
    #[arg(long, global = true, default_value_t = false)]
    pub json: bool,

    /// Backend base URL (overrides KARATBOOK_API_URL).
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Session state database (overrides KARATBOOK_STATE_DB).
    #[arg(long, global = true)]
    pub state_db: Option<PathBuf>,

    /// HTTP request timeout (overrides KARATBOOK_HTTP_TIMEOUT_SECS).
    #[arg(long, global = true)]
    pub timeout_secs: Option<u64>,

    /// Log line format on stderr: json, pretty or compact.
    #[arg(long, global = true, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Log in and remember the session.
    Login {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
    /// Forget the stored session.
    Logout,
    /// Show the stored profile.
    Whoami,
    #[command(subcommand)]
    Stock(StockCommand),
    #[command(subcommand)]
    Ledger(LedgerCommand),
    #[command(subcommand)]
    History(HistoryCommand),
    #[command(subcommand)]
    Price(PriceCommand),
    #[command(subcommand)]
    Settings(SettingsCommand),
}

#[derive(Debug, Subcommand)]
pub enum StockCommand {
    List {
        #[command(flatten)]
        range: RangeArgs,
        #[arg(long = "type")]
        material: Option<MaterialFilter>,
        #[arg(long)]
        name: Option<String>,
        /// itemNameAsc, itemNameDesc, dateAsc, dateDesc, allAsc or allDesc.
        #[arg(long)]
        sort: Option<StockSort>,
    },
    Add {
        #[command(flatten)]
        item: StockItemArgs,
    },
    /// Edit a stock record; omitted fields keep their current values.
    Edit {
        id: StockId,
        #[command(flatten)]
        item: StockItemArgs,
    },
    Delete { id: StockId },
}

#[derive(Debug, Clone, Args)]
pub struct StockItemArgs {
    #[arg(long)]
    pub name: Option<String>,
    /// Grams, e.g. 12.5.
    #[arg(long)]
    pub weight: Option<Weight>,
    #[arg(long)]
    pub pieces: Option<u32>,
    #[arg(long = "type")]
    pub material: Option<Material>,
}

#[derive(Debug, Subcommand)]
pub enum LedgerCommand {
    List {
        #[command(flatten)]
        filter: LedgerFilterArgs,
    },
    /// Record an item as given out.
    Issue {
        #[arg(long)]
        item: Option<String>,
        /// Who the item was given to.
        #[arg(long = "to")]
        recipient: Option<String>,
        #[arg(long)]
        weight: Option<Weight>,
        #[arg(long)]
        pieces: Option<u32>,
        #[arg(long = "type")]
        material: Option<Material>,
    },
    /// Mark an entry sold: decrement stock, write history, remove it.
    Sell { id: LedgerEntryId },
    /// Mark an entry returned: write history and remove it.
    Return { id: LedgerEntryId },
    /// Retry ledger removals left over from failed dispositions.
    Retry,
}

#[derive(Debug, Clone, Default, Args)]
pub struct LedgerFilterArgs {
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long = "to")]
    pub recipient: Option<String>,
    #[arg(long = "type")]
    pub material: Option<MaterialFilter>,
    /// pending, selled, returned or all.
    #[arg(long)]
    pub status: Option<StatusFilter>,
    /// itemNameAsc, itemNameDesc, dateAsc or dateDesc.
    #[arg(long)]
    pub sort: Option<LedgerSort>,
}

#[derive(Debug, Subcommand)]
pub enum HistoryCommand {
    List {
        #[command(flatten)]
        filter: LedgerFilterArgs,
        /// Ignore the filters and list every record.
        #[arg(long, default_value_t = false)]
        all: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum PriceCommand {
    /// Show the current gold and silver prices.
    Show,
    /// Set a price. Without an amount the current one is re-submitted.
    Set {
        material: Material,
        amount: Option<f64>,
    },
    History {
        #[command(flatten)]
        range: RangeArgs,
        #[arg(long = "type")]
        material: Option<MaterialFilter>,
        /// asc or desc (newest first).
        #[arg(long)]
        order: Option<PriceOrder>,
    },
}

#[derive(Debug, Subcommand)]
pub enum SettingsCommand {
    /// Reload the profile from the backend.
    Show,
    /// Change name, username and password.
    Update {
        #[arg(long)]
        name: String,
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
}

#[derive(Debug, Clone, Copy, Default, Args)]
pub struct RangeArgs {
    /// First day, YYYY-MM-DD.
    #[arg(long)]
    pub from: Option<NaiveDate>,
    /// Last day (inclusive), YYYY-MM-DD.
    #[arg(long)]
    pub to: Option<NaiveDate>,
}

impl Cli {
    /// Client configuration: flags first, then the environment.
    pub fn config(&self) -> Result<ClientConfig, ConfigError> {
        self.config_with(|key| std::env::var(key).ok())
    }

    fn config_with(
        &self,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<ClientConfig, ConfigError> {
        let timeout = self.timeout_secs.map(|secs| secs.to_string());
        ClientConfig::from_lookup(|key| {
            let flag = match key {
                API_URL_VAR => self.api_url.clone(),
                TIMEOUT_VAR => timeout.clone(),
                STATE_DB_VAR => self.state_db.as_ref().map(|p| p.display().to_string()),
                _ => None,
            };
            flag.or_else(|| env(key))
        })
    }
}

/// Run one parsed invocation against the configured backend.
pub async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = cli.config().context("invalid configuration")?;
    tracing::debug!(api_url = %config.api_url, state_db = %config.state_db.display(), "configured");

    let api: Arc<dyn InventoryApi> = Arc::new(
        HttpApi::new(&config).with_context(|| format!("cannot use API URL {}", config.api_url))?,
    );
    let store = SqliteStore::open(&config.state_db)
        .await
        .with_context(|| format!("cannot open state database {}", config.state_db.display()))?;
    let session = SessionManager::new(store);

    let result = execute(cli.command, &session, api, cli.json).await;
    Ok(emit(result, cli.json))
}

fn emit(result: ServiceResult<Report>, json: bool) -> ExitCode {
    let (report, code) = match result {
        Ok(report) => (report, ExitCode::SUCCESS),
        Err(err) => {
            tracing::debug!(error = ?err, "command failed");
            (Report::notice(Notice::from(&err)), ExitCode::FAILURE)
        }
    };

    if let Some(output) = &report.output {
        print!("{output}");
    }
    if let Some(notice) = &report.notice {
        if json {
            eprintln!("{}", render::json(notice));
        } else {
            eprintln!("{notice}");
        }
    }
    code
}
