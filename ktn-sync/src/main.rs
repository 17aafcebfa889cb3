//! KTN Sync - batch entry point
//!
//! Runs one task per invocation (meant for cron), reports the result through
//! the configured notifier and exits non-zero on failure.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Datelike, Local};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ktn_common::config::{AppConfig, ConfigOverrides};
use ktn_common::db::{init_database, OrderStore};
use ktn_sync::notify::{notifier_from_config, report_failure, report_success};
use ktn_sync::sheets::GoogleSheetsClient;
use ktn_sync::{SpreadsheetSource, Task, TaskContext};

/// Command-line arguments for ktn-sync
#[derive(Parser, Debug)]
#[command(name = "ktn-sync")]
#[command(about = "Order spreadsheet ingestion for KTN")]
#[command(version)]
struct Args {
    /// TOML config file (defaults to the platform config dir)
    #[arg(short, long, env = "KTN_CONFIG")]
    config: Option<PathBuf>,

    /// SQLite database file
    #[arg(long, env = "KTN_DATABASE_PATH")]
    database_path: Option<PathBuf>,

    /// Comma-separated spreadsheet ids
    #[arg(long, env = "KTN_SPREADSHEET_IDS", value_delimiter = ',')]
    spreadsheet_ids: Option<Vec<String>>,

    /// A1 range read from every sheet
    #[arg(long, env = "KTN_SHEET_PARSE_RANGE")]
    sheet_parse_range: Option<String>,

    #[arg(long, env = "KTN_SHEETS_API_KEY", hide_env_values = true)]
    sheets_api_key: Option<String>,

    #[arg(long, env = "KTN_SHEETS_ACCESS_TOKEN", hide_env_values = true)]
    sheets_access_token: Option<String>,

    #[arg(long, env = "KTN_TELEGRAM_TOKEN", hide_env_values = true)]
    telegram_token: Option<String>,

    #[arg(long, env = "KTN_TELEGRAM_CHAT_ID")]
    telegram_chat_id: Option<i64>,

    /// First year synced by `store-all`
    #[arg(long, env = "KTN_START_YEAR")]
    start_year: Option<i32>,

    /// Log level when RUST_LOG is not set
    #[arg(long, env = "KTN_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Command {
    /// Create the database and bring its schema up to date
    InitDb,
    /// Check current-year sheet headers against the declared fields
    CheckFieldnames,
    /// Fetch and store every year's spreadsheet
    StoreAll,
    /// Fetch and store the current year's spreadsheet
    StoreLatest,
    /// Fetch and store the spreadsheet of one year
    StoreYear { year: i32 },
    /// Rebuild essential words and phrases for every stored partition
    UpdateEssentials,
}

impl Command {
    fn task(self) -> Task {
        match self {
            Command::InitDb => Task::InitDb,
            Command::CheckFieldnames => Task::CheckFieldnames,
            Command::StoreAll => Task::StoreAll,
            Command::StoreLatest => Task::StoreLatest,
            Command::StoreYear { year } => Task::StoreYear(year),
            Command::UpdateEssentials => Task::UpdateEssentials,
        }
    }
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            database_path: self.database_path.clone(),
            spreadsheet_ids: self.spreadsheet_ids.clone(),
            sheet_parse_range: self.sheet_parse_range.clone(),
            sheets_api_key: self.sheets_api_key.clone(),
            sheets_access_token: self.sheets_access_token.clone(),
            telegram_token: self.telegram_token.clone(),
            telegram_chat_id: self.telegram_chat_id,
            api_port: None,
            start_year: self.start_year,
            log_level: self.log_level.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = AppConfig::load(args.config.as_deref(), args.overrides())
        .context("Failed to load configuration")?;

    // RUST_LOG wins over the configured level
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "ktn-sync v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let task = args.command.task();
    let notifier = notifier_from_config(&config)?;

    match execute(task, config).await {
        Ok(summary) => {
            report_success(notifier.as_ref(), &summary, &Local::now()).await;
            Ok(())
        }
        Err(e) => {
            report_failure(notifier.as_ref(), &task.failure_message(), &e).await;
            Err(e)
        }
    }
}

async fn execute(task: Task, config: AppConfig) -> Result<String> {
    info!(task = ?task, database = %config.database_path.display(), "Running task");

    let pool = init_database(&config.database_path)
        .await
        .context("Failed to establish connection with database")?;
    let store = OrderStore::new(pool);

    let source: Option<Arc<dyn SpreadsheetSource>> = if task.needs_remote() {
        config.require_remote_access()?;
        let client = GoogleSheetsClient::from_config(&config)
            .context("Failed to create Sheets client")?;
        Some(Arc::new(client) as Arc<dyn SpreadsheetSource>)
    } else {
        None
    };

    let ctx = TaskContext {
        config,
        store,
        source,
        current_year: Local::now().year(),
    };

    let result = ktn_sync::tasks::run(task, &ctx).await;
    ctx.store.pool().close().await;

    Ok(result?)
}
