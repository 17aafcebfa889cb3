//! Batch tasks
//!
//! Each task is one unattended job run from cron. A task returns a short
//! human-readable summary on success; the caller turns the result into a
//! notification and an exit code.

use crate::services::{
    find_spreadsheet_by_year, EssentialsAggregator, FieldCheck, SyncOrchestrator, SyncReport,
};
use crate::sheets::SpreadsheetSource;
use crate::utils::RateLimiter;
use ktn_common::config::{AppConfig, RequestProfile};
use ktn_common::db::OrderStore;
use ktn_common::{Error, Result};
use std::sync::Arc;
use tracing::info;

/// A batch task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    InitDb,
    CheckFieldnames,
    StoreAll,
    StoreLatest,
    StoreYear(i32),
    UpdateEssentials,
}

impl Task {
    /// Whether the task reads spreadsheets
    pub fn needs_remote(self) -> bool {
        matches!(
            self,
            Task::CheckFieldnames | Task::StoreAll | Task::StoreLatest | Task::StoreYear(_)
        )
    }

    /// Delay profile for remote reads
    pub fn request_profile(self) -> RequestProfile {
        match self {
            Task::StoreAll => RequestProfile::Safe,
            _ => RequestProfile::Greedy,
        }
    }

    pub fn success_message(self) -> String {
        match self {
            Task::InitDb => "Database was successfully initialized".to_string(),
            Task::CheckFieldnames => "Fieldnames check: OK".to_string(),
            Task::StoreAll => "Spreadsheets data was successfully stored".to_string(),
            Task::StoreLatest => "Latest spreadsheet data was successfully stored".to_string(),
            Task::StoreYear(year) => format!("Spreadsheet data for {} was successfully stored", year),
            Task::UpdateEssentials => {
                "Essential words and phrases were successfully updated".to_string()
            }
        }
    }

    pub fn failure_message(self) -> String {
        match self {
            Task::InitDb => "Failed to initialize database".to_string(),
            Task::CheckFieldnames => "Failed to check fieldnames".to_string(),
            Task::StoreAll => "Failed to store spreadsheets data".to_string(),
            Task::StoreLatest => "Failed to store latest spreadsheet data".to_string(),
            Task::StoreYear(year) => format!("Failed to store spreadsheet data for {}", year),
            Task::UpdateEssentials => "Failed to update essentials".to_string(),
        }
    }
}

/// Everything a task may need
pub struct TaskContext {
    pub config: AppConfig,
    pub store: OrderStore,
    /// Present for tasks that read spreadsheets
    pub source: Option<Arc<dyn SpreadsheetSource>>,
    pub current_year: i32,
}

impl TaskContext {
    fn source(&self) -> Result<Arc<dyn SpreadsheetSource>> {
        self.source
            .clone()
            .ok_or_else(|| Error::Config("Spreadsheet source not configured".to_string()))
    }

    fn orchestrator(&self, profile: RequestProfile) -> Result<SyncOrchestrator> {
        Ok(SyncOrchestrator::new(
            self.source()?,
            self.store.clone(),
            RateLimiter::for_profile(profile),
        ))
    }
}

/// Run a task and return its summary
pub async fn run(task: Task, ctx: &TaskContext) -> Result<String> {
    match task {
        // Tables and missing columns are created when the store is opened
        Task::InitDb => Ok(task.success_message()),
        Task::CheckFieldnames => {
            check_fieldnames(ctx).await?;
            Ok(task.success_message())
        }
        Task::StoreAll => {
            let reports = store_all(ctx).await?;
            Ok(summarize(task, &reports))
        }
        Task::StoreLatest => {
            let report = store_year(ctx, ctx.current_year, task.request_profile()).await?;
            Ok(summarize(task, &[report]))
        }
        Task::StoreYear(year) => {
            let report = store_year(ctx, year, task.request_profile()).await?;
            Ok(summarize(task, &[report]))
        }
        Task::UpdateEssentials => {
            let updated = EssentialsAggregator::new(ctx.store.clone()).update_all().await?;
            info!(partitions = updated, "Essentials rebuilt");
            Ok(task.success_message())
        }
    }
}

/// Headers of the current-year spreadsheet against the field dictionary
pub async fn check_fieldnames(ctx: &TaskContext) -> Result<()> {
    let source = ctx.source()?;
    let rate_limiter = RateLimiter::for_profile(RequestProfile::Greedy);
    let spreadsheet = find_spreadsheet_by_year(
        source.as_ref(),
        &ctx.config.spreadsheet_ids,
        ctx.current_year,
        &rate_limiter,
    )
    .await?
    .ok_or_else(|| Error::NotFound(format!("Spreadsheet for current year {}", ctx.current_year)))?;

    FieldCheck::new(source.as_ref(), &rate_limiter)
        .check_spreadsheet(&spreadsheet)
        .await
}

/// Sync one year
pub async fn store_year(ctx: &TaskContext, year: i32, profile: RequestProfile) -> Result<SyncReport> {
    ctx.orchestrator(profile)?
        .sync_year(&ctx.config.spreadsheet_ids, year)
        .await
}

/// Sync every year from the configured start year to the current one.
///
/// Spreadsheet metadata is read once for the whole range; years without a
/// spreadsheet are skipped with a warning.
pub async fn store_all(ctx: &TaskContext) -> Result<Vec<SyncReport>> {
    ctx.orchestrator(RequestProfile::Safe)?
        .sync_years(&ctx.config.spreadsheet_ids, ctx.config.start_year..=ctx.current_year)
        .await
}

fn summarize(task: Task, reports: &[SyncReport]) -> String {
    let stored: usize = reports.iter().map(SyncReport::stored).sum();
    let skipped: usize = reports.iter().map(SyncReport::skipped).sum();
    let stale: Vec<String> = reports
        .iter()
        .flat_map(|r| r.essentials_failures())
        .map(|key| key.to_string())
        .collect();

    let mut message = format!(
        "{} ({} sheets updated, {} unchanged)",
        task.success_message(),
        stored,
        skipped
    );
    if !stale.is_empty() {
        message.push_str(&format!("\nEssentials not updated for: {}", stale.join(", ")));
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profiles() {
        assert_eq!(Task::StoreAll.request_profile(), RequestProfile::Safe);
        assert_eq!(Task::StoreLatest.request_profile(), RequestProfile::Greedy);
        assert_eq!(Task::StoreYear(2020).request_profile(), RequestProfile::Greedy);
    }

    #[test]
    fn test_remote_tasks() {
        assert!(!Task::InitDb.needs_remote());
        assert!(!Task::UpdateEssentials.needs_remote());
        assert!(Task::CheckFieldnames.needs_remote());
        assert!(Task::StoreYear(2021).needs_remote());
    }

    #[test]
    fn test_summary_mentions_stale_essentials() {
        use crate::services::{SheetOutcome, SheetReport};
        use ktn_common::PartitionKey;

        let report = SyncReport {
            spreadsheet: "Заказы 2023".to_string(),
            year: 2023,
            sheets: vec![
                SheetReport {
                    sheet: "17.05".to_string(),
                    partition: PartitionKey::from_parts(2023, 5, 17),
                    outcome: SheetOutcome::Stored {
                        records: 3,
                        essentials_error: Some("locked".to_string()),
                    },
                    issues: 0,
                },
                SheetReport {
                    sheet: "18.05".to_string(),
                    partition: PartitionKey::from_parts(2023, 5, 18),
                    outcome: SheetOutcome::Skipped,
                    issues: 0,
                },
            ],
        };

        let message = summarize(Task::StoreLatest, &[report]);
        assert!(message.starts_with("Latest spreadsheet data was successfully stored (1 sheets updated, 1 unchanged)"));
        assert!(message.ends_with("Essentials not updated for: 2023.05.17"));
    }
}
