//! Sync orchestrator
//!
//! # State Progression (per sheet)
//! UNVISITED → HASH_CHECKED → SKIPPED
//! UNVISITED → HASH_CHECKED → NORMALIZING → PERSISTING → ESSENTIALS_UPDATED
//!
//! Sheets are processed one at a time, in display order, with the rate
//! limiter wait before every grid read. A remote or persistence failure
//! aborts the run; partitions committed before the failure stay committed.
//! Essentials are a derived cache: a failure to update them is reported in
//! the [`SheetReport`] but does not undo the committed records.

use crate::services::discovery::{
    find_spreadsheet_by_year, resolve_spreadsheets, spreadsheet_for_year,
};
use crate::services::essentials::EssentialsAggregator;
use crate::services::fingerprint::{fingerprint, ChangeDetector};
use crate::services::normalizer::normalize;
use crate::services::record_builder::build_record;
use crate::sheets::{SheetInfo, Spreadsheet, SpreadsheetSource};
use crate::utils::RateLimiter;
use ktn_common::db::{OrderRecord, OrderStore};
use ktn_common::{Error, PartitionKey, Result};
use std::fmt;
use std::ops::RangeInclusive;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Processing state of one sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetState {
    Unvisited,
    HashChecked,
    Skipped,
    Normalizing,
    Persisting,
    EssentialsUpdated,
}

impl fmt::Display for SheetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SheetState::Unvisited => "UNVISITED",
            SheetState::HashChecked => "HASH_CHECKED",
            SheetState::Skipped => "SKIPPED",
            SheetState::Normalizing => "NORMALIZING",
            SheetState::Persisting => "PERSISTING",
            SheetState::EssentialsUpdated => "ESSENTIALS_UPDATED",
        };
        f.write_str(name)
    }
}

/// How processing of a sheet ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetOutcome {
    /// Content unchanged since the last run
    Skipped,
    /// Records replaced; `essentials_error` is set when the derived
    /// essentials could not be refreshed
    Stored {
        records: usize,
        essentials_error: Option<String>,
    },
}

/// Result of one sheet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetReport {
    pub sheet: String,
    pub partition: PartitionKey,
    pub outcome: SheetOutcome,
    /// Data-quality findings met during normalization
    pub issues: usize,
}

impl SheetReport {
    pub fn final_state(&self) -> SheetState {
        match self.outcome {
            SheetOutcome::Skipped => SheetState::Skipped,
            SheetOutcome::Stored { .. } => SheetState::EssentialsUpdated,
        }
    }
}

/// Result of one spreadsheet
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub spreadsheet: String,
    pub year: i32,
    pub sheets: Vec<SheetReport>,
}

impl SyncReport {
    pub fn stored(&self) -> usize {
        self.sheets
            .iter()
            .filter(|s| matches!(s.outcome, SheetOutcome::Stored { .. }))
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.sheets
            .iter()
            .filter(|s| s.outcome == SheetOutcome::Skipped)
            .count()
    }

    /// Partitions whose essentials could not be refreshed
    pub fn essentials_failures(&self) -> Vec<&PartitionKey> {
        self.sheets
            .iter()
            .filter(|s| {
                matches!(
                    s.outcome,
                    SheetOutcome::Stored {
                        essentials_error: Some(_),
                        ..
                    }
                )
            })
            .map(|s| &s.partition)
            .collect()
    }
}

/// Drives sheets through fetch, change detection, normalization and storage
pub struct SyncOrchestrator {
    source: Arc<dyn SpreadsheetSource>,
    store: OrderStore,
    change_detector: ChangeDetector,
    essentials: EssentialsAggregator,
    rate_limiter: RateLimiter,
}

impl SyncOrchestrator {
    pub fn new(
        source: Arc<dyn SpreadsheetSource>,
        store: OrderStore,
        rate_limiter: RateLimiter,
    ) -> Self {
        Self {
            source,
            change_detector: ChangeDetector::new(store.clone()),
            essentials: EssentialsAggregator::new(store.clone()),
            store,
            rate_limiter,
        }
    }

    pub fn store(&self) -> &OrderStore {
        &self.store
    }

    fn transition(&self, partition: &PartitionKey, from: SheetState, to: SheetState) {
        debug!(partition = %partition, from = %from, to = %to, "Sheet state transition");
    }

    /// Sync the spreadsheet of one year.
    ///
    /// Returns [`Error::NotFound`] when no configured spreadsheet covers it.
    pub async fn sync_year(&self, spreadsheet_ids: &[String], year: i32) -> Result<SyncReport> {
        let spreadsheet = find_spreadsheet_by_year(
            self.source.as_ref(),
            spreadsheet_ids,
            year,
            &self.rate_limiter,
        )
        .await?
        .ok_or_else(|| Error::NotFound(format!("Spreadsheet for year {}", year)))?;

        self.sync_spreadsheet(&spreadsheet, year).await
    }

    /// Sync a range of years, reading spreadsheet metadata once.
    ///
    /// Years without a spreadsheet are skipped with a warning.
    pub async fn sync_years(
        &self,
        spreadsheet_ids: &[String],
        years: RangeInclusive<i32>,
    ) -> Result<Vec<SyncReport>> {
        let spreadsheets =
            resolve_spreadsheets(self.source.as_ref(), spreadsheet_ids, &self.rate_limiter).await?;

        let mut reports = Vec::new();
        for year in years {
            match spreadsheet_for_year(&spreadsheets, year) {
                Some(spreadsheet) => reports.push(self.sync_spreadsheet(spreadsheet, year).await?),
                None => warn!(year, "No spreadsheet for year, skipped"),
            }
        }
        Ok(reports)
    }

    /// Sync every dated or reserved sheet of a spreadsheet
    pub async fn sync_spreadsheet(&self, spreadsheet: &Spreadsheet, year: i32) -> Result<SyncReport> {
        info!(spreadsheet = %spreadsheet.title, year, "Syncing spreadsheet");

        let mut report = SyncReport {
            spreadsheet: spreadsheet.title.clone(),
            year,
            sheets: Vec::new(),
        };

        for sheet in &spreadsheet.sheets {
            let Some(partition) = sheet.partition_key(year) else {
                debug!(sheet = %sheet.title, "Sheet has no date, ignored");
                continue;
            };

            let sheet_report = self.sync_sheet(spreadsheet, sheet, partition).await?;
            report.sheets.push(sheet_report);
        }

        info!(
            spreadsheet = %spreadsheet.title,
            stored = report.stored(),
            skipped = report.skipped(),
            "Spreadsheet synced"
        );
        Ok(report)
    }

    /// Run one sheet through the state machine
    pub async fn sync_sheet(
        &self,
        spreadsheet: &Spreadsheet,
        sheet: &SheetInfo,
        partition: PartitionKey,
    ) -> Result<SheetReport> {
        self.rate_limiter.wait().await;
        let grid = self.source.fetch_grid(&spreadsheet.id, &sheet.title).await?;

        let hash = fingerprint(&grid)?;
        self.transition(&partition, SheetState::Unvisited, SheetState::HashChecked);

        if !self.change_detector.should_reprocess(&partition, &hash).await? {
            self.transition(&partition, SheetState::HashChecked, SheetState::Skipped);
            return Ok(SheetReport {
                sheet: sheet.title.clone(),
                partition,
                outcome: SheetOutcome::Skipped,
                issues: 0,
            });
        }

        self.transition(&partition, SheetState::HashChecked, SheetState::Normalizing);
        let normalized = normalize(&grid, &sheet.merges);
        for issue in &normalized.issues {
            warn!(partition = %partition, sheet = %sheet.title, "Data quality: {}", issue);
        }

        let records: Vec<OrderRecord> = normalized
            .rows
            .iter()
            .map(|row| {
                let mut record = build_record(&row.fields, &partition, row.row_number);
                record.is_merged = row.is_merged;
                record.order_link = spreadsheet.row_link(sheet, row.row_number);
                record
            })
            .collect();
        let record_count = records.len();

        self.transition(&partition, SheetState::Normalizing, SheetState::Persisting);
        self.store.replace_partition(&partition, hash, records).await?;

        let essentials_error = match self.essentials.update_for_partition(&partition).await {
            Ok(_) => {
                self.transition(
                    &partition,
                    SheetState::Persisting,
                    SheetState::EssentialsUpdated,
                );
                None
            }
            Err(e) => {
                error!(partition = %partition, error = %e, "Failed to update essentials");
                Some(e.to_string())
            }
        };

        info!(
            partition = %partition,
            sheet = %sheet.title,
            records = record_count,
            "Stored partition"
        );

        Ok(SheetReport {
            sheet: sheet.title.clone(),
            partition,
            outcome: SheetOutcome::Stored {
                records: record_count,
                essentials_error,
            },
            issues: normalized.issues.len(),
        })
    }
}
