//! Spreadsheet source abstraction

use super::{RawGrid, SheetInfo, Spreadsheet};
use async_trait::async_trait;
use ktn_common::Result;

/// Read access to spreadsheets.
///
/// Any failure is reported as [`ktn_common::Error::RemoteFetch`] and aborts
/// the current run.
#[async_trait]
pub trait SpreadsheetSource: Send + Sync {
    /// Spreadsheet metadata including every sheet and its merge regions
    async fn spreadsheet(&self, spreadsheet_id: &str) -> Result<Spreadsheet>;

    /// Cell values of one sheet within the configured parse range
    async fn fetch_grid(&self, spreadsheet_id: &str, sheet_title: &str) -> Result<RawGrid>;

    /// Sheets of a spreadsheet in display order
    async fn list_sheets(&self, spreadsheet_id: &str) -> Result<Vec<SheetInfo>> {
        Ok(self.spreadsheet(spreadsheet_id).await?.sheets)
    }
}
