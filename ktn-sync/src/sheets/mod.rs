//! Spreadsheet data model and sources
//!
//! A spreadsheet holds one sheet per order date. Sheets are read as a raw
//! grid of JSON cell values plus the merge regions of the sheet.

pub mod google;
pub mod source;

pub use google::{GoogleSheetsClient, SheetsAuth};
pub use source::SpreadsheetSource;

use ktn_common::partition::{year_from_title, PartitionKey};
use serde::{Deserialize, Serialize};

/// One raw cell as returned by the source (usually a string)
pub type Cell = serde_json::Value;

/// Rows of cells, header row first. Rows may have different lengths.
pub type RawGrid = Vec<Vec<Cell>>;

/// Rectangle of merged cells, half-open on both axes, 0-based
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeRegion {
    pub start_row: usize,
    pub end_row: usize,
    pub start_column: usize,
    pub end_column: usize,
}

impl MergeRegion {
    pub fn new(start_row: usize, end_row: usize, start_column: usize, end_column: usize) -> Self {
        Self {
            start_row,
            end_row,
            start_column,
            end_column,
        }
    }

    /// Whether the region covers one of the two lead columns
    pub fn touches_lead_columns(&self) -> bool {
        self.start_column <= 1
    }

    /// Grid rows that only repeat the value of the first row
    pub fn continuation_rows(&self) -> std::ops::Range<usize> {
        (self.start_row + 1)..self.end_row.max(self.start_row + 1)
    }
}

/// Sheet metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetInfo {
    pub sheet_id: i64,
    pub title: String,
    pub merges: Vec<MergeRegion>,
}

impl SheetInfo {
    /// Partition this sheet is stored under, `None` for undated sheets
    pub fn partition_key(&self, year: i32) -> Option<PartitionKey> {
        PartitionKey::from_sheet_name(&self.title, year)
    }
}

/// Spreadsheet metadata with its sheets in display order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Spreadsheet {
    pub id: String,
    pub title: String,
    pub sheets: Vec<SheetInfo>,
}

impl Spreadsheet {
    /// Year of the spreadsheet taken from its title
    pub fn year(&self) -> Option<i32> {
        year_from_title(&self.title)
    }

    /// URL pointing at one row of one sheet
    pub fn row_link(&self, sheet: &SheetInfo, row_number: i64) -> String {
        format!(
            "https://docs.google.com/spreadsheets/d/{}/edit?gid={}#gid={}&range={}:{}",
            self.id, sheet.sheet_id, sheet.sheet_id, row_number, row_number
        )
    }
}
