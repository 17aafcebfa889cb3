//! # KTN Sync
//!
//! Ingestion pipeline for the order spreadsheets:
//! - Spreadsheet sources (Google Sheets API v4)
//! - Content fingerprints and change detection
//! - Merge-aware normalization and typed record building
//! - Essentials (word and phrase frequencies)
//! - Batch tasks and their notifications

pub mod notify;
pub mod services;
pub mod sheets;
pub mod tasks;
pub mod utils;

pub use services::{SyncOrchestrator, SyncReport};
pub use sheets::{RawGrid, SpreadsheetSource};
pub use tasks::{Task, TaskContext};
