//! Ingestion pipeline services
//!
//! Sheet grid → fingerprint → normalized rows → typed records → partition
//! replace → essentials.

pub mod discovery;
pub mod essentials;
pub mod field_check;
pub mod fingerprint;
pub mod normalizer;
pub mod orchestrator;
pub mod record_builder;
pub mod tokenizer;

pub use discovery::{find_spreadsheet_by_year, resolve_spreadsheets, spreadsheet_for_year};
pub use essentials::{Essentials, EssentialsAggregator};
pub use field_check::FieldCheck;
pub use fingerprint::{fingerprint, ChangeDetector};
pub use normalizer::{normalize, ColumnSchema, DataQualityIssue, NormalizedRow, NormalizedSheet};
pub use orchestrator::{SheetOutcome, SheetReport, SheetState, SyncOrchestrator, SyncReport};
pub use record_builder::{build_record, coerce_integer};
pub use tokenizer::{extract_phrases, extract_tokens};
