//! Database access
//!
//! SQLite schema, models and the order store shared by the sync tool and
//! the search service.

pub mod init;
pub mod models;
pub mod schema_sync;
pub mod store;
pub mod table_schemas;
pub mod transaction;

pub use init::{init_database, init_memory_database, init_schema};
pub use models::{Fingerprint, OrderRecord};
pub use store::{record_from_row, OrderStore, SearchFilter};
pub use transaction::PartitionTransaction;
