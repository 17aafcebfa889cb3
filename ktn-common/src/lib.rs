//! # KTN Common Library
//!
//! Shared code for the KTN order ingestion and search services including:
//! - Error taxonomy
//! - Configuration loading
//! - Partition keys (one per dated sheet)
//! - The declared order-field dictionary
//! - Database schema, models and the order store

pub mod config;
pub mod db;
pub mod error;
pub mod fields;
pub mod partition;

pub use error::{Error, Result};
pub use fields::{FieldKind, OrderField};
pub use partition::PartitionKey;
