//! Partition-scoped transactions
//!
//! A [`PartitionTransaction`] owns one SQLite transaction and only mutates
//! rows of its own partition. It logs how long the connection was held and
//! warns when it is dropped without an explicit commit or rollback; sqlx
//! rolls a dropped transaction back, so every exit path leaves the prior
//! snapshot intact unless `commit` succeeded.

use crate::db::models::OrderRecord;
use crate::fields::OrderField;
use crate::partition::PartitionKey;
use crate::{Error, Result};
use once_cell::sync::Lazy;
use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use std::time::Instant;

static INSERT_ORDER_SQL: Lazy<String> = Lazy::new(|| {
    let mut columns = vec![
        "date",
        "row_number",
        "search",
        "customer_search",
        "is_merged",
        "order_link",
    ];
    columns.extend(OrderField::ALL.iter().map(|f| f.column()));
    let placeholders = vec!["?"; columns.len()].join(", ");
    format!(
        "INSERT INTO orders ({}) VALUES ({})",
        columns.join(", "),
        placeholders
    )
});

/// Upper-cased customer link used for case-insensitive customer search.
///
/// SQLite `upper()` folds ASCII only, so the folded copy is computed here.
pub fn customer_search(customer_link: &str) -> String {
    customer_link.to_uppercase()
}

/// Transaction bound to a single partition
pub struct PartitionTransaction {
    tx: Option<Transaction<'static, Sqlite>>,
    partition: PartitionKey,
    caller: &'static str,
    acquired_at: Instant,
}

impl PartitionTransaction {
    /// Begin a transaction for `partition`
    pub async fn begin(
        pool: &SqlitePool,
        partition: &PartitionKey,
        caller: &'static str,
    ) -> Result<Self> {
        let start = Instant::now();
        let tx = pool.begin().await?;

        let wait_ms = start.elapsed().as_millis();
        if wait_ms > 1000 {
            tracing::warn!(
                caller,
                partition = %partition,
                wait_ms,
                "Slow transaction start, database may be locked by another writer"
            );
        } else {
            tracing::debug!(caller, partition = %partition, wait_ms, "Transaction started");
        }

        Ok(Self {
            tx: Some(tx),
            partition: partition.clone(),
            caller,
            acquired_at: Instant::now(),
        })
    }

    pub fn partition(&self) -> &PartitionKey {
        &self.partition
    }

    fn conn(&mut self) -> Result<&mut SqliteConnection> {
        match self.tx.as_mut() {
            Some(tx) => Ok(&mut **tx),
            None => Err(Error::Internal("Transaction already consumed".to_string())),
        }
    }

    /// Create an empty fingerprint row if none exists.
    ///
    /// Returns true when the placeholder was created.
    pub async fn ensure_fingerprint(&mut self) -> Result<bool> {
        let key = self.partition.to_string();
        let result = sqlx::query(
            "INSERT INTO fingerprints (date, hash) VALUES (?, '') ON CONFLICT(date) DO NOTHING",
        )
        .bind(key)
        .execute(self.conn()?)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Delete every record of the partition
    pub async fn delete_records(&mut self) -> Result<u64> {
        let key = self.partition.to_string();
        let result = sqlx::query("DELETE FROM orders WHERE date = ?")
            .bind(key)
            .execute(self.conn()?)
            .await?;
        Ok(result.rows_affected())
    }

    /// Insert records; every record must belong to this partition
    pub async fn insert_records(&mut self, records: &[OrderRecord]) -> Result<u64> {
        if let Some(stray) = records.iter().find(|r| r.date != self.partition.as_str()) {
            return Err(Error::InvalidInput(format!(
                "Record {}:{} does not belong to partition {}",
                stray.date, stray.row_number, self.partition
            )));
        }

        let conn = self.conn()?;
        let mut inserted = 0;

        for record in records {
            let mut query = sqlx::query(INSERT_ORDER_SQL.as_str())
                .bind(record.date.as_str())
                .bind(record.row_number)
                .bind(record.search.as_str())
                .bind(customer_search(&record.customer_link))
                .bind(record.is_merged)
                .bind(record.order_link.as_str());

            for field in OrderField::ALL {
                query = match (record.text(field), record.int(field)) {
                    (Some(text), _) => query.bind(text),
                    (None, Some(value)) => query.bind(value),
                    (None, None) => query.bind(0_i64),
                };
            }

            inserted += query.execute(&mut *conn).await?.rows_affected();
        }

        Ok(inserted)
    }

    /// Overwrite the stored hash
    pub async fn set_hash(&mut self, hash: &str) -> Result<()> {
        let key = self.partition.to_string();
        let result = sqlx::query(
            "UPDATE fingerprints SET hash = ?, updated_at = CURRENT_TIMESTAMP WHERE date = ?",
        )
        .bind(hash)
        .bind(key)
        .execute(self.conn()?)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!(
                "No fingerprint for partition {}",
                self.partition
            )));
        }
        Ok(())
    }

    /// Commit and log how long the connection was held
    pub async fn commit(mut self) -> Result<()> {
        let tx = self
            .tx
            .take()
            .ok_or_else(|| Error::Internal("Transaction already consumed".to_string()))?;
        tx.commit().await?;

        let held_ms = self.acquired_at.elapsed().as_millis();
        if held_ms > 2000 {
            tracing::warn!(
                caller = self.caller,
                partition = %self.partition,
                held_ms,
                "Long transaction committed"
            );
        } else {
            tracing::debug!(
                caller = self.caller,
                partition = %self.partition,
                held_ms,
                "Transaction committed"
            );
        }
        Ok(())
    }

    /// Roll back every change made through this transaction
    pub async fn rollback(mut self) -> Result<()> {
        let tx = self
            .tx
            .take()
            .ok_or_else(|| Error::Internal("Transaction already consumed".to_string()))?;
        tx.rollback().await?;

        tracing::debug!(
            caller = self.caller,
            partition = %self.partition,
            held_ms = self.acquired_at.elapsed().as_millis(),
            "Transaction rolled back"
        );
        Ok(())
    }
}

impl Drop for PartitionTransaction {
    fn drop(&mut self) {
        if self.tx.is_some() {
            tracing::warn!(
                caller = self.caller,
                partition = %self.partition,
                held_ms = self.acquired_at.elapsed().as_millis(),
                "Transaction dropped without commit, changes rolled back"
            );
        }
    }
}
