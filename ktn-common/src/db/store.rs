//! Order store
//!
//! Reads and writes partitions. Every mutation of a partition goes through a
//! [`PartitionTransaction`]; readers only ever see a partition before or
//! after a replace, never in between.

use crate::db::models::{Fingerprint, OrderRecord};
use crate::db::transaction::PartitionTransaction;
use crate::fields::{FieldKind, OrderField};
use crate::partition::PartitionKey;
use crate::{Error, Result};
use futures::future::BoxFuture;
use once_cell::sync::Lazy;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::{debug, warn};

static SELECT_ORDER_COLUMNS: Lazy<String> = Lazy::new(|| {
    let mut columns = vec!["date", "row_number", "search", "is_merged", "order_link"];
    columns.extend(OrderField::ALL.iter().map(|f| f.column()));
    columns.join(", ")
});

/// Which column a search matches against
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchFilter {
    /// Match the upper-cased `search` column.
    ///
    /// With `whole_phrase` the whole term must appear as one substring,
    /// otherwise any single word of the term is enough.
    Inscription { term: String, whole_phrase: bool },
    /// Substring match on the customer profile link
    Customer { term: String },
}

impl SearchFilter {
    /// WHERE clause and its bind values
    fn to_sql(&self) -> Result<(String, Vec<String>)> {
        match self {
            SearchFilter::Inscription { term, whole_phrase } => {
                let words: Vec<String> = term.split_whitespace().map(str::to_uppercase).collect();
                if words.is_empty() {
                    return Err(Error::InvalidInput("Search term is empty".to_string()));
                }

                if *whole_phrase {
                    Ok(("instr(search, ?) > 0".to_string(), vec![words.join(" ")]))
                } else {
                    let clause = vec!["instr(search, ?) > 0"; words.len()].join(" OR ");
                    Ok((format!("({})", clause), words))
                }
            }
            SearchFilter::Customer { term } => {
                let term = term.trim();
                if term.is_empty() {
                    return Err(Error::InvalidInput("Customer term is empty".to_string()));
                }
                Ok((
                    "instr(customer_search, ?) > 0".to_string(),
                    vec![term.to_uppercase()],
                ))
            }
        }
    }
}

/// Build an [`OrderRecord`] from a row selected with all order columns
pub fn record_from_row(row: &SqliteRow) -> Result<OrderRecord> {
    let mut record = OrderRecord {
        date: row.try_get("date")?,
        row_number: row.try_get("row_number")?,
        search: row.try_get("search")?,
        is_merged: row.try_get("is_merged")?,
        order_link: row.try_get("order_link")?,
        ..Default::default()
    };

    for field in OrderField::ALL {
        match field.kind() {
            FieldKind::Integer => {
                if let Some(slot) = record.int_mut(field) {
                    *slot = row.try_get(field.column())?;
                }
            }
            FieldKind::Text => {
                if let Some(slot) = record.text_mut(field) {
                    *slot = row.try_get(field.column())?;
                }
            }
        }
    }

    Ok(record)
}

/// Persistent store of partitions, their fingerprints and order records
#[derive(Clone)]
pub struct OrderStore {
    db: SqlitePool,
}

impl OrderStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.db
    }

    /// Stored fingerprint of a partition.
    ///
    /// Returns [`Error::NotFound`] when the partition was never ingested.
    pub async fn get_fingerprint(&self, key: &PartitionKey) -> Result<Fingerprint> {
        let row = sqlx::query("SELECT date, hash, words, phrases FROM fingerprints WHERE date = ?")
            .bind(key.as_str())
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Fingerprint for partition {}", key)))?;

        let date: String = row.try_get("date")?;
        Ok(Fingerprint {
            date: PartitionKey::parse(&date)?,
            hash: row.try_get("hash")?,
            words: row.try_get("words")?,
            phrases: row.try_get("phrases")?,
        })
    }

    /// Every partition that has a fingerprint, in ascending order
    pub async fn list_partition_keys(&self) -> Result<Vec<PartitionKey>> {
        let dates: Vec<String> = sqlx::query_scalar("SELECT date FROM fingerprints ORDER BY date")
            .fetch_all(&self.db)
            .await?;

        let mut keys = Vec::with_capacity(dates.len());
        for date in dates {
            match PartitionKey::parse(&date) {
                Ok(key) => keys.push(key),
                Err(e) => warn!("Skipping fingerprint with invalid key {:?}: {}", date, e),
            }
        }
        Ok(keys)
    }

    /// Begin a transaction scoped to one partition
    pub async fn begin_partition(
        &self,
        key: &PartitionKey,
        caller: &'static str,
    ) -> Result<PartitionTransaction> {
        PartitionTransaction::begin(&self.db, key, caller).await
    }

    /// Run `f` inside a partition transaction.
    ///
    /// Commits when `f` succeeds and rolls back when it fails, returning the
    /// error of `f` unchanged.
    pub async fn with_partition_transaction<T, F>(
        &self,
        key: &PartitionKey,
        caller: &'static str,
        f: F,
    ) -> Result<T>
    where
        F: for<'t> FnOnce(&'t mut PartitionTransaction) -> BoxFuture<'t, Result<T>>,
    {
        let mut tx = self.begin_partition(key, caller).await?;

        match f(&mut tx).await {
            Ok(value) => {
                tx.commit().await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(
                        partition = %key,
                        error = %rollback_err,
                        "Rollback failed after error"
                    );
                }
                Err(err)
            }
        }
    }

    /// Replace every record of a partition and store its new hash, atomically.
    ///
    /// Creates the fingerprint placeholder first when the partition is new.
    /// On failure nothing is changed and [`Error::Persistence`] is returned.
    pub async fn replace_partition(
        &self,
        key: &PartitionKey,
        hash: String,
        records: Vec<OrderRecord>,
    ) -> Result<u64> {
        let result = self
            .with_partition_transaction(key, "replace_partition", move |tx| {
                Box::pin(async move {
                    if tx.ensure_fingerprint().await? {
                        debug!(partition = %tx.partition(), "Created fingerprint placeholder");
                    }
                    let deleted = tx.delete_records().await?;
                    let inserted = tx.insert_records(&records).await?;
                    tx.set_hash(&hash).await?;
                    debug!(
                        partition = %tx.partition(),
                        deleted,
                        inserted,
                        "Partition records replaced"
                    );
                    Ok::<_, Error>(inserted)
                })
            })
            .await;

        result.map_err(|e| match e {
            Error::Persistence(_) => e,
            other => Error::Persistence(format!("Failed to replace partition {}: {}", key, other)),
        })
    }

    /// Records of one partition ordered by row number
    pub async fn partition_records(&self, key: &PartitionKey) -> Result<Vec<OrderRecord>> {
        let sql = format!(
            "SELECT {} FROM orders WHERE date = ? ORDER BY row_number",
            SELECT_ORDER_COLUMNS.as_str()
        );
        let rows = sqlx::query(&sql)
            .bind(key.as_str())
            .fetch_all(&self.db)
            .await?;

        rows.iter().map(record_from_row).collect()
    }

    /// Number of records stored for a partition
    pub async fn count_partition_records(&self, key: &PartitionKey) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE date = ?")
            .bind(key.as_str())
            .fetch_one(&self.db)
            .await?;
        Ok(count)
    }

    /// Store word and phrase frequency JSON on an existing fingerprint
    pub async fn update_essentials(
        &self,
        key: &PartitionKey,
        words_json: &str,
        phrases_json: &str,
    ) -> Result<()> {
        let result = sqlx::query(
            "UPDATE fingerprints SET words = ?, phrases = ?, updated_at = CURRENT_TIMESTAMP WHERE date = ?",
        )
        .bind(words_json)
        .bind(phrases_json)
        .bind(key.as_str())
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Fingerprint for partition {}", key)));
        }
        Ok(())
    }

    /// All records whose `search` column matches `term`.
    ///
    /// Without `whole_phrase` a record matches when it contains any word of
    /// the term. Matching is case-insensitive.
    pub async fn query_records_by_search_term(
        &self,
        term: &str,
        whole_phrase: bool,
    ) -> Result<Vec<OrderRecord>> {
        let filter = SearchFilter::Inscription {
            term: term.to_string(),
            whole_phrase,
        };
        // LIMIT -1 is unbounded in SQLite
        self.find_matching(&filter, -1, 0).await
    }

    /// Number of records matching a filter
    pub async fn count_matching(&self, filter: &SearchFilter) -> Result<i64> {
        let (clause, binds) = filter.to_sql()?;
        let sql = format!("SELECT COUNT(*) FROM orders WHERE {}", clause);

        let mut query = sqlx::query_scalar::<_, i64>(&sql);
        for value in &binds {
            query = query.bind(value.as_str());
        }
        Ok(query.fetch_one(&self.db).await?)
    }

    /// One page of records matching a filter, newest partition first
    pub async fn find_matching(
        &self,
        filter: &SearchFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<OrderRecord>> {
        let (clause, binds) = filter.to_sql()?;
        let sql = format!(
            "SELECT {} FROM orders WHERE {} ORDER BY date DESC, row_number ASC LIMIT ? OFFSET ?",
            SELECT_ORDER_COLUMNS.as_str(),
            clause
        );

        let mut query = sqlx::query(&sql);
        for value in &binds {
            query = query.bind(value.as_str());
        }
        let rows = query.bind(limit).bind(offset).fetch_all(&self.db).await?;

        rows.iter().map(record_from_row).collect()
    }
}
