//! Table schema definitions
//!
//! Single source of truth for the `fingerprints` and `orders` tables. The
//! `orders` columns for declared fields are generated from
//! [`OrderField::ALL`], so adding a field to the dictionary adds the column
//! on the next startup.

use crate::db::schema_sync::{sync_table, ColumnDefinition, TableSchema};
use crate::db::transaction::customer_search;
use crate::fields::{FieldKind, OrderField};
use crate::Result;
use sqlx::SqlitePool;

/// One row per partition: content hash plus derived essentials
pub struct FingerprintsTableSchema;

impl TableSchema for FingerprintsTableSchema {
    fn table_name() -> &'static str {
        "fingerprints"
    }

    fn expected_columns() -> Vec<ColumnDefinition> {
        vec![
            ColumnDefinition::new("date", "TEXT").primary_key(),
            ColumnDefinition::new("hash", "TEXT").not_null().default("''"),
            // JSON object token -> count
            ColumnDefinition::new("words", "TEXT"),
            // JSON object phrase -> count
            ColumnDefinition::new("phrases", "TEXT"),
            ColumnDefinition::new("updated_at", "TIMESTAMP")
                .not_null()
                .default("CURRENT_TIMESTAMP"),
        ]
    }
}

/// Normalized order rows
pub struct OrdersTableSchema;

impl TableSchema for OrdersTableSchema {
    fn table_name() -> &'static str {
        "orders"
    }

    fn expected_columns() -> Vec<ColumnDefinition> {
        let mut columns = vec![
            ColumnDefinition::new("date", "TEXT").not_null(),
            ColumnDefinition::new("row_number", "INTEGER").not_null(),
            ColumnDefinition::new("search", "TEXT").not_null().default("''"),
            // Upper-cased customer_link
            ColumnDefinition::new("customer_search", "TEXT").not_null().default("''"),
            ColumnDefinition::new("is_merged", "INTEGER").not_null().default("0"),
            ColumnDefinition::new("order_link", "TEXT").not_null().default("''"),
        ];

        columns.extend(OrderField::ALL.iter().map(|field| match field.kind() {
            FieldKind::Text => ColumnDefinition::new(field.column(), "TEXT")
                .not_null()
                .default("''"),
            FieldKind::Integer => ColumnDefinition::new(field.column(), "INTEGER")
                .not_null()
                .default("0"),
        }));

        columns
    }

    fn table_constraints() -> Vec<String> {
        vec![
            "PRIMARY KEY (date, row_number)".to_string(),
            "FOREIGN KEY (date) REFERENCES fingerprints(date) ON DELETE CASCADE".to_string(),
        ]
    }
}

/// Create and synchronize every table
pub async fn sync_all_table_schemas(pool: &SqlitePool) -> Result<()> {
    sync_table::<FingerprintsTableSchema>(pool).await?;
    sync_table::<OrdersTableSchema>(pool).await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_orders_date ON orders(date)")
        .execute(pool)
        .await?;

    backfill_customer_search(pool).await?;

    Ok(())
}

/// Fill `customer_search` for rows stored before the column existed
async fn backfill_customer_search(pool: &SqlitePool) -> Result<()> {
    let rows: Vec<(String, i64, String)> = sqlx::query_as(
        "SELECT date, row_number, customer_link FROM orders \
         WHERE customer_search = '' AND customer_link <> ''",
    )
    .fetch_all(pool)
    .await?;

    if rows.is_empty() {
        return Ok(());
    }

    let mut tx = pool.begin().await?;
    for (date, row_number, customer_link) in &rows {
        sqlx::query("UPDATE orders SET customer_search = ? WHERE date = ? AND row_number = ?")
            .bind(customer_search(customer_link))
            .bind(date.as_str())
            .bind(*row_number)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;

    tracing::info!(rows = rows.len(), "Backfilled customer search column");
    Ok(())
}
