//! Automatic schema synchronization
//!
//! Tables are declared in code ([`TableSchema`]). On startup every table is
//! created if missing and columns added to a declaration since the database
//! was created are appended with `ALTER TABLE ADD COLUMN`. Type or
//! constraint drift cannot be fixed in place by SQLite and is only reported.

use crate::Result;
use sqlx::{Row, SqlitePool};
use tracing::{debug, info, warn};

/// Column definition with SQL constraints
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefinition {
    pub name: String,
    /// SQL type (e.g., "TEXT", "INTEGER")
    pub sql_type: String,
    pub not_null: bool,
    pub primary_key: bool,
    pub default_value: Option<String>,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
            not_null: false,
            primary_key: false,
            default_value: None,
        }
    }

    /// Mark column as PRIMARY KEY
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Mark column as NOT NULL
    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    /// Set DEFAULT value (raw SQL literal)
    pub fn default(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    fn to_sql(&self) -> String {
        let mut sql = format!("{} {}", self.name, self.sql_type);
        if self.primary_key {
            sql.push_str(" PRIMARY KEY");
        }
        if self.not_null {
            sql.push_str(" NOT NULL");
        }
        if let Some(default) = &self.default_value {
            sql.push_str(&format!(" DEFAULT {}", default));
        }
        sql
    }
}

/// Actual column from `PRAGMA table_info`
#[derive(Debug, Clone)]
pub struct ActualColumn {
    pub cid: i32,
    pub name: String,
    pub type_name: String,
    pub not_null: bool,
}

/// Drift between declared and actual schema
#[derive(Debug, Clone)]
pub enum SchemaDrift {
    MissingColumn {
        table: String,
        column: ColumnDefinition,
    },
    /// Requires a manual migration
    TypeMismatch {
        table: String,
        column: String,
        expected: String,
        actual: String,
    },
}

/// Declared schema of one table
pub trait TableSchema {
    fn table_name() -> &'static str;

    /// Expected columns, in creation order
    fn expected_columns() -> Vec<ColumnDefinition>;

    /// Table-level constraints (composite keys, foreign keys)
    fn table_constraints() -> Vec<String> {
        Vec::new()
    }

    /// `CREATE TABLE IF NOT EXISTS` statement for this table
    fn create_table_sql() -> String {
        let mut parts: Vec<String> = Self::expected_columns()
            .iter()
            .map(ColumnDefinition::to_sql)
            .collect();
        parts.extend(Self::table_constraints());

        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
            Self::table_name(),
            parts.join(",\n    ")
        )
    }
}

/// Read actual columns of a table, ordered by position
pub async fn introspect_table(pool: &SqlitePool, table_name: &str) -> Result<Vec<ActualColumn>> {
    let query = format!("PRAGMA table_info({})", table_name);
    let rows = sqlx::query(&query).fetch_all(pool).await?;

    let mut columns: Vec<ActualColumn> = rows
        .iter()
        .map(|row| ActualColumn {
            cid: row.get("cid"),
            name: row.get("name"),
            type_name: row.get("type"),
            not_null: row.get::<i32, _>("notnull") != 0,
        })
        .collect();

    columns.sort_by_key(|c| c.cid);
    Ok(columns)
}

/// Compare declared columns to the database
pub fn compare(
    table_name: &str,
    expected: &[ColumnDefinition],
    actual: &[ActualColumn],
) -> Vec<SchemaDrift> {
    let mut drift = Vec::new();

    for expected_col in expected {
        match actual.iter().find(|c| c.name == expected_col.name) {
            Some(actual_col) => {
                if !types_compatible(&expected_col.sql_type, &actual_col.type_name) {
                    drift.push(SchemaDrift::TypeMismatch {
                        table: table_name.to_string(),
                        column: expected_col.name.clone(),
                        expected: expected_col.sql_type.clone(),
                        actual: actual_col.type_name.clone(),
                    });
                }
            }
            None => drift.push(SchemaDrift::MissingColumn {
                table: table_name.to_string(),
                column: expected_col.clone(),
            }),
        }
    }

    drift
}

/// SQLite type affinity comparison
fn types_compatible(expected: &str, actual: &str) -> bool {
    let exp = expected.to_uppercase();
    let act = actual.to_uppercase();

    if exp == act {
        return true;
    }
    if exp.contains("INT") && act.contains("INT") {
        return true;
    }
    let texty = |t: &str| t.contains("TEXT") || t.contains("CHAR") || t.contains("CLOB");
    texty(&exp) && texty(&act)
}

/// Create the table if needed and add any missing columns
pub async fn sync_table<T: TableSchema>(pool: &SqlitePool) -> Result<()> {
    let table_name = T::table_name();

    sqlx::query(&T::create_table_sql()).execute(pool).await?;

    let actual = introspect_table(pool, table_name).await?;
    let drift = compare(table_name, &T::expected_columns(), &actual);

    if drift.is_empty() {
        debug!("Schema up to date for '{}'", table_name);
        return Ok(());
    }

    for change in drift {
        match change {
            SchemaDrift::MissingColumn { table, column } => {
                add_column(pool, &table, &column).await?;
            }
            SchemaDrift::TypeMismatch {
                table,
                column,
                expected,
                actual,
            } => {
                warn!(
                    "Type mismatch in {}.{}: expected '{}', found '{}'. Manual migration required.",
                    table, column, expected, actual
                );
            }
        }
    }

    Ok(())
}

async fn add_column(pool: &SqlitePool, table: &str, column: &ColumnDefinition) -> Result<()> {
    let mut sql = format!(
        "ALTER TABLE {} ADD COLUMN {} {}",
        table, column.name, column.sql_type
    );

    // SQLite only accepts NOT NULL on added columns together with a DEFAULT
    match (&column.default_value, column.not_null) {
        (Some(default), true) => sql.push_str(&format!(" NOT NULL DEFAULT {}", default)),
        (Some(default), false) => sql.push_str(&format!(" DEFAULT {}", default)),
        (None, true) => warn!(
            "Cannot add NOT NULL column {}.{} without DEFAULT value, column will be nullable",
            table, column.name
        ),
        (None, false) => {}
    }

    info!("Adding column: {}.{} ({})", table, column.name, column.sql_type);

    match sqlx::query(&sql).execute(pool).await {
        Ok(_) => Ok(()),
        Err(sqlx::Error::Database(db_err)) if db_err.message().contains("duplicate column") => {
            debug!("Column {}.{} already added", table, column.name);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
