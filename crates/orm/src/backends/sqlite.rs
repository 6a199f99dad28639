//! SQLite Driver Implementation
//!
//! A [`DatabaseDriver`] over a single sqlx SQLite connection. Statements run
//! one at a time behind an async mutex, so transactions opened with
//! `begin_transaction` cover every statement issued until commit/rollback.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Number, Value};
use sqlx::sqlite::{SqliteArguments, SqliteConnection, SqliteRow};
use sqlx::{Column, Connection, Executor, Row as SqlxRow, Sqlite, TypeInfo, ValueRef};
use tokio::sync::Mutex;

use super::core::*;
use crate::error::{OrmError, OrmResult};

type SqliteQuery<'q> = sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>;

/// SQLite driver backed by one sqlx connection
pub struct SqliteDriver {
    conn: Arc<Mutex<SqliteConnection>>,
    writable: bool,
}

impl SqliteDriver {
    /// Open a connection from a `sqlite:` URL
    pub async fn connect(url: &str) -> OrmResult<Self> {
        let conn = SqliteConnection::connect(url)
            .await
            .map_err(|e| OrmError::Database(format!("Failed to open SQLite database '{}': {}", url, e)))?;

        tracing::debug!("SQLite connection opened: {}", url);

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            writable: true,
        })
    }

    /// Open a private in-memory database
    pub async fn in_memory() -> OrmResult<Self> {
        Self::connect("sqlite::memory:").await
    }

    /// Report the store as read-only; writes through the ORM are refused
    pub fn read_only(mut self) -> Self {
        self.writable = false;
        self
    }

    /// Run a script of one or more statements without parameters
    pub async fn execute_script(&self, sql: &str) -> OrmResult<()> {
        let mut conn = self.conn.lock().await;
        (&mut *conn)
            .execute(sql)
            .await
            .map_err(|e| OrmError::Database(format!("Script execution failed: {}", e)))?;
        Ok(())
    }
}

#[async_trait]
impl DatabaseDriver for SqliteDriver {
    async fn table_exists(&self, table: &str) -> OrmResult<bool> {
        let mut conn = self.conn.lock().await;
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type IN ('table', 'view') AND name = ?",
        )
        .bind(table)
        .fetch_one(&mut *conn)
        .await?;
        Ok(count > 0)
    }

    async fn column_names(&self, table: &str) -> OrmResult<Vec<String>> {
        let mut conn = self.conn.lock().await;
        let names: Vec<String> = sqlx::query_scalar("SELECT name FROM pragma_table_info(?) ORDER BY cid")
            .bind(table)
            .fetch_all(&mut *conn)
            .await?;
        Ok(names)
    }

    async fn primary_keys(&self, table: &str) -> OrmResult<PrimaryKeyColumns> {
        let mut conn = self.conn.lock().await;
        let names: Vec<String> =
            sqlx::query_scalar("SELECT name FROM pragma_table_info(?) WHERE pk > 0 ORDER BY pk")
                .bind(table)
                .fetch_all(&mut *conn)
                .await?;
        Ok(PrimaryKeyColumns::new(names))
    }

    async fn prepare(&self, sql: &str) -> OrmResult<Box<dyn PreparedStatement>> {
        {
            let mut conn = self.conn.lock().await;
            (&mut *conn)
                .prepare(sql)
                .await
                .map_err(|e| OrmError::Database(format!("Failed to prepare '{}': {}", sql, e)))?;
        }

        Ok(Box::new(SqliteStatement {
            conn: Arc::clone(&self.conn),
            sql: sql.to_string(),
        }))
    }

    async fn last_insert_id(&self) -> OrmResult<Value> {
        let mut conn = self.conn.lock().await;
        let id: i64 = sqlx::query_scalar("SELECT last_insert_rowid()")
            .fetch_one(&mut *conn)
            .await?;
        Ok(Value::from(id))
    }

    fn is_writable(&self) -> bool {
        self.writable
    }

    async fn begin_transaction(&self) -> OrmResult<bool> {
        self.execute_script("BEGIN").await?;
        Ok(true)
    }

    async fn commit(&self) -> OrmResult<bool> {
        self.execute_script("COMMIT").await?;
        Ok(true)
    }

    async fn rollback(&self) -> OrmResult<bool> {
        self.execute_script("ROLLBACK").await?;
        Ok(true)
    }

    fn sql_dialect(&self) -> SqlDialect {
        SqlDialect::SQLite
    }
}

/// Statement prepared on a [`SqliteDriver`] connection
pub struct SqliteStatement {
    conn: Arc<Mutex<SqliteConnection>>,
    sql: String,
}

#[async_trait]
impl PreparedStatement for SqliteStatement {
    fn sql(&self) -> &str {
        &self.sql
    }

    async fn execute(&self, params: &[Value]) -> OrmResult<QueryOutcome> {
        let mut query = sqlx::query(&self.sql);
        for param in params {
            query = bind_json_value(query, param);
        }

        let mut conn = self.conn.lock().await;
        if returns_rows(&self.sql) {
            let rows = query
                .fetch_all(&mut *conn)
                .await
                .map_err(|e| OrmError::Database(format!("Query fetch failed: {}", e)))?;
            let rows = rows.iter().map(sqlite_row_to_map).collect::<OrmResult<Vec<_>>>()?;
            Ok(QueryOutcome::Rows(rows))
        } else {
            let result = query
                .execute(&mut *conn)
                .await
                .map_err(|e| OrmError::Database(format!("Query execution failed: {}", e)))?;
            if is_insert(&self.sql) {
                // read under the same lock so concurrent writers cannot interleave
                Ok(QueryOutcome::Inserted {
                    affected: result.rows_affected(),
                    last_insert_id: Value::from(result.last_insert_rowid()),
                })
            } else {
                Ok(QueryOutcome::Affected(result.rows_affected()))
            }
        }
    }
}

/// Bind a JSON value to a sqlx query
fn bind_json_value<'q>(query: SqliteQuery<'q>, value: &Value) -> SqliteQuery<'q> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                query.bind(i)
            } else if let Some(f) = n.as_f64() {
                query.bind(f)
            } else {
                query.bind(n.to_string())
            }
        }
        Value::String(s) => query.bind(s.clone()),
        // Nested structures are stored as their JSON text
        Value::Array(_) | Value::Object(_) => query.bind(value.to_string()),
    }
}

/// Convert a SQLite row to a column map
fn sqlite_row_to_map(row: &SqliteRow) -> OrmResult<Row> {
    let mut map = Row::new();
    for column in row.columns() {
        let value = sqlite_value_to_json(row, column.ordinal())?;
        map.insert(column.name().to_string(), value);
    }
    Ok(map)
}

/// Convert a SQLite column value to JSON
fn sqlite_value_to_json(row: &SqliteRow, index: usize) -> OrmResult<Value> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }
    let type_name = raw.type_info().name().to_ascii_uppercase();

    let decoded = match type_name.as_str() {
        "INTEGER" | "INT" | "BIGINT" | "INT8" => row.try_get::<i64, _>(index).map(Value::from),
        "REAL" | "FLOAT" | "DOUBLE" => row
            .try_get::<f64, _>(index)
            .map(|f| Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)),
        "BOOLEAN" => row.try_get::<bool, _>(index).map(Value::Bool),
        "BLOB" => row
            .try_get::<Vec<u8>, _>(index)
            .map(|bytes| Value::Array(bytes.into_iter().map(Value::from).collect())),
        "NUMERIC" => row
            .try_get::<i64, _>(index)
            .map(Value::from)
            .or_else(|_| row.try_get::<f64, _>(index).map(Value::from)),
        _ => row.try_get::<String, _>(index).map(Value::String),
    };

    match decoded {
        Ok(value) => Ok(value),
        // SQLite is dynamically typed; fall back to the text form
        Err(_) => row
            .try_get_unchecked::<String, _>(index)
            .map(Value::String)
            .map_err(|e| OrmError::Database(format!("Failed to decode column {} ({}): {}", index, type_name, e))),
    }
}
