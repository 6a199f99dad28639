//! Core Database Driver Traits
//!
//! The ORM consumes a database through these traits only. A driver knows how
//! to run a statement and how to describe a table; everything else (SQL
//! building, hydration, relationships) happens above it.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::OrmResult;

/// One row as returned by a driver: column name to value, in select order
pub type Row = serde_json::Map<String, Value>;

/// Primary key column(s) of a table
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PrimaryKeyColumns(Vec<String>);

impl PrimaryKeyColumns {
    pub fn new(columns: Vec<String>) -> Self {
        Self(columns)
    }

    pub fn single(column: &str) -> Self {
        Self(vec![column.to_string()])
    }

    /// The key column when the key is not composite
    pub fn as_single(&self) -> Option<&str> {
        match self.0.as_slice() {
            [column] => Some(column.as_str()),
            _ => None,
        }
    }

    pub fn is_composite(&self) -> bool {
        self.0.len() > 1
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.0
    }

    pub fn contains(&self, column: &str) -> bool {
        self.0.iter().any(|c| c == column)
    }
}

/// Outcome of running a statement
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    /// Rows produced by a SELECT
    Rows(Vec<Row>),
    /// Rows touched by a write
    Affected(u64),
    /// Rows written by an INSERT, with the identifier the store generated
    /// for it on the same connection
    Inserted { affected: u64, last_insert_id: Value },
}

impl QueryOutcome {
    pub fn into_rows(self) -> Vec<Row> {
        match self {
            QueryOutcome::Rows(rows) => rows,
            QueryOutcome::Affected(_) | QueryOutcome::Inserted { .. } => Vec::new(),
        }
    }

    pub fn affected(&self) -> u64 {
        match self {
            QueryOutcome::Rows(rows) => rows.len() as u64,
            QueryOutcome::Affected(count) => *count,
            QueryOutcome::Inserted { affected, .. } => *affected,
        }
    }

    /// Generated identifier, when the driver reported one with the write
    pub fn last_insert_id(&self) -> Option<&Value> {
        match self {
            QueryOutcome::Inserted { last_insert_id, .. } => Some(last_insert_id),
            _ => None,
        }
    }
}

/// Compiled SQL plus its bound parameters
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub sql: String,
    pub params: Vec<Value>,
}

impl CompiledQuery {
    pub fn new(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }
}

/// SQL dialect enumeration for generating database-specific SQL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlDialect {
    PostgreSQL,
    MySQL,
    SQLite,
}

impl SqlDialect {
    /// Get the parameter placeholder style for this dialect
    pub fn parameter_placeholder(&self, index: usize) -> String {
        match self {
            SqlDialect::PostgreSQL => format!("${}", index + 1),
            SqlDialect::MySQL | SqlDialect::SQLite => "?".to_string(),
        }
    }
}

/// A statement prepared by a driver, ready to run with parameters
#[async_trait]
pub trait PreparedStatement: Send + Sync {
    /// SQL text the statement was prepared from
    fn sql(&self) -> &str;

    /// Run the statement with positional parameters
    async fn execute(&self, params: &[Value]) -> OrmResult<QueryOutcome>;
}

/// Abstract database driver
#[async_trait]
pub trait DatabaseDriver: Send + Sync {
    /// Check whether a table exists
    async fn table_exists(&self, table: &str) -> OrmResult<bool>;

    /// Column names of a table, in declaration order
    async fn column_names(&self, table: &str) -> OrmResult<Vec<String>>;

    /// Primary key column(s) of a table
    async fn primary_keys(&self, table: &str) -> OrmResult<PrimaryKeyColumns>;

    /// Prepare a statement
    async fn prepare(&self, sql: &str) -> OrmResult<Box<dyn PreparedStatement>>;

    /// Run a compiled query
    async fn run(&self, query: &CompiledQuery) -> OrmResult<QueryOutcome> {
        let statement = self.prepare(&query.sql).await?;
        statement.execute(&query.params).await
    }

    /// Identifier generated by the last insert on this connection
    ///
    /// Only consulted when `run` did not report the identifier itself with
    /// [`QueryOutcome::Inserted`]; drivers shared between tasks should.
    async fn last_insert_id(&self) -> OrmResult<Value>;

    /// Whether writes are permitted
    fn is_writable(&self) -> bool;

    /// Begin a transaction
    async fn begin_transaction(&self) -> OrmResult<bool>;

    /// Commit the current transaction
    async fn commit(&self) -> OrmResult<bool>;

    /// Roll back the current transaction
    async fn rollback(&self) -> OrmResult<bool>;

    /// Get the SQL dialect used by this driver
    fn sql_dialect(&self) -> SqlDialect;
}

/// Whether a statement produces a result set
pub fn returns_rows(sql: &str) -> bool {
    let head = sql
        .trim_start()
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_ascii_uppercase();
    matches!(head.as_str(), "SELECT" | "WITH" | "PRAGMA" | "VALUES")
}

/// Whether a statement is an INSERT
pub fn is_insert(sql: &str) -> bool {
    sql.trim_start()
        .get(..6)
        .map_or(false, |head| head.eq_ignore_ascii_case("INSERT"))
}
