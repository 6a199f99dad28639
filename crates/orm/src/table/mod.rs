//! Table gateway
//!
//! A [`Table`] builds and runs SQL against one table, turns rows into
//! [`Record`]s and orchestrates eager loading. Tables are handed out by the
//! [`TableManager`] as cheap clones that share schema metadata and keep
//! their own query state.

mod eager;
mod execution;
mod forwarding;
mod persistence;
pub mod schema;

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

pub use schema::{Shortcut, TableSchema};

use crate::backends::{CompiledQuery, DatabaseDriver, PrimaryKeyColumns, Row};
use crate::collection::Collection;
use crate::error::ModelResult;
use crate::manager::TableManager;
use crate::model::{EntityMeta, Record};
use crate::query::QueryBuilder;

#[derive(Clone)]
pub struct Table {
    pub(crate) schema: Arc<TableSchema>,
    pub(crate) driver: Arc<dyn DatabaseDriver>,
    pub(crate) manager: TableManager,
    pub(crate) entity: Arc<EntityMeta>,
    pub(crate) connection: String,
    pub(crate) query: Option<QueryBuilder>,
    /// First forwarding misuse, reported by the next terminal call
    pub(crate) deferred: Option<crate::error::ModelError>,
    pub(crate) with: Vec<String>,
    pub(crate) eager_depth: Option<usize>,
}

impl Table {
    pub(crate) fn new(
        schema: Arc<TableSchema>,
        driver: Arc<dyn DatabaseDriver>,
        manager: TableManager,
        entity: Arc<EntityMeta>,
        connection: &str,
    ) -> Self {
        Self {
            schema,
            driver,
            manager,
            entity,
            connection: connection.to_string(),
            query: None,
            deferred: None,
            with: Vec::new(),
            eager_depth: None,
        }
    }

    /// Clone without query state
    pub fn detached(&self) -> Self {
        Self {
            query: None,
            deferred: None,
            with: Vec::new(),
            eager_depth: None,
            ..self.clone()
        }
    }

    pub fn name(&self) -> &str {
        self.schema.name()
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn primary_key(&self) -> &PrimaryKeyColumns {
        self.schema.primary_key()
    }

    pub fn column_names(&self) -> &[String] {
        self.schema.columns()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.schema.has_column(column)
    }

    pub fn entity(&self) -> &EntityMeta {
        &self.entity
    }

    pub fn manager(&self) -> &TableManager {
        &self.manager
    }

    pub fn connection(&self) -> &str {
        &self.connection
    }

    pub fn driver(&self) -> &Arc<dyn DatabaseDriver> {
        &self.driver
    }

    /// The current query, if one was started
    pub fn query(&self) -> Option<&QueryBuilder> {
        self.query.as_ref()
    }

    /// Relations requested for eager loading
    pub fn eager_relations(&self) -> &[String] {
        &self.with
    }

    /// Finder shortcut named by `method`
    pub fn shortcut(&self, method: &str) -> Option<Shortcut> {
        self.schema.shortcut(method).cloned()
    }

    /// Record for a stored row
    pub fn hydrate(&self, row: Row) -> Record {
        Record::from_row(self, row)
    }

    /// Records for the rows of a raw SQL query
    pub async fn hydrate_query(&self, sql: &str, params: Vec<Value>) -> ModelResult<Collection<Record>> {
        let query = CompiledQuery::new(sql, params);
        tracing::debug!("Executing raw query: {} ({} params)", query.sql, query.params.len());
        let rows = self.driver.run(&query).await?.into_rows();
        Ok(rows.into_iter().map(|row| self.hydrate(row)).collect())
    }
}

impl fmt::Debug for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table")
            .field("name", &self.schema.name())
            .field("class", &self.entity.class_name())
            .field("connection", &self.connection)
            .field("query", &self.query)
            .field("with", &self.with)
            .finish()
    }
}
