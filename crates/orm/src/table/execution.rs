//! Statement lifecycle and terminal calls

use serde_json::Value;

use super::Table;
use crate::backends::{QueryOutcome, Row};
use crate::collection::Collection;
use crate::error::{ModelError, ModelResult};
use crate::model::Record;
use crate::query::QueryBuilder;

const AGGREGATE_ALIAS: &str = "aggregate";

impl Table {
    fn start(mut self, query: QueryBuilder) -> Self {
        self.query = Some(query);
        self.deferred = None;
        self
    }

    /// Start a SELECT of `<table>.*`
    pub fn create_select(self) -> Self {
        let name = self.name().to_string();
        self.start(QueryBuilder::new().select_from(&name).select(&format!("{}.*", name)))
    }

    pub fn create_insert(self) -> Self {
        let name = self.name().to_string();
        self.start(QueryBuilder::new().insert_into(&name))
    }

    pub fn create_update(self) -> Self {
        let name = self.name().to_string();
        self.start(QueryBuilder::new().update(&name))
    }

    pub fn create_delete(self) -> Self {
        let name = self.name().to_string();
        self.start(QueryBuilder::new().delete_from(&name))
    }

    /// Relations to attach on the next `all()`/`one()`; dotted names load
    /// nested relations
    pub fn with<I, S>(mut self, relations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for relation in relations {
            let relation = relation.into();
            if !self.with.contains(&relation) {
                self.with.push(relation);
            }
        }
        self
    }

    /// Override the eager-loading nesting budget for this query
    pub fn with_depth(mut self, depth: usize) -> Self {
        self.eager_depth = Some(depth);
        self
    }

    fn current_query(&self) -> ModelResult<&QueryBuilder> {
        if let Some(err) = &self.deferred {
            return Err(err.clone());
        }
        self.query.as_ref().ok_or_else(|| {
            ModelError::UnsupportedOperation(format!(
                "no query started on table '{}'; call create_select/create_insert/create_update/create_delete first",
                self.name()
            ))
        })
    }

    pub(crate) async fn execute(&self, query: &QueryBuilder) -> ModelResult<QueryOutcome> {
        let compiled = query.compile(&self.driver.sql_dialect());
        tracing::debug!("Executing query: {} ({} params)", compiled.sql, compiled.params.len());
        self.driver.run(&compiled).await
    }

    /// Run the current statement as is
    pub async fn run(&self) -> ModelResult<QueryOutcome> {
        let query = self.current_query()?;
        self.execute(query).await
    }

    /// Rows of the current query without hydration or eager loading
    pub async fn rows(&self) -> ModelResult<Vec<Row>> {
        Ok(self.run().await?.into_rows())
    }

    /// Records of the current query with requested relations attached
    pub async fn all(&self) -> ModelResult<Collection<Record>> {
        let rows = self.rows().await?;
        let mut records: Vec<Record> = rows.into_iter().map(|row| self.hydrate(row)).collect();

        if !self.with.is_empty() && !records.is_empty() {
            let depth = self
                .eager_depth
                .unwrap_or(self.manager.config().max_eager_depth);
            self.eager_load(records.iter_mut().collect(), &self.with, depth)
                .await?;
        }

        Ok(records.into())
    }

    /// First record of the current query
    pub async fn one(&self) -> ModelResult<Option<Record>> {
        let limited = self.clone().limit(1);
        Ok(limited.all().await?.into_iter().next())
    }

    /// Row count of the current query, ignoring limit, offset and ordering
    pub async fn count(&self) -> ModelResult<i64> {
        let query = self.current_query()?.clone().into_count(AGGREGATE_ALIAS);
        let rows = self.execute(&query).await?.into_rows();
        let count = rows
            .first()
            .and_then(|row| row.get(AGGREGATE_ALIAS))
            .map(|value| match value {
                Value::Number(n) => n.as_i64().unwrap_or_default(),
                Value::String(s) => s.parse().unwrap_or_default(),
                _ => 0,
            })
            .unwrap_or_default();
        Ok(count)
    }

    /// Records whose `column` equals `value`
    pub async fn find_all_by(&self, column: &str, value: impl Into<Value>) -> ModelResult<Collection<Record>> {
        self.detached().create_select().where_eq(column, value).all().await
    }

    /// First record whose `column` equals `value`
    pub async fn find_one_by(&self, column: &str, value: impl Into<Value>) -> ModelResult<Option<Record>> {
        self.detached().create_select().where_eq(column, value).one().await
    }

    pub async fn begin_transaction(&self) -> ModelResult<bool> {
        tracing::debug!("BEGIN on connection '{}'", self.connection);
        self.driver.begin_transaction().await
    }

    pub async fn commit(&self) -> ModelResult<bool> {
        tracing::debug!("COMMIT on connection '{}'", self.connection);
        self.driver.commit().await
    }

    pub async fn rollback(&self) -> ModelResult<bool> {
        tracing::debug!("ROLLBACK on connection '{}'", self.connection);
        self.driver.rollback().await
    }
}
