//! Fluent calls forwarded to the current query
//!
//! Each call applies to the statement started by `create_*`. Calling one
//! before any statement exists records an unsupported-operation error that
//! the next terminal call (`one`, `all`, `count`, `run`, ...) returns.

use serde_json::Value;

use super::Table;
use crate::backends::Row;
use crate::error::ModelError;
use crate::query::{QueryBuilder, QueryOperator};

impl Table {
    fn forward<F>(mut self, method: &str, f: F) -> Self
    where
        F: FnOnce(QueryBuilder) -> QueryBuilder,
    {
        match self.query.take() {
            Some(query) => self.query = Some(f(query)),
            None => {
                if self.deferred.is_none() {
                    self.deferred = Some(ModelError::UnsupportedOperation(format!(
                        "{}() called on table '{}' before a query was started",
                        method,
                        self.name()
                    )));
                }
            }
        }
        self
    }

    /// Like `forward`, with a textual operator parsed first; an unknown
    /// operator is recorded as an error instead of being applied
    fn forward_op<F>(mut self, method: &str, operator: &str, f: F) -> Self
    where
        F: FnOnce(QueryBuilder, QueryOperator) -> QueryBuilder,
    {
        match QueryOperator::parse(operator) {
            Some(op) => self.forward(method, |q| f(q, op)),
            None => {
                if self.deferred.is_none() {
                    self.deferred = Some(ModelError::UnsupportedOperation(format!(
                        "{}() called on table '{}' with unknown operator '{}'",
                        method,
                        self.name(),
                        operator
                    )));
                }
                self
            }
        }
    }

    /// Replace the projection
    pub fn columns<I, S>(self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.forward("columns", |q| q.columns(fields))
    }

    /// Add projection fields, comma separated
    pub fn select(self, fields: &str) -> Self {
        self.forward("select", |q| q.select(fields))
    }

    pub fn distinct(self) -> Self {
        self.forward("distinct", |mut q| {
            q.distinct = true;
            q
        })
    }

    pub fn where_eq(self, column: &str, value: impl Into<Value>) -> Self {
        self.forward("where_eq", |q| q.where_eq(column, value))
    }

    /// Condition with a textual operator, e.g. `where_op("age", ">=", 18)`
    pub fn where_op(self, column: &str, operator: &str, value: impl Into<Value>) -> Self {
        self.forward_op("where_op", operator, |q, op| q.where_condition(column, op, value))
    }

    /// Alias of [`where_op`](Self::where_op)
    pub fn and_where(self, column: &str, operator: &str, value: impl Into<Value>) -> Self {
        self.forward_op("and_where", operator, |q, op| q.where_condition(column, op, value))
    }

    pub fn or_where(self, column: &str, operator: &str, value: impl Into<Value>) -> Self {
        self.forward_op("or_where", operator, |q, op| q.or_where(column, op, value))
    }

    /// Equality per entry; arrays become IN
    pub fn where_all(self, conditions: Row) -> Self {
        self.forward("where_all", |q| q.where_map(conditions))
    }

    pub fn where_ne(self, column: &str, value: impl Into<Value>) -> Self {
        self.forward("where_ne", |q| q.where_ne(column, value))
    }

    pub fn where_gt(self, column: &str, value: impl Into<Value>) -> Self {
        self.forward("where_gt", |q| q.where_gt(column, value))
    }

    pub fn where_gte(self, column: &str, value: impl Into<Value>) -> Self {
        self.forward("where_gte", |q| q.where_gte(column, value))
    }

    pub fn where_lt(self, column: &str, value: impl Into<Value>) -> Self {
        self.forward("where_lt", |q| q.where_lt(column, value))
    }

    pub fn where_lte(self, column: &str, value: impl Into<Value>) -> Self {
        self.forward("where_lte", |q| q.where_lte(column, value))
    }

    pub fn where_like(self, column: &str, pattern: &str) -> Self {
        self.forward("where_like", |q| q.where_like(column, pattern))
    }

    pub fn where_in<T: Into<Value>>(self, column: &str, values: Vec<T>) -> Self {
        self.forward("where_in", |q| q.where_in(column, values))
    }

    pub fn where_not_in<T: Into<Value>>(self, column: &str, values: Vec<T>) -> Self {
        self.forward("where_not_in", |q| q.where_not_in(column, values))
    }

    pub fn where_null(self, column: &str) -> Self {
        self.forward("where_null", |q| q.where_null(column))
    }

    pub fn where_not_null(self, column: &str) -> Self {
        self.forward("where_not_null", |q| q.where_not_null(column))
    }

    pub fn where_between(self, column: &str, start: impl Into<Value>, end: impl Into<Value>) -> Self {
        let (start, end) = (start.into(), end.into());
        self.forward("where_between", |q| q.where_between(column, start, end))
    }

    /// Raw condition; `?` marks each binding
    pub fn where_raw(self, sql: &str, bindings: Vec<Value>) -> Self {
        self.forward("where_raw", |q| q.where_raw(sql, bindings))
    }

    pub fn or_where_raw(self, sql: &str, bindings: Vec<Value>) -> Self {
        self.forward("or_where_raw", |q| q.or_where_raw(sql, bindings))
    }

    pub fn join(self, table: &str, left_col: &str, right_col: &str) -> Self {
        self.forward("join", |q| q.join(table, left_col, right_col))
    }

    pub fn left_join(self, table: &str, left_col: &str, right_col: &str) -> Self {
        self.forward("left_join", |q| q.left_join(table, left_col, right_col))
    }

    pub fn right_join(self, table: &str, left_col: &str, right_col: &str) -> Self {
        self.forward("right_join", |q| q.right_join(table, left_col, right_col))
    }

    pub fn group_by(self, column: &str) -> Self {
        self.forward("group_by", |q| q.group_by(column))
    }

    pub fn having(self, column: &str, operator: &str, value: impl Into<Value>) -> Self {
        self.forward_op("having", operator, |q, op| q.having(column, op, value))
    }

    pub fn order_by(self, column: &str) -> Self {
        self.forward("order_by", |q| q.order_by(column))
    }

    pub fn order_by_desc(self, column: &str) -> Self {
        self.forward("order_by_desc", |q| q.order_by_desc(column))
    }

    pub fn limit(self, count: i64) -> Self {
        self.forward("limit", |q| q.limit(count))
    }

    pub fn offset(self, count: i64) -> Self {
        self.forward("offset", |q| q.offset(count))
    }

    /// Column value for an insert or update
    pub fn set(self, column: &str, value: impl Into<Value>) -> Self {
        self.forward("set", |q| q.set(column, value))
    }

    pub fn set_values(self, values: Row) -> Self {
        self.forward("set_values", |q| q.set_values(values))
    }
}
