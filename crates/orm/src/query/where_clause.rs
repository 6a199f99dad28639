//! Query Builder WHERE clause operations

use super::builder::QueryBuilder;
use super::types::*;
use serde_json::Value;

impl QueryBuilder {
    /// Add WHERE condition with equality
    pub fn where_eq<T>(mut self, column: &str, value: T) -> Self
    where
        T: Into<Value>,
    {
        let value = value.into();
        // `= NULL` never matches; compare nulls with IS NULL
        let condition = if value.is_null() {
            WhereCondition::new(column, QueryOperator::IsNull, None)
        } else {
            WhereCondition::new(column, QueryOperator::Equal, Some(value))
        };
        self.where_conditions.push(condition);
        self
    }

    /// Add WHERE condition with not equal
    pub fn where_ne<T: Into<Value>>(mut self, column: &str, value: T) -> Self {
        self.where_conditions
            .push(WhereCondition::new(column, QueryOperator::NotEqual, Some(value.into())));
        self
    }

    /// Add WHERE condition with greater than
    pub fn where_gt<T: Into<Value>>(mut self, column: &str, value: T) -> Self {
        self.where_conditions
            .push(WhereCondition::new(column, QueryOperator::GreaterThan, Some(value.into())));
        self
    }

    /// Add WHERE condition with greater than or equal
    pub fn where_gte<T: Into<Value>>(mut self, column: &str, value: T) -> Self {
        self.where_conditions.push(WhereCondition::new(
            column,
            QueryOperator::GreaterThanOrEqual,
            Some(value.into()),
        ));
        self
    }

    /// Add WHERE condition with less than
    pub fn where_lt<T: Into<Value>>(mut self, column: &str, value: T) -> Self {
        self.where_conditions
            .push(WhereCondition::new(column, QueryOperator::LessThan, Some(value.into())));
        self
    }

    /// Add WHERE condition with less than or equal
    pub fn where_lte<T: Into<Value>>(mut self, column: &str, value: T) -> Self {
        self.where_conditions.push(WhereCondition::new(
            column,
            QueryOperator::LessThanOrEqual,
            Some(value.into()),
        ));
        self
    }

    /// Add WHERE condition with an explicit operator; arrays with IN/NOT IN
    /// become lists and nulls with `=`/`!=` become IS [NOT] NULL
    pub fn where_condition<T: Into<Value>>(mut self, column: &str, operator: QueryOperator, value: T) -> Self {
        let value = value.into();
        let condition = match (operator, value) {
            (op @ (QueryOperator::In | QueryOperator::NotIn), Value::Array(values)) => {
                WhereCondition::list(column, op, values)
            }
            (QueryOperator::Equal, Value::Null) => WhereCondition::new(column, QueryOperator::IsNull, None),
            (QueryOperator::NotEqual, Value::Null) => {
                WhereCondition::new(column, QueryOperator::IsNotNull, None)
            }
            (op, value) => WhereCondition::new(column, op, Some(value)),
        };
        self.where_conditions.push(condition);
        self
    }

    /// Add WHERE condition with LIKE
    pub fn where_like(mut self, column: &str, pattern: &str) -> Self {
        self.where_conditions
            .push(WhereCondition::new(column, QueryOperator::Like, Some(Value::String(pattern.to_string()))));
        self
    }

    /// Add WHERE condition with NOT LIKE
    pub fn where_not_like(mut self, column: &str, pattern: &str) -> Self {
        self.where_conditions.push(WhereCondition::new(
            column,
            QueryOperator::NotLike,
            Some(Value::String(pattern.to_string())),
        ));
        self
    }

    /// Add WHERE condition with IN
    pub fn where_in<T: Into<Value>>(mut self, column: &str, values: Vec<T>) -> Self {
        self.where_conditions.push(WhereCondition::list(
            column,
            QueryOperator::In,
            values.into_iter().map(|v| v.into()).collect(),
        ));
        self
    }

    /// Add WHERE condition with NOT IN
    pub fn where_not_in<T: Into<Value>>(mut self, column: &str, values: Vec<T>) -> Self {
        self.where_conditions.push(WhereCondition::list(
            column,
            QueryOperator::NotIn,
            values.into_iter().map(|v| v.into()).collect(),
        ));
        self
    }

    /// Add WHERE condition with IS NULL
    pub fn where_null(mut self, column: &str) -> Self {
        self.where_conditions
            .push(WhereCondition::new(column, QueryOperator::IsNull, None));
        self
    }

    /// Add WHERE condition with IS NOT NULL
    pub fn where_not_null(mut self, column: &str) -> Self {
        self.where_conditions
            .push(WhereCondition::new(column, QueryOperator::IsNotNull, None));
        self
    }

    /// Add WHERE condition with BETWEEN
    pub fn where_between<T: Into<Value>>(mut self, column: &str, start: T, end: T) -> Self {
        self.where_conditions.push(WhereCondition::list(
            column,
            QueryOperator::Between,
            vec![start.into(), end.into()],
        ));
        self
    }

    /// Add a raw WHERE fragment; `?` marks each bound value
    pub fn where_raw(mut self, sql: &str, bindings: Vec<Value>) -> Self {
        self.where_conditions
            .push(WhereCondition::list(sql, QueryOperator::Raw, bindings));
        self
    }

    /// Add OR WHERE condition with equality
    pub fn or_where_eq<T: Into<Value>>(mut self, column: &str, value: T) -> Self {
        self = self.where_eq(column, value);
        self.connect_last_with_or();
        self
    }

    /// Add OR WHERE condition with an explicit operator
    pub fn or_where<T: Into<Value>>(mut self, column: &str, operator: QueryOperator, value: T) -> Self {
        self = self.where_condition(column, operator, value);
        self.connect_last_with_or();
        self
    }

    /// Add OR WHERE condition with IN
    pub fn or_where_in<T: Into<Value>>(mut self, column: &str, values: Vec<T>) -> Self {
        self = self.where_in(column, values);
        self.connect_last_with_or();
        self
    }

    /// Add OR raw WHERE fragment
    pub fn or_where_raw(mut self, sql: &str, bindings: Vec<Value>) -> Self {
        self = self.where_raw(sql, bindings);
        self.connect_last_with_or();
        self
    }

    /// Add one condition per entry: arrays become IN, everything else equality
    pub fn where_map(mut self, conditions: serde_json::Map<String, Value>) -> Self {
        for (column, value) in conditions {
            self = match value {
                Value::Array(values) => self.where_in(&column, values),
                other => self.where_eq(&column, other),
            };
        }
        self
    }

    /// Whether any WHERE condition has been added
    pub fn has_conditions(&self) -> bool {
        !self.where_conditions.is_empty()
    }

    fn connect_last_with_or(&mut self) {
        if let Some(last) = self.where_conditions.pop() {
            self.where_conditions.push(last.or());
        }
    }
}
