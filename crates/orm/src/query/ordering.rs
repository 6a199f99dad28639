//! Query Builder ORDER BY, GROUP BY, HAVING operations

use serde_json::Value;
use super::builder::QueryBuilder;
use super::types::*;

impl QueryBuilder {
    /// Add ORDER BY clause (ascending)
    pub fn order_by(mut self, column: &str) -> Self {
        self.order_by.push((column.to_string(), OrderDirection::Asc));
        self
    }

    /// Add ORDER BY clause (descending)
    pub fn order_by_desc(mut self, column: &str) -> Self {
        self.order_by.push((column.to_string(), OrderDirection::Desc));
        self
    }

    /// Add ORDER BY clause with an explicit direction
    pub fn order_by_direction(mut self, column: &str, direction: OrderDirection) -> Self {
        self.order_by.push((column.to_string(), direction));
        self
    }

    /// Add GROUP BY clause
    pub fn group_by(mut self, column: &str) -> Self {
        self.group_by.push(column.to_string());
        self
    }

    /// Add HAVING equality condition
    pub fn having_eq<T: Into<Value>>(mut self, column: &str, value: T) -> Self {
        self.having_conditions
            .push(WhereCondition::new(column, QueryOperator::Equal, Some(value.into())));
        self
    }

    /// Add HAVING condition with an explicit operator
    pub fn having<T: Into<Value>>(mut self, column: &str, operator: QueryOperator, value: T) -> Self {
        self.having_conditions
            .push(WhereCondition::new(column, operator, Some(value.into())));
        self
    }

    /// Add raw HAVING fragment
    pub fn having_raw(mut self, sql: &str, bindings: Vec<Value>) -> Self {
        self.having_conditions
            .push(WhereCondition::list(sql, QueryOperator::Raw, bindings));
        self
    }
}
