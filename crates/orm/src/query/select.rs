//! Query Builder SELECT operations

use super::builder::QueryBuilder;
use super::types::QueryType;

impl QueryBuilder {
    /// Start a SELECT against `table`
    pub fn select_from(mut self, table: &str) -> Self {
        self.query_type = QueryType::Select;
        self.table = Some(table.to_string());
        self
    }

    /// Add SELECT fields to the query
    pub fn select(mut self, fields: &str) -> Self {
        if fields == "*" {
            self.select_fields.push("*".to_string());
        } else {
            self.select_fields.extend(
                fields
                    .split(',')
                    .map(|f| f.trim().to_string())
                    .filter(|f| !f.is_empty()),
            );
        }
        self
    }

    /// Replace the projection
    pub fn columns<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Add a raw projection expression, kept as written
    pub fn select_raw(mut self, expression: &str) -> Self {
        self.select_fields.push(expression.to_string());
        self
    }

    /// Add SELECT DISTINCT to the query
    pub fn select_distinct(mut self, fields: &str) -> Self {
        self.distinct = true;
        self.select(fields)
    }

    /// Set the FROM table
    pub fn from(mut self, table: &str) -> Self {
        self.table = Some(table.to_string());
        self
    }

    /// Add COUNT aggregate
    pub fn select_count(mut self, column: &str, alias: Option<&str>) -> Self {
        let select_expr = match alias {
            Some(alias) => format!("COUNT({}) AS {}", column, alias),
            None => format!("COUNT({})", column),
        };
        self.select_fields.push(select_expr);
        self
    }
}
