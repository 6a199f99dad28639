//! Query Builder - Core builder implementation

use super::types::*;

/// Query builder for constructing one SQL statement against one table
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    pub(crate) query_type: QueryType,
    pub(crate) table: Option<String>,
    pub(crate) select_fields: Vec<String>,
    pub(crate) set_clauses: Vec<SetClause>,
    pub(crate) where_conditions: Vec<WhereCondition>,
    pub(crate) joins: Vec<JoinClause>,
    pub(crate) order_by: Vec<(String, OrderDirection)>,
    pub(crate) group_by: Vec<String>,
    pub(crate) having_conditions: Vec<WhereCondition>,
    pub(crate) limit_count: Option<i64>,
    pub(crate) offset_value: Option<i64>,
    pub(crate) distinct: bool,
    /// Inner SELECT used as the FROM source instead of `table`
    pub(crate) source: Option<Box<QueryBuilder>>,
}

impl Default for QueryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryBuilder {
    /// Create a new query builder
    pub fn new() -> Self {
        Self {
            query_type: QueryType::Select,
            table: None,
            select_fields: Vec::new(),
            set_clauses: Vec::new(),
            where_conditions: Vec::new(),
            joins: Vec::new(),
            order_by: Vec::new(),
            group_by: Vec::new(),
            having_conditions: Vec::new(),
            limit_count: None,
            offset_value: None,
            distinct: false,
            source: None,
        }
    }

    /// Kind of statement being built
    pub fn query_type(&self) -> &QueryType {
        &self.query_type
    }

    /// Table the statement targets
    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    /// Current projection
    pub fn select_fields(&self) -> &[String] {
        &self.select_fields
    }

    pub fn limit_count(&self) -> Option<i64> {
        self.limit_count
    }

    pub fn offset_value(&self) -> Option<i64> {
        self.offset_value
    }

    /// Turn a SELECT into a row-count aggregate over the same filters
    ///
    /// DISTINCT and grouped queries are counted by wrapping them, so the
    /// count is of the rows they produce.
    pub fn into_count(mut self, alias: &str) -> Self {
        self.order_by.clear();
        self.limit_count = None;
        self.offset_value = None;
        let projection = vec![format!("COUNT(*) AS {}", alias)];

        if self.distinct || !self.group_by.is_empty() {
            let mut outer = QueryBuilder::new();
            outer.select_fields = projection;
            outer.source = Some(Box::new(self));
            return outer;
        }

        self.select_fields = projection;
        self
    }
}
