//! Query Builder SQL generation

use serde_json::Value;

use super::builder::QueryBuilder;
use super::types::*;
use crate::backends::{CompiledQuery, SqlDialect};

/// Accumulates SQL text and bound parameters for one statement
struct SqlWriter<'d> {
    dialect: &'d SqlDialect,
    sql: String,
    params: Vec<Value>,
}

impl<'d> SqlWriter<'d> {
    fn new(dialect: &'d SqlDialect) -> Self {
        Self {
            dialect,
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push(&mut self, text: &str) {
        self.sql.push_str(text);
    }

    fn bind(&mut self, value: &Value) {
        let placeholder = self.dialect.parameter_placeholder(self.params.len());
        self.sql.push_str(&placeholder);
        self.params.push(value.clone());
    }

    /// Copy a raw fragment, turning each `?` into a placeholder for the next binding
    fn push_raw(&mut self, fragment: &str, bindings: &[Value]) {
        let mut bindings = bindings.iter();
        for ch in fragment.chars() {
            match (ch, bindings.len()) {
                ('?', n) if n > 0 => {
                    if let Some(value) = bindings.next() {
                        self.bind(value);
                    }
                }
                _ => self.sql.push(ch),
            }
        }
    }

    fn finish(self) -> CompiledQuery {
        CompiledQuery::new(self.sql, self.params)
    }
}

impl QueryBuilder {
    /// Compile the query for `dialect`, returning SQL and its parameters
    pub fn compile(&self, dialect: &SqlDialect) -> CompiledQuery {
        let mut writer = SqlWriter::new(dialect);
        match self.query_type {
            QueryType::Select => self.build_select_sql(&mut writer),
            QueryType::Insert => self.build_insert_sql(&mut writer),
            QueryType::Update => self.build_update_sql(&mut writer),
            QueryType::Delete => self.build_delete_sql(&mut writer),
        }
        writer.finish()
    }

    /// Generate SQL with `?` placeholders and return parameters
    pub fn to_sql_with_params(&self) -> (String, Vec<Value>) {
        let compiled = self.compile(&SqlDialect::SQLite);
        (compiled.sql, compiled.params)
    }

    /// SQL text with `?` placeholders
    pub fn to_sql(&self) -> String {
        self.to_sql_with_params().0
    }

    fn table_name(&self) -> &str {
        self.table.as_deref().unwrap_or_default()
    }

    /// Build SELECT SQL with parameters
    fn build_select_sql(&self, w: &mut SqlWriter<'_>) {
        if self.distinct {
            w.push("SELECT DISTINCT ");
        } else {
            w.push("SELECT ");
        }

        if self.select_fields.is_empty() {
            w.push("*");
        } else {
            w.push(&self.select_fields.join(", "));
        }

        if let Some(source) = &self.source {
            w.push(" FROM (");
            source.build_select_sql(w);
            w.push(") AS counted");
        } else if let Some(table) = &self.table {
            w.push(" FROM ");
            w.push(table);
        }

        for join in &self.joins {
            w.push(&format!(" {} {}", join.join_type, join.table));
            if !join.on_conditions.is_empty() {
                let conditions: Vec<String> = join
                    .on_conditions
                    .iter()
                    .map(|(left, right)| format!("{} = {}", left, right))
                    .collect();
                w.push(" ON ");
                w.push(&conditions.join(" AND "));
            }
        }

        self.build_where_clause(w);

        if !self.group_by.is_empty() {
            w.push(&format!(" GROUP BY {}", self.group_by.join(", ")));
        }

        if !self.having_conditions.is_empty() {
            w.push(" HAVING ");
            build_conditions(w, &self.having_conditions);
        }

        self.build_order_limit_clause(w);
    }

    /// Build INSERT SQL with parameters
    fn build_insert_sql(&self, w: &mut SqlWriter<'_>) {
        w.push(&format!("INSERT INTO {}", self.table_name()));

        if self.set_clauses.is_empty() {
            w.push(" DEFAULT VALUES");
            return;
        }

        let columns: Vec<&str> = self.set_clauses.iter().map(|c| c.column.as_str()).collect();
        w.push(&format!(" ({}) VALUES (", columns.join(", ")));
        for (i, clause) in self.set_clauses.iter().enumerate() {
            if i > 0 {
                w.push(", ");
            }
            w.bind(&clause.value);
        }
        w.push(")");
    }

    /// Build UPDATE SQL with parameters
    fn build_update_sql(&self, w: &mut SqlWriter<'_>) {
        w.push(&format!("UPDATE {}", self.table_name()));

        if !self.set_clauses.is_empty() {
            w.push(" SET ");
            for (i, clause) in self.set_clauses.iter().enumerate() {
                if i > 0 {
                    w.push(", ");
                }
                w.push(&format!("{} = ", clause.column));
                w.bind(&clause.value);
            }
        }

        self.build_where_clause(w);
    }

    /// Build DELETE SQL with parameters
    fn build_delete_sql(&self, w: &mut SqlWriter<'_>) {
        w.push(&format!("DELETE FROM {}", self.table_name()));
        self.build_where_clause(w);
    }

    /// Helper method to build WHERE clauses
    fn build_where_clause(&self, w: &mut SqlWriter<'_>) {
        if !self.where_conditions.is_empty() {
            w.push(" WHERE ");
            build_conditions(w, &self.where_conditions);
        }
    }

    /// Helper method to build ORDER BY and LIMIT clauses
    fn build_order_limit_clause(&self, w: &mut SqlWriter<'_>) {
        if !self.order_by.is_empty() {
            let order_clauses: Vec<String> = self
                .order_by
                .iter()
                .map(|(column, direction)| format!("{} {}", column, direction))
                .collect();
            w.push(" ORDER BY ");
            w.push(&order_clauses.join(", "));
        }

        if let Some(limit) = self.limit_count {
            w.push(&format!(" LIMIT {}", limit));
        }

        if let Some(offset) = self.offset_value {
            // SQLite only accepts OFFSET after a LIMIT
            if self.limit_count.is_none() && *w.dialect != SqlDialect::PostgreSQL {
                w.push(" LIMIT -1");
            }
            w.push(&format!(" OFFSET {}", offset));
        }
    }
}

fn build_conditions(w: &mut SqlWriter<'_>, conditions: &[WhereCondition]) {
    for (i, condition) in conditions.iter().enumerate() {
        if i > 0 {
            w.push(&format!(" {} ", condition.connector));
        }

        match condition.operator {
            QueryOperator::Raw => {
                w.push("(");
                w.push_raw(&condition.column, &condition.values);
                w.push(")");
            }
            // An empty list matches nothing (IN) or everything (NOT IN)
            QueryOperator::In if condition.values.is_empty() => w.push("1 = 0"),
            QueryOperator::NotIn if condition.values.is_empty() => w.push("1 = 1"),
            QueryOperator::In | QueryOperator::NotIn => {
                w.push(&format!("{} {} (", condition.column, condition.operator));
                for (j, value) in condition.values.iter().enumerate() {
                    if j > 0 {
                        w.push(", ");
                    }
                    w.bind(value);
                }
                w.push(")");
            }
            QueryOperator::Between => match condition.values.as_slice() {
                [start, end] => {
                    w.push(&format!("{} BETWEEN ", condition.column));
                    w.bind(start);
                    w.push(" AND ");
                    w.bind(end);
                }
                _ => w.push("1 = 0"),
            },
            QueryOperator::IsNull | QueryOperator::IsNotNull => {
                w.push(&format!("{} {}", condition.column, condition.operator));
            }
            _ => {
                w.push(&format!("{} {} ", condition.column, condition.operator));
                w.bind(condition.value.as_ref().unwrap_or(&Value::Null));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_select_with_conditions() {
        let query = QueryBuilder::new()
            .select_from("users")
            .select("users.*")
            .where_eq("project_id", 1)
            .where_gt("age", 18)
            .order_by_desc("name")
            .limit(10);

        let (sql, params) = query.to_sql_with_params();
        assert_eq!(
            sql,
            "SELECT users.* FROM users WHERE project_id = ? AND age > ? ORDER BY name DESC LIMIT 10"
        );
        assert_eq!(params, vec![json!(1), json!(18)]);
    }

    #[test]
    fn test_postgres_placeholders() {
        let query = QueryBuilder::new()
            .select_from("users")
            .where_in("id", vec![1, 2, 3])
            .where_raw("name LIKE ? OR email LIKE ?", vec![json!("a%"), json!("b%")]);

        let compiled = query.compile(&SqlDialect::PostgreSQL);
        assert_eq!(
            compiled.sql,
            "SELECT * FROM users WHERE id IN ($1, $2, $3) AND (name LIKE $4 OR email LIKE $5)"
        );
        assert_eq!(compiled.params.len(), 5);
    }

    #[test]
    fn test_empty_in_list() {
        let sql = QueryBuilder::new()
            .select_from("users")
            .where_in::<i64>("id", vec![])
            .to_sql();
        assert_eq!(sql, "SELECT * FROM users WHERE 1 = 0");

        let sql = QueryBuilder::new()
            .select_from("users")
            .where_not_in::<i64>("id", vec![])
            .to_sql();
        assert_eq!(sql, "SELECT * FROM users WHERE 1 = 1");
    }

    #[test]
    fn test_null_equality_becomes_is_null() {
        let sql = QueryBuilder::new()
            .select_from("users")
            .where_eq("project_id", Value::Null)
            .or_where_eq("name", "x")
            .to_sql();
        assert_eq!(sql, "SELECT * FROM users WHERE project_id IS NULL OR name = ?");
    }

    #[test]
    fn test_join_query() {
        let sql = QueryBuilder::new()
            .select_from("tags")
            .columns(["tags.*", "post_tag.post_id AS __pivot_key"])
            .join("post_tag", "post_tag.tag_id", "tags.id")
            .where_in("post_tag.post_id", vec![1, 2])
            .to_sql();
        assert_eq!(
            sql,
            "SELECT tags.*, post_tag.post_id AS __pivot_key FROM tags INNER JOIN post_tag ON post_tag.tag_id = tags.id WHERE post_tag.post_id IN (?, ?)"
        );
    }

    #[test]
    fn test_dml_statements() {
        let insert = QueryBuilder::new()
            .insert_into("users")
            .set("name", "alice")
            .set("project_id", 1)
            .to_sql_with_params();
        assert_eq!(insert.0, "INSERT INTO users (name, project_id) VALUES (?, ?)");
        assert_eq!(insert.1, vec![json!("alice"), json!(1)]);

        let update = QueryBuilder::new()
            .update("users")
            .set("name", "bob")
            .where_eq("id", 3)
            .to_sql();
        assert_eq!(update, "UPDATE users SET name = ? WHERE id = ?");

        let delete = QueryBuilder::new()
            .select_from("users")
            .where_eq("id", 3)
            .into_delete()
            .to_sql();
        assert_eq!(delete, "DELETE FROM users WHERE id = ?");
    }

    #[test]
    fn test_count_drops_paging() {
        let sql = QueryBuilder::new()
            .select_from("users")
            .select("users.*")
            .where_eq("project_id", 2)
            .order_by("name")
            .paginate(5, 2)
            .into_count("aggregate")
            .to_sql();
        assert_eq!(sql, "SELECT COUNT(*) AS aggregate FROM users WHERE project_id = ?");
    }

    #[test]
    fn test_count_wraps_distinct_and_grouped_queries() {
        let (sql, params) = QueryBuilder::new()
            .select_from("users")
            .columns(["project_id"])
            .where_gt("age", json!(18))
            .group_by("project_id")
            .order_by("project_id")
            .limit(2)
            .into_count("aggregate")
            .to_sql_with_params();
        assert_eq!(
            sql,
            "SELECT COUNT(*) AS aggregate FROM (SELECT project_id FROM users WHERE age > ? GROUP BY project_id) AS counted"
        );
        assert_eq!(params, vec![json!(18)]);

        let mut distinct = QueryBuilder::new().select_from("users").columns(["project_id"]);
        distinct.distinct = true;
        assert_eq!(
            distinct.into_count("aggregate").to_sql(),
            "SELECT COUNT(*) AS aggregate FROM (SELECT DISTINCT project_id FROM users) AS counted"
        );
    }

    #[test]
    fn test_offset_without_limit() {
        let sql = QueryBuilder::new().select_from("users").offset(3).to_sql();
        assert_eq!(sql, "SELECT * FROM users LIMIT -1 OFFSET 3");
    }
}
