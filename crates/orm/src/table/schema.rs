//! Table schema metadata
//!
//! Read once per (connection, table) through the driver and shared by every
//! clone of the table afterwards.

use std::collections::HashMap;

use serde_json::Value;

use crate::backends::{DatabaseDriver, PrimaryKeyColumns, Row};
use crate::error::{ModelError, ModelResult};
use crate::inflector::camel_case;

/// Finder shortcut resolved from a method name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shortcut {
    /// `find_all_by_<column>` / `findAllBy<Column>`
    FindAllBy(String),
    /// `find_one_by_<column>` / `findOneBy<Column>`
    FindOneBy(String),
}

#[derive(Debug)]
pub struct TableSchema {
    name: String,
    primary_key: PrimaryKeyColumns,
    columns: Vec<String>,
    blank_row: Row,
    shortcuts: HashMap<String, Shortcut>,
}

impl TableSchema {
    pub fn new(name: &str, primary_key: PrimaryKeyColumns, columns: Vec<String>) -> Self {
        let blank_row = columns
            .iter()
            .map(|column| (column.clone(), Value::Null))
            .collect();
        let shortcuts = shortcut_table(&columns);

        Self {
            name: name.to_string(),
            primary_key,
            columns,
            blank_row,
            shortcuts,
        }
    }

    /// Introspect `table` through the driver
    pub async fn load(driver: &dyn DatabaseDriver, table: &str) -> ModelResult<Self> {
        if !driver.table_exists(table).await? {
            return Err(ModelError::TableNotFound {
                table: table.to_string(),
            });
        }

        let columns = driver.column_names(table).await?;
        let primary_key = driver.primary_keys(table).await?;

        tracing::debug!(
            "Loaded schema for '{}': {} columns, primary key {:?}",
            table,
            columns.len(),
            primary_key.columns()
        );

        Ok(Self::new(table, primary_key, columns))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn primary_key(&self) -> &PrimaryKeyColumns {
        &self.primary_key
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.blank_row.contains_key(column)
    }

    /// Every column mapped to null
    pub fn blank_row(&self) -> &Row {
        &self.blank_row
    }

    pub fn shortcut(&self, method: &str) -> Option<&Shortcut> {
        self.shortcuts.get(method)
    }
}

/// Every finder name a column answers to
fn shortcut_table(columns: &[String]) -> HashMap<String, Shortcut> {
    let mut shortcuts = HashMap::new();
    for column in columns {
        let camel = camel_case(column);
        let mut pascal = String::with_capacity(camel.len());
        let mut chars = camel.chars();
        if let Some(first) = chars.next() {
            pascal.extend(first.to_uppercase());
            pascal.extend(chars);
        }

        shortcuts.insert(format!("find_all_by_{}", column), Shortcut::FindAllBy(column.clone()));
        shortcuts.insert(format!("findAllBy{}", pascal), Shortcut::FindAllBy(column.clone()));
        shortcuts.insert(format!("find_one_by_{}", column), Shortcut::FindOneBy(column.clone()));
        shortcuts.insert(format!("findOneBy{}", pascal), Shortcut::FindOneBy(column.clone()));
    }
    shortcuts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users() -> TableSchema {
        TableSchema::new(
            "users",
            PrimaryKeyColumns::single("id"),
            vec!["id".into(), "name".into(), "project_id".into()],
        )
    }

    #[test]
    fn test_blank_row_covers_columns() {
        let schema = users();
        assert_eq!(schema.blank_row().len(), 3);
        assert!(schema.blank_row().values().all(Value::is_null));
        assert!(schema.has_column("project_id"));
        assert!(!schema.has_column("email"));
    }

    #[test]
    fn test_shortcut_names() {
        let schema = users();
        assert_eq!(
            schema.shortcut("findAllByProjectId"),
            Some(&Shortcut::FindAllBy("project_id".into()))
        );
        assert_eq!(
            schema.shortcut("find_one_by_name"),
            Some(&Shortcut::FindOneBy("name".into()))
        );
        assert_eq!(schema.shortcut("findAllByEmail"), None);
        assert_eq!(schema.shortcut("explode"), None);
    }
}
