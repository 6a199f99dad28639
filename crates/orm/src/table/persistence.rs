//! Writes: save, delete, bulk update and delete

use std::fmt::Write;

use chrono::Utc;
use serde_json::Value;

use super::Table;
use crate::backends::Row;
use crate::error::{ModelError, ModelResult};
use crate::model::Record;
use crate::query::QueryBuilder;

impl Table {
    fn ensure_writable(&self) -> ModelResult<()> {
        if self.driver.is_writable() {
            Ok(())
        } else {
            Err(ModelError::NotWritable {
                table: self.name().to_string(),
            })
        }
    }

    fn timestamp(&self) -> ModelResult<String> {
        let format = &self.manager.config().timestamp_format;
        let mut stamp = String::new();
        write!(stamp, "{}", Utc::now().format(format)).map_err(|_| {
            ModelError::Configuration(format!("Invalid timestamp format '{}'", format))
        })?;
        Ok(stamp)
    }

    /// Insert a new record or update a stored one, returning the row as
    /// stored afterwards
    ///
    /// Only table columns are written. Inserts stamp the created column and
    /// skip null values so store defaults apply; updates stamp the updated
    /// column and are keyed by the record's primary key.
    pub async fn save(&self, record: &Record) -> ModelResult<Row> {
        self.ensure_writable()?;
        if record.is_new() {
            self.insert_record(record).await
        } else {
            self.update_record(record).await
        }
    }

    async fn insert_record(&self, record: &Record) -> ModelResult<Row> {
        let created_column = &self.manager.config().created_column;

        let mut values = Row::new();
        for column in self.column_names() {
            match record.column(column) {
                Some(value) if !value.is_null() => {
                    values.insert(column.clone(), value.clone());
                }
                _ => {}
            }
        }
        if self.has_column(created_column) {
            values.insert(created_column.clone(), Value::String(self.timestamp()?));
        }

        let query = QueryBuilder::new()
            .insert_into(self.name())
            .set_values(values.clone());
        let outcome = self.execute(&query).await?;

        let primary_key = self.primary_key();
        if primary_key.is_empty() {
            let mut row = record.row().clone();
            row.extend(values);
            return Ok(row);
        }

        let mut keys = Row::new();
        for column in primary_key.columns() {
            let value = match values.get(column) {
                Some(value) => value.clone(),
                None if !primary_key.is_composite() => match outcome.last_insert_id() {
                    Some(id) => id.clone(),
                    None => self.driver.last_insert_id().await?,
                },
                None => {
                    return Err(ModelError::MissingPrimaryKey {
                        table: self.name().to_string(),
                    })
                }
            };
            keys.insert(column.clone(), value);
        }

        self.reselect(&keys).await?.ok_or_else(|| ModelError::NotFound {
            table: self.name().to_string(),
        })
    }

    async fn update_record(&self, record: &Record) -> ModelResult<Row> {
        let keys = record.primary_key_values()?;
        let updated_column = &self.manager.config().updated_column;

        let mut query = QueryBuilder::new().update(self.name());
        for column in self.column_names() {
            if self.primary_key().contains(column) || column == updated_column {
                continue;
            }
            let value = record.column(column).cloned().unwrap_or(Value::Null);
            query = query.set(column, value);
        }
        if self.has_column(updated_column) {
            query = query.set(updated_column, self.timestamp()?);
        }
        let query = query.where_map(keys.clone());
        self.execute(&query).await?;

        self.reselect(&keys).await?.ok_or_else(|| ModelError::NotFound {
            table: self.name().to_string(),
        })
    }

    /// Stored row for the given primary key values
    pub async fn reselect(&self, keys: &Row) -> ModelResult<Option<Row>> {
        let query = QueryBuilder::new()
            .select_from(self.name())
            .select("*")
            .where_map(keys.clone())
            .limit(1);
        Ok(self.execute(&query).await?.into_rows().into_iter().next())
    }

    /// Delete a stored record by primary key
    pub async fn delete_record(&self, record: &Record) -> ModelResult<u64> {
        self.ensure_writable()?;
        let keys = record.primary_key_values()?;
        let query = QueryBuilder::new().delete_from(self.name()).where_map(keys);
        Ok(self.execute(&query).await?.affected())
    }

    /// Update every row matching `conditions` (all rows when `None`)
    pub async fn update_all(&self, values: Row, conditions: Option<Row>) -> ModelResult<u64> {
        self.ensure_writable()?;
        let mut query = QueryBuilder::new().update(self.name()).set_values(values);
        if let Some(conditions) = conditions {
            query = query.where_map(conditions);
        }
        Ok(self.execute(&query).await?.affected())
    }

    /// Delete every row matching `conditions` (all rows when `None`)
    pub async fn delete_all(&self, conditions: Option<Row>) -> ModelResult<u64> {
        self.ensure_writable()?;
        let mut query = QueryBuilder::new().delete_from(self.name());
        if let Some(conditions) = conditions {
            query = query.where_map(conditions);
        }
        Ok(self.execute(&query).await?.affected())
    }
}
