//! Entity-level operations
//!
//! Blanket extension over every [`Entity`]: `Project::find(&manager)`,
//! `Project::find_one(&manager, 3)` and friends. Each call resolves the
//! entity's table through the manager it is given.

use serde_json::Value;

use super::core_trait::Entity;
use super::record::Record;
use crate::backends::Row;
use crate::collection::Collection;
use crate::error::{ModelError, ModelResult};
use crate::manager::TableManager;
use crate::table::{Shortcut, Table};

/// How [`ActiveRecord::find_one`] locates a row
#[derive(Debug, Clone)]
pub enum Lookup {
    /// Single-column primary key value
    Key(Value),
    /// Values for each primary key column, in key order
    Keys(Vec<Value>),
    /// Column equality conditions
    Conditions(Row),
}

impl From<Value> for Lookup {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => Lookup::Conditions(map),
            Value::Array(values) => Lookup::Keys(values),
            other => Lookup::Key(other),
        }
    }
}

impl From<i64> for Lookup {
    fn from(id: i64) -> Self {
        Lookup::Key(Value::from(id))
    }
}

impl From<i32> for Lookup {
    fn from(id: i32) -> Self {
        Lookup::Key(Value::from(id))
    }
}

impl From<&str> for Lookup {
    fn from(id: &str) -> Self {
        Lookup::Key(Value::from(id))
    }
}

impl From<Row> for Lookup {
    fn from(conditions: Row) -> Self {
        Lookup::Conditions(conditions)
    }
}

/// Result of a `find_all_by_*` / `find_one_by_*` call
#[derive(Debug, Clone)]
pub enum Found {
    All(Collection<Record>),
    One(Option<Record>),
}

impl Found {
    pub fn into_all(self) -> Collection<Record> {
        match self {
            Found::All(records) => records,
            Found::One(record) => record.into_iter().collect(),
        }
    }

    pub fn into_one(self) -> Option<Record> {
        match self {
            Found::All(records) => records.into_iter().next(),
            Found::One(record) => record,
        }
    }
}

/// Apply a lookup to a select on `table`
pub(crate) fn apply_lookup(table: Table, lookup: Lookup) -> ModelResult<Table> {
    match lookup {
        Lookup::Key(value) => {
            let column = table
                .primary_key()
                .as_single()
                .map(str::to_string)
                .ok_or_else(|| ModelError::MissingPrimaryKey {
                    table: table.name().to_string(),
                })?;
            Ok(table.where_eq(&column, value))
        }
        Lookup::Keys(values) => {
            let columns = table.primary_key().columns().to_vec();
            if columns.is_empty() || columns.len() != values.len() {
                return Err(ModelError::MissingPrimaryKey {
                    table: table.name().to_string(),
                });
            }
            Ok(columns
                .iter()
                .zip(values)
                .fold(table, |table, (column, value)| table.where_eq(column, value)))
        }
        Lookup::Conditions(conditions) => Ok(table.where_all(conditions)),
    }
}

/// Record-class operations available on every entity
#[allow(async_fn_in_trait)]
pub trait ActiveRecord: Entity + Sized {
    /// The entity's table, without a query started
    async fn table(manager: &TableManager) -> ModelResult<Table> {
        manager.create::<Self>(None).await
    }

    /// A select over the entity's table, ready for chaining
    async fn find(manager: &TableManager) -> ModelResult<Table> {
        Ok(Self::table(manager).await?.create_select())
    }

    /// First row matching a key or conditions
    async fn find_one(manager: &TableManager, lookup: impl Into<Lookup>) -> ModelResult<Option<Record>> {
        let table = Self::find(manager).await?;
        apply_lookup(table, lookup.into())?.one().await
    }

    /// First row matching `find`, or a new saved record built from
    /// `find` merged with `create`
    async fn find_or_create(manager: &TableManager, find: Row, create: Row) -> ModelResult<Record> {
        if let Some(record) = Self::find_one(manager, Lookup::Conditions(find.clone())).await? {
            return Ok(record);
        }

        let mut data = find;
        data.extend(create);
        let mut record = Self::from_array(manager, data).await?;
        record.save().await?;
        Ok(record)
    }

    /// Update every row matching `conditions` (all rows when `None`)
    async fn update_all(manager: &TableManager, values: Row, conditions: Option<Row>) -> ModelResult<u64> {
        Self::table(manager).await?.update_all(values, conditions).await
    }

    /// Delete every row matching `conditions` (all rows when `None`)
    async fn delete_all(manager: &TableManager, conditions: Option<Row>) -> ModelResult<u64> {
        Self::table(manager).await?.delete_all(conditions).await
    }

    /// Blank new record
    async fn create(manager: &TableManager) -> ModelResult<Record> {
        Ok(Record::new(&Self::table(manager).await?))
    }

    /// New record holding the recognized attributes of `data`
    async fn from_array(manager: &TableManager, data: Row) -> ModelResult<Record> {
        let mut record = Self::create(manager).await?;
        record.fill(data)?;
        Ok(record)
    }

    /// Records hydrated from a raw SQL query
    async fn from_query(manager: &TableManager, sql: &str, params: Vec<Value>) -> ModelResult<Collection<Record>> {
        Self::table(manager).await?.hydrate_query(sql, params).await
    }

    /// Dispatch a `find_all_by_<field>` / `findOneBy<Field>` style call
    async fn call(manager: &TableManager, method: &str, value: impl Into<Value>) -> ModelResult<Found> {
        let table = Self::table(manager).await?;
        match table.shortcut(method) {
            Some(Shortcut::FindAllBy(column)) => {
                Ok(Found::All(table.find_all_by(&column, value).await?))
            }
            Some(Shortcut::FindOneBy(column)) => {
                Ok(Found::One(table.find_one_by(&column, value).await?))
            }
            None => Err(ModelError::UnsupportedOperation(format!(
                "method {}::{} does not exist",
                Self::class_name(),
                method
            ))),
        }
    }
}

impl<E: Entity> ActiveRecord for E {}
