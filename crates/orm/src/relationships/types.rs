//! Relationship Types - declarations and loaded values

use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::collection::Collection;
use crate::error::ModelResult;
use crate::manager::TableManager;
use crate::model::{Entity, Record};
use crate::table::Table;
use crate::BoxFuture;

/// Types of relationships between entities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationshipType {
    /// Many-to-one: the near row holds the foreign key
    BelongsTo,
    /// One-to-one: the far row holds the foreign key
    HasOne,
    /// One-to-many: far rows hold the foreign key
    HasMany,
    /// Many-to-many through an association table
    HasAndBelongsToMany,
}

impl RelationshipType {
    /// Returns true if this relationship returns a collection
    pub fn is_collection(self) -> bool {
        matches!(self, Self::HasMany | Self::HasAndBelongsToMany)
    }

    /// Returns true if this relationship requires an association table
    pub fn requires_association(self) -> bool {
        matches!(self, Self::HasAndBelongsToMany)
    }
}

/// Opens the table of a relation's far entity
pub type OpenTable = for<'a> fn(&'a TableManager) -> BoxFuture<'a, ModelResult<Table>>;

/// Constraint applied to a relation's far-side query
pub type Constraint = Arc<dyn Fn(Table) -> Table + Send + Sync>;

fn open_entity_table<E: Entity>(manager: &TableManager) -> BoxFuture<'_, ModelResult<Table>> {
    Box::pin(manager.create::<E>(None))
}

/// The far side of a relation with its concrete type erased
#[derive(Clone, Copy)]
pub struct TargetEntity {
    pub class_name: &'static str,
    pub type_id: TypeId,
    pub(crate) open: OpenTable,
}

impl TargetEntity {
    pub fn of<E: Entity>() -> Self {
        Self {
            class_name: E::class_name(),
            type_id: TypeId::of::<E>(),
            open: open_entity_table::<E>,
        }
    }

    pub(crate) async fn open_table(&self, manager: &TableManager) -> ModelResult<Table> {
        (self.open)(manager).await
    }
}

impl fmt::Debug for TargetEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetEntity")
            .field("class_name", &self.class_name)
            .finish()
    }
}

/// Association table joining both sides of a many-to-many relation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Association {
    pub table: String,
    /// Column referencing the near entity
    pub near_key: String,
    /// Column referencing the far entity
    pub far_key: String,
}

/// A relation declared on an entity
#[derive(Clone)]
pub struct RelationDef {
    pub name: String,
    pub relationship_type: RelationshipType,
    pub target: TargetEntity,
    pub foreign_key: Option<String>,
    pub owner_key: Option<String>,
    pub association_table: Option<String>,
    pub association_keys: Option<(String, String)>,
    pub(crate) constraint: Option<Constraint>,
}

impl RelationDef {
    pub fn new(name: &str, relationship_type: RelationshipType, target: TargetEntity) -> Self {
        Self {
            name: name.to_string(),
            relationship_type,
            target,
            foreign_key: None,
            owner_key: None,
            association_table: None,
            association_keys: None,
            constraint: None,
        }
    }

    /// Foreign key column: on the near table for belongs-to, on the far
    /// table for has-one/has-many
    pub fn foreign_key(&mut self, column: &str) -> &mut Self {
        self.foreign_key = Some(column.to_string());
        self
    }

    /// Column the foreign key points at
    pub fn owner_key(&mut self, column: &str) -> &mut Self {
        self.owner_key = Some(column.to_string());
        self
    }

    /// Alias of [`owner_key`](Self::owner_key) for has-one/has-many
    pub fn local_key(&mut self, column: &str) -> &mut Self {
        self.owner_key(column)
    }

    /// Association table name for many-to-many
    pub fn association(&mut self, table: &str) -> &mut Self {
        self.association_table = Some(table.to_string());
        self
    }

    /// Association columns referencing the near and far entities
    pub fn association_keys(&mut self, near_key: &str, far_key: &str) -> &mut Self {
        self.association_keys = Some((near_key.to_string(), far_key.to_string()));
        self
    }

    /// Narrow the far-side query, e.g. `|t| t.where_gt("age", 18)`
    pub fn constrain<F>(&mut self, constraint: F) -> &mut Self
    where
        F: Fn(Table) -> Table + Send + Sync + 'static,
    {
        self.constraint = Some(Arc::new(constraint));
        self
    }
}

impl fmt::Debug for RelationDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelationDef")
            .field("name", &self.name)
            .field("relationship_type", &self.relationship_type)
            .field("target", &self.target)
            .field("foreign_key", &self.foreign_key)
            .field("owner_key", &self.owner_key)
            .field("association_table", &self.association_table)
            .field("constrained", &self.constraint.is_some())
            .finish()
    }
}

/// Materialized value of a relation on one record
#[derive(Debug, Clone)]
pub enum Related {
    One(Option<Box<Record>>),
    Many(Collection<Record>),
}

impl Related {
    /// Value for a key with no related rows
    pub fn empty(relationship_type: RelationshipType) -> Self {
        if relationship_type.is_collection() {
            Related::Many(Collection::new())
        } else {
            Related::One(None)
        }
    }

    pub fn as_one(&self) -> Option<&Record> {
        match self {
            Related::One(record) => record.as_deref(),
            Related::Many(_) => None,
        }
    }

    pub fn as_many(&self) -> Option<&Collection<Record>> {
        match self {
            Related::Many(records) => Some(records),
            Related::One(_) => None,
        }
    }

    /// Number of related records
    pub fn len(&self) -> usize {
        match self {
            Related::One(record) => usize::from(record.is_some()),
            Related::Many(records) => records.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn records_mut(&mut self) -> Vec<&mut Record> {
        match self {
            Related::One(Some(record)) => vec![record.as_mut()],
            Related::One(None) => Vec::new(),
            Related::Many(records) => records.iter_mut().collect(),
        }
    }

    /// JSON projection of the materialized records
    pub fn to_value(&self) -> ModelResult<Value> {
        match self {
            Related::One(Some(record)) => record.projection(),
            Related::One(None) => Ok(Value::Null),
            Related::Many(records) => records
                .iter()
                .map(Record::projection)
                .collect::<ModelResult<Vec<_>>>()
                .map(Value::Array),
        }
    }
}

impl Serialize for Related {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Related::One(record) => record.serialize(serializer),
            Related::Many(records) => records.serialize(serializer),
        }
    }
}
