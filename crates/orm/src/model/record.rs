//! Record - one row with dynamic attribute semantics
//!
//! Reads resolve in a fixed order: declared relation or getter, then
//! column, then declared property. Writes resolve setter, then column, then
//! property. Anything else is an [`UnknownAttribute`] error naming the
//! entity class and the key.
//!
//! [`UnknownAttribute`]: crate::ModelError::UnknownAttribute

use std::collections::HashMap;

use serde_json::Value;

use super::core_trait::Entity;
use super::metadata::{Accessor, EntityMeta};
use crate::backends::Row;
use crate::collection::FieldAccess;
use crate::error::{ModelError, ModelResult};
use crate::inflector::snake_case;
use crate::relationships::{RelationDef, Related, Relationship, RelationshipType, TargetEntity};
use crate::table::Table;

#[derive(Debug, Clone)]
pub struct Record {
    pub(crate) table: Table,
    pub(crate) row: Row,
    pub(crate) properties: Row,
    pub(crate) is_new: bool,
    pub(crate) relations: HashMap<String, Related>,
    /// Relation names added to the JSON projection by loading
    pub(crate) serialize: Vec<String>,
}

impl Record {
    /// Blank record: every column null, properties at their defaults
    pub fn new(table: &Table) -> Self {
        let table = table.detached();
        Self {
            row: table.schema().blank_row().clone(),
            properties: table.entity().properties().clone(),
            table,
            is_new: true,
            relations: HashMap::new(),
            serialize: Vec::new(),
        }
    }

    /// Record read from storage; fields that are not columns become properties
    pub(crate) fn from_row(table: &Table, row: Row) -> Self {
        let mut record = Self::new(table);
        record.apply_row(row);
        record.is_new = false;
        record
    }

    pub(crate) fn apply_row(&mut self, row: Row) {
        for (key, value) in row {
            if self.row.contains_key(&key) {
                self.row.insert(key, value);
            } else {
                self.properties.insert(key, value);
            }
        }
    }

    /// Whether the record has not been persisted yet
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    /// Table this record is bound to
    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn entity(&self) -> &EntityMeta {
        self.table.entity()
    }

    pub fn class_name(&self) -> &str {
        self.table.entity().class_name()
    }

    /// Stored column values
    pub fn row(&self) -> &Row {
        &self.row
    }

    /// Raw column value, bypassing accessors
    pub fn column(&self, key: &str) -> Option<&Value> {
        self.row.get(key)
    }

    pub fn has_column(&self, key: &str) -> bool {
        self.row.contains_key(key)
    }

    /// Value of a single-column primary key
    pub fn key(&self) -> Option<&Value> {
        self.table
            .primary_key()
            .as_single()
            .and_then(|column| self.row.get(column))
            .filter(|value| !value.is_null())
    }

    /// Primary key column values; fails if any is missing
    pub fn primary_key_values(&self) -> ModelResult<Row> {
        let primary_key = self.table.primary_key();
        if primary_key.is_empty() {
            return Err(ModelError::MissingPrimaryKey {
                table: self.table.name().to_string(),
            });
        }

        let mut keys = Row::new();
        for column in primary_key.columns() {
            match self.row.get(column) {
                Some(value) if !value.is_null() => {
                    keys.insert(column.clone(), value.clone());
                }
                _ => {
                    return Err(ModelError::MissingPrimaryKey {
                        table: self.table.name().to_string(),
                    })
                }
            }
        }
        Ok(keys)
    }

    /// Read an attribute, fetching and caching a relation on first access
    pub async fn get(&mut self, key: &str) -> ModelResult<Value> {
        match self.table.entity().resolve_reader(key) {
            Some(Accessor::Relation(name)) => self.related(&name).await?.to_value(),
            Some(Accessor::Getter(name)) => self.call_getter(&name),
            None => self.stored(key),
        }
    }

    /// Read an attribute without touching the database
    ///
    /// A relation that has not been loaded yet is an error here; use
    /// [`get`](Self::get) or [`related`](Self::related) to fetch it.
    pub fn value(&self, key: &str) -> ModelResult<Value> {
        match self.table.entity().resolve_reader(key) {
            Some(Accessor::Relation(name)) => match self.relations.get(&name) {
                Some(related) => related.to_value(),
                None => Err(ModelError::UnsupportedOperation(format!(
                    "relation '{}' on {} is not loaded",
                    name,
                    self.class_name()
                ))),
            },
            Some(Accessor::Getter(name)) => self.call_getter(&name),
            None => self.stored(key),
        }
    }

    fn stored(&self, key: &str) -> ModelResult<Value> {
        self.row
            .get(key)
            .or_else(|| self.properties.get(key))
            .cloned()
            .ok_or_else(|| ModelError::unknown_attribute(self.class_name(), key))
    }

    pub(crate) fn call_getter(&self, name: &str) -> ModelResult<Value> {
        match self.table.entity().getter(name) {
            Some(getter) => getter(self),
            None => Err(ModelError::unknown_attribute(self.class_name(), name)),
        }
    }

    /// Write an attribute through its setter, or store it as a column or property
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> ModelResult<()> {
        let value = value.into();
        if let Some(name) = self.table.entity().resolve_writer(key) {
            if let Some(setter) = self.table.entity().setter(&name) {
                return setter(self, value);
            }
        }

        if self.row.contains_key(key) {
            self.row.insert(key.to_string(), value);
            Ok(())
        } else if self.properties.contains_key(key) {
            self.properties.insert(key.to_string(), value);
            Ok(())
        } else {
            Err(ModelError::unknown_attribute(self.class_name(), key))
        }
    }

    /// Store a column value without running setters
    pub fn set_column(&mut self, key: &str, value: impl Into<Value>) -> ModelResult<()> {
        if !self.row.contains_key(key) {
            return Err(ModelError::unknown_attribute(self.class_name(), key));
        }
        self.row.insert(key.to_string(), value.into());
        Ok(())
    }

    /// Columns and declared properties
    pub fn attributes(&self) -> Row {
        let mut attributes = self.row.clone();
        for (key, value) in &self.properties {
            attributes.entry(key.clone()).or_insert_with(|| value.clone());
        }
        attributes
    }

    /// Apply every recognized attribute in `data`, ignoring the rest
    pub fn fill(&mut self, data: Row) -> ModelResult<&mut Self> {
        for (key, value) in data {
            let known = self.row.contains_key(&key)
                || self.properties.contains_key(&key)
                || self.table.entity().resolve_writer(&key).is_some();
            if known {
                self.set(&key, value)?;
            }
        }
        Ok(self)
    }

    /// Insert or update, then refresh from the stored row
    pub async fn save(&mut self) -> ModelResult<()> {
        let row = self.table.save(self).await?;
        self.apply_row(row);
        self.is_new = false;
        // keys may have changed under cached relations
        self.relations.clear();
        Ok(())
    }

    /// Delete the stored row by primary key; the record itself is left as is
    pub async fn delete(&self) -> ModelResult<u64> {
        self.table.delete_record(self).await
    }

    /// Re-read the stored row
    pub async fn reload(&mut self) -> ModelResult<()> {
        let keys = self.primary_key_values()?;
        let row = self
            .table
            .reselect(&keys)
            .await?
            .ok_or_else(|| ModelError::NotFound {
                table: self.table.name().to_string(),
            })?;
        self.apply_row(row);
        self.relations.clear();
        Ok(())
    }

    /// Relationship for a declared relation, bound to this record's key
    pub async fn relation(&self, name: &str) -> ModelResult<Relationship> {
        let def = self
            .table
            .entity()
            .relation(name)
            .cloned()
            .ok_or_else(|| ModelError::UnknownRelation {
                class: self.class_name().to_string(),
                relation: name.to_string(),
            })?;
        self.relationship_for(&def).await
    }

    async fn relationship_for(&self, def: &RelationDef) -> ModelResult<Relationship> {
        let relationship = Relationship::build(def, &self.table).await?;
        let key = self
            .row
            .get(relationship.near_key())
            .or_else(|| self.properties.get(relationship.near_key()))
            .cloned()
            .unwrap_or(Value::Null);
        Ok(relationship.with_key(key))
    }

    /// Loaded value of a declared relation, fetching it on first access
    pub async fn related(&mut self, name: &str) -> ModelResult<&Related> {
        if !self.relations.contains_key(name) {
            let related = self.relation(name).await?.fetch().await?;
            self.relations.insert(name.to_string(), related);
        }
        self.relations
            .get(name)
            .ok_or_else(|| ModelError::UnknownRelation {
                class: self.class_name().to_string(),
                relation: name.to_string(),
            })
    }

    /// Loaded value of a relation, if present
    pub fn loaded(&self, name: &str) -> Option<&Related> {
        self.relations.get(name)
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.relations.contains_key(name)
    }

    /// Load several relations, dotted names loading nested ones
    pub async fn load(&mut self, names: &[&str]) -> ModelResult<()> {
        let names: Vec<String> = names.iter().map(|n| n.to_string()).collect();
        let table = self.table.clone();
        let depth = table.manager().config().max_eager_depth;
        table.eager_load(vec![self], &names, depth).await
    }

    /// Cache a relation value and include it in the JSON projection
    pub(crate) fn attach(&mut self, name: &str, related: Related) {
        self.relations.insert(name.to_string(), related);
        if !self.serialize.iter().any(|n| n == name) {
            self.serialize.push(name.to_string());
        }
    }

    /// Many-to-one relationship to `E`; keys inferred when `None`
    pub async fn belongs_to<E: Entity>(
        &self,
        foreign_key: Option<&str>,
        owner_key: Option<&str>,
    ) -> ModelResult<Relationship> {
        let def = ad_hoc::<E>(RelationshipType::BelongsTo, foreign_key, owner_key);
        self.relationship_for(&def).await
    }

    /// One-to-one relationship to `E`; keys inferred when `None`
    pub async fn has_one<E: Entity>(
        &self,
        foreign_key: Option<&str>,
        local_key: Option<&str>,
    ) -> ModelResult<Relationship> {
        let def = ad_hoc::<E>(RelationshipType::HasOne, foreign_key, local_key);
        self.relationship_for(&def).await
    }

    /// One-to-many relationship to `E`; keys inferred when `None`
    pub async fn has_many<E: Entity>(
        &self,
        foreign_key: Option<&str>,
        local_key: Option<&str>,
    ) -> ModelResult<Relationship> {
        let def = ad_hoc::<E>(RelationshipType::HasMany, foreign_key, local_key);
        self.relationship_for(&def).await
    }

    /// Many-to-many relationship to `E`; association table and its
    /// `(near, far)` columns inferred when `None`
    pub async fn has_and_belongs_to_many<E: Entity>(
        &self,
        association: Option<&str>,
        association_keys: Option<(&str, &str)>,
    ) -> ModelResult<Relationship> {
        let mut def = ad_hoc::<E>(RelationshipType::HasAndBelongsToMany, None, None);
        if let Some(table) = association {
            def.association(table);
        }
        if let Some((near, far)) = association_keys {
            def.association_keys(near, far);
        }
        self.relationship_for(&def).await
    }
}

fn ad_hoc<E: Entity>(
    relationship_type: RelationshipType,
    foreign_key: Option<&str>,
    owner_key: Option<&str>,
) -> RelationDef {
    let mut def = RelationDef::new(&snake_case(E::class_name()), relationship_type, TargetEntity::of::<E>());
    if let Some(column) = foreign_key {
        def.foreign_key(column);
    }
    if let Some(column) = owner_key {
        def.owner_key(column);
    }
    def
}

impl FieldAccess for Record {
    fn field_value(&self, name: &str) -> Option<Value> {
        self.value(name).ok()
    }
}
