//! Relationship query wrapper
//!
//! A [`Relationship`] is a far-side query plus the columns that tie it to
//! the near side. `fetch` resolves one key; `find` resolves a batch of keys
//! with a single query and groups the rows per key.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use serde_json::Value;

use super::types::{Association, RelationDef, Related, RelationshipType};
use super::{belongs_to, has_and_belongs_to_many, has_many, has_one};
use crate::backends::PrimaryKeyColumns;
use crate::collection::{key_repr, Collection};
use crate::error::{ModelError, ModelResult};
use crate::table::Table;

/// Alias under which association rows report the near key
pub(crate) const PIVOT_KEY: &str = "__pivot_key";

/// What a variant needs to lay out its keys and query
pub(crate) struct RelationPlan<'a> {
    pub def: &'a RelationDef,
    pub near_class: &'a str,
    pub near_table: &'a str,
    pub near_primary_key: &'a PrimaryKeyColumns,
    pub far: Table,
}

impl RelationPlan<'_> {
    /// Single-column key of the near table, or the declared owner key
    pub fn near_owner_key(&self) -> ModelResult<String> {
        match &self.def.owner_key {
            Some(key) => Ok(key.clone()),
            None => single_key(self.near_primary_key, self.near_table, &self.def.name),
        }
    }

    /// Single-column key of the far table, or the declared owner key
    pub fn far_owner_key(&self) -> ModelResult<String> {
        match &self.def.owner_key {
            Some(key) => Ok(key.clone()),
            None => single_key(self.far.primary_key(), self.far.name(), &self.def.name),
        }
    }
}

fn single_key(primary_key: &PrimaryKeyColumns, table: &str, relation: &str) -> ModelResult<String> {
    primary_key.as_single().map(str::to_string).ok_or_else(|| {
        ModelError::Relationship(format!(
            "cannot infer keys for relation '{}': table '{}' needs a single-column primary key",
            relation, table
        ))
    })
}

/// Far-side query bound to near-side key columns
#[derive(Debug, Clone)]
pub struct Relationship {
    pub(crate) relationship_type: RelationshipType,
    pub(crate) query: Table,
    /// Column the far query filters on
    pub(crate) far_key: String,
    /// Column on the near record that supplies key values
    pub(crate) near_key: String,
    /// Field of each result row that names its group
    pub(crate) group_field: String,
    pub(crate) association: Option<Association>,
    pub(crate) key_value: Option<Value>,
}

impl Relationship {
    /// Resolve a declared relation against the near table
    pub async fn build(def: &RelationDef, near: &Table) -> ModelResult<Self> {
        let far = def.target.open_table(near.manager()).await?.create_select();
        let plan = RelationPlan {
            def,
            near_class: near.entity().class_name(),
            near_table: near.name(),
            near_primary_key: near.primary_key(),
            far,
        };

        let mut relationship = match def.relationship_type {
            RelationshipType::BelongsTo => belongs_to::plan(plan)?,
            RelationshipType::HasOne => has_one::plan(plan)?,
            RelationshipType::HasMany => has_many::plan(plan)?,
            RelationshipType::HasAndBelongsToMany => has_and_belongs_to_many::plan(plan)?,
        };

        if let Some(constraint) = &def.constraint {
            relationship.query = constraint(relationship.query);
        }

        tracing::debug!(
            "Relation '{}' on {}: {:?} {} via {} -> {}",
            def.name,
            near.name(),
            def.relationship_type,
            relationship.query.name(),
            relationship.near_key,
            relationship.far_key
        );

        Ok(relationship)
    }

    pub(crate) fn new(
        relationship_type: RelationshipType,
        query: Table,
        far_key: String,
        near_key: String,
        group_field: String,
    ) -> Self {
        Self {
            relationship_type,
            query,
            far_key,
            near_key,
            group_field,
            association: None,
            key_value: None,
        }
    }

    /// Bind the key value used by [`fetch`](Self::fetch)
    pub fn with_key(mut self, value: Value) -> Self {
        self.key_value = Some(value);
        self
    }

    pub fn relationship_type(&self) -> RelationshipType {
        self.relationship_type
    }

    pub fn near_key(&self) -> &str {
        &self.near_key
    }

    pub fn far_key(&self) -> &str {
        &self.far_key
    }

    pub fn group_field(&self) -> &str {
        &self.group_field
    }

    pub fn association(&self) -> Option<&Association> {
        self.association.as_ref()
    }

    pub fn key_value(&self) -> Option<&Value> {
        self.key_value.as_ref()
    }

    /// The far-side query
    pub fn query(&self) -> &Table {
        &self.query
    }

    /// Narrow the far-side query further
    pub fn constrain<F>(mut self, f: F) -> Self
    where
        F: FnOnce(Table) -> Table,
    {
        self.query = f(self.query);
        self
    }

    /// Related value for the bound key; a missing or null key yields the
    /// empty value without querying
    pub async fn fetch(&self) -> ModelResult<Related> {
        let key = match &self.key_value {
            Some(value) => value,
            None => return Ok(Related::empty(self.relationship_type)),
        };
        let Some(repr) = key_repr(key) else {
            return Ok(Related::empty(self.relationship_type));
        };

        let mut found = self.find(std::slice::from_ref(key)).await?;
        Ok(found
            .remove(&repr)
            .unwrap_or_else(|| Related::empty(self.relationship_type)))
    }

    /// Related values for many keys in one query, keyed by the key's text
    ///
    /// Every non-null key gets a slot. Singular relations keep the first
    /// row seen for a key.
    pub async fn find(&self, keys: &[Value]) -> ModelResult<HashMap<String, Related>> {
        let mut reprs: Vec<String> = Vec::new();
        let mut values: Vec<Value> = Vec::new();
        for key in keys {
            if let Some(repr) = key_repr(key) {
                if !reprs.contains(&repr) {
                    reprs.push(repr);
                    values.push(key.clone());
                }
            }
        }

        let mut grouped: HashMap<String, Related> = HashMap::with_capacity(reprs.len());
        if values.is_empty() {
            return Ok(grouped);
        }

        let rows = self
            .query
            .clone()
            .where_in(&self.far_key, values)
            .rows()
            .await?;

        for mut row in rows {
            let group = if self.association.is_some() {
                row.remove(PIVOT_KEY)
            } else {
                row.get(&self.group_field).cloned()
            };
            let Some(group) = group.as_ref().and_then(key_repr) else {
                continue;
            };

            let record = self.query.hydrate(row);
            match grouped.entry(group) {
                Entry::Occupied(mut entry) => {
                    if let Related::Many(records) = entry.get_mut() {
                        records.push(record);
                    }
                }
                Entry::Vacant(entry) => {
                    let related = if self.relationship_type.is_collection() {
                        Related::Many(Collection::from(vec![record]))
                    } else {
                        Related::One(Some(Box::new(record)))
                    };
                    entry.insert(related);
                }
            }
        }

        for repr in reprs {
            grouped
                .entry(repr)
                .or_insert_with(|| Related::empty(self.relationship_type));
        }

        Ok(grouped)
    }
}
