//! Entity metadata registry
//!
//! [`EntityDecl`] collects what an [`Entity`] declares; [`EntityMeta`] is the
//! frozen result, built once per entity type by the
//! [`TableManager`](crate::TableManager) and shared by every table and
//! record of that type. Attribute names are resolved to accessors once per
//! (entity, key) and cached.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;

use super::core_trait::Entity;
use super::record::Record;
use crate::backends::Row;
use crate::error::ModelResult;
use crate::inflector::{camel_case, infer_table_name, snake_case};
use crate::relationships::{RelationDef, RelationshipType, TargetEntity};

/// Computed attribute
pub type Getter = Arc<dyn Fn(&Record) -> ModelResult<Value> + Send + Sync>;

/// Attribute write hook; writes columns through [`Record::set_column`]
pub type Setter = Arc<dyn Fn(&mut Record, Value) -> ModelResult<()> + Send + Sync>;

/// What an attribute name resolved to on read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Accessor {
    Relation(String),
    Getter(String),
}

/// Declarations collected from [`Entity::declare`]
#[derive(Default)]
pub struct EntityDecl {
    getters: Vec<(String, Getter)>,
    setters: Vec<(String, Setter)>,
    relations: Vec<RelationDef>,
    properties: Vec<(String, Value)>,
    hidden: Vec<String>,
    serialize: Vec<String>,
}

impl EntityDecl {
    fn relation(&mut self, name: &str, relationship_type: RelationshipType, target: TargetEntity) -> &mut RelationDef {
        self.relations.retain(|r| r.name != name);
        self.relations.push(RelationDef::new(name, relationship_type, target));
        let last = self.relations.len() - 1;
        &mut self.relations[last]
    }

    /// Declare a many-to-one relation to `E`
    pub fn belongs_to<E: Entity>(&mut self, name: &str) -> &mut RelationDef {
        self.relation(name, RelationshipType::BelongsTo, TargetEntity::of::<E>())
    }

    /// Declare a one-to-one relation to `E`
    pub fn has_one<E: Entity>(&mut self, name: &str) -> &mut RelationDef {
        self.relation(name, RelationshipType::HasOne, TargetEntity::of::<E>())
    }

    /// Declare a one-to-many relation to `E`
    pub fn has_many<E: Entity>(&mut self, name: &str) -> &mut RelationDef {
        self.relation(name, RelationshipType::HasMany, TargetEntity::of::<E>())
    }

    /// Declare a many-to-many relation to `E` through an association table
    pub fn has_and_belongs_to_many<E: Entity>(&mut self, name: &str) -> &mut RelationDef {
        self.relation(name, RelationshipType::HasAndBelongsToMany, TargetEntity::of::<E>())
    }

    /// Declare a computed attribute
    pub fn getter<F>(&mut self, name: &str, getter: F) -> &mut Self
    where
        F: Fn(&Record) -> ModelResult<Value> + Send + Sync + 'static,
    {
        self.getters.push((name.to_string(), Arc::new(getter)));
        self
    }

    /// Declare a write hook for an attribute
    pub fn setter<F>(&mut self, name: &str, setter: F) -> &mut Self
    where
        F: Fn(&mut Record, Value) -> ModelResult<()> + Send + Sync + 'static,
    {
        self.setters.push((name.to_string(), Arc::new(setter)));
        self
    }

    /// Declare a non-column attribute with its initial value
    pub fn property(&mut self, name: &str, default: impl Into<Value>) -> &mut Self {
        self.properties.push((name.to_string(), default.into()));
        self
    }

    /// Attributes left out of the JSON projection
    pub fn hidden<I, S>(&mut self, names: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hidden.extend(names.into_iter().map(Into::into));
        self
    }

    /// Attributes, getters or relations always put in the JSON projection
    pub fn serialize<I, S>(&mut self, names: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.serialize.extend(names.into_iter().map(Into::into));
        self
    }
}

/// Frozen metadata of one entity type
pub struct EntityMeta {
    class_name: String,
    table_name: String,
    connection: Option<String>,
    getters: HashMap<String, Getter>,
    setters: HashMap<String, Setter>,
    relations: Vec<RelationDef>,
    properties: Row,
    hidden: Vec<String>,
    serialize: Vec<String>,
    readers: DashMap<String, Option<Accessor>>,
    writers: DashMap<String, Option<String>>,
}

impl EntityMeta {
    /// Collect the declarations of `E`
    pub fn of<E: Entity>() -> Self {
        let class_name = E::class_name();
        let table_name = E::table_name()
            .map(str::to_string)
            .unwrap_or_else(|| infer_table_name(class_name));

        let mut decl = EntityDecl::default();
        E::declare(&mut decl);

        tracing::debug!("Entity {} bound to table '{}'", class_name, table_name);
        Self::from_decl(class_name, table_name, E::connection().map(str::to_string), decl)
    }

    /// Metadata for a table with no entity bound
    pub fn anonymous(table_name: &str) -> Self {
        Self::from_decl(table_name, table_name.to_string(), None, EntityDecl::default())
    }

    fn from_decl(class_name: &str, table_name: String, connection: Option<String>, decl: EntityDecl) -> Self {
        Self {
            class_name: class_name.to_string(),
            table_name,
            connection,
            getters: decl.getters.into_iter().collect(),
            setters: decl.setters.into_iter().collect(),
            relations: decl.relations,
            properties: decl.properties.into_iter().collect(),
            hidden: decl.hidden,
            serialize: decl.serialize,
            readers: DashMap::new(),
            writers: DashMap::new(),
        }
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn connection(&self) -> Option<&str> {
        self.connection.as_deref()
    }

    pub fn relation(&self, name: &str) -> Option<&RelationDef> {
        self.relations.iter().find(|r| r.name == name)
    }

    pub fn relations(&self) -> &[RelationDef] {
        &self.relations
    }

    /// Declared properties with their initial values
    pub fn properties(&self) -> &Row {
        &self.properties
    }

    pub fn hidden(&self) -> &[String] {
        &self.hidden
    }

    pub fn serialize_list(&self) -> &[String] {
        &self.serialize
    }

    pub fn getter(&self, name: &str) -> Option<Getter> {
        self.getters.get(name).cloned()
    }

    pub fn setter(&self, name: &str) -> Option<Setter> {
        self.setters.get(name).cloned()
    }

    /// Accessor serving reads of `key`, trying the key as given, then its
    /// snake_case and camelCase spellings
    pub fn resolve_reader(&self, key: &str) -> Option<Accessor> {
        if let Some(resolved) = self.readers.get(key) {
            return resolved.clone();
        }

        let resolved = spellings(key).into_iter().find_map(|name| {
            if self.relation(&name).is_some() {
                Some(Accessor::Relation(name))
            } else if self.getters.contains_key(&name) {
                Some(Accessor::Getter(name))
            } else {
                None
            }
        });

        self.readers
            .entry(key.to_string())
            .or_insert(resolved)
            .clone()
    }

    /// Setter name serving writes of `key`
    pub fn resolve_writer(&self, key: &str) -> Option<String> {
        if let Some(resolved) = self.writers.get(key) {
            return resolved.clone();
        }

        let resolved = spellings(key)
            .into_iter()
            .find(|name| self.setters.contains_key(name));

        self.writers
            .entry(key.to_string())
            .or_insert(resolved)
            .clone()
    }
}

fn spellings(key: &str) -> Vec<String> {
    let mut names = vec![key.to_string()];
    for alt in [snake_case(key), camel_case(key)] {
        if !names.contains(&alt) {
            names.push(alt);
        }
    }
    names
}

impl fmt::Debug for EntityMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityMeta")
            .field("class_name", &self.class_name)
            .field("table_name", &self.table_name)
            .field("connection", &self.connection)
            .field("getters", &self.getters.keys().collect::<Vec<_>>())
            .field("setters", &self.setters.keys().collect::<Vec<_>>())
            .field("relations", &self.relations)
            .field("properties", &self.properties)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Project;
    struct UserGroup;

    impl Entity for Project {
        fn declare(decl: &mut EntityDecl) {
            decl.has_many::<UserGroup>("userGroups").foreign_key("owner_id");
            decl.getter("display_name", |_| Ok(json!("project")))
                .property("score", 0)
                .hidden(["secret"])
                .serialize(["userGroups"]);
        }
    }

    impl Entity for UserGroup {
        fn table_name() -> Option<&'static str> {
            Some("groups")
        }
    }

    #[test]
    fn test_metadata_from_declarations() {
        let meta = EntityMeta::of::<Project>();
        assert_eq!(meta.class_name(), "Project");
        assert_eq!(meta.table_name(), "projects");
        assert_eq!(meta.properties().get("score"), Some(&json!(0)));
        assert_eq!(meta.hidden(), ["secret".to_string()]);

        let relation = meta.relation("userGroups").unwrap();
        assert_eq!(relation.target.class_name, "UserGroup");
        assert_eq!(relation.foreign_key.as_deref(), Some("owner_id"));

        assert_eq!(EntityMeta::of::<UserGroup>().table_name(), "groups");
    }

    #[test]
    fn test_reader_resolution_tries_alternate_spellings() {
        let meta = EntityMeta::of::<Project>();
        assert_eq!(meta.resolve_reader("displayName"), Some(Accessor::Getter("display_name".into())));
        assert_eq!(meta.resolve_reader("user_groups"), Some(Accessor::Relation("userGroups".into())));
        assert_eq!(meta.resolve_reader("name"), None);
        // cached answer is stable
        assert_eq!(meta.resolve_reader("displayName"), Some(Accessor::Getter("display_name".into())));
    }
}
