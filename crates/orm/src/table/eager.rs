//! Eager loading
//!
//! One batched relationship query per relation name, whatever the number of
//! records. Dotted names (`users.posts`) load the nested relation on the
//! loaded records, one level of the depth budget per dot.

use serde_json::Value;

use super::Table;
use crate::collection::key_repr;
use crate::error::{ModelError, ModelResult};
use crate::model::{Accessor, Record};
use crate::relationships::{Related, Relationship};
use crate::BoxFuture;

/// Split relation paths into first segment and nested remainder, keeping
/// first-seen order
pub(crate) fn group_relation_paths(names: &[String]) -> Vec<(String, Vec<String>)> {
    let mut groups: Vec<(String, Vec<String>)> = Vec::new();
    for name in names {
        let (head, rest) = match name.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (name.as_str(), None),
        };
        let index = match groups.iter().position(|(h, _)| h == head) {
            Some(index) => index,
            None => {
                groups.push((head.to_string(), Vec::new()));
                groups.len() - 1
            }
        };
        if let Some(rest) = rest.filter(|r| !r.is_empty()) {
            let nested = &mut groups[index].1;
            if !nested.iter().any(|n| n == rest) {
                nested.push(rest.to_string());
            }
        }
    }
    groups
}

fn near_key_value(record: &Record, column: &str) -> Value {
    record
        .row
        .get(column)
        .or_else(|| record.properties.get(column))
        .cloned()
        .unwrap_or(Value::Null)
}

impl Table {
    /// Attach the named relations to `records`
    ///
    /// `depth` is the remaining nesting budget; at zero nothing is loaded.
    pub(crate) fn eager_load<'a>(
        &'a self,
        mut records: Vec<&'a mut Record>,
        names: &'a [String],
        depth: usize,
    ) -> BoxFuture<'a, ModelResult<()>> {
        Box::pin(async move {
            if records.is_empty() || names.is_empty() {
                return Ok(());
            }
            if depth == 0 {
                tracing::warn!(
                    "Eager loading depth exhausted on {}; skipping {:?}",
                    self.entity.class_name(),
                    names
                );
                return Ok(());
            }

            for (requested, nested) in group_relation_paths(names) {
                let name = match self.entity.resolve_reader(&requested) {
                    Some(Accessor::Relation(name)) => name,
                    _ => {
                        return Err(ModelError::UnknownRelation {
                            class: self.entity.class_name().to_string(),
                            relation: requested,
                        })
                    }
                };
                let def = self
                    .entity
                    .relation(&name)
                    .cloned()
                    .ok_or_else(|| ModelError::UnknownRelation {
                        class: self.entity.class_name().to_string(),
                        relation: name.clone(),
                    })?;

                let relationship = Relationship::build(&def, self).await?;
                let keys: Vec<Value> = records
                    .iter()
                    .map(|record| near_key_value(record, relationship.near_key()))
                    .collect();

                let mut found = relationship.find(&keys).await?;
                tracing::debug!(
                    "Eager loaded '{}' for {} {} records ({} keys)",
                    name,
                    records.len(),
                    self.entity.class_name(),
                    found.len()
                );

                if !nested.is_empty() {
                    let nested_records: Vec<&mut Record> =
                        found.values_mut().flat_map(Related::records_mut).collect();
                    relationship
                        .query()
                        .eager_load(nested_records, &nested, depth - 1)
                        .await?;
                }

                let empty = Related::empty(def.relationship_type);
                for record in records.iter_mut() {
                    let key = near_key_value(record, relationship.near_key());
                    let related = key_repr(&key)
                        .and_then(|k| found.get(&k))
                        .cloned()
                        .unwrap_or_else(|| empty.clone());
                    record.attach(&name, related);
                }
            }

            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_relation_paths() {
        let names: Vec<String> = ["users.posts", "users", "tags", "users.posts", "users.roles"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let groups = group_relation_paths(&names);
        assert_eq!(
            groups,
            vec![
                ("users".to_string(), vec!["posts".to_string(), "roles".to_string()]),
                ("tags".to_string(), vec![]),
            ]
        );
    }
}
