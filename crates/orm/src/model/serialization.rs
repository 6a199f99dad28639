//! JSON projection of records
//!
//! Start from the attributes, drop the hidden ones, then add every name on
//! the serialize lists back. A name on both lists is included.

use serde::{Serialize, Serializer};
use serde_json::Value;

use super::metadata::Accessor;
use super::record::Record;
use crate::error::ModelResult;

impl Record {
    /// Names whose values are forced into the projection
    fn serialize_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entity().serialize_list().to_vec();
        for name in &self.serialize {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        names
    }

    /// Projection of what is already materialized; unloaded relations on
    /// the serialize list are skipped
    pub fn projection(&self) -> ModelResult<Value> {
        let mut out = self.attributes();
        let hidden = self.entity().hidden();
        out.retain(|key, _| !hidden.contains(key));

        for name in self.serialize_names() {
            if out.contains_key(&name) {
                continue;
            }
            if let Some(related) = self.relations.get(&name) {
                out.insert(name, related.to_value()?);
                continue;
            }
            match self.entity().resolve_reader(&name) {
                Some(Accessor::Getter(getter)) => {
                    let value = self.call_getter(&getter)?;
                    out.insert(name, value);
                }
                Some(Accessor::Relation(relation)) => {
                    if let Some(related) = self.relations.get(&relation) {
                        out.insert(name, related.to_value()?);
                    }
                }
                None => {
                    if let Some(value) = self.row.get(&name).or_else(|| self.properties.get(&name)) {
                        out.insert(name, value.clone());
                    }
                }
            }
        }

        Ok(Value::Object(out))
    }

    /// Projection after fetching any relation on the serialize list that
    /// is not loaded yet
    pub async fn to_json(&mut self) -> ModelResult<Value> {
        for name in self.serialize_names() {
            if let Some(Accessor::Relation(relation)) = self.entity().resolve_reader(&name) {
                if !self.is_loaded(&relation) {
                    self.related(&relation).await?;
                }
            }
        }
        self.projection()
    }

    /// [`to_json`](Self::to_json) rendered as a string
    pub async fn to_json_string(&mut self) -> ModelResult<String> {
        let value = self.to_json().await?;
        Ok(serde_json::to_string(&value)?)
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.projection()
            .map_err(serde::ser::Error::custom)?
            .serialize(serializer)
    }
}
