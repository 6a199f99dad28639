//! Ordered, keyed container for query and relationship results
//!
//! A [`Collection`] keeps insertion order and addresses items either by
//! position or by a string key. Projection helpers return new collections
//! and leave the original untouched.

use std::collections::HashMap;
use std::fmt;

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::backends::Row;

/// Address of an item in a [`Collection`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Index(usize),
    Name(String),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Index(i) => write!(f, "{}", i),
            Key::Name(name) => write!(f, "{}", name),
        }
    }
}

impl From<usize> for Key {
    fn from(index: usize) -> Self {
        Key::Index(index)
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Key::Name(name.to_string())
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Key::Name(name)
    }
}

/// Items that expose named fields, used by the field-based projections
pub trait FieldAccess {
    fn field_value(&self, name: &str) -> Option<Value>;
}

impl FieldAccess for Row {
    fn field_value(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }
}

/// Text used when a value becomes a collection key: strings stay raw,
/// everything else uses its JSON form. Nulls have no key.
pub fn key_repr(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Collection<T> {
    entries: Vec<(Key, T)>,
    /// Key to position in `entries`
    positions: HashMap<Key, usize>,
    /// One past the highest positional key
    next_index: usize,
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            positions: HashMap::new(),
            next_index: 0,
        }
    }
}

impl<T> Collection<T> {
    pub fn new() -> Self {
        Self::default()
    }

    fn from_entries(entries: Vec<(Key, T)>) -> Self {
        let mut collection = Self {
            entries: Vec::with_capacity(entries.len()),
            positions: HashMap::with_capacity(entries.len()),
            next_index: 0,
        };
        for (key, item) in entries {
            collection.insert(key, item);
        }
        collection
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Item at a position or under a string key
    pub fn get(&self, key: impl Into<Key>) -> Option<&T> {
        let position = *self.positions.get(&key.into())?;
        self.entries.get(position).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, key: impl Into<Key>) -> Option<&mut T> {
        let position = *self.positions.get(&key.into())?;
        self.entries.get_mut(position).map(|(_, v)| v)
    }

    pub fn first(&self) -> Option<&T> {
        self.entries.first().map(|(_, v)| v)
    }

    pub fn last(&self) -> Option<&T> {
        self.entries.last().map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().map(|(_, v)| v)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.entries.iter_mut().map(|(_, v)| v)
    }

    /// Iterate `(key, item)` pairs in order
    pub fn entries(&self) -> impl Iterator<Item = (&Key, &T)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn keys(&self) -> Vec<Key> {
        self.entries.iter().map(|(k, _)| k.clone()).collect()
    }

    /// Append at the next free position
    pub fn push(&mut self, item: T) {
        self.insert(Key::Index(self.next_index), item);
    }

    /// Insert under a key, replacing any item already there
    pub fn insert(&mut self, key: impl Into<Key>, item: T) {
        let key = key.into();
        if let Some(&position) = self.positions.get(&key) {
            self.entries[position].1 = item;
            return;
        }
        if let Key::Index(index) = key {
            self.next_index = self.next_index.max(index + 1);
        }
        self.positions.insert(key.clone(), self.entries.len());
        self.entries.push((key, item));
    }

    /// Whether every key is positional
    pub fn is_list(&self) -> bool {
        self.entries.iter().all(|(k, _)| matches!(k, Key::Index(_)))
    }

    /// Apply `f` to each item, keeping keys
    pub fn map<U, F>(&self, mut f: F) -> Collection<U>
    where
        F: FnMut(&T) -> U,
    {
        Collection {
            entries: self.entries.iter().map(|(k, v)| (k.clone(), f(v))).collect(),
            positions: self.positions.clone(),
            next_index: self.next_index,
        }
    }

    /// Items matching `predicate`, renumbered from zero
    pub fn filter<F>(&self, mut predicate: F) -> Collection<T>
    where
        T: Clone,
        F: FnMut(&T) -> bool,
    {
        self.iter().filter(|item| predicate(item)).cloned().collect()
    }

    /// Bucket items by a computed key, preserving first-seen bucket order
    pub fn group_by<F>(&self, mut key_of: F) -> Collection<Collection<T>>
    where
        T: Clone,
        F: FnMut(&T) -> String,
    {
        let mut groups: Collection<Collection<T>> = Collection::new();
        for item in self.iter() {
            let key = Key::Name(key_of(item));
            match groups.get_mut(key.clone()) {
                Some(group) => group.push(item.clone()),
                None => {
                    let mut group = Collection::new();
                    group.push(item.clone());
                    groups.insert(key, group);
                }
            }
        }
        groups
    }

    /// Re-key items by a computed key; later items win on duplicates
    pub fn index_by<F>(&self, mut key_of: F) -> Collection<T>
    where
        T: Clone,
        F: FnMut(&T) -> String,
    {
        let mut indexed = Collection::new();
        for item in self.iter() {
            indexed.insert(key_of(item), item.clone());
        }
        indexed
    }

    pub fn values(&self) -> Vec<&T> {
        self.iter().collect()
    }

    pub fn to_vec(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.iter().cloned().collect()
    }

    pub fn into_vec(self) -> Vec<T> {
        self.entries.into_iter().map(|(_, v)| v).collect()
    }
}

impl<T: FieldAccess + Clone> Collection<T> {
    /// Group by the value of a field; items without the field go under ""
    pub fn group(&self, field: &str) -> Collection<Collection<T>> {
        self.group_by(|item| item.field_value(field).as_ref().and_then(key_repr).unwrap_or_default())
    }

    /// Key items by the value of a field
    pub fn index(&self, field: &str) -> Collection<T> {
        self.index_by(|item| item.field_value(field).as_ref().and_then(key_repr).unwrap_or_default())
    }

    /// Values of one field across all items, `Null` where absent
    pub fn field(&self, field: &str) -> Collection<Value> {
        self.map(|item| item.field_value(field).unwrap_or(Value::Null))
    }
}

impl<T> FromIterator<T> for Collection<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_entries(
            iter.into_iter()
                .enumerate()
                .map(|(i, v)| (Key::Index(i), v))
                .collect(),
        )
    }
}

impl<T> From<Vec<T>> for Collection<T> {
    fn from(items: Vec<T>) -> Self {
        items.into_iter().collect()
    }
}

fn take_value<T>(entry: (Key, T)) -> T {
    entry.1
}

fn ref_value<T>(entry: &(Key, T)) -> &T {
    &entry.1
}

impl<T> IntoIterator for Collection<T> {
    type Item = T;
    type IntoIter = std::iter::Map<std::vec::IntoIter<(Key, T)>, fn((Key, T)) -> T>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter().map(take_value as fn((Key, T)) -> T)
    }
}

impl<'a, T> IntoIterator for &'a Collection<T> {
    type Item = &'a T;
    type IntoIter = std::iter::Map<std::slice::Iter<'a, (Key, T)>, fn(&'a (Key, T)) -> &'a T>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter().map(ref_value as fn(&'a (Key, T)) -> &'a T)
    }
}

impl<T: Serialize> Serialize for Collection<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.is_list() {
            let mut seq = serializer.serialize_seq(Some(self.len()))?;
            for item in self.iter() {
                seq.serialize_element(item)?;
            }
            seq.end()
        } else {
            let mut map = serializer.serialize_map(Some(self.len()))?;
            for (key, item) in &self.entries {
                map.serialize_entry(&key.to_string(), item)?;
            }
            map.end()
        }
    }
}
