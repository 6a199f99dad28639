//! Core Entity Trait - Base definition for record classes
//!
//! An entity is a marker type naming a table and declaring what its records
//! expose beyond plain columns: computed getters, setters, extra properties,
//! relations and serialization lists. Records themselves are dynamic
//! ([`Record`](super::Record)); the entity only describes them.

use super::metadata::EntityDecl;
use crate::inflector::short_type_name;

/// Core trait for record classes
pub trait Entity: Send + Sync + 'static {
    /// Short class name used for key and table inference
    fn class_name() -> &'static str {
        short_type_name(std::any::type_name::<Self>())
    }

    /// Explicit table name; inferred from the class name when `None`
    fn table_name() -> Option<&'static str> {
        None
    }

    /// Connection name; the manager's default when `None`
    fn connection() -> Option<&'static str> {
        None
    }

    /// Declare accessors, properties, relations and serialization lists
    fn declare(_decl: &mut EntityDecl) {}
}
