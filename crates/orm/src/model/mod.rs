//! Model Module - entity declarations and dynamic records
//!
//! - `core_trait`: the [`Entity`] trait implemented by record classes
//! - `metadata`: declarations and the per-entity accessor registry
//! - `record`: [`Record`], one row with attribute and relation access
//! - `serialization`: JSON projection of records
//! - `active_record`: entity-level finders and bulk writes

pub mod active_record;
pub mod core_trait;
pub mod metadata;
pub mod record;
pub mod serialization;

pub use active_record::{ActiveRecord, Found, Lookup};
pub use core_trait::Entity;
pub use metadata::{Accessor, EntityDecl, EntityMeta, Getter, Setter};
pub use record::Record;
