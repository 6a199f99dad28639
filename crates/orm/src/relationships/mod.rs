//! Relationships Module - declared relations, their queries and loaded values

pub mod belongs_to;
pub mod has_and_belongs_to_many;
pub mod has_many;
pub mod has_one;
pub mod relationship;
pub mod types;

pub use has_and_belongs_to_many::association_table_name;
pub use relationship::Relationship;
pub use types::{Association, Constraint, RelationDef, Related, RelationshipType, TargetEntity};
