//! # strata-orm: Active-Record persistence layer
//!
//! Entities declare their table and relationships; a [`TableManager`] hands
//! out [`Table`] gateways that build SQL, hydrate rows into [`Record`]s and
//! load relationships in batches.
//!
//! This crate provides the table manager, the table gateway, records with
//! dynamic attributes, four relationship kinds (belongs-to, has-one,
//! has-many, many-to-many) with batched eager loading, a keyed
//! [`Collection`], the SQL query builder and the driver seam with a bundled
//! SQLite driver.

use std::future::Future;
use std::pin::Pin;

pub mod backends;
pub mod collection;
pub mod config;
pub mod error;
pub mod inflector;
pub mod manager;
pub mod model;
pub mod query;
pub mod relationships;
pub mod table;

/// Boxed, sendable future used where async calls recurse or are stored
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

// Re-export core traits and types
pub use backends::{
    CompiledQuery, DatabaseDriver, PreparedStatement, PrimaryKeyColumns, QueryOutcome, Row,
    SqlDialect, SqliteDriver,
};
pub use collection::{Collection, FieldAccess, Key};
pub use config::{ConfigError, OrmConfig};
pub use error::*;
pub use manager::TableManager;
pub use model::*;
pub use query::*;
pub use relationships::{
    Association, Related, RelationDef, Relationship, RelationshipType, TargetEntity,
};
pub use table::{Shortcut, Table, TableSchema};
