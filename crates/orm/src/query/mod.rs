//! Query Builder Module - fluent builder for the statements a table issues

pub mod builder;
pub mod dml;
pub mod joins;
pub mod ordering;
pub mod pagination;
pub mod select;
pub mod sql_generation;
pub mod types;
pub mod where_clause;

pub use builder::QueryBuilder;
pub use types::{Connector, JoinType, OrderDirection, QueryOperator, QueryType, WhereCondition};
