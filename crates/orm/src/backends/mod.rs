//! Database Driver Abstractions
//!
//! The driver seam consumed by the table gateway, plus the bundled SQLite
//! driver.

pub mod core;
pub mod sqlite;

// Re-export core traits and types
pub use core::*;
pub use sqlite::{SqliteDriver, SqliteStatement};
