//! PostgreSQL driver.
//!
//! This module provides PostgreSQL-specific implementations:
//!
//! - [`PostgresDialect`]: SQL syntax strategy for PostgreSQL
//! - [`PostgresMigrationsSqlGenerator`]: migration operations to PostgreSQL DDL

mod dialect;
mod generator;

pub use dialect::PostgresDialect;
pub use generator::{is_system_column, ObjectKind, PostgresMigrationsSqlGenerator, SYSTEM_COLUMNS};
