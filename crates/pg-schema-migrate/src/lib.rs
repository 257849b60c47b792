//! # pg-schema-migrate
//!
//! PostgreSQL migrations SQL generator.
//!
//! This library compiles engine-agnostic schema migration operations into
//! PostgreSQL DDL, with support for:
//!
//! - **Type mapping** from store type names and logical types, including
//!   sized (`varchar(20)`) and array (`_int4`, `text[]`) types
//! - **Serial columns** backed by owned sequences
//! - **Storage parameters and comments** carried as annotations
//! - **Database and extension management** outside transactions
//! - **Version-aware output** for older PostgreSQL servers
//!
//! ## Example
//!
//! ```rust
//! use pg_schema_migrate::core::operations::{MigrationOperation, SchemaOperation};
//! use pg_schema_migrate::{GeneratorConfig, MigrationsSqlGenerator, PostgresMigrationsSqlGenerator};
//!
//! let generator = PostgresMigrationsSqlGenerator::new(GeneratorConfig::default())?;
//! let commands = generator.generate(
//!     &[MigrationOperation::EnsureSchema(SchemaOperation {
//!         name: "reporting".to_string(),
//!     })],
//!     None,
//! )?;
//! assert_eq!(commands[0].command_text, "CREATE SCHEMA IF NOT EXISTS \"reporting\";\n");
//! # Ok::<(), pg_schema_migrate::MigrateError>(())
//! ```

pub mod config;
pub mod core;
pub mod drivers;
pub mod error;
pub mod migrations;
pub mod typemap;

// Re-exports for convenient access
pub use config::{GeneratorConfig, PostgresVersion};
pub use crate::core::{MigrationOperation, Model, SqlValue};
pub use drivers::{PostgresDialect, PostgresMigrationsSqlGenerator};
pub use error::{MigrateError, Result};
pub use migrations::{MigrationCommand, MigrationCommandListBuilder, MigrationsSqlGenerator};
pub use typemap::{LogicalType, TypeMapping, TypeMappingInfo, TypeMappingSource};
