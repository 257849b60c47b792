//! Database driver implementations.
//!
//! This module provides database-specific implementations of the core traits:
//!
//! - [`postgres`]: PostgreSQL dialect and migrations SQL generator
//!
//! # Architecture
//!
//! Each driver module implements:
//! - `Dialect`: SQL syntax strategy for the database engine
//! - `MigrationsSqlGenerator`: overrides of the generic statement shapes
//!
//! # Adding New Databases
//!
//! 1. Create a new module under `drivers/`
//! 2. Implement `Dialect` for the engine's quoting rules
//! 3. Implement `MigrationsSqlGenerator`, overriding only what differs from
//!    [`crate::migrations::generic`]

pub mod postgres;

pub use postgres::{PostgresDialect, PostgresMigrationsSqlGenerator};
