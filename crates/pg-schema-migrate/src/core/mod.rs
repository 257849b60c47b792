//! Core abstractions for database-agnostic schema migrations.
//!
//! This module provides the foundational types and traits used throughout
//! the generator:
//!
//! - [`operations`]: migration operations, deserializable from YAML/JSON
//! - [`annotations`]: the annotation bag on operations and its typed view
//! - [`model`]: target schema model consulted for column types
//! - [`value`]: SQL values rendered as literals
//! - [`identifier`]: identifier validation
//! - [`traits`]: the `Dialect` syntax strategy
//!
//! # Design Patterns
//!
//! - **Strategy**: `Dialect` provides interchangeable syntax rules
//! - **Template Method**: default trait method implementations define algorithm skeletons

pub mod annotations;
pub mod identifier;
pub mod model;
pub mod operations;
pub mod traits;
pub mod value;

// Re-export commonly used types for convenience
pub use annotations::{Annotations, RawAnnotations, ValueGenerationStrategy};
pub use model::{Model, ModelColumn, ModelTable};
pub use operations::MigrationOperation;
pub use traits::Dialect;
pub use value::SqlValue;
