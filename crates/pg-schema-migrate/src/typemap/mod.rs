//! PostgreSQL store type mapping.
//!
//! - [`logical`]: application-side value types
//! - [`mapping`]: resolved store type descriptors and literal rendering
//! - [`source`]: the resolver, with memoized sized and array descriptors
//!
//! ```rust
//! use pg_schema_migrate::typemap::{LogicalType, TypeMappingInfo, TypeMappingSource};
//!
//! let source = TypeMappingSource::new();
//! let varchar = source.find_store_mapping("varchar(20)").unwrap();
//! assert_eq!(varchar.store_type(), "character varying(20)");
//!
//! let tags = source
//!     .find_mapping(&TypeMappingInfo::clr(LogicalType::array(LogicalType::String)))
//!     .unwrap();
//! assert_eq!(tags.store_type(), "text[]");
//! ```

pub mod logical;
pub mod mapping;
pub mod source;

pub use logical::LogicalType;
pub use mapping::{is_integer_store_type, LiteralStyle, MappingKind, TypeMapping};
pub use source::{TypeMappingInfo, TypeMappingSource};
