//! Store type resolution with memoized sized and array descriptors.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use crate::error::{MigrateError, Result};

use super::logical::LogicalType;
use super::mapping::{LiteralStyle, TypeMapping};

/// Base types that accept a length in the store type name (`varchar(10)`).
const SIZABLE_STORE_TYPES: &[&str] = &[
    "character varying",
    "varchar",
    "character",
    "char",
    "bit",
    "bit varying",
    "varbit",
];

/// Prefix PostgreSQL uses for array type names (`_int4`).
const ARRAY_PREFIX: char = '_';

/// Built-in store types: aliases (first is canonical) and literal style.
const BUILTIN_STORE_TYPES: &[(&[&str], LiteralStyle)] = &[
    (&["boolean", "bool"], LiteralStyle::Plain),
    (&["bytea"], LiteralStyle::Plain),
    (&["real", "float4"], LiteralStyle::Plain),
    (&["double precision", "float8"], LiteralStyle::Plain),
    (&["numeric", "decimal"], LiteralStyle::Plain),
    (&["money"], LiteralStyle::Plain),
    (&["uuid"], LiteralStyle::Plain),
    (&["smallint", "int2"], LiteralStyle::Plain),
    (&["integer", "int", "int4"], LiteralStyle::Plain),
    (&["bigint", "int8"], LiteralStyle::Plain),
    (&["text"], LiteralStyle::Plain),
    (&["character varying", "varchar"], LiteralStyle::Plain),
    (&["character", "char"], LiteralStyle::Plain),
    (&["citext"], LiteralStyle::Plain),
    (&["jsonb"], LiteralStyle::Plain),
    (&["json"], LiteralStyle::Plain),
    (&["xml"], LiteralStyle::Plain),
    (
        &["timestamp without time zone", "timestamp"],
        LiteralStyle::Prefixed("TIMESTAMP"),
    ),
    (
        &["timestamp with time zone", "timestamptz"],
        LiteralStyle::Prefixed("TIMESTAMPTZ"),
    ),
    (&["date"], LiteralStyle::Prefixed("DATE")),
    (&["time without time zone", "time"], LiteralStyle::Prefixed("TIME")),
    (&["time with time zone", "timetz"], LiteralStyle::Prefixed("TIMETZ")),
    (&["interval"], LiteralStyle::Prefixed("INTERVAL")),
    (&["macaddr"], LiteralStyle::Prefixed("MACADDR")),
    (&["inet"], LiteralStyle::Prefixed("INET")),
    (&["cidr"], LiteralStyle::Prefixed("CIDR")),
    (&["bit"], LiteralStyle::BitString),
    (&["bit varying", "varbit"], LiteralStyle::BitString),
    (&["hstore"], LiteralStyle::Plain),
    (&["point"], LiteralStyle::Prefixed("POINT")),
    (&["line"], LiteralStyle::Prefixed("LINE")),
    (&["lseg"], LiteralStyle::Prefixed("LSEG")),
    (&["box"], LiteralStyle::Prefixed("BOX")),
    (&["path"], LiteralStyle::Prefixed("PATH")),
    (&["polygon"], LiteralStyle::Prefixed("POLYGON")),
    (&["circle"], LiteralStyle::Prefixed("CIRCLE")),
    (&["tsvector"], LiteralStyle::Plain),
    (&["tsquery"], LiteralStyle::Plain),
    (&["regconfig"], LiteralStyle::Plain),
    (&["int4range"], LiteralStyle::Plain),
    (&["int8range"], LiteralStyle::Plain),
    (&["numrange"], LiteralStyle::Plain),
    (&["tsrange"], LiteralStyle::Plain),
    (&["tstzrange"], LiteralStyle::Plain),
    (&["daterange"], LiteralStyle::Plain),
    (&["oid"], LiteralStyle::Plain),
    (&["xid"], LiteralStyle::Plain),
    (&["cid"], LiteralStyle::Plain),
    (&["tid"], LiteralStyle::Plain),
    (&["regtype"], LiteralStyle::Plain),
];

/// Logical type defaults, by canonical store type.
const BUILTIN_LOGICAL_TYPES: &[(LogicalType, &str)] = &[
    (LogicalType::Bool, "boolean"),
    (LogicalType::Bytes, "bytea"),
    (LogicalType::Float32, "real"),
    (LogicalType::Float64, "double precision"),
    (LogicalType::Decimal, "numeric"),
    (LogicalType::Uuid, "uuid"),
    (LogicalType::Int16, "smallint"),
    (LogicalType::Int32, "integer"),
    (LogicalType::Int64, "bigint"),
    (LogicalType::String, "text"),
    (LogicalType::DateTime, "timestamp without time zone"),
    (LogicalType::DateTimeOffset, "timestamp with time zone"),
    (LogicalType::TimeSpan, "interval"),
    (LogicalType::Date, "date"),
    (LogicalType::Time, "time without time zone"),
    (LogicalType::Json, "jsonb"),
    (LogicalType::IpAddress, "inet"),
    (LogicalType::IpNetwork, "cidr"),
    (LogicalType::MacAddress, "macaddr"),
    (LogicalType::BitVec, "bit varying"),
    (LogicalType::Dictionary, "hstore"),
    (LogicalType::Point, "point"),
];

/// A type lookup: explicit store type name, logical type, or both.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeMappingInfo {
    pub store_type_name: Option<String>,
    pub clr_type: Option<LogicalType>,
    pub size: Option<u32>,
    /// Sized text/bit queries map to fixed-length `character(n)`/`bit(n)`.
    pub fixed_length: bool,
}

impl TypeMappingInfo {
    pub fn store(name: impl Into<String>) -> Self {
        Self {
            store_type_name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn clr(clr_type: LogicalType) -> Self {
        Self {
            clr_type: Some(clr_type),
            ..Self::default()
        }
    }

    pub fn with_size(mut self, size: Option<u32>) -> Self {
        self.size = size;
        self
    }

    pub fn with_fixed_length(mut self, fixed_length: bool) -> Self {
        self.fixed_length = fixed_length;
        self
    }

    fn describe(&self) -> String {
        match (&self.store_type_name, &self.clr_type) {
            (Some(name), _) => format!("store type '{}'", name),
            (None, Some(clr)) => match self.size {
                Some(size) => format!("logical type '{}' with size {}", clr, size),
                None => format!("logical type '{}'", clr),
            },
            (None, None) => "empty type query".to_string(),
        }
    }
}

/// Resolves store type names and logical types to [`TypeMapping`]s.
///
/// The built-in tables are immutable after construction. Sized-by-name and
/// array descriptors are memoized in concurrent maps; when two callers race
/// on the same key, the first insert wins and both get an equivalent
/// descriptor. Sized descriptors requested through a logical type + size are
/// built per call and never cached.
pub struct TypeMappingSource {
    store_type_mappings: HashMap<&'static str, Arc<TypeMapping>>,
    clr_type_mappings: HashMap<LogicalType, Arc<TypeMapping>>,
    derived_store_mappings: DashMap<String, Arc<TypeMapping>>,
    derived_clr_mappings: DashMap<LogicalType, Arc<TypeMapping>>,
}

impl Default for TypeMappingSource {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TypeMappingSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeMappingSource")
            .field("store_types", &self.store_type_mappings.len())
            .field("derived_store_mappings", &self.derived_store_mappings.len())
            .field("derived_clr_mappings", &self.derived_clr_mappings.len())
            .finish()
    }
}

impl TypeMappingSource {
    /// Create a resolver with the built-in PostgreSQL types.
    pub fn new() -> Self {
        let mut store_type_mappings = HashMap::new();
        for (aliases, literal) in BUILTIN_STORE_TYPES {
            let mapping = Arc::new(TypeMapping::new(aliases[0], *literal));
            for alias in *aliases {
                store_type_mappings.insert(*alias, mapping.clone());
            }
        }

        let mut clr_type_mappings = HashMap::new();
        for (clr_type, store_type) in BUILTIN_LOGICAL_TYPES {
            if let Some(mapping) = store_type_mappings.get(store_type) {
                clr_type_mappings.insert(clr_type.clone(), mapping.clone());
            }
        }
        if let Some(character) = store_type_mappings.get("character") {
            clr_type_mappings.insert(LogicalType::Char, Arc::new(character.with_size(1)));
        }

        Self {
            store_type_mappings,
            clr_type_mappings,
            derived_store_mappings: DashMap::new(),
            derived_clr_mappings: DashMap::new(),
        }
    }

    /// Resolve a query. `None` means no mapping exists; it is not an error.
    pub fn find_mapping(&self, info: &TypeMappingInfo) -> Option<Arc<TypeMapping>> {
        if let Some(name) = &info.store_type_name {
            if let Some(mapping) = self.find_by_store_name(name) {
                return Some(mapping);
            }
        }

        let clr_type = info.clr_type.as_ref()?;

        if let Some(size) = info.size {
            if let Some(mapping) = self.sized_clr_mapping(clr_type, size, info.fixed_length) {
                return Some(mapping);
            }
        }

        if let Some(mapping) = self.clr_type_mappings.get(clr_type) {
            return Some(mapping.clone());
        }

        self.find_array_by_clr(clr_type)
    }

    /// Shorthand for a store type name lookup.
    pub fn find_store_mapping(&self, store_type_name: &str) -> Option<Arc<TypeMapping>> {
        self.find_mapping(&TypeMappingInfo::store(store_type_name))
    }

    /// Shorthand for a logical type lookup.
    pub fn find_clr_mapping(&self, clr_type: &LogicalType) -> Option<Arc<TypeMapping>> {
        self.find_mapping(&TypeMappingInfo::clr(clr_type.clone()))
    }

    /// Like [`find_mapping`](Self::find_mapping), but a missing mapping is an error.
    pub fn require_mapping(&self, info: &TypeMappingInfo) -> Result<Arc<TypeMapping>> {
        self.find_mapping(info)
            .ok_or_else(|| MigrateError::TypeMappingNotFound(info.describe()))
    }

    /// Number of memoized sized/array descriptors.
    pub fn cached_mappings(&self) -> usize {
        self.derived_store_mappings.len() + self.derived_clr_mappings.len()
    }

    fn find_by_store_name(&self, name: &str) -> Option<Arc<TypeMapping>> {
        let key = name.trim().to_lowercase();

        if let Some(mapping) = self.find_scalar_by_store_name(&key) {
            return Some(mapping);
        }

        self.find_array_by_store_name(&key)
    }

    /// Exact and sized lookups only; never returns an array descriptor.
    fn find_scalar_by_store_name(&self, key: &str) -> Option<Arc<TypeMapping>> {
        if let Some(mapping) = self.store_type_mappings.get(key) {
            return Some(mapping.clone());
        }

        let (base, size) = parse_sized_store_type(key)?;
        if !SIZABLE_STORE_TYPES.contains(&base) {
            return None;
        }
        let base_mapping = self.store_type_mappings.get(base)?;

        if let Some(cached) = self.derived_store_mappings.get(key) {
            return Some(cached.value().clone());
        }

        let sized = Arc::new(base_mapping.with_size(size));
        Some(self.memoize_store(key, sized))
    }

    fn find_array_by_store_name(&self, key: &str) -> Option<Arc<TypeMapping>> {
        let element_name = key
            .strip_prefix(ARRAY_PREFIX)
            .or_else(|| key.strip_suffix("[]"))?;

        if let Some(cached) = self.derived_store_mappings.get(key) {
            return Some(cached.value().clone());
        }

        let element = self.find_scalar_by_store_name(element_name.trim())?;
        let array = Arc::new(TypeMapping::array_of(element));
        Some(self.memoize_store(key, array))
    }

    /// Sized text and bit-string descriptors; built per call, not cached.
    fn sized_clr_mapping(
        &self,
        clr_type: &LogicalType,
        size: u32,
        fixed_length: bool,
    ) -> Option<Arc<TypeMapping>> {
        let base = if clr_type.is_text_like() {
            if fixed_length { "character" } else { "character varying" }
        } else if clr_type.is_bit_vector_like() {
            if fixed_length { "bit" } else { "bit varying" }
        } else {
            return None;
        };

        self.store_type_mappings
            .get(base)
            .map(|mapping| Arc::new(mapping.with_size(size)))
    }

    fn find_array_by_clr(&self, clr_type: &LogicalType) -> Option<Arc<TypeMapping>> {
        let element_type = clr_type.element_type()?;

        if let Some(cached) = self.derived_clr_mappings.get(clr_type) {
            return Some(cached.value().clone());
        }

        // If an element isn't supported, neither is its array
        let element = self.find_clr_mapping(element_type)?;

        // Arrays of arrays must be modeled as a single multidimensional array
        if element.is_array() {
            debug!(
                "Refusing nested array mapping for logical type {}",
                clr_type
            );
            return None;
        }

        let array = Arc::new(TypeMapping::array_of(element));
        let mapping = self
            .derived_clr_mappings
            .entry(clr_type.clone())
            .or_insert(array)
            .value()
            .clone();
        debug!("Cached array mapping {} for {}", mapping.store_type(), clr_type);
        Some(mapping)
    }

    fn memoize_store(&self, key: &str, mapping: Arc<TypeMapping>) -> Arc<TypeMapping> {
        let mapping = self
            .derived_store_mappings
            .entry(key.to_string())
            .or_insert(mapping)
            .value()
            .clone();
        debug!("Cached store mapping {} for '{}'", mapping.store_type(), key);
        mapping
    }
}

/// Split `base(size)` into its parts. Malformed or zero sizes yield `None`.
fn parse_sized_store_type(name: &str) -> Option<(&str, u32)> {
    let open = name.find('(')?;
    let inner = name[open + 1..].strip_suffix(')')?;
    let size = inner.trim().parse::<u32>().ok().filter(|&size| size > 0)?;
    Some((name[..open].trim_end(), size))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_alias_resolves_to_canonical_spelling() {
        let source = TypeMappingSource::new();
        for (aliases, _) in BUILTIN_STORE_TYPES {
            for alias in *aliases {
                let mapping = source.find_store_mapping(alias).unwrap();
                assert_eq!(mapping.store_type(), aliases[0], "alias {}", alias);

                let upper = source.find_store_mapping(&alias.to_uppercase()).unwrap();
                assert_eq!(upper.store_type(), aliases[0]);
            }
        }
    }

    #[test]
    fn test_builtin_mappings_are_shared() {
        let source = TypeMappingSource::new();
        let a = source.find_store_mapping("int4").unwrap();
        let b = source.find_store_mapping("integer").unwrap();
        let c = source.find_clr_mapping(&LogicalType::Int32).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&a, &c));
    }

    #[test]
    fn test_sized_store_types() {
        let source = TypeMappingSource::new();
        for base in SIZABLE_STORE_TYPES {
            for size in [1u32, 10, 255, 10_485_760] {
                let mapping = source
                    .find_store_mapping(&format!("{}({})", base, size))
                    .unwrap();
                assert_eq!(mapping.size(), Some(size));
            }
        }

        let varchar = source.find_store_mapping("VARCHAR(20)").unwrap();
        assert_eq!(varchar.store_type(), "character varying(20)");
    }

    #[test]
    fn test_sized_store_type_is_cached() {
        let source = TypeMappingSource::new();
        let a = source.find_store_mapping("varchar(32)").unwrap();
        let b = source.find_store_mapping("varchar(32)").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(source.cached_mappings(), 1);
    }

    #[test]
    fn test_malformed_size_is_no_match() {
        let source = TypeMappingSource::new();
        assert!(source.find_store_mapping("varchar(abc)").is_none());
        assert!(source.find_store_mapping("varchar(10").is_none());
        assert!(source.find_store_mapping("varchar(-1)").is_none());
        assert!(source.find_store_mapping("varchar(0)").is_none());
        assert!(source.find_store_mapping("bit(0)").is_none());
        assert_eq!(source.cached_mappings(), 0);
    }

    #[test]
    fn test_non_sizable_type_with_size_is_no_match() {
        let source = TypeMappingSource::new();
        assert!(source.find_store_mapping("integer(4)").is_none());
        assert!(source.find_store_mapping("widget(4)").is_none());
    }

    #[test]
    fn test_array_by_store_name() {
        let source = TypeMappingSource::new();
        let element = source.find_store_mapping("int4").unwrap();
        let array = source.find_store_mapping("_int4").unwrap();

        assert!(array.is_array());
        assert_eq!(array.store_type(), "integer[]");
        assert!(Arc::ptr_eq(array.element().unwrap(), &element));

        let again = source.find_store_mapping("_int4").unwrap();
        assert!(Arc::ptr_eq(&array, &again));

        let suffixed = source.find_store_mapping("integer[]").unwrap();
        assert_eq!(suffixed.store_type(), "integer[]");
    }

    #[test]
    fn test_array_of_sized_element() {
        let source = TypeMappingSource::new();
        let array = source.find_store_mapping("_varchar(10)").unwrap();
        assert_eq!(array.store_type(), "character varying(10)[]");
        assert_eq!(array.element().unwrap().size(), Some(10));
    }

    #[test]
    fn test_array_of_array_by_store_name_is_not_attempted() {
        let source = TypeMappingSource::new();
        assert!(source.find_store_mapping("__int4").is_none());
        assert!(source.find_store_mapping("integer[][]").is_none());
        assert!(source.find_store_mapping("_widget").is_none());
    }

    #[test]
    fn test_store_name_takes_priority_over_clr_type() {
        let source = TypeMappingSource::new();
        let info = TypeMappingInfo {
            store_type_name: Some("jsonb".to_string()),
            clr_type: Some(LogicalType::String),
            ..TypeMappingInfo::default()
        };
        assert_eq!(source.find_mapping(&info).unwrap().store_type(), "jsonb");
    }

    #[test]
    fn test_unknown_store_name_falls_back_to_clr_type() {
        let source = TypeMappingSource::new();
        let info = TypeMappingInfo {
            store_type_name: Some("widget".to_string()),
            clr_type: Some(LogicalType::Int64),
            ..TypeMappingInfo::default()
        };
        assert_eq!(source.find_mapping(&info).unwrap().store_type(), "bigint");
    }

    #[test]
    fn test_sized_clr_mapping_is_not_cached() {
        let source = TypeMappingSource::new();
        let info = TypeMappingInfo::clr(LogicalType::String).with_size(Some(50));

        let a = source.find_mapping(&info).unwrap();
        let b = source.find_mapping(&info).unwrap();
        assert_eq!(a.store_type(), "character varying(50)");
        assert_eq!(a, b);
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(source.cached_mappings(), 0);

        let fixed = source
            .find_mapping(&info.clone().with_fixed_length(true))
            .unwrap();
        assert_eq!(fixed.store_type(), "character(50)");

        let bits = source
            .find_mapping(&TypeMappingInfo::clr(LogicalType::BitVec).with_size(Some(8)))
            .unwrap();
        assert_eq!(bits.store_type(), "bit varying(8)");
    }

    #[test]
    fn test_size_ignored_for_non_text_types() {
        let source = TypeMappingSource::new();
        let info = TypeMappingInfo::clr(LogicalType::Int32).with_size(Some(8));
        assert_eq!(source.find_mapping(&info).unwrap().store_type(), "integer");
    }

    #[test]
    fn test_char_maps_to_single_character() {
        let source = TypeMappingSource::new();
        let mapping = source.find_clr_mapping(&LogicalType::Char).unwrap();
        assert_eq!(mapping.store_type(), "character(1)");
    }

    #[test]
    fn test_array_by_clr_type() {
        let source = TypeMappingSource::new();
        let array_type = LogicalType::array(LogicalType::String);
        let a = source.find_clr_mapping(&array_type).unwrap();
        assert_eq!(a.store_type(), "text[]");

        let b = source.find_clr_mapping(&array_type).unwrap();
        assert!(Arc::ptr_eq(&a, &b));

        let list = source
            .find_clr_mapping(&LogicalType::list(LogicalType::Int16))
            .unwrap();
        assert_eq!(list.store_type(), "smallint[]");
    }

    #[test]
    fn test_nested_clr_array_is_rejected() {
        let source = TypeMappingSource::new();
        let nested = LogicalType::array(LogicalType::array(LogicalType::Int32));
        assert!(source.find_clr_mapping(&nested).is_none());

        let list_of_arrays = LogicalType::list(LogicalType::array(LogicalType::Int32));
        assert!(source.find_clr_mapping(&list_of_arrays).is_none());
    }

    #[test]
    fn test_require_mapping_reports_query() {
        let source = TypeMappingSource::new();
        let err = source
            .require_mapping(&TypeMappingInfo::store("widget"))
            .unwrap_err();
        assert!(matches!(err, MigrateError::TypeMappingNotFound(_)));
        assert!(err.to_string().contains("widget"));
    }

    #[test]
    fn test_concurrent_resolution_is_idempotent() {
        let source = TypeMappingSource::new();
        let results: Vec<Arc<TypeMapping>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| s.spawn(|| source.find_store_mapping("_varchar(12)").unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        for mapping in &results {
            assert_eq!(mapping.store_type(), "character varying(12)[]");
        }
        assert!(source.cached_mappings() <= 2);
        let cached = source.find_store_mapping("_varchar(12)").unwrap();
        assert_eq!(*cached, *results[0]);
    }
}
