//! Dialect annotations carried on migration operations.
//!
//! Operations carry an open, string-keyed annotation bag ([`RawAnnotations`]).
//! The PostgreSQL generator reads it through the typed [`Annotations`] view;
//! keys outside the `Postgres:` namespace belong to other providers and are
//! ignored.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use tracing::warn;

use crate::error::{MigrateError, Result};

use super::value::{quote_literal, SqlValue};

/// Namespace prefix for PostgreSQL annotations.
pub const PREFIX: &str = "Postgres:";

pub const COMMENT: &str = "Postgres:Comment";
pub const VALUE_GENERATION_STRATEGY: &str = "Postgres:ValueGenerationStrategy";
pub const INDEX_METHOD: &str = "Postgres:IndexMethod";
pub const STORAGE_PARAMETER_PREFIX: &str = "Postgres:StorageParameter:";
pub const INTERLEAVE_IN_PARENT: &str = "Postgres:InterleaveInParent";
pub const UNLOGGED_TABLE: &str = "Postgres:UnloggedTable";
pub const EXTENSION_PREFIX: &str = "Postgres:Extension:";

/// Legacy value-generation marker. Its semantics are ambiguous, so it is
/// rejected instead of guessed at.
pub const DEPRECATED_VALUE_GENERATED_ON_ADD: &str = "Postgres:ValueGeneratedOnAdd";

/// Ordered, string-keyed annotation bag.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawAnnotations(Vec<(String, SqlValue)>);

impl RawAnnotations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key`, replacing an existing value in place.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<SqlValue>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key, value)),
        }
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&SqlValue> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for RawAnnotations {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct OrderedVisitor;

        impl<'de> Visitor<'de> for OrderedVisitor {
            type Value = RawAnnotations;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of annotation keys to values")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut map: A,
            ) -> std::result::Result<Self::Value, A::Error> {
                let mut annotations = RawAnnotations::new();
                while let Some((key, value)) = map.next_entry::<String, SqlValue>()? {
                    annotations.insert(key, value);
                }
                Ok(annotations)
            }
        }

        deserializer.deserialize_map(OrderedVisitor)
    }
}

/// How values are generated for a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValueGenerationStrategy {
    #[default]
    None,
    /// `serial` pseudo-types backed by an owned sequence.
    SerialColumn,
    /// `GENERATED BY DEFAULT AS IDENTITY` (PostgreSQL 10+).
    IdentityByDefaultColumn,
    /// `GENERATED ALWAYS AS IDENTITY` (PostgreSQL 10+).
    IdentityAlwaysColumn,
}

impl ValueGenerationStrategy {
    pub fn is_identity(self) -> bool {
        matches!(
            self,
            Self::IdentityByDefaultColumn | Self::IdentityAlwaysColumn
        )
    }

    fn parse(value: &SqlValue) -> Result<Self> {
        match value {
            SqlValue::Null => Ok(Self::None),
            SqlValue::Text(name) => match name.as_str() {
                "None" => Ok(Self::None),
                "SerialColumn" => Ok(Self::SerialColumn),
                "IdentityByDefaultColumn" => Ok(Self::IdentityByDefaultColumn),
                "IdentityAlwaysColumn" => Ok(Self::IdentityAlwaysColumn),
                other => Err(MigrateError::Config(format!(
                    "Unknown value generation strategy '{}' in {}",
                    other, VALUE_GENERATION_STRATEGY
                ))),
            },
            other => Err(MigrateError::Config(format!(
                "{} must be a strategy name, got {}",
                VALUE_GENERATION_STRATEGY,
                other.to_sql_literal()
            ))),
        }
    }
}

/// Parent table reference for interleaved tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterleaveInParent {
    pub parent_schema: Option<String>,
    pub parent_table: String,
    pub prefix_columns: Vec<String>,
}

impl InterleaveInParent {
    /// Parse `schema,table,col1,col2,...` (schema may be empty), given either
    /// as one comma-separated string or as a list.
    fn parse(value: &SqlValue) -> Result<Self> {
        let parts: Vec<String> = match value {
            SqlValue::Text(text) => text.split(',').map(|p| p.trim().to_string()).collect(),
            SqlValue::Array(items) => items.iter().map(text_of).collect::<Result<_>>()?,
            other => return Err(invalid_interleave(&other.to_sql_literal())),
        };

        let mut parts = parts.into_iter();
        let parent_schema = parts.next().filter(|s| !s.is_empty());
        let parent_table = parts
            .next()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| invalid_interleave("missing parent table"))?;

        Ok(Self {
            parent_schema,
            parent_table,
            prefix_columns: parts.filter(|c| !c.is_empty()).collect(),
        })
    }
}

fn invalid_interleave(detail: &str) -> MigrateError {
    MigrateError::Config(format!(
        "{} must be 'schema,table,column,...': {}",
        INTERLEAVE_IN_PARENT, detail
    ))
}

fn text_of(value: &SqlValue) -> Result<String> {
    match value {
        SqlValue::Text(text) => Ok(text.trim().to_string()),
        other => Err(invalid_interleave(&other.to_sql_literal())),
    }
}

/// A PostgreSQL extension requested on the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostgresExtension {
    pub schema: Option<String>,
    pub name: String,
    pub version: Option<String>,
}

impl PostgresExtension {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            schema: None,
            name: name.into(),
            version: None,
        }
    }

    /// Parse the `schema,name,version` annotation value. Empty parts are absent;
    /// an empty name falls back to the name in the key.
    fn parse(key_name: &str, value: &SqlValue) -> Result<Self> {
        let text = match value {
            SqlValue::Null => String::new(),
            SqlValue::Text(text) => text.clone(),
            other => {
                return Err(MigrateError::Config(format!(
                    "{}{} must be 'schema,name,version', got {}",
                    EXTENSION_PREFIX,
                    key_name,
                    other.to_sql_literal()
                )))
            }
        };

        let mut parts = text.split(',').map(|p| p.trim()).map(|p| {
            if p.is_empty() {
                None
            } else {
                Some(p.to_string())
            }
        });
        let schema = parts.next().flatten();
        let name = parts.next().flatten().unwrap_or_else(|| key_name.to_string());
        let version = parts.next().flatten();

        Ok(Self {
            schema,
            name,
            version,
        })
    }
}

/// Ordered storage parameters: name to rendered literal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorageParameters(Vec<(String, String)>);

impl StorageParameters {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Parameters in `self` that are new or whose value differs from `old`.
    pub fn changed_from<'a>(&'a self, old: &'a StorageParameters) -> Vec<(&'a str, &'a str)> {
        self.iter()
            .filter(|(k, v)| old.get(k) != Some(*v))
            .collect()
    }

    /// Parameter names in `old` that no longer appear in `self`.
    pub fn removed_from<'a>(&self, old: &'a StorageParameters) -> Vec<&'a str> {
        old.iter()
            .filter(|(k, _)| self.get(k).is_none())
            .map(|(k, _)| k)
            .collect()
    }

    /// Render as `k=v, k=v`.
    pub fn to_sql(&self) -> String {
        render_pairs(self.iter())
    }

    fn push(&mut self, name: String, value: String) {
        match self.0.iter_mut().find(|(k, _)| *k == name) {
            Some(entry) => entry.1 = value,
            None => self.0.push((name, value)),
        }
    }
}

/// Render `k=v` pairs comma-joined.
pub fn render_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> String {
    pairs
        .into_iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(", ")
}

fn storage_parameter_value(value: &SqlValue) -> String {
    match value {
        SqlValue::Bool(b) => (if *b { "true" } else { "false" }).to_string(),
        SqlValue::Text(text) => quote_literal(text),
        other => other.to_sql_literal(),
    }
}

/// Typed view over the `Postgres:` annotations of one operation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Annotations {
    pub comment: Option<String>,
    pub value_generation_strategy: ValueGenerationStrategy,
    pub index_method: Option<String>,
    pub storage_parameters: StorageParameters,
    pub interleave_in_parent: Option<InterleaveInParent>,
    pub unlogged: bool,
    pub extensions: Vec<PostgresExtension>,
}

impl Annotations {
    /// Read the typed view.
    ///
    /// # Errors
    ///
    /// Returns `MigrateError::Config` for the deprecated value-generation
    /// marker and for malformed values of known keys.
    pub fn parse(raw: &RawAnnotations) -> Result<Self> {
        let mut annotations = Annotations::default();

        for (key, value) in raw.iter() {
            if !key.starts_with(PREFIX) {
                continue;
            }

            if key == DEPRECATED_VALUE_GENERATED_ON_ADD {
                return Err(MigrateError::Config(format!(
                    "The annotation '{}' is no longer supported; use '{}' with \
                     'SerialColumn' or an identity strategy instead",
                    DEPRECATED_VALUE_GENERATED_ON_ADD, VALUE_GENERATION_STRATEGY
                )));
            }

            if let Some(name) = key.strip_prefix(STORAGE_PARAMETER_PREFIX) {
                annotations
                    .storage_parameters
                    .push(name.to_string(), storage_parameter_value(value));
                continue;
            }

            if let Some(name) = key.strip_prefix(EXTENSION_PREFIX) {
                annotations
                    .extensions
                    .push(PostgresExtension::parse(name, value)?);
                continue;
            }

            match key {
                COMMENT => annotations.comment = optional_text(key, value)?,
                VALUE_GENERATION_STRATEGY => {
                    annotations.value_generation_strategy = ValueGenerationStrategy::parse(value)?
                }
                INDEX_METHOD => annotations.index_method = optional_text(key, value)?,
                INTERLEAVE_IN_PARENT => {
                    annotations.interleave_in_parent = match value {
                        SqlValue::Null => None,
                        v => Some(InterleaveInParent::parse(v)?),
                    }
                }
                UNLOGGED_TABLE => {
                    annotations.unlogged = match value {
                        SqlValue::Bool(b) => *b,
                        SqlValue::Null => false,
                        other => {
                            return Err(MigrateError::Config(format!(
                                "{} must be a boolean, got {}",
                                key,
                                other.to_sql_literal()
                            )))
                        }
                    }
                }
                _ => warn!("Ignoring unknown annotation '{}'", key),
            }
        }

        Ok(annotations)
    }
}

fn optional_text(key: &str, value: &SqlValue) -> Result<Option<String>> {
    match value {
        SqlValue::Null => Ok(None),
        SqlValue::Text(text) => Ok(Some(text.clone())),
        other => Err(MigrateError::Config(format!(
            "{} must be a string, got {}",
            key,
            other.to_sql_literal()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_keys() {
        let raw = RawAnnotations::new()
            .with(COMMENT, "Customer accounts")
            .with(VALUE_GENERATION_STRATEGY, "SerialColumn")
            .with(INDEX_METHOD, "gin")
            .with(UNLOGGED_TABLE, true);

        let annotations = Annotations::parse(&raw).unwrap();
        assert_eq!(annotations.comment.as_deref(), Some("Customer accounts"));
        assert_eq!(
            annotations.value_generation_strategy,
            ValueGenerationStrategy::SerialColumn
        );
        assert_eq!(annotations.index_method.as_deref(), Some("gin"));
        assert!(annotations.unlogged);
    }

    #[test]
    fn test_deprecated_marker_is_config_error() {
        let raw = RawAnnotations::new().with(DEPRECATED_VALUE_GENERATED_ON_ADD, true);
        let err = Annotations::parse(&raw).unwrap_err();
        assert!(matches!(err, MigrateError::Config(_)));
        assert!(err.to_string().contains("ValueGeneratedOnAdd"));
    }

    #[test]
    fn test_foreign_and_unknown_keys_are_ignored() {
        let raw = RawAnnotations::new()
            .with("SqlServer:Clustered", true)
            .with("Postgres:SomethingNew", 1);
        assert_eq!(Annotations::parse(&raw).unwrap(), Annotations::default());
    }

    #[test]
    fn test_storage_parameters_keep_insertion_order() {
        let raw = RawAnnotations::new()
            .with("Postgres:StorageParameter:fillfactor", 70)
            .with("Postgres:StorageParameter:autovacuum_enabled", false)
            .with("Postgres:StorageParameter:toast_tuple_target", 256);

        let params = Annotations::parse(&raw).unwrap().storage_parameters;
        assert_eq!(
            params.to_sql(),
            "fillfactor=70, autovacuum_enabled=false, toast_tuple_target=256"
        );
    }

    #[test]
    fn test_storage_parameter_diff() {
        let old = Annotations::parse(
            &RawAnnotations::new()
                .with("Postgres:StorageParameter:fillfactor", 70)
                .with("Postgres:StorageParameter:autovacuum_enabled", true),
        )
        .unwrap()
        .storage_parameters;
        let new = Annotations::parse(
            &RawAnnotations::new()
                .with("Postgres:StorageParameter:fillfactor", 80)
                .with("Postgres:StorageParameter:parallel_workers", 4),
        )
        .unwrap()
        .storage_parameters;

        assert_eq!(
            new.changed_from(&old),
            vec![("fillfactor", "80"), ("parallel_workers", "4")]
        );
        assert_eq!(new.removed_from(&old), vec!["autovacuum_enabled"]);
        assert!(old.changed_from(&old).is_empty());
        assert!(old.removed_from(&old).is_empty());
    }

    #[test]
    fn test_interleave_in_parent() {
        let raw = RawAnnotations::new().with(INTERLEAVE_IN_PARENT, "app,orders,tenant_id,order_id");
        let interleave = Annotations::parse(&raw).unwrap().interleave_in_parent.unwrap();
        assert_eq!(interleave.parent_schema.as_deref(), Some("app"));
        assert_eq!(interleave.parent_table, "orders");
        assert_eq!(interleave.prefix_columns, vec!["tenant_id", "order_id"]);

        let raw = RawAnnotations::new().with(INTERLEAVE_IN_PARENT, ",orders");
        let interleave = Annotations::parse(&raw).unwrap().interleave_in_parent.unwrap();
        assert_eq!(interleave.parent_schema, None);
        assert!(interleave.prefix_columns.is_empty());

        let raw = RawAnnotations::new().with(INTERLEAVE_IN_PARENT, "app");
        assert!(Annotations::parse(&raw).is_err());
    }

    #[test]
    fn test_extensions() {
        let raw = RawAnnotations::new()
            .with("Postgres:Extension:hstore", SqlValue::Null)
            .with("Postgres:Extension:postgis", "ext,postgis,3.4");

        let extensions = Annotations::parse(&raw).unwrap().extensions;
        assert_eq!(extensions[0], PostgresExtension::new("hstore"));
        assert_eq!(extensions[1].schema.as_deref(), Some("ext"));
        assert_eq!(extensions[1].version.as_deref(), Some("3.4"));
    }

    #[test]
    fn test_raw_annotations_deserialize_in_order() {
        let raw: RawAnnotations = serde_yaml::from_str(
            "Postgres:StorageParameter:b: 1\nPostgres:StorageParameter:a: 2\n",
        )
        .unwrap();
        let keys: Vec<_> = raw.iter().map(|(k, _)| k).collect();
        assert_eq!(
            keys,
            vec!["Postgres:StorageParameter:b", "Postgres:StorageParameter:a"]
        );
    }

    #[test]
    fn test_unknown_strategy_is_config_error() {
        let raw = RawAnnotations::new().with(VALUE_GENERATION_STRATEGY, "Hilo");
        assert!(matches!(
            Annotations::parse(&raw),
            Err(MigrateError::Config(_))
        ));
    }
}
