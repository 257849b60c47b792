//! Resolved store type descriptors.

use std::sync::Arc;

use crate::core::value::{quote_literal, SqlValue};

/// How a descriptor renders values as SQL literals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralStyle {
    /// Plain rendering ([`SqlValue::to_sql_literal`]).
    Plain,
    /// Text values are emitted as a typed literal, e.g. `DATE '2024-01-01'`.
    Prefixed(&'static str),
    /// Text values are emitted as bit strings, e.g. `B'0101'`.
    BitString,
}

/// Scalar or array descriptor.
#[derive(Debug, Clone, PartialEq)]
pub enum MappingKind {
    Scalar,
    /// Array whose elements use the wrapped descriptor.
    Array(Arc<TypeMapping>),
}

/// A physical PostgreSQL type together with its literal rendering.
///
/// Built-in descriptors are shared (`Arc`) and referentially stable; sized and
/// array descriptors are derived on demand by the resolver.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeMapping {
    store_type: String,
    size: Option<u32>,
    kind: MappingKind,
    literal: LiteralStyle,
}

impl TypeMapping {
    /// Create a scalar descriptor.
    pub fn new(store_type: impl Into<String>, literal: LiteralStyle) -> Self {
        Self {
            store_type: store_type.into(),
            size: None,
            kind: MappingKind::Scalar,
            literal,
        }
    }

    /// Array descriptor wrapping `element`; the store type is `<element>[]`.
    pub fn array_of(element: Arc<TypeMapping>) -> Self {
        Self {
            store_type: format!("{}[]", element.store_type),
            size: None,
            literal: LiteralStyle::Plain,
            kind: MappingKind::Array(element),
        }
    }

    /// Clone of this descriptor with a length baked into the store type.
    pub fn with_size(&self, size: u32) -> Self {
        Self {
            store_type: format!("{}({})", self.store_type_base(), size),
            size: Some(size),
            kind: self.kind.clone(),
            literal: self.literal,
        }
    }

    /// Canonical store type name, including any size (`character varying(10)`).
    pub fn store_type(&self) -> &str {
        &self.store_type
    }

    /// Store type name without the size suffix.
    pub fn store_type_base(&self) -> &str {
        match self.store_type.find('(') {
            Some(idx) if !self.is_array() => &self.store_type[..idx],
            _ => &self.store_type,
        }
    }

    pub fn size(&self) -> Option<u32> {
        self.size
    }

    pub fn kind(&self) -> &MappingKind {
        &self.kind
    }

    pub fn is_array(&self) -> bool {
        matches!(self.kind, MappingKind::Array(_))
    }

    /// Element descriptor for arrays.
    pub fn element(&self) -> Option<&Arc<TypeMapping>> {
        match &self.kind {
            MappingKind::Array(element) => Some(element),
            MappingKind::Scalar => None,
        }
    }

    /// Whether this is `smallint`, `integer` or `bigint`.
    pub fn is_integer(&self) -> bool {
        !self.is_array() && is_integer_store_type(&self.store_type)
    }

    /// Render a value as a literal of this type.
    pub fn generate_sql_literal(&self, value: &SqlValue) -> String {
        match (&self.kind, value) {
            (_, SqlValue::Null) => "NULL".to_string(),
            (MappingKind::Array(element), SqlValue::Array(items)) => format!(
                "ARRAY[{}]::{}",
                items
                    .iter()
                    .map(|item| element.generate_sql_literal(item))
                    .collect::<Vec<_>>()
                    .join(","),
                self.store_type
            ),
            (MappingKind::Scalar, SqlValue::Text(text)) => match self.literal {
                LiteralStyle::Plain => quote_literal(text),
                LiteralStyle::Prefixed(prefix) => format!("{} {}", prefix, quote_literal(text)),
                LiteralStyle::BitString => format!("B{}", quote_literal(text)),
            },
            _ => value.to_sql_literal(),
        }
    }
}

/// Integer family check on a store type name (canonical or alias).
pub fn is_integer_store_type(store_type: &str) -> bool {
    matches!(
        store_type.to_ascii_lowercase().as_str(),
        "smallint" | "int2" | "integer" | "int" | "int4" | "bigint" | "int8"
    )
}
