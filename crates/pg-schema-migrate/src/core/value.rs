//! SQL value types rendered as PostgreSQL literals.
//!
//! Values appear in migrations as column defaults, sequence bounds, comments
//! and storage parameters. They are never bound as parameters; every value is
//! rendered inline as literal SQL text.

use std::fmt::Write;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

/// SQL value enum for literal rendering.
///
/// Deserializes from plain YAML/JSON scalars (null, bool, integer, float,
/// string) and sequences; typed variants are constructed from Rust.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "LiteralInput")]
pub enum SqlValue {
    /// NULL.
    Null,

    /// Boolean value.
    Bool(bool),

    /// 16-bit signed integer (smallint).
    I16(i16),

    /// 32-bit signed integer (int).
    I32(i32),

    /// 64-bit signed integer (bigint).
    I64(i64),

    /// 32-bit floating point (real/float4).
    F32(f32),

    /// 64-bit floating point (double precision/float8).
    F64(f64),

    /// Text/string data.
    Text(String),

    /// Binary data.
    Bytes(Vec<u8>),

    /// UUID value.
    Uuid(Uuid),

    /// Decimal value with arbitrary precision.
    Decimal(Decimal),

    /// Timestamp without timezone.
    DateTime(NaiveDateTime),

    /// Timestamp with timezone offset.
    DateTimeOffset(DateTime<FixedOffset>),

    /// Date without time component.
    Date(NaiveDate),

    /// Time without date component.
    Time(NaiveTime),

    /// One-dimensional array of values.
    Array(Vec<SqlValue>),
}

impl SqlValue {
    /// Check if this value is NULL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Render as a PostgreSQL literal without any store type context.
    ///
    /// Strings are single-quoted with embedded quotes doubled. Date/time
    /// values carry a type-prefixed literal so they are unambiguous in DDL.
    pub fn to_sql_literal(&self) -> String {
        match self {
            SqlValue::Null => "NULL".to_string(),
            SqlValue::Bool(v) => (if *v { "TRUE" } else { "FALSE" }).to_string(),
            SqlValue::I16(v) => v.to_string(),
            SqlValue::I32(v) => v.to_string(),
            SqlValue::I64(v) => v.to_string(),
            SqlValue::F32(v) => float_literal(f64::from(*v)),
            SqlValue::F64(v) => float_literal(*v),
            SqlValue::Text(v) => quote_literal(v),
            SqlValue::Bytes(v) => {
                let mut hex = String::with_capacity(v.len() * 2);
                for b in v {
                    let _ = write!(hex, "{:02X}", b);
                }
                format!("BYTEA E'\\\\x{}'", hex)
            }
            SqlValue::Uuid(v) => format!("'{}'", v),
            SqlValue::Decimal(v) => v.to_string(),
            SqlValue::DateTime(v) => {
                format!("TIMESTAMP '{}'", v.format("%Y-%m-%d %H:%M:%S%.f"))
            }
            SqlValue::DateTimeOffset(v) => {
                format!("TIMESTAMPTZ '{}'", v.format("%Y-%m-%d %H:%M:%S%.f%:z"))
            }
            SqlValue::Date(v) => format!("DATE '{}'", v.format("%Y-%m-%d")),
            SqlValue::Time(v) => format!("TIME '{}'", v.format("%H:%M:%S%.f")),
            SqlValue::Array(items) => format!(
                "ARRAY[{}]",
                items
                    .iter()
                    .map(SqlValue::to_sql_literal)
                    .collect::<Vec<_>>()
                    .join(",")
            ),
        }
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::I32(v)
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::I64(v)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(SqlValue::Null, Into::into)
    }
}

/// Quote a string as a SQL literal, doubling embedded single quotes.
pub fn quote_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

fn float_literal(v: f64) -> String {
    if v.is_nan() {
        "'NaN'".to_string()
    } else if v.is_infinite() {
        let text = if v > 0.0 { "'Infinity'" } else { "'-Infinity'" };
        text.to_string()
    } else {
        v.to_string()
    }
}

/// Wire shape of a literal in YAML/JSON operation files.
#[derive(Deserialize)]
#[serde(untagged)]
enum LiteralInput {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<LiteralInput>),
}

impl From<LiteralInput> for SqlValue {
    fn from(input: LiteralInput) -> Self {
        match input {
            LiteralInput::Null => SqlValue::Null,
            LiteralInput::Bool(v) => SqlValue::Bool(v),
            LiteralInput::Int(v) => SqlValue::I64(v),
            LiteralInput::Float(v) => SqlValue::F64(v),
            LiteralInput::Text(v) => SqlValue::Text(v),
            LiteralInput::List(items) => {
                SqlValue::Array(items.into_iter().map(SqlValue::from).collect())
            }
        }
    }
}
