//! Application-side (logical) value types.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::MigrateError;

/// Logical type of a mapped property.
///
/// Written in operation files as a short name (`i32`, `string`, `uuid`),
/// with `T[]` for arrays and `list<T>` for ordered lists.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum LogicalType {
    Bool,
    Bytes,
    Float32,
    Float64,
    Decimal,
    Uuid,
    Int16,
    Int32,
    Int64,
    String,
    Char,
    DateTime,
    DateTimeOffset,
    TimeSpan,
    Date,
    Time,
    Json,
    IpAddress,
    IpNetwork,
    MacAddress,
    BitVec,
    Dictionary,
    Point,
    /// Native array of the element type.
    Array(Box<LogicalType>),
    /// Growable ordered list of the element type.
    List(Box<LogicalType>),
}

const NAMES: &[(&str, LogicalType)] = &[
    ("bool", LogicalType::Bool),
    ("bytes", LogicalType::Bytes),
    ("f32", LogicalType::Float32),
    ("f64", LogicalType::Float64),
    ("decimal", LogicalType::Decimal),
    ("uuid", LogicalType::Uuid),
    ("i16", LogicalType::Int16),
    ("i32", LogicalType::Int32),
    ("i64", LogicalType::Int64),
    ("string", LogicalType::String),
    ("char", LogicalType::Char),
    ("datetime", LogicalType::DateTime),
    ("datetimeoffset", LogicalType::DateTimeOffset),
    ("timespan", LogicalType::TimeSpan),
    ("date", LogicalType::Date),
    ("time", LogicalType::Time),
    ("json", LogicalType::Json),
    ("ipaddr", LogicalType::IpAddress),
    ("ipnetwork", LogicalType::IpNetwork),
    ("macaddr", LogicalType::MacAddress),
    ("bitvec", LogicalType::BitVec),
    ("dictionary", LogicalType::Dictionary),
    ("point", LogicalType::Point),
];

impl LogicalType {
    pub fn array(element: LogicalType) -> Self {
        LogicalType::Array(Box::new(element))
    }

    pub fn list(element: LogicalType) -> Self {
        LogicalType::List(Box::new(element))
    }

    /// Element type of arrays and lists.
    pub fn element_type(&self) -> Option<&LogicalType> {
        match self {
            LogicalType::Array(element) | LogicalType::List(element) => Some(element),
            _ => None,
        }
    }

    /// Types whose size maps to a bounded character type.
    pub fn is_text_like(&self) -> bool {
        matches!(self, LogicalType::String)
    }

    /// Types whose size maps to a bounded bit string.
    pub fn is_bit_vector_like(&self) -> bool {
        matches!(self, LogicalType::BitVec)
    }
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalType::Array(element) => write!(f, "{}[]", element),
            LogicalType::List(element) => write!(f, "list<{}>", element),
            scalar => {
                let name = NAMES
                    .iter()
                    .find(|(_, t)| t == scalar)
                    .map(|(name, _)| *name)
                    .unwrap_or("?");
                f.write_str(name)
            }
        }
    }
}

impl FromStr for LogicalType {
    type Err = MigrateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        if let Some(element) = s.strip_suffix("[]") {
            return Ok(LogicalType::array(element.parse()?));
        }
        if let Some(element) = s.strip_prefix("list<").and_then(|rest| rest.strip_suffix('>')) {
            return Ok(LogicalType::list(element.parse()?));
        }

        let lower = s.to_ascii_lowercase();
        NAMES
            .iter()
            .find(|(name, _)| *name == lower)
            .map(|(_, t)| t.clone())
            .ok_or_else(|| MigrateError::Config(format!("unknown logical type '{}'", s)))
    }
}

impl TryFrom<String> for LogicalType {
    type Error = MigrateError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scalars() {
        assert_eq!("i32".parse::<LogicalType>().unwrap(), LogicalType::Int32);
        assert_eq!("String".parse::<LogicalType>().unwrap(), LogicalType::String);
        assert!("widget".parse::<LogicalType>().is_err());
    }

    #[test]
    fn test_parse_containers() {
        assert_eq!(
            "i32[][]".parse::<LogicalType>().unwrap(),
            LogicalType::array(LogicalType::array(LogicalType::Int32))
        );
        assert_eq!(
            "list<string>".parse::<LogicalType>().unwrap(),
            LogicalType::list(LogicalType::String)
        );
    }

    #[test]
    fn test_display_round_trips_names() {
        let t = LogicalType::list(LogicalType::array(LogicalType::Uuid));
        assert_eq!(t.to_string(), "list<uuid[]>");
        assert_eq!(t.to_string().parse::<LogicalType>().unwrap(), t);
    }

    #[test]
    fn test_element_type() {
        let t = LogicalType::array(LogicalType::Int64);
        assert_eq!(t.element_type(), Some(&LogicalType::Int64));
        assert_eq!(LogicalType::Int64.element_type(), None);
    }
}
