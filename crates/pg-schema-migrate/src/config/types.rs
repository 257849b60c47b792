//! Configuration type definitions for the SQL generator.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::MigrateError;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Target server version (default: "12.0").
    ///
    /// Older servers get compatibility output: `procpid` instead of `pid`
    /// when terminating backends, no `AS <type>` on sequences.
    #[serde(default = "default_postgres_version")]
    pub postgres_version: String,

    /// Schema that always exists and is never created (default: "public").
    #[serde(default = "default_public_schema")]
    pub default_schema: String,

    /// Token appended after every statement (default: ";").
    #[serde(default = "default_terminator")]
    pub statement_terminator: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            postgres_version: default_postgres_version(),
            default_schema: default_public_schema(),
            statement_terminator: default_terminator(),
        }
    }
}

impl GeneratorConfig {
    /// Parsed server version. Falls back to the default when unparsable;
    /// `validate()` rejects such configs before they get here.
    pub fn version(&self) -> PostgresVersion {
        self.postgres_version.parse().unwrap_or_default()
    }

    /// Config targeting a specific server version, other fields default.
    pub fn for_version(major: u32, minor: u32) -> Self {
        Self {
            postgres_version: PostgresVersion::new(major, minor).to_string(),
            ..Self::default()
        }
    }
}

/// PostgreSQL server version (major.minor).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PostgresVersion {
    pub major: u32,
    pub minor: u32,
}

impl PostgresVersion {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Check whether this version is at least `major.minor`.
    pub fn at_least(&self, major: u32, minor: u32) -> bool {
        *self >= PostgresVersion::new(major, minor)
    }
}

impl Default for PostgresVersion {
    fn default() -> Self {
        PostgresVersion::new(12, 0)
    }
}

impl fmt::Display for PostgresVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for PostgresVersion {
    type Err = MigrateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || MigrateError::Config(format!("invalid postgres_version '{}'", s));

        let mut parts = s.trim().splitn(2, '.');
        let major = parts
            .next()
            .filter(|p| !p.is_empty())
            .ok_or_else(invalid)?
            .parse::<u32>()
            .map_err(|_| invalid())?;
        let minor = match parts.next() {
            Some(p) => p.parse::<u32>().map_err(|_| invalid())?,
            None => 0,
        };

        Ok(PostgresVersion::new(major, minor))
    }
}

fn default_postgres_version() -> String {
    "12.0".to_string()
}

fn default_public_schema() -> String {
    "public".to_string()
}

fn default_terminator() -> String {
    ";".to_string()
}
