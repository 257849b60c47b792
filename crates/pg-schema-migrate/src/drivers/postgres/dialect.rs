//! PostgreSQL SQL dialect (Strategy pattern).
//!
//! Provides PostgreSQL-specific identifier quoting and statement termination.

use crate::core::traits::Dialect;

/// PostgreSQL dialect implementation.
#[derive(Debug, Clone)]
pub struct PostgresDialect {
    terminator: String,
}

impl Default for PostgresDialect {
    fn default() -> Self {
        Self::new()
    }
}

impl PostgresDialect {
    /// Create a new PostgreSQL dialect instance terminating statements with `;`.
    pub fn new() -> Self {
        Self::with_terminator(";")
    }

    /// Create a dialect with a custom statement terminator.
    pub fn with_terminator(terminator: impl Into<String>) -> Self {
        Self {
            terminator: terminator.into(),
        }
    }
}

impl Dialect for PostgresDialect {
    fn name(&self) -> &str {
        "postgres"
    }

    fn quote_ident(&self, name: &str) -> String {
        // Embedded double quotes are doubled
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    fn statement_terminator(&self) -> &str {
        &self.terminator
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_ident() {
        let dialect = PostgresDialect::new();
        assert_eq!(dialect.quote_ident("name"), "\"name\"");
        assert_eq!(dialect.quote_ident("table\"name"), "\"table\"\"name\"");
        assert_eq!(dialect.quote_ident("Users"), "\"Users\"");
    }

    #[test]
    fn test_quote_ident_keeps_injection_inside_quotes() {
        let dialect = PostgresDialect::new();
        assert_eq!(
            dialect.quote_ident("Robert\"); DROP TABLE Students;--"),
            "\"Robert\"\"); DROP TABLE Students;--\""
        );
    }

    #[test]
    fn test_delimit_identifier() {
        let dialect = PostgresDialect::new();
        assert_eq!(
            dialect.delimit_identifier("users", Some("public")).unwrap(),
            "\"public\".\"users\""
        );
        assert!(dialect.delimit_identifier(&"x".repeat(64), None).is_err());
    }

    #[test]
    fn test_statement_terminator() {
        assert_eq!(PostgresDialect::new().statement_terminator(), ";");
        assert_eq!(
            PostgresDialect::with_terminator("\n;").statement_terminator(),
            "\n;"
        );
    }
}
