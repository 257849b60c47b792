//! Core traits for dialect-specific SQL generation.
//!
//! - [`Dialect`]: SQL syntax strategy (identifier quoting, statement terminator)
//!
//! The migration generators in [`crate::migrations`] consume a `Dialect` for
//! everything that is pure syntax, and keep statement shapes to themselves.
//!
//! # Design Patterns
//!
//! - **Strategy**: `Dialect` provides interchangeable syntax rules
//! - **Template Method**: default method implementations define algorithm skeletons

use crate::error::Result;

use super::identifier::validate_identifier;

/// SQL syntax strategy for different database engines.
pub trait Dialect: Send + Sync {
    /// Get the dialect identifier (e.g., "postgres").
    fn name(&self) -> &str;

    /// Quote an identifier (table name, column name, etc.).
    ///
    /// PostgreSQL: `"identifier"`
    fn quote_ident(&self, name: &str) -> String;

    /// Token that terminates one SQL statement.
    fn statement_terminator(&self) -> &str;

    /// Validate and quote a name, qualifying it with the schema when given.
    ///
    /// This is a template method built on [`quote_ident`](Self::quote_ident).
    fn delimit_identifier(&self, name: &str, schema: Option<&str>) -> Result<String> {
        validate_identifier(name)?;
        match schema {
            Some(schema) => {
                validate_identifier(schema)?;
                Ok(format!(
                    "{}.{}",
                    self.quote_ident(schema),
                    self.quote_ident(name)
                ))
            }
            None => Ok(self.quote_ident(name)),
        }
    }

    /// Quote and comma-join a column list.
    fn column_list(&self, columns: &[String]) -> Result<String> {
        Ok(columns
            .iter()
            .map(|c| self.delimit_identifier(c, None))
            .collect::<Result<Vec<_>>>()?
            .join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Brackets;

    impl Dialect for Brackets {
        fn name(&self) -> &str {
            "brackets"
        }

        fn quote_ident(&self, name: &str) -> String {
            format!("[{}]", name)
        }

        fn statement_terminator(&self) -> &str {
            ";"
        }
    }

    #[test]
    fn test_delimit_identifier_template() {
        let d = Brackets;
        assert_eq!(d.delimit_identifier("t", None).unwrap(), "[t]");
        assert_eq!(d.delimit_identifier("t", Some("s")).unwrap(), "[s].[t]");
        assert!(d.delimit_identifier("", None).is_err());
        assert!(d.delimit_identifier("t", Some("")).is_err());
    }

    #[test]
    fn test_column_list() {
        let d = Brackets;
        let cols = vec!["a".to_string(), "b".to_string()];
        assert_eq!(d.column_list(&cols).unwrap(), "[a], [b]");
        assert_eq!(d.column_list(&[]).unwrap(), "");
    }
}
