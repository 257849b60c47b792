//! Target schema model consulted for column types.
//!
//! When an operation names a column without an explicit store type, the
//! generator looks the column up in the model the migration is heading
//! towards before falling back to the logical type mapping.

use std::path::Path;

use serde::Deserialize;

use crate::error::Result;

/// Column metadata in the target model.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ModelColumn {
    pub name: String,
    pub column_type: Option<String>,
}

/// Table metadata in the target model.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ModelTable {
    pub schema: Option<String>,
    pub name: String,
    pub columns: Vec<ModelColumn>,
}

/// Target schema model.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Model {
    pub tables: Vec<ModelTable>,
}

impl Model {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Find a table. A `None` schema matches tables without a schema.
    pub fn find_table(&self, schema: Option<&str>, name: &str) -> Option<&ModelTable> {
        self.tables
            .iter()
            .find(|t| t.name == name && t.schema.as_deref() == schema)
    }

    /// Store type of a column, if the model declares one.
    pub fn column_type(&self, schema: Option<&str>, table: &str, column: &str) -> Option<&str> {
        self.find_table(schema, table)?
            .columns
            .iter()
            .find(|c| c.name == column)?
            .column_type
            .as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> Model {
        serde_yaml::from_str(
            r#"
tables:
  - name: users
    columns:
      - name: id
        column_type: bigint
      - name: nickname
  - schema: audit
    name: users
    columns:
      - name: id
        column_type: uuid
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_column_type_lookup() {
        let model = model();
        assert_eq!(model.column_type(None, "users", "id"), Some("bigint"));
        assert_eq!(model.column_type(Some("audit"), "users", "id"), Some("uuid"));
        assert_eq!(model.column_type(None, "users", "nickname"), None);
        assert_eq!(model.column_type(None, "orders", "id"), None);
    }
}
