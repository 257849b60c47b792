//! Engine-agnostic migration operations.
//!
//! A migration is an ordered list of [`MigrationOperation`]s. Operations are
//! plain data: they can be built in Rust or deserialized from YAML/JSON, where
//! the `kind` field selects the variant:
//!
//! ```yaml
//! - kind: ensure_schema
//!   name: reporting
//! - kind: add_column
//!   schema: reporting
//!   table: events
//!   name: payload
//!   column_type: jsonb
//!   nullable: true
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::error::{MigrateError, Result};
use crate::typemap::LogicalType;

use super::annotations::RawAnnotations;
use super::identifier::validate_identifier;
use super::value::SqlValue;

/// A column as declared by CreateTable, AddColumn and AlterColumn.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ColumnDefinition {
    pub name: String,
    /// Logical type, used when no explicit `column_type` is given.
    pub clr_type: Option<LogicalType>,
    /// Explicit store type, e.g. `varchar(20)`.
    pub column_type: Option<String>,
    pub max_length: Option<u32>,
    pub fixed_length: bool,
    pub nullable: bool,
    pub default_value: Option<SqlValue>,
    pub default_value_sql: Option<String>,
    pub computed_column_sql: Option<String>,
    pub annotations: RawAnnotations,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_type(mut self, column_type: impl Into<String>) -> Self {
        self.column_type = Some(column_type.into());
        self
    }

    pub fn with_clr_type(mut self, clr_type: LogicalType) -> Self {
        self.clr_type = Some(clr_type);
        self
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn with_default(mut self, value: impl Into<SqlValue>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn with_default_sql(mut self, sql: impl Into<String>) -> Self {
        self.default_value_sql = Some(sql.into());
        self
    }

    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.annotations.insert(key, value);
        self
    }
}

/// Referential action for foreign keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferentialAction {
    #[default]
    NoAction,
    Restrict,
    Cascade,
    SetNull,
    SetDefault,
}

impl ReferentialAction {
    pub fn as_sql(self) -> &'static str {
        match self {
            ReferentialAction::NoAction => "NO ACTION",
            ReferentialAction::Restrict => "RESTRICT",
            ReferentialAction::Cascade => "CASCADE",
            ReferentialAction::SetNull => "SET NULL",
            ReferentialAction::SetDefault => "SET DEFAULT",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PrimaryKeyConstraint {
    pub name: Option<String>,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct UniqueConstraint {
    pub name: Option<String>,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ForeignKeyConstraint {
    pub name: Option<String>,
    pub columns: Vec<String>,
    pub principal_schema: Option<String>,
    pub principal_table: String,
    /// Empty means the principal's primary key.
    pub principal_columns: Vec<String>,
    pub on_delete: ReferentialAction,
    pub on_update: ReferentialAction,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CreateTableOperation {
    pub name: String,
    pub schema: Option<String>,
    pub columns: Vec<ColumnDefinition>,
    pub primary_key: Option<PrimaryKeyConstraint>,
    pub unique_constraints: Vec<UniqueConstraint>,
    pub foreign_keys: Vec<ForeignKeyConstraint>,
    pub annotations: RawAnnotations,
}

/// Annotation-only table snapshot used to diff AlterTable.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TableSnapshot {
    pub annotations: RawAnnotations,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AlterTableOperation {
    pub name: String,
    pub schema: Option<String>,
    pub annotations: RawAnnotations,
    pub old_table: TableSnapshot,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DropTableOperation {
    pub name: String,
    pub schema: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AddColumnOperation {
    pub schema: Option<String>,
    pub table: String,
    #[serde(flatten)]
    pub column: ColumnDefinition,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DropColumnOperation {
    pub name: String,
    pub schema: Option<String>,
    pub table: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AlterColumnOperation {
    pub schema: Option<String>,
    pub table: String,
    #[serde(flatten)]
    pub column: ColumnDefinition,
    pub old_column: ColumnDefinition,
}

/// Rename and/or move a schema-scoped object.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RenameOperation {
    pub name: String,
    pub schema: Option<String>,
    pub new_name: Option<String>,
    pub new_schema: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RenameColumnOperation {
    pub schema: Option<String>,
    pub table: String,
    pub name: String,
    pub new_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CreateIndexOperation {
    pub name: String,
    pub schema: Option<String>,
    pub table: String,
    pub columns: Vec<String>,
    pub unique: bool,
    /// Partial index predicate, emitted verbatim after `WHERE`.
    pub filter: Option<String>,
    pub annotations: RawAnnotations,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DropIndexOperation {
    pub name: String,
    pub schema: Option<String>,
    pub table: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SchemaOperation {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CreateDatabaseOperation {
    pub name: String,
    pub template: Option<String>,
    pub tablespace: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DropDatabaseOperation {
    pub name: String,
}

/// Database-level annotations; `Postgres:Extension:*` keys request extensions.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AlterDatabaseOperation {
    pub annotations: RawAnnotations,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CreateSequenceOperation {
    pub name: String,
    pub schema: Option<String>,
    pub clr_type: LogicalType,
    pub start_value: i64,
    pub increment_by: i64,
    pub min_value: Option<i64>,
    pub max_value: Option<i64>,
    pub cyclic: bool,
}

impl Default for CreateSequenceOperation {
    fn default() -> Self {
        Self {
            name: String::new(),
            schema: None,
            clr_type: LogicalType::Int64,
            start_value: 1,
            increment_by: 1,
            min_value: None,
            max_value: None,
            cyclic: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AlterSequenceOperation {
    pub name: String,
    pub schema: Option<String>,
    pub increment_by: i64,
    pub min_value: Option<i64>,
    pub max_value: Option<i64>,
    pub cyclic: bool,
}

impl Default for AlterSequenceOperation {
    fn default() -> Self {
        Self {
            name: String::new(),
            schema: None,
            increment_by: 1,
            min_value: None,
            max_value: None,
            cyclic: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RestartSequenceOperation {
    pub name: String,
    pub schema: Option<String>,
    pub start_value: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DropSequenceOperation {
    pub name: String,
    pub schema: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AddPrimaryKeyOperation {
    pub schema: Option<String>,
    pub table: String,
    #[serde(flatten)]
    pub constraint: PrimaryKeyConstraint,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AddUniqueConstraintOperation {
    pub schema: Option<String>,
    pub table: String,
    #[serde(flatten)]
    pub constraint: UniqueConstraint,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AddForeignKeyOperation {
    pub schema: Option<String>,
    pub table: String,
    #[serde(flatten)]
    pub constraint: ForeignKeyConstraint,
}

/// Drop a named table constraint (primary key, foreign key or unique).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DropConstraintOperation {
    pub name: String,
    pub schema: Option<String>,
    pub table: String,
}

/// Raw SQL passed through unchanged.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SqlOperation {
    pub sql: String,
    pub suppress_transaction: bool,
}

/// One schema change.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MigrationOperation {
    CreateTable(CreateTableOperation),
    AlterTable(AlterTableOperation),
    DropTable(DropTableOperation),
    AddColumn(AddColumnOperation),
    DropColumn(DropColumnOperation),
    AlterColumn(AlterColumnOperation),
    RenameTable(RenameOperation),
    RenameColumn(RenameColumnOperation),
    RenameIndex(RenameOperation),
    RenameSequence(RenameOperation),
    CreateIndex(CreateIndexOperation),
    DropIndex(DropIndexOperation),
    EnsureSchema(SchemaOperation),
    DropSchema(SchemaOperation),
    CreateDatabase(CreateDatabaseOperation),
    DropDatabase(DropDatabaseOperation),
    AlterDatabase(AlterDatabaseOperation),
    CreateSequence(CreateSequenceOperation),
    AlterSequence(AlterSequenceOperation),
    RestartSequence(RestartSequenceOperation),
    DropSequence(DropSequenceOperation),
    AddPrimaryKey(AddPrimaryKeyOperation),
    DropPrimaryKey(DropConstraintOperation),
    AddForeignKey(AddForeignKeyOperation),
    DropForeignKey(DropConstraintOperation),
    AddUniqueConstraint(AddUniqueConstraintOperation),
    DropUniqueConstraint(DropConstraintOperation),
    Sql(SqlOperation),
}

impl MigrationOperation {
    /// Load an ordered operation list from a YAML file.
    pub fn load_list<P: AsRef<Path>>(path: P) -> Result<Vec<Self>> {
        let content = std::fs::read_to_string(path)?;
        Self::list_from_yaml(&content)
    }

    /// Parse an ordered operation list from a YAML sequence.
    pub fn list_from_yaml(yaml: &str) -> Result<Vec<Self>> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Operation kind as written in operation files.
    pub fn kind(&self) -> &'static str {
        match self {
            MigrationOperation::CreateTable(_) => "create_table",
            MigrationOperation::AlterTable(_) => "alter_table",
            MigrationOperation::DropTable(_) => "drop_table",
            MigrationOperation::AddColumn(_) => "add_column",
            MigrationOperation::DropColumn(_) => "drop_column",
            MigrationOperation::AlterColumn(_) => "alter_column",
            MigrationOperation::RenameTable(_) => "rename_table",
            MigrationOperation::RenameColumn(_) => "rename_column",
            MigrationOperation::RenameIndex(_) => "rename_index",
            MigrationOperation::RenameSequence(_) => "rename_sequence",
            MigrationOperation::CreateIndex(_) => "create_index",
            MigrationOperation::DropIndex(_) => "drop_index",
            MigrationOperation::EnsureSchema(_) => "ensure_schema",
            MigrationOperation::DropSchema(_) => "drop_schema",
            MigrationOperation::CreateDatabase(_) => "create_database",
            MigrationOperation::DropDatabase(_) => "drop_database",
            MigrationOperation::AlterDatabase(_) => "alter_database",
            MigrationOperation::CreateSequence(_) => "create_sequence",
            MigrationOperation::AlterSequence(_) => "alter_sequence",
            MigrationOperation::RestartSequence(_) => "restart_sequence",
            MigrationOperation::DropSequence(_) => "drop_sequence",
            MigrationOperation::AddPrimaryKey(_) => "add_primary_key",
            MigrationOperation::DropPrimaryKey(_) => "drop_primary_key",
            MigrationOperation::AddForeignKey(_) => "add_foreign_key",
            MigrationOperation::DropForeignKey(_) => "drop_foreign_key",
            MigrationOperation::AddUniqueConstraint(_) => "add_unique_constraint",
            MigrationOperation::DropUniqueConstraint(_) => "drop_unique_constraint",
            MigrationOperation::Sql(_) => "sql",
        }
    }

    /// Check required fields before any SQL is generated.
    ///
    /// # Errors
    ///
    /// Returns `MigrateError::InvalidArgument` naming the operation and field.
    pub fn validate(&self) -> Result<()> {
        let v = Validator { kind: self.kind() };
        match self {
            MigrationOperation::CreateTable(op) => {
                v.name("name", &op.name)?;
                v.schema(&op.schema)?;
                for column in &op.columns {
                    v.column(column)?;
                }
                if let Some(pk) = &op.primary_key {
                    v.optional("primary_key.name", &pk.name)?;
                    v.columns("primary_key.columns", &pk.columns)?;
                }
                for unique in &op.unique_constraints {
                    v.optional("unique_constraints.name", &unique.name)?;
                    v.columns("unique_constraints.columns", &unique.columns)?;
                }
                for fk in &op.foreign_keys {
                    v.foreign_key(fk)?;
                }
                Ok(())
            }
            MigrationOperation::AlterTable(op) => {
                v.name("name", &op.name)?;
                v.schema(&op.schema)
            }
            MigrationOperation::DropTable(op) => {
                v.name("name", &op.name)?;
                v.schema(&op.schema)
            }
            MigrationOperation::AddColumn(op) => {
                v.name("table", &op.table)?;
                v.schema(&op.schema)?;
                v.column(&op.column)
            }
            MigrationOperation::DropColumn(op) => {
                v.name("name", &op.name)?;
                v.name("table", &op.table)?;
                v.schema(&op.schema)
            }
            MigrationOperation::AlterColumn(op) => {
                v.name("table", &op.table)?;
                v.schema(&op.schema)?;
                v.column(&op.column)
            }
            MigrationOperation::RenameTable(op)
            | MigrationOperation::RenameIndex(op)
            | MigrationOperation::RenameSequence(op) => {
                v.name("name", &op.name)?;
                v.schema(&op.schema)?;
                v.optional("new_name", &op.new_name)?;
                v.optional("new_schema", &op.new_schema)
            }
            MigrationOperation::RenameColumn(op) => {
                v.name("table", &op.table)?;
                v.schema(&op.schema)?;
                v.name("name", &op.name)?;
                v.name("new_name", &op.new_name)
            }
            MigrationOperation::CreateIndex(op) => {
                v.name("name", &op.name)?;
                v.name("table", &op.table)?;
                v.schema(&op.schema)?;
                v.columns("columns", &op.columns)
            }
            MigrationOperation::DropIndex(op) => {
                v.name("name", &op.name)?;
                v.schema(&op.schema)
            }
            MigrationOperation::EnsureSchema(op) | MigrationOperation::DropSchema(op) => {
                v.name("name", &op.name)
            }
            MigrationOperation::CreateDatabase(op) => {
                v.name("name", &op.name)?;
                v.optional("template", &op.template)?;
                v.optional("tablespace", &op.tablespace)
            }
            MigrationOperation::DropDatabase(op) => v.name("name", &op.name),
            MigrationOperation::AlterDatabase(_) => Ok(()),
            MigrationOperation::CreateSequence(op) => {
                v.name("name", &op.name)?;
                v.schema(&op.schema)
            }
            MigrationOperation::AlterSequence(op) => {
                v.name("name", &op.name)?;
                v.schema(&op.schema)
            }
            MigrationOperation::RestartSequence(op) => {
                v.name("name", &op.name)?;
                v.schema(&op.schema)
            }
            MigrationOperation::DropSequence(op) => {
                v.name("name", &op.name)?;
                v.schema(&op.schema)
            }
            MigrationOperation::AddPrimaryKey(op) => {
                v.name("table", &op.table)?;
                v.schema(&op.schema)?;
                v.optional("name", &op.constraint.name)?;
                v.columns("columns", &op.constraint.columns)
            }
            MigrationOperation::AddUniqueConstraint(op) => {
                v.name("table", &op.table)?;
                v.schema(&op.schema)?;
                v.optional("name", &op.constraint.name)?;
                v.columns("columns", &op.constraint.columns)
            }
            MigrationOperation::AddForeignKey(op) => {
                v.name("table", &op.table)?;
                v.schema(&op.schema)?;
                v.foreign_key(&op.constraint)
            }
            MigrationOperation::DropPrimaryKey(op)
            | MigrationOperation::DropForeignKey(op)
            | MigrationOperation::DropUniqueConstraint(op) => {
                v.name("name", &op.name)?;
                v.name("table", &op.table)?;
                v.schema(&op.schema)
            }
            MigrationOperation::Sql(op) => {
                if op.sql.trim().is_empty() {
                    return Err(v.error("sql", "must not be empty".to_string()));
                }
                Ok(())
            }
        }
    }
}

struct Validator {
    kind: &'static str,
}

impl Validator {
    fn error(&self, field: &str, message: String) -> MigrateError {
        MigrateError::invalid_argument(self.kind, format!("{} {}", field, message))
    }

    fn name(&self, field: &str, value: &str) -> Result<()> {
        if value.trim().is_empty() {
            return Err(self.error(field, "is required".to_string()));
        }
        validate_identifier(value).map_err(|e| self.error(field, e.to_string()))
    }

    fn optional(&self, field: &str, value: &Option<String>) -> Result<()> {
        match value {
            Some(value) => self.name(field, value),
            None => Ok(()),
        }
    }

    fn schema(&self, schema: &Option<String>) -> Result<()> {
        self.optional("schema", schema)
    }

    fn columns(&self, field: &str, columns: &[String]) -> Result<()> {
        if columns.is_empty() {
            return Err(self.error(field, "must name at least one column".to_string()));
        }
        columns.iter().try_for_each(|c| self.name(field, c))
    }

    fn column(&self, column: &ColumnDefinition) -> Result<()> {
        self.name("column name", &column.name)
    }

    fn foreign_key(&self, fk: &ForeignKeyConstraint) -> Result<()> {
        self.optional("foreign_keys.name", &fk.name)?;
        self.columns("foreign_keys.columns", &fk.columns)?;
        self.name("foreign_keys.principal_table", &fk.principal_table)?;
        self.optional("foreign_keys.principal_schema", &fk.principal_schema)?;
        if !fk.principal_columns.is_empty() {
            self.columns("foreign_keys.principal_columns", &fk.principal_columns)?;
        }
        Ok(())
    }
}
