//! PostgreSQL migrations SQL generator.
//!
//! Overrides the generic statement shapes where PostgreSQL differs:
//! system columns, storage parameters, comments, serial columns backed by
//! owned sequences, databases and extensions running outside transactions,
//! and version-dependent syntax.

use std::borrow::Cow;
use std::sync::Arc;

use tracing::{debug, info};

use crate::config::{GeneratorConfig, PostgresVersion};
use crate::core::annotations::{Annotations, ValueGenerationStrategy};
use crate::core::identifier::MAX_IDENTIFIER_LENGTH;
use crate::core::operations::*;
use crate::core::traits::Dialect;
use crate::core::value::quote_literal;
use crate::core::Model;
use crate::error::{MigrateError, Result};
use crate::migrations::{generic, MigrationCommandListBuilder, MigrationsSqlGenerator};
use crate::typemap::{is_integer_store_type, LogicalType, TypeMappingSource};

use super::dialect::PostgresDialect;

/// Columns PostgreSQL adds to every table. They never appear in user DDL.
pub const SYSTEM_COLUMNS: &[&str] = &["oid", "tableoid", "xmin", "cmin", "xmax", "cmax", "ctid"];

/// Whether `name` is one of [`SYSTEM_COLUMNS`].
pub fn is_system_column(name: &str) -> bool {
    SYSTEM_COLUMNS.contains(&name)
}

/// Schema-scoped object kinds that can be renamed and moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Table,
    Sequence,
    Index,
}

impl ObjectKind {
    pub fn as_sql(self) -> &'static str {
        match self {
            ObjectKind::Table => "TABLE",
            ObjectKind::Sequence => "SEQUENCE",
            ObjectKind::Index => "INDEX",
        }
    }
}

/// Generates PostgreSQL DDL for migration operations.
#[derive(Debug, Clone)]
pub struct PostgresMigrationsSqlGenerator {
    config: GeneratorConfig,
    version: PostgresVersion,
    dialect: PostgresDialect,
    type_mappings: Arc<TypeMappingSource>,
}

impl Default for PostgresMigrationsSqlGenerator {
    fn default() -> Self {
        let config = GeneratorConfig::default();
        Self {
            version: PostgresVersion::default(),
            dialect: PostgresDialect::with_terminator(config.statement_terminator.clone()),
            type_mappings: Arc::new(TypeMappingSource::new()),
            config,
        }
    }
}

impl PostgresMigrationsSqlGenerator {
    /// Create a generator with its own type mapping source.
    pub fn new(config: GeneratorConfig) -> Result<Self> {
        Self::with_type_mappings(config, Arc::new(TypeMappingSource::new()))
    }

    /// Create a generator sharing an existing type mapping source.
    pub fn with_type_mappings(
        config: GeneratorConfig,
        type_mappings: Arc<TypeMappingSource>,
    ) -> Result<Self> {
        config.validate()?;
        let version = config.version();
        info!(
            "PostgreSQL generator targeting server {} (default schema '{}')",
            version, config.default_schema
        );
        Ok(Self {
            version,
            dialect: PostgresDialect::with_terminator(config.statement_terminator.clone()),
            type_mappings,
            config,
        })
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn version(&self) -> PostgresVersion {
        self.version
    }

    fn terminator(&self) -> &str {
        self.dialect.statement_terminator()
    }

    /// Append `ALTER <kind> <name> RENAME TO <new_name>` and a terminator.
    pub fn rename(
        &self,
        schema: Option<&str>,
        name: &str,
        new_name: &str,
        kind: ObjectKind,
        builder: &mut MigrationCommandListBuilder,
    ) -> Result<()> {
        builder
            .append("ALTER ")
            .append(kind.as_sql())
            .append(" ")
            .append(self.delimit(name, schema)?)
            .append(" RENAME TO ")
            .append(self.delimit(new_name, None)?)
            .append_line(self.terminator());
        Ok(())
    }

    /// Append `ALTER <kind> <name> SET SCHEMA <new_schema>` and a terminator.
    pub fn transfer(
        &self,
        new_schema: &str,
        schema: Option<&str>,
        name: &str,
        kind: ObjectKind,
        builder: &mut MigrationCommandListBuilder,
    ) -> Result<()> {
        builder
            .append("ALTER ")
            .append(kind.as_sql())
            .append(" ")
            .append(self.delimit(name, schema)?)
            .append(" SET SCHEMA ")
            .append(self.delimit(new_schema, None)?)
            .append_line(self.terminator());
        Ok(())
    }

    /// Rename first (qualified with the old schema), then move the renamed
    /// object. Emits nothing, not even a boundary, when neither applies.
    fn rename_and_transfer(
        &self,
        operation: &RenameOperation,
        kind: ObjectKind,
        builder: &mut MigrationCommandListBuilder,
    ) -> Result<()> {
        let schema = operation.schema.as_deref();
        let mut name = operation.name.as_str();
        let mut emitted = false;

        if let Some(new_name) = operation.new_name.as_deref() {
            if new_name != name {
                self.rename(schema, name, new_name, kind, builder)?;
                name = new_name;
                emitted = true;
            }
        }

        if let Some(new_schema) = operation.new_schema.as_deref() {
            if Some(new_schema) != schema {
                self.transfer(new_schema, schema, name, kind, builder)?;
                emitted = true;
            }
        }

        if emitted {
            self.end_statement(builder, false);
        } else {
            debug!("Rename of {} '{}' is a no-op", kind.as_sql(), operation.name);
        }
        Ok(())
    }

    fn comment_on_column(
        &self,
        table: &str,
        column: &str,
        comment: Option<&str>,
        builder: &mut MigrationCommandListBuilder,
    ) -> Result<()> {
        builder
            .append("COMMENT ON COLUMN ")
            .append(table)
            .append(".")
            .append(self.delimit(column, None)?)
            .append(" IS ")
            .append(comment.map_or_else(|| "NULL".to_string(), quote_literal));
        Ok(())
    }

    fn comment_on_table(
        &self,
        table: &str,
        comment: Option<&str>,
        builder: &mut MigrationCommandListBuilder,
    ) {
        builder
            .append("COMMENT ON TABLE ")
            .append(table)
            .append(" IS ")
            .append(comment.map_or_else(|| "NULL".to_string(), quote_literal));
    }

    fn require_version(&self, major: u32, minor: u32, feature: &str) -> Result<()> {
        if self.version.at_least(major, minor) {
            Ok(())
        } else {
            Err(MigrateError::Unsupported(format!(
                "{} requires PostgreSQL {}.{} or later (configured: {})",
                feature, major, minor, self.version
            )))
        }
    }

    fn identity_clause(strategy: ValueGenerationStrategy) -> &'static str {
        match strategy {
            ValueGenerationStrategy::IdentityAlwaysColumn => "GENERATED ALWAYS AS IDENTITY",
            _ => "GENERATED BY DEFAULT AS IDENTITY",
        }
    }
}

/// `serial` pseudo-type for an integer store type.
fn serial_type(store_type: &str) -> Option<&'static str> {
    match store_type.to_ascii_lowercase().as_str() {
        "smallint" | "int2" => Some("smallserial"),
        "integer" | "int" | "int4" => Some("serial"),
        "bigint" | "int8" => Some("bigserial"),
        _ => None,
    }
}

/// Name of the sequence backing a serial column, `{table}_{column}_seq`.
///
/// Like PostgreSQL's own serial naming, the longer of the two parts is
/// shortened until the whole name fits in [`MAX_IDENTIFIER_LENGTH`] bytes.
fn serial_sequence_name(table: &str, column: &str) -> String {
    const SUFFIX: &str = "_seq";
    let available = MAX_IDENTIFIER_LENGTH - SUFFIX.len() - 1;

    let (mut table_len, mut column_len) = (table.len(), column.len());
    while table_len + column_len > available {
        if table_len > column_len {
            table_len -= 1;
        } else {
            column_len -= 1;
        }
    }

    format!(
        "{}_{}{}",
        clip_to_char_boundary(table, table_len),
        clip_to_char_boundary(column, column_len),
        SUFFIX
    )
}

/// Longest prefix of `s` no longer than `len` bytes that ends on a char boundary.
fn clip_to_char_boundary(s: &str, mut len: usize) -> &str {
    while !s.is_char_boundary(len) {
        len -= 1;
    }
    &s[..len]
}

/// Logical type of a sequence backing an integer column.
fn sequence_logical_type(store_type: &str) -> LogicalType {
    match store_type.to_ascii_lowercase().as_str() {
        "smallint" | "int2" => LogicalType::Int16,
        "integer" | "int" | "int4" => LogicalType::Int32,
        _ => LogicalType::Int64,
    }
}

impl MigrationsSqlGenerator for PostgresMigrationsSqlGenerator {
    fn dialect(&self) -> &dyn Dialect {
        &self.dialect
    }

    fn type_mappings(&self) -> &TypeMappingSource {
        &self.type_mappings
    }

    fn create_table(
        &self,
        operation: &CreateTableOperation,
        model: Option<&Model>,
        builder: &mut MigrationCommandListBuilder,
        terminate: bool,
    ) -> Result<()> {
        let annotations = Annotations::parse(&operation.annotations)?;

        // Keys and constraints are carried over untouched
        let operation: Cow<'_, CreateTableOperation> =
            if operation.columns.iter().any(|c| is_system_column(&c.name)) {
                let mut filtered = operation.clone();
                filtered.columns.retain(|c| {
                    let system = is_system_column(&c.name);
                    if system {
                        debug!("Skipping system column '{}' on '{}'", c.name, operation.name);
                    }
                    !system
                });
                Cow::Owned(filtered)
            } else {
                Cow::Borrowed(operation)
            };

        let column_comments = operation
            .columns
            .iter()
            .map(|c| Ok((c.name.as_str(), Annotations::parse(&c.annotations)?.comment)))
            .collect::<Result<Vec<_>>>()?;

        let table = self.delimit(&operation.name, operation.schema.as_deref())?;

        builder.append("CREATE ");
        if annotations.unlogged {
            builder.append("UNLOGGED ");
        }
        builder.append("TABLE ").append(&table);
        generic::table_elements(self, &operation, model, builder)?;

        if let Some(interleave) = &annotations.interleave_in_parent {
            let prefix = self.dialect.column_list(&interleave.prefix_columns)?;
            builder
                .append_line("")
                .append("INTERLEAVE IN PARENT ")
                .append(self.delimit(
                    &interleave.parent_table,
                    interleave.parent_schema.as_deref(),
                )?)
                .append(" (")
                .append(prefix)
                .append(")");
        }

        if !annotations.storage_parameters.is_empty() {
            builder
                .append_line("")
                .append("WITH (")
                .append(annotations.storage_parameters.to_sql())
                .append(")");
        }

        if let Some(comment) = annotations.comment.as_deref() {
            builder.append_line(self.terminator());
            self.comment_on_table(&table, Some(comment), builder);
        }

        for (column, comment) in &column_comments {
            if let Some(comment) = comment.as_deref() {
                builder.append_line(self.terminator());
                self.comment_on_column(&table, column, Some(comment), builder)?;
            }
        }

        if terminate {
            generic::terminate(self, builder, false);
        }
        Ok(())
    }

    fn alter_table(
        &self,
        operation: &AlterTableOperation,
        _model: Option<&Model>,
        builder: &mut MigrationCommandListBuilder,
    ) -> Result<()> {
        let new = Annotations::parse(&operation.annotations)?;
        let old = Annotations::parse(&operation.old_table.annotations)?;
        let table = self.delimit(&operation.name, operation.schema.as_deref())?;
        let mut emitted = false;

        if new.unlogged != old.unlogged {
            builder
                .append("ALTER TABLE ")
                .append(&table)
                .append(if new.unlogged { " SET UNLOGGED" } else { " SET LOGGED" })
                .append_line(self.terminator());
            emitted = true;
        }

        let changed = new.storage_parameters.changed_from(&old.storage_parameters);
        if !changed.is_empty() {
            builder
                .append("ALTER TABLE ")
                .append(&table)
                .append(" SET (")
                .append(crate::core::annotations::render_pairs(changed))
                .append(")")
                .append_line(self.terminator());
            emitted = true;
        }

        let removed = new.storage_parameters.removed_from(&old.storage_parameters);
        if !removed.is_empty() {
            builder
                .append("ALTER TABLE ")
                .append(&table)
                .append(" RESET (")
                .append(removed.join(", "))
                .append(")")
                .append_line(self.terminator());
            emitted = true;
        }

        if new.comment != old.comment {
            self.comment_on_table(&table, new.comment.as_deref(), builder);
            builder.append_line(self.terminator());
            emitted = true;
        }

        if emitted {
            self.end_statement(builder, false);
        } else {
            debug!("No changes for alter_table on '{}'", operation.name);
        }
        Ok(())
    }

    fn add_column(
        &self,
        operation: &AddColumnOperation,
        model: Option<&Model>,
        builder: &mut MigrationCommandListBuilder,
        terminate: bool,
    ) -> Result<()> {
        if is_system_column(&operation.column.name) {
            debug!(
                "Skipping add_column of system column '{}' on '{}'",
                operation.column.name, operation.table
            );
            return Ok(());
        }

        let annotations = Annotations::parse(&operation.column.annotations)?;
        generic::add_column(self, operation, model, builder, false)?;

        if let Some(comment) = annotations.comment.as_deref() {
            let table = self.delimit(&operation.table, operation.schema.as_deref())?;
            builder.append_line(self.terminator());
            self.comment_on_column(&table, &operation.column.name, Some(comment), builder)?;
        }

        if terminate {
            generic::terminate(self, builder, false);
        }
        Ok(())
    }

    fn drop_column(
        &self,
        operation: &DropColumnOperation,
        model: Option<&Model>,
        builder: &mut MigrationCommandListBuilder,
        terminate: bool,
    ) -> Result<()> {
        if is_system_column(&operation.name) {
            debug!(
                "Skipping drop_column of system column '{}' on '{}'",
                operation.name, operation.table
            );
            return Ok(());
        }
        generic::drop_column(self, operation, model, builder, terminate)
    }

    fn alter_column(
        &self,
        operation: &AlterColumnOperation,
        model: Option<&Model>,
        builder: &mut MigrationCommandListBuilder,
    ) -> Result<()> {
        let annotations = Annotations::parse(&operation.column.annotations)?;
        let old_annotations = Annotations::parse(&operation.old_column.annotations)?;

        if is_system_column(&operation.column.name) {
            debug!(
                "Skipping alter_column of system column '{}' on '{}'",
                operation.column.name, operation.table
            );
            return Ok(());
        }

        let schema = operation.schema.as_deref();
        let column = &operation.column;
        let strategy = annotations.value_generation_strategy;
        let old_strategy = old_annotations.value_generation_strategy;

        // Everything that can fail is settled before the first append
        let column_type = self.column_type(schema, &operation.table, column, model)?;
        if strategy.is_identity() || old_strategy.is_identity() {
            self.require_version(10, 0, "Identity columns")?;
        }
        let table = self.delimit(&operation.table, schema)?;
        let alter = format!(
            "ALTER TABLE {} ALTER COLUMN {}",
            table,
            self.delimit(&column.name, None)?
        );

        let mut default_value = column.default_value.as_ref();
        let mut default_value_sql = column.default_value_sql.clone();
        let mut owned_sequence = None;

        if strategy == ValueGenerationStrategy::SerialColumn && is_integer_store_type(&column_type)
        {
            let sequence_name = serial_sequence_name(&operation.table, &column.name);
            let sequence = self.delimit(&sequence_name, schema)?;
            let create_sequence = CreateSequenceOperation {
                name: sequence_name,
                schema: operation.schema.clone(),
                clr_type: sequence_logical_type(&column_type),
                ..CreateSequenceOperation::default()
            };
            self.create_sequence(&create_sequence, model, builder, false)?;
            builder.append_line(self.terminator());

            debug!("Column {} now backed by sequence {}", alter, sequence);
            default_value = None;
            default_value_sql = Some(format!("nextval({})", quote_literal(&sequence)));
            owned_sequence = Some(sequence);
        }

        builder
            .append(&alter)
            .append(" TYPE ")
            .append(&column_type)
            .append_line(self.terminator());

        builder
            .append(&alter)
            .append(if column.nullable {
                " DROP NOT NULL"
            } else {
                " SET NOT NULL"
            })
            .append_line(self.terminator());

        builder.append(&alter);
        if default_value.is_some() || default_value_sql.is_some() {
            builder.append(" SET");
            self.default_value(
                default_value,
                default_value_sql.as_deref(),
                &column_type,
                builder,
            );
        } else {
            builder.append(" DROP DEFAULT");
        }
        builder.append_line(self.terminator());

        if let Some(sequence) = owned_sequence {
            builder
                .append("ALTER SEQUENCE ")
                .append(sequence)
                .append(" OWNED BY ")
                .append(&table)
                .append(".")
                .append(self.delimit(&column.name, None)?)
                .append_line(self.terminator());
        }

        if strategy.is_identity() && strategy != old_strategy {
            if old_strategy.is_identity() {
                builder.append(&alter).append(match strategy {
                    ValueGenerationStrategy::IdentityAlwaysColumn => " SET GENERATED ALWAYS",
                    _ => " SET GENERATED BY DEFAULT",
                });
            } else {
                builder
                    .append(&alter)
                    .append(" ADD ")
                    .append(Self::identity_clause(strategy));
            }
            builder.append_line(self.terminator());
        } else if old_strategy.is_identity() && !strategy.is_identity() {
            builder
                .append(&alter)
                .append(" DROP IDENTITY")
                .append_line(self.terminator());
        }

        if annotations.comment != old_annotations.comment {
            self.comment_on_column(&table, &column.name, annotations.comment.as_deref(), builder)?;
            builder.append_line(self.terminator());
        }

        self.end_statement(builder, false);
        Ok(())
    }

    fn rename_table(
        &self,
        operation: &RenameOperation,
        _model: Option<&Model>,
        builder: &mut MigrationCommandListBuilder,
    ) -> Result<()> {
        self.rename_and_transfer(operation, ObjectKind::Table, builder)
    }

    fn rename_sequence(
        &self,
        operation: &RenameOperation,
        _model: Option<&Model>,
        builder: &mut MigrationCommandListBuilder,
    ) -> Result<()> {
        self.rename_and_transfer(operation, ObjectKind::Sequence, builder)
    }

    fn rename_index(
        &self,
        operation: &RenameOperation,
        _model: Option<&Model>,
        builder: &mut MigrationCommandListBuilder,
    ) -> Result<()> {
        self.rename_and_transfer(operation, ObjectKind::Index, builder)
    }

    fn rename_column(
        &self,
        operation: &RenameColumnOperation,
        _model: Option<&Model>,
        builder: &mut MigrationCommandListBuilder,
    ) -> Result<()> {
        builder
            .append("ALTER TABLE ")
            .append(self.delimit(&operation.table, operation.schema.as_deref())?)
            .append(" RENAME COLUMN ")
            .append(self.delimit(&operation.name, None)?)
            .append(" TO ")
            .append(self.delimit(&operation.new_name, None)?);
        generic::terminate(self, builder, false);
        Ok(())
    }

    fn create_index(
        &self,
        operation: &CreateIndexOperation,
        _model: Option<&Model>,
        builder: &mut MigrationCommandListBuilder,
        terminate: bool,
    ) -> Result<()> {
        let annotations = Annotations::parse(&operation.annotations)?;

        builder.append("CREATE ");
        if operation.unique {
            builder.append("UNIQUE ");
        }
        builder
            .append("INDEX ")
            .append(self.delimit(&operation.name, None)?)
            .append(" ON ")
            .append(self.delimit(&operation.table, operation.schema.as_deref())?);

        if let Some(method) = annotations.index_method.as_deref() {
            builder.append(" USING ").append(method);
        }

        builder
            .append(" (")
            .append(self.dialect.column_list(&operation.columns)?)
            .append(")");
        generic::index_filter(operation, builder);

        if terminate {
            generic::terminate(self, builder, false);
        }
        Ok(())
    }

    fn drop_index(
        &self,
        operation: &DropIndexOperation,
        _model: Option<&Model>,
        builder: &mut MigrationCommandListBuilder,
    ) -> Result<()> {
        builder
            .append("DROP INDEX ")
            .append(self.delimit(&operation.name, operation.schema.as_deref())?);
        generic::terminate(self, builder, false);
        Ok(())
    }

    fn ensure_schema(
        &self,
        operation: &SchemaOperation,
        _model: Option<&Model>,
        builder: &mut MigrationCommandListBuilder,
    ) -> Result<()> {
        // The default schema always exists; older servers lack
        // CREATE SCHEMA IF NOT EXISTS, so it is never created
        if operation.name == self.config.default_schema {
            debug!("Schema '{}' is the default schema, not ensured", operation.name);
            return Ok(());
        }

        builder
            .append("CREATE SCHEMA IF NOT EXISTS ")
            .append(self.delimit(&operation.name, None)?);
        generic::terminate(self, builder, false);
        Ok(())
    }

    fn create_database(
        &self,
        operation: &CreateDatabaseOperation,
        _model: Option<&Model>,
        builder: &mut MigrationCommandListBuilder,
    ) -> Result<()> {
        builder
            .append("CREATE DATABASE ")
            .append(self.delimit(&operation.name, None)?);

        if let Some(template) = operation.template.as_deref() {
            builder
                .append(" TEMPLATE ")
                .append(self.delimit(template, None)?);
        }
        if let Some(tablespace) = operation.tablespace.as_deref() {
            builder
                .append(" TABLESPACE ")
                .append(self.delimit(tablespace, None)?);
        }

        generic::terminate(self, builder, true);
        Ok(())
    }

    fn drop_database(
        &self,
        operation: &DropDatabaseOperation,
        _model: Option<&Model>,
        builder: &mut MigrationCommandListBuilder,
    ) -> Result<()> {
        let database = self.delimit(&operation.name, None)?;

        builder
            .append("REVOKE CONNECT ON DATABASE ")
            .append(&database)
            .append(" FROM PUBLIC");
        generic::terminate(self, builder, true);

        // pg_stat_activity.procpid was renamed to pid in 9.2
        let pid_column = if self.version.at_least(9, 2) {
            "pid"
        } else {
            "procpid"
        };
        builder
            .append("SELECT pg_terminate_backend(pg_stat_activity.")
            .append(pid_column)
            .append(") FROM pg_stat_activity WHERE datname = ")
            .append(quote_literal(&operation.name));
        generic::terminate(self, builder, true);

        builder.append("DROP DATABASE ").append(&database);
        generic::terminate(self, builder, true);
        Ok(())
    }

    fn alter_database(
        &self,
        operation: &AlterDatabaseOperation,
        _model: Option<&Model>,
        builder: &mut MigrationCommandListBuilder,
    ) -> Result<()> {
        let annotations = Annotations::parse(&operation.annotations)?;

        for extension in &annotations.extensions {
            builder
                .append("CREATE EXTENSION IF NOT EXISTS ")
                .append(self.delimit(&extension.name, None)?);
            if let Some(schema) = extension.schema.as_deref() {
                builder
                    .append(" SCHEMA ")
                    .append(self.delimit(schema, None)?);
            }
            if let Some(version) = extension.version.as_deref() {
                builder
                    .append(" VERSION ")
                    .append(self.delimit(version, None)?);
            }
            generic::terminate(self, builder, true);
        }
        Ok(())
    }

    fn column_definition(
        &self,
        schema: Option<&str>,
        table: &str,
        column: &ColumnDefinition,
        model: Option<&Model>,
        builder: &mut MigrationCommandListBuilder,
    ) -> Result<()> {
        let annotations = Annotations::parse(&column.annotations)?;
        let strategy = annotations.value_generation_strategy;

        if column.computed_column_sql.is_some() {
            self.require_version(12, 0, "Generated columns")?;
        }
        if strategy.is_identity() {
            self.require_version(10, 0, "Identity columns")?;
        }

        let mut column_type = self.column_type(schema, table, column, model)?;
        if strategy == ValueGenerationStrategy::SerialColumn {
            if let Some(serial) = serial_type(&column_type) {
                column_type = serial.to_string();
            }
        }

        if strategy.is_identity() {
            let mut identity = column.clone();
            identity.default_value = None;
            identity.default_value_sql = None;
            generic::column_definition_with_type(self, &identity, &column_type, builder)?;
            builder.append(" ").append(Self::identity_clause(strategy));
            return Ok(());
        }

        generic::column_definition_with_type(self, column, &column_type, builder)
    }

    fn sequence_type(&self, operation: &CreateSequenceOperation) -> Result<Option<String>> {
        // CREATE SEQUENCE ... AS arrived in PostgreSQL 10
        if !self.version.at_least(10, 0) {
            return Ok(None);
        }
        generic::sequence_type(self, operation)
    }
}
