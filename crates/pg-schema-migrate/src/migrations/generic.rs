//! Engine-neutral statement shapes.
//!
//! These are the default bodies of [`MigrationsSqlGenerator`]'s methods.
//! Dialect overrides call them directly when they only need to add to the
//! base statement.

use tracing::debug;

use crate::core::operations::*;
use crate::core::value::SqlValue;
use crate::core::Model;
use crate::error::{MigrateError, Result};
use crate::typemap::{LogicalType, TypeMappingInfo};

use super::builder::MigrationCommandListBuilder;
use super::MigrationsSqlGenerator;

/// Route an operation to its generator method.
///
/// The match is exhaustive: a new operation variant does not compile until
/// it is routed here.
pub fn dispatch<G: MigrationsSqlGenerator + ?Sized>(
    gen: &G,
    operation: &MigrationOperation,
    model: Option<&Model>,
    builder: &mut MigrationCommandListBuilder,
) -> Result<()> {
    debug!("Generating SQL for {} operation", operation.kind());

    match operation {
        MigrationOperation::CreateTable(op) => gen.create_table(op, model, builder, true),
        MigrationOperation::AlterTable(op) => gen.alter_table(op, model, builder),
        MigrationOperation::DropTable(op) => gen.drop_table(op, model, builder),
        MigrationOperation::AddColumn(op) => gen.add_column(op, model, builder, true),
        MigrationOperation::DropColumn(op) => gen.drop_column(op, model, builder, true),
        MigrationOperation::AlterColumn(op) => gen.alter_column(op, model, builder),
        MigrationOperation::RenameTable(op) => gen.rename_table(op, model, builder),
        MigrationOperation::RenameColumn(op) => gen.rename_column(op, model, builder),
        MigrationOperation::RenameIndex(op) => gen.rename_index(op, model, builder),
        MigrationOperation::RenameSequence(op) => gen.rename_sequence(op, model, builder),
        MigrationOperation::CreateIndex(op) => gen.create_index(op, model, builder, true),
        MigrationOperation::DropIndex(op) => gen.drop_index(op, model, builder),
        MigrationOperation::EnsureSchema(op) => gen.ensure_schema(op, model, builder),
        MigrationOperation::DropSchema(op) => gen.drop_schema(op, model, builder),
        MigrationOperation::CreateDatabase(op) => gen.create_database(op, model, builder),
        MigrationOperation::DropDatabase(op) => gen.drop_database(op, model, builder),
        MigrationOperation::AlterDatabase(op) => gen.alter_database(op, model, builder),
        MigrationOperation::CreateSequence(op) => gen.create_sequence(op, model, builder, true),
        MigrationOperation::AlterSequence(op) => gen.alter_sequence(op, model, builder),
        MigrationOperation::RestartSequence(op) => gen.restart_sequence(op, model, builder),
        MigrationOperation::DropSequence(op) => gen.drop_sequence(op, model, builder),
        MigrationOperation::AddPrimaryKey(op) => gen.add_primary_key(op, model, builder),
        MigrationOperation::AddForeignKey(op) => gen.add_foreign_key(op, model, builder),
        MigrationOperation::AddUniqueConstraint(op) => {
            gen.add_unique_constraint(op, model, builder)
        }
        MigrationOperation::DropPrimaryKey(op)
        | MigrationOperation::DropForeignKey(op)
        | MigrationOperation::DropUniqueConstraint(op) => gen.drop_constraint(op, model, builder),
        MigrationOperation::Sql(op) => gen.sql(op, model, builder),
    }
}

/// Error for operations that need a dialect override.
pub fn unsupported<G: MigrationsSqlGenerator + ?Sized>(
    gen: &G,
    kind: &str,
    target: &str,
) -> MigrateError {
    MigrateError::Unsupported(format!(
        "{} ('{}') is not supported by the {} generator",
        kind,
        target,
        gen.dialect().name()
    ))
}

/// Append the statement terminator and close the batch.
pub fn terminate<G: MigrationsSqlGenerator + ?Sized>(
    gen: &G,
    builder: &mut MigrationCommandListBuilder,
    suppress_transaction: bool,
) {
    builder.append_line(gen.dialect().statement_terminator());
    gen.end_statement(builder, suppress_transaction);
}

pub fn create_table<G: MigrationsSqlGenerator + ?Sized>(
    gen: &G,
    operation: &CreateTableOperation,
    model: Option<&Model>,
    builder: &mut MigrationCommandListBuilder,
    terminate_statement: bool,
) -> Result<()> {
    builder
        .append("CREATE TABLE ")
        .append(gen.delimit(&operation.name, operation.schema.as_deref())?);
    table_elements(gen, operation, model, builder)?;

    if terminate_statement {
        terminate(gen, builder, false);
    }
    Ok(())
}

/// ` (` column definitions and constraints, one per line `)`.
pub fn table_elements<G: MigrationsSqlGenerator + ?Sized>(
    gen: &G,
    operation: &CreateTableOperation,
    model: Option<&Model>,
    builder: &mut MigrationCommandListBuilder,
) -> Result<()> {
    let schema = operation.schema.as_deref();

    builder.append_line(" (");
    builder.increment_indent();

    let mut first = true;
    let mut separate = |builder: &mut MigrationCommandListBuilder| {
        if !first {
            builder.append_line(",");
        }
        first = false;
    };

    for column in &operation.columns {
        separate(builder);
        gen.column_definition(schema, &operation.name, column, model, builder)?;
    }
    if let Some(primary_key) = &operation.primary_key {
        separate(builder);
        primary_key_constraint(gen, primary_key, builder)?;
    }
    for unique in &operation.unique_constraints {
        separate(builder);
        unique_constraint(gen, unique, builder)?;
    }
    for foreign_key in &operation.foreign_keys {
        separate(builder);
        foreign_key_constraint(gen, foreign_key, builder)?;
    }

    builder.append_line("");
    builder.decrement_indent();
    builder.append(")");
    Ok(())
}

/// Annotation-only changes have no engine-neutral SQL.
pub fn alter_table<G: MigrationsSqlGenerator + ?Sized>(
    _gen: &G,
    operation: &AlterTableOperation,
    _model: Option<&Model>,
    _builder: &mut MigrationCommandListBuilder,
) -> Result<()> {
    debug!("No SQL for alter_table on '{}'", operation.name);
    Ok(())
}

pub fn drop_table<G: MigrationsSqlGenerator + ?Sized>(
    gen: &G,
    operation: &DropTableOperation,
    _model: Option<&Model>,
    builder: &mut MigrationCommandListBuilder,
) -> Result<()> {
    builder
        .append("DROP TABLE ")
        .append(gen.delimit(&operation.name, operation.schema.as_deref())?);
    terminate(gen, builder, false);
    Ok(())
}

pub fn add_column<G: MigrationsSqlGenerator + ?Sized>(
    gen: &G,
    operation: &AddColumnOperation,
    model: Option<&Model>,
    builder: &mut MigrationCommandListBuilder,
    terminate_statement: bool,
) -> Result<()> {
    let schema = operation.schema.as_deref();

    builder
        .append("ALTER TABLE ")
        .append(gen.delimit(&operation.table, schema)?)
        .append(" ADD ");
    gen.column_definition(schema, &operation.table, &operation.column, model, builder)?;

    if terminate_statement {
        terminate(gen, builder, false);
    }
    Ok(())
}

pub fn drop_column<G: MigrationsSqlGenerator + ?Sized>(
    gen: &G,
    operation: &DropColumnOperation,
    _model: Option<&Model>,
    builder: &mut MigrationCommandListBuilder,
    terminate_statement: bool,
) -> Result<()> {
    builder
        .append("ALTER TABLE ")
        .append(gen.delimit(&operation.table, operation.schema.as_deref())?)
        .append(" DROP COLUMN ")
        .append(gen.delimit(&operation.name, None)?);

    if terminate_statement {
        terminate(gen, builder, false);
    }
    Ok(())
}

pub fn create_index<G: MigrationsSqlGenerator + ?Sized>(
    gen: &G,
    operation: &CreateIndexOperation,
    _model: Option<&Model>,
    builder: &mut MigrationCommandListBuilder,
    terminate_statement: bool,
) -> Result<()> {
    builder.append("CREATE ");
    if operation.unique {
        builder.append("UNIQUE ");
    }
    builder
        .append("INDEX ")
        .append(gen.delimit(&operation.name, None)?)
        .append(" ON ")
        .append(gen.delimit(&operation.table, operation.schema.as_deref())?)
        .append(" (")
        .append(gen.dialect().column_list(&operation.columns)?)
        .append(")");
    index_filter(operation, builder);

    if terminate_statement {
        terminate(gen, builder, false);
    }
    Ok(())
}

/// ` WHERE <filter>` for partial indexes.
pub fn index_filter(operation: &CreateIndexOperation, builder: &mut MigrationCommandListBuilder) {
    if let Some(filter) = operation.filter.as_deref().filter(|f| !f.trim().is_empty()) {
        builder.append(" WHERE ").append(filter);
    }
}

pub fn drop_schema<G: MigrationsSqlGenerator + ?Sized>(
    gen: &G,
    operation: &SchemaOperation,
    _model: Option<&Model>,
    builder: &mut MigrationCommandListBuilder,
) -> Result<()> {
    builder
        .append("DROP SCHEMA ")
        .append(gen.delimit(&operation.name, None)?);
    terminate(gen, builder, false);
    Ok(())
}

pub fn create_sequence<G: MigrationsSqlGenerator + ?Sized>(
    gen: &G,
    operation: &CreateSequenceOperation,
    _model: Option<&Model>,
    builder: &mut MigrationCommandListBuilder,
    terminate_statement: bool,
) -> Result<()> {
    builder
        .append("CREATE SEQUENCE ")
        .append(gen.delimit(&operation.name, operation.schema.as_deref())?);

    if let Some(store_type) = gen.sequence_type(operation)? {
        builder.append(" AS ").append(store_type);
    }

    builder
        .append(" START WITH ")
        .append(operation.start_value.to_string());
    sequence_options(
        operation.increment_by,
        operation.min_value,
        operation.max_value,
        operation.cyclic,
        builder,
    );

    if terminate_statement {
        terminate(gen, builder, false);
    }
    Ok(())
}

/// `AS <type>` only for non-`bigint` sequences, `bigint` being the default.
pub fn sequence_type<G: MigrationsSqlGenerator + ?Sized>(
    gen: &G,
    operation: &CreateSequenceOperation,
) -> Result<Option<String>> {
    if operation.clr_type == LogicalType::Int64 {
        return Ok(None);
    }
    let mapping = gen
        .type_mappings()
        .require_mapping(&TypeMappingInfo::clr(operation.clr_type.clone()))?;
    Ok(Some(mapping.store_type().to_string()))
}

pub fn alter_sequence<G: MigrationsSqlGenerator + ?Sized>(
    gen: &G,
    operation: &AlterSequenceOperation,
    _model: Option<&Model>,
    builder: &mut MigrationCommandListBuilder,
) -> Result<()> {
    builder
        .append("ALTER SEQUENCE ")
        .append(gen.delimit(&operation.name, operation.schema.as_deref())?);
    sequence_options(
        operation.increment_by,
        operation.min_value,
        operation.max_value,
        operation.cyclic,
        builder,
    );
    terminate(gen, builder, false);
    Ok(())
}

pub fn restart_sequence<G: MigrationsSqlGenerator + ?Sized>(
    gen: &G,
    operation: &RestartSequenceOperation,
    _model: Option<&Model>,
    builder: &mut MigrationCommandListBuilder,
) -> Result<()> {
    builder
        .append("ALTER SEQUENCE ")
        .append(gen.delimit(&operation.name, operation.schema.as_deref())?)
        .append(" RESTART WITH ")
        .append(operation.start_value.to_string());
    terminate(gen, builder, false);
    Ok(())
}

pub fn drop_sequence<G: MigrationsSqlGenerator + ?Sized>(
    gen: &G,
    operation: &DropSequenceOperation,
    _model: Option<&Model>,
    builder: &mut MigrationCommandListBuilder,
) -> Result<()> {
    builder
        .append("DROP SEQUENCE ")
        .append(gen.delimit(&operation.name, operation.schema.as_deref())?);
    terminate(gen, builder, false);
    Ok(())
}

/// ` INCREMENT BY n [NO] MINVALUE [NO] MAXVALUE [NO] CYCLE`.
pub fn sequence_options(
    increment_by: i64,
    min_value: Option<i64>,
    max_value: Option<i64>,
    cyclic: bool,
    builder: &mut MigrationCommandListBuilder,
) {
    builder
        .append(" INCREMENT BY ")
        .append(increment_by.to_string());

    match min_value {
        Some(min) => builder.append(" MINVALUE ").append(min.to_string()),
        None => builder.append(" NO MINVALUE"),
    };
    match max_value {
        Some(max) => builder.append(" MAXVALUE ").append(max.to_string()),
        None => builder.append(" NO MAXVALUE"),
    };
    builder.append(if cyclic { " CYCLE" } else { " NO CYCLE" });
}

pub fn add_primary_key<G: MigrationsSqlGenerator + ?Sized>(
    gen: &G,
    operation: &AddPrimaryKeyOperation,
    _model: Option<&Model>,
    builder: &mut MigrationCommandListBuilder,
) -> Result<()> {
    builder
        .append("ALTER TABLE ")
        .append(gen.delimit(&operation.table, operation.schema.as_deref())?)
        .append(" ADD ");
    primary_key_constraint(gen, &operation.constraint, builder)?;
    terminate(gen, builder, false);
    Ok(())
}

pub fn add_foreign_key<G: MigrationsSqlGenerator + ?Sized>(
    gen: &G,
    operation: &AddForeignKeyOperation,
    _model: Option<&Model>,
    builder: &mut MigrationCommandListBuilder,
) -> Result<()> {
    builder
        .append("ALTER TABLE ")
        .append(gen.delimit(&operation.table, operation.schema.as_deref())?)
        .append(" ADD ");
    foreign_key_constraint(gen, &operation.constraint, builder)?;
    terminate(gen, builder, false);
    Ok(())
}

pub fn add_unique_constraint<G: MigrationsSqlGenerator + ?Sized>(
    gen: &G,
    operation: &AddUniqueConstraintOperation,
    _model: Option<&Model>,
    builder: &mut MigrationCommandListBuilder,
) -> Result<()> {
    builder
        .append("ALTER TABLE ")
        .append(gen.delimit(&operation.table, operation.schema.as_deref())?)
        .append(" ADD ");
    unique_constraint(gen, &operation.constraint, builder)?;
    terminate(gen, builder, false);
    Ok(())
}

pub fn drop_constraint<G: MigrationsSqlGenerator + ?Sized>(
    gen: &G,
    operation: &DropConstraintOperation,
    _model: Option<&Model>,
    builder: &mut MigrationCommandListBuilder,
) -> Result<()> {
    builder
        .append("ALTER TABLE ")
        .append(gen.delimit(&operation.table, operation.schema.as_deref())?)
        .append(" DROP CONSTRAINT ")
        .append(gen.delimit(&operation.name, None)?);
    terminate(gen, builder, false);
    Ok(())
}

/// Raw SQL is appended verbatim, without a terminator.
pub fn sql<G: MigrationsSqlGenerator + ?Sized>(
    gen: &G,
    operation: &SqlOperation,
    _model: Option<&Model>,
    builder: &mut MigrationCommandListBuilder,
) -> Result<()> {
    builder.append_line(operation.sql.trim_end());
    gen.end_statement(builder, operation.suppress_transaction);
    Ok(())
}

pub fn column_definition<G: MigrationsSqlGenerator + ?Sized>(
    gen: &G,
    schema: Option<&str>,
    table: &str,
    column: &ColumnDefinition,
    model: Option<&Model>,
    builder: &mut MigrationCommandListBuilder,
) -> Result<()> {
    let column_type = gen.column_type(schema, table, column, model)?;
    column_definition_with_type(gen, column, &column_type, builder)
}

/// Column definition for an already resolved store type.
pub fn column_definition_with_type<G: MigrationsSqlGenerator + ?Sized>(
    gen: &G,
    column: &ColumnDefinition,
    column_type: &str,
    builder: &mut MigrationCommandListBuilder,
) -> Result<()> {
    builder
        .append(gen.delimit(&column.name, None)?)
        .append(" ")
        .append(column_type);

    if let Some(computed) = &column.computed_column_sql {
        builder
            .append(" GENERATED ALWAYS AS (")
            .append(computed)
            .append(") STORED");
    }
    if !column.nullable {
        builder.append(" NOT NULL");
    }
    if column.computed_column_sql.is_none() {
        gen.default_value(
            column.default_value.as_ref(),
            column.default_value_sql.as_deref(),
            column_type,
            builder,
        );
    }
    Ok(())
}

pub fn column_type<G: MigrationsSqlGenerator + ?Sized>(
    gen: &G,
    schema: Option<&str>,
    table: &str,
    column: &ColumnDefinition,
    model: Option<&Model>,
) -> Result<String> {
    if let Some(column_type) = column.column_type.as_deref().filter(|t| !t.trim().is_empty()) {
        return Ok(column_type.to_string());
    }

    if let Some(column_type) = model.and_then(|m| m.column_type(schema, table, &column.name)) {
        return Ok(column_type.to_string());
    }

    let clr_type = column.clr_type.clone().ok_or_else(|| {
        MigrateError::TypeMappingNotFound(format!(
            "column '{}' of '{}' (no column type or logical type given)",
            column.name, table
        ))
    })?;

    let info = TypeMappingInfo::clr(clr_type)
        .with_size(column.max_length)
        .with_fixed_length(column.fixed_length);
    let mapping = gen.type_mappings().require_mapping(&info)?;
    Ok(mapping.store_type().to_string())
}

pub fn default_value<G: MigrationsSqlGenerator + ?Sized>(
    gen: &G,
    default_value: Option<&SqlValue>,
    default_value_sql: Option<&str>,
    column_type: &str,
    builder: &mut MigrationCommandListBuilder,
) {
    if let Some(sql) = default_value_sql {
        builder.append(" DEFAULT (").append(sql).append(")");
    } else if let Some(value) = default_value {
        builder
            .append(" DEFAULT ")
            .append(gen.generate_sql_literal(value, Some(column_type)));
    }
}

fn constraint_name<G: MigrationsSqlGenerator + ?Sized>(
    gen: &G,
    name: Option<&str>,
    builder: &mut MigrationCommandListBuilder,
) -> Result<()> {
    if let Some(name) = name {
        builder
            .append("CONSTRAINT ")
            .append(gen.delimit(name, None)?)
            .append(" ");
    }
    Ok(())
}

pub fn primary_key_constraint<G: MigrationsSqlGenerator + ?Sized>(
    gen: &G,
    constraint: &PrimaryKeyConstraint,
    builder: &mut MigrationCommandListBuilder,
) -> Result<()> {
    constraint_name(gen, constraint.name.as_deref(), builder)?;
    builder
        .append("PRIMARY KEY (")
        .append(gen.dialect().column_list(&constraint.columns)?)
        .append(")");
    Ok(())
}

pub fn unique_constraint<G: MigrationsSqlGenerator + ?Sized>(
    gen: &G,
    constraint: &UniqueConstraint,
    builder: &mut MigrationCommandListBuilder,
) -> Result<()> {
    constraint_name(gen, constraint.name.as_deref(), builder)?;
    builder
        .append("UNIQUE (")
        .append(gen.dialect().column_list(&constraint.columns)?)
        .append(")");
    Ok(())
}

pub fn foreign_key_constraint<G: MigrationsSqlGenerator + ?Sized>(
    gen: &G,
    constraint: &ForeignKeyConstraint,
    builder: &mut MigrationCommandListBuilder,
) -> Result<()> {
    constraint_name(gen, constraint.name.as_deref(), builder)?;
    builder
        .append("FOREIGN KEY (")
        .append(gen.dialect().column_list(&constraint.columns)?)
        .append(") REFERENCES ")
        .append(gen.delimit(
            &constraint.principal_table,
            constraint.principal_schema.as_deref(),
        )?);

    if !constraint.principal_columns.is_empty() {
        builder
            .append(" (")
            .append(gen.dialect().column_list(&constraint.principal_columns)?)
            .append(")");
    }
    if constraint.on_update != ReferentialAction::NoAction {
        builder
            .append(" ON UPDATE ")
            .append(constraint.on_update.as_sql());
    }
    if constraint.on_delete != ReferentialAction::NoAction {
        builder
            .append(" ON DELETE ")
            .append(constraint.on_delete.as_sql());
    }
    Ok(())
}
