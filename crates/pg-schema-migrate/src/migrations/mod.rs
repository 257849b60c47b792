//! Migration SQL generation.
//!
//! [`MigrationsSqlGenerator`] is a template: every operation variant has a
//! default method that delegates to the engine-neutral statement shapes in
//! [`generic`]. Dialects override the methods whose SQL differs and call the
//! `generic` functions as their base step.
//!
//! - [`builder`]: accumulates SQL text into [`MigrationCommand`]s
//! - [`generic`]: base statement shapes shared by dialects

pub mod builder;
pub mod generic;

pub use builder::{BuilderMark, MigrationCommand, MigrationCommandListBuilder};

use tracing::debug;

use crate::core::operations::*;
use crate::core::traits::Dialect;
use crate::core::value::SqlValue;
use crate::core::Model;
use crate::error::Result;
use crate::typemap::TypeMappingSource;

/// Compiles [`MigrationOperation`]s into SQL commands.
///
/// Implementors supply a [`Dialect`] and a [`TypeMappingSource`]; every other
/// method has a default. Statements for one operation are appended to the
/// builder in order, and each logically atomic unit is closed with
/// [`end_statement`](Self::end_statement).
pub trait MigrationsSqlGenerator {
    fn dialect(&self) -> &dyn Dialect;

    fn type_mappings(&self) -> &TypeMappingSource;

    /// Compile a whole migration. Operations are compiled in order.
    fn generate(
        &self,
        operations: &[MigrationOperation],
        model: Option<&Model>,
    ) -> Result<Vec<MigrationCommand>> {
        let mut builder = MigrationCommandListBuilder::new();
        for operation in operations {
            self.compile(operation, model, &mut builder)?;
        }
        let commands = builder.build();
        debug!(
            "Compiled {} operations into {} commands",
            operations.len(),
            commands.len()
        );
        Ok(commands)
    }

    /// Compile one operation into `builder`.
    ///
    /// The operation is validated first; if generation fails part way, the
    /// builder is restored so no partial statement is left behind.
    fn compile(
        &self,
        operation: &MigrationOperation,
        model: Option<&Model>,
        builder: &mut MigrationCommandListBuilder,
    ) -> Result<()> {
        operation.validate()?;
        let mark = builder.mark();
        let result = generic::dispatch(self, operation, model, builder);
        if result.is_err() {
            builder.rollback(mark);
        }
        result
    }

    /// Close the current statement batch.
    fn end_statement(&self, builder: &mut MigrationCommandListBuilder, suppress_transaction: bool) {
        builder.end_command(suppress_transaction);
    }

    /// Quote a name, qualifying it with the schema when given.
    fn delimit(&self, name: &str, schema: Option<&str>) -> Result<String> {
        self.dialect().delimit_identifier(name, schema)
    }

    /// Render a value as a literal, using the store type's rules when known.
    fn generate_sql_literal(&self, value: &SqlValue, store_type: Option<&str>) -> String {
        store_type
            .and_then(|t| self.type_mappings().find_store_mapping(t))
            .map(|mapping| mapping.generate_sql_literal(value))
            .unwrap_or_else(|| value.to_sql_literal())
    }

    // ===== Operations =====

    fn create_table(
        &self,
        operation: &CreateTableOperation,
        model: Option<&Model>,
        builder: &mut MigrationCommandListBuilder,
        terminate: bool,
    ) -> Result<()> {
        generic::create_table(self, operation, model, builder, terminate)
    }

    fn alter_table(
        &self,
        operation: &AlterTableOperation,
        model: Option<&Model>,
        builder: &mut MigrationCommandListBuilder,
    ) -> Result<()> {
        generic::alter_table(self, operation, model, builder)
    }

    fn drop_table(
        &self,
        operation: &DropTableOperation,
        model: Option<&Model>,
        builder: &mut MigrationCommandListBuilder,
    ) -> Result<()> {
        generic::drop_table(self, operation, model, builder)
    }

    fn add_column(
        &self,
        operation: &AddColumnOperation,
        model: Option<&Model>,
        builder: &mut MigrationCommandListBuilder,
        terminate: bool,
    ) -> Result<()> {
        generic::add_column(self, operation, model, builder, terminate)
    }

    fn drop_column(
        &self,
        operation: &DropColumnOperation,
        model: Option<&Model>,
        builder: &mut MigrationCommandListBuilder,
        terminate: bool,
    ) -> Result<()> {
        generic::drop_column(self, operation, model, builder, terminate)
    }

    fn alter_column(
        &self,
        operation: &AlterColumnOperation,
        model: Option<&Model>,
        builder: &mut MigrationCommandListBuilder,
    ) -> Result<()> {
        let _ = (model, builder);
        Err(generic::unsupported(self, "alter_column", &operation.column.name))
    }

    fn rename_table(
        &self,
        operation: &RenameOperation,
        model: Option<&Model>,
        builder: &mut MigrationCommandListBuilder,
    ) -> Result<()> {
        let _ = (model, builder);
        Err(generic::unsupported(self, "rename_table", &operation.name))
    }

    fn rename_column(
        &self,
        operation: &RenameColumnOperation,
        model: Option<&Model>,
        builder: &mut MigrationCommandListBuilder,
    ) -> Result<()> {
        let _ = (model, builder);
        Err(generic::unsupported(self, "rename_column", &operation.name))
    }

    fn rename_index(
        &self,
        operation: &RenameOperation,
        model: Option<&Model>,
        builder: &mut MigrationCommandListBuilder,
    ) -> Result<()> {
        let _ = (model, builder);
        Err(generic::unsupported(self, "rename_index", &operation.name))
    }

    fn rename_sequence(
        &self,
        operation: &RenameOperation,
        model: Option<&Model>,
        builder: &mut MigrationCommandListBuilder,
    ) -> Result<()> {
        let _ = (model, builder);
        Err(generic::unsupported(self, "rename_sequence", &operation.name))
    }

    fn create_index(
        &self,
        operation: &CreateIndexOperation,
        model: Option<&Model>,
        builder: &mut MigrationCommandListBuilder,
        terminate: bool,
    ) -> Result<()> {
        generic::create_index(self, operation, model, builder, terminate)
    }

    fn drop_index(
        &self,
        operation: &DropIndexOperation,
        model: Option<&Model>,
        builder: &mut MigrationCommandListBuilder,
    ) -> Result<()> {
        let _ = (model, builder);
        Err(generic::unsupported(self, "drop_index", &operation.name))
    }

    fn ensure_schema(
        &self,
        operation: &SchemaOperation,
        model: Option<&Model>,
        builder: &mut MigrationCommandListBuilder,
    ) -> Result<()> {
        let _ = (model, builder);
        Err(generic::unsupported(self, "ensure_schema", &operation.name))
    }

    fn drop_schema(
        &self,
        operation: &SchemaOperation,
        model: Option<&Model>,
        builder: &mut MigrationCommandListBuilder,
    ) -> Result<()> {
        generic::drop_schema(self, operation, model, builder)
    }

    fn create_database(
        &self,
        operation: &CreateDatabaseOperation,
        model: Option<&Model>,
        builder: &mut MigrationCommandListBuilder,
    ) -> Result<()> {
        let _ = (model, builder);
        Err(generic::unsupported(self, "create_database", &operation.name))
    }

    fn drop_database(
        &self,
        operation: &DropDatabaseOperation,
        model: Option<&Model>,
        builder: &mut MigrationCommandListBuilder,
    ) -> Result<()> {
        let _ = (model, builder);
        Err(generic::unsupported(self, "drop_database", &operation.name))
    }

    fn alter_database(
        &self,
        operation: &AlterDatabaseOperation,
        model: Option<&Model>,
        builder: &mut MigrationCommandListBuilder,
    ) -> Result<()> {
        let _ = (operation, model, builder);
        Err(generic::unsupported(self, "alter_database", "database"))
    }

    fn create_sequence(
        &self,
        operation: &CreateSequenceOperation,
        model: Option<&Model>,
        builder: &mut MigrationCommandListBuilder,
        terminate: bool,
    ) -> Result<()> {
        generic::create_sequence(self, operation, model, builder, terminate)
    }

    fn alter_sequence(
        &self,
        operation: &AlterSequenceOperation,
        model: Option<&Model>,
        builder: &mut MigrationCommandListBuilder,
    ) -> Result<()> {
        generic::alter_sequence(self, operation, model, builder)
    }

    fn restart_sequence(
        &self,
        operation: &RestartSequenceOperation,
        model: Option<&Model>,
        builder: &mut MigrationCommandListBuilder,
    ) -> Result<()> {
        generic::restart_sequence(self, operation, model, builder)
    }

    fn drop_sequence(
        &self,
        operation: &DropSequenceOperation,
        model: Option<&Model>,
        builder: &mut MigrationCommandListBuilder,
    ) -> Result<()> {
        generic::drop_sequence(self, operation, model, builder)
    }

    fn add_primary_key(
        &self,
        operation: &AddPrimaryKeyOperation,
        model: Option<&Model>,
        builder: &mut MigrationCommandListBuilder,
    ) -> Result<()> {
        generic::add_primary_key(self, operation, model, builder)
    }

    fn add_foreign_key(
        &self,
        operation: &AddForeignKeyOperation,
        model: Option<&Model>,
        builder: &mut MigrationCommandListBuilder,
    ) -> Result<()> {
        generic::add_foreign_key(self, operation, model, builder)
    }

    fn add_unique_constraint(
        &self,
        operation: &AddUniqueConstraintOperation,
        model: Option<&Model>,
        builder: &mut MigrationCommandListBuilder,
    ) -> Result<()> {
        generic::add_unique_constraint(self, operation, model, builder)
    }

    /// Shared by DropPrimaryKey, DropForeignKey and DropUniqueConstraint.
    fn drop_constraint(
        &self,
        operation: &DropConstraintOperation,
        model: Option<&Model>,
        builder: &mut MigrationCommandListBuilder,
    ) -> Result<()> {
        generic::drop_constraint(self, operation, model, builder)
    }

    fn sql(
        &self,
        operation: &SqlOperation,
        model: Option<&Model>,
        builder: &mut MigrationCommandListBuilder,
    ) -> Result<()> {
        generic::sql(self, operation, model, builder)
    }

    // ===== Fragments =====

    /// `"name" <type> [NOT NULL] [DEFAULT ...]`.
    fn column_definition(
        &self,
        schema: Option<&str>,
        table: &str,
        column: &ColumnDefinition,
        model: Option<&Model>,
        builder: &mut MigrationCommandListBuilder,
    ) -> Result<()> {
        generic::column_definition(self, schema, table, column, model, builder)
    }

    /// Store type of a column: explicit type, then the model, then the
    /// logical type mapping.
    fn column_type(
        &self,
        schema: Option<&str>,
        table: &str,
        column: &ColumnDefinition,
        model: Option<&Model>,
    ) -> Result<String> {
        generic::column_type(self, schema, table, column, model)
    }

    /// ` DEFAULT (<sql>)` or ` DEFAULT <literal>`; nothing when neither is set.
    fn default_value(
        &self,
        default_value: Option<&SqlValue>,
        default_value_sql: Option<&str>,
        column_type: &str,
        builder: &mut MigrationCommandListBuilder,
    ) {
        generic::default_value(self, default_value, default_value_sql, column_type, builder)
    }

    /// Store type for `CREATE SEQUENCE ... AS <type>`; `None` omits the clause.
    fn sequence_type(&self, operation: &CreateSequenceOperation) -> Result<Option<String>> {
        generic::sequence_type(self, operation)
    }
}
