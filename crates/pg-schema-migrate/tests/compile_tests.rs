//! End-to-end compile tests: YAML operation lists in, SQL commands out.

use std::io::Write;

use pg_schema_migrate::{
    GeneratorConfig, MigrateError, MigrationCommand, MigrationOperation, MigrationsSqlGenerator,
    Model, PostgresMigrationsSqlGenerator,
};

fn compile(yaml: &str) -> Result<Vec<MigrationCommand>, MigrateError> {
    compile_for(GeneratorConfig::default(), yaml, None)
}

fn compile_for(
    config: GeneratorConfig,
    yaml: &str,
    model: Option<&Model>,
) -> Result<Vec<MigrationCommand>, MigrateError> {
    let operations = MigrationOperation::list_from_yaml(yaml)?;
    let generator = PostgresMigrationsSqlGenerator::new(config)?;
    generator.generate(&operations, model)
}

fn script(commands: &[MigrationCommand]) -> String {
    commands.iter().map(|c| c.command_text.as_str()).collect()
}

// =============================================================================
// Table lifecycle
// =============================================================================

#[test]
fn test_table_lifecycle_script() {
    let yaml = r#"
- kind: ensure_schema
  name: shop
- kind: create_table
  schema: shop
  name: customers
  columns:
    - name: id
      column_type: bigint
      annotations:
        Postgres:ValueGenerationStrategy: SerialColumn
    - name: email
      clr_type: string
      max_length: 320
    - name: ctid
      column_type: tid
  primary_key:
    name: PK_customers
    columns: [id]
  unique_constraints:
    - name: AK_customers_email
      columns: [email]
- kind: add_column
  schema: shop
  table: customers
  name: vip
  column_type: boolean
  default_value: false
- kind: create_index
  schema: shop
  table: customers
  name: IX_customers_email
  columns: [email]
  unique: true
- kind: drop_table
  schema: shop
  name: legacy_customers
"#;

    let commands = compile(yaml).unwrap();
    assert_eq!(commands.len(), 5);
    assert!(commands.iter().all(|c| !c.transaction_suppressed));
    assert_eq!(
        script(&commands),
        concat!(
            "CREATE SCHEMA IF NOT EXISTS \"shop\";\n",
            "CREATE TABLE \"shop\".\"customers\" (\n",
            "    \"id\" bigserial NOT NULL,\n",
            "    \"email\" character varying(320) NOT NULL,\n",
            "    CONSTRAINT \"PK_customers\" PRIMARY KEY (\"id\"),\n",
            "    CONSTRAINT \"AK_customers_email\" UNIQUE (\"email\")\n",
            ");\n",
            "ALTER TABLE \"shop\".\"customers\" ADD \"vip\" boolean NOT NULL DEFAULT FALSE;\n",
            "CREATE UNIQUE INDEX \"IX_customers_email\" ON \"shop\".\"customers\" (\"email\");\n",
            "DROP TABLE \"shop\".\"legacy_customers\";\n"
        )
    );
}

#[test]
fn test_serial_conversion_is_one_batch() {
    let yaml = r#"
- kind: alter_column
  schema: shop
  table: orders
  name: number
  column_type: int
  annotations:
    Postgres:ValueGenerationStrategy: SerialColumn
  old_column:
    name: number
    column_type: int
"#;

    let commands = compile(yaml).unwrap();
    assert_eq!(commands.len(), 1);

    let statements: Vec<&str> = commands[0].command_text.lines().collect();
    assert_eq!(
        statements,
        vec![
            "CREATE SEQUENCE \"shop\".\"orders_number_seq\" AS integer START WITH 1 INCREMENT BY 1 NO MINVALUE NO MAXVALUE NO CYCLE;",
            "ALTER TABLE \"shop\".\"orders\" ALTER COLUMN \"number\" TYPE int;",
            "ALTER TABLE \"shop\".\"orders\" ALTER COLUMN \"number\" SET NOT NULL;",
            "ALTER TABLE \"shop\".\"orders\" ALTER COLUMN \"number\" SET DEFAULT (nextval('\"shop\".\"orders_number_seq\"'));",
            "ALTER SEQUENCE \"shop\".\"orders_number_seq\" OWNED BY \"shop\".\"orders\".\"number\";",
        ]
    );
}

#[test]
fn test_model_supplies_column_type() {
    let model = Model::from_yaml(
        r#"
tables:
  - schema: shop
    name: orders
    columns:
      - name: placed_at
        column_type: timestamp with time zone
"#,
    )
    .unwrap();

    let yaml = r#"
- kind: alter_column
  schema: shop
  table: orders
  name: placed_at
  clr_type: datetime
  nullable: true
  old_column:
    name: placed_at
"#;

    let commands = compile_for(GeneratorConfig::default(), yaml, Some(&model)).unwrap();
    assert!(commands[0].command_text.starts_with(
        "ALTER TABLE \"shop\".\"orders\" ALTER COLUMN \"placed_at\" TYPE timestamp with time zone;\n"
    ));
}

// =============================================================================
// Storage parameters, comments and annotations
// =============================================================================

#[test]
fn test_alter_table_diffs_annotations() {
    let yaml = r#"
- kind: alter_table
  name: events
  annotations:
    Postgres:Comment: Raw events
    Postgres:StorageParameter:fillfactor: 90
    Postgres:StorageParameter:toast_tuple_target: 4096
    Relational:Ignored: anything
  old_table:
    annotations:
      Postgres:StorageParameter:fillfactor: 90
      Postgres:StorageParameter:autovacuum_enabled: false
"#;

    let commands = compile(yaml).unwrap();
    assert_eq!(
        script(&commands),
        concat!(
            "ALTER TABLE \"events\" SET (toast_tuple_target=4096);\n",
            "ALTER TABLE \"events\" RESET (autovacuum_enabled);\n",
            "COMMENT ON TABLE \"events\" IS 'Raw events';\n"
        )
    );
}

#[test]
fn test_unknown_postgres_annotation_is_ignored() {
    let yaml = r#"
- kind: create_table
  name: events
  columns:
    - name: id
      column_type: integer
  annotations:
    Postgres:SomethingNew: true
"#;

    let commands = compile(yaml).unwrap();
    assert_eq!(
        script(&commands),
        "CREATE TABLE \"events\" (\n    \"id\" integer NOT NULL\n);\n"
    );
}

#[test]
fn test_deprecated_annotation_is_config_error() {
    let yaml = r#"
- kind: add_column
  table: users
  name: id
  column_type: integer
  annotations:
    Postgres:ValueGeneratedOnAdd: true
"#;

    let err = compile(yaml).unwrap_err();
    assert!(matches!(err, MigrateError::Config(_)));
    assert_eq!(err.exit_code(), 1);
}

// =============================================================================
// Databases
// =============================================================================

#[test]
fn test_database_commands_run_outside_transactions() {
    let yaml = r#"
- kind: create_database
  name: analytics
  tablespace: fast
- kind: alter_database
  annotations:
    Postgres:Extension:citext: ",citext,"
- kind: drop_database
  name: analytics_old
"#;

    let commands = compile(yaml).unwrap();
    assert_eq!(commands.len(), 5);
    assert!(commands.iter().all(|c| c.transaction_suppressed));
    assert_eq!(
        commands[0].command_text,
        "CREATE DATABASE \"analytics\" TABLESPACE \"fast\";\n"
    );
    assert_eq!(
        commands[1].command_text,
        "CREATE EXTENSION IF NOT EXISTS \"citext\";\n"
    );
    assert_eq!(
        commands[4].command_text,
        "DROP DATABASE \"analytics_old\";\n"
    );
}

#[test]
fn test_raw_sql_keeps_transaction_flag() {
    let yaml = r#"
- kind: sql
  sql: "CREATE INDEX CONCURRENTLY ix ON t (c);"
  suppress_transaction: true
- kind: sql
  sql: "UPDATE t SET c = 0;"
"#;

    let commands = compile(yaml).unwrap();
    assert_eq!(commands.len(), 2);
    assert!(commands[0].transaction_suppressed);
    assert!(!commands[1].transaction_suppressed);
    assert!(commands[1].command_text.starts_with("UPDATE t SET c = 0;"));
}

// =============================================================================
// Server versions
// =============================================================================

#[test]
fn test_old_server_shims() {
    let config = GeneratorConfig::from_yaml("postgres_version: \"9.1\"\n").unwrap();
    let yaml = r#"
- kind: create_sequence
  name: invoice_numbers
  clr_type: i32
- kind: drop_database
  name: reports
"#;

    let commands = compile_for(config, yaml, None).unwrap();
    assert_eq!(
        commands[0].command_text,
        "CREATE SEQUENCE \"invoice_numbers\" START WITH 1 INCREMENT BY 1 NO MINVALUE NO MAXVALUE NO CYCLE;\n"
    );
    assert!(commands[2]
        .command_text
        .contains("pg_stat_activity.procpid"));
}

#[test]
fn test_generated_column_rejected_before_pg12() {
    let config = GeneratorConfig::from_yaml("postgres_version: \"11.5\"\n").unwrap();
    let yaml = r#"
- kind: create_table
  name: lines
  columns:
    - name: total
      column_type: numeric
      computed_column_sql: price * quantity
"#;

    let err = compile_for(config, yaml, None).unwrap_err();
    assert!(matches!(err, MigrateError::Unsupported(_)));
    assert_eq!(err.exit_code(), 4);
}

// =============================================================================
// Failures
// =============================================================================

#[test]
fn test_invalid_operation_rejected() {
    let yaml = r#"
- kind: drop_column
  table: users
  name: ""
"#;

    let err = compile(yaml).unwrap_err();
    assert!(matches!(err, MigrateError::InvalidArgument { .. }));
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn test_unknown_kind_is_yaml_error() {
    let err = MigrationOperation::list_from_yaml("- kind: truncate_table\n  name: t\n").unwrap_err();
    assert!(matches!(err, MigrateError::Yaml(_)));
}

#[test]
fn test_load_list_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "- kind: drop_schema\n  name: staging").unwrap();

    let operations = MigrationOperation::load_list(file.path()).unwrap();
    assert_eq!(operations.len(), 1);
    assert_eq!(operations[0].kind(), "drop_schema");
}
