//! CLI integration tests for pg-schema-migrate.
//!
//! These tests verify command-line argument parsing, script output,
//! and exit codes for various error conditions.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

/// Get a command for the pg-schema-migrate binary.
fn cmd() -> Command {
    Command::cargo_bin("pg-schema-migrate").unwrap()
}

/// Write YAML content to a temporary file.
fn yaml_file(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

// =============================================================================
// Help and Version Tests
// =============================================================================

#[test]
fn test_help_shows_all_commands() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("compile"))
        .stdout(predicate::str::contains("resolve-type"));
}

#[test]
fn test_compile_subcommand_help() {
    cmd()
        .args(["compile", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--model"))
        .stdout(predicate::str::contains("--postgres-version"));
}

#[test]
fn test_resolve_type_subcommand_help() {
    cmd()
        .args(["resolve-type", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--logical"))
        .stdout(predicate::str::contains("--size"))
        .stdout(predicate::str::contains("--fixed-length"));
}

#[test]
fn test_version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("pg-schema-migrate"));
}

#[test]
fn test_missing_subcommand_fails() {
    cmd().assert().failure();
}

// =============================================================================
// Compile Tests
// =============================================================================

#[test]
fn test_compile_prints_script() {
    let ops = yaml_file(
        r#"
- kind: ensure_schema
  name: reporting
- kind: create_table
  schema: reporting
  name: events
  columns:
    - name: id
      column_type: integer
"#,
    );

    cmd()
        .arg("compile")
        .arg(ops.path())
        .assert()
        .success()
        .stdout(predicate::eq(concat!(
            "CREATE SCHEMA IF NOT EXISTS \"reporting\";\n",
            "\n",
            "CREATE TABLE \"reporting\".\"events\" (\n",
            "    \"id\" integer NOT NULL\n",
            ");\n",
            "\n"
        )));
}

#[test]
fn test_compile_marks_non_transactional_commands() {
    let ops = yaml_file("- kind: create_database\n  name: shop\n");

    cmd()
        .arg("compile")
        .arg(ops.path())
        .assert()
        .success()
        .stdout(predicate::str::starts_with(
            "-- no transaction\nCREATE DATABASE \"shop\";\n",
        ));
}

#[test]
fn test_compile_output_json() {
    let ops = yaml_file("- kind: drop_schema\n  name: staging\n");

    cmd()
        .arg("--output-json")
        .arg("compile")
        .arg(ops.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("\"command_text\""))
        .stdout(predicate::str::contains("\"transaction_suppressed\": false"));
}

#[test]
fn test_compile_with_config_file() {
    let config = yaml_file("postgres_version: \"9.1\"\n");
    let ops = yaml_file("- kind: drop_database\n  name: shop\n");

    cmd()
        .arg("--config")
        .arg(config.path())
        .arg("compile")
        .arg(ops.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("pg_stat_activity.procpid"));
}

#[test]
fn test_compile_version_override() {
    let ops = yaml_file("- kind: drop_database\n  name: shop\n");

    cmd()
        .args(["compile", "--postgres-version", "9.1"])
        .arg(ops.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("pg_stat_activity.procpid"));
}

#[test]
fn test_compile_with_model() {
    let model = yaml_file(
        r#"
tables:
  - name: users
    columns:
      - name: score
        column_type: real
"#,
    );
    let ops = yaml_file(
        r#"
- kind: add_column
  table: users
  name: score
  nullable: true
"#,
    );

    cmd()
        .arg("compile")
        .arg(ops.path())
        .arg("--model")
        .arg(model.path())
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "ALTER TABLE \"users\" ADD \"score\" real;",
        ));
}

// =============================================================================
// Exit Code Tests
// =============================================================================

#[test]
fn test_missing_operations_file() {
    cmd()
        .args(["compile", "/nonexistent/operations.yaml"])
        .assert()
        .failure()
        .code(7)
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn test_invalid_config_file() {
    let config = yaml_file("postgres_version: \"twelve\"\n");
    let ops = yaml_file("- kind: drop_schema\n  name: staging\n");

    cmd()
        .arg("--config")
        .arg(config.path())
        .arg("compile")
        .arg(ops.path())
        .assert()
        .failure()
        .code(1);
}

#[test]
fn test_invalid_operation_exit_code() {
    let ops = yaml_file("- kind: drop_table\n  name: \"\"\n");

    cmd()
        .arg("compile")
        .arg(ops.path())
        .assert()
        .failure()
        .code(2)
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_unresolvable_column_type_exit_code() {
    let ops = yaml_file("- kind: add_column\n  table: users\n  name: mystery\n");

    cmd()
        .arg("compile")
        .arg(ops.path())
        .assert()
        .failure()
        .code(3);
}

#[test]
fn test_unsupported_operation_exit_code() {
    let ops = yaml_file(
        r#"
- kind: add_column
  table: lines
  name: total
  column_type: numeric
  computed_column_sql: price * quantity
"#,
    );

    cmd()
        .args(["compile", "--postgres-version", "11"])
        .arg(ops.path())
        .assert()
        .failure()
        .code(4);
}

#[test]
fn test_deprecated_annotation_exit_code() {
    let ops = yaml_file(
        r#"
- kind: add_column
  table: users
  name: id
  column_type: integer
  annotations:
    Postgres:ValueGeneratedOnAdd: true
"#,
    );

    cmd()
        .arg("compile")
        .arg(ops.path())
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Postgres:ValueGeneratedOnAdd"));
}

// =============================================================================
// Resolve Type Tests
// =============================================================================

#[test]
fn test_resolve_store_type() {
    cmd()
        .args(["resolve-type", "varchar(20)"])
        .assert()
        .success()
        .stdout("character varying(20)\n");
}

#[test]
fn test_resolve_array_store_type() {
    cmd()
        .args(["resolve-type", "_int4"])
        .assert()
        .success()
        .stdout("integer[]\n");
}

#[test]
fn test_resolve_logical_fixed_length() {
    cmd()
        .args(["resolve-type", "--logical", "string", "--size", "3", "--fixed-length"])
        .assert()
        .success()
        .stdout("character(3)\n");
}

#[test]
fn test_resolve_type_json() {
    cmd()
        .args(["--output-json", "resolve-type", "text[]"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"is_array\": true"))
        .stdout(predicate::str::contains("\"element_store_type\": \"text\""));
}

#[test]
fn test_resolve_unknown_type_exit_code() {
    cmd()
        .args(["resolve-type", "no_such_type"])
        .assert()
        .failure()
        .code(3);
}

#[test]
fn test_resolve_type_requires_a_name() {
    cmd().arg("resolve-type").assert().failure().code(1);
}
