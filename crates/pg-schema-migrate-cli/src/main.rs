//! pg-schema-migrate CLI - compile migration operations into PostgreSQL DDL.

use clap::{Parser, Subcommand};
use pg_schema_migrate::{
    GeneratorConfig, LogicalType, MigrateError, MigrationCommand, MigrationOperation,
    MigrationsSqlGenerator, Model, PostgresMigrationsSqlGenerator, TypeMapping, TypeMappingInfo,
    TypeMappingSource,
};
use serde::Serialize;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, Level};
use tracing_subscriber::fmt::format::FmtSpan;

#[derive(Parser)]
#[command(name = "pg-schema-migrate")]
#[command(about = "Compile schema migration operations into PostgreSQL DDL")]
#[command(version)]
struct Cli {
    /// Path to YAML generator configuration file (defaults apply when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "warn")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a YAML list of migration operations into a SQL script
    Compile {
        /// Path to the YAML operations file
        operations: PathBuf,

        /// Target model consulted for column types
        #[arg(long)]
        model: Option<PathBuf>,

        /// Override the target PostgreSQL version (e.g. 9.6)
        #[arg(long)]
        postgres_version: Option<String>,
    },

    /// Resolve a store type name or a logical type to its PostgreSQL type
    ResolveType {
        /// Store type name, e.g. varchar(20) or _int4
        store_type: Option<String>,

        /// Logical type name, e.g. string, i32 or string[]
        #[arg(long, conflicts_with = "store_type")]
        logical: Option<String>,

        /// Length for sized types
        #[arg(long)]
        size: Option<u32>,

        /// Prefer fixed-length text and bit types
        #[arg(long)]
        fixed_length: bool,
    },
}

/// JSON shape of a resolved type mapping.
#[derive(Serialize)]
struct ResolvedType<'a> {
    store_type: &'a str,
    size: Option<u32>,
    is_array: bool,
    element_store_type: Option<&'a str>,
}

impl<'a> From<&'a TypeMapping> for ResolvedType<'a> {
    fn from(mapping: &'a TypeMapping) -> Self {
        Self {
            store_type: mapping.store_type(),
            size: mapping.size(),
            is_array: mapping.is_array(),
            element_store_type: mapping.element().map(|e| e.store_type()),
        }
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

fn run() -> Result<(), MigrateError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format)
        .map_err(|e| MigrateError::Config(e.to_string()))?;

    let mut config = match &cli.config {
        Some(path) => {
            let config = GeneratorConfig::load(path)?;
            info!("Loaded configuration from {:?}", path);
            config
        }
        None => GeneratorConfig::default(),
    };

    match cli.command {
        Commands::Compile {
            operations,
            model,
            postgres_version,
        } => {
            if let Some(version) = postgres_version {
                config.postgres_version = version;
            }

            let ops = MigrationOperation::load_list(&operations)?;
            info!("Loaded {} operations from {:?}", ops.len(), operations);
            let model = model.map(Model::load).transpose()?;

            let generator = PostgresMigrationsSqlGenerator::new(config)?;
            let commands = generator.generate(&ops, model.as_ref())?;

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&commands)?);
            } else {
                print_script(&commands)?;
            }
        }

        Commands::ResolveType {
            store_type,
            logical,
            size,
            fixed_length,
        } => {
            let info = match (store_type, logical) {
                (Some(name), _) => TypeMappingInfo::store(name),
                (None, Some(name)) => TypeMappingInfo::clr(name.parse::<LogicalType>()?),
                (None, None) => {
                    return Err(MigrateError::Config(
                        "Either a store type or --logical is required".to_string(),
                    ))
                }
            }
            .with_size(size)
            .with_fixed_length(fixed_length);

            let source = TypeMappingSource::new();
            let mapping = source.require_mapping(&info)?;

            if cli.output_json {
                let resolved = ResolvedType::from(mapping.as_ref());
                println!("{}", serde_json::to_string_pretty(&resolved)?);
            } else {
                println!("{}", mapping.store_type());
            }
        }
    }

    Ok(())
}

/// Print each command followed by a blank line.
fn print_script(commands: &[MigrationCommand]) -> Result<(), MigrateError> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for command in commands {
        if command.transaction_suppressed {
            writeln!(out, "-- no transaction")?;
        }
        write!(out, "{}", command.command_text)?;
        if !command.command_text.ends_with('\n') {
            writeln!(out)?;
        }
        writeln!(out)?;
    }
    out.flush()?;
    Ok(())
}

fn setup_logging(verbosity: &str, format: &str) -> Result<(), String> {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // stdout carries the SQL script
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(io::stderr);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    Ok(())
}
