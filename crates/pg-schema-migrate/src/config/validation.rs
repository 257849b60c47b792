//! Configuration validation.

use super::{GeneratorConfig, PostgresVersion};
use crate::core::identifier::validate_identifier;
use crate::error::{MigrateError, Result};

/// Validate the configuration.
pub fn validate(config: &GeneratorConfig) -> Result<()> {
    config.postgres_version.parse::<PostgresVersion>()?;

    if config.default_schema.is_empty() {
        return Err(MigrateError::Config("default_schema is required".into()));
    }
    validate_identifier(&config.default_schema)?;

    if config.statement_terminator.trim().is_empty() {
        return Err(MigrateError::Config(
            "statement_terminator cannot be blank".into(),
        ));
    }

    Ok(())
}
