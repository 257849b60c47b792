//! Identifier validation for generated DDL.
//!
//! SQL identifiers (table names, column names, schema names) cannot be passed as
//! parameters - migrations are plain SQL text. Every identifier is validated
//! before a [`Dialect`](super::traits::Dialect) quotes it.

use crate::error::{MigrateError, Result};

/// Maximum identifier length in bytes (NAMEDATALEN - 1).
///
/// PostgreSQL silently truncates longer names, which would make two distinct
/// migration identifiers collide, so they are rejected instead.
pub const MAX_IDENTIFIER_LENGTH: usize = 63;

/// Validate an identifier.
///
/// Rejects:
/// - Empty identifiers
/// - Identifiers containing null bytes
/// - Identifiers exceeding [`MAX_IDENTIFIER_LENGTH`]
///
/// # Errors
///
/// Returns `MigrateError::Config` for invalid identifiers with a descriptive message.
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(MigrateError::Config(
            "Identifier cannot be empty".to_string(),
        ));
    }

    if name.contains('\0') {
        return Err(MigrateError::Config(format!(
            "SECURITY: Identifier contains null byte (possible injection attempt): {:?}",
            name
        )));
    }

    if name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(MigrateError::Config(format!(
            "Identifier exceeds maximum length of {} bytes (got {} bytes): {:?}",
            MAX_IDENTIFIER_LENGTH,
            name.len(),
            name
        )));
    }

    Ok(())
}
