//! Error types for the migrations SQL generator.

use thiserror::Error;

/// Main error type for SQL generation and type mapping.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Configuration error (invalid YAML, unsupported annotation, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// A required operation argument is missing or invalid
    #[error("Invalid argument for {operation}: {message}")]
    InvalidArgument { operation: String, message: String },

    /// No store type could be resolved where one was required
    #[error("No type mapping found for {0}")]
    TypeMappingNotFound(String),

    /// The operation cannot be expressed for the configured server
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MigrateError {
    /// Create an InvalidArgument error
    pub fn invalid_argument(operation: impl Into<String>, message: impl Into<String>) -> Self {
        MigrateError::InvalidArgument {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Process exit code for this error, used by the CLI.
    pub fn exit_code(&self) -> u8 {
        match self {
            MigrateError::Config(_) | MigrateError::Yaml(_) => 1,
            MigrateError::InvalidArgument { .. } => 2,
            MigrateError::TypeMappingNotFound(_) => 3,
            MigrateError::Unsupported(_) => 4,
            MigrateError::Json(_) => 5,
            MigrateError::Io(_) => 7,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        // Add error chain for wrapped errors
        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for generator operations.
pub type Result<T> = std::result::Result<T, MigrateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(MigrateError::Config("x".into()).exit_code(), 1);
        assert_eq!(MigrateError::invalid_argument("CreateTable", "x").exit_code(), 2);
        assert_eq!(MigrateError::TypeMappingNotFound("x".into()).exit_code(), 3);
        assert_eq!(MigrateError::Unsupported("x".into()).exit_code(), 4);
    }

    #[test]
    fn test_format_detailed_includes_message() {
        let err = MigrateError::invalid_argument("DropColumn", "column name is empty");
        let detailed = err.format_detailed();
        assert!(detailed.starts_with("Error: Invalid argument for DropColumn"));
        assert!(detailed.contains("column name is empty"));
    }
}
