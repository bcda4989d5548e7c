//! Error types for the migration library.

use std::path::PathBuf;
use thiserror::Error;

/// Exit code for configuration errors (bad YAML, missing fields).
pub const EXIT_CONFIG_ERROR: u8 = 1;

/// Exit code when the dump file cannot be located.
pub const EXIT_DUMP_NOT_FOUND: u8 = 2;

/// Exit code for destination store failures.
pub const EXIT_STORE_ERROR: u8 = 3;

/// Exit code for any other file system failure.
pub const EXIT_IO_ERROR: u8 = 7;

/// Main error type for migration operations.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// The WordPress dump could not be found at the configured path
    #[error("Dump file not found: {}", .0.display())]
    DumpNotFound(PathBuf),

    /// Target database connection or query error
    #[error("Target database error: {0}")]
    Target(#[from] tokio_postgres::Error),

    /// Connection pool error with context
    #[error("Pool error: {message}\n  Context: {context}")]
    Pool { message: String, context: String },

    /// A uniqueness rule in the destination store was violated
    #[error("Constraint violation on {entity}: {message}")]
    Constraint {
        entity: &'static str,
        message: String,
    },

    /// Writing a single record failed
    #[error("Failed to upsert {entity} with source id {source_id}")]
    Upsert {
        entity: &'static str,
        source_id: i64,
        #[source]
        source: Box<MigrateError>,
    },

    /// Password hashing failed while preparing the admin account
    #[error("Password hashing failed: {0}")]
    PasswordHash(String),

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
    /// Create a Pool error with context about where it occurred
    pub fn pool(message: impl Into<String>, context: impl Into<String>) -> Self {
        MigrateError::Pool {
            message: message.into(),
            context: context.into(),
        }
    }

    /// Wrap an error raised while writing one record.
    pub fn upsert(entity: &'static str, source_id: i64, source: MigrateError) -> Self {
        MigrateError::Upsert {
            entity,
            source_id,
            source: Box::new(source),
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            MigrateError::Config(_) | MigrateError::Yaml(_) | MigrateError::Json(_) => {
                EXIT_CONFIG_ERROR
            }
            MigrateError::DumpNotFound(_) => EXIT_DUMP_NOT_FOUND,
            MigrateError::Target(_)
            | MigrateError::Pool { .. }
            | MigrateError::Constraint { .. }
            | MigrateError::PasswordHash(_) => EXIT_STORE_ERROR,
            MigrateError::Upsert { source, .. } => source.exit_code(),
            MigrateError::Io(_) => EXIT_IO_ERROR,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

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

impl From<deadpool_postgres::PoolError> for MigrateError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        MigrateError::pool(err.to_string(), "acquiring target connection")
    }
}

/// Result type alias for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(MigrateError::Config("x".into()).exit_code(), EXIT_CONFIG_ERROR);
        assert_eq!(
            MigrateError::DumpNotFound(PathBuf::from("dump.sql")).exit_code(),
            EXIT_DUMP_NOT_FOUND
        );
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert_eq!(MigrateError::Io(io).exit_code(), EXIT_IO_ERROR);
    }

    #[test]
    fn test_upsert_inherits_inner_exit_code() {
        let inner = MigrateError::Constraint {
            entity: "category",
            message: "slug taken".into(),
        };
        let err = MigrateError::upsert("category", 5, inner);
        assert_eq!(err.exit_code(), EXIT_STORE_ERROR);
    }

    #[test]
    fn test_format_detailed_includes_chain() {
        let inner = MigrateError::Constraint {
            entity: "tag",
            message: "slug 'rust' already used".into(),
        };
        let err = MigrateError::upsert("tag", 12, inner);
        let detailed = err.format_detailed();
        assert!(detailed.contains("Failed to upsert tag with source id 12"));
        assert!(detailed.contains("Caused by:"));
        assert!(detailed.contains("slug 'rust' already used"));
    }
}
