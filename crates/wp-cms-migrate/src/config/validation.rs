//! Configuration validation.

use super::Config;
use crate::error::{MigrateError, Result};
use std::collections::HashSet;

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    // Dump validation
    if config.dump.path.as_os_str().is_empty() {
        return Err(MigrateError::Config("dump.path is required".into()));
    }
    if !config
        .dump
        .table_prefix
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(MigrateError::Config(format!(
            "dump.table_prefix may only contain letters, digits and '_', got '{}'",
            config.dump.table_prefix
        )));
    }

    // Target validation
    if config.target.host.is_empty() {
        return Err(MigrateError::Config("target.host is required".into()));
    }
    if config.target.database.is_empty() {
        return Err(MigrateError::Config("target.database is required".into()));
    }
    if config.target.user.is_empty() {
        return Err(MigrateError::Config("target.user is required".into()));
    }
    if config.target.max_connections == 0 {
        return Err(MigrateError::Config(
            "target.max_connections must be at least 1".into(),
        ));
    }

    // Migration validation
    if config.migration.progress_interval == 0 {
        return Err(MigrateError::Config(
            "migration.progress_interval must be at least 1".into(),
        ));
    }
    if !config.migration.admin.email.contains('@') {
        return Err(MigrateError::Config(format!(
            "migration.admin.email is not an email address: '{}'",
            config.migration.admin.email
        )));
    }
    if config.migration.admin.password.is_empty() {
        return Err(MigrateError::Config(
            "migration.admin.password is required".into(),
        ));
    }

    let mut seen = HashSet::new();
    for setting in &config.migration.settings {
        if setting.key.is_empty() {
            return Err(MigrateError::Config(
                "migration.settings entries need a key".into(),
            ));
        }
        if !seen.insert(setting.key.as_str()) {
            return Err(MigrateError::Config(format!(
                "migration.settings has duplicate key '{}'",
                setting.key
            )));
        }
    }

    Ok(())
}
