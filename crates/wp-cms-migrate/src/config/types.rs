//! Configuration type definitions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// WordPress dump location.
    pub dump: DumpConfig,

    /// Target database configuration (PostgreSQL).
    pub target: TargetConfig,

    /// Migration behavior configuration.
    #[serde(default)]
    pub migration: MigrationConfig,
}

/// Source dump configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DumpConfig {
    /// Path to the `mysqldump` output.
    pub path: PathBuf,

    /// WordPress table prefix (default: "wp_").
    #[serde(default = "default_table_prefix")]
    pub table_prefix: String,
}

/// Target database (PostgreSQL) configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Database host.
    pub host: String,

    /// Database port (default: 5432).
    #[serde(default = "default_pg_port")]
    pub port: u16,

    /// Database name.
    pub database: String,

    /// Username.
    pub user: String,

    /// Password.
    #[serde(default)]
    pub password: String,

    /// Target schema (default: "public").
    #[serde(default = "default_public_schema")]
    pub schema: String,

    /// SSL mode (default: "disable").
    #[serde(default = "default_disable")]
    pub ssl_mode: String,

    /// PEM bundle of CA certificates trusted for `verify-ca`/`verify-full`,
    /// in place of the public web roots.
    #[serde(default)]
    pub ssl_root_cert: Option<PathBuf>,

    /// Maximum pooled connections (default: 2).
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

impl fmt::Debug for TargetConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("schema", &self.schema)
            .field("ssl_mode", &self.ssl_mode)
            .field("ssl_root_cert", &self.ssl_root_cert)
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

/// Migration behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Log a progress line every N migrated rows (default: 10).
    #[serde(default = "default_progress_interval")]
    pub progress_interval: usize,

    /// Default administrative account, created when missing.
    #[serde(default)]
    pub admin: AdminConfig,

    /// Baseline site settings. Empty means the built-in defaults.
    #[serde(default)]
    pub settings: Vec<SettingConfig>,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            progress_interval: default_progress_interval(),
            admin: AdminConfig::default(),
            settings: Vec::new(),
        }
    }
}

impl MigrationConfig {
    /// Settings to write: the configured list, or the baseline defaults.
    pub fn effective_settings(&self) -> Vec<SettingConfig> {
        if self.settings.is_empty() {
            default_settings()
        } else {
            self.settings.clone()
        }
    }
}

/// Default admin account.
#[derive(Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    #[serde(default = "default_admin_email")]
    pub email: String,

    /// Plain-text initial password, hashed before it reaches the store.
    #[serde(default = "default_admin_password")]
    pub password: String,

    #[serde(default = "default_admin_name")]
    pub name: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            email: default_admin_email(),
            password: default_admin_password(),
            name: default_admin_name(),
        }
    }
}

impl fmt::Debug for AdminConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminConfig")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("name", &self.name)
            .finish()
    }
}

/// One site setting as key/value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingConfig {
    pub key: String,
    pub value: String,

    /// Value type stored alongside the value (default: string).
    #[serde(default, rename = "type")]
    pub kind: SettingKind,
}

/// Declared type of a setting value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingKind {
    #[default]
    String,
    Number,
}

impl SettingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettingKind::String => "string",
            SettingKind::Number => "number",
        }
    }
}

fn setting(key: &str, value: &str, kind: SettingKind) -> SettingConfig {
    SettingConfig {
        key: key.to_string(),
        value: value.to_string(),
        kind,
    }
}

/// Baseline settings written when none are configured.
pub fn default_settings() -> Vec<SettingConfig> {
    vec![
        setting("site_name", "147227 CMS", SettingKind::String),
        setting("site_description", "Modern content management system", SettingKind::String),
        setting("posts_per_page", "10", SettingKind::Number),
        setting("date_format", "YYYY-MM-DD", SettingKind::String),
        setting("timezone", "Asia/Shanghai", SettingKind::String),
    ]
}

// Default value functions for serde
fn default_table_prefix() -> String {
    "wp_".to_string()
}

fn default_pg_port() -> u16 {
    5432
}

fn default_public_schema() -> String {
    "public".to_string()
}

fn default_disable() -> String {
    "disable".to_string()
}

fn default_max_connections() -> usize {
    2
}

fn default_progress_interval() -> usize {
    10
}

fn default_admin_email() -> String {
    "admin@example.com".to_string()
}

fn default_admin_password() -> String {
    "admin123".to_string()
}

fn default_admin_name() -> String {
    "Administrator".to_string()
}
