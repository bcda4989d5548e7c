//! Configuration loading and validation.

mod types;
mod validation;

pub use types::*;

use crate::error::Result;
use std::path::Path;

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }
}

/// Starter configuration written by `init`.
pub const SAMPLE_CONFIG: &str = r#"# WordPress dump to CMS migration settings.
dump:
  # Output of mysqldump for the WordPress database.
  path: ./wordpress.sql
  table_prefix: wp_

target:
  host: localhost
  port: 5432
  database: cms
  user: postgres
  password: change-me
  schema: public
  # disable, require, verify-ca or verify-full
  ssl_mode: disable
  # CA bundle for a self-hosted server; the public web roots otherwise.
  # ssl_root_cert: ./cms-ca.pem

migration:
  progress_interval: 10
  admin:
    email: admin@example.com
    password: admin123
    name: Administrator
  # Leave empty to write the baseline site settings.
  settings: []
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_config_parses() {
        let config = Config::from_yaml(SAMPLE_CONFIG).unwrap();
        assert_eq!(config.dump.table_prefix, "wp_");
        assert_eq!(config.target.port, 5432);
        assert_eq!(config.migration.progress_interval, 10);
        assert_eq!(config.migration.effective_settings().len(), 5);
    }

    #[test]
    fn test_defaults_fill_optional_sections() {
        let yaml = r#"
dump:
  path: /tmp/dump.sql
target:
  host: db
  database: cms
  user: cms
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.dump.table_prefix, "wp_");
        assert_eq!(config.target.schema, "public");
        assert_eq!(config.target.ssl_mode, "disable");
        assert_eq!(config.migration.admin.email, "admin@example.com");
    }

    #[test]
    fn test_custom_settings_replace_defaults() {
        let yaml = r#"
dump:
  path: dump.sql
  table_prefix: blog_
target:
  host: db
  database: cms
  user: cms
migration:
  settings:
    - key: posts_per_page
      value: "20"
      type: number
"#;
        let config = Config::from_yaml(yaml).unwrap();
        let settings = config.migration.effective_settings();
        assert_eq!(settings.len(), 1);
        assert_eq!(settings[0].kind, SettingKind::Number);
        assert_eq!(config.dump.table_prefix, "blog_");
    }

    #[test]
    fn test_missing_dump_section_is_error() {
        let yaml = "target:\n  host: db\n  database: cms\n  user: cms\n";
        assert!(Config::from_yaml(yaml).is_err());
    }
}
