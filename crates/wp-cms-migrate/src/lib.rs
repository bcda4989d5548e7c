//! # wp-cms-migrate
//!
//! Migrates a WordPress site from its `mysqldump` output into a CMS database.
//!
//! The dump is parsed directly, without loading it into MySQL:
//!
//! - **Dump parsing**: `INSERT` statements are located per table, tuples split
//!   on top-level commas and values unquoted and unescaped
//! - **Entity mapping**: categories, tags, posts, pages and their links,
//!   with filtering and slug disambiguation
//! - **Idempotent upserts** keyed by WordPress ids, so a run can be repeated
//! - **Pluggable stores**: PostgreSQL for real runs, in-memory for dry runs
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use wp_cms_migrate::{Config, Orchestrator, PgStore};
//!
//! #[tokio::main]
//! async fn main() -> wp_cms_migrate::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let store = Arc::new(PgStore::connect(&config.target).await?);
//!     let result = Orchestrator::new(config, store).run().await?;
//!     println!("Migrated {} records", result.rows_migrated);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod dump;
pub mod error;
pub mod mapping;
pub mod model;
pub mod orchestrator;
pub mod store;

// Re-exports for convenient access
pub use config::{Config, DumpConfig, MigrationConfig, TargetConfig, SAMPLE_CONFIG};
pub use dump::{Dump, Row};
pub use error::{MigrateError, Result};
pub use mapping::{Phase, PhaseStats, SkipReason};
pub use orchestrator::{inspect, DumpSummary, MigrationResult, Orchestrator};
pub use store::{DestinationStore, HealthCheckResult, MemoryStore, PgStore};
