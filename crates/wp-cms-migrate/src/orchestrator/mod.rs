//! Migration orchestrator - main workflow coordinator.

mod bootstrap;
mod summary;

pub use bootstrap::{ensure_admin, ensure_settings, hash_password};
pub use summary::{inspect, DumpSummary};

use crate::config::Config;
use crate::dump::Dump;
use crate::error::Result;
use crate::mapping::{self, MapContext, PhaseStats};
use crate::model::EntityKind;
use crate::store::DestinationStore;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Migration orchestrator.
pub struct Orchestrator {
    config: Config,
    store: Arc<dyn DestinationStore>,
}

/// Result of a migration run.
#[derive(Debug, Clone, Serialize)]
pub struct MigrationResult {
    /// Unique run identifier.
    pub run_id: String,

    /// Final status.
    pub status: String,

    /// Total duration in seconds.
    pub duration_seconds: f64,

    /// When the migration started.
    pub started_at: DateTime<Utc>,

    /// When the migration completed.
    pub completed_at: DateTime<Utc>,

    /// Store backend the run wrote to.
    pub backend: String,

    /// Dump file that was read.
    pub dump_path: String,

    /// Dump size in bytes.
    pub dump_bytes: usize,

    /// Whether this run created the admin account.
    pub admin_created: bool,

    /// Settings written.
    pub settings_written: usize,

    /// Counters for phases 3 to 7, in order.
    pub phases: Vec<PhaseStats>,

    /// Records migrated across all phases.
    pub rows_migrated: usize,

    /// Rows skipped across all phases.
    pub rows_skipped: usize,

    /// Records per entity in the store after the run.
    pub store_counts: Vec<(EntityKind, i64)>,
}

impl Orchestrator {
    /// Create a new orchestrator over an already connected store.
    pub fn new(config: Config, store: Arc<dyn DestinationStore>) -> Self {
        Self { config, store }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run every phase in order. The first store error aborts the run.
    pub async fn run(&self) -> Result<MigrationResult> {
        let started_at = Utc::now();
        let timer = Instant::now();
        let run_id = uuid::Uuid::new_v4().to_string();
        let store = self.store.as_ref();

        info!("Starting migration run: {}", run_id);

        let dump = Dump::read(&self.config.dump.path)?;

        info!("Preparing destination store ({})", store.backend_type());
        store.init_schema().await?;

        info!("Phase 1: Ensuring admin account");
        let admin = ensure_admin(store, &self.config.migration.admin).await?;

        info!("Phase 2: Ensuring site settings");
        let settings_written =
            ensure_settings(store, &self.config.migration.effective_settings()).await?;

        let ctx = MapContext {
            dump: &dump,
            prefix: &self.config.dump.table_prefix,
            store,
            progress_interval: self.config.migration.progress_interval,
            started_at,
        };

        info!("Phase 3: Migrating categories");
        let categories = mapping::migrate_categories(&ctx).await?;

        info!("Phase 4: Migrating tags");
        let tags = mapping::migrate_tags(&ctx).await?;

        info!("Phase 5: Migrating posts");
        let posts = mapping::migrate_posts(&ctx, &admin.id).await?;

        info!("Phase 6: Migrating pages");
        let pages = mapping::migrate_pages(&ctx).await?;

        info!("Phase 7: Linking posts to categories and tags");
        let links = mapping::migrate_term_links(&ctx).await?;

        let phases = vec![categories, tags, posts, pages, links];
        let rows_migrated = phases.iter().map(|p| p.migrated).sum();
        let rows_skipped = phases.iter().map(|p| p.skipped).sum();

        let mut store_counts = Vec::new();
        for kind in [
            EntityKind::Category,
            EntityKind::Tag,
            EntityKind::Post,
            EntityKind::Page,
        ] {
            store_counts.push((kind, store.count(kind).await?));
        }

        let completed_at = Utc::now();
        let duration = timer.elapsed().as_secs_f64();

        info!(
            "Migration complete: {} records migrated, {} rows skipped in {:.2}s",
            rows_migrated, rows_skipped, duration
        );

        Ok(MigrationResult {
            run_id,
            status: "completed".to_string(),
            duration_seconds: duration,
            started_at,
            completed_at,
            backend: store.backend_type().to_string(),
            dump_path: dump.path().display().to_string(),
            dump_bytes: dump.len(),
            admin_created: admin.created,
            settings_written,
            phases,
            rows_migrated,
            rows_skipped,
            store_counts,
        })
    }
}

impl MigrationResult {
    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn phase(&self, phase: mapping::Phase) -> Option<&PhaseStats> {
        self.phases.iter().find(|p| p.phase == phase)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MigrateError;
    use crate::mapping::Phase;
    use crate::model::ContentStatus;
    use crate::store::MemoryStore;
    use std::io::Write;

    const DUMP: &str = "\
-- MySQL dump 10.13
/*!40101 SET NAMES utf8mb4 */;
DROP TABLE IF EXISTS `wp_terms`;
CREATE TABLE `wp_terms` (
  `term_id` bigint(20) unsigned NOT NULL AUTO_INCREMENT,
  `name` varchar(200) NOT NULL DEFAULT '',
  PRIMARY KEY (`term_id`)
);
INSERT INTO `wp_terms` VALUES (1,'Uncategorized','uncategorized',0),(5,'News','news',0),(6,'Rust','rust',0);
INSERT INTO `wp_term_taxonomy` VALUES (1,1,'category','',0,0),(2,5,'category','Company news',0,1),(3,6,'post_tag','',0,1);
INSERT INTO `wp_posts` VALUES (10,1,'2024-03-01 10:00:00','2024-03-01 02:00:00','Hello, world; (really)','Hello','','publish','open','open','','hello','','','2024-03-01 10:00:00','2024-03-01 02:00:00','',0,'',0,'post','',0),(11,1,'2024-03-02 10:00:00','0000-00-00 00:00:00','WIP','Later','','draft','open','open','','','','','2024-03-02 10:00:00','0000-00-00 00:00:00','',0,'',0,'post','',0),(12,1,'2024-03-03 10:00:00','2024-03-03 02:00:00','','Auto Draft','','auto-draft','open','open','','','','','2024-03-03 10:00:00','2024-03-03 02:00:00','',0,'',0,'post','',0),(13,1,'2024-01-01 00:00:00','2024-01-01 00:00:00','Who we are','About','','publish','closed','closed','','about','','','2024-01-01 00:00:00','2024-01-01 00:00:00','',0,'',2,'page','',0);
INSERT INTO `wp_term_relationships` VALUES (10,2,0),(10,3,0),(11,1,0);
";

    fn config_for(path: &std::path::Path) -> Config {
        let yaml = format!(
            "dump:\n  path: {}\ntarget:\n  host: localhost\n  database: cms\n  user: cms\n",
            path.display()
        );
        Config::from_yaml(&yaml).unwrap()
    }

    #[tokio::test]
    async fn test_full_run_is_idempotent() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(DUMP.as_bytes()).unwrap();

        let store = Arc::new(MemoryStore::new());
        let orchestrator = Orchestrator::new(config_for(file.path()), store.clone());

        let first = orchestrator.run().await.unwrap();
        assert_eq!(first.status, "completed");
        assert!(first.admin_created);
        assert_eq!(first.settings_written, 5);
        assert_eq!(first.phase(Phase::Categories).unwrap().migrated, 2);
        assert_eq!(first.phase(Phase::Tags).unwrap().migrated, 1);
        assert_eq!(first.phase(Phase::Posts).unwrap().migrated, 2);
        assert_eq!(first.phase(Phase::Pages).unwrap().migrated, 1);
        assert_eq!(first.phase(Phase::TermLinks).unwrap().migrated, 3);

        let second = orchestrator.run().await.unwrap();
        assert!(!second.admin_created);
        assert_ne!(first.run_id, second.run_id);
        assert_eq!(second.store_counts, first.store_counts);

        assert_eq!(store.categories().len(), 2);
        assert_eq!(store.tags().len(), 1);
        assert_eq!(store.posts().len(), 2);
        assert_eq!(store.pages().len(), 1);
        assert_eq!(store.admin_emails(), vec!["admin@example.com".to_string()]);

        let hello = &store.posts()[0];
        assert_eq!(hello.content, "Hello, world; (really)");
        assert_eq!(hello.status, ContentStatus::Published);
        let draft = &store.posts()[1];
        assert_eq!(draft.slug, "post-11");
        assert_eq!(draft.published_at, None);

        assert_eq!(store.post_category(10), Some(5));
        assert_eq!(store.post_tags(10), vec![6]);
        assert_eq!(store.post_category(11), Some(1));
        assert_eq!(store.pages()[0].menu_order, 2);

        let json = second.to_json().unwrap();
        assert!(json.contains("\"rows_migrated\""));
        assert!(json.contains("\"wrong_status\""));
    }

    #[tokio::test]
    async fn test_missing_dump_aborts_before_store() {
        let store = Arc::new(MemoryStore::new());
        let orchestrator = Orchestrator::new(
            config_for(std::path::Path::new("/nonexistent/wordpress.sql")),
            store.clone(),
        );

        let err = orchestrator.run().await.unwrap_err();
        assert!(matches!(err, MigrateError::DumpNotFound(_)));
        assert_eq!(err.exit_code(), 2);
        assert!(store.admin_emails().is_empty());
    }

    #[tokio::test]
    async fn test_custom_prefix_and_settings() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(DUMP.replace("`wp_", "`blog_").as_bytes())
            .unwrap();

        let mut config = config_for(file.path());
        config.dump.table_prefix = "blog_".to_string();
        config.migration.settings = vec![crate::config::SettingConfig {
            key: "site_name".to_string(),
            value: "My Blog".to_string(),
            kind: crate::config::SettingKind::String,
        }];

        let store = Arc::new(MemoryStore::new());
        let result = Orchestrator::new(config, store.clone()).run().await.unwrap();
        assert_eq!(result.settings_written, 1);
        assert_eq!(result.phase(Phase::Categories).unwrap().migrated, 2);
        assert_eq!(store.settings()[0].value, "My Blog");
    }
}
