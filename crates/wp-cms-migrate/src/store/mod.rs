//! Destination store for migrated records.
//!
//! The [`DestinationStore`] trait is the only way the mappers touch the CMS
//! database. Implementations:
//!
//! - **PostgreSQL**: [`PgStore`] in `postgres.rs`, for real runs
//! - **Memory**: [`MemoryStore`] in `memory.rs`, for dry runs and tests
//!
//! Every `upsert_*` call is keyed by the WordPress id and is atomic on its
//! own. Slugs are unique per entity type; writing a slug held by a different
//! record is an error, so callers resolve collisions with [`slug_owner`]
//! first.
//!
//! [`slug_owner`]: DestinationStore::slug_owner

mod memory;
mod postgres;
mod tls;

pub use memory::MemoryStore;
pub use postgres::{HealthCheckResult, PgStore};

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{AdminAccount, Category, EntityKind, Page, Post, Setting, SlugOwner, Tag};

/// Outcome of [`DestinationStore::ensure_admin`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnsuredAdmin {
    /// Destination id of the account.
    pub id: String,
    /// False when an account with the email already existed.
    pub created: bool,
}

/// Persistence interface for migrated CMS records.
///
/// Implementations must be `Send + Sync`; the orchestrator holds them as
/// `Arc<dyn DestinationStore>`.
#[async_trait]
pub trait DestinationStore: Send + Sync {
    /// Create the destination tables if they are missing. Idempotent.
    async fn init_schema(&self) -> Result<()>;

    /// Create the admin account unless one with the same email exists.
    /// An existing account is left untouched.
    async fn ensure_admin(&self, admin: &AdminAccount) -> Result<EnsuredAdmin>;

    /// Insert or update a setting by key.
    async fn upsert_setting(&self, setting: &Setting) -> Result<()>;

    /// Find which record of `kind` currently holds `slug`.
    async fn slug_owner(&self, kind: EntityKind, slug: &str) -> Result<Option<SlugOwner>>;

    async fn upsert_category(&self, category: &Category) -> Result<()>;

    async fn upsert_tag(&self, tag: &Tag) -> Result<()>;

    /// Insert or update a post. `created_at` is only written on insert.
    async fn upsert_post(&self, post: &Post) -> Result<()>;

    /// Insert or update a page. `created_at` is only written on insert.
    async fn upsert_page(&self, page: &Page) -> Result<()>;

    /// Point a post at a category. Returns false if either side is unknown.
    async fn set_post_category(&self, post_source_id: i64, category_source_id: i64)
        -> Result<bool>;

    /// Attach a tag to a post (no-op if already attached). Returns false if
    /// either side is unknown.
    async fn add_post_tag(&self, post_source_id: i64, tag_source_id: i64) -> Result<bool>;

    /// Number of stored records of `kind`.
    async fn count(&self, kind: EntityKind) -> Result<i64>;

    /// Get the backend type name for logging/debugging.
    fn backend_type(&self) -> &'static str;
}
