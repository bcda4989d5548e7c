//! In-memory destination store.
//!
//! Applies the same keys and uniqueness rules as the PostgreSQL schema, so a
//! dry run fails where a real run would.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{DestinationStore, EnsuredAdmin};
use crate::error::{MigrateError, Result};
use crate::model::{AdminAccount, Category, EntityKind, Page, Post, Setting, SlugOwner, Tag};

#[derive(Debug)]
struct StoredUser {
    id: String,
    account: AdminAccount,
}

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<String, StoredUser>,
    settings: BTreeMap<String, Setting>,
    categories: BTreeMap<i64, Category>,
    tags: BTreeMap<i64, Tag>,
    posts: BTreeMap<i64, Post>,
    pages: BTreeMap<i64, Page>,
    post_category: BTreeMap<i64, i64>,
    post_tags: BTreeSet<(i64, i64)>,
    /// Slugs of records created in the CMS itself, without a WordPress id.
    native_slugs: HashSet<(EntityKind, String)>,
}

impl Tables {
    fn owner(&self, kind: EntityKind, slug: &str) -> Option<SlugOwner> {
        if self.native_slugs.contains(&(kind, slug.to_string())) {
            return Some(SlugOwner { source_id: None });
        }
        let found = match kind {
            EntityKind::Category => self
                .categories
                .values()
                .find(|c| c.slug == slug)
                .map(|c| c.source_id),
            EntityKind::Tag => self.tags.values().find(|t| t.slug == slug).map(|t| t.source_id),
            EntityKind::Post => self.posts.values().find(|p| p.slug == slug).map(|p| p.source_id),
            EntityKind::Page => self.pages.values().find(|p| p.slug == slug).map(|p| p.source_id),
        };
        found.map(|id| SlugOwner {
            source_id: Some(id),
        })
    }

    /// Reject a write whose slug is held by another record.
    fn check_slug(&self, kind: EntityKind, slug: &str, source_id: i64) -> Result<()> {
        match self.owner(kind, slug) {
            Some(SlugOwner {
                source_id: Some(holder),
            }) if holder == source_id => Ok(()),
            Some(owner) => Err(MigrateError::Constraint {
                entity: kind.as_str(),
                message: format!(
                    "slug '{}' already used by {}",
                    slug,
                    owner
                        .source_id
                        .map(|id| format!("source id {}", id))
                        .unwrap_or_else(|| "a record without source id".to_string())
                ),
            }),
            None => Ok(()),
        }
    }
}

/// Mutex-guarded maps standing in for the CMS database.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a slug held by a record that did not come from WordPress.
    pub fn insert_native_slug(&self, kind: EntityKind, slug: impl Into<String>) {
        self.lock().native_slugs.insert((kind, slug.into()));
    }

    pub fn categories(&self) -> Vec<Category> {
        self.lock().categories.values().cloned().collect()
    }

    pub fn tags(&self) -> Vec<Tag> {
        self.lock().tags.values().cloned().collect()
    }

    pub fn posts(&self) -> Vec<Post> {
        self.lock().posts.values().cloned().collect()
    }

    pub fn pages(&self) -> Vec<Page> {
        self.lock().pages.values().cloned().collect()
    }

    pub fn settings(&self) -> Vec<Setting> {
        self.lock().settings.values().cloned().collect()
    }

    pub fn admin_emails(&self) -> Vec<String> {
        self.lock().users.keys().cloned().collect()
    }

    /// Password hash stored for an account.
    pub fn password_hash(&self, email: &str) -> Option<String> {
        self.lock()
            .users
            .get(email)
            .map(|u| u.account.password_hash.clone())
    }

    pub fn post_category(&self, post_source_id: i64) -> Option<i64> {
        self.lock().post_category.get(&post_source_id).copied()
    }

    pub fn post_tags(&self, post_source_id: i64) -> Vec<i64> {
        self.lock()
            .post_tags
            .range((post_source_id, i64::MIN)..=(post_source_id, i64::MAX))
            .map(|&(_, tag)| tag)
            .collect()
    }
}

fn keep_created_at(
    existing: Option<DateTime<Utc>>,
    incoming: Option<DateTime<Utc>>,
) -> Option<DateTime<Utc>> {
    existing.or(incoming).or_else(|| Some(Utc::now()))
}

#[async_trait]
impl DestinationStore for MemoryStore {
    async fn init_schema(&self) -> Result<()> {
        Ok(())
    }

    async fn ensure_admin(&self, admin: &AdminAccount) -> Result<EnsuredAdmin> {
        let mut tables = self.lock();
        if let Some(existing) = tables.users.get(&admin.email) {
            return Ok(EnsuredAdmin {
                id: existing.id.clone(),
                created: false,
            });
        }

        let id = uuid::Uuid::new_v4().to_string();
        tables.users.insert(
            admin.email.clone(),
            StoredUser {
                id: id.clone(),
                account: admin.clone(),
            },
        );
        Ok(EnsuredAdmin { id, created: true })
    }

    async fn upsert_setting(&self, setting: &Setting) -> Result<()> {
        self.lock()
            .settings
            .insert(setting.key.clone(), setting.clone());
        Ok(())
    }

    async fn slug_owner(&self, kind: EntityKind, slug: &str) -> Result<Option<SlugOwner>> {
        Ok(self.lock().owner(kind, slug))
    }

    async fn upsert_category(&self, category: &Category) -> Result<()> {
        let mut tables = self.lock();
        tables.check_slug(EntityKind::Category, &category.slug, category.source_id)?;
        tables
            .categories
            .insert(category.source_id, category.clone());
        Ok(())
    }

    async fn upsert_tag(&self, tag: &Tag) -> Result<()> {
        let mut tables = self.lock();
        tables.check_slug(EntityKind::Tag, &tag.slug, tag.source_id)?;
        tables.tags.insert(tag.source_id, tag.clone());
        Ok(())
    }

    async fn upsert_post(&self, post: &Post) -> Result<()> {
        let mut tables = self.lock();
        tables.check_slug(EntityKind::Post, &post.slug, post.source_id)?;
        let existing = tables.posts.get(&post.source_id).and_then(|p| p.created_at);
        let mut stored = post.clone();
        stored.created_at = keep_created_at(existing, post.created_at);
        tables.posts.insert(post.source_id, stored);
        Ok(())
    }

    async fn upsert_page(&self, page: &Page) -> Result<()> {
        let mut tables = self.lock();
        tables.check_slug(EntityKind::Page, &page.slug, page.source_id)?;
        let existing = tables.pages.get(&page.source_id).and_then(|p| p.created_at);
        let mut stored = page.clone();
        stored.created_at = keep_created_at(existing, page.created_at);
        tables.pages.insert(page.source_id, stored);
        Ok(())
    }

    async fn set_post_category(
        &self,
        post_source_id: i64,
        category_source_id: i64,
    ) -> Result<bool> {
        let mut tables = self.lock();
        if !tables.posts.contains_key(&post_source_id)
            || !tables.categories.contains_key(&category_source_id)
        {
            return Ok(false);
        }
        tables
            .post_category
            .insert(post_source_id, category_source_id);
        Ok(true)
    }

    async fn add_post_tag(&self, post_source_id: i64, tag_source_id: i64) -> Result<bool> {
        let mut tables = self.lock();
        if !tables.posts.contains_key(&post_source_id) || !tables.tags.contains_key(&tag_source_id)
        {
            return Ok(false);
        }
        tables.post_tags.insert((post_source_id, tag_source_id));
        Ok(true)
    }

    async fn count(&self, kind: EntityKind) -> Result<i64> {
        let tables = self.lock();
        let n = match kind {
            EntityKind::Category => tables.categories.len(),
            EntityKind::Tag => tables.tags.len(),
            EntityKind::Post => tables.posts.len(),
            EntityKind::Page => tables.pages.len(),
        };
        Ok(n as i64)
    }

    fn backend_type(&self) -> &'static str {
        "memory"
    }
}
