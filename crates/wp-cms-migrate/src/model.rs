//! Destination-side records written by the migration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Entity types that carry a unique slug.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Category,
    Tag,
    Post,
    Page,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Category => "category",
            EntityKind::Tag => "tag",
            EntityKind::Post => "post",
            EntityKind::Page => "page",
        }
    }

    /// Prefix of the generated slug when the source has none.
    pub fn fallback_slug(&self, source_id: i64) -> String {
        format!("{}-{}", self.as_str(), source_id)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Publication status of posts and pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContentStatus {
    Published,
    Draft,
}

impl ContentStatus {
    /// Map a WordPress `post_status`. Only `publish` and `draft` migrate.
    pub fn from_wordpress(status: &str) -> Option<Self> {
        match status {
            "publish" => Some(ContentStatus::Published),
            "draft" => Some(ContentStatus::Draft),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentStatus::Published => "PUBLISHED",
            ContentStatus::Draft => "DRAFT",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    pub source_id: i64,
    pub name: String,
    pub slug: String,
    pub description: String,
    /// Term id of the parent category, if any.
    pub parent_source_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tag {
    pub source_id: i64,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Post {
    pub source_id: i64,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub excerpt: Option<String>,
    pub status: ContentStatus,
    pub author_id: String,
    /// Set only for published posts.
    pub published_at: Option<DateTime<Utc>>,
    /// Written on insert only.
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    pub source_id: i64,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub status: ContentStatus,
    pub menu_order: i32,
    /// Written on insert only.
    pub created_at: Option<DateTime<Utc>>,
}

/// The default administrative account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminAccount {
    pub email: String,
    /// PHC-format argon2 hash.
    pub password_hash: String,
    pub name: String,
}

impl AdminAccount {
    pub const ROLE: &'static str = "ADMIN";
}

/// A site setting row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Setting {
    pub key: String,
    pub value: String,
    pub kind: &'static str,
}

/// Who currently holds a slug.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlugOwner {
    /// WordPress id of the holder; `None` for records created in the CMS.
    pub source_id: Option<i64>,
}
