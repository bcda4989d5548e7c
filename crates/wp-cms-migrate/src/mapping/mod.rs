//! Entity mappers: WordPress rows in, CMS records out.
//!
//! Each mapper reads its tables from the [`Dump`], filters rows, resolves slug
//! collisions against the store, and upserts one record per surviving row.
//! Filtered rows are counted per [`SkipReason`], never reported as errors.

mod content;
mod links;
mod taxonomy;

pub use content::{migrate_pages, migrate_posts, parse_wp_datetime};
pub use links::migrate_term_links;
pub use taxonomy::{migrate_categories, migrate_tags, Term, TermIndex};

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::dump::Dump;
use crate::error::Result;
use crate::model::EntityKind;
use crate::store::DestinationStore;

/// Everything a mapper needs besides its own arguments.
pub struct MapContext<'a> {
    pub dump: &'a Dump,
    /// WordPress table prefix, e.g. `wp_`.
    pub prefix: &'a str,
    pub store: &'a dyn DestinationStore,
    /// Log a progress line every N migrated rows.
    pub progress_interval: usize,
    /// Fallback publication time for published content without a usable date.
    pub started_at: DateTime<Utc>,
}

/// Migration phases in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Categories,
    Tags,
    Posts,
    Pages,
    TermLinks,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Categories => "categories",
            Phase::Tags => "tags",
            Phase::Posts => "posts",
            Phase::Pages => "pages",
            Phase::TermLinks => "term links",
        }
    }
}

/// Why a source row was not migrated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Post type outside the phase (attachments, revisions, menu items...).
    WrongType,
    /// Status other than publish/draft (private, trash, auto-draft...).
    WrongStatus,
    EmptyTitle,
    /// Title is the editor's "Auto Draft" placeholder.
    AutoDraft,
    /// Taxonomy row pointing at a term that is not in the terms table.
    MissingTerm,
    /// Relationship whose post or term was not migrated.
    UnresolvedLink,
    /// Further category of a post that already has one.
    ExtraCategory,
    /// Row whose id column is not numeric.
    Malformed,
}

/// Per-phase counters.
#[derive(Debug, Clone, Serialize)]
pub struct PhaseStats {
    pub phase: Phase,
    pub rows_seen: usize,
    pub migrated: usize,
    pub skipped: usize,
    /// Records whose slug was suffixed with the source id.
    pub renamed_slugs: usize,
    pub skip_reasons: BTreeMap<SkipReason, usize>,
}

impl PhaseStats {
    pub fn new(phase: Phase) -> Self {
        Self {
            phase,
            rows_seen: 0,
            migrated: 0,
            skipped: 0,
            renamed_slugs: 0,
            skip_reasons: BTreeMap::new(),
        }
    }

    pub fn skip(&mut self, reason: SkipReason) {
        self.skipped += 1;
        *self.skip_reasons.entry(reason).or_insert(0) += 1;
    }

    /// Count one migrated row, logging every `interval` rows.
    pub fn migrated(&mut self, interval: usize) {
        self.migrated += 1;
        if interval > 0 && self.migrated % interval == 0 {
            info!("  {} {} migrated...", self.migrated, self.phase.as_str());
        }
    }

    pub fn skipped_for(&self, reason: SkipReason) -> usize {
        self.skip_reasons.get(&reason).copied().unwrap_or(0)
    }

    /// Log the phase totals including the discard breakdown.
    pub fn log_summary(&self) {
        info!(
            "  {}: {} migrated, {} skipped, {} slugs renamed ({} rows seen)",
            self.phase.as_str(),
            self.migrated,
            self.skipped,
            self.renamed_slugs,
            self.rows_seen
        );
        if !self.skip_reasons.is_empty() {
            let breakdown: Vec<String> = self
                .skip_reasons
                .iter()
                .map(|(reason, n)| format!("{:?}={}", reason, n))
                .collect();
            info!("  {} discarded: {}", self.phase.as_str(), breakdown.join(", "));
        }
    }
}

/// A slug ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSlug {
    pub slug: String,
    /// True when the source id suffix was appended.
    pub renamed: bool,
}

/// Derive the destination slug for a record.
///
/// Uses the source slug, or `<kind>-<id>` when it is empty. If another record
/// (a different source id, or one created in the CMS) already holds it, the
/// slug becomes `<slug>-<source_id>`. A record keeps its own slug on re-runs.
pub async fn resolve_slug(
    store: &dyn DestinationStore,
    kind: EntityKind,
    source_slug: Option<&str>,
    source_id: i64,
) -> Result<ResolvedSlug> {
    let base = match source_slug.map(str::trim).filter(|s| !s.is_empty()) {
        Some(slug) => slug.to_string(),
        None => kind.fallback_slug(source_id),
    };

    match store.slug_owner(kind, &base).await? {
        Some(owner) if owner.source_id != Some(source_id) => Ok(ResolvedSlug {
            slug: format!("{}-{}", base, source_id),
            renamed: true,
        }),
        _ => Ok(ResolvedSlug {
            slug: base,
            renamed: false,
        }),
    }
}
