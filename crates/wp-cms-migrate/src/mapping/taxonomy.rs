//! Categories and tags from `terms` joined with `term_taxonomy`.

use std::collections::HashMap;

use tracing::{debug, info};

use super::{resolve_slug, MapContext, Phase, PhaseStats, SkipReason};
use crate::dump::layout::{TaxonomyColumn, TermColumn};
use crate::dump::Row;
use crate::error::{MigrateError, Result};
use crate::model::{Category, EntityKind, Tag};

/// A row of the terms table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Term {
    pub id: i64,
    pub name: String,
    pub slug: Option<String>,
    pub group: i64,
}

/// Terms by id. Built once per phase.
#[derive(Debug, Default)]
pub struct TermIndex {
    terms: HashMap<i64, Term>,
}

impl TermIndex {
    /// Index term rows, dropping rows without a numeric id.
    pub fn build(rows: &[Row]) -> Self {
        let terms = rows
            .iter()
            .filter_map(|row| {
                let id = row.int(TermColumn::TermId)?;
                Some((
                    id,
                    Term {
                        id,
                        name: row.text(TermColumn::Name).to_string(),
                        slug: row.get(TermColumn::Slug).map(str::to_string),
                        group: row.int(TermColumn::TermGroup).unwrap_or(0),
                    },
                ))
            })
            .collect();
        Self { terms }
    }

    pub fn get(&self, id: i64) -> Option<&Term> {
        self.terms.get(&id)
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
enum Taxonomy {
    Category,
    Tag,
}

impl Taxonomy {
    fn source_name(self) -> &'static str {
        match self {
            Taxonomy::Category => "category",
            Taxonomy::Tag => "post_tag",
        }
    }

    fn entity(self) -> EntityKind {
        match self {
            Taxonomy::Category => EntityKind::Category,
            Taxonomy::Tag => EntityKind::Tag,
        }
    }

    fn phase(self) -> Phase {
        match self {
            Taxonomy::Category => Phase::Categories,
            Taxonomy::Tag => Phase::Tags,
        }
    }
}

/// Migrate every `category` taxonomy row.
pub async fn migrate_categories(ctx: &MapContext<'_>) -> Result<PhaseStats> {
    migrate_terms(ctx, Taxonomy::Category).await
}

/// Migrate every `post_tag` taxonomy row.
pub async fn migrate_tags(ctx: &MapContext<'_>) -> Result<PhaseStats> {
    migrate_terms(ctx, Taxonomy::Tag).await
}

async fn migrate_terms(ctx: &MapContext<'_>, taxonomy: Taxonomy) -> Result<PhaseStats> {
    let mut stats = PhaseStats::new(taxonomy.phase());
    let index = TermIndex::build(&ctx.dump.rows::<TermColumn>(ctx.prefix));
    let rows = ctx.dump.rows::<TaxonomyColumn>(ctx.prefix);
    info!(
        "Migrating {}: {} terms indexed, {} taxonomy rows",
        taxonomy.phase().as_str(),
        index.len(),
        rows.len()
    );

    for row in rows
        .iter()
        .filter(|r| r.text(TaxonomyColumn::Taxonomy) == taxonomy.source_name())
    {
        stats.rows_seen += 1;

        let Some(term_id) = row.int(TaxonomyColumn::TermId) else {
            stats.skip(SkipReason::Malformed);
            continue;
        };
        let Some(term) = index.get(term_id) else {
            debug!("  taxonomy row references missing term {}", term_id);
            stats.skip(SkipReason::MissingTerm);
            continue;
        };

        let renamed = migrate_term(ctx, taxonomy, term, row)
            .await
            .map_err(|e| MigrateError::upsert(taxonomy.entity().as_str(), term.id, e))?;
        if renamed {
            stats.renamed_slugs += 1;
        }
        stats.migrated(ctx.progress_interval);
    }

    stats.log_summary();
    Ok(stats)
}

/// Upsert one term. Returns whether its slug had to be renamed.
async fn migrate_term(
    ctx: &MapContext<'_>,
    taxonomy: Taxonomy,
    term: &Term,
    row: &Row,
) -> Result<bool> {
    let resolved = resolve_slug(ctx.store, taxonomy.entity(), term.slug.as_deref(), term.id).await?;

    match taxonomy {
        Taxonomy::Category => {
            let category = Category {
                source_id: term.id,
                name: term.name.clone(),
                slug: resolved.slug,
                description: row.text(TaxonomyColumn::Description).to_string(),
                parent_source_id: row.int(TaxonomyColumn::Parent).filter(|&p| p > 0),
            };
            ctx.store.upsert_category(&category).await?;
            debug!("  ✓ category: {} ({})", category.name, category.slug);
        }
        Taxonomy::Tag => {
            let tag = Tag {
                source_id: term.id,
                name: term.name.clone(),
                slug: resolved.slug,
            };
            ctx.store.upsert_tag(&tag).await?;
            debug!("  ✓ tag: {} ({})", tag.name, tag.slug);
        }
    }

    Ok(resolved.renamed)
}
