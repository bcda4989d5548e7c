//! Post to category/tag links from `term_relationships`.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info};

use super::{MapContext, Phase, PhaseStats, SkipReason};
use crate::dump::layout::{RelationshipColumn, TaxonomyColumn};
use crate::error::{MigrateError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkTarget {
    Category(i64),
    Tag(i64),
    /// Any other taxonomy (nav_menu, link_category, post_format...).
    Other,
}

/// Link migrated posts to their migrated categories and tags.
///
/// The first category relationship of a post wins; later ones are counted as
/// [`SkipReason::ExtraCategory`]. Relationship rows are processed in dump
/// order, so the choice is stable across runs.
pub async fn migrate_term_links(ctx: &MapContext<'_>) -> Result<PhaseStats> {
    let mut stats = PhaseStats::new(Phase::TermLinks);

    let targets: HashMap<i64, LinkTarget> = ctx
        .dump
        .rows::<TaxonomyColumn>(ctx.prefix)
        .iter()
        .filter_map(|row| {
            let taxonomy_id = row.int(TaxonomyColumn::TermTaxonomyId)?;
            let term_id = row.int(TaxonomyColumn::TermId)?;
            let target = match row.text(TaxonomyColumn::Taxonomy) {
                "category" => LinkTarget::Category(term_id),
                "post_tag" => LinkTarget::Tag(term_id),
                _ => LinkTarget::Other,
            };
            Some((taxonomy_id, target))
        })
        .collect();

    let rows = ctx.dump.rows::<RelationshipColumn>(ctx.prefix);
    info!("Linking posts to terms: {} relationship rows", rows.len());

    let mut categorized: HashSet<i64> = HashSet::new();

    for row in rows.iter() {
        stats.rows_seen += 1;

        let (Some(post_id), Some(taxonomy_id)) = (
            row.int(RelationshipColumn::ObjectId),
            row.int(RelationshipColumn::TermTaxonomyId),
        ) else {
            stats.skip(SkipReason::Malformed);
            continue;
        };

        let linked = match targets.get(&taxonomy_id) {
            None => false,
            Some(LinkTarget::Other) => {
                stats.skip(SkipReason::WrongType);
                continue;
            }
            Some(LinkTarget::Category(_)) if categorized.contains(&post_id) => {
                stats.skip(SkipReason::ExtraCategory);
                continue;
            }
            Some(&LinkTarget::Category(category_id)) => {
                let linked = ctx
                    .store
                    .set_post_category(post_id, category_id)
                    .await
                    .map_err(|e| MigrateError::upsert("post category", post_id, e))?;
                if linked {
                    categorized.insert(post_id);
                }
                linked
            }
            Some(&LinkTarget::Tag(tag_id)) => ctx
                .store
                .add_post_tag(post_id, tag_id)
                .await
                .map_err(|e| MigrateError::upsert("post tag", post_id, e))?,
        };

        if linked {
            stats.migrated(ctx.progress_interval);
        } else {
            debug!(
                "  relationship {} -> {} has no migrated counterpart",
                post_id, taxonomy_id
            );
            stats.skip(SkipReason::UnresolvedLink);
        }
    }

    stats.log_summary();
    Ok(stats)
}
