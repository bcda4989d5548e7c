//! Posts and pages from the `posts` table.

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::{debug, info};

use super::{resolve_slug, MapContext, Phase, PhaseStats, SkipReason};
use crate::dump::layout::PostColumn;
use crate::dump::Row;
use crate::error::{MigrateError, Result};
use crate::model::{ContentStatus, EntityKind, Page, Post};

const WP_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const AUTO_DRAFT_TITLE: &str = "Auto Draft";

/// Parse a WordPress `DATETIME` value. The zero date means "unset".
pub fn parse_wp_datetime(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() || value.starts_with("0000-00-00") {
        return None;
    }
    NaiveDateTime::parse_from_str(value, WP_DATETIME_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Fields shared by posts and pages after filtering.
#[derive(Debug)]
struct Content<'r> {
    id: i64,
    title: &'r str,
    status: ContentStatus,
    slug: Option<&'r str>,
    body: &'r str,
    /// `post_date_gmt`, else `post_date`.
    timestamp: Option<DateTime<Utc>>,
}

/// Apply the shared filters for `post_type`.
fn classify<'r>(row: &'r Row, post_type: &str) -> std::result::Result<Content<'r>, SkipReason> {
    if row.text(PostColumn::Type) != post_type {
        return Err(SkipReason::WrongType);
    }
    let status =
        ContentStatus::from_wordpress(row.text(PostColumn::Status)).ok_or(SkipReason::WrongStatus)?;
    let id = row.int(PostColumn::Id).ok_or(SkipReason::Malformed)?;
    let title = row.text(PostColumn::Title);
    if title.trim().is_empty() {
        return Err(SkipReason::EmptyTitle);
    }

    let timestamp = row
        .get(PostColumn::DateGmt)
        .and_then(parse_wp_datetime)
        .or_else(|| row.get(PostColumn::Date).and_then(parse_wp_datetime));

    Ok(Content {
        id,
        title,
        status,
        slug: row.get(PostColumn::Name),
        body: row.text(PostColumn::Content),
        timestamp,
    })
}

/// Migrate published and draft posts, authored by `author_id`.
pub async fn migrate_posts(ctx: &MapContext<'_>, author_id: &str) -> Result<PhaseStats> {
    let mut stats = PhaseStats::new(Phase::Posts);
    let rows = ctx.dump.rows::<PostColumn>(ctx.prefix);
    info!("Migrating posts: {} rows in posts table", rows.len());

    for row in rows.iter() {
        stats.rows_seen += 1;
        let content = match classify(row, "post") {
            Ok(content) if content.title.starts_with(AUTO_DRAFT_TITLE) => {
                stats.skip(SkipReason::AutoDraft);
                continue;
            }
            Ok(content) => content,
            Err(reason) => {
                stats.skip(reason);
                continue;
            }
        };

        let id = content.id;
        let renamed = migrate_post(ctx, content, row, author_id)
            .await
            .map_err(|e| MigrateError::upsert(EntityKind::Post.as_str(), id, e))?;
        if renamed {
            stats.renamed_slugs += 1;
        }
        stats.migrated(ctx.progress_interval);
    }

    stats.log_summary();
    Ok(stats)
}

async fn migrate_post(
    ctx: &MapContext<'_>,
    content: Content<'_>,
    row: &Row,
    author_id: &str,
) -> Result<bool> {
    let resolved = resolve_slug(ctx.store, EntityKind::Post, content.slug, content.id).await?;

    let published_at = match content.status {
        ContentStatus::Published => Some(content.timestamp.unwrap_or(ctx.started_at)),
        ContentStatus::Draft => None,
    };

    let post = Post {
        source_id: content.id,
        title: content.title.to_string(),
        slug: resolved.slug,
        content: content.body.to_string(),
        excerpt: row
            .get(PostColumn::Excerpt)
            .filter(|e| !e.trim().is_empty())
            .map(str::to_string),
        status: content.status,
        author_id: author_id.to_string(),
        published_at,
        created_at: content.timestamp,
    };
    ctx.store.upsert_post(&post).await?;
    debug!("  ✓ post: {} ({})", post.title, post.slug);

    Ok(resolved.renamed)
}

/// Migrate published and draft pages.
pub async fn migrate_pages(ctx: &MapContext<'_>) -> Result<PhaseStats> {
    let mut stats = PhaseStats::new(Phase::Pages);
    let rows = ctx.dump.rows::<PostColumn>(ctx.prefix);
    info!("Migrating pages: {} rows in posts table", rows.len());

    for row in rows.iter() {
        stats.rows_seen += 1;
        let content = match classify(row, "page") {
            Ok(content) => content,
            Err(reason) => {
                stats.skip(reason);
                continue;
            }
        };

        let id = content.id;
        let renamed = migrate_page(ctx, content, row)
            .await
            .map_err(|e| MigrateError::upsert(EntityKind::Page.as_str(), id, e))?;
        if renamed {
            stats.renamed_slugs += 1;
        }
        stats.migrated(ctx.progress_interval);
    }

    stats.log_summary();
    Ok(stats)
}

async fn migrate_page(ctx: &MapContext<'_>, content: Content<'_>, row: &Row) -> Result<bool> {
    let resolved = resolve_slug(ctx.store, EntityKind::Page, content.slug, content.id).await?;

    let page = Page {
        source_id: content.id,
        title: content.title.to_string(),
        slug: resolved.slug,
        content: content.body.to_string(),
        status: content.status,
        menu_order: row
            .int(PostColumn::MenuOrder)
            .and_then(|n| i32::try_from(n).ok())
            .unwrap_or(0),
        created_at: content.timestamp,
    };
    ctx.store.upsert_page(&page).await?;
    debug!("  ✓ page: {} ({})", page.title, page.slug);

    Ok(resolved.renamed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dump::Dump;
    use crate::store::{DestinationStore, MemoryStore};
    use chrono::TimeZone;

    /// A full 23-column posts tuple.
    fn post_tuple(id: i64, title: &str, status: &str, name: &str, post_type: &str) -> String {
        format!(
            "({id},1,'2024-03-01 10:00:00','2024-03-01 02:00:00','Body of {id}','{title}','','{status}','open','open','','{name}','','','2024-03-01 10:00:00','2024-03-01 02:00:00','',0,'https://example.com/?p={id}',3,'{post_type}','',0)"
        )
    }

    fn dump_of(tuples: &[String]) -> Dump {
        Dump::from_text(format!(
            "INSERT INTO `wp_posts` VALUES {};\n",
            tuples.join(",")
        ))
        .unwrap()
    }

    fn context<'a>(dump: &'a Dump, store: &'a MemoryStore) -> MapContext<'a> {
        MapContext {
            dump,
            prefix: "wp_",
            store,
            progress_interval: 10,
            started_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_parse_wp_datetime() {
        assert_eq!(
            parse_wp_datetime("2024-03-01 02:00:00"),
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 2, 0, 0).unwrap())
        );
        assert_eq!(parse_wp_datetime("0000-00-00 00:00:00"), None);
        assert_eq!(parse_wp_datetime("yesterday"), None);
        assert_eq!(parse_wp_datetime(""), None);
    }

    #[tokio::test]
    async fn test_post_filtering() {
        let dump = dump_of(&[
            post_tuple(10, "Hello", "publish", "hello", "post"),
            post_tuple(11, "Later", "draft", "later", "post"),
            post_tuple(12, "Auto Draft", "draft", "", "post"),
            post_tuple(13, "Secret", "private", "secret", "post"),
            post_tuple(14, "About", "publish", "about", "page"),
            post_tuple(15, "", "publish", "untitled", "post"),
            post_tuple(16, "Logo", "inherit", "logo", "attachment"),
        ]);
        let store = MemoryStore::new();
        let stats = migrate_posts(&context(&dump, &store), "admin-1").await.unwrap();

        assert_eq!(stats.rows_seen, 7);
        assert_eq!(stats.migrated, 2);
        assert_eq!(stats.skipped_for(SkipReason::AutoDraft), 1);
        assert_eq!(stats.skipped_for(SkipReason::WrongStatus), 1);
        assert_eq!(stats.skipped_for(SkipReason::WrongType), 2);
        assert_eq!(stats.skipped_for(SkipReason::EmptyTitle), 1);

        let posts = store.posts();
        let published = &posts[0];
        assert_eq!(published.status, ContentStatus::Published);
        assert_eq!(published.slug, "hello");
        assert_eq!(published.author_id, "admin-1");
        assert_eq!(published.excerpt, None);
        assert_eq!(
            published.published_at,
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 2, 0, 0).unwrap())
        );

        let draft = &posts[1];
        assert_eq!(draft.status, ContentStatus::Draft);
        assert_eq!(draft.published_at, None);
    }

    #[tokio::test]
    async fn test_published_without_dates_uses_run_start() {
        let dump = Dump::from_text(
            "INSERT INTO `wp_posts` VALUES (20,1,'0000-00-00 00:00:00','0000-00-00 00:00:00','x','Undated','','publish','open','open','','','','','0000-00-00 00:00:00','0000-00-00 00:00:00','',0,'',0,'post','',0);\n",
        )
        .unwrap();
        let store = MemoryStore::new();
        let ctx = context(&dump, &store);
        migrate_posts(&ctx, "admin-1").await.unwrap();

        let post = &store.posts()[0];
        assert_eq!(post.slug, "post-20");
        assert_eq!(post.published_at, Some(ctx.started_at));
    }

    #[tokio::test]
    async fn test_pages_carry_menu_order_and_rerun() {
        let dump = dump_of(&[
            post_tuple(14, "About", "publish", "about", "page"),
            post_tuple(15, "Contact", "draft", "about", "page"),
            post_tuple(10, "Hello", "publish", "hello", "post"),
        ]);
        let store = MemoryStore::new();
        let ctx = context(&dump, &store);

        let first = migrate_pages(&ctx).await.unwrap();
        assert_eq!(first.migrated, 2);
        assert_eq!(first.renamed_slugs, 1);
        assert_eq!(first.skipped_for(SkipReason::WrongType), 1);

        let created = store.pages()[0].created_at;
        migrate_pages(&ctx).await.unwrap();
        assert_eq!(store.count(EntityKind::Page).await.unwrap(), 2);

        let pages = store.pages();
        assert_eq!(pages[0].slug, "about");
        assert_eq!(pages[0].menu_order, 3);
        assert_eq!(pages[0].created_at, created);
        assert_eq!(pages[1].slug, "about-15");
        assert_eq!(pages[1].status, ContentStatus::Draft);
    }

    #[tokio::test]
    async fn test_escaped_content_is_decoded() {
        let dump = Dump::from_text(
            "INSERT INTO `wp_posts` VALUES (30,1,'2024-01-01 00:00:00','2024-01-01 00:00:00','line one\\nit\\'s here','Quotes \\\"ok\\\"','short','publish','open','open','','quotes','','','2024-01-01 00:00:00','2024-01-01 00:00:00','',0,'',0,'post','',0);\n",
        )
        .unwrap();
        let store = MemoryStore::new();
        migrate_posts(&context(&dump, &store), "admin-1").await.unwrap();

        let post = &store.posts()[0];
        assert_eq!(post.content, "line one\nit's here");
        assert_eq!(post.title, "Quotes \"ok\"");
        assert_eq!(post.excerpt.as_deref(), Some("short"));
    }
}
