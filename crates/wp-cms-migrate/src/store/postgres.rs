//! PostgreSQL destination store.
//!
//! Writes into the CMS tables using the Prisma naming convention (quoted
//! PascalCase tables, camelCase columns). WordPress ids live in a unique
//! `"wpId"` column, which is the conflict target of every upsert.

use std::time::Instant;

use async_trait::async_trait;
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use serde::Serialize;
use tokio_postgres::{Config as PgConfig, NoTls};
use tracing::{debug, info};

use super::{tls, DestinationStore, EnsuredAdmin};
use crate::config::TargetConfig;
use crate::error::{MigrateError, Result};
use crate::model::{AdminAccount, Category, EntityKind, Page, Post, Setting, SlugOwner, Tag};

/// PostgreSQL identifiers are truncated past 63 bytes.
const MAX_IDENTIFIER_LENGTH: usize = 63;

/// Quote a PostgreSQL identifier, doubling embedded quotes.
fn quote_ident(name: &str) -> Result<String> {
    if name.is_empty() {
        return Err(MigrateError::Config("Identifier cannot be empty".to_string()));
    }
    if name.contains('\0') {
        return Err(MigrateError::Config(format!(
            "Identifier contains null byte: {:?}",
            name
        )));
    }
    if name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(MigrateError::Config(format!(
            "Identifier exceeds {} bytes: {:?}",
            MAX_IDENTIFIER_LENGTH, name
        )));
    }
    Ok(format!("\"{}\"", name.replace('"', "\"\"")))
}

/// Table holding records of `kind`.
fn table_name(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Category => "\"Category\"",
        EntityKind::Tag => "\"Tag\"",
        EntityKind::Post => "\"Post\"",
        EntityKind::Page => "\"Page\"",
    }
}

/// Result of a connectivity probe.
#[derive(Debug, Clone, Serialize)]
pub struct HealthCheckResult {
    pub connected: bool,
    pub latency_ms: u64,
    pub server_version: Option<String>,
    pub error: Option<String>,
}

/// Pooled PostgreSQL store.
pub struct PgStore {
    pool: Pool,
    schema: String,
}

impl PgStore {
    /// Connect to the target database and verify the connection.
    pub async fn connect(config: &TargetConfig) -> Result<Self> {
        let mut pg_config = PgConfig::new();
        pg_config.host(&config.host);
        pg_config.port(config.port);
        pg_config.dbname(&config.database);
        pg_config.user(&config.user);
        pg_config.password(&config.password);

        let mgr_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };

        let mgr = match tls::connector(config)? {
            Some(tls) => Manager::from_config(pg_config, tls, mgr_config),
            None => Manager::from_config(pg_config, NoTls, mgr_config),
        };

        let pool = Pool::builder(mgr)
            .max_size(config.max_connections)
            .build()
            .map_err(|e| MigrateError::pool(e.to_string(), "building target pool"))?;

        let client = pool.get().await?;
        client.simple_query("SELECT 1").await?;

        info!(
            "Connected to PostgreSQL: {}:{}/{}",
            config.host, config.port, config.database
        );

        Ok(Self {
            pool,
            schema: quote_ident(&config.schema)?,
        })
    }

    /// Probe the server and report latency instead of failing.
    pub async fn health_check(config: &TargetConfig) -> HealthCheckResult {
        let start = Instant::now();
        let probe = async {
            let store = Self::connect(config).await?;
            let client = store.pool.get().await?;
            let row = client.query_one("SHOW server_version", &[]).await?;
            Ok::<String, MigrateError>(row.get(0))
        };

        match probe.await {
            Ok(version) => HealthCheckResult {
                connected: true,
                latency_ms: start.elapsed().as_millis() as u64,
                server_version: Some(version),
                error: None,
            },
            Err(e) => HealthCheckResult {
                connected: false,
                latency_ms: start.elapsed().as_millis() as u64,
                server_version: None,
                error: Some(e.to_string()),
            },
        }
    }

    fn ddl(&self) -> Vec<String> {
        let s = &self.schema;
        vec![
            format!("CREATE SCHEMA IF NOT EXISTS {s}"),
            format!(
                r#"CREATE TABLE IF NOT EXISTS {s}."User" (
                    id TEXT PRIMARY KEY,
                    email TEXT NOT NULL UNIQUE,
                    password TEXT NOT NULL,
                    name TEXT,
                    role TEXT NOT NULL DEFAULT 'USER',
                    "createdAt" TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    "updatedAt" TIMESTAMPTZ NOT NULL DEFAULT NOW()
                )"#
            ),
            format!(
                r#"CREATE TABLE IF NOT EXISTS {s}."Setting" (
                    id TEXT PRIMARY KEY,
                    key TEXT NOT NULL UNIQUE,
                    value TEXT NOT NULL,
                    type TEXT NOT NULL DEFAULT 'string'
                )"#
            ),
            format!(
                r#"CREATE TABLE IF NOT EXISTS {s}."Category" (
                    id TEXT PRIMARY KEY,
                    name TEXT NOT NULL,
                    slug TEXT NOT NULL UNIQUE,
                    description TEXT,
                    "wpId" BIGINT UNIQUE,
                    "wpParentId" BIGINT,
                    "createdAt" TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    "updatedAt" TIMESTAMPTZ NOT NULL DEFAULT NOW()
                )"#
            ),
            format!(
                r#"CREATE TABLE IF NOT EXISTS {s}."Tag" (
                    id TEXT PRIMARY KEY,
                    name TEXT NOT NULL,
                    slug TEXT NOT NULL UNIQUE,
                    "wpId" BIGINT UNIQUE,
                    "createdAt" TIMESTAMPTZ NOT NULL DEFAULT NOW()
                )"#
            ),
            format!(
                r#"CREATE TABLE IF NOT EXISTS {s}."Post" (
                    id TEXT PRIMARY KEY,
                    title TEXT NOT NULL,
                    slug TEXT NOT NULL UNIQUE,
                    content TEXT NOT NULL,
                    excerpt TEXT,
                    status TEXT NOT NULL CHECK (status IN ('PUBLISHED', 'DRAFT')),
                    "authorId" TEXT NOT NULL REFERENCES {s}."User"(id),
                    "categoryId" TEXT REFERENCES {s}."Category"(id) ON DELETE SET NULL,
                    "wpId" BIGINT UNIQUE,
                    "publishedAt" TIMESTAMPTZ,
                    "createdAt" TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    "updatedAt" TIMESTAMPTZ NOT NULL DEFAULT NOW()
                )"#
            ),
            format!(
                r#"CREATE TABLE IF NOT EXISTS {s}."Page" (
                    id TEXT PRIMARY KEY,
                    title TEXT NOT NULL,
                    slug TEXT NOT NULL UNIQUE,
                    content TEXT NOT NULL,
                    status TEXT NOT NULL CHECK (status IN ('PUBLISHED', 'DRAFT')),
                    "menuOrder" INTEGER NOT NULL DEFAULT 0,
                    "wpId" BIGINT UNIQUE,
                    "createdAt" TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    "updatedAt" TIMESTAMPTZ NOT NULL DEFAULT NOW()
                )"#
            ),
            format!(
                r#"CREATE TABLE IF NOT EXISTS {s}."_PostToTag" (
                    "A" TEXT NOT NULL REFERENCES {s}."Post"(id) ON DELETE CASCADE,
                    "B" TEXT NOT NULL REFERENCES {s}."Tag"(id) ON DELETE CASCADE,
                    PRIMARY KEY ("A", "B")
                )"#
            ),
        ]
    }
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[async_trait]
impl DestinationStore for PgStore {
    async fn init_schema(&self) -> Result<()> {
        let conn = self.pool.get().await?;
        for statement in self.ddl() {
            conn.execute(statement.as_str(), &[]).await?;
        }
        debug!("Destination schema {} ready", self.schema);
        Ok(())
    }

    async fn ensure_admin(&self, admin: &AdminAccount) -> Result<EnsuredAdmin> {
        let conn = self.pool.get().await?;
        let inserted = conn
            .execute(
                &format!(
                    r#"INSERT INTO {}."User" (id, email, password, name, role)
                       VALUES ($1, $2, $3, $4, $5)
                       ON CONFLICT (email) DO NOTHING"#,
                    self.schema
                ),
                &[
                    &new_id(),
                    &admin.email,
                    &admin.password_hash,
                    &admin.name,
                    &AdminAccount::ROLE,
                ],
            )
            .await?;

        let row = conn
            .query_one(
                &format!(r#"SELECT id FROM {}."User" WHERE email = $1"#, self.schema),
                &[&admin.email],
            )
            .await?;

        Ok(EnsuredAdmin {
            id: row.get(0),
            created: inserted == 1,
        })
    }

    async fn upsert_setting(&self, setting: &Setting) -> Result<()> {
        let conn = self.pool.get().await?;
        conn.execute(
            &format!(
                r#"INSERT INTO {}."Setting" (id, key, value, type)
                   VALUES ($1, $2, $3, $4)
                   ON CONFLICT (key) DO UPDATE SET
                      value = EXCLUDED.value,
                      type = EXCLUDED.type"#,
                self.schema
            ),
            &[&new_id(), &setting.key, &setting.value, &setting.kind],
        )
        .await?;
        Ok(())
    }

    async fn slug_owner(&self, kind: EntityKind, slug: &str) -> Result<Option<SlugOwner>> {
        let conn = self.pool.get().await?;
        let row = conn
            .query_opt(
                &format!(
                    r#"SELECT "wpId" FROM {}.{} WHERE slug = $1"#,
                    self.schema,
                    table_name(kind)
                ),
                &[&slug],
            )
            .await?;

        Ok(row.map(|r| SlugOwner {
            source_id: r.get(0),
        }))
    }

    async fn upsert_category(&self, category: &Category) -> Result<()> {
        let conn = self.pool.get().await?;
        conn.execute(
            &format!(
                r#"INSERT INTO {}."Category" (id, name, slug, description, "wpId", "wpParentId")
                   VALUES ($1, $2, $3, $4, $5, $6)
                   ON CONFLICT ("wpId") DO UPDATE SET
                      name = EXCLUDED.name,
                      slug = EXCLUDED.slug,
                      description = EXCLUDED.description,
                      "wpParentId" = EXCLUDED."wpParentId",
                      "updatedAt" = NOW()"#,
                self.schema
            ),
            &[
                &new_id(),
                &category.name,
                &category.slug,
                &category.description,
                &category.source_id,
                &category.parent_source_id,
            ],
        )
        .await?;
        Ok(())
    }

    async fn upsert_tag(&self, tag: &Tag) -> Result<()> {
        let conn = self.pool.get().await?;
        conn.execute(
            &format!(
                r#"INSERT INTO {}."Tag" (id, name, slug, "wpId")
                   VALUES ($1, $2, $3, $4)
                   ON CONFLICT ("wpId") DO UPDATE SET
                      name = EXCLUDED.name,
                      slug = EXCLUDED.slug"#,
                self.schema
            ),
            &[&new_id(), &tag.name, &tag.slug, &tag.source_id],
        )
        .await?;
        Ok(())
    }

    async fn upsert_post(&self, post: &Post) -> Result<()> {
        let conn = self.pool.get().await?;
        conn.execute(
            &format!(
                r#"INSERT INTO {}."Post"
                   (id, title, slug, content, excerpt, status, "authorId", "wpId",
                    "publishedAt", "createdAt")
                   VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, COALESCE($10, NOW()))
                   ON CONFLICT ("wpId") DO UPDATE SET
                      title = EXCLUDED.title,
                      slug = EXCLUDED.slug,
                      content = EXCLUDED.content,
                      excerpt = EXCLUDED.excerpt,
                      status = EXCLUDED.status,
                      "publishedAt" = EXCLUDED."publishedAt",
                      "updatedAt" = NOW()"#,
                self.schema
            ),
            &[
                &new_id(),
                &post.title,
                &post.slug,
                &post.content,
                &post.excerpt,
                &post.status.as_str(),
                &post.author_id,
                &post.source_id,
                &post.published_at,
                &post.created_at,
            ],
        )
        .await?;
        Ok(())
    }

    async fn upsert_page(&self, page: &Page) -> Result<()> {
        let conn = self.pool.get().await?;
        conn.execute(
            &format!(
                r#"INSERT INTO {}."Page"
                   (id, title, slug, content, status, "menuOrder", "wpId", "createdAt")
                   VALUES ($1, $2, $3, $4, $5, $6, $7, COALESCE($8, NOW()))
                   ON CONFLICT ("wpId") DO UPDATE SET
                      title = EXCLUDED.title,
                      slug = EXCLUDED.slug,
                      content = EXCLUDED.content,
                      status = EXCLUDED.status,
                      "menuOrder" = EXCLUDED."menuOrder",
                      "updatedAt" = NOW()"#,
                self.schema
            ),
            &[
                &new_id(),
                &page.title,
                &page.slug,
                &page.content,
                &page.status.as_str(),
                &page.menu_order,
                &page.source_id,
                &page.created_at,
            ],
        )
        .await?;
        Ok(())
    }

    async fn set_post_category(
        &self,
        post_source_id: i64,
        category_source_id: i64,
    ) -> Result<bool> {
        let conn = self.pool.get().await?;
        let updated = conn
            .execute(
                &format!(
                    r#"UPDATE {s}."Post" p
                       SET "categoryId" = c.id, "updatedAt" = NOW()
                       FROM {s}."Category" c
                       WHERE p."wpId" = $1 AND c."wpId" = $2"#,
                    s = self.schema
                ),
                &[&post_source_id, &category_source_id],
            )
            .await?;
        Ok(updated > 0)
    }

    async fn add_post_tag(&self, post_source_id: i64, tag_source_id: i64) -> Result<bool> {
        let conn = self.pool.get().await?;
        let row = conn
            .query_one(
                &format!(
                    r#"WITH pair AS (
                          SELECT p.id AS post_id, t.id AS tag_id
                          FROM {s}."Post" p, {s}."Tag" t
                          WHERE p."wpId" = $1 AND t."wpId" = $2
                       ), linked AS (
                          INSERT INTO {s}."_PostToTag" ("A", "B")
                          SELECT post_id, tag_id FROM pair
                          ON CONFLICT DO NOTHING
                       )
                       SELECT COUNT(*) FROM pair"#,
                    s = self.schema
                ),
                &[&post_source_id, &tag_source_id],
            )
            .await?;
        let found: i64 = row.get(0);
        Ok(found > 0)
    }

    async fn count(&self, kind: EntityKind) -> Result<i64> {
        let conn = self.pool.get().await?;
        let row = conn
            .query_one(
                &format!("SELECT COUNT(*) FROM {}.{}", self.schema, table_name(kind)),
                &[],
            )
            .await?;
        Ok(row.get(0))
    }

    fn backend_type(&self) -> &'static str {
        "postgres"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("public").unwrap(), "\"public\"");
        assert_eq!(quote_ident("we\"ird").unwrap(), "\"we\"\"ird\"");
        assert!(quote_ident("").is_err());
        assert!(quote_ident("bad\0name").is_err());
        assert!(quote_ident(&"x".repeat(64)).is_err());
    }

    #[test]
    fn test_table_names_are_quoted() {
        assert_eq!(table_name(EntityKind::Category), "\"Category\"");
        assert_eq!(table_name(EntityKind::Page), "\"Page\"");
    }
}
