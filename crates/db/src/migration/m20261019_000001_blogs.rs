//! Tenant directory migration.
//!
//! Creates the blogs table that maps tenant domains to blog and network ids.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(BLOGS_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared("DROP TABLE IF EXISTS blogs CASCADE;")
            .await?;
        Ok(())
    }
}

const BLOGS_SQL: &str = r"
-- One row per tenant site
CREATE TABLE blogs (
    blog_id BIGSERIAL PRIMARY KEY,
    site_id BIGINT NOT NULL DEFAULT 1,
    domain VARCHAR(200) NOT NULL,
    path VARCHAR(100) NOT NULL DEFAULT '/',
    CONSTRAINT uq_blogs_domain_path UNIQUE (domain, path)
);

-- Case-insensitive prefix lookup by subdomain
CREATE INDEX idx_blogs_domain_lower ON blogs (lower(domain) varchar_pattern_ops);

-- Main tenant
INSERT INTO blogs (blog_id, site_id, domain, path) VALUES (1, 1, 'localhost', '/');
SELECT setval(pg_get_serial_sequence('blogs', 'blog_id'), (SELECT MAX(blog_id) FROM blogs));
";
