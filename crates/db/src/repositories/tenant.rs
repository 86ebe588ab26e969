//! Tenant repository backed by the blogs table.

use sea_orm::sea_query::{Expr, Func, LikeExpr};
use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder};
use wharf_core::tenant::{TenantDirectory, TenantError, TenantRecord};

use crate::entities::blogs;

/// Path of a tenant that owns its whole (sub)domain.
const ROOT_PATH: &str = "/";

/// Tenant repository for directory lookups.
#[derive(Debug)]
pub struct TenantRepository {
    db: DatabaseConnection,
}

impl TenantRepository {
    /// Creates a new tenant repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Finds the first blog at `/` whose domain starts with `prefix`,
    /// ignoring case.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_blog_by_domain_prefix(
        &self,
        prefix: &str,
    ) -> Result<Option<blogs::Model>, DbErr> {
        let pattern = format!("{}%", escape_like(&prefix.to_lowercase()));

        blogs::Entity::find()
            .filter(
                Expr::expr(Func::lower(Expr::col(blogs::Column::Domain)))
                    .like(LikeExpr::new(pattern).escape('\\')),
            )
            .filter(blogs::Column::Path.eq(ROOT_PATH))
            .order_by_asc(blogs::Column::BlogId)
            .one(&self.db)
            .await
    }
}

impl TenantDirectory for TenantRepository {
    async fn find_by_domain_prefix(
        &self,
        subdomain: &str,
    ) -> Result<Option<TenantRecord>, TenantError> {
        let blog = self
            .find_blog_by_domain_prefix(subdomain)
            .await
            .map_err(|e| TenantError::directory(e.to_string()))?;

        Ok(blog.map(|b| TenantRecord {
            tenant_id: b.blog_id,
            network_id: b.site_id,
        }))
    }
}

/// Escapes LIKE wildcards so the subdomain only matches literally.
fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
