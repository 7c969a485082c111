//! 审计日志仓储
//!
//! 只追加不修改。状态变更路径通过 `append_in_tx` 把审计条目
//! 和变更本身放进同一个事务。

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Row};

use super::traits::AuditRepositoryTrait;
use crate::error::Result;
use crate::models::AuditEntry;

/// 审计日志仓储
pub struct AuditRepository {
    pool: PgPool,
}

impl AuditRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 追加审计条目，返回新条目 ID
    pub async fn append(&self, entry: &AuditEntry) -> Result<i64> {
        let mut conn = self.pool.acquire().await?;
        Self::append_in_tx(&mut conn, entry).await
    }

    /// 在事务中追加审计条目
    pub async fn append_in_tx(conn: &mut PgConnection, entry: &AuditEntry) -> Result<i64> {
        let row = sqlx::query(
            r#"
            INSERT INTO audit_entries
                (realm_id, actor_id, actor_display, action, target_id, target_display, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, NOW())
            RETURNING id
            "#,
        )
        .bind(entry.realm_id)
        .bind(&entry.actor_id)
        .bind(&entry.actor_display)
        .bind(&entry.action)
        .bind(&entry.target_id)
        .bind(&entry.target_display)
        .fetch_one(conn)
        .await?;

        Ok(row.get("id"))
    }

    /// 按租户分页列出审计条目（时间倒序）
    pub async fn list_by_realm(
        &self,
        realm_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<AuditEntry>> {
        let entries = sqlx::query_as::<_, AuditEntry>(
            r#"
            SELECT id, realm_id, actor_id, actor_display, action,
                   target_id, target_display, created_at
            FROM audit_entries
            WHERE realm_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(realm_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// 统计租户内匹配动作前缀的条目数（测试与报表用）
    pub async fn count_by_realm(&self, realm_id: i64) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM audit_entries WHERE realm_id = $1")
                .bind(realm_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }
}

#[async_trait]
impl AuditRepositoryTrait for AuditRepository {
    async fn append(&self, entry: &AuditEntry) -> Result<i64> {
        self.append(entry).await
    }

    async fn list_by_realm(
        &self,
        realm_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<AuditEntry>> {
        self.list_by_realm(realm_id, limit, offset).await
    }
}
