//! API Key（授权应用）仓储
//!
//! 明文 Key 只在创建时返回一次，认证路径按哈希查找。
//! 删除为软删除，保留 deleted_at 供恢复与清理。

use async_trait::async_trait;
use chrono::{Duration, Utc};
use sqlx::PgPool;
use validator::Validate;

use super::traits::AuthorizedAppRepositoryTrait;
use crate::error::{DbError, Result};
use crate::models::{Actor, AuditEntry, AuthorizedApp};

/// 授权应用仓储
pub struct AuthorizedAppRepository {
    pool: PgPool,
}

impl AuthorizedAppRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 创建授权应用
    ///
    /// 调用方负责生成明文 Key 并计算哈希/预览（见 `verify_shared::crypto`），
    /// 这里只落库哈希。创建动作与审计条目同事务提交。
    pub async fn create(&self, app: &AuthorizedApp, actor: &Actor) -> Result<AuthorizedApp> {
        app.validate()?;

        let mut tx = self.pool.begin().await?;

        let saved = sqlx::query_as::<_, AuthorizedApp>(
            r#"
            INSERT INTO authorized_apps
                (realm_id, name, api_key_type, api_key_hash, api_key_preview,
                 created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, NOW(), NOW())
            RETURNING *
            "#,
        )
        .bind(app.realm_id)
        .bind(&app.name)
        .bind(app.api_key_type)
        .bind(&app.api_key_hash)
        .bind(&app.api_key_preview)
        .fetch_one(&mut *tx)
        .await?;

        let entry = AuditEntry::new(app.realm_id, actor, "created API key")
            .with_target(saved.id.to_string(), saved.name.clone());
        crate::repository::AuditRepository::append_in_tx(&mut tx, &entry).await?;

        tx.commit().await?;
        Ok(saved)
    }

    /// 按 ID 获取（含已软删除的记录）
    pub async fn find(&self, id: i64) -> Result<AuthorizedApp> {
        sqlx::query_as::<_, AuthorizedApp>("SELECT * FROM authorized_apps WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(DbError::AuthorizedAppNotFound)
    }

    /// 认证路径：按 Key 哈希查找未删除的应用
    pub async fn find_by_api_key_hash(&self, api_key_hash: &str) -> Result<AuthorizedApp> {
        sqlx::query_as::<_, AuthorizedApp>(
            "SELECT * FROM authorized_apps WHERE api_key_hash = $1 AND deleted_at IS NULL",
        )
        .bind(api_key_hash)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(DbError::AuthorizedAppNotFound)
    }

    /// 列出租户的授权应用
    pub async fn list_by_realm(
        &self,
        realm_id: i64,
        include_deleted: bool,
    ) -> Result<Vec<AuthorizedApp>> {
        let apps = if include_deleted {
            sqlx::query_as::<_, AuthorizedApp>(
                "SELECT * FROM authorized_apps WHERE realm_id = $1 ORDER BY name ASC",
            )
            .bind(realm_id)
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query_as::<_, AuthorizedApp>(
                r#"
                SELECT * FROM authorized_apps
                WHERE realm_id = $1 AND deleted_at IS NULL
                ORDER BY name ASC
                "#,
            )
            .bind(realm_id)
            .fetch_all(&self.pool)
            .await?
        };
        Ok(apps)
    }

    /// 软删除（幂等：已删除的再删不报错也不重复记审计）
    pub async fn soft_delete(&self, id: i64, actor: &Actor) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let app = sqlx::query_as::<_, AuthorizedApp>(
            "SELECT * FROM authorized_apps WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(DbError::AuthorizedAppNotFound)?;

        if app.is_deleted() {
            tx.commit().await?;
            return Ok(());
        }

        sqlx::query(
            "UPDATE authorized_apps SET deleted_at = NOW(), updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        let entry = AuditEntry::new(app.realm_id, actor, "deleted API key")
            .with_target(id.to_string(), app.name.clone());
        crate::repository::AuditRepository::append_in_tx(&mut tx, &entry).await?;

        tx.commit().await?;
        Ok(())
    }

    /// 恢复软删除（幂等）
    pub async fn restore(&self, id: i64, actor: &Actor) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let app = sqlx::query_as::<_, AuthorizedApp>(
            "SELECT * FROM authorized_apps WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(DbError::AuthorizedAppNotFound)?;

        if !app.is_deleted() {
            tx.commit().await?;
            return Ok(());
        }

        sqlx::query(
            "UPDATE authorized_apps SET deleted_at = NULL, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        let entry = AuditEntry::new(app.realm_id, actor, "restored API key")
            .with_target(id.to_string(), app.name.clone());
        crate::repository::AuditRepository::append_in_tx(&mut tx, &entry).await?;

        tx.commit().await?;
        Ok(())
    }

    /// 清理软删除超过保留期的记录，返回删除行数
    pub async fn purge_deleted(&self, retention_days: i64) -> Result<i64> {
        let cutoff = Utc::now() - Duration::days(retention_days);
        let result = sqlx::query(
            "DELETE FROM authorized_apps WHERE deleted_at IS NOT NULL AND deleted_at < $1",
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() as i64)
    }
}

#[async_trait]
impl AuthorizedAppRepositoryTrait for AuthorizedAppRepository {
    async fn create(&self, app: &AuthorizedApp, actor: &Actor) -> Result<AuthorizedApp> {
        self.create(app, actor).await
    }

    async fn find_by_api_key_hash(&self, api_key_hash: &str) -> Result<AuthorizedApp> {
        self.find_by_api_key_hash(api_key_hash).await
    }

    async fn list_by_realm(
        &self,
        realm_id: i64,
        include_deleted: bool,
    ) -> Result<Vec<AuthorizedApp>> {
        self.list_by_realm(realm_id, include_deleted).await
    }
}
