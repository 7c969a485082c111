//! 签名密钥版本存储
//!
//! 密钥版本行的持久化与事务性激活开关。所有写路径的审计条目
//! 与状态变更同事务提交。存储接口抽象成 trait，生命周期管理器
//! 依赖抽象而非具体实现，便于 mock 测试。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::marker::PhantomData;

use crate::error::{DbError, Result};
use crate::models::{Actor, AuditEntry, KeyVersion};
use crate::repository::AuditRepository;

use super::purpose::KeyPurpose;

/// 激活操作的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationOutcome {
    /// 完成了去激活-激活切换，写入了一条审计
    Activated,
    /// 目标本就是激活态，幂等空操作，未写审计
    AlreadyActive,
}

/// 密钥版本存储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KeyVersionStore: Send + Sync {
    /// 统计作用域内未删除的版本数（配额检查的读路径）
    async fn count_available(&self, scope: i64) -> Result<i64>;

    /// 持久化新版本（active = false），并在同一事务写入 created 审计
    async fn insert(&self, scope: i64, kms_key_version: &str, actor: &Actor)
        -> Result<KeyVersion>;

    /// 按作用域查找单个版本
    async fn find(&self, scope: i64, id: i64) -> Result<KeyVersion>;

    /// 列出作用域内全部未删除版本（激活的排最前）
    async fn list(&self, scope: i64) -> Result<Vec<KeyVersion>>;

    /// 事务性激活开关
    ///
    /// 行锁 + 单事务内完成：去激活当前激活行（至多一行），激活目标行，
    /// 写入一条审计。目标已激活时为幂等空操作。
    async fn activate(&self, scope: i64, id: i64, actor: &Actor) -> Result<ActivationOutcome>;

    /// 软删除（激活中的版本拒绝删除）
    async fn soft_delete(&self, scope: i64, id: i64, actor: &Actor) -> Result<()>;

    /// 恢复软删除
    async fn undelete(&self, scope: i64, id: i64, actor: &Actor) -> Result<()>;

    /// 列出可清理的版本：非激活、已软删除、且删除时间早于 cutoff
    async fn list_purgeable(&self, cutoff: DateTime<Utc>) -> Result<Vec<KeyVersion>>;

    /// 硬删除单行（仅由清理器在上游版本确认销毁后调用）
    async fn hard_delete(&self, id: i64) -> Result<()>;
}

/// Postgres 密钥版本存储
///
/// 按用途落在不同的表中，表名来自 [`KeyPurpose::TABLE`] 常量。
pub struct PgKeyVersionStore<P: KeyPurpose> {
    pool: PgPool,
    _purpose: PhantomData<P>,
}

impl<P: KeyPurpose> PgKeyVersionStore<P> {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            _purpose: PhantomData,
        }
    }

    fn not_found(id: i64) -> DbError {
        DbError::KeyVersionNotFound {
            purpose: P::PURPOSE,
            id,
        }
    }
}

#[async_trait]
impl<P: KeyPurpose> KeyVersionStore for PgKeyVersionStore<P> {
    async fn count_available(&self, scope: i64) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(&format!(
            r#"
            SELECT COUNT(*) FROM {}
            WHERE realm_id = $1 AND deleted_at IS NULL
            "#,
            P::TABLE
        ))
        .bind(scope)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn insert(
        &self,
        scope: i64,
        kms_key_version: &str,
        actor: &Actor,
    ) -> Result<KeyVersion> {
        let mut tx = self.pool.begin().await?;

        let key = sqlx::query_as::<_, KeyVersion>(&format!(
            r#"
            INSERT INTO {} (realm_id, kms_key_version, active, created_at, updated_at)
            VALUES ($1, $2, false, NOW(), NOW())
            RETURNING id, realm_id, kms_key_version, active, deleted_at, created_at, updated_at
            "#,
            P::TABLE
        ))
        .bind(scope)
        .bind(kms_key_version)
        .fetch_one(&mut *tx)
        .await?;

        let entry = AuditEntry::new(
            scope,
            actor,
            format!("created {} signing key version", P::PURPOSE),
        )
        .with_target(key.id.to_string(), kms_key_version.to_string());
        AuditRepository::append_in_tx(&mut tx, &entry).await?;

        tx.commit().await?;
        Ok(key)
    }

    async fn find(&self, scope: i64, id: i64) -> Result<KeyVersion> {
        sqlx::query_as::<_, KeyVersion>(&format!(
            r#"
            SELECT id, realm_id, kms_key_version, active, deleted_at, created_at, updated_at
            FROM {}
            WHERE realm_id = $1 AND id = $2
            "#,
            P::TABLE
        ))
        .bind(scope)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Self::not_found(id))
    }

    async fn list(&self, scope: i64) -> Result<Vec<KeyVersion>> {
        let keys = sqlx::query_as::<_, KeyVersion>(&format!(
            r#"
            SELECT id, realm_id, kms_key_version, active, deleted_at, created_at, updated_at
            FROM {}
            WHERE realm_id = $1 AND deleted_at IS NULL
            ORDER BY active DESC, id DESC
            "#,
            P::TABLE
        ))
        .bind(scope)
        .fetch_all(&self.pool)
        .await?;

        Ok(keys)
    }

    async fn activate(&self, scope: i64, id: i64, actor: &Actor) -> Result<ActivationOutcome> {
        let mut tx = self.pool.begin().await?;

        // 行锁：并发激活同一作用域时在此串行化
        let target = sqlx::query_as::<_, KeyVersion>(&format!(
            r#"
            SELECT id, realm_id, kms_key_version, active, deleted_at, created_at, updated_at
            FROM {}
            WHERE realm_id = $1 AND id = $2
            FOR UPDATE
            "#,
            P::TABLE
        ))
        .bind(scope)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| Self::not_found(id))?;

        if target.is_deleted() {
            return Err(DbError::Validation(format!(
                "已删除的 {} 签名密钥版本不能激活: id={id}",
                P::PURPOSE
            )));
        }

        // 幂等：已激活则空操作，不写审计
        if target.active {
            tx.commit().await?;
            return Ok(ActivationOutcome::AlreadyActive);
        }

        // 去激活当前激活行（按不变式至多一行）
        sqlx::query(&format!(
            r#"
            UPDATE {}
            SET active = false, updated_at = NOW()
            WHERE realm_id = $1 AND active = true
            "#,
            P::TABLE
        ))
        .bind(scope)
        .execute(&mut *tx)
        .await?;

        sqlx::query(&format!(
            r#"
            UPDATE {}
            SET active = true, updated_at = NOW()
            WHERE id = $1
            "#,
            P::TABLE
        ))
        .bind(id)
        .execute(&mut *tx)
        .await?;

        let entry = AuditEntry::new(
            scope,
            actor,
            format!("activated {} signing key version", P::PURPOSE),
        )
        .with_target(id.to_string(), target.kms_key_version.clone());
        AuditRepository::append_in_tx(&mut tx, &entry).await?;

        tx.commit().await?;
        Ok(ActivationOutcome::Activated)
    }

    async fn soft_delete(&self, scope: i64, id: i64, actor: &Actor) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let target = sqlx::query_as::<_, KeyVersion>(&format!(
            r#"
            SELECT id, realm_id, kms_key_version, active, deleted_at, created_at, updated_at
            FROM {}
            WHERE realm_id = $1 AND id = $2
            FOR UPDATE
            "#,
            P::TABLE
        ))
        .bind(scope)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| Self::not_found(id))?;

        // 激活中的版本仍在签名，删除会让后续清理销毁在用的 KMS 版本
        if target.active {
            return Err(DbError::ActiveKeyDelete(id));
        }

        // 幂等：重复删除为空操作
        if target.is_deleted() {
            tx.commit().await?;
            return Ok(());
        }

        sqlx::query(&format!(
            r#"
            UPDATE {}
            SET deleted_at = NOW(), updated_at = NOW()
            WHERE id = $1
            "#,
            P::TABLE
        ))
        .bind(id)
        .execute(&mut *tx)
        .await?;

        let entry = AuditEntry::new(
            scope,
            actor,
            format!("deleted {} signing key version", P::PURPOSE),
        )
        .with_target(id.to_string(), target.kms_key_version.clone());
        AuditRepository::append_in_tx(&mut tx, &entry).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn undelete(&self, scope: i64, id: i64, actor: &Actor) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let target = sqlx::query_as::<_, KeyVersion>(&format!(
            r#"
            SELECT id, realm_id, kms_key_version, active, deleted_at, created_at, updated_at
            FROM {}
            WHERE realm_id = $1 AND id = $2
            FOR UPDATE
            "#,
            P::TABLE
        ))
        .bind(scope)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| Self::not_found(id))?;

        if !target.is_deleted() {
            tx.commit().await?;
            return Ok(());
        }

        sqlx::query(&format!(
            r#"
            UPDATE {}
            SET deleted_at = NULL, updated_at = NOW()
            WHERE id = $1
            "#,
            P::TABLE
        ))
        .bind(id)
        .execute(&mut *tx)
        .await?;

        let entry = AuditEntry::new(
            scope,
            actor,
            format!("restored {} signing key version", P::PURPOSE),
        )
        .with_target(id.to_string(), target.kms_key_version.clone());
        AuditRepository::append_in_tx(&mut tx, &entry).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn list_purgeable(&self, cutoff: DateTime<Utc>) -> Result<Vec<KeyVersion>> {
        let keys = sqlx::query_as::<_, KeyVersion>(&format!(
            r#"
            SELECT id, realm_id, kms_key_version, active, deleted_at, created_at, updated_at
            FROM {}
            WHERE active = false AND deleted_at IS NOT NULL AND deleted_at < $1
            ORDER BY deleted_at ASC, id ASC
            "#,
            P::TABLE
        ))
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        Ok(keys)
    }

    async fn hard_delete(&self, id: i64) -> Result<()> {
        sqlx::query(&format!("DELETE FROM {} WHERE id = $1", P::TABLE))
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activation_outcome_eq() {
        assert_eq!(ActivationOutcome::Activated, ActivationOutcome::Activated);
        assert_ne!(
            ActivationOutcome::Activated,
            ActivationOutcome::AlreadyActive
        );
    }
}
