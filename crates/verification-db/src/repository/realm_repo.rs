//! 租户仓储
//!
//! 提供租户的创建、更新与查询。创建与更新均先过模型校验，
//! 并在同一事务内写入审计条目。

use async_trait::async_trait;
use sqlx::PgPool;

use super::traits::RealmRepositoryTrait;
use crate::error::{DbError, Result};
use crate::models::{Actor, AuditEntry, Realm};
use crate::repository::AuditRepository;

/// 租户仓储
pub struct RealmRepository {
    pool: PgPool,
}

impl RealmRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 创建租户
    ///
    /// 返回落库后的完整实体（含分配的 id）
    pub async fn create(&self, realm: &Realm, actor: &Actor) -> Result<Realm> {
        realm.validate_settings()?;

        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, Realm>(
            r#"
            INSERT INTO realms
                (name, region_code, allowed_test_types, code_length, code_max_minutes,
                 long_code_length, long_code_max_hours, sms_text_template,
                 certificate_issuer, certificate_audience, certificate_duration_seconds,
                 use_realm_certificate_key, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, NOW(), NOW())
            RETURNING *
            "#,
        )
        .bind(&realm.name)
        .bind(&realm.region_code)
        .bind(realm.allowed_test_types)
        .bind(realm.code_length)
        .bind(realm.code_max_minutes)
        .bind(realm.long_code_length)
        .bind(realm.long_code_max_hours)
        .bind(&realm.sms_text_template)
        .bind(&realm.certificate_issuer)
        .bind(&realm.certificate_audience)
        .bind(realm.certificate_duration_seconds)
        .bind(realm.use_realm_certificate_key)
        .fetch_one(&mut *tx)
        .await?;

        let entry = AuditEntry::new(created.id, actor, "created realm")
            .with_target(created.id.to_string(), created.name.clone());
        AuditRepository::append_in_tx(&mut tx, &entry).await?;

        tx.commit().await?;
        Ok(created)
    }

    /// 更新租户设置
    pub async fn update(&self, realm: &Realm, actor: &Actor) -> Result<()> {
        realm.validate_settings()?;

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE realms
            SET name = $2, region_code = $3, allowed_test_types = $4,
                code_length = $5, code_max_minutes = $6,
                long_code_length = $7, long_code_max_hours = $8,
                sms_text_template = $9, certificate_issuer = $10,
                certificate_audience = $11, certificate_duration_seconds = $12,
                use_realm_certificate_key = $13, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(realm.id)
        .bind(&realm.name)
        .bind(&realm.region_code)
        .bind(realm.allowed_test_types)
        .bind(realm.code_length)
        .bind(realm.code_max_minutes)
        .bind(realm.long_code_length)
        .bind(realm.long_code_max_hours)
        .bind(&realm.sms_text_template)
        .bind(&realm.certificate_issuer)
        .bind(&realm.certificate_audience)
        .bind(realm.certificate_duration_seconds)
        .bind(realm.use_realm_certificate_key)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::RealmNotFound(realm.id));
        }

        let entry = AuditEntry::new(realm.id, actor, "updated realm settings")
            .with_target(realm.id.to_string(), realm.name.clone());
        AuditRepository::append_in_tx(&mut tx, &entry).await?;

        tx.commit().await?;
        Ok(())
    }

    /// 按 ID 获取租户
    pub async fn find(&self, id: i64) -> Result<Option<Realm>> {
        let realm = sqlx::query_as::<_, Realm>("SELECT * FROM realms WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(realm)
    }

    /// 按名称获取租户（名称全局唯一）
    pub async fn find_by_name(&self, name: &str) -> Result<Option<Realm>> {
        let realm = sqlx::query_as::<_, Realm>("SELECT * FROM realms WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(realm)
    }

    /// 列出所有租户（按名称排序）
    pub async fn list(&self) -> Result<Vec<Realm>> {
        let realms = sqlx::query_as::<_, Realm>("SELECT * FROM realms ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(realms)
    }
}

#[async_trait]
impl RealmRepositoryTrait for RealmRepository {
    async fn create(&self, realm: &Realm, actor: &Actor) -> Result<Realm> {
        self.create(realm, actor).await
    }

    async fn update(&self, realm: &Realm, actor: &Actor) -> Result<()> {
        self.update(realm, actor).await
    }

    async fn find(&self, id: i64) -> Result<Option<Realm>> {
        self.find(id).await
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Realm>> {
        self.find_by_name(name).await
    }

    async fn list(&self) -> Result<Vec<Realm>> {
        self.list().await
    }
}
