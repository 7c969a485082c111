//! 用户与成员关系仓储

use async_trait::async_trait;
use sqlx::PgPool;
use validator::Validate;

use super::traits::UserRepositoryTrait;
use crate::error::{DbError, Result};
use crate::models::{Actor, AuditEntry, Membership, Permission, User};
use crate::repository::AuditRepository;

/// 用户仓储
///
/// 用户按邮箱 upsert（邀请重复发送不产生重复用户），
/// 成员关系的增删改均写入对应租户的审计。
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ==================== 用户 ====================

    /// 按邮箱 upsert 用户
    ///
    /// 邮箱在落库前统一转小写（字段是 pub 的，调用方可能绕过
    /// `User::new` 直接构造），保证与查询侧的小写约定一致。
    /// 已存在时更新名称，返回落库后的实体。
    pub async fn upsert(&self, user: &User) -> Result<User> {
        user.validate()?;

        let saved = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, name, system_admin, created_at, updated_at)
            VALUES ($1, $2, $3, NOW(), NOW())
            ON CONFLICT (email) DO UPDATE SET name = EXCLUDED.name, updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(user.email.to_lowercase())
        .bind(&user.name)
        .bind(user.system_admin)
        .fetch_one(&self.pool)
        .await?;

        Ok(saved)
    }

    /// 按 ID 获取用户
    pub async fn find(&self, id: i64) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// 按邮箱获取用户（查找前统一小写）
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email.to_lowercase())
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// 列出租户的所有成员用户
    pub async fn list_by_realm(&self, realm_id: i64) -> Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT u.*
            FROM users u
            JOIN memberships m ON m.user_id = u.id
            WHERE m.realm_id = $1
            ORDER BY u.email ASC
            "#,
        )
        .bind(realm_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    // ==================== 成员关系 ====================

    /// 添加成员（已存在时覆盖权限）
    pub async fn add_membership(&self, membership: &Membership, actor: &Actor) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO memberships (realm_id, user_id, permissions, created_at, updated_at)
            VALUES ($1, $2, $3, NOW(), NOW())
            ON CONFLICT (realm_id, user_id)
                DO UPDATE SET permissions = EXCLUDED.permissions, updated_at = NOW()
            "#,
        )
        .bind(membership.realm_id)
        .bind(membership.user_id)
        .bind(membership.permissions)
        .execute(&mut *tx)
        .await?;

        let entry = AuditEntry::new(membership.realm_id, actor, "added realm membership")
            .with_target(membership.user_id.to_string(), String::new());
        AuditRepository::append_in_tx(&mut tx, &entry).await?;

        tx.commit().await?;
        Ok(())
    }

    /// 获取成员关系
    pub async fn find_membership(&self, realm_id: i64, user_id: i64) -> Result<Membership> {
        sqlx::query_as::<_, Membership>(
            "SELECT * FROM memberships WHERE realm_id = $1 AND user_id = $2",
        )
        .bind(realm_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(DbError::MembershipNotFound { realm_id, user_id })
    }

    /// 更新成员权限
    pub async fn update_permissions(
        &self,
        realm_id: i64,
        user_id: i64,
        permissions: &[Permission],
        actor: &Actor,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE memberships
            SET permissions = $3, updated_at = NOW()
            WHERE realm_id = $1 AND user_id = $2
            "#,
        )
        .bind(realm_id)
        .bind(user_id)
        .bind(Permission::combine(permissions))
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::MembershipNotFound { realm_id, user_id });
        }

        let entry = AuditEntry::new(realm_id, actor, "updated membership permissions")
            .with_target(user_id.to_string(), String::new());
        AuditRepository::append_in_tx(&mut tx, &entry).await?;

        tx.commit().await?;
        Ok(())
    }

    /// 移除成员
    pub async fn remove_membership(
        &self,
        realm_id: i64,
        user_id: i64,
        actor: &Actor,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("DELETE FROM memberships WHERE realm_id = $1 AND user_id = $2")
            .bind(realm_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::MembershipNotFound { realm_id, user_id });
        }

        let entry = AuditEntry::new(realm_id, actor, "removed realm membership")
            .with_target(user_id.to_string(), String::new());
        AuditRepository::append_in_tx(&mut tx, &entry).await?;

        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl UserRepositoryTrait for UserRepository {
    async fn upsert(&self, user: &User) -> Result<User> {
        self.upsert(user).await
    }

    async fn find(&self, id: i64) -> Result<Option<User>> {
        self.find(id).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        self.find_by_email(email).await
    }

    async fn list_by_realm(&self, realm_id: i64) -> Result<Vec<User>> {
        self.list_by_realm(realm_id).await
    }

    async fn find_membership(&self, realm_id: i64, user_id: i64) -> Result<Membership> {
        self.find_membership(realm_id, user_id).await
    }
}
