//! 验证令牌仓储
//!
//! 验证码兑换成功后铸造令牌，令牌单次使用。铸造与兑换都走
//! 单事务，兑换对令牌行加 `FOR UPDATE` 锁。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use super::code_repo::{bump_realm_stat, StatColumn};
use super::traits::TokenRepositoryTrait;
use crate::error::{DbError, Result};
use crate::models::{VerificationCode, VerificationToken};

/// 验证令牌仓储
pub struct TokenRepository {
    pool: PgPool,
}

impl TokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 从已兑换的验证码铸造令牌
    ///
    /// 令牌继承验证码的检测类型和日期，ID 为新生成的 UUID。
    /// 调用方必须传入刚完成兑换的验证码（claimed 已置位）。
    #[instrument(skip(self, code), fields(realm_id = code.realm_id))]
    pub async fn mint(
        &self,
        code: &VerificationCode,
        expires_at: DateTime<Utc>,
    ) -> Result<VerificationToken> {
        if !code.claimed {
            return Err(DbError::Validation(
                "只能从已兑换的验证码铸造令牌".to_string(),
            ));
        }

        let token = sqlx::query_as::<_, VerificationToken>(
            r#"
            INSERT INTO verification_tokens
                (id, realm_id, test_type, symptom_date, test_date, used, expires_at,
                 created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, FALSE, $6, NOW(), NOW())
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(code.realm_id)
        .bind(code.test_type)
        .bind(code.symptom_date)
        .bind(code.test_date)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(token)
    }

    /// 兑换令牌（单次使用）
    ///
    /// 行锁下检查 used/过期，成功则置位并累加当日令牌兑换计数，
    /// 失败累加无效计数后返回业务错误。
    #[instrument(skip(self))]
    pub async fn claim(&self, realm_id: i64, token_id: &str) -> Result<VerificationToken> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let token = sqlx::query_as::<_, VerificationToken>(
            "SELECT * FROM verification_tokens WHERE id = $1 AND realm_id = $2 FOR UPDATE",
        )
        .bind(token_id)
        .bind(realm_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(token) = token else {
            bump_realm_stat(&mut tx, realm_id, StatColumn::TokensInvalid).await?;
            tx.commit().await?;
            return Err(DbError::TokenNotFound(token_id.to_string()));
        };

        if token.used {
            bump_realm_stat(&mut tx, realm_id, StatColumn::TokensInvalid).await?;
            tx.commit().await?;
            return Err(DbError::TokenAlreadyUsed(token_id.to_string()));
        }

        if token.expired(now) {
            bump_realm_stat(&mut tx, realm_id, StatColumn::TokensInvalid).await?;
            tx.commit().await?;
            return Err(DbError::TokenExpired(token_id.to_string()));
        }

        let claimed = sqlx::query_as::<_, VerificationToken>(
            r#"
            UPDATE verification_tokens
            SET used = TRUE, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(token_id)
        .fetch_one(&mut *tx)
        .await?;

        bump_realm_stat(&mut tx, realm_id, StatColumn::TokensClaimed).await?;

        tx.commit().await?;
        Ok(claimed)
    }

    /// 按 ID 获取令牌
    pub async fn find(&self, token_id: &str) -> Result<VerificationToken> {
        sqlx::query_as::<_, VerificationToken>("SELECT * FROM verification_tokens WHERE id = $1")
            .bind(token_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::TokenNotFound(token_id.to_string()))
    }

    /// 清理已过期或已使用的令牌，返回删除行数
    #[instrument(skip(self))]
    pub async fn purge_expired(&self) -> Result<i64> {
        let result =
            sqlx::query("DELETE FROM verification_tokens WHERE used = TRUE OR expires_at < NOW()")
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() as i64)
    }
}

#[async_trait]
impl TokenRepositoryTrait for TokenRepository {
    async fn mint(
        &self,
        code: &VerificationCode,
        expires_at: DateTime<Utc>,
    ) -> Result<VerificationToken> {
        self.mint(code, expires_at).await
    }

    async fn claim(&self, realm_id: i64, token_id: &str) -> Result<VerificationToken> {
        self.claim(realm_id, token_id).await
    }
}
