//! 验证码仓储
//!
//! 签发与兑换都在单事务内完成，并顺带累加当日统计计数行。
//! 兑换对验证码行加 `FOR UPDATE` 锁，保证并发下至多一次成功。

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgConnection, PgPool};
use tracing::instrument;

use super::traits::CodeRepositoryTrait;
use crate::error::{DbError, Result};
use crate::models::VerificationCode;

/// 当日统计计数列，SQL 拼接时用常量枚举限定取值
#[derive(Debug, Clone, Copy)]
pub(crate) enum StatColumn {
    CodesIssued,
    CodesClaimed,
    CodesInvalid,
    TokensClaimed,
    TokensInvalid,
}

impl StatColumn {
    fn name(self) -> &'static str {
        match self {
            Self::CodesIssued => "codes_issued",
            Self::CodesClaimed => "codes_claimed",
            Self::CodesInvalid => "codes_invalid",
            Self::TokensClaimed => "tokens_claimed",
            Self::TokensInvalid => "tokens_invalid",
        }
    }
}

/// 在事务中累加租户当日计数
pub(crate) async fn bump_realm_stat(
    conn: &mut PgConnection,
    realm_id: i64,
    column: StatColumn,
) -> Result<()> {
    let column = column.name();
    let sql = format!(
        r#"
        INSERT INTO realm_stats (date, realm_id, {column})
        VALUES (CURRENT_DATE, $1, 1)
        ON CONFLICT (date, realm_id)
            DO UPDATE SET {column} = realm_stats.{column} + 1
        "#
    );
    sqlx::query(&sql).bind(realm_id).execute(conn).await?;
    Ok(())
}

/// 验证码仓储
pub struct CodeRepository {
    pool: PgPool,
}

impl CodeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 签发验证码
    ///
    /// 插入验证码行，并在同一事务内累加租户/签发人当日签发计数。
    #[instrument(skip(self, code), fields(realm_id = code.realm_id))]
    pub async fn issue(&self, code: &VerificationCode) -> Result<VerificationCode> {
        let mut tx = self.pool.begin().await?;

        let saved = sqlx::query_as::<_, VerificationCode>(
            r#"
            INSERT INTO verification_codes
                (realm_id, code_hash, long_code_hash, test_type, symptom_date, test_date,
                 expires_at, long_expires_at, claimed, issuing_user_id, issuing_app_id,
                 created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, FALSE, $9, $10, NOW(), NOW())
            RETURNING *
            "#,
        )
        .bind(code.realm_id)
        .bind(&code.code_hash)
        .bind(&code.long_code_hash)
        .bind(code.test_type)
        .bind(code.symptom_date)
        .bind(code.test_date)
        .bind(code.expires_at)
        .bind(code.long_expires_at)
        .bind(code.issuing_user_id)
        .bind(code.issuing_app_id)
        .fetch_one(&mut *tx)
        .await?;

        bump_realm_stat(&mut tx, code.realm_id, StatColumn::CodesIssued).await?;

        if let Some(user_id) = code.issuing_user_id {
            sqlx::query(
                r#"
                INSERT INTO user_stats (date, realm_id, user_id, codes_issued)
                VALUES (CURRENT_DATE, $1, $2, 1)
                ON CONFLICT (date, realm_id, user_id)
                    DO UPDATE SET codes_issued = user_stats.codes_issued + 1
                "#,
            )
            .bind(code.realm_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        }

        if let Some(app_id) = code.issuing_app_id {
            sqlx::query(
                r#"
                INSERT INTO authorized_app_stats (date, app_id, codes_issued)
                VALUES (CURRENT_DATE, $1, 1)
                ON CONFLICT (date, app_id)
                    DO UPDATE SET codes_issued = authorized_app_stats.codes_issued + 1
                "#,
            )
            .bind(app_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(saved)
    }

    /// 按哈希兑换验证码（短码或长码）
    ///
    /// 行锁保证同一验证码并发兑换至多一次成功；过期/重复兑换
    /// 会累加当日无效计数并对应返回业务错误。
    #[instrument(skip(self, hash))]
    pub async fn claim(&self, realm_id: i64, hash: &str) -> Result<VerificationCode> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let code = sqlx::query_as::<_, VerificationCode>(
            r#"
            SELECT * FROM verification_codes
            WHERE realm_id = $1 AND (code_hash = $2 OR long_code_hash = $2)
            FOR UPDATE
            "#,
        )
        .bind(realm_id)
        .bind(hash)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(code) = code else {
            bump_realm_stat(&mut tx, realm_id, StatColumn::CodesInvalid).await?;
            tx.commit().await?;
            return Err(DbError::CodeNotFound);
        };

        if code.claimed {
            bump_realm_stat(&mut tx, realm_id, StatColumn::CodesInvalid).await?;
            tx.commit().await?;
            return Err(DbError::CodeAlreadyClaimed);
        }

        // 短码命中看短码过期，长码命中看长码过期
        let expired = if code.code_hash == hash {
            code.code_expired(now)
        } else {
            code.long_code_expired(now)
        };
        if expired {
            bump_realm_stat(&mut tx, realm_id, StatColumn::CodesInvalid).await?;
            tx.commit().await?;
            return Err(DbError::CodeExpired);
        }

        let claimed = sqlx::query_as::<_, VerificationCode>(
            r#"
            UPDATE verification_codes
            SET claimed = TRUE, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(code.id)
        .fetch_one(&mut *tx)
        .await?;

        bump_realm_stat(&mut tx, realm_id, StatColumn::CodesClaimed).await?;

        tx.commit().await?;
        Ok(claimed)
    }

    /// 按 ID 获取验证码
    pub async fn find(&self, id: i64) -> Result<VerificationCode> {
        sqlx::query_as::<_, VerificationCode>("SELECT * FROM verification_codes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(DbError::CodeNotFound)
    }

    /// 回收已兑换或两个码均过期的记录，返回删除行数
    ///
    /// 哈希列有唯一索引，及时回收可释放短码空间供重新生成。
    #[instrument(skip(self))]
    pub async fn recycle_expired(&self) -> Result<i64> {
        let result = sqlx::query(
            r#"
            DELETE FROM verification_codes
            WHERE claimed = TRUE
               OR (expires_at < NOW() AND long_expires_at < NOW())
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() as i64)
    }
}

#[async_trait]
impl CodeRepositoryTrait for CodeRepository {
    async fn issue(&self, code: &VerificationCode) -> Result<VerificationCode> {
        self.issue(code).await
    }

    async fn claim(&self, realm_id: i64, hash: &str) -> Result<VerificationCode> {
        self.claim(realm_id, hash).await
    }

    async fn recycle_expired(&self) -> Result<i64> {
        self.recycle_expired().await
    }
}
