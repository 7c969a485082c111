//! 短信/邮件供应商配置仓储
//!
//! 每个租户至多一条短信配置和一条邮件配置，按 realm_id 做 upsert。
//! 凭据列存的是密钥引用，真实值由 `verify_shared::secrets` 解析。

use sqlx::PgPool;

use crate::error::Result;
use crate::models::{Actor, AuditEntry, EmailConfig, SmsConfig};
use crate::repository::AuditRepository;

/// 供应商配置仓储
pub struct ProviderConfigRepository {
    pool: PgPool,
}

impl ProviderConfigRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 保存短信配置（每租户一条，重复保存覆盖）
    pub async fn upsert_sms(&self, config: &SmsConfig, actor: &Actor) -> Result<SmsConfig> {
        config.validate_settings()?;

        let mut tx = self.pool.begin().await?;

        let saved = sqlx::query_as::<_, SmsConfig>(
            r#"
            INSERT INTO sms_configs
                (realm_id, provider, twilio_account_sid, twilio_auth_token_secret,
                 twilio_from_number, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, NOW(), NOW())
            ON CONFLICT (realm_id) DO UPDATE SET
                provider = EXCLUDED.provider,
                twilio_account_sid = EXCLUDED.twilio_account_sid,
                twilio_auth_token_secret = EXCLUDED.twilio_auth_token_secret,
                twilio_from_number = EXCLUDED.twilio_from_number,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(config.realm_id)
        .bind(config.provider)
        .bind(&config.twilio_account_sid)
        .bind(&config.twilio_auth_token_secret)
        .bind(&config.twilio_from_number)
        .fetch_one(&mut *tx)
        .await?;

        let entry = AuditEntry::new(config.realm_id, actor, "updated SMS configuration");
        AuditRepository::append_in_tx(&mut tx, &entry).await?;

        tx.commit().await?;
        Ok(saved)
    }

    /// 读取租户短信配置
    pub async fn find_sms(&self, realm_id: i64) -> Result<Option<SmsConfig>> {
        let config =
            sqlx::query_as::<_, SmsConfig>("SELECT * FROM sms_configs WHERE realm_id = $1")
                .bind(realm_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(config)
    }

    /// 保存邮件配置（每租户一条，重复保存覆盖）
    pub async fn upsert_email(&self, config: &EmailConfig, actor: &Actor) -> Result<EmailConfig> {
        config.validate_settings()?;

        let mut tx = self.pool.begin().await?;

        let saved = sqlx::query_as::<_, EmailConfig>(
            r#"
            INSERT INTO email_configs
                (realm_id, provider, smtp_account, smtp_password_secret, smtp_host, smtp_port,
                 created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, NOW(), NOW())
            ON CONFLICT (realm_id) DO UPDATE SET
                provider = EXCLUDED.provider,
                smtp_account = EXCLUDED.smtp_account,
                smtp_password_secret = EXCLUDED.smtp_password_secret,
                smtp_host = EXCLUDED.smtp_host,
                smtp_port = EXCLUDED.smtp_port,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(config.realm_id)
        .bind(config.provider)
        .bind(&config.smtp_account)
        .bind(&config.smtp_password_secret)
        .bind(&config.smtp_host)
        .bind(config.smtp_port)
        .fetch_one(&mut *tx)
        .await?;

        let entry = AuditEntry::new(config.realm_id, actor, "updated email configuration");
        AuditRepository::append_in_tx(&mut tx, &entry).await?;

        tx.commit().await?;
        Ok(saved)
    }

    /// 读取租户邮件配置
    pub async fn find_email(&self, realm_id: i64) -> Result<Option<EmailConfig>> {
        let config =
            sqlx::query_as::<_, EmailConfig>("SELECT * FROM email_configs WHERE realm_id = $1")
                .bind(realm_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(config)
    }
}
