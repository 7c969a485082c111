//! 短信/邮件供应商配置模型
//!
//! 每个租户至多一条短信配置和一条邮件配置。凭据字段保存的是
//! 密钥引用（secret://...），真实值通过 `verify_shared::secrets` 解析。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::enums::{EmailProvider, SmsProvider};

/// 短信配置实体
#[derive(Debug, Clone, Serialize, Deserialize, Validate, sqlx::FromRow)]
pub struct SmsConfig {
    pub id: i64,
    pub realm_id: i64,
    pub provider: SmsProvider,
    /// Twilio Account SID
    pub twilio_account_sid: String,
    /// Twilio Auth Token 的密钥引用，不保存明文
    #[validate(length(min = 1, message = "auth token 引用不能为空"))]
    pub twilio_auth_token_secret: String,
    /// 发送方号码（E.164 格式）
    pub twilio_from_number: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SmsConfig {
    /// 校验配置完整性
    ///
    /// Noop 供应商不要求凭据，Twilio 必须配齐三项。
    pub fn validate_settings(&self) -> crate::Result<()> {
        if self.provider == SmsProvider::Noop {
            return Ok(());
        }
        self.validate()?;
        if self.twilio_account_sid.is_empty() {
            return Err(crate::DbError::Validation(
                "Twilio Account SID 不能为空".to_string(),
            ));
        }
        if self.twilio_from_number.is_empty() {
            return Err(crate::DbError::Validation(
                "发送方号码不能为空".to_string(),
            ));
        }
        Ok(())
    }
}

/// 邮件配置实体
#[derive(Debug, Clone, Serialize, Deserialize, Validate, sqlx::FromRow)]
pub struct EmailConfig {
    pub id: i64,
    pub realm_id: i64,
    pub provider: EmailProvider,
    pub smtp_account: String,
    /// SMTP 密码的密钥引用，不保存明文
    #[validate(length(min = 1, message = "SMTP 密码引用不能为空"))]
    pub smtp_password_secret: String,
    pub smtp_host: String,
    pub smtp_port: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EmailConfig {
    pub fn validate_settings(&self) -> crate::Result<()> {
        if self.provider == EmailProvider::Noop {
            return Ok(());
        }
        self.validate()?;
        if self.smtp_host.is_empty() {
            return Err(crate::DbError::Validation("SMTP 主机不能为空".to_string()));
        }
        Ok(())
    }
}
