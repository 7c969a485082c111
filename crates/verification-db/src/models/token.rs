//! 验证令牌模型
//!
//! 验证码兑换成功后换取长效令牌，令牌再兑换一次性的上报证书。
//! 令牌单次使用，used 置位后不可再次兑换。

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::enums::TestType;

/// 验证令牌实体
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct VerificationToken {
    /// UUID 字符串主键（令牌 jti）
    pub id: String,
    pub realm_id: i64,
    pub test_type: TestType,
    pub symptom_date: Option<NaiveDate>,
    pub test_date: Option<NaiveDate>,
    /// 是否已兑换为证书
    pub used: bool,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VerificationToken {
    /// 令牌是否已过期
    pub fn expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
