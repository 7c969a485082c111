//! 验证码模型
//!
//! 一次签发同时产生短码（口述/手输）和长码（短信链接点击），
//! 两者独立过期，任一被兑换即整体作废。明文不落库，只保存带密钥哈希。

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::enums::TestType;

/// 验证码实体
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct VerificationCode {
    pub id: i64,
    pub realm_id: i64,
    /// 短码哈希，唯一索引列
    pub code_hash: String,
    /// 长码哈希，唯一索引列
    pub long_code_hash: String,
    pub test_type: TestType,
    /// 症状出现日期（用户自报，可为空）
    pub symptom_date: Option<NaiveDate>,
    /// 检测日期
    pub test_date: Option<NaiveDate>,
    /// 短码过期时间
    pub expires_at: DateTime<Utc>,
    /// 长码过期时间（晚于短码）
    pub long_expires_at: DateTime<Utc>,
    /// 是否已兑换
    pub claimed: bool,
    /// 签发人（后台用户），与 issuing_app_id 二选一
    pub issuing_user_id: Option<i64>,
    /// 签发方（API Key），与 issuing_user_id 二选一
    pub issuing_app_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VerificationCode {
    /// 短码是否已过期
    pub fn code_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// 长码是否已过期
    pub fn long_code_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.long_expires_at
    }

    /// 整条记录是否可以回收（两个码都已过期且未兑换，或已兑换）
    pub fn recyclable(&self, now: DateTime<Utc>) -> bool {
        self.claimed || (self.code_expired(now) && self.long_code_expired(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_code(now: DateTime<Utc>) -> VerificationCode {
        VerificationCode {
            id: 1,
            realm_id: 7,
            code_hash: "short-hash".to_string(),
            long_code_hash: "long-hash".to_string(),
            test_type: TestType::Confirmed,
            symptom_date: None,
            test_date: None,
            expires_at: now + Duration::minutes(15),
            long_expires_at: now + Duration::hours(24),
            claimed: false,
            issuing_user_id: Some(1),
            issuing_app_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_short_code_expires_before_long_code() {
        let now = Utc::now();
        let code = sample_code(now);

        let after_short = now + Duration::minutes(16);
        assert!(code.code_expired(after_short));
        assert!(!code.long_code_expired(after_short));
        assert!(!code.recyclable(after_short));

        let after_long = now + Duration::hours(25);
        assert!(code.recyclable(after_long));
    }

    #[test]
    fn test_claimed_code_is_recyclable() {
        let now = Utc::now();
        let mut code = sample_code(now);
        code.claimed = true;
        assert!(code.recyclable(now));
    }
}
