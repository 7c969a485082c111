//! 每日用量统计模型
//!
//! 签发/兑换路径在事务内顺带累加当日计数行，报表由
//! `repository::stats_repo` 的聚合 SQL 产出。

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 租户每日统计行
#[derive(Debug, Clone, Default, Serialize, Deserialize, sqlx::FromRow)]
pub struct RealmStat {
    pub date: NaiveDate,
    pub realm_id: i64,
    /// 当日签发的验证码数
    pub codes_issued: i64,
    /// 当日成功兑换的验证码数
    pub codes_claimed: i64,
    /// 当日兑换失败（过期/重复）的次数
    pub codes_invalid: i64,
    /// 当日兑换的令牌数
    pub tokens_claimed: i64,
    /// 当日令牌兑换失败次数
    pub tokens_invalid: i64,
}

/// 后台用户每日签发统计行
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserStat {
    pub date: NaiveDate,
    pub realm_id: i64,
    pub user_id: i64,
    pub codes_issued: i64,
}

/// API Key 每日签发统计行
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AuthorizedAppStat {
    pub date: NaiveDate,
    pub app_id: i64,
    pub codes_issued: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_realm_stat_default_is_zeroed() {
        let stat = RealmStat::default();
        assert_eq!(stat.codes_issued, 0);
        assert_eq!(stat.tokens_invalid, 0);
    }
}
