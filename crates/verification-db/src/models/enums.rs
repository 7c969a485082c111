//! 数据访问层枚举类型定义
//!
//! 所有枚举都支持数据库（sqlx）和 JSON（serde）序列化

use serde::{Deserialize, Serialize};

/// 检测结果类型
///
/// 验证码签发时声明的检测类型，决定下游证书中携带的报告类别
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "varchar", rename_all = "snake_case")]
pub enum TestType {
    /// 确诊 - 实验室确认的阳性结果
    #[default]
    Confirmed,
    /// 疑似 - 临床判断的可能阳性
    Likely,
    /// 阴性 - 实验室确认的阴性结果
    Negative,
    /// 用户自报 - 无医疗机构背书
    UserReport,
}

impl TestType {
    /// 返回该类型在租户 allowed_test_types 位掩码中的位
    pub fn flag(&self) -> i32 {
        match self {
            Self::Confirmed => 1,
            Self::Likely => 2,
            Self::Negative => 4,
            Self::UserReport => 8,
        }
    }

    /// 展示名称（用于审计与错误信息）
    pub fn display(&self) -> &'static str {
        match self {
            Self::Confirmed => "confirmed",
            Self::Likely => "likely",
            Self::Negative => "negative",
            Self::UserReport => "user-report",
        }
    }
}

/// API Key 类型
///
/// 决定该 Key 可访问的 API 面
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "varchar", rename_all = "snake_case")]
pub enum ApiKeyType {
    /// 设备端 - 验证码兑换接口
    #[default]
    Device,
    /// 管理端 - 验证码签发接口
    Admin,
    /// 统计端 - 只读统计接口
    Stats,
}

/// 成员权限
///
/// 每个权限占 permissions 位掩码中的一位，Membership 持有组合后的掩码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    /// 签发验证码
    CodeIssue,
    /// 批量签发验证码
    CodeBulkIssue,
    /// 查看/作废验证码
    CodeRead,
    /// 查看统计
    StatsRead,
    /// 管理 API Key
    ApiKeyWrite,
    /// 管理租户设置（含签名密钥）
    SettingsWrite,
    /// 管理成员
    UserWrite,
}

impl Permission {
    /// 返回该权限对应的位
    pub fn value(&self) -> i64 {
        match self {
            Self::CodeIssue => 1 << 0,
            Self::CodeBulkIssue => 1 << 1,
            Self::CodeRead => 1 << 2,
            Self::StatsRead => 1 << 3,
            Self::ApiKeyWrite => 1 << 4,
            Self::SettingsWrite => 1 << 5,
            Self::UserWrite => 1 << 6,
        }
    }

    /// 合并一组权限为位掩码
    pub fn combine(perms: &[Permission]) -> i64 {
        perms.iter().fold(0, |acc, p| acc | p.value())
    }
}

/// 短信供应商类型
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "varchar", rename_all = "snake_case")]
pub enum SmsProvider {
    #[default]
    Twilio,
    /// 不发送短信，仅返回验证码（调试用）
    Noop,
}

/// 邮件供应商类型
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "varchar", rename_all = "snake_case")]
pub enum EmailProvider {
    #[default]
    Smtp,
    Noop,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_test_type_serialization() {
        assert_eq!(
            serde_json::to_string(&TestType::UserReport).unwrap(),
            "\"user_report\""
        );
        assert_eq!(
            serde_json::from_str::<TestType>("\"confirmed\"").unwrap(),
            TestType::Confirmed
        );
    }

    #[test]
    fn test_test_type_flags_are_distinct_bits() {
        let all = [
            TestType::Confirmed,
            TestType::Likely,
            TestType::Negative,
            TestType::UserReport,
        ];
        let mut mask = 0;
        for t in all {
            assert_eq!(mask & t.flag(), 0);
            mask |= t.flag();
        }
    }

    #[test]
    fn test_permission_combine() {
        let mask = Permission::combine(&[Permission::CodeIssue, Permission::StatsRead]);
        assert_ne!(mask & Permission::CodeIssue.value(), 0);
        assert_ne!(mask & Permission::StatsRead.value(), 0);
        assert_eq!(mask & Permission::SettingsWrite.value(), 0);
    }

    #[test]
    fn test_api_key_type_default() {
        assert_eq!(ApiKeyType::default(), ApiKeyType::Device);
    }
}
