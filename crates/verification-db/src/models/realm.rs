//! 租户（Realm）模型
//!
//! Realm 是系统中的租户边界：验证码、签名密钥、成员、统计均按 Realm 隔离。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::enums::TestType;

/// 租户实体
#[derive(Debug, Clone, Serialize, Deserialize, Validate, sqlx::FromRow)]
pub struct Realm {
    pub id: i64,
    /// 租户名称，全局唯一
    #[validate(length(min = 1, max = 100, message = "名称长度需在 1-100 之间"))]
    pub name: String,
    /// ISO 3166-1 区域码（如 US-CA），用于 EN Express 对接
    #[validate(length(max = 10, message = "区域码不能超过 10 个字符"))]
    pub region_code: String,
    /// 允许签发的检测类型位掩码（TestType::flag 的按位或）
    pub allowed_test_types: i32,
    /// 短码位数
    #[validate(range(min = 6, max = 12, message = "短码位数需在 6-12 之间"))]
    pub code_length: i32,
    /// 短码有效期（分钟）
    #[validate(range(min = 5, max = 60, message = "短码有效期需在 5-60 分钟之间"))]
    pub code_max_minutes: i32,
    /// 长码位数（hex 字符数）
    pub long_code_length: i32,
    /// 长码有效期（小时）
    #[validate(range(min = 1, max = 168, message = "长码有效期需在 1-168 小时之间"))]
    pub long_code_max_hours: i32,
    /// 短信正文模板，必须包含 [longcode] 占位符
    pub sms_text_template: String,
    /// 证书签发方标识（iss）
    pub certificate_issuer: String,
    /// 证书受众标识（aud）
    pub certificate_audience: String,
    /// 证书有效期（秒）
    pub certificate_duration_seconds: i64,
    /// 是否使用租户自有证书签名密钥（否则使用系统级密钥）
    pub use_realm_certificate_key: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Realm {
    /// 以默认设置构建新租户（id 由数据库分配）
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            name: name.into(),
            region_code: String::new(),
            allowed_test_types: TestType::Confirmed.flag(),
            code_length: 8,
            code_max_minutes: 15,
            long_code_length: 16,
            long_code_max_hours: 24,
            sms_text_template: "您的验证链接: [longcode]".to_string(),
            certificate_issuer: String::new(),
            certificate_audience: String::new(),
            certificate_duration_seconds: 900,
            use_realm_certificate_key: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// 检查该租户是否允许签发指定检测类型
    pub fn allows_test_type(&self, test_type: TestType) -> bool {
        self.allowed_test_types & test_type.flag() != 0
    }

    /// 校验租户设置
    ///
    /// 在 validator 派生校验之外补充跨字段规则。
    pub fn validate_settings(&self) -> crate::Result<()> {
        self.validate()?;

        if self.allowed_test_types == 0 {
            return Err(crate::DbError::Validation(
                "至少需要允许一种检测类型".to_string(),
            ));
        }
        if !self.sms_text_template.contains("[longcode]") {
            return Err(crate::DbError::Validation(
                "短信模板必须包含 [longcode] 占位符".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_realm_passes_validation() {
        let realm = Realm::new("部门A");
        assert!(realm.validate_settings().is_ok());
    }

    #[test]
    fn test_empty_name_rejected() {
        let realm = Realm::new("");
        assert!(realm.validate_settings().is_err());
    }

    #[test]
    fn test_template_requires_longcode_placeholder() {
        let mut realm = Realm::new("部门A");
        realm.sms_text_template = "您的验证码".to_string();
        assert!(realm.validate_settings().is_err());
    }

    #[test]
    fn test_allows_test_type() {
        let mut realm = Realm::new("部门A");
        realm.allowed_test_types = TestType::Confirmed.flag() | TestType::Likely.flag();
        assert!(realm.allows_test_type(TestType::Confirmed));
        assert!(realm.allows_test_type(TestType::Likely));
        assert!(!realm.allows_test_type(TestType::Negative));
    }

    #[test]
    fn test_zero_test_types_rejected() {
        let mut realm = Realm::new("部门A");
        realm.allowed_test_types = 0;
        assert!(realm.validate_settings().is_err());
    }
}
