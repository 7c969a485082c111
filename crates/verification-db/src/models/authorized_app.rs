//! API Key（授权应用）模型
//!
//! 每个 Key 归属一个租户，明文只在创建时返回一次，库中保存带密钥哈希。
//! 删除采用软删除（deleted_at 时间戳），便于误删恢复与审计追溯。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::enums::ApiKeyType;

/// 授权应用（API Key）实体
#[derive(Debug, Clone, Serialize, Deserialize, Validate, sqlx::FromRow)]
pub struct AuthorizedApp {
    pub id: i64,
    pub realm_id: i64,
    #[validate(length(min = 1, max = 100, message = "名称长度需在 1-100 之间"))]
    pub name: String,
    /// Key 类型，决定可访问的 API 面
    pub api_key_type: ApiKeyType,
    /// 带密钥哈希后的 Key，唯一索引列
    pub api_key_hash: String,
    /// 明文前 8 位，供管理后台展示区分
    pub api_key_preview: String,
    /// 软删除标记，非空表示已逻辑删除
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AuthorizedApp {
    pub fn new(
        realm_id: i64,
        name: impl Into<String>,
        api_key_type: ApiKeyType,
        api_key_hash: impl Into<String>,
        api_key_preview: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            realm_id,
            name: name.into(),
            api_key_type,
            api_key_hash: api_key_hash.into(),
            api_key_preview: api_key_preview.into(),
            deleted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// 是否已被软删除
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}
