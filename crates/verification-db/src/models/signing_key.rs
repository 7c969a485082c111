//! 签名密钥版本模型
//!
//! 三种用途（证书/短信/令牌）的签名密钥共用同一结构，各自落在独立的表中
//! （见 `keys::purpose`）。每行对应 KMS 中的一个密钥版本，本地只保存引用。
//!
//! ## 生命周期
//!
//! 由轮换器创建（KMS 调用成功后落库，active = false）；由激活开关切换
//! active；软删除置 deleted_at；保留期满且 KMS 侧版本已销毁后，
//! 由清理器硬删除。kms_key_version 一经写入不再变更。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 签名密钥版本实体
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct KeyVersion {
    pub id: i64,
    /// 归属租户；系统级（令牌签名）密钥固定为 0
    pub realm_id: i64,
    /// KMS 密钥版本引用，唯一且写入后不可变
    pub kms_key_version: String,
    /// 当前激活标记；同一 (realm, 用途) 至多一行为 true
    pub active: bool,
    /// 软删除标记
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl KeyVersion {
    /// 是否已被软删除
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// 是否满足硬删除前置条件（非激活且已软删除）
    pub fn purgeable(&self, cutoff: DateTime<Utc>) -> bool {
        !self.active && self.deleted_at.is_some_and(|t| t < cutoff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample(active: bool, deleted_at: Option<DateTime<Utc>>) -> KeyVersion {
        let now = Utc::now();
        KeyVersion {
            id: 1,
            realm_id: 7,
            kms_key_version: "projects/p/keyRings/r/cryptoKeys/k/cryptoKeyVersions/3".to_string(),
            active,
            deleted_at,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_active_key_never_purgeable() {
        let old = Utc::now() - Duration::days(30);
        let key = sample(true, Some(old));
        assert!(!key.purgeable(Utc::now()));
    }

    #[test]
    fn test_purgeable_respects_cutoff() {
        let deleted = Utc::now() - Duration::days(10);
        let key = sample(false, Some(deleted));

        // 保留期 14 天：10 天前删除的还不能清理
        assert!(!key.purgeable(Utc::now() - Duration::days(14)));
        // 保留期 7 天：可以清理
        assert!(key.purgeable(Utc::now() - Duration::days(7)));
    }

    #[test]
    fn test_undeleted_key_not_purgeable() {
        let key = sample(false, None);
        assert!(!key.purgeable(Utc::now()));
    }
}
