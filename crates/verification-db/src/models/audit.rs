//! 审计日志模型
//!
//! 记录所有状态变更操作，用于审计追溯。审计条目与状态变更
//! 在同一事务内提交，保证两者原子可见。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 操作者
///
/// 不可变值类型，由调用方在调用点显式传入；系统自动操作使用
/// [`Actor::SYSTEM`] 常量，不存在可变的全局单例。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// 操作者标识（用户 id、API Key id 或固定系统标识）
    pub id: String,
    /// 展示名称（冗余存储，便于查询展示）
    pub display: String,
}

impl Actor {
    /// 系统操作者（定时任务、迁移等自动流程）
    pub const SYSTEM: Actor = Actor {
        id: String::new(),
        display: String::new(),
    };

    pub fn new(id: impl Into<String>, display: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display: display.into(),
        }
    }

    /// 审计落库用的标识，系统操作者统一记为 "system"
    pub fn audit_id(&self) -> &str {
        if self.id.is_empty() {
            "system"
        } else {
            &self.id
        }
    }

    /// 审计落库用的展示名
    pub fn audit_display(&self) -> &str {
        if self.display.is_empty() {
            "System"
        } else {
            &self.display
        }
    }
}

/// 审计日志实体
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AuditEntry {
    pub id: i64,
    /// 作用域租户；系统级操作记为 0
    pub realm_id: i64,
    pub actor_id: String,
    pub actor_display: String,
    /// 动作描述（如 "activated SMS signing key version"）
    pub action: String,
    pub target_id: String,
    pub target_display: String,
    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    /// 构建新的审计条目
    pub fn new(realm_id: i64, actor: &Actor, action: impl Into<String>) -> Self {
        Self {
            id: 0,
            realm_id,
            actor_id: actor.audit_id().to_string(),
            actor_display: actor.audit_display().to_string(),
            action: action.into(),
            target_id: String::new(),
            target_display: String::new(),
            created_at: Utc::now(),
        }
    }

    /// 设置操作目标
    pub fn with_target(mut self, id: impl Into<String>, display: impl Into<String>) -> Self {
        self.target_id = id.into();
        self.target_display = display.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_actor_audit_fields() {
        assert_eq!(Actor::SYSTEM.audit_id(), "system");
        assert_eq!(Actor::SYSTEM.audit_display(), "System");
    }

    #[test]
    fn test_audit_entry_builder() {
        let actor = Actor::new("user:1", "张三");
        let entry = AuditEntry::new(7, &actor, "created certificate signing key version")
            .with_target("key:42", "version 42");

        assert_eq!(entry.realm_id, 7);
        assert_eq!(entry.actor_id, "user:1");
        assert_eq!(entry.target_id, "key:42");
    }
}
