//! 数据访问层错误类型
//!
//! 定义业务错误和系统错误。校验类错误（配额超限、scope 非法等）
//! 原样透传给管理端调用方，不自动重试；KMS/数据库错误对调用方呈现为
//! 当次操作失败，重试策略由调用方决定。

use thiserror::Error;

/// 数据访问层错误类型
#[derive(Debug, Error)]
pub enum DbError {
    // === 租户/用户相关错误 ===
    #[error("租户不存在: {0}")]
    RealmNotFound(i64),

    #[error("用户不存在: {0}")]
    UserNotFound(String),

    #[error("成员关系不存在: realm_id={realm_id}, user_id={user_id}")]
    MembershipNotFound { realm_id: i64, user_id: i64 },

    #[error("API Key 不存在或已删除")]
    AuthorizedAppNotFound,

    // === 验证码/令牌相关错误 ===
    #[error("验证码不存在")]
    CodeNotFound,

    #[error("验证码已过期")]
    CodeExpired,

    #[error("验证码已被使用")]
    CodeAlreadyClaimed,

    #[error("验证令牌不存在: {0}")]
    TokenNotFound(String),

    #[error("验证令牌已过期: {0}")]
    TokenExpired(String),

    #[error("验证令牌已被使用: {0}")]
    TokenAlreadyUsed(String),

    // === 签名密钥相关错误 ===
    #[error("{purpose} 签名密钥版本不存在: id={id}")]
    KeyVersionNotFound { purpose: &'static str, id: i64 },

    #[error("可用的 {purpose} 签名密钥过多: 上限 {limit}")]
    KeyQuotaExceeded { purpose: &'static str, limit: i64 },

    #[error("激活中的签名密钥不允许删除: id={0}")]
    ActiveKeyDelete(i64),

    #[error("{purpose} 签名密钥不支持 realm 作用域: scope={scope}")]
    MalformedScope { purpose: &'static str, scope: i64 },

    #[error("清理中止: 已清理 {purged} 条, 原因: {reason}")]
    PurgeAborted { purged: i64, reason: String },

    #[error("KMS 调用失败: {0}")]
    Kms(String),

    // === 系统错误 ===
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("JSON 序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("参数校验失败: {0}")]
    Validation(String),

    #[error("字段校验失败: {0}")]
    Invalid(#[from] validator::ValidationErrors),

    #[error("内部错误: {0}")]
    Internal(String),
}

/// 数据访问层 Result 类型别名
pub type Result<T> = std::result::Result<T, DbError>;

impl DbError {
    /// 检查是否为校验类错误（应映射为 4xx，不重试）
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::KeyQuotaExceeded { .. }
                | Self::MalformedScope { .. }
                | Self::ActiveKeyDelete(_)
                | Self::Validation(_)
                | Self::Invalid(_)
        )
    }

    /// 检查是否为"未找到"类错误（应映射为 404）
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::RealmNotFound(_)
                | Self::UserNotFound(_)
                | Self::MembershipNotFound { .. }
                | Self::AuthorizedAppNotFound
                | Self::CodeNotFound
                | Self::TokenNotFound(_)
                | Self::KeyVersionNotFound { .. }
        )
    }

    /// 检查是否为可重试的错误
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Database(_) | Self::Kms(_))
    }

    /// 获取错误码（用于 API 响应）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::RealmNotFound(_) => "REALM_NOT_FOUND",
            Self::UserNotFound(_) => "USER_NOT_FOUND",
            Self::MembershipNotFound { .. } => "MEMBERSHIP_NOT_FOUND",
            Self::AuthorizedAppNotFound => "AUTHORIZED_APP_NOT_FOUND",
            Self::CodeNotFound => "CODE_NOT_FOUND",
            Self::CodeExpired => "CODE_EXPIRED",
            Self::CodeAlreadyClaimed => "CODE_ALREADY_CLAIMED",
            Self::TokenNotFound(_) => "TOKEN_NOT_FOUND",
            Self::TokenExpired(_) => "TOKEN_EXPIRED",
            Self::TokenAlreadyUsed(_) => "TOKEN_ALREADY_USED",
            Self::KeyVersionNotFound { .. } => "KEY_VERSION_NOT_FOUND",
            Self::KeyQuotaExceeded { .. } => "KEY_QUOTA_EXCEEDED",
            Self::ActiveKeyDelete(_) => "ACTIVE_KEY_DELETE",
            Self::MalformedScope { .. } => "MALFORMED_SCOPE",
            Self::PurgeAborted { .. } => "PURGE_ABORTED",
            Self::Kms(_) => "KMS_ERROR",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Validation(_) | Self::Invalid(_) => "VALIDATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}
