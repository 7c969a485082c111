//! 仓储 Trait 定义
//!
//! 定义仓储接口，便于调用方依赖抽象而非具体实现，支持 mock 测试

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::error::Result;
use crate::models::{
    Actor, AuditEntry, AuthorizedApp, Membership, Realm, RealmStat, User, VerificationCode,
    VerificationToken,
};

/// 租户仓储接口
#[async_trait]
pub trait RealmRepositoryTrait: Send + Sync {
    async fn create(&self, realm: &Realm, actor: &Actor) -> Result<Realm>;
    async fn update(&self, realm: &Realm, actor: &Actor) -> Result<()>;
    async fn find(&self, id: i64) -> Result<Option<Realm>>;
    async fn find_by_name(&self, name: &str) -> Result<Option<Realm>>;
    async fn list(&self) -> Result<Vec<Realm>>;
}

/// 用户仓储接口
#[async_trait]
pub trait UserRepositoryTrait: Send + Sync {
    async fn upsert(&self, user: &User) -> Result<User>;
    async fn find(&self, id: i64) -> Result<Option<User>>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn list_by_realm(&self, realm_id: i64) -> Result<Vec<User>>;
    async fn find_membership(&self, realm_id: i64, user_id: i64) -> Result<Membership>;
}

/// 授权应用仓储接口
#[async_trait]
pub trait AuthorizedAppRepositoryTrait: Send + Sync {
    async fn create(&self, app: &AuthorizedApp, actor: &Actor) -> Result<AuthorizedApp>;
    async fn find_by_api_key_hash(&self, api_key_hash: &str) -> Result<AuthorizedApp>;
    async fn list_by_realm(&self, realm_id: i64, include_deleted: bool)
        -> Result<Vec<AuthorizedApp>>;
}

/// 验证码仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CodeRepositoryTrait: Send + Sync {
    async fn issue(&self, code: &VerificationCode) -> Result<VerificationCode>;
    async fn claim(&self, realm_id: i64, hash: &str) -> Result<VerificationCode>;
    async fn recycle_expired(&self) -> Result<i64>;
}

/// 验证令牌仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenRepositoryTrait: Send + Sync {
    async fn mint(
        &self,
        code: &VerificationCode,
        expires_at: DateTime<Utc>,
    ) -> Result<VerificationToken>;
    async fn claim(&self, realm_id: i64, token_id: &str) -> Result<VerificationToken>;
}

/// 审计日志仓储接口
#[async_trait]
pub trait AuditRepositoryTrait: Send + Sync {
    async fn append(&self, entry: &AuditEntry) -> Result<i64>;
    async fn list_by_realm(&self, realm_id: i64, limit: i64, offset: i64)
        -> Result<Vec<AuditEntry>>;
}

/// 统计仓储接口
#[async_trait]
pub trait StatsRepositoryTrait: Send + Sync {
    async fn realm_daily(
        &self,
        realm_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RealmStat>>;
    async fn realm_summary(
        &self,
        realm_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<RealmStat>;
}
