//! 数据库仓储层
//!
//! 提供所有实体的数据访问接口，封装 SQL 操作细节。
//!
//! ## 设计原则
//!
//! - 仓储只负责数据持久化，不包含业务逻辑
//! - 使用 SQLx 进行类型安全的数据库操作
//! - 状态变更与对应审计条目在同一事务内提交
//! - 定义 trait 接口以支持 mock 测试

mod audit_repo;
mod authorized_app_repo;
mod code_repo;
mod exchange;
mod provider_config_repo;
mod realm_repo;
mod stats_repo;
mod token_repo;
mod traits;
mod user_repo;

pub use audit_repo::AuditRepository;
pub use authorized_app_repo::AuthorizedAppRepository;
pub use code_repo::CodeRepository;
pub use exchange::exchange_code;
pub use provider_config_repo::ProviderConfigRepository;
pub use realm_repo::RealmRepository;
pub use stats_repo::StatsRepository;
pub use token_repo::TokenRepository;
pub use traits::*;
pub use user_repo::UserRepository;
