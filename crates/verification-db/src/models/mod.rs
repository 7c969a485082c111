//! 数据模型定义
//!
//! 每个文件一个聚合：结构体 + 校验钩子，CRUD 由对应的仓储提供。

pub mod audit;
pub mod authorized_app;
pub mod enums;
pub mod provider_config;
pub mod realm;
pub mod signing_key;
pub mod stats;
pub mod token;
pub mod user;
pub mod verification_code;

pub use audit::{Actor, AuditEntry};
pub use authorized_app::AuthorizedApp;
pub use enums::{ApiKeyType, EmailProvider, Permission, SmsProvider, TestType};
pub use provider_config::{EmailConfig, SmsConfig};
pub use realm::Realm;
pub use signing_key::KeyVersion;
pub use stats::{AuthorizedAppStat, RealmStat, UserStat};
pub use token::VerificationToken;
pub use user::{Membership, User};
pub use verification_code::VerificationCode;
