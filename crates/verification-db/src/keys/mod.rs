//! 签名密钥版本生命周期核心
//!
//! 三种用途（证书/短信/令牌）的密钥共用同一套存储与管理逻辑：
//!
//! - [`purpose`] - 用途标记（表名、展示名、作用域规则）
//! - [`kms`] - 外部密钥管理服务接口与内存实现
//! - [`store`] - 版本行存储与事务性激活开关
//! - [`manager`] - 配额、轮换与清理的编排

pub mod kms;
pub mod manager;
pub mod purpose;
pub mod store;

pub use kms::{KmsClient, MemoryKms};
pub use manager::KeyManager;
pub use purpose::{CertificateKey, KeyPurpose, SmsKey, TokenKey, SYSTEM_SCOPE};
pub use store::{ActivationOutcome, KeyVersionStore, PgKeyVersionStore};
