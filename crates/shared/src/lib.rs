//! 共享库
//!
//! 包含数据访问层各 crate 共用的配置、错误处理、数据库连接、
//! 哈希工具和密钥引用解析等基础设施代码。

pub mod config;
pub mod crypto;
pub mod database;
pub mod error;
pub mod observability;
pub mod secrets;
