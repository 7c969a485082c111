//! 验证服务器数据访问层
//!
//! 提供疫情暴露通知验证码签发系统的全部持久化能力：
//! 租户（Realm）、用户与成员权限、API Key、验证码与验证令牌、
//! 短信/邮件供应商配置、按租户隔离的 KMS 签名密钥，以及每日用量统计。
//!
//! ## 模块划分
//!
//! - [`models`] - ORM 模型（结构体 + 校验钩子）
//! - [`repository`] - 各聚合的数据访问仓储
//! - [`keys`] - 签名密钥版本的生命周期核心（配额/激活/轮换/清理）
//! - [`migrate`] - 顺序化的 schema 迁移

pub mod error;
pub mod keys;
pub mod migrate;
pub mod models;
pub mod repository;

pub use error::{DbError, Result};
pub use models::{Actor, KeyVersion};
