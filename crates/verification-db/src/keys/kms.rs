//! KMS 客户端接口
//!
//! 外部密钥管理服务的最小接口：创建与销毁密钥版本。
//! create 每次分配全新版本（无幂等键）；destroy 可安全重试。
//! 生产实现对接云端 KMS（不在本层范围内），开发与测试使用 [`MemoryKms`]。

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::{DbError, Result};

/// 密钥管理服务客户端接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KmsClient: Send + Sync {
    /// 在指定密钥环下创建新的密钥版本，返回版本引用
    async fn create_key_version(&self, parent: &str) -> Result<String>;

    /// 销毁指定密钥版本
    async fn destroy_key_version(&self, version: &str) -> Result<()>;

    /// 查询指定密钥版本是否仍然存在（未被销毁）
    async fn key_version_exists(&self, version: &str) -> Result<bool>;
}

/// 内存 KMS 实现
///
/// 开发环境与集成测试使用：版本引用形如 `{parent}/cryptoKeyVersions/{n}`，
/// 按 parent 递增编号。可注入销毁失败以测试清理中止语义。
#[derive(Default)]
pub struct MemoryKms {
    inner: Mutex<MemoryKmsState>,
}

#[derive(Default)]
struct MemoryKmsState {
    /// parent -> 已分配的最大版本号
    counters: HashMap<String, u64>,
    /// 存活的版本引用集合
    versions: HashMap<String, bool>,
    /// 注入的销毁失败版本
    fail_destroy: Vec<String>,
}

impl MemoryKms {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注入一次销毁失败（测试清理中止路径）
    pub async fn fail_destroy_of(&self, version: impl Into<String>) {
        self.inner.lock().await.fail_destroy.push(version.into());
    }

    /// 当前存活的版本数
    pub async fn live_versions(&self) -> usize {
        self.inner
            .lock()
            .await
            .versions
            .values()
            .filter(|alive| **alive)
            .count()
    }
}

#[async_trait]
impl KmsClient for MemoryKms {
    async fn create_key_version(&self, parent: &str) -> Result<String> {
        let mut state = self.inner.lock().await;
        let counter = state.counters.entry(parent.to_string()).or_insert(0);
        *counter += 1;
        let version = format!("{}/cryptoKeyVersions/{}", parent, counter);
        state.versions.insert(version.clone(), true);
        Ok(version)
    }

    async fn destroy_key_version(&self, version: &str) -> Result<()> {
        let mut state = self.inner.lock().await;
        if state.fail_destroy.iter().any(|v| v == version) {
            return Err(DbError::Kms(format!("injected destroy failure: {version}")));
        }
        // 重复销毁视为成功（与云端 KMS 的幂等语义一致）
        state.versions.insert(version.to_string(), false);
        Ok(())
    }

    async fn key_version_exists(&self, version: &str) -> Result<bool> {
        let state = self.inner.lock().await;
        Ok(state.versions.get(version).copied().unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_kms_versions_are_sequential_per_parent() {
        let kms = MemoryKms::new();
        let v1 = kms.create_key_version("ring-a").await.unwrap();
        let v2 = kms.create_key_version("ring-a").await.unwrap();
        let other = kms.create_key_version("ring-b").await.unwrap();

        assert_eq!(v1, "ring-a/cryptoKeyVersions/1");
        assert_eq!(v2, "ring-a/cryptoKeyVersions/2");
        assert_eq!(other, "ring-b/cryptoKeyVersions/1");
    }

    #[tokio::test]
    async fn test_destroy_is_idempotent() {
        let kms = MemoryKms::new();
        let v = kms.create_key_version("ring").await.unwrap();

        kms.destroy_key_version(&v).await.unwrap();
        kms.destroy_key_version(&v).await.unwrap();
        assert!(!kms.key_version_exists(&v).await.unwrap());
        assert_eq!(kms.live_versions().await, 0);
    }

    #[tokio::test]
    async fn test_injected_destroy_failure() {
        let kms = MemoryKms::new();
        let v = kms.create_key_version("ring").await.unwrap();
        kms.fail_destroy_of(v.clone()).await;

        assert!(kms.destroy_key_version(&v).await.is_err());
        // 失败后版本仍然存活
        assert!(kms.key_version_exists(&v).await.unwrap());
    }
}
