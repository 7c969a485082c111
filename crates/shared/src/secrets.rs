//! 密钥引用解析模块
//!
//! 数据库中对第三方凭据（如短信供应商的 auth token）只保存引用字符串
//! （形如 `secret://projects/x/secrets/y`），真实值存放在外部密钥管理服务。
//! 本模块定义解析接口，并提供短 TTL 的读穿透缓存，避免每次请求都回源。
//!
//! ## 缓存策略
//!
//! 只读缓存，无回写语义：条目过期后下一次读取重新回源，更新密钥后
//! 最多经过一个 TTL 生效。

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{Result, VerifyError};

/// 密钥引用解析接口
#[async_trait]
pub trait SecretResolver: Send + Sync {
    /// 将引用字符串解析为真实密钥值
    async fn resolve(&self, reference: &str) -> Result<String>;
}

/// 内存解析器
///
/// 开发与测试环境使用，从预置的映射表解析引用。
#[derive(Default)]
pub struct MemoryResolver {
    secrets: RwLock<HashMap<String, String>>,
}

impl MemoryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// 预置一条密钥映射
    pub async fn put(&self, reference: impl Into<String>, value: impl Into<String>) {
        self.secrets
            .write()
            .await
            .insert(reference.into(), value.into());
    }
}

#[async_trait]
impl SecretResolver for MemoryResolver {
    async fn resolve(&self, reference: &str) -> Result<String> {
        self.secrets
            .read()
            .await
            .get(reference)
            .cloned()
            .ok_or_else(|| VerifyError::SecretNotFound {
                reference: reference.to_string(),
            })
    }
}

/// 缓存条目
struct CachedSecret {
    value: String,
    fetched_at: Instant,
}

/// 带 TTL 缓存的解析器
///
/// 包装任意 [`SecretResolver`]，命中且未过期时直接返回缓存值。
/// 解析失败不缓存，下次读取会再次回源。
pub struct CachingResolver<R: SecretResolver> {
    inner: Arc<R>,
    ttl: Duration,
    cache: RwLock<HashMap<String, CachedSecret>>,
}

impl<R: SecretResolver> CachingResolver<R> {
    pub fn new(inner: Arc<R>, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// 手动清空缓存（密钥轮换后立即生效的场景）
    pub async fn invalidate_all(&self) {
        self.cache.write().await.clear();
    }
}

#[async_trait]
impl<R: SecretResolver> SecretResolver for CachingResolver<R> {
    async fn resolve(&self, reference: &str) -> Result<String> {
        {
            let cache = self.cache.read().await;
            if let Some(entry) = cache.get(reference) {
                if entry.fetched_at.elapsed() < self.ttl {
                    return Ok(entry.value.clone());
                }
            }
        }

        debug!(reference = %reference, "密钥缓存未命中，回源解析");
        let value = self.inner.resolve(reference).await?;

        let mut cache = self.cache.write().await;
        cache.insert(
            reference.to_string(),
            CachedSecret {
                value: value.clone(),
                fetched_at: Instant::now(),
            },
        );

        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_resolver() {
        let resolver = MemoryResolver::new();
        resolver.put("secret://sms/token", "tw-auth-token").await;

        assert_eq!(
            resolver.resolve("secret://sms/token").await.unwrap(),
            "tw-auth-token"
        );
        assert!(resolver.resolve("secret://missing").await.is_err());
    }

    #[tokio::test]
    async fn test_caching_resolver_serves_stale_within_ttl() {
        let inner = Arc::new(MemoryResolver::new());
        inner.put("secret://a", "v1").await;

        let caching = CachingResolver::new(inner.clone(), Duration::from_secs(60));
        assert_eq!(caching.resolve("secret://a").await.unwrap(), "v1");

        // 源值变更后，TTL 内仍返回缓存值
        inner.put("secret://a", "v2").await;
        assert_eq!(caching.resolve("secret://a").await.unwrap(), "v1");

        // 手动失效后回源
        caching.invalidate_all().await;
        assert_eq!(caching.resolve("secret://a").await.unwrap(), "v2");
    }

    #[tokio::test]
    async fn test_caching_resolver_does_not_cache_failures() {
        let inner = Arc::new(MemoryResolver::new());
        let caching = CachingResolver::new(inner.clone(), Duration::from_secs(60));

        assert!(caching.resolve("secret://late").await.is_err());

        // 失败未被缓存，补上映射后立刻可解析
        inner.put("secret://late", "ready").await;
        assert_eq!(caching.resolve("secret://late").await.unwrap(), "ready");
    }
}
