//! 签名密钥生命周期管理器
//!
//! 在存储与 KMS 客户端之上组合出四个操作：
//! - 配额检查：统计未删除版本数，超限拒绝创建
//! - 激活：事务性去激活-激活切换（由存储实现保证原子）
//! - 轮换：配额 -> KMS 创建 -> 落库（非激活）-> 激活 -> 回读
//! - 清理：销毁上游版本确认成功后才硬删除本地行，首个失败即中止
//!
//! ## 失败语义
//!
//! KMS 创建成功后本地落库失败时，不回滚（销毁）KMS 侧版本，
//! 只记录错误日志，孤儿版本由人工对账处理。

use std::marker::PhantomData;
use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{error, info, instrument, warn};

use crate::error::{DbError, Result};
use crate::models::{Actor, KeyVersion};

use super::kms::KmsClient;
use super::purpose::{check_scope, KeyPurpose};
use super::store::{ActivationOutcome, KeyVersionStore};

/// 签名密钥生命周期管理器
///
/// 对每种密钥用途实例化一次；三种用途共享全部逻辑，仅表名与作用域规则不同。
pub struct KeyManager<P, S, K>
where
    P: KeyPurpose,
    S: KeyVersionStore,
    K: KmsClient,
{
    store: Arc<S>,
    kms: Arc<K>,
    /// 每个作用域允许的最大未删除版本数
    max_versions: i64,
    _purpose: PhantomData<P>,
}

impl<P, S, K> KeyManager<P, S, K>
where
    P: KeyPurpose,
    S: KeyVersionStore,
    K: KmsClient,
{
    pub fn new(store: Arc<S>, kms: Arc<K>, max_versions: i64) -> Self {
        Self {
            store,
            kms,
            max_versions,
            _purpose: PhantomData,
        }
    }

    /// 从共享配置构建（配额上限取 `max_key_versions`）
    pub fn from_config(
        store: Arc<S>,
        kms: Arc<K>,
        config: &verify_shared::config::KeyManagementConfig,
    ) -> Self {
        Self::new(store, kms, config.max_key_versions)
    }

    /// 配额检查：作用域内是否还允许创建新版本
    pub async fn can_create(&self, scope: i64) -> Result<bool> {
        check_scope::<P>(scope)?;
        let count = self.store.count_available(scope).await?;
        Ok(count < self.max_versions)
    }

    /// 创建新的密钥版本（不激活）
    ///
    /// 先检查配额再调用 KMS，配额超限时不产生任何上游调用。
    /// KMS 创建成功后落库失败会留下孤儿版本，记录错误日志后原样返回错误。
    #[instrument(skip(self, actor), fields(purpose = P::PURPOSE, scope = scope))]
    pub async fn create_version(
        &self,
        scope: i64,
        parent_key_ring: &str,
        actor: &Actor,
    ) -> Result<KeyVersion> {
        check_scope::<P>(scope)?;

        if self.store.count_available(scope).await? >= self.max_versions {
            return Err(DbError::KeyQuotaExceeded {
                purpose: P::PURPOSE,
                limit: self.max_versions,
            });
        }

        let kms_version = self.kms.create_key_version(parent_key_ring).await?;

        let key = match self.store.insert(scope, &kms_version, actor).await {
            Ok(key) => key,
            Err(e) => {
                // KMS 侧版本已创建，本地未落库：不自动回滚，留待人工对账
                error!(
                    purpose = P::PURPOSE,
                    scope = scope,
                    kms_version = %kms_version,
                    error = %e,
                    "密钥版本落库失败，KMS 侧版本成为孤儿"
                );
                return Err(e);
            }
        };

        info!(
            purpose = P::PURPOSE,
            scope = scope,
            key_id = key.id,
            kms_version = %kms_version,
            "签名密钥版本已创建"
        );
        Ok(key)
    }

    /// 激活指定版本
    ///
    /// 目标已激活时为幂等空操作（不写审计）。
    #[instrument(skip(self, actor), fields(purpose = P::PURPOSE, scope = scope, key_id = id))]
    pub async fn activate(&self, scope: i64, id: i64, actor: &Actor) -> Result<ActivationOutcome> {
        check_scope::<P>(scope)?;
        let outcome = self.store.activate(scope, id, actor).await?;
        if outcome == ActivationOutcome::Activated {
            info!(
                purpose = P::PURPOSE,
                scope = scope,
                key_id = id,
                "签名密钥版本已激活"
            );
        }
        Ok(outcome)
    }

    /// 轮换：创建新版本并立即激活
    ///
    /// 步骤顺序即失败边界：配额 -> KMS 创建 -> 落库 -> 激活 -> 回读。
    /// 返回回读后的权威持久化状态，而非过程中的内存副本。
    #[instrument(skip(self, actor), fields(purpose = P::PURPOSE, scope = scope))]
    pub async fn rotate(
        &self,
        scope: i64,
        parent_key_ring: &str,
        actor: &Actor,
    ) -> Result<KeyVersion> {
        let created = self.create_version(scope, parent_key_ring, actor).await?;
        self.store.activate(scope, created.id, actor).await?;

        // 回读：调用方拿到的是库中的权威状态
        let key = self.store.find(scope, created.id).await?;
        info!(
            purpose = P::PURPOSE,
            scope = scope,
            key_id = key.id,
            "签名密钥轮换完成"
        );
        Ok(key)
    }

    /// 软删除指定版本（激活中的版本拒绝删除）
    pub async fn soft_delete(&self, scope: i64, id: i64, actor: &Actor) -> Result<()> {
        check_scope::<P>(scope)?;
        self.store.soft_delete(scope, id, actor).await
    }

    /// 恢复软删除的版本
    pub async fn undelete(&self, scope: i64, id: i64, actor: &Actor) -> Result<()> {
        check_scope::<P>(scope)?;
        self.store.undelete(scope, id, actor).await
    }

    /// 列出作用域内的全部可用版本
    pub async fn list(&self, scope: i64) -> Result<Vec<KeyVersion>> {
        check_scope::<P>(scope)?;
        self.store.list(scope).await
    }

    /// 清理软删除超过保留期的版本
    ///
    /// 逐行执行：销毁上游 KMS 版本 -> 确认已销毁 -> 硬删除本地行。
    /// 任一行的上游销毁失败立即中止整个清理，返回的错误携带已清理数量。
    /// 本地行永远不会在其 KMS 版本仍存在时被删除。
    #[instrument(skip(self), fields(purpose = P::PURPOSE))]
    pub async fn purge(&self, older_than: Duration) -> Result<i64> {
        let cutoff = Utc::now() - older_than;
        let candidates = self.store.list_purgeable(cutoff).await?;

        let mut purged: i64 = 0;
        for key in candidates {
            if let Err(e) = self.kms.destroy_key_version(&key.kms_key_version).await {
                warn!(
                    purpose = P::PURPOSE,
                    key_id = key.id,
                    kms_version = %key.kms_key_version,
                    error = %e,
                    "KMS 版本销毁失败，清理中止"
                );
                return Err(DbError::PurgeAborted {
                    purged,
                    reason: e.to_string(),
                });
            }

            // 销毁确认：上游版本仍存在时绝不删除本地引用
            if self.kms.key_version_exists(&key.kms_key_version).await? {
                return Err(DbError::PurgeAborted {
                    purged,
                    reason: format!("KMS 版本销毁未生效: {}", key.kms_key_version),
                });
            }

            if let Err(e) = self.store.hard_delete(key.id).await {
                return Err(DbError::PurgeAborted {
                    purged,
                    reason: e.to_string(),
                });
            }
            purged += 1;
        }

        if purged > 0 {
            info!(purpose = P::PURPOSE, purged = purged, "过期密钥版本清理完成");
        }
        Ok(purged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::kms::MockKmsClient;
    use crate::keys::purpose::{CertificateKey, TokenKey, SYSTEM_SCOPE};
    use crate::keys::store::MockKeyVersionStore;
    use mockall::predicate::eq;
    use mockall::Sequence;

    fn test_actor() -> Actor {
        Actor::new("user:1", "测试用户")
    }

    fn sample_key(id: i64, scope: i64, kms_version: &str, active: bool) -> KeyVersion {
        let now = Utc::now();
        KeyVersion {
            id,
            realm_id: scope,
            kms_key_version: kms_version.to_string(),
            active,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    type CertManager = KeyManager<CertificateKey, MockKeyVersionStore, MockKmsClient>;

    fn manager(store: MockKeyVersionStore, kms: MockKmsClient, max: i64) -> CertManager {
        KeyManager::new(Arc::new(store), Arc::new(kms), max)
    }

    #[tokio::test]
    async fn test_quota_exceeded_makes_no_kms_call() {
        let mut store = MockKeyVersionStore::new();
        store
            .expect_count_available()
            .with(eq(7))
            .returning(|_| Ok(2));

        let mut kms = MockKmsClient::new();
        kms.expect_create_key_version().times(0);

        let mgr = manager(store, kms, 2);
        let err = mgr
            .create_version(7, "ring", &test_actor())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DbError::KeyQuotaExceeded {
                purpose: "certificate",
                limit: 2
            }
        ));
    }

    #[tokio::test]
    async fn test_quota_recovers_below_limit() {
        let mut store = MockKeyVersionStore::new();
        store.expect_count_available().returning(|_| Ok(1));

        let kms = MockKmsClient::new();
        let mgr = manager(store, kms, 2);
        assert!(mgr.can_create(7).await.unwrap());
    }

    #[tokio::test]
    async fn test_rotate_runs_steps_in_order() {
        let mut seq = Sequence::new();
        let mut store = MockKeyVersionStore::new();
        let mut kms = MockKmsClient::new();

        store
            .expect_count_available()
            .with(eq(7))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(0));
        kms.expect_create_key_version()
            .with(eq("ring"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok("ring/cryptoKeyVersions/1".to_string()));
        store
            .expect_insert()
            .withf(|scope, v, _| *scope == 7 && v == "ring/cryptoKeyVersions/1")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|scope, v, _| Ok(sample_key(42, scope, v, false)));
        store
            .expect_activate()
            .with(eq(7), eq(42), mockall::predicate::always())
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok(ActivationOutcome::Activated));
        // 回读发生在激活之后，返回权威持久化状态
        store
            .expect_find()
            .with(eq(7), eq(42))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|scope, id| Ok(sample_key(id, scope, "ring/cryptoKeyVersions/1", true)));

        let mgr = manager(store, kms, 5);
        let key = mgr.rotate(7, "ring", &test_actor()).await.unwrap();

        assert_eq!(key.id, 42);
        assert!(key.active);
    }

    #[tokio::test]
    async fn test_rotate_kms_failure_leaves_no_local_state() {
        let mut store = MockKeyVersionStore::new();
        store.expect_count_available().returning(|_| Ok(0));
        store.expect_insert().times(0);
        store.expect_activate().times(0);

        let mut kms = MockKmsClient::new();
        kms.expect_create_key_version()
            .returning(|_| Err(DbError::Kms("deadline exceeded".to_string())));

        let mgr = manager(store, kms, 5);
        let err = mgr.rotate(7, "ring", &test_actor()).await.unwrap_err();
        assert!(matches!(err, DbError::Kms(_)));
    }

    #[tokio::test]
    async fn test_activate_already_active_is_noop() {
        let mut store = MockKeyVersionStore::new();
        store
            .expect_activate()
            .returning(|_, _, _| Ok(ActivationOutcome::AlreadyActive));

        let kms = MockKmsClient::new();
        let mgr = manager(store, kms, 5);

        let outcome = mgr.activate(7, 42, &test_actor()).await.unwrap();
        assert_eq!(outcome, ActivationOutcome::AlreadyActive);
    }

    #[tokio::test]
    async fn test_scopeless_purpose_rejects_realm_scope() {
        let mut store = MockKeyVersionStore::new();
        store
            .expect_count_available()
            .with(eq(SYSTEM_SCOPE))
            .returning(|_| Ok(0));
        let kms = MockKmsClient::new();
        let mgr: KeyManager<TokenKey, _, _> =
            KeyManager::new(Arc::new(store), Arc::new(kms), 5);

        let err = mgr.can_create(7).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::MalformedScope {
                purpose: "token",
                scope: 7
            }
        ));

        // 系统作用域正常通过
        assert!(mgr.can_create(SYSTEM_SCOPE).await.unwrap());
    }

    #[tokio::test]
    async fn test_purge_destroys_upstream_before_local_delete() {
        let mut seq = Sequence::new();
        let mut store = MockKeyVersionStore::new();
        let mut kms = MockKmsClient::new();

        store
            .expect_list_purgeable()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| {
                let mut key = sample_key(1, 7, "ring/cryptoKeyVersions/1", false);
                key.deleted_at = Some(Utc::now() - Duration::days(30));
                Ok(vec![key])
            });
        kms.expect_destroy_key_version()
            .with(eq("ring/cryptoKeyVersions/1"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        kms.expect_key_version_exists()
            .with(eq("ring/cryptoKeyVersions/1"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(false));
        store
            .expect_hard_delete()
            .with(eq(1))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));

        let mgr = manager(store, kms, 5);
        assert_eq!(mgr.purge(Duration::days(14)).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_purge_aborts_on_first_failure_with_partial_count() {
        let mut store = MockKeyVersionStore::new();
        let mut kms = MockKmsClient::new();

        store.expect_list_purgeable().returning(|_| {
            let old = Utc::now() - Duration::days(30);
            let mut a = sample_key(1, 7, "ring/cryptoKeyVersions/1", false);
            let mut b = sample_key(2, 7, "ring/cryptoKeyVersions/2", false);
            let mut c = sample_key(3, 7, "ring/cryptoKeyVersions/3", false);
            a.deleted_at = Some(old);
            b.deleted_at = Some(old);
            c.deleted_at = Some(old);
            Ok(vec![a, b, c])
        });

        kms.expect_destroy_key_version()
            .with(eq("ring/cryptoKeyVersions/1"))
            .times(1)
            .returning(|_| Ok(()));
        kms.expect_key_version_exists()
            .with(eq("ring/cryptoKeyVersions/1"))
            .times(1)
            .returning(|_| Ok(false));
        kms.expect_destroy_key_version()
            .with(eq("ring/cryptoKeyVersions/2"))
            .times(1)
            .returning(|_| Err(DbError::Kms("permission denied".to_string())));
        // 第三行不应被触碰
        kms.expect_destroy_key_version()
            .with(eq("ring/cryptoKeyVersions/3"))
            .times(0);

        // 只有第一行被硬删除
        store
            .expect_hard_delete()
            .with(eq(1))
            .times(1)
            .returning(|_| Ok(()));
        store.expect_hard_delete().with(eq(2)).times(0);

        let mgr = manager(store, kms, 5);
        let err = mgr.purge(Duration::days(14)).await.unwrap_err();

        match err {
            DbError::PurgeAborted { purged, reason } => {
                assert_eq!(purged, 1);
                assert!(reason.contains("permission denied"));
            }
            other => panic!("expected PurgeAborted, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_purge_refuses_local_delete_when_upstream_still_exists() {
        let mut store = MockKeyVersionStore::new();
        let mut kms = MockKmsClient::new();

        store.expect_list_purgeable().returning(|_| {
            let mut key = sample_key(1, 7, "ring/cryptoKeyVersions/1", false);
            key.deleted_at = Some(Utc::now() - Duration::days(30));
            Ok(vec![key])
        });
        kms.expect_destroy_key_version().returning(|_| Ok(()));
        // 销毁调用成功但版本仍存在（最终一致窗口）
        kms.expect_key_version_exists().returning(|_| Ok(true));
        store.expect_hard_delete().times(0);

        let mgr = manager(store, kms, 5);
        let err = mgr.purge(Duration::days(14)).await.unwrap_err();
        assert!(matches!(err, DbError::PurgeAborted { purged: 0, .. }));
    }
}
