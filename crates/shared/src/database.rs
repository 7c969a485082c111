//! 数据库连接管理模块
//!
//! 按 [`DatabaseConfig`] 建立 PostgreSQL 连接池。仓储层各自持有
//! `PgPool` 的克隆，本包装只负责建池、健康检查与关闭。

use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{info, instrument};

use crate::config::DatabaseConfig;
use crate::error::{Result, VerifyError};

/// 数据库连接池包装
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// 按配置建立连接池
    #[instrument(skip(config))]
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .idle_timeout(Duration::from_secs(config.idle_timeout_seconds))
            .connect(&config.url)
            .await?;

        info!(
            max_connections = config.max_connections,
            "数据库连接池已建立"
        );
        Ok(Self { pool })
    }

    /// 获取连接池引用（仓储构造时克隆）
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// 健康检查：一次空查询确认连接可用
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(VerifyError::from)
    }

    /// 关闭连接池，等待在途连接归还
    pub async fn close(&self) {
        self.pool.close().await;
        info!("数据库连接池已关闭");
    }
}

impl std::ops::Deref for Database {
    type Target = PgPool;

    fn deref(&self) -> &Self::Target {
        &self.pool
    }
}
