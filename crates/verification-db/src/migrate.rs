//! 数据库迁移
//!
//! 迁移脚本位于 crate 根的 `migrations/` 目录，按序号顺序执行，
//! sqlx 在 `_sqlx_migrations` 表中记录已应用的版本。

use sqlx::PgPool;
use tracing::{info, instrument};

use crate::error::Result;

/// 运行所有未应用的迁移
#[instrument(skip(pool))]
pub async fn run(pool: &PgPool) -> Result<()> {
    info!("正在运行数据库迁移");
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| crate::DbError::Internal(format!("迁移失败: {e}")))?;
    info!("数据库迁移完成");
    Ok(())
}
