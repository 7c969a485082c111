//! 日志初始化模块
//!
//! 基于 tracing-subscriber 提供结构化日志输出，支持 json 和 pretty 两种格式。
//! 日志级别优先读取 RUST_LOG 环境变量，未设置时使用配置项。

use anyhow::Result;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

use crate::config::ObservabilityConfig;

/// 初始化 tracing 日志
///
/// 重复调用会返回错误（全局 subscriber 只能设置一次），
/// 测试场景请使用 `try_init_for_tests`。
pub fn init(config: &ObservabilityConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = if config.log_format == "json" {
        fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .boxed()
    } else {
        fmt::layer().with_target(true).with_ansi(true).boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}

/// 测试用日志初始化（重复调用静默忽略）
pub fn try_init_for_tests() {
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::new("debug"))
        .with(fmt::layer().with_test_writer())
        .try_init();
}
