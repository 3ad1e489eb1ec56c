//! 日志系统配置模块
//! 支持结构化日志、日志级别配置和按日轮转的文件日志

use std::path::Path;

use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{
    fmt::{self, time::ChronoUtc},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

use crate::config::{LogFormat, LoggingConfig};

/// 初始化日志系统
///
/// 启用文件日志时返回 [`WorkerGuard`]，调用方须持有到进程退出，否则缓冲中的日志会丢失。
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<Option<WorkerGuard>> {
    // RUST_LOG 优先于配置
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let stdout_layer = match config.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_timer(ChronoUtc::rfc_3339())
            .boxed(),
        LogFormat::Text => fmt::layer()
            .with_timer(ChronoUtc::rfc_3339())
            .with_ansi(true)
            .boxed(),
    };

    let (file_layer, guard) = match config.log_file_path.as_deref() {
        Some(path) => {
            let path = Path::new(path);
            let log_dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("./logs"));
            let file_name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("janus-core.log");

            std::fs::create_dir_all(log_dir)?;

            let (writer, guard) = non_blocking(rolling::daily(log_dir, file_name));
            // 文件日志始终使用 JSON
            let layer = fmt::layer()
                .json()
                .with_writer(writer)
                .with_timer(ChronoUtc::rfc_3339())
                .with_ansi(false)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    Registry::default()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {}", e))?;

    tracing::info!(
        level = %config.level,
        format = ?config.format,
        file = config.log_file_path.as_deref().unwrap_or("-"),
        "Logging initialized"
    );

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_twice_reports_error_instead_of_panicking() {
        let config = LoggingConfig {
            level: "debug".to_string(),
            format: LogFormat::Json,
            log_file_path: None,
        };
        let first = init_logging(&config);
        let second = init_logging(&config);
        // 全局 subscriber 只能安装一次；同一进程中的其他测试可能已安装
        assert!(first.is_err() || second.is_err());
    }
}
