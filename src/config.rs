//! 配置管理模块
//! 支持从环境变量（.env）和 TOML 配置文件加载配置

use std::{collections::HashMap, path::Path, path::PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::coin_table::is_http_url;

/// 节点覆盖环境变量前缀：JANUS_NODE_BTC=https://a,https://b
const NODE_OVERRIDE_PREFIX: &str = "JANUS_NODE_";

/// 历史查询条数硬上限
pub const HISTORY_LIMIT_CEILING: usize = 1000;

/// 核心配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub history: HistoryConfig,
}

/// 日志格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => anyhow::bail!("JANUS_LOG_FORMAT must be 'json' or 'text', got '{}'", other),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
    /// 设置后额外输出按日轮转的 JSON 文件日志
    pub log_file_path: Option<String>,
}

/// 注册表配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// 外部币种表（缺省使用内置表）
    pub coin_table_path: Option<PathBuf>,
    /// 按符号覆盖默认节点
    pub node_overrides: HashMap<String, Vec<String>>,
}

/// 交易历史配置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// 调用方未指定条数时使用
    pub default_limit: usize,
    /// 单次查询上限（超出部分被截断）
    pub max_limit: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: std::env::var("JANUS_LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            format: std::env::var("JANUS_LOG_FORMAT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(LogFormat::Text),
            log_file_path: std::env::var("JANUS_LOG_FILE").ok().filter(|p| !p.is_empty()),
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            default_limit: 10,
            max_limit: 200,
        }
    }
}

impl HistoryConfig {
    /// 实际生效的条数：未指定用默认值，超出上限截断
    pub fn effective_limit(&self, requested: Option<usize>) -> usize {
        requested.unwrap_or(self.default_limit).min(self.max_limit)
    }
}

impl Config {
    /// 从环境变量加载配置（先读取 .env）
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(std::env::vars())
    }

    /// 从给定的环境变量集合加载（便于测试，不触碰进程环境）
    pub fn from_vars<I>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let vars: HashMap<String, String> = vars.into_iter().collect();
        let get = |key: &str| vars.get(key).map(|v| v.trim()).filter(|v| !v.is_empty());

        let logging = LoggingConfig {
            level: get("JANUS_LOG_LEVEL").unwrap_or("info").to_string(),
            format: match get("JANUS_LOG_FORMAT") {
                Some(format) => format.parse()?,
                None => LogFormat::Text,
            },
            log_file_path: get("JANUS_LOG_FILE").map(str::to_string),
        };

        let mut node_overrides = HashMap::new();
        for (key, value) in &vars {
            if let Some(symbol) = key.strip_prefix(NODE_OVERRIDE_PREFIX) {
                let nodes: Vec<String> = value
                    .split(',')
                    .map(str::trim)
                    .filter(|n| !n.is_empty())
                    .map(str::to_string)
                    .collect();
                if !symbol.is_empty() && !nodes.is_empty() {
                    node_overrides.insert(symbol.to_string(), nodes);
                }
            }
        }

        let registry = RegistryConfig {
            coin_table_path: get("JANUS_COIN_TABLE").map(PathBuf::from),
            node_overrides,
        };

        let defaults = HistoryConfig::default();
        let history = HistoryConfig {
            default_limit: parse_usize(get("JANUS_HISTORY_DEFAULT_LIMIT"), "JANUS_HISTORY_DEFAULT_LIMIT")?
                .unwrap_or(defaults.default_limit),
            max_limit: parse_usize(get("JANUS_HISTORY_MAX_LIMIT"), "JANUS_HISTORY_MAX_LIMIT")?
                .unwrap_or(defaults.max_limit),
        };

        Ok(Self {
            logging,
            registry,
            history,
        })
    }

    /// 从配置文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: Config =
            toml::from_str(&content).with_context(|| "Failed to parse config file as TOML")?;

        Ok(config)
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        let level = self.logging.level.to_lowercase();
        // 允许 EnvFilter 指令形式，例如 "info,janus_core=debug"
        let base_level = level.split(',').next().unwrap_or_default();
        if !base_level.contains('=') && !valid_levels.contains(&base_level) {
            anyhow::bail!("JANUS_LOG_LEVEL must be one of: {:?}", valid_levels);
        }

        if let Some(path) = &self.registry.coin_table_path {
            if !path.exists() {
                anyhow::bail!("JANUS_COIN_TABLE points to a missing file: {}", path.display());
            }
        }

        for (symbol, nodes) in &self.registry.node_overrides {
            if let Some(node) = nodes.iter().find(|n| !is_http_url(n)) {
                anyhow::bail!("{}{} contains a non-http(s) node: {}", NODE_OVERRIDE_PREFIX, symbol, node);
            }
        }

        if self.history.default_limit == 0 {
            anyhow::bail!("JANUS_HISTORY_DEFAULT_LIMIT must be greater than 0");
        }
        if self.history.max_limit > HISTORY_LIMIT_CEILING {
            anyhow::bail!("JANUS_HISTORY_MAX_LIMIT must not exceed {}", HISTORY_LIMIT_CEILING);
        }
        if self.history.default_limit > self.history.max_limit {
            anyhow::bail!("JANUS_HISTORY_DEFAULT_LIMIT must not exceed JANUS_HISTORY_MAX_LIMIT");
        }

        Ok(())
    }
}

fn parse_usize(value: Option<&str>, name: &str) -> Result<Option<usize>> {
    value
        .map(|v| v.parse::<usize>().with_context(|| format!("{} must be a non-negative integer", name)))
        .transpose()
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_from_empty_env() {
        let config = Config::from_vars(Vec::new()).unwrap();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Text);
        assert_eq!(config.history, HistoryConfig::default());
        assert!(config.registry.coin_table_path.is_none());
        config.validate().unwrap();
    }

    #[test]
    fn test_node_overrides_are_split_and_trimmed() {
        let config = Config::from_vars(vars(&[
            ("JANUS_NODE_BTC", "https://a.example, https://b.example ,"),
            ("JANUS_NODE_", "https://ignored.example"),
            ("JANUS_LOG_FORMAT", "JSON"),
        ]))
        .unwrap();
        assert_eq!(
            config.registry.node_overrides.get("BTC").unwrap(),
            &vec!["https://a.example".to_string(), "https://b.example".to_string()]
        );
        assert_eq!(config.registry.node_overrides.len(), 1);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(Config::from_vars(vars(&[("JANUS_LOG_FORMAT", "xml")])).is_err());
        assert!(Config::from_vars(vars(&[("JANUS_HISTORY_MAX_LIMIT", "-1")])).is_err());

        let config = Config::from_vars(vars(&[
            ("JANUS_HISTORY_DEFAULT_LIMIT", "50"),
            ("JANUS_HISTORY_MAX_LIMIT", "20"),
        ]))
        .unwrap();
        assert!(config.validate().is_err());

        let config = Config::from_vars(vars(&[("JANUS_NODE_ETH", "ws://node.example")])).unwrap();
        assert!(config.validate().is_err());

        let config = Config::from_vars(vars(&[("JANUS_LOG_LEVEL", "loud")])).unwrap();
        assert!(config.validate().is_err());

        let config = Config::from_vars(vars(&[("JANUS_LOG_LEVEL", "info,janus_core=debug")])).unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_effective_history_limit() {
        let history = HistoryConfig::default();
        assert_eq!(history.effective_limit(None), 10);
        assert_eq!(history.effective_limit(Some(5)), 5);
        assert_eq!(history.effective_limit(Some(10_000)), 200);
        assert_eq!(history.effective_limit(Some(0)), 0);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[logging]
level = "debug"
format = "json"

[history]
default_limit = 25
max_limit = 100

[registry.node_overrides]
ETH = ["https://my-eth.example"]
"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.history.default_limit, 25);
        assert_eq!(config.history.max_limit, 100);
        assert_eq!(
            config.registry.node_overrides["ETH"],
            vec!["https://my-eth.example".to_string()]
        );
        config.validate().unwrap();
    }
}
