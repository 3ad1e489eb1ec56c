//! 币种表（TOML）
//!
//! 内置表在编译期嵌入；部署时可通过 `JANUS_COIN_TABLE` 指向外部文件替换。
//! 所有条目在构建注册表前统一校验，错误一次性汇总返回。

use std::{collections::HashMap, path::Path, str::FromStr};

use anyhow::Context;
use rust_decimal::Decimal;
use serde::Deserialize;

use super::{AddressRules, CoinFamily, CoinMetadata, TokenDeployment};
use crate::{error::CoreError, utils::address_validator::AddressValidator};

/// 当前支持的表格式版本
pub const COIN_TABLE_VERSION: u32 = 1;

const BUILTIN_COIN_TABLE: &str = include_str!("../../config/coins.toml");

/// 币种表
#[derive(Debug, Clone, Deserialize)]
pub struct CoinTable {
    pub version: u32,
    #[serde(rename = "coin", default)]
    pub coins: Vec<CoinEntry>,
}

/// 表中的单个条目（未校验）
#[derive(Debug, Clone, Deserialize)]
pub struct CoinEntry {
    pub symbol: String,
    pub name: String,
    pub decimals: u32,
    pub family: CoinFamily,
    pub explorer: String,
    #[serde(default)]
    pub nodes: Vec<String>,
    #[serde(default)]
    pub chain_id: Option<u64>,
    #[serde(default)]
    pub default_fee: Option<String>,
    #[serde(default)]
    pub address: AddressRules,
    #[serde(default)]
    pub deployments: Vec<TokenDeployment>,
}

/// 最大精度（Decimal 尾数上限为 28 位）
const MAX_DECIMALS: u32 = 28;

impl CoinTable {
    pub fn builtin() -> Result<Self, CoreError> {
        Self::parse(BUILTIN_COIN_TABLE)
    }

    pub fn parse(source: &str) -> Result<Self, CoreError> {
        let table: CoinTable = toml::from_str(source).map_err(|e| CoreError::InvalidCoinTable {
            errors: vec![e.to_string()],
        })?;
        if table.version != COIN_TABLE_VERSION {
            return Err(CoreError::InvalidCoinTable {
                errors: vec![format!(
                    "unsupported coin table version {} (expected {})",
                    table.version, COIN_TABLE_VERSION
                )],
            });
        }
        Ok(table)
    }

    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read coin table {}", path.display()))?;
        Self::parse(&source).with_context(|| format!("Failed to parse coin table {}", path.display()))
    }

    /// 用配置中的节点列表替换表中节点（未知符号被忽略）
    pub fn override_nodes(&mut self, overrides: &HashMap<String, Vec<String>>) {
        for entry in &mut self.coins {
            if let Some(nodes) = overrides.get(&entry.symbol) {
                if !nodes.is_empty() {
                    tracing::info!(symbol = %entry.symbol, count = nodes.len(), "Overriding default nodes");
                    entry.nodes = nodes.clone();
                }
            }
        }
    }

    /// 校验并转换为元数据列表（保持表内顺序）
    pub fn into_metadata(self) -> Result<Vec<CoinMetadata>, CoreError> {
        let mut errors = Vec::new();
        let mut seen = HashMap::new();
        let mut coins = Vec::with_capacity(self.coins.len());

        for (position, entry) in self.coins.into_iter().enumerate() {
            if let Some(first) = seen.insert(entry.symbol.clone(), position) {
                errors.push(format!(
                    "duplicate symbol {} (entries {} and {})",
                    entry.symbol, first, position
                ));
                continue;
            }
            match entry.validate() {
                Ok(coin) => coins.push(coin),
                Err(mut entry_errors) => errors.append(&mut entry_errors),
            }
        }

        if errors.is_empty() {
            Ok(coins)
        } else {
            Err(CoreError::InvalidCoinTable { errors })
        }
    }
}

impl CoinEntry {
    fn validate(self) -> Result<CoinMetadata, Vec<String>> {
        let mut errors = Vec::new();
        let symbol = self.symbol.clone();

        if symbol.trim().is_empty() || symbol.trim() != symbol {
            errors.push(format!("symbol '{}' must be non-empty without surrounding whitespace", symbol));
        }
        if self.name.trim().is_empty() {
            errors.push(format!("{}: name is empty", symbol));
        }
        if self.decimals > MAX_DECIMALS {
            errors.push(format!("{}: decimals {} exceeds {}", symbol, self.decimals, MAX_DECIMALS));
        }
        if !self.explorer.starts_with("https://") && !self.explorer.starts_with("http://") {
            errors.push(format!("{}: explorer must be an http(s) URL", symbol));
        }
        if self.nodes.is_empty() {
            errors.push(format!("{}: at least one node is required", symbol));
        }
        for node in &self.nodes {
            if !is_http_url(node) {
                errors.push(format!("{}: node '{}' is not an http(s) URL", symbol, node));
            }
        }

        let default_fee = match self.default_fee.as_deref().map(Decimal::from_str) {
            None => None,
            Some(Ok(fee)) if fee.is_sign_negative() => {
                errors.push(format!("{}: default_fee must not be negative", symbol));
                None
            }
            Some(Ok(fee)) => Some(fee),
            Some(Err(e)) => {
                errors.push(format!("{}: default_fee is not a decimal: {}", symbol, e));
                None
            }
        };

        let mut chain_id = self.chain_id;
        match self.family {
            CoinFamily::Utxo => {
                let rules = &self.address;
                if rules.base58_versions.is_empty()
                    && rules.bech32_hrp.is_none()
                    && rules.cashaddr_prefix.is_none()
                {
                    errors.push(format!("{}: utxo coin declares no address encoding", symbol));
                }
            }
            CoinFamily::Evm => {
                if chain_id.is_none() {
                    errors.push(format!("{}: evm coin requires chain_id", symbol));
                }
            }
            CoinFamily::Privacy => {
                if self.address.leading.is_empty() || self.address.lengths.is_empty() {
                    errors.push(format!(
                        "{}: privacy coin requires address leading and lengths",
                        symbol
                    ));
                }
                if default_fee.is_none() {
                    errors.push(format!("{}: privacy coin requires default_fee", symbol));
                }
            }
            CoinFamily::Stablecoin => {
                if self.deployments.is_empty() {
                    errors.push(format!("{}: stablecoin requires at least one deployment", symbol));
                }
                let mut networks = Vec::new();
                for deployment in &self.deployments {
                    if networks.contains(&deployment.network.to_ascii_lowercase()) {
                        errors.push(format!(
                            "{}: network {} is deployed twice",
                            symbol, deployment.network
                        ));
                    }
                    networks.push(deployment.network.to_ascii_lowercase());
                    if let Err(reason) = AddressValidator::validate_evm_address(&deployment.contract) {
                        errors.push(format!(
                            "{}: contract on {} is invalid: {}",
                            symbol, deployment.network, reason
                        ));
                    }
                    if deployment.fee_symbol.trim().is_empty() {
                        errors.push(format!(
                            "{}: deployment on {} has no fee_symbol",
                            symbol, deployment.network
                        ));
                    }
                }
                chain_id = self.deployments.first().map(|d| d.chain_id);
            }
        }

        if self.family != CoinFamily::Stablecoin && !self.deployments.is_empty() {
            errors.push(format!("{}: only stablecoins may declare deployments", symbol));
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        let mut deployments = self.deployments;
        for deployment in &mut deployments {
            deployment.contract = deployment.contract.to_ascii_lowercase();
        }

        Ok(CoinMetadata {
            symbol: self.symbol,
            name: self.name,
            decimals: self.decimals,
            family: self.family,
            explorer_url: self.explorer,
            nodes: self.nodes,
            chain_id,
            address_rules: self.address,
            deployments,
            default_fee,
        })
    }
}

pub(crate) fn is_http_url(url: &str) -> bool {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"));
    matches!(rest, Some(host) if !host.is_empty() && !host.starts_with('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
version = 1

[[coin]]
symbol = "ETH"
name = "Ethereum"
decimals = 18
family = "evm"
explorer = "https://etherscan.io"
chain_id = 1
nodes = ["https://eth.llamarpc.com"]
"#;

    #[test]
    fn test_builtin_table_is_valid() {
        let coins = CoinTable::builtin().unwrap().into_metadata().unwrap();
        assert!(coins.len() >= 16);
        for family in CoinFamily::ALL {
            assert!(coins.iter().any(|c| c.family == family), "no coin for {}", family);
        }
    }

    #[test]
    fn test_stablecoin_chain_id_comes_from_default_deployment() {
        let coins = CoinTable::builtin().unwrap().into_metadata().unwrap();
        let usdt = coins.iter().find(|c| c.symbol == "USDT").unwrap();
        assert_eq!(usdt.chain_id, Some(1));
        assert_eq!(usdt.deployments[0].network, "ethereum");
    }

    #[test]
    fn test_rejects_unknown_version() {
        let err = CoinTable::parse(&MINIMAL.replace("version = 1", "version = 2")).unwrap_err();
        assert!(err.to_string().contains("version 2"));
    }

    #[test]
    fn test_rejects_unknown_family() {
        let err = CoinTable::parse(&MINIMAL.replace("\"evm\"", "\"solana\"")).unwrap_err();
        assert!(matches!(err, CoreError::InvalidCoinTable { .. }));
    }

    #[test]
    fn test_collects_all_entry_errors() {
        let source = format!(
            "{}\n{}",
            MINIMAL,
            r#"
[[coin]]
symbol = "ETH"
name = "Duplicate"
decimals = 18
family = "evm"
explorer = "https://etherscan.io"
chain_id = 1
nodes = ["https://eth.llamarpc.com"]

[[coin]]
symbol = "XMR"
name = "Monero"
decimals = 12
family = "privacy"
explorer = "xmrchain.net"
nodes = []
"#
        );
        let err = CoinTable::parse(&source).unwrap().into_metadata().unwrap_err();
        let CoreError::InvalidCoinTable { errors } = err else {
            panic!("expected InvalidCoinTable");
        };
        assert!(errors.iter().any(|e| e.contains("duplicate symbol ETH")));
        assert!(errors.iter().any(|e| e.contains("XMR: explorer")));
        assert!(errors.iter().any(|e| e.contains("XMR: at least one node")));
        assert!(errors.iter().any(|e| e.contains("XMR: privacy coin requires default_fee")));
    }

    #[test]
    fn test_node_override() {
        let mut table = CoinTable::parse(MINIMAL).unwrap();
        let overrides = HashMap::from([(
            "ETH".to_string(),
            vec!["https://my-node.example".to_string()],
        )]);
        table.override_nodes(&overrides);
        let coins = table.into_metadata().unwrap();
        assert_eq!(coins[0].default_node(), Some("https://my-node.example"));
    }

    #[test]
    fn test_http_url() {
        assert!(is_http_url("https://node.example"));
        assert!(is_http_url("http://127.0.0.1:8545"));
        assert!(!is_http_url("https://"));
        assert!(!is_http_url("ftp://node.example"));
        assert!(!is_http_url("node.example"));
    }
}
