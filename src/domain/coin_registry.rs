//! 币种注册表
//!
//! 启动时由币种表构建一次，之后只读；可以放进 `Arc` 在任意线程共享。
//! 符号查找区分大小写（"btc" 不是 "BTC"）。

use std::collections::HashMap;

use super::{CoinFamily, CoinMetadata, CoinTable};
use crate::{config::RegistryConfig, error::CoreError};

/// 币种注册表
#[derive(Debug, Clone)]
pub struct CoinRegistry {
    coins: Vec<CoinMetadata>,
    symbol_map: HashMap<String, usize>,
}

impl CoinRegistry {
    /// 内置币种表
    pub fn builtin() -> Result<Self, CoreError> {
        Self::from_table(CoinTable::builtin()?)
    }

    /// 按配置构建：外部币种表（可选）+ 节点覆盖
    pub fn from_config(config: &RegistryConfig) -> anyhow::Result<Self> {
        let mut table = match &config.coin_table_path {
            Some(path) => CoinTable::from_path(path)?,
            None => CoinTable::builtin()?,
        };
        table.override_nodes(&config.node_overrides);
        Ok(Self::from_table(table)?)
    }

    pub fn from_table(table: CoinTable) -> Result<Self, CoreError> {
        Self::from_coins(table.into_metadata()?)
    }

    /// 直接从元数据构建（符号必须唯一）
    pub fn from_coins(coins: Vec<CoinMetadata>) -> Result<Self, CoreError> {
        let mut symbol_map = HashMap::with_capacity(coins.len());
        let mut errors = Vec::new();
        for (index, coin) in coins.iter().enumerate() {
            if symbol_map.insert(coin.symbol.clone(), index).is_some() {
                errors.push(format!("duplicate symbol {}", coin.symbol));
            }
        }
        if !errors.is_empty() {
            return Err(CoreError::InvalidCoinTable { errors });
        }

        tracing::info!(
            coins = coins.len(),
            utxo = coins.iter().filter(|c| c.family == CoinFamily::Utxo).count(),
            evm = coins.iter().filter(|c| c.family == CoinFamily::Evm).count(),
            privacy = coins.iter().filter(|c| c.family == CoinFamily::Privacy).count(),
            stablecoin = coins.iter().filter(|c| c.family == CoinFamily::Stablecoin).count(),
            "Coin registry loaded"
        );

        Ok(Self { coins, symbol_map })
    }

    /// 按符号查找
    pub fn lookup(&self, symbol: &str) -> Result<&CoinMetadata, CoreError> {
        self.symbol_map
            .get(symbol)
            .map(|&index| &self.coins[index])
            .ok_or_else(|| CoreError::UnknownCoin {
                symbol: symbol.to_string(),
            })
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.symbol_map.contains_key(symbol)
    }

    /// 某家族的全部币种（表内顺序）
    pub fn list_by_family(&self, family: CoinFamily) -> Vec<&CoinMetadata> {
        self.coins.iter().filter(|c| c.family == family).collect()
    }

    /// 全部币种（表内顺序）
    pub fn list_all(&self) -> &[CoinMetadata] {
        &self.coins
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.coins.iter().map(|c| c.symbol.as_str())
    }

    pub fn len(&self) -> usize {
        self.coins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coins.is_empty()
    }
}
