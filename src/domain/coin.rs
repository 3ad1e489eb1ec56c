//! 币种元数据模型
//!
//! 定义币种家族（UTXO / EVM / Privacy / Stablecoin）及每个币种的只读元数据

use std::{fmt, str::FromStr};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// 币种家族
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoinFamily {
    /// UTXO 模型 (BTC, LTC, BCH, DOGE, DASH, PIVX)
    Utxo,
    /// 账户模型 EVM 链原生币 (ETH, ETC, AVAX)
    Evm,
    /// 隐私币，查询需要查看密钥 (XMR)
    Privacy,
    /// 部署在 EVM 链上的代币 (USDT, USDC, DAI ...)
    Stablecoin,
}

impl CoinFamily {
    pub const ALL: [CoinFamily; 4] = [
        CoinFamily::Utxo,
        CoinFamily::Evm,
        CoinFamily::Privacy,
        CoinFamily::Stablecoin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CoinFamily::Utxo => "utxo",
            CoinFamily::Evm => "evm",
            CoinFamily::Privacy => "privacy",
            CoinFamily::Stablecoin => "stablecoin",
        }
    }
}

impl fmt::Display for CoinFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CoinFamily {
    type Err = CoreError;

    /// 家族标签大小写不敏感
    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        let normalized = tag.trim().to_ascii_lowercase();
        CoinFamily::ALL
            .into_iter()
            .find(|family| family.as_str() == normalized)
            .ok_or_else(|| CoreError::UnknownFamily {
                tag: tag.to_string(),
            })
    }
}

/// 地址格式规则（由币种表声明，家族策略解释）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AddressRules {
    /// Base58Check 允许的版本字节 (P2PKH / P2SH)
    pub base58_versions: Vec<u8>,
    /// SegWit Bech32 人类可读前缀
    pub bech32_hrp: Option<String>,
    /// CashAddr 前缀 (BCH)
    pub cashaddr_prefix: Option<String>,
    /// 允许的首字符 (XMR)
    pub leading: Vec<String>,
    /// 允许的精确长度 (XMR 标准/集成地址)
    pub lengths: Vec<usize>,
    pub min_len: Option<usize>,
    pub max_len: Option<usize>,
}

/// 代币在某条 EVM 链上的部署
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenDeployment {
    /// 网络名 (ethereum, polygon, arbitrum)
    pub network: String,
    pub chain_id: u64,
    /// 合约地址（小写十六进制）
    pub contract: String,
    /// 支付手续费所用的原生币
    pub fee_symbol: String,
}

/// 币种元数据
///
/// 注册表构建完成后只读，所有查询都返回共享引用
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoinMetadata {
    /// 币种符号（区分大小写，注册表内唯一）
    pub symbol: String,
    /// 显示名称
    pub name: String,
    /// 小数位数
    pub decimals: u32,
    /// 所属家族
    pub family: CoinFamily,
    /// 区块浏览器基础 URL
    pub explorer_url: String,
    /// 默认节点列表（第一个为默认节点）
    pub nodes: Vec<String>,
    /// EVM 链 ID；代币取默认部署的链 ID
    pub chain_id: Option<u64>,
    pub address_rules: AddressRules,
    /// 代币部署列表（仅 Stablecoin，第一个为默认网络）
    pub deployments: Vec<TokenDeployment>,
    /// 固定手续费（没有手续费查询命令的家族使用）
    pub default_fee: Option<Decimal>,
}

impl CoinMetadata {
    pub fn default_node(&self) -> Option<&str> {
        self.nodes.first().map(String::as_str)
    }

    /// 按网络名查找部署；未指定网络时返回默认部署
    pub fn deployment(&self, network: Option<&str>) -> Option<&TokenDeployment> {
        match network {
            None => self.deployments.first(),
            Some(network) => self
                .deployments
                .iter()
                .find(|d| d.network.eq_ignore_ascii_case(network)),
        }
    }

    pub fn is_default_deployment(&self, deployment: &TokenDeployment) -> bool {
        self.deployments
            .first()
            .is_some_and(|d| d.network == deployment.network)
    }

    /// 浏览器中某地址的页面（代币浏览器页按持有人过滤）
    pub fn explorer_address_url(&self, address: &str) -> String {
        let base = self.explorer_url.trim_end_matches('/');
        match self.family {
            CoinFamily::Stablecoin => format!("{}?a={}", base, address),
            _ => format!("{}/address/{}", base, address),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_parse_is_case_insensitive() {
        assert_eq!("utxo".parse::<CoinFamily>().unwrap(), CoinFamily::Utxo);
        assert_eq!("EVM".parse::<CoinFamily>().unwrap(), CoinFamily::Evm);
        assert_eq!(" Privacy ".parse::<CoinFamily>().unwrap(), CoinFamily::Privacy);
        assert_eq!(
            "StableCoin".parse::<CoinFamily>().unwrap(),
            CoinFamily::Stablecoin
        );
    }

    #[test]
    fn test_family_parse_rejects_unknown_tag() {
        let err = "solana".parse::<CoinFamily>().unwrap_err();
        assert!(matches!(err, CoreError::UnknownFamily { ref tag } if tag == "solana"));
    }

    #[test]
    fn test_family_display_roundtrips_through_parse() {
        for family in CoinFamily::ALL {
            assert_eq!(family.to_string().parse::<CoinFamily>().unwrap(), family);
        }
    }

    #[test]
    fn test_deployment_lookup() {
        let coin = CoinMetadata {
            symbol: "USDC".into(),
            name: "USD Coin".into(),
            decimals: 6,
            family: CoinFamily::Stablecoin,
            explorer_url: "https://etherscan.io/token/0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48"
                .into(),
            nodes: vec![],
            chain_id: Some(1),
            address_rules: AddressRules::default(),
            deployments: vec![
                TokenDeployment {
                    network: "ethereum".into(),
                    chain_id: 1,
                    contract: "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48".into(),
                    fee_symbol: "ETH".into(),
                },
                TokenDeployment {
                    network: "polygon".into(),
                    chain_id: 137,
                    contract: "0x3c499c542cef5e3811e1192ce70d8cc03d5c3359".into(),
                    fee_symbol: "POL".into(),
                },
            ],
            default_fee: None,
        };

        assert_eq!(coin.deployment(None).unwrap().network, "ethereum");
        assert_eq!(coin.deployment(Some("Polygon")).unwrap().chain_id, 137);
        assert!(coin.deployment(Some("solana")).is_none());
        assert!(coin.is_default_deployment(coin.deployment(None).unwrap()));
        assert!(!coin.is_default_deployment(coin.deployment(Some("polygon")).unwrap()));
        assert_eq!(
            coin.explorer_address_url("0xabc"),
            "https://etherscan.io/token/0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48?a=0xabc"
        );
    }
}
