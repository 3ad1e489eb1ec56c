//! 查询选项
//!
//! UI 传入的是自由格式的键值对；分发器按家族整形为 [`FamilyOptions`]，
//! 未识别的键直接忽略。密钥类字段在 Drop 时清零，Debug 输出中脱敏。

use std::fmt;

use serde::Deserialize;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::CoinFamily;

/// 原始查询选项（camelCase 键：node / viewKey / spendKey / network）
#[derive(Clone, Default, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
pub struct QueryOptions {
    /// 节点覆盖
    #[serde(default)]
    pub node: Option<String>,
    /// 隐私币查看私钥
    #[serde(default, alias = "view_key")]
    pub view_key: Option<String>,
    /// 隐私币花费私钥（可选）
    #[serde(default, alias = "spend_key")]
    pub spend_key: Option<String>,
    /// 代币部署网络 (ethereum / polygon / arbitrum)
    #[serde(default)]
    pub network: Option<String>,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_node(mut self, node: impl Into<String>) -> Self {
        self.node = Some(node.into());
        self
    }

    pub fn with_view_key(mut self, key: impl Into<String>) -> Self {
        self.view_key = Some(key.into());
        self
    }

    pub fn with_spend_key(mut self, key: impl Into<String>) -> Self {
        self.spend_key = Some(key.into());
        self
    }

    pub fn with_network(mut self, network: impl Into<String>) -> Self {
        self.network = Some(network.into());
        self
    }

    /// 从键值对构建；未识别的键被忽略
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut options = Self::default();
        for (key, value) in pairs {
            match key.as_ref() {
                "node" => options.node = Some(value.into()),
                "viewKey" | "view_key" => options.view_key = Some(value.into()),
                "spendKey" | "spend_key" => options.spend_key = Some(value.into()),
                "network" => options.network = Some(value.into()),
                other => tracing::debug!(key = %other, "Ignoring unrecognized query option"),
            }
        }
        options
    }
}

impl fmt::Debug for QueryOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryOptions")
            .field("node", &self.node)
            .field("view_key", &self.view_key.as_ref().map(|_| "***"))
            .field("spend_key", &self.spend_key.as_ref().map(|_| "***"))
            .field("network", &self.network)
            .finish()
    }
}

/// 按家族整形后的选项
///
/// 只保留该家族认识的键，空白值视为缺失
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct FamilyOptions {
    #[zeroize(skip)]
    family: CoinFamily,
    node: Option<String>,
    view_key: Option<String>,
    spend_key: Option<String>,
    network: Option<String>,
}

impl FamilyOptions {
    pub fn shape(family: CoinFamily, options: &QueryOptions) -> Self {
        let present = |value: &Option<String>| {
            value
                .as_ref()
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let (view_key, spend_key) = match family {
            CoinFamily::Privacy => (present(&options.view_key), present(&options.spend_key)),
            _ => (None, None),
        };
        let network = match family {
            CoinFamily::Stablecoin => present(&options.network),
            _ => None,
        };

        Self {
            family,
            node: present(&options.node),
            view_key,
            spend_key,
            network,
        }
    }

    /// 不带任何选项
    pub fn none(family: CoinFamily) -> Self {
        Self {
            family,
            node: None,
            view_key: None,
            spend_key: None,
            network: None,
        }
    }

    pub fn family(&self) -> CoinFamily {
        self.family
    }

    pub fn node(&self) -> Option<&str> {
        self.node.as_deref()
    }

    pub fn view_key(&self) -> Option<&str> {
        self.view_key.as_deref()
    }

    pub fn spend_key(&self) -> Option<&str> {
        self.spend_key.as_deref()
    }

    pub fn network(&self) -> Option<&str> {
        self.network.as_deref()
    }
}

impl fmt::Debug for FamilyOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FamilyOptions")
            .field("family", &self.family)
            .field("node", &self.node)
            .field("view_key", &self.view_key.as_ref().map(|_| "***"))
            .field("spend_key", &self.spend_key.as_ref().map(|_| "***"))
            .field("network", &self.network)
            .finish()
    }
}
