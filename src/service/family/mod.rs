//! 家族策略
//!
//! 每个币种家族一个策略，实现同一个 [`FamilyStrategy`] 合约。
//! 分发器只负责找到策略；地址校验、选项检查、命令组装都在策略内完成。
//!
//! 所有操作的前置步骤相同（[`preflight`]）：
//! 1. 币种必须属于本家族
//! 2. 家族选项（凭证、网络）检查
//! 3. 地址校验
//!
//! 任何一步失败都不会触达调用边界。

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    domain::{
        coin_table::is_http_url, AddressValidity, BalanceResult, CoinFamily, CoinMetadata, FamilyOptions,
        FeeEstimate, TransactionHistory,
    },
    error::CoreError,
    infrastructure::{invocation::InvocationArgs, log_redact::redact_url, SecureInvocationBridge},
};

pub mod evm;
pub mod privacy;
pub mod stablecoin;
pub mod utxo;

pub use evm::EvmStrategy;
pub use privacy::PrivacyStrategy;
pub use stablecoin::StablecoinStrategy;
pub use utxo::UtxoStrategy;

/// 家族策略合约
#[async_trait]
pub trait FamilyStrategy: Send + Sync {
    /// 本策略处理的家族
    fn family(&self) -> CoinFamily;

    /// 纯格式校验，不访问网络
    fn validate(&self, address: &str, coin: &CoinMetadata) -> AddressValidity;

    /// 家族特有选项检查（默认无要求）
    fn check_options(&self, coin: &CoinMetadata, options: &FamilyOptions) -> Result<(), CoreError> {
        let _ = (coin, options);
        Ok(())
    }

    async fn get_balance(
        &self,
        address: &str,
        coin: &CoinMetadata,
        options: &FamilyOptions,
    ) -> Result<BalanceResult, CoreError>;

    /// `limit` 为已生效的条数；0 时不调用后端
    async fn get_transaction_history(
        &self,
        address: &str,
        coin: &CoinMetadata,
        options: &FamilyOptions,
        limit: usize,
    ) -> Result<TransactionHistory, CoreError>;

    async fn estimate_fee(&self, coin: &CoinMetadata, options: &FamilyOptions) -> Result<FeeEstimate, CoreError>;
}

/// 共享前置检查：家族归属 → 选项 → 地址
pub fn preflight<S: FamilyStrategy + ?Sized>(
    strategy: &S,
    address: &str,
    coin: &CoinMetadata,
    options: &FamilyOptions,
) -> Result<(), CoreError> {
    ensure_family(strategy.family(), coin)?;
    strategy.check_options(coin, options)?;
    ensure_address(strategy, address, coin)
}

pub fn ensure_family(family: CoinFamily, coin: &CoinMetadata) -> Result<(), CoreError> {
    if coin.family != family {
        return Err(CoreError::FamilyMismatch {
            symbol: coin.symbol.clone(),
            expected: family,
            actual: coin.family,
        });
    }
    Ok(())
}

pub fn ensure_address<S: FamilyStrategy + ?Sized>(
    strategy: &S,
    address: &str,
    coin: &CoinMetadata,
) -> Result<(), CoreError> {
    let validity = strategy.validate(address, coin);
    if validity.valid {
        return Ok(());
    }
    Err(CoreError::InvalidAddress {
        symbol: coin.symbol.clone(),
        reason: validity.reason.unwrap_or_else(|| "address rejected".to_string()),
    })
}

/// 选定节点：覆盖优先，否则使用币种默认节点
pub fn resolve_node(coin: &CoinMetadata, options: &FamilyOptions) -> Result<Option<String>, CoreError> {
    match options.node() {
        Some(node) if is_http_url(node) => {
            tracing::debug!(symbol = %coin.symbol, node = %redact_url(node), "Using node override");
            Ok(Some(node.to_string()))
        }
        Some(_) => Err(CoreError::InvalidOptions {
            option: "node",
            reason: "node override must be an http(s) URL".to_string(),
        }),
        None => Ok(coin.default_node().map(str::to_string)),
    }
}

/// 所有命令共享的参数
pub fn base_args(coin: &CoinMetadata, node: Option<String>) -> InvocationArgs {
    InvocationArgs::new()
        .with("symbol", coin.symbol.as_str())
        .with("decimals", coin.decimals)
        .with_opt("node", node)
}

/// 四个家族的策略集合
#[derive(Clone)]
pub struct FamilyStrategies {
    utxo: Arc<UtxoStrategy>,
    evm: Arc<EvmStrategy>,
    privacy: Arc<PrivacyStrategy>,
    stablecoin: Arc<StablecoinStrategy>,
}

impl FamilyStrategies {
    pub fn new(bridge: SecureInvocationBridge) -> Self {
        let evm = Arc::new(EvmStrategy::new(bridge.clone()));
        Self {
            utxo: Arc::new(UtxoStrategy::new(bridge.clone())),
            privacy: Arc::new(PrivacyStrategy::new(bridge.clone())),
            stablecoin: Arc::new(StablecoinStrategy::new(bridge, Arc::clone(&evm))),
            evm,
        }
    }

    /// 按家族取策略（穷尽匹配，新增家族时编译期提示）
    pub fn get(&self, family: CoinFamily) -> Arc<dyn FamilyStrategy> {
        match family {
            CoinFamily::Utxo => self.utxo.clone(),
            CoinFamily::Evm => self.evm.clone(),
            CoinFamily::Privacy => self.privacy.clone(),
            CoinFamily::Stablecoin => self.stablecoin.clone(),
        }
    }

    /// 隐私币策略（带凭证的地址校验）
    pub fn privacy(&self) -> &PrivacyStrategy {
        &self.privacy
    }
}
