//! 家族分发器
//!
//! 对外的唯一入口。符号只在这里解析一次：
//! 符号 → 注册表元数据 → 家族 → 策略，随后把按家族整形的选项交给策略。
//! 分发结果只取决于 (符号, 注册表)，不依赖调用历史。

use std::sync::Arc;

use futures::future::join_all;
use serde::Deserialize;
use tracing::Instrument;

use super::family::{FamilyStrategies, FamilyStrategy};
use crate::{
    config::HistoryConfig,
    domain::{
        AddressValidity, BalanceResult, CoinFamily, CoinMetadata, CoinRegistry, FamilyOptions, FeeEstimate,
        QueryOptions, TransactionHistory,
    },
    error::CoreError,
    infrastructure::{invocation::CommandSurface, log_redact::redact_address, SecureInvocationBridge},
    metrics,
};

/// 批量余额查询中的一项
#[derive(Debug, Clone, Deserialize)]
pub struct BalanceRequest {
    pub symbol: String,
    pub address: String,
    #[serde(default)]
    pub options: QueryOptions,
}

impl BalanceRequest {
    pub fn new(symbol: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            address: address.into(),
            options: QueryOptions::default(),
        }
    }

    pub fn with_options(mut self, options: QueryOptions) -> Self {
        self.options = options;
        self
    }
}

/// 批量查询中单项的结果（与请求一一对应、顺序一致）
#[derive(Debug, Clone)]
pub struct BalanceOutcome {
    pub symbol: String,
    pub address: String,
    pub result: Result<BalanceResult, CoreError>,
}

pub struct Dispatcher {
    registry: Arc<CoinRegistry>,
    strategies: FamilyStrategies,
    history: HistoryConfig,
}

impl Dispatcher {
    pub fn new(registry: Arc<CoinRegistry>, surface: Arc<dyn CommandSurface>) -> Self {
        Self {
            registry,
            strategies: FamilyStrategies::new(SecureInvocationBridge::new(surface)),
            history: HistoryConfig::default(),
        }
    }

    pub fn with_history_config(mut self, history: HistoryConfig) -> Self {
        self.history = history;
        self
    }

    pub fn registry(&self) -> &CoinRegistry {
        &self.registry
    }

    pub fn get_coin_info(&self, symbol: &str) -> Result<&CoinMetadata, CoreError> {
        self.resolve(symbol)
    }

    /// 地址格式校验
    ///
    /// 只有符号无法解析时返回错误；格式错误的地址返回 `Ok(false)`
    pub fn validate_address(&self, symbol: &str, address: &str) -> Result<bool, CoreError> {
        self.validate_address_detailed(symbol, address)
            .map(|validity| validity.valid)
    }

    /// 带原因的地址校验（供 UI 展示）
    pub fn validate_address_detailed(&self, symbol: &str, address: &str) -> Result<AddressValidity, CoreError> {
        let coin = self.resolve(symbol)?;
        Ok(self.strategies.get(coin.family).validate(address, coin))
    }

    /// 地址与随附凭证一起校验
    ///
    /// 隐私币：地址有效但密钥格式错误时返回 `InvalidCredential`。其他家族忽略凭证。
    pub fn validate_address_with_options(
        &self,
        symbol: &str,
        address: &str,
        options: &QueryOptions,
    ) -> Result<AddressValidity, CoreError> {
        let coin = self.resolve(symbol)?;
        match coin.family {
            CoinFamily::Privacy => {
                let shaped = FamilyOptions::shape(coin.family, options);
                self.strategies
                    .privacy()
                    .validate_with_keys(address, coin, &shaped)
                    .inspect_err(|e| metrics::count_rejection(e.code()))
            }
            family => Ok(self.strategies.get(family).validate(address, coin)),
        }
    }

    pub async fn get_balance(
        &self,
        symbol: &str,
        address: &str,
        options: &QueryOptions,
    ) -> Result<BalanceResult, CoreError> {
        let coin = self.resolve(symbol)?;
        let shaped = FamilyOptions::shape(coin.family, options);
        let span = tracing::info_span!(
            "get_balance",
            symbol = %coin.symbol,
            family = %coin.family,
            address = %redact_address(address)
        );

        let result = self
            .strategies
            .get(coin.family)
            .get_balance(address, coin, &shaped)
            .instrument(span)
            .await;
        self.record(symbol, "get_balance", result)
    }

    /// 交易历史，新的在前
    ///
    /// `limit` 缺省取配置的默认条数，超过上限时截断；0 返回空列表且不调用后端
    pub async fn get_transaction_history(
        &self,
        symbol: &str,
        address: &str,
        options: &QueryOptions,
        limit: Option<usize>,
    ) -> Result<TransactionHistory, CoreError> {
        let coin = self.resolve(symbol)?;
        let shaped = FamilyOptions::shape(coin.family, options);
        let limit = self.history.effective_limit(limit);
        let span = tracing::info_span!(
            "get_transaction_history",
            symbol = %coin.symbol,
            family = %coin.family,
            address = %redact_address(address),
            limit
        );

        let result = self
            .strategies
            .get(coin.family)
            .get_transaction_history(address, coin, &shaped, limit)
            .instrument(span)
            .await;
        self.record(symbol, "get_transaction_history", result)
    }

    pub async fn estimate_fee(&self, symbol: &str, options: &QueryOptions) -> Result<FeeEstimate, CoreError> {
        let coin = self.resolve(symbol)?;
        let shaped = FamilyOptions::shape(coin.family, options);
        let span = tracing::info_span!("estimate_fee", symbol = %coin.symbol, family = %coin.family);

        let result = self
            .strategies
            .get(coin.family)
            .estimate_fee(coin, &shaped)
            .instrument(span)
            .await;
        self.record(symbol, "estimate_fee", result)
    }

    /// 并发查询多个余额，每项独立成败，不去重
    pub async fn get_balances_batch(&self, requests: Vec<BalanceRequest>) -> Vec<BalanceOutcome> {
        tracing::debug!(count = requests.len(), "Dispatching balance batch");

        let futures = requests.into_iter().map(|request| async move {
            let result = self
                .get_balance(&request.symbol, &request.address, &request.options)
                .await;
            BalanceOutcome {
                symbol: request.symbol.clone(),
                address: request.address.clone(),
                result,
            }
        });

        join_all(futures).await
    }

    /// 按家族标签取策略（大小写不敏感）
    pub fn get_family_functions(&self, family: &str) -> Result<Arc<dyn FamilyStrategy>, CoreError> {
        let family = family.parse::<CoinFamily>().inspect_err(|e| metrics::count_rejection(e.code()))?;
        Ok(self.strategies.get(family))
    }

    pub fn strategy(&self, family: CoinFamily) -> Arc<dyn FamilyStrategy> {
        self.strategies.get(family)
    }

    /// 某家族的币种，按注册顺序
    pub fn list_by_family(&self, family: &str) -> Result<Vec<&CoinMetadata>, CoreError> {
        let family = family.parse::<CoinFamily>()?;
        Ok(self.registry.list_by_family(family))
    }

    pub fn supported_coins(&self) -> &[CoinMetadata] {
        self.registry.list_all()
    }

    fn resolve(&self, symbol: &str) -> Result<&CoinMetadata, CoreError> {
        self.registry.lookup(symbol).inspect_err(|e| {
            metrics::count_rejection(e.code());
            tracing::debug!(symbol = %symbol, "Rejected unknown coin symbol");
        })
    }

    /// 统计本地校验拒绝，记录调用边界失败
    fn record<T>(&self, symbol: &str, operation: &'static str, result: Result<T, CoreError>) -> Result<T, CoreError> {
        if let Err(e) = &result {
            if e.is_invocation_failure() {
                tracing::warn!(symbol = %symbol, operation, code = e.code(), error = %e, "Backend query failed");
            } else {
                metrics::count_rejection(e.code());
                tracing::debug!(symbol = %symbol, operation, code = e.code(), "Request rejected before invocation");
            }
        }
        result
    }
}
