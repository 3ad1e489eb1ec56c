//! 代币家族策略 (USDT, USDC, DAI, EURC, PAXG, XAUT)
//!
//! 代币部署在一条或多条 EVM 链上，`network` 选项选择部署，缺省为币种表中的第一个。
//! 持有人地址按 EVM 规则校验，且不能是本代币任一部署的合约地址。
//! 手续费委托给 EVM 策略：目标链 gas 价格 × 代币转账 gas 用量，以该链原生币计价。

use std::sync::Arc;

use async_trait::async_trait;

use super::{ensure_family, preflight, resolve_node, EvmStrategy, FamilyStrategy};
use crate::{
    domain::{
        AddressValidity, BalanceResult, CoinFamily, CoinMetadata, FamilyOptions, FeeEstimate, FeeSource,
        SecondaryBalances, TokenDeployment, TransactionHistory,
    },
    error::{CoreError, InvocationError},
    infrastructure::{
        invocation::{ExpectedShape, InvocationArgs},
        log_redact::redact_address,
        response_validator::{as_object, required_amount, transaction_records},
        SecureInvocationBridge,
    },
    utils::address_validator::AddressValidator,
};

pub const CMD_GET_BALANCE: &str = "token_get_balance";
pub const CMD_GET_HISTORY: &str = "token_get_history";

/// ERC-20 transfer 的 gas 用量
pub const TOKEN_TRANSFER_GAS: u64 = 65_000;

pub struct StablecoinStrategy {
    bridge: SecureInvocationBridge,
    evm: Arc<EvmStrategy>,
}

impl StablecoinStrategy {
    pub fn new(bridge: SecureInvocationBridge, evm: Arc<EvmStrategy>) -> Self {
        Self { bridge, evm }
    }

    fn select_deployment<'a>(
        &self,
        coin: &'a CoinMetadata,
        options: &FamilyOptions,
    ) -> Result<&'a TokenDeployment, CoreError> {
        coin.deployment(options.network())
            .ok_or_else(|| CoreError::UnsupportedNetwork {
                symbol: coin.symbol.clone(),
                network: options.network().unwrap_or_default().to_string(),
            })
    }

    /// 节点覆盖优先；币种默认节点只服务默认部署所在的链
    fn select_node(
        &self,
        coin: &CoinMetadata,
        deployment: &TokenDeployment,
        options: &FamilyOptions,
    ) -> Result<Option<String>, CoreError> {
        let node = resolve_node(coin, options)?;
        if options.node().is_some() || coin.is_default_deployment(deployment) {
            Ok(node)
        } else {
            Ok(None)
        }
    }

    fn token_args(
        coin: &CoinMetadata,
        deployment: &TokenDeployment,
        node: Option<String>,
        address: &str,
    ) -> InvocationArgs {
        InvocationArgs::new()
            .with("symbol", coin.symbol.as_str())
            .with("decimals", coin.decimals)
            .with("address", address)
            .with("contract", deployment.contract.as_str())
            .with("chainId", deployment.chain_id)
            .with("network", deployment.network.as_str())
            .with_opt("node", node)
    }

    fn invocation_error(&self, error: InvocationError) -> CoreError {
        CoreError::invocation(CoinFamily::Stablecoin, error)
    }
}

#[async_trait]
impl FamilyStrategy for StablecoinStrategy {
    fn family(&self) -> CoinFamily {
        CoinFamily::Stablecoin
    }

    fn validate(&self, address: &str, coin: &CoinMetadata) -> AddressValidity {
        if let Err(reason) = AddressValidator::validate_evm_address(address) {
            return AddressValidity::invalid(reason);
        }
        let is_contract = coin
            .deployments
            .iter()
            .any(|d| d.contract.eq_ignore_ascii_case(address));
        if is_contract {
            return AddressValidity::invalid(format!("{} is the {} token contract", address, coin.symbol));
        }
        AddressValidity::valid()
    }

    fn check_options(&self, coin: &CoinMetadata, options: &FamilyOptions) -> Result<(), CoreError> {
        self.select_deployment(coin, options).map(|_| ())
    }

    async fn get_balance(
        &self,
        address: &str,
        coin: &CoinMetadata,
        options: &FamilyOptions,
    ) -> Result<BalanceResult, CoreError> {
        preflight(self, address, coin, options)?;
        let deployment = self.select_deployment(coin, options)?;
        let node = self.select_node(coin, deployment, options)?;

        tracing::debug!(
            symbol = %coin.symbol,
            network = %deployment.network,
            address = %redact_address(address),
            "Querying token balance"
        );

        let payload = self
            .bridge
            .invoke(
                CMD_GET_BALANCE,
                Self::token_args(coin, deployment, node, address),
                ExpectedShape::Object(&["balance"]),
            )
            .await
            .map_err(|e| self.invocation_error(e))?;

        let amount = as_object(CMD_GET_BALANCE, &payload)
            .and_then(|object| required_amount(CMD_GET_BALANCE, object, "balance", coin.decimals))
            .map_err(|e| self.invocation_error(e))?;

        Ok(BalanceResult {
            symbol: coin.symbol.clone(),
            family: CoinFamily::Stablecoin,
            amount,
            decimals: coin.decimals,
            secondary: SecondaryBalances::default(),
        })
    }

    async fn get_transaction_history(
        &self,
        address: &str,
        coin: &CoinMetadata,
        options: &FamilyOptions,
        limit: usize,
    ) -> Result<TransactionHistory, CoreError> {
        preflight(self, address, coin, options)?;
        if limit == 0 {
            return Ok(TransactionHistory::empty(&coin.symbol));
        }
        let deployment = self.select_deployment(coin, options)?;
        let node = self.select_node(coin, deployment, options)?;

        let payload = self
            .bridge
            .invoke(
                CMD_GET_HISTORY,
                Self::token_args(coin, deployment, node, address).with("limit", limit),
                ExpectedShape::Array,
            )
            .await
            .map_err(|e| self.invocation_error(e))?;

        let records =
            transaction_records(CMD_GET_HISTORY, &payload, coin.decimals).map_err(|e| self.invocation_error(e))?;
        Ok(TransactionHistory::new(&coin.symbol, records, limit))
    }

    async fn estimate_fee(&self, coin: &CoinMetadata, options: &FamilyOptions) -> Result<FeeEstimate, CoreError> {
        ensure_family(CoinFamily::Stablecoin, coin)?;
        let deployment = self.select_deployment(coin, options)?;
        let node = self.select_node(coin, deployment, options)?;

        tracing::debug!(
            symbol = %coin.symbol,
            network = %deployment.network,
            chain_id = deployment.chain_id,
            "Delegating token fee estimate to EVM gas price"
        );

        let amount = self
            .evm
            .gas_fee(deployment.chain_id, node, TOKEN_TRANSFER_GAS)
            .await
            .map_err(|e| self.invocation_error(e))?;

        Ok(FeeEstimate {
            symbol: coin.symbol.clone(),
            fee_symbol: deployment.fee_symbol.clone(),
            amount,
            source: FeeSource::Delegated {
                family: CoinFamily::Evm,
            },
        })
    }
}
