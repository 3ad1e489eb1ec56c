//! EVM 家族策略 (ETH, ETC, AVAX)
//!
//! 地址：0x + 40 位十六进制，混合大小写时校验 EIP-55。
//! 手续费 = gas 价格 (gwei) × 21 000 gas。

use async_trait::async_trait;
use rust_decimal::Decimal;

use super::{base_args, ensure_family, preflight, resolve_node, FamilyStrategy};
use crate::{
    domain::{
        AddressValidity, BalanceResult, CoinFamily, CoinMetadata, FamilyOptions, FeeEstimate, FeeSource,
        SecondaryBalances, TransactionHistory,
    },
    error::{CoreError, InvocationError},
    infrastructure::{
        invocation::{ExpectedShape, InvocationArgs},
        log_redact::redact_address,
        response_validator::{as_object, non_negative_number, required_amount, scaled_fee, transaction_records},
        SecureInvocationBridge,
    },
    utils::address_validator::AddressValidator,
};

pub const CMD_GET_BALANCE: &str = "evm_get_balance";
pub const CMD_GET_HISTORY: &str = "evm_get_history";
pub const CMD_GAS_PRICE: &str = "evm_gas_price";

/// 原生币转账的 gas 用量
pub const NATIVE_TRANSFER_GAS: u64 = 21_000;

/// gwei → 原生币（18 位精度）
const GWEI_SCALE: u32 = 9;

pub struct EvmStrategy {
    bridge: SecureInvocationBridge,
}

impl EvmStrategy {
    pub fn new(bridge: SecureInvocationBridge) -> Self {
        Self { bridge }
    }

    /// 查询某条链的 gas 价格并换算为 `gas_limit` 的手续费
    ///
    /// 代币策略复用此方法；错误由调用方标注来源家族。
    pub(crate) async fn gas_fee(
        &self,
        chain_id: u64,
        node: Option<String>,
        gas_limit: u64,
    ) -> Result<Decimal, InvocationError> {
        let args = InvocationArgs::new()
            .with("chainId", chain_id)
            .with_opt("node", node);

        let payload = self.bridge.invoke(CMD_GAS_PRICE, args, ExpectedShape::Number).await?;
        let gwei = non_negative_number(CMD_GAS_PRICE, &payload)?;

        Ok(scaled_fee(CMD_GAS_PRICE, gwei, gas_limit, GWEI_SCALE)?.normalize())
    }

    fn invocation_error(&self, error: InvocationError) -> CoreError {
        CoreError::invocation(CoinFamily::Evm, error)
    }
}

#[async_trait]
impl FamilyStrategy for EvmStrategy {
    fn family(&self) -> CoinFamily {
        CoinFamily::Evm
    }

    fn validate(&self, address: &str, _coin: &CoinMetadata) -> AddressValidity {
        AddressValidator::validate_evm_address(address).into()
    }

    async fn get_balance(
        &self,
        address: &str,
        coin: &CoinMetadata,
        options: &FamilyOptions,
    ) -> Result<BalanceResult, CoreError> {
        preflight(self, address, coin, options)?;
        let node = resolve_node(coin, options)?;

        tracing::debug!(
            symbol = %coin.symbol,
            chain_id = ?coin.chain_id,
            address = %redact_address(address),
            "Querying EVM balance"
        );

        let payload = self
            .bridge
            .invoke(
                CMD_GET_BALANCE,
                base_args(coin, node)
                    .with("address", address)
                    .with_opt("chainId", coin.chain_id),
                ExpectedShape::Object(&["balance"]),
            )
            .await
            .map_err(|e| self.invocation_error(e))?;

        let amount = as_object(CMD_GET_BALANCE, &payload)
            .and_then(|object| required_amount(CMD_GET_BALANCE, object, "balance", coin.decimals))
            .map_err(|e| self.invocation_error(e))?;

        Ok(BalanceResult {
            symbol: coin.symbol.clone(),
            family: CoinFamily::Evm,
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
        let node = resolve_node(coin, options)?;

        let payload = self
            .bridge
            .invoke(
                CMD_GET_HISTORY,
                base_args(coin, node)
                    .with("address", address)
                    .with_opt("chainId", coin.chain_id)
                    .with("limit", limit),
                ExpectedShape::Array,
            )
            .await
            .map_err(|e| self.invocation_error(e))?;

        let records =
            transaction_records(CMD_GET_HISTORY, &payload, coin.decimals).map_err(|e| self.invocation_error(e))?;
        Ok(TransactionHistory::new(&coin.symbol, records, limit))
    }

    async fn estimate_fee(&self, coin: &CoinMetadata, options: &FamilyOptions) -> Result<FeeEstimate, CoreError> {
        ensure_family(CoinFamily::Evm, coin)?;
        let node = resolve_node(coin, options)?;
        let chain_id = coin.chain_id.unwrap_or_default();

        let amount = self
            .gas_fee(chain_id, node, NATIVE_TRANSFER_GAS)
            .await
            .map_err(|e| self.invocation_error(e))?;

        Ok(FeeEstimate {
            symbol: coin.symbol.clone(),
            fee_symbol: coin.symbol.clone(),
            amount: amount.round_dp(coin.decimals),
            source: FeeSource::Backend,
        })
    }
}
