//! UTXO 家族策略 (BTC, LTC, BCH, DOGE, DASH, PIVX)
//!
//! 地址编码由币种表声明：Base58Check 版本字节、SegWit hrp、CashAddr 前缀。
//! 手续费 = 后端费率 (sat/vB) × 典型交易大小。

use async_trait::async_trait;
use rust_decimal::Decimal;

use super::{base_args, preflight, resolve_node, FamilyStrategy};
use crate::{
    domain::{
        AddressValidity, BalanceResult, CoinFamily, CoinMetadata, FamilyOptions, FeeEstimate, FeeSource,
        SecondaryBalances, TransactionHistory,
    },
    error::{CoreError, InvocationError},
    infrastructure::{
        invocation::ExpectedShape,
        log_redact::redact_address,
        response_validator::{
            as_object, non_negative_number, optional_amount, required_amount, scaled_fee, transaction_records,
        },
        SecureInvocationBridge,
    },
    utils::address_validator::AddressValidator,
};

pub const CMD_GET_BALANCE: &str = "utxo_get_balance";
pub const CMD_GET_HISTORY: &str = "utxo_get_history";
pub const CMD_ESTIMATE_FEE: &str = "utxo_estimate_fee";

/// 典型交易大小（1 输入 2 输出的 P2WPKH/P2PKH 混合估算）
pub const TYPICAL_TX_VBYTES: u32 = 140;

/// 确认目标（区块数）
const FEE_TARGET_BLOCKS: u32 = 6;

pub struct UtxoStrategy {
    bridge: SecureInvocationBridge,
}

impl UtxoStrategy {
    pub fn new(bridge: SecureInvocationBridge) -> Self {
        Self { bridge }
    }

    fn invocation_error(&self, error: InvocationError) -> CoreError {
        CoreError::invocation(CoinFamily::Utxo, error)
    }
}

#[async_trait]
impl FamilyStrategy for UtxoStrategy {
    fn family(&self) -> CoinFamily {
        CoinFamily::Utxo
    }

    fn validate(&self, address: &str, coin: &CoinMetadata) -> AddressValidity {
        if address.is_empty() {
            return AddressValidity::invalid("address is empty");
        }
        let rules = &coin.address_rules;
        if let Err(reason) = AddressValidator::check_length(address, rules) {
            return AddressValidity::invalid(reason);
        }

        if let Some(prefix) = rules.cashaddr_prefix.as_deref() {
            if AddressValidator::looks_like_cashaddr(address, prefix) {
                return AddressValidator::validate_cashaddr(address, prefix).into();
            }
        }

        if let Some(hrp) = rules.bech32_hrp.as_deref() {
            if address.to_ascii_lowercase().starts_with(&format!("{}1", hrp)) {
                return AddressValidator::validate_segwit(address, hrp).into();
            }
        }

        AddressValidator::validate_base58check(address, &rules.base58_versions).into()
    }

    async fn get_balance(
        &self,
        address: &str,
        coin: &CoinMetadata,
        options: &FamilyOptions,
    ) -> Result<BalanceResult, CoreError> {
        preflight(self, address, coin, options)?;
        let node = resolve_node(coin, options)?;

        tracing::debug!(symbol = %coin.symbol, address = %redact_address(address), "Querying UTXO balance");

        let payload = self
            .bridge
            .invoke(
                CMD_GET_BALANCE,
                base_args(coin, node).with("address", address),
                ExpectedShape::Object(&["balance"]),
            )
            .await
            .map_err(|e| self.invocation_error(e))?;

        let (amount, secondary) =
            parse_balance(&payload, coin.decimals).map_err(|e| self.invocation_error(e))?;

        Ok(BalanceResult {
            symbol: coin.symbol.clone(),
            family: CoinFamily::Utxo,
            amount,
            decimals: coin.decimals,
            secondary,
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
                base_args(coin, node).with("address", address).with("limit", limit),
                ExpectedShape::Array,
            )
            .await
            .map_err(|e| self.invocation_error(e))?;

        let records =
            transaction_records(CMD_GET_HISTORY, &payload, coin.decimals).map_err(|e| self.invocation_error(e))?;
        Ok(TransactionHistory::new(&coin.symbol, records, limit))
    }

    async fn estimate_fee(&self, coin: &CoinMetadata, options: &FamilyOptions) -> Result<FeeEstimate, CoreError> {
        super::ensure_family(CoinFamily::Utxo, coin)?;
        let node = resolve_node(coin, options)?;

        let payload = self
            .bridge
            .invoke(
                CMD_ESTIMATE_FEE,
                base_args(coin, node).with("target_blocks", FEE_TARGET_BLOCKS),
                ExpectedShape::Number,
            )
            .await
            .map_err(|e| self.invocation_error(e))?;

        let sat_per_vbyte = non_negative_number(CMD_ESTIMATE_FEE, &payload).map_err(|e| self.invocation_error(e))?;
        let amount = scaled_fee(CMD_ESTIMATE_FEE, sat_per_vbyte, u64::from(TYPICAL_TX_VBYTES), coin.decimals)
            .map_err(|e| self.invocation_error(e))?
            .round_dp(coin.decimals);

        Ok(FeeEstimate {
            symbol: coin.symbol.clone(),
            fee_symbol: coin.symbol.clone(),
            amount: amount.normalize(),
            source: FeeSource::Backend,
        })
    }
}

fn parse_balance(payload: &serde_json::Value, decimals: u32) -> Result<(Decimal, SecondaryBalances), InvocationError> {
    let object = as_object(CMD_GET_BALANCE, payload)?;
    let amount = required_amount(CMD_GET_BALANCE, object, "balance", decimals)?;
    let secondary = SecondaryBalances {
        unconfirmed: optional_amount(CMD_GET_BALANCE, object, "unconfirmed", decimals)?,
        transparent: optional_amount(CMD_GET_BALANCE, object, "transparent", decimals)?,
        shielded: optional_amount(CMD_GET_BALANCE, object, "shielded", decimals)?,
        unlocked: None,
    };
    Ok((amount, secondary))
}
