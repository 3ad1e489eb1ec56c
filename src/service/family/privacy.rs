//! 隐私币家族策略 (XMR)
//!
//! 余额与历史需要查看私钥（viewKey）；花费私钥（spendKey）可选。
//! 两者都必须是 64 位十六进制，格式错误在本地拒绝，不会触达调用边界。
//! 密钥只以 secret 参数形式进入单次调用，调用结束即清零。
//!
//! 手续费没有查询命令，使用币种表中的固定默认值。

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
        response_validator::{as_object, required_amount, transaction_records},
        SecureInvocationBridge,
    },
    utils::address_validator::AddressValidator,
};

pub const CMD_GET_BALANCE: &str = "privacy_get_balance";
pub const CMD_GET_HISTORY: &str = "privacy_get_history";

pub const VIEW_KEY: &str = "viewKey";
pub const SPEND_KEY: &str = "spendKey";

pub struct PrivacyStrategy {
    bridge: SecureInvocationBridge,
}

impl PrivacyStrategy {
    pub fn new(bridge: SecureInvocationBridge) -> Self {
        Self { bridge }
    }

    /// 带凭证的地址校验
    ///
    /// 地址无效时返回 `Ok(invalid)`；地址有效但提供的密钥格式错误时返回
    /// `InvalidCredential`，与地址错误区分开。
    pub fn validate_with_keys(
        &self,
        address: &str,
        coin: &CoinMetadata,
        options: &FamilyOptions,
    ) -> Result<AddressValidity, CoreError> {
        let validity = self.validate(address, coin);
        if !validity.valid {
            return Ok(validity);
        }
        check_key_format(coin, VIEW_KEY, options.view_key())?;
        check_key_format(coin, SPEND_KEY, options.spend_key())?;
        Ok(validity)
    }

    /// 附加密钥参数（secret，调用后清零）
    fn with_keys(args: InvocationArgs, options: &FamilyOptions) -> InvocationArgs {
        let args = match options.view_key() {
            Some(key) => args.with_secret(VIEW_KEY, key),
            None => args,
        };
        match options.spend_key() {
            Some(key) => args.with_secret(SPEND_KEY, key),
            None => args,
        }
    }

    fn invocation_error(&self, error: InvocationError) -> CoreError {
        CoreError::invocation(CoinFamily::Privacy, error)
    }
}

fn check_key_format(coin: &CoinMetadata, credential: &'static str, key: Option<&str>) -> Result<(), CoreError> {
    match key {
        Some(key) if !AddressValidator::is_hex_key(key) => Err(CoreError::InvalidCredential {
            symbol: coin.symbol.clone(),
            credential,
            reason: "expected 64 hexadecimal characters".to_string(),
        }),
        _ => Ok(()),
    }
}

#[async_trait]
impl FamilyStrategy for PrivacyStrategy {
    fn family(&self) -> CoinFamily {
        CoinFamily::Privacy
    }

    fn validate(&self, address: &str, coin: &CoinMetadata) -> AddressValidity {
        if address.is_empty() {
            return AddressValidity::invalid("address is empty");
        }
        AddressValidator::validate_monero_address(address, &coin.address_rules).into()
    }

    fn check_options(&self, coin: &CoinMetadata, options: &FamilyOptions) -> Result<(), CoreError> {
        if options.view_key().is_none() {
            return Err(CoreError::MissingCredential {
                symbol: coin.symbol.clone(),
                credential: VIEW_KEY,
            });
        }
        check_key_format(coin, VIEW_KEY, options.view_key())?;
        check_key_format(coin, SPEND_KEY, options.spend_key())
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
            address = %redact_address(address),
            with_spend_key = options.spend_key().is_some(),
            "Querying privacy balance"
        );

        let args = Self::with_keys(base_args(coin, node).with("address", address), options);
        let payload = self
            .bridge
            .invoke(CMD_GET_BALANCE, args, ExpectedShape::Object(&["balance", "unlocked_balance"]))
            .await
            .map_err(|e| self.invocation_error(e))?;

        let (amount, unlocked) = parse_balance(&payload, coin.decimals).map_err(|e| self.invocation_error(e))?;

        Ok(BalanceResult {
            symbol: coin.symbol.clone(),
            family: CoinFamily::Privacy,
            amount,
            decimals: coin.decimals,
            secondary: SecondaryBalances {
                unlocked: Some(unlocked),
                ..SecondaryBalances::default()
            },
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

        let args = Self::with_keys(
            base_args(coin, node).with("address", address).with("limit", limit),
            options,
        );
        let payload = self
            .bridge
            .invoke(CMD_GET_HISTORY, args, ExpectedShape::Array)
            .await
            .map_err(|e| self.invocation_error(e))?;

        let records =
            transaction_records(CMD_GET_HISTORY, &payload, coin.decimals).map_err(|e| self.invocation_error(e))?;
        Ok(TransactionHistory::new(&coin.symbol, records, limit))
    }

    async fn estimate_fee(&self, coin: &CoinMetadata, _options: &FamilyOptions) -> Result<FeeEstimate, CoreError> {
        ensure_family(CoinFamily::Privacy, coin)?;
        // 注册表保证隐私币带有 default_fee
        let amount = coin.default_fee.unwrap_or(Decimal::ZERO);

        Ok(FeeEstimate {
            symbol: coin.symbol.clone(),
            fee_symbol: coin.symbol.clone(),
            amount,
            source: FeeSource::FixedDefault,
        })
    }
}

/// 余额与已解锁余额；已解锁部分不能超过总额
fn parse_balance(payload: &serde_json::Value, decimals: u32) -> Result<(Decimal, Decimal), InvocationError> {
    let object = as_object(CMD_GET_BALANCE, payload)?;
    let balance = required_amount(CMD_GET_BALANCE, object, "balance", decimals)?;
    let unlocked = required_amount(CMD_GET_BALANCE, object, "unlocked_balance", decimals)?;
    if unlocked > balance {
        return Err(InvocationError::field_mismatch(
            CMD_GET_BALANCE,
            "unlocked_balance",
            format!("at most the total balance {}", balance),
            unlocked.to_string(),
        ));
    }
    Ok((balance, unlocked))
}
