//! 余额 / 手续费 / 地址校验结果

use rust_decimal::Decimal;
use serde::Serialize;

use super::CoinFamily;

/// 余额查询结果
///
/// `amount` 为主余额（以币为单位，小数位不超过币种精度）。
/// 家族特有的次级数字放在 [`SecondaryBalances`] 中，缺失即为 None。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BalanceResult {
    pub symbol: String,
    pub family: CoinFamily,
    pub amount: Decimal,
    pub decimals: u32,
    pub secondary: SecondaryBalances,
}

/// 次级余额
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SecondaryBalances {
    /// 未确认（UTXO）
    pub unconfirmed: Option<Decimal>,
    /// 已解锁可花费（Privacy）
    pub unlocked: Option<Decimal>,
    /// 透明部分（带屏蔽池的 UTXO 币，如 PIVX）
    pub transparent: Option<Decimal>,
    /// 屏蔽部分
    pub shielded: Option<Decimal>,
}

impl BalanceResult {
    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    /// 按币种精度格式化（补齐尾零）
    pub fn display_amount(&self) -> String {
        format!("{:.*}", self.decimals as usize, self.amount)
    }
}

/// 手续费来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeeSource {
    /// 后端实时报价
    Backend,
    /// 币种表中的固定默认值
    FixedDefault,
    /// 委托给另一家族（代币手续费由所在 EVM 链支付）
    Delegated { family: CoinFamily },
}

/// 手续费估算
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeeEstimate {
    /// 被估算的币种
    pub symbol: String,
    /// 支付手续费的币种（代币为所在链的原生币）
    pub fee_symbol: String,
    pub amount: Decimal,
    pub source: FeeSource,
}

/// 地址校验结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddressValidity {
    pub valid: bool,
    /// 无效原因（有效时为 None）
    pub reason: Option<String>,
}

impl AddressValidity {
    pub fn valid() -> Self {
        Self {
            valid: true,
            reason: None,
        }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            reason: Some(reason.into()),
        }
    }
}

impl From<Result<(), String>> for AddressValidity {
    fn from(check: Result<(), String>) -> Self {
        match check {
            Ok(()) => AddressValidity::valid(),
            Err(reason) => AddressValidity::invalid(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_display_amount_pads_to_decimals() {
        let balance = BalanceResult {
            symbol: "BTC".into(),
            family: CoinFamily::Utxo,
            amount: Decimal::from_str("0.5").unwrap(),
            decimals: 8,
            secondary: SecondaryBalances::default(),
        };
        assert_eq!(balance.display_amount(), "0.50000000");
        assert!(!balance.is_zero());
    }

    #[test]
    fn test_validity_from_check() {
        assert!(AddressValidity::from(Ok(())).valid);
        let invalid = AddressValidity::from(Err("checksum mismatch".to_string()));
        assert!(!invalid.valid);
        assert_eq!(invalid.reason.as_deref(), Some("checksum mismatch"));
    }
}
