// 响应负载校验 - 防止后端数据污染

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{Map, Value};

use super::invocation::shape_of;
use crate::{
    domain::{Direction, TransactionRecord},
    error::InvocationError,
};

/// 交易记录必需字段
const TRANSACTION_FIELDS: [&str; 4] = ["tx_hash", "direction", "amount", "timestamp"];

/// 解析金额：字符串或数值，不接受负数，小数位不超过币种精度
pub fn parse_amount(command: &str, field: &str, value: &Value, decimals: u32) -> Result<Decimal, InvocationError> {
    let amount = match value {
        Value::String(s) => parse_decimal_str(s.trim()),
        Value::Number(n) => parse_decimal_str(&n.to_string()),
        other => {
            return Err(InvocationError::field_mismatch(
                command,
                field,
                "decimal string or number",
                shape_of(other),
            ))
        }
    }
    .ok_or_else(|| {
        InvocationError::field_mismatch(command, field, "decimal amount", format!("unparsable value {}", value))
    })?;

    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(InvocationError::field_mismatch(
            command,
            field,
            "non-negative amount",
            format!("negative amount {}", amount),
        ));
    }

    let amount = amount.normalize();
    if amount.scale() > decimals {
        return Err(InvocationError::field_mismatch(
            command,
            field,
            format!("at most {} fractional digits", decimals),
            format!("{} fractional digits", amount.scale()),
        ));
    }

    Ok(amount)
}

fn parse_decimal_str(s: &str) -> Option<Decimal> {
    if s.is_empty() {
        return None;
    }
    Decimal::from_str_exact(s)
        .ok()
        .or_else(|| Decimal::from_scientific(s).ok())
}

/// 对象中的必需金额字段
pub fn required_amount(
    command: &str,
    payload: &Map<String, Value>,
    field: &str,
    decimals: u32,
) -> Result<Decimal, InvocationError> {
    match payload.get(field) {
        Some(value) if !value.is_null() => parse_amount(command, field, value, decimals),
        _ => Err(InvocationError::MissingField {
            command: command.to_string(),
            field: field.to_string(),
        }),
    }
}

/// 对象中的可选金额字段（缺失或 null 返回 None）
pub fn optional_amount(
    command: &str,
    payload: &Map<String, Value>,
    field: &str,
    decimals: u32,
) -> Result<Option<Decimal>, InvocationError> {
    match payload.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => parse_amount(command, field, value, decimals).map(Some),
    }
}

/// 已校验形状为 Object 的负载
pub fn as_object<'a>(command: &str, payload: &'a Value) -> Result<&'a Map<String, Value>, InvocationError> {
    payload.as_object().ok_or_else(|| InvocationError::ShapeMismatch {
        command: command.to_string(),
        field: None,
        expected: "object".to_string(),
        actual: shape_of(payload).to_string(),
    })
}

/// 数值负载（费率、gas 价格），不接受负数
pub fn non_negative_number(command: &str, payload: &Value) -> Result<Decimal, InvocationError> {
    let rate = match payload {
        Value::Number(n) => parse_decimal_str(&n.to_string()),
        _ => None,
    }
    .ok_or_else(|| InvocationError::ShapeMismatch {
        command: command.to_string(),
        field: None,
        expected: "number".to_string(),
        actual: shape_of(payload).to_string(),
    })?;

    if rate.is_sign_negative() && !rate.is_zero() {
        return Err(InvocationError::ShapeMismatch {
            command: command.to_string(),
            field: None,
            expected: "non-negative number".to_string(),
            actual: format!("negative number {}", rate),
        });
    }
    Ok(rate)
}

/// 费率 × 用量 × 10^-scale，溢出视为形状错误
pub fn scaled_fee(command: &str, rate: Decimal, units: u64, scale: u32) -> Result<Decimal, InvocationError> {
    let unit = Decimal::try_new(1, scale).ok();
    rate
        .checked_mul(Decimal::from(units))
        .zip(unit)
        .and_then(|(total, unit)| total.checked_mul(unit))
        .ok_or_else(|| InvocationError::ShapeMismatch {
            command: command.to_string(),
            field: None,
            expected: "fee within decimal range".to_string(),
            actual: format!("{} x {} overflows", rate, units),
        })
}

#[derive(Debug, Deserialize)]
struct WireTransaction {
    #[serde(alias = "txid", alias = "hash")]
    tx_hash: String,
    direction: Direction,
    #[serde(default)]
    confirmations: u64,
    timestamp: i64,
    #[serde(default)]
    block_height: Option<u64>,
    #[serde(default, alias = "from")]
    from_address: Option<String>,
    #[serde(default, alias = "to")]
    to_address: Option<String>,
}

/// 解析交易列表负载
pub fn transaction_records(
    command: &str,
    payload: &Value,
    decimals: u32,
) -> Result<Vec<TransactionRecord>, InvocationError> {
    let items = payload.as_array().ok_or_else(|| InvocationError::ShapeMismatch {
        command: command.to_string(),
        field: None,
        expected: "array".to_string(),
        actual: shape_of(payload).to_string(),
    })?;

    items
        .iter()
        .enumerate()
        .map(|(index, item)| transaction_record(command, index, item, decimals))
        .collect()
}

fn transaction_record(
    command: &str,
    index: usize,
    item: &Value,
    decimals: u32,
) -> Result<TransactionRecord, InvocationError> {
    let path = |field: &str| format!("[{}].{}", index, field);

    let object = item
        .as_object()
        .ok_or_else(|| InvocationError::field_mismatch(command, format!("[{}]", index), "object", shape_of(item)))?;

    for field in TRANSACTION_FIELDS {
        let present = object
            .get(field)
            .or_else(|| match field {
                "tx_hash" => object.get("txid").or_else(|| object.get("hash")),
                _ => None,
            })
            .is_some_and(|v| !v.is_null());
        if !present {
            return Err(InvocationError::MissingField {
                command: command.to_string(),
                field: path(field),
            });
        }
    }

    let amount = parse_amount(command, &path("amount"), &object["amount"], decimals)?;

    let wire: WireTransaction = serde_json::from_value(item.clone()).map_err(|e| {
        InvocationError::field_mismatch(command, format!("[{}]", index), "transaction record", e.to_string())
    })?;

    let timestamp: DateTime<Utc> = DateTime::from_timestamp(wire.timestamp, 0).ok_or_else(|| {
        InvocationError::field_mismatch(
            command,
            path("timestamp"),
            "unix timestamp in seconds",
            format!("out-of-range value {}", wire.timestamp),
        )
    })?;

    Ok(TransactionRecord {
        tx_hash: wire.tx_hash,
        direction: wire.direction,
        amount,
        confirmations: wire.confirmations,
        timestamp,
        block_height: wire.block_height,
        from_address: wire.from_address,
        to_address: wire.to_address,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_parse_amount_accepts_strings_and_numbers() {
        assert_eq!(parse_amount("c", "balance", &json!("0.00012345"), 8).unwrap().to_string(), "0.00012345");
        assert_eq!(parse_amount("c", "balance", &json!(1.5), 8).unwrap().to_string(), "1.5");
        assert_eq!(parse_amount("c", "balance", &json!(0), 8).unwrap(), Decimal::ZERO);
        assert_eq!(parse_amount("c", "balance", &json!("1e-3"), 8).unwrap().to_string(), "0.001");
        // 尾零不计入精度
        assert!(parse_amount("c", "balance", &json!("1.50000000000"), 8).is_ok());
    }

    #[test]
    fn test_parse_amount_rejects_bad_values() {
        for value in [
            json!("-1"),
            json!(-0.5),
            json!("abc"),
            json!(""),
            json!([1]),
            json!(true),
            json!("NaN"),
            json!("0.000000000000000000000000000000001"),
        ] {
            let err = parse_amount("c", "balance", &value, 8).unwrap_err();
            assert!(
                matches!(err, InvocationError::ShapeMismatch { ref field, .. } if field.as_deref() == Some("balance")),
                "value {} gave {:?}",
                value,
                err
            );
        }
    }

    #[test]
    fn test_scaled_fee_overflow_is_shape_mismatch() {
        assert_eq!(scaled_fee("c", Decimal::from(10), 140, 8).unwrap().normalize().to_string(), "0.000014");
        let err = scaled_fee("c", Decimal::from_scientific("1e27").unwrap(), 140, 8).unwrap_err();
        assert!(matches!(err, InvocationError::ShapeMismatch { ref expected, .. } if expected == "fee within decimal range"));
    }

    #[test]
    fn test_parse_amount_rejects_excess_precision() {
        let err = parse_amount("c", "balance", &json!("0.123456789"), 8).unwrap_err();
        assert!(err.to_string().contains("at most 8 fractional digits"));
    }

    #[test]
    fn test_optional_and_required_amounts() {
        let payload = json!({"balance": "2", "unconfirmed": null});
        let map = payload.as_object().unwrap();
        assert_eq!(required_amount("c", map, "balance", 8).unwrap(), Decimal::from(2));
        assert!(optional_amount("c", map, "unconfirmed", 8).unwrap().is_none());
        assert!(optional_amount("c", map, "shielded", 8).unwrap().is_none());
        assert!(matches!(
            required_amount("c", map, "unlocked_balance", 12),
            Err(InvocationError::MissingField { .. })
        ));
    }

    #[test]
    fn test_non_negative_number() {
        assert_eq!(non_negative_number("fee", &json!(12)).unwrap(), Decimal::from(12));
        assert!(non_negative_number("fee", &json!(-3)).is_err());
        assert!(non_negative_number("fee", &json!("12")).is_err());
    }

    #[test]
    fn test_transaction_records() {
        let payload = json!([
            {"tx_hash": "aa", "direction": "in", "amount": "0.5", "timestamp": 1_700_000_000, "confirmations": 3},
            {"txid": "bb", "direction": "outgoing", "amount": 1, "timestamp": 1_700_000_100, "from": "x", "to": "y"}
        ]);
        let records = transaction_records("h", &payload, 8).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].confirmations, 3);
        assert_eq!(records[1].tx_hash, "bb");
        assert_eq!(records[1].direction, Direction::Out);
        assert_eq!(records[1].to_address.as_deref(), Some("y"));
        assert_eq!(records[1].timestamp.timestamp(), 1_700_000_100);
    }

    #[test]
    fn test_transaction_records_report_element_path() {
        let payload = json!([
            {"tx_hash": "aa", "direction": "in", "amount": "0.5", "timestamp": 1},
            {"tx_hash": "bb", "direction": "in", "amount": "0.5"}
        ]);
        let err = transaction_records("h", &payload, 8).unwrap_err();
        assert!(matches!(err, InvocationError::MissingField { ref field, .. } if field == "[1].timestamp"));

        let payload = json!([{"tx_hash": "aa", "direction": "sideways", "amount": "1", "timestamp": 1}]);
        let err = transaction_records("h", &payload, 8).unwrap_err();
        assert!(matches!(err, InvocationError::ShapeMismatch { ref field, .. } if field.as_deref() == Some("[0]")));

        let payload = json!(["not an object"]);
        let err = transaction_records("h", &payload, 8).unwrap_err();
        assert!(matches!(err, InvocationError::ShapeMismatch { ref actual, .. } if actual == "string"));
    }
}
