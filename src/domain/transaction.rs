//! 交易历史

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 交易方向（相对于被查询地址）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[serde(alias = "incoming", alias = "received")]
    In,
    #[serde(alias = "outgoing", alias = "sent")]
    Out,
}

/// 单条交易记录
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionRecord {
    pub tx_hash: String,
    pub direction: Direction,
    /// 金额绝对值（方向由 direction 表示）
    pub amount: Decimal,
    pub confirmations: u64,
    pub timestamp: DateTime<Utc>,
    pub block_height: Option<u64>,
    pub from_address: Option<String>,
    pub to_address: Option<String>,
}

/// 交易历史：按时间倒序，可重复遍历
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionHistory {
    symbol: String,
    records: Vec<TransactionRecord>,
}

impl TransactionHistory {
    /// 排序（新→旧，同一时间保持原序）并截断到 `limit`
    pub fn new(symbol: impl Into<String>, mut records: Vec<TransactionRecord>, limit: usize) -> Self {
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        records.truncate(limit);
        Self {
            symbol: symbol.into(),
            records,
        }
    }

    pub fn empty(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            records: Vec::new(),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TransactionRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[TransactionRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<TransactionRecord> {
        self.records
    }
}

impl<'a> IntoIterator for &'a TransactionHistory {
    type Item = &'a TransactionRecord;
    type IntoIter = std::slice::Iter<'a, TransactionRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
