//! Domain 模块
//!
//! 币种元数据、注册表与查询结果模型

pub mod balance;
pub mod coin;
pub mod coin_registry;
pub mod coin_table;
pub mod options;
pub mod transaction;

// 重新导出常用类型
pub use balance::{AddressValidity, BalanceResult, FeeEstimate, FeeSource, SecondaryBalances};
pub use coin::{AddressRules, CoinFamily, CoinMetadata, TokenDeployment};
pub use coin_registry::CoinRegistry;
pub use coin_table::{CoinEntry, CoinTable, COIN_TABLE_VERSION};
pub use options::{FamilyOptions, QueryOptions};
pub use transaction::{Direction, TransactionHistory, TransactionRecord};
