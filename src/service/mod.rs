//! 服务层：家族分发器与各家族策略

pub mod dispatcher;
pub mod family;

pub use dispatcher::{BalanceOutcome, BalanceRequest, Dispatcher};
pub use family::{EvmStrategy, FamilyStrategies, FamilyStrategy, PrivacyStrategy, StablecoinStrategy, UtxoStrategy};
