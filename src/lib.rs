//! Janus - 多币种钱包监控的家族分发核心
//!
//! 只读：查询余额、交易历史与手续费，校验地址。不持有私钥，不签名，不广播。
//! 所有后端访问都经过 [`SecureInvocationBridge`]，负载在离开边界前完成形状校验。

pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod metrics;
pub mod service;
pub mod utils;

// 重新导出常用类型
pub use config::Config;
pub use error::{CoreError, ErrorKind, InvocationError};
pub use infrastructure::{CommandSurface, SecureInvocationBridge, SurfaceError};
pub use service::{Dispatcher, FamilyStrategy};

pub mod prelude {
    pub use crate::{
        config::Config,
        domain::{
            AddressValidity, BalanceResult, CoinFamily, CoinMetadata, CoinRegistry, FeeEstimate, FeeSource,
            QueryOptions, TransactionHistory, TransactionRecord,
        },
        error::{CoreError, ErrorKind, InvocationError},
        infrastructure::{CommandSurface, InvocationArgs, SurfaceError},
        service::{BalanceOutcome, BalanceRequest, Dispatcher, FamilyStrategy},
    };
}
