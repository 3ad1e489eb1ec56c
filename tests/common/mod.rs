//! 测试辅助模块
//! 脚本化的命令调用面：按命令名返回预设响应，并记录每一次调用

#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use janus_core::{
    domain::CoinRegistry,
    infrastructure::{CommandSurface, InvocationArgs, SurfaceError},
    Dispatcher,
};
use serde_json::{Map, Value};

pub const BTC_ADDRESS: &str = "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa";
pub const BTC_BECH32_ADDRESS: &str = "bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq";
pub const ETH_ADDRESS: &str = "0x742d35cc6634c0532925a3b844bc9e7595f0beb6";
pub const ETH_CHECKSUM_ADDRESS: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";
pub const XMR_ADDRESS: &str =
    "888tNkZrPN6JsEgekjMnABU4TBzc2Dt29EPAvkRxbANsAnjyPbb3iQ1YBRk1UXcdRsiKc9dhwMVgN5S9cQUiyoogDavup3H";

pub fn view_key() -> String {
    "ab".repeat(32)
}

/// 一次被记录的调用
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub command: String,
    pub args: Map<String, Value>,
    pub secret_args: Vec<String>,
}

/// 脚本化的命令调用面
#[derive(Default)]
pub struct MockSurface {
    responses: Mutex<HashMap<String, Result<Value, SurfaceError>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockSurface {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// 为命令设置成功响应
    pub fn respond(&self, command: &str, payload: Value) -> &Self {
        self.responses
            .lock()
            .unwrap()
            .insert(command.to_string(), Ok(payload));
        self
    }

    /// 为命令设置失败响应
    pub fn fail(&self, command: &str, error: SurfaceError) -> &Self {
        self.responses
            .lock()
            .unwrap()
            .insert(command.to_string(), Err(error));
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls_for(&self, command: &str) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|call| call.command == command)
            .collect()
    }
}

#[async_trait]
impl CommandSurface for MockSurface {
    async fn invoke(&self, command: &str, args: &InvocationArgs) -> Result<Value, SurfaceError> {
        let secret_args = args
            .keys()
            .into_iter()
            .filter(|key| args.is_secret(key))
            .map(str::to_string)
            .collect();
        self.calls.lock().unwrap().push(RecordedCall {
            command: command.to_string(),
            args: args.as_map().clone(),
            secret_args,
        });

        self.responses
            .lock()
            .unwrap()
            .get(command)
            .cloned()
            .unwrap_or_else(|| Err(SurfaceError::Failed(format!("no scripted response for {}", command))))
    }
}

/// 使用内置币种表和给定调用面的分发器
pub fn dispatcher(surface: &Arc<MockSurface>) -> Dispatcher {
    let registry = Arc::new(CoinRegistry::builtin().expect("builtin coin table"));
    Dispatcher::new(registry, surface.clone())
}
