//! 安全调用桥
//!
//! 核心自身不做任何网络 I/O：所有后端查询都通过宿主注入的 [`CommandSurface`]
//! 以「命令名 + 参数」的形式发出。桥负责：
//! - 每次请求恰好调用一次 surface（从不重试）
//! - 把空响应、形状错误、缺失字段转换为 [`InvocationError`]
//! - 校验通过后原样返回负载
//!
//! 密钥参数通过 [`InvocationArgs::with_secret`] 注入，调用结束即清零。

use std::{fmt, sync::Arc, time::Instant};

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;
use zeroize::Zeroize;

use crate::{error::InvocationError, metrics};

/// surface 自身报告的失败
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SurfaceError {
    #[error("invocation timed out")]
    Timeout,
    #[error("{0}")]
    Failed(String),
}

/// 宿主提供的命令调用面
///
/// 生产环境由宿主（原生后端）实现；测试中用脚本化的 mock 替代。
#[async_trait]
pub trait CommandSurface: Send + Sync {
    async fn invoke(&self, command: &str, args: &InvocationArgs) -> Result<Value, SurfaceError>;
}

/// 命令参数
///
/// 仅存放一次调用所需的参数；密钥字段在 Drop 时清零，Debug 中脱敏。
#[derive(Default)]
pub struct InvocationArgs {
    values: Map<String, Value>,
    secret_keys: Vec<String>,
}

impl InvocationArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.values.insert(key.to_string(), value.into());
        self
    }

    /// 仅在值存在时写入
    pub fn with_opt<V: Into<Value>>(self, key: &str, value: Option<V>) -> Self {
        match value {
            Some(value) => self.with(key, value),
            None => self,
        }
    }

    /// 写入密钥类参数（调用结束后清零）
    pub fn with_secret(mut self, key: &str, secret: &str) -> Self {
        self.values
            .insert(key.to_string(), Value::String(secret.to_string()));
        self.secret_keys.push(key.to_string());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn is_secret(&self, key: &str) -> bool {
        self.secret_keys.iter().any(|k| k == key)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.values
    }

    /// 参数名列表（用于日志，不含值）
    pub fn keys(&self) -> Vec<&str> {
        self.values.keys().map(String::as_str).collect()
    }
}

impl Drop for InvocationArgs {
    fn drop(&mut self) {
        for key in &self.secret_keys {
            if let Some(Value::String(secret)) = self.values.get_mut(key) {
                secret.zeroize();
            }
        }
    }
}

impl fmt::Debug for InvocationArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (key, value) in &self.values {
            if self.is_secret(key) {
                map.entry(key, &"***");
            } else {
                map.entry(key, value);
            }
        }
        map.finish()
    }
}

/// 期望的响应形状
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedShape {
    /// 对象，且包含列出的必需字段
    Object(&'static [&'static str]),
    /// 有限数值
    Number,
    /// 数组
    Array,
}

impl ExpectedShape {
    pub fn describe(&self) -> &'static str {
        match self {
            ExpectedShape::Object(_) => "object",
            ExpectedShape::Number => "number",
            ExpectedShape::Array => "array",
        }
    }
}

/// JSON 值的形状名
pub fn shape_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// 按期望形状校验负载；通过时原样返回
pub fn check_shape(command: &str, value: Value, expected: ExpectedShape) -> Result<Value, InvocationError> {
    if value.is_null() {
        return Err(InvocationError::EmptyResponse {
            command: command.to_string(),
        });
    }

    let mismatch = |actual: &str| InvocationError::ShapeMismatch {
        command: command.to_string(),
        field: None,
        expected: expected.describe().to_string(),
        actual: actual.to_string(),
    };

    match (expected, &value) {
        (ExpectedShape::Object(required), Value::Object(map)) => {
            // 显式 null 视同缺失
            if let Some(field) = required
                .iter()
                .find(|f| map.get(**f).map_or(true, Value::is_null))
            {
                return Err(InvocationError::MissingField {
                    command: command.to_string(),
                    field: field.to_string(),
                });
            }
        }
        (ExpectedShape::Number, Value::Number(n)) => {
            if !n.as_f64().is_some_and(f64::is_finite) {
                return Err(mismatch("non-finite number"));
            }
        }
        (ExpectedShape::Array, Value::Array(_)) => {}
        (_, other) => return Err(mismatch(shape_of(other))),
    }

    Ok(value)
}

/// 安全调用桥
#[derive(Clone)]
pub struct SecureInvocationBridge {
    surface: Arc<dyn CommandSurface>,
}

impl SecureInvocationBridge {
    pub fn new(surface: Arc<dyn CommandSurface>) -> Self {
        Self { surface }
    }

    /// 调用一次命令并校验响应形状
    ///
    /// 参数按值传入，调用返回后立即释放（密钥清零）。
    pub async fn invoke(
        &self,
        command: &str,
        args: InvocationArgs,
        expected: ExpectedShape,
    ) -> Result<Value, InvocationError> {
        let started = Instant::now();
        tracing::debug!(command = %command, args = ?args.keys(), "Invoking backend command");

        let outcome = self.surface.invoke(command, &args).await;
        drop(args);

        let result = match outcome {
            Ok(value) => check_shape(command, value, expected),
            Err(SurfaceError::Timeout) => Err(InvocationError::Timeout {
                command: command.to_string(),
            }),
            Err(SurfaceError::Failed(message)) => Err(InvocationError::SurfaceFailure {
                command: command.to_string(),
                message,
            }),
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        metrics::observe_invocation(command, result.as_ref().err().map(InvocationError::code), elapsed_ms);

        match &result {
            Ok(_) => tracing::debug!(command = %command, elapsed_ms, "Backend command succeeded"),
            Err(e) => tracing::warn!(
                command = %command,
                code = e.code(),
                elapsed_ms,
                error = %e,
                "Backend command failed"
            ),
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_check_shape_passes_payload_through() {
        let payload = json!({"balance": "1.5", "extra": [1, 2]});
        let out = check_shape("cmd", payload.clone(), ExpectedShape::Object(&["balance"])).unwrap();
        assert_eq!(out, payload);
    }

    #[test]
    fn test_check_shape_null_is_empty_response() {
        let err = check_shape("cmd", Value::Null, ExpectedShape::Array).unwrap_err();
        assert!(matches!(err, InvocationError::EmptyResponse { .. }));
    }

    #[test]
    fn test_check_shape_reports_actual_shape() {
        let err = check_shape("cmd", json!("12"), ExpectedShape::Number).unwrap_err();
        match err {
            InvocationError::ShapeMismatch { expected, actual, field, .. } => {
                assert_eq!(expected, "number");
                assert_eq!(actual, "string");
                assert!(field.is_none());
            }
            other => panic!("unexpected {:?}", other),
        }

        let err = check_shape("cmd", json!([1]), ExpectedShape::Object(&["balance"])).unwrap_err();
        assert!(matches!(err, InvocationError::ShapeMismatch { ref actual, .. } if actual == "array"));
    }

    #[test]
    fn test_check_shape_missing_and_null_fields() {
        let err = check_shape("cmd", json!({"balance": "1"}), ExpectedShape::Object(&["balance", "unlocked_balance"]))
            .unwrap_err();
        assert!(matches!(err, InvocationError::MissingField { ref field, .. } if field == "unlocked_balance"));

        let err = check_shape("cmd", json!({"balance": null}), ExpectedShape::Object(&["balance"])).unwrap_err();
        assert!(matches!(err, InvocationError::MissingField { .. }));
    }

    #[test]
    fn test_args_debug_hides_secrets() {
        let args = InvocationArgs::new()
            .with("symbol", "XMR")
            .with_secret("viewKey", "very-secret")
            .with_opt("node", None::<String>);
        let rendered = format!("{:?}", args);
        assert!(rendered.contains("XMR"));
        assert!(!rendered.contains("very-secret"));
        assert!(args.is_secret("viewKey"));
        assert!(!args.contains_key("node"));
        assert_eq!(args.get_str("viewKey"), Some("very-secret"));
    }
}
