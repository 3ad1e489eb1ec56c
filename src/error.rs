//! 统一错误类型
//!
//! 两类错误：
//! - 校验错误（UnknownCoin、MissingCredential 等）在本地同步产生，永远不会到达调用边界
//! - 调用边界错误（InvocationError）原样向上传递，核心内部从不重试

use thiserror::Error;

use crate::domain::CoinFamily;

/// 错误种类（供 UI 渲染具体提示）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    UnknownCoin,
    UnknownFamily,
    FamilyMismatch,
    MissingCredential,
    InvalidCredential,
    InvalidAddress,
    UnsupportedNetwork,
    InvalidOptions,
    InvalidCoinTable,
    EmptyResponse,
    ShapeMismatch,
    MissingField,
    Timeout,
    SurfaceFailure,
}

impl ErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::UnknownCoin => "unknown_coin",
            ErrorKind::UnknownFamily => "unknown_family",
            ErrorKind::FamilyMismatch => "family_mismatch",
            ErrorKind::MissingCredential => "missing_credential",
            ErrorKind::InvalidCredential => "invalid_credential",
            ErrorKind::InvalidAddress => "invalid_address",
            ErrorKind::UnsupportedNetwork => "unsupported_network",
            ErrorKind::InvalidOptions => "invalid_options",
            ErrorKind::InvalidCoinTable => "invalid_coin_table",
            ErrorKind::EmptyResponse => "empty_response",
            ErrorKind::ShapeMismatch => "shape_mismatch",
            ErrorKind::MissingField => "missing_field",
            ErrorKind::Timeout => "timeout",
            ErrorKind::SurfaceFailure => "surface_failure",
        }
    }
}

/// 调用边界错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvocationError {
    #[error("command `{command}` returned an empty response")]
    EmptyResponse { command: String },

    #[error(
        "command `{command}` returned {actual}{} where {expected} was expected",
        field_note(.field)
    )]
    ShapeMismatch {
        command: String,
        field: Option<String>,
        expected: String,
        actual: String,
    },

    #[error("command `{command}` response is missing required field `{field}`")]
    MissingField { command: String, field: String },

    #[error("command `{command}` timed out")]
    Timeout { command: String },

    #[error("command `{command}` failed: {message}")]
    SurfaceFailure { command: String, message: String },
}

fn field_note(field: &Option<String>) -> String {
    match field {
        Some(field) => format!(" in field `{}`", field),
        None => String::new(),
    }
}

impl InvocationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            InvocationError::EmptyResponse { .. } => ErrorKind::EmptyResponse,
            InvocationError::ShapeMismatch { .. } => ErrorKind::ShapeMismatch,
            InvocationError::MissingField { .. } => ErrorKind::MissingField,
            InvocationError::Timeout { .. } => ErrorKind::Timeout,
            InvocationError::SurfaceFailure { .. } => ErrorKind::SurfaceFailure,
        }
    }

    pub fn code(&self) -> &'static str {
        self.kind().code()
    }

    /// 出错的命令名
    pub fn command(&self) -> &str {
        match self {
            InvocationError::EmptyResponse { command }
            | InvocationError::ShapeMismatch { command, .. }
            | InvocationError::MissingField { command, .. }
            | InvocationError::Timeout { command }
            | InvocationError::SurfaceFailure { command, .. } => command,
        }
    }

    /// 字段级形状错误
    pub fn field_mismatch(
        command: &str,
        field: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        InvocationError::ShapeMismatch {
            command: command.to_string(),
            field: Some(field.into()),
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

/// 核心对外错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("unknown coin symbol: {symbol}")]
    UnknownCoin { symbol: String },

    #[error("unknown coin family: {tag}")]
    UnknownFamily { tag: String },

    #[error("{symbol} belongs to the {actual} family, not {expected}")]
    FamilyMismatch {
        symbol: String,
        expected: CoinFamily,
        actual: CoinFamily,
    },

    #[error("{symbol} requires the `{credential}` option")]
    MissingCredential {
        symbol: String,
        credential: &'static str,
    },

    #[error("`{credential}` supplied for {symbol} is malformed: {reason}")]
    InvalidCredential {
        symbol: String,
        credential: &'static str,
        reason: String,
    },

    #[error("invalid {symbol} address: {reason}")]
    InvalidAddress { symbol: String, reason: String },

    #[error("{symbol} has no deployment on network `{network}`")]
    UnsupportedNetwork { symbol: String, network: String },

    #[error("invalid option `{option}`: {reason}")]
    InvalidOptions {
        option: &'static str,
        reason: String,
    },

    #[error("coin table rejected: {}", .errors.join("; "))]
    InvalidCoinTable { errors: Vec<String> },

    #[error("{family} backend call failed: {error}")]
    Invocation {
        family: CoinFamily,
        #[source]
        error: InvocationError,
    },
}

impl CoreError {
    /// 为调用边界错误标注来源家族
    pub fn invocation(family: CoinFamily, error: InvocationError) -> Self {
        CoreError::Invocation { family, error }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::UnknownCoin { .. } => ErrorKind::UnknownCoin,
            CoreError::UnknownFamily { .. } => ErrorKind::UnknownFamily,
            CoreError::FamilyMismatch { .. } => ErrorKind::FamilyMismatch,
            CoreError::MissingCredential { .. } => ErrorKind::MissingCredential,
            CoreError::InvalidCredential { .. } => ErrorKind::InvalidCredential,
            CoreError::InvalidAddress { .. } => ErrorKind::InvalidAddress,
            CoreError::UnsupportedNetwork { .. } => ErrorKind::UnsupportedNetwork,
            CoreError::InvalidOptions { .. } => ErrorKind::InvalidOptions,
            CoreError::InvalidCoinTable { .. } => ErrorKind::InvalidCoinTable,
            CoreError::Invocation { error, .. } => error.kind(),
        }
    }

    /// 稳定的 snake_case 错误码
    pub fn code(&self) -> &'static str {
        self.kind().code()
    }

    /// 是否为调用边界错误（调用方可自行决定是否重试）
    pub fn is_invocation_failure(&self) -> bool {
        matches!(self, CoreError::Invocation { .. })
    }

    pub fn invocation_error(&self) -> Option<&InvocationError> {
        match self {
            CoreError::Invocation { error, .. } => Some(error),
            _ => None,
        }
    }

    /// 调用边界错误的来源家族
    pub fn family(&self) -> Option<CoinFamily> {
        match self {
            CoreError::Invocation { family, .. } => Some(*family),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invocation_error_codes() {
        let err = InvocationError::MissingField {
            command: "utxo_get_balance".into(),
            field: "balance".into(),
        };
        assert_eq!(err.code(), "missing_field");
        assert_eq!(err.command(), "utxo_get_balance");
        assert!(err.to_string().contains("`balance`"));
    }

    #[test]
    fn test_shape_mismatch_message_names_both_shapes() {
        let err = InvocationError::ShapeMismatch {
            command: "evm_gas_price".into(),
            field: None,
            expected: "number".into(),
            actual: "string".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("number"));
        assert!(msg.contains("string"));

        let err = InvocationError::field_mismatch("utxo_get_balance", "balance", "decimal", "array");
        assert!(err.to_string().contains("in field `balance`"));
    }

    #[test]
    fn test_core_error_keeps_family_annotation() {
        let err = CoreError::invocation(
            CoinFamily::Evm,
            InvocationError::Timeout {
                command: "evm_get_balance".into(),
            },
        );
        assert!(err.is_invocation_failure());
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert_eq!(err.family(), Some(CoinFamily::Evm));
        assert_eq!(err.code(), "timeout");
    }

    #[test]
    fn test_validation_errors_are_not_invocation_failures() {
        let err = CoreError::MissingCredential {
            symbol: "XMR".into(),
            credential: "viewKey",
        };
        assert!(!err.is_invocation_failure());
        assert_eq!(err.code(), "missing_credential");
        assert!(err.invocation_error().is_none());
    }
}
