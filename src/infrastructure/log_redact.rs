//! 日志脱敏
//!
//! 地址只显示首尾，节点 URL 去掉查询串（常携带 API key），密钥永不进入日志

/// 脱敏地址（显示前6位和后4位）
pub fn redact_address(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() < 10 {
        return "*".repeat(chars.len());
    }

    let prefix: String = chars[..6].iter().collect();
    let suffix: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", prefix, suffix)
}

/// 脱敏节点 URL：去掉查询串和 userinfo
pub fn redact_url(url: &str) -> String {
    let without_query = url.split(['?', '#']).next().unwrap_or_default();
    match without_query.split_once("://") {
        Some((scheme, rest)) => match rest.split_once('@') {
            Some((_, host)) => format!("{}://***@{}", scheme, host),
            None => without_query.to_string(),
        },
        None => without_query.to_string(),
    }
}
