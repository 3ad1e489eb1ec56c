//! 地址格式校验
//!
//! 纯函数、无 I/O：家族策略按币种表中的 [`AddressRules`] 组合调用这些检查。
//! 失败时返回可展示的原因字符串。

use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};

use crate::domain::AddressRules;

/// 检查结果：Err 携带失败原因
pub type AddressCheck = Result<(), String>;

const BASE58_ALPHABET: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";
const CASHADDR_CHARSET: &str = "qpzry9x8gf2tvdw0s3jn54khce6mua7l";

static HEX_KEY_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9a-fA-F]{64}$").expect("valid hex key pattern"));

/// 地址验证器
pub struct AddressValidator;

impl AddressValidator {
    /// 长度区间检查（规则未声明时不限制）
    pub fn check_length(address: &str, rules: &AddressRules) -> AddressCheck {
        let len = address.chars().count();
        if let Some(min) = rules.min_len {
            if len < min {
                return Err(format!("length {} is below the minimum of {}", len, min));
            }
        }
        if let Some(max) = rules.max_len {
            if len > max {
                return Err(format!("length {} exceeds the maximum of {}", len, max));
            }
        }
        if !rules.lengths.is_empty() && !rules.lengths.contains(&len) {
            return Err(format!(
                "length {} is not one of {:?}",
                len, rules.lengths
            ));
        }
        Ok(())
    }

    /// Base58Check：1 字节版本 + 20 字节哈希 + 4 字节双 SHA-256 校验和
    pub fn validate_base58check(address: &str, versions: &[u8]) -> AddressCheck {
        if versions.is_empty() {
            return Err("legacy base58 addresses are not accepted".to_string());
        }
        if let Some(c) = address.chars().find(|c| !BASE58_ALPHABET.contains(*c)) {
            return Err(format!("character '{}' is not valid base58", c));
        }

        let decoded = bs58::decode(address)
            .into_vec()
            .map_err(|e| format!("base58 decoding failed: {}", e))?;
        if decoded.len() != 25 {
            return Err(format!("decoded payload is {} bytes, expected 25", decoded.len()));
        }

        let (payload, checksum) = decoded.split_at(21);
        let digest = Sha256::digest(Sha256::digest(payload));
        if &digest[..4] != checksum {
            return Err("checksum mismatch".to_string());
        }

        let version = payload[0];
        if !versions.contains(&version) {
            return Err(format!("version byte {} belongs to another network", version));
        }
        Ok(())
    }

    /// SegWit Bech32/Bech32m（BIP-173 / BIP-350）
    pub fn validate_segwit(address: &str, expected_hrp: &str) -> AddressCheck {
        let (hrp, _version, _program) = bech32::segwit::decode(address)
            .map_err(|e| format!("bech32 decoding failed: {}", e))?;
        if !hrp.to_lowercase().eq_ignore_ascii_case(expected_hrp) {
            return Err(format!(
                "human-readable part '{}' does not match '{}'",
                hrp.to_lowercase(),
                expected_hrp
            ));
        }
        Ok(())
    }

    /// 是否看起来是 CashAddr（带前缀，或以 q/p 开头的 42 字符正文）
    pub fn looks_like_cashaddr(address: &str, prefix: &str) -> bool {
        let lower = address.to_ascii_lowercase();
        if lower.starts_with(&format!("{}:", prefix)) {
            return true;
        }
        lower.len() == 42 && (lower.starts_with('q') || lower.starts_with('p'))
    }

    /// CashAddr（BCH）：前缀可省略，大小写不可混用
    pub fn validate_cashaddr(address: &str, prefix: &str) -> AddressCheck {
        let has_lower = address.chars().any(|c| c.is_ascii_lowercase());
        let has_upper = address.chars().any(|c| c.is_ascii_uppercase());
        if has_lower && has_upper {
            return Err("mixed-case cashaddr".to_string());
        }

        let lower = address.to_ascii_lowercase();
        let body = match lower.split_once(':') {
            Some((p, body)) if p == prefix => body,
            Some((p, _)) => return Err(format!("prefix '{}' does not match '{}'", p, prefix)),
            None => lower.as_str(),
        };

        if body.len() != 42 {
            return Err(format!("cashaddr body is {} characters, expected 42", body.len()));
        }
        if !(body.starts_with('q') || body.starts_with('p')) {
            return Err("cashaddr type must be P2PKH (q) or P2SH (p)".to_string());
        }

        let mut values = Vec::with_capacity(prefix.len() + 1 + body.len());
        values.extend(prefix.bytes().map(|b| b & 0x1f));
        values.push(0);
        for c in body.chars() {
            let v = CASHADDR_CHARSET
                .find(c)
                .ok_or_else(|| format!("character '{}' is not valid in cashaddr", c))?;
            values.push(v as u8);
        }

        if cashaddr_polymod(&values) != 0 {
            return Err("checksum mismatch".to_string());
        }
        Ok(())
    }

    /// EVM 地址（0x + 40 hex，含大写时按 EIP-55 校验）
    pub fn validate_evm_address(address: &str) -> AddressCheck {
        let hex_part = address
            .strip_prefix("0x")
            .ok_or_else(|| "address must start with 0x".to_string())?;

        if hex_part.len() != 40 {
            return Err(format!("expected 40 hex characters, found {}", hex_part.len()));
        }
        if !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err("address contains non-hex characters".to_string());
        }

        let has_upper = hex_part.chars().any(|c| c.is_ascii_uppercase());
        let has_lower = hex_part.chars().any(|c| c.is_ascii_lowercase());
        if has_upper && has_lower && !Self::verify_eip55_checksum(hex_part) {
            return Err("EIP-55 checksum mismatch".to_string());
        }
        Ok(())
    }

    /// EIP-55 Checksum
    /// https://eips.ethereum.org/EIPS/eip-55
    fn verify_eip55_checksum(hex_part: &str) -> bool {
        use sha3::Keccak256;

        let hash = hex::encode(Keccak256::digest(hex_part.to_lowercase().as_bytes()));

        hex_part.chars().zip(hash.chars()).all(|(ch, h)| {
            if !ch.is_ascii_alphabetic() {
                return true;
            }
            let nibble = h.to_digit(16).unwrap_or(0);
            ch.is_ascii_uppercase() == (nibble >= 8)
        })
    }

    /// 隐私币地址：首字符、精确长度、base58 字符集
    pub fn validate_monero_address(address: &str, rules: &AddressRules) -> AddressCheck {
        if !rules.leading.is_empty() && !rules.leading.iter().any(|p| address.starts_with(p.as_str())) {
            return Err(format!("address must start with one of {:?}", rules.leading));
        }
        Self::check_length(address, rules)?;
        if let Some(c) = address.chars().find(|c| !BASE58_ALPHABET.contains(*c)) {
            return Err(format!("character '{}' is not valid base58", c));
        }
        Ok(())
    }

    /// 64 位十六进制密钥（查看/花费私钥）
    pub fn is_hex_key(key: &str) -> bool {
        HEX_KEY_PATTERN.is_match(key)
    }
}

fn cashaddr_polymod(values: &[u8]) -> u64 {
    const GENERATORS: [u64; 5] = [
        0x98f2bc8e61,
        0x79b76d99e2,
        0xf33e5fb3c4,
        0xae2eabe2a8,
        0x1e4f43e470,
    ];

    let mut c: u64 = 1;
    for &d in values {
        let c0 = (c >> 35) as u8;
        c = ((c & 0x07ffffffff) << 5) ^ u64::from(d);
        for (i, generator) in GENERATORS.iter().enumerate() {
            if c0 & (1 << i) != 0 {
                c ^= generator;
            }
        }
    }
    c ^ 1
}
