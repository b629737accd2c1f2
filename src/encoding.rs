//! Calldata and value encoding helpers.
//!
//! Parses the hex payload of a transaction request into a 4-byte selector plus
//! opaque parameter bytes, and converts wei amounts between their wire forms
//! (hex or decimal strings) and native-currency units.

use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

/// Length of a function selector in bytes.
pub const SELECTOR_LEN: usize = 4;

/// ABI word size in bytes.
const WORD_LEN: usize = 32;

/// Wei per native-currency unit (1 ETH = 10^18 wei).
pub const WEI_PER_ETHER: u128 = 1_000_000_000_000_000_000;

/// Selector label used when calldata is empty.
pub const EMPTY_SELECTOR: &str = "0x";

/// Parameter bytes that follow the selector. No ABI typing is applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawParameters {
    /// `0x`-prefixed lowercase hex of the parameter bytes.
    pub raw: String,
    pub byte_length: usize,
    /// Estimated argument count (`byte_length / 32`).
    pub word_count: usize,
}

/// Parsed transaction calldata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Calldata {
    selector: Option<[u8; SELECTOR_LEN]>,
    params: Vec<u8>,
}

impl Calldata {
    pub fn is_empty(&self) -> bool {
        self.selector.is_none()
    }

    /// Lowercase `0x`-prefixed selector, or `"0x"` for empty calldata.
    pub fn selector(&self) -> String {
        match self.selector {
            Some(sel) => format!("0x{}", hex::encode(sel)),
            None => EMPTY_SELECTOR.to_string(),
        }
    }

    pub fn parameters(&self) -> RawParameters {
        RawParameters {
            raw: format!("0x{}", hex::encode(&self.params)),
            byte_length: self.params.len(),
            word_count: self.params.len() / WORD_LEN,
        }
    }
}

/// Parse a hex calldata string.
///
/// `""` and `"0x"` are empty calldata. Anything else must be `0x`-prefixed,
/// valid even-length hex, and at least one selector long.
pub fn parse_calldata(data: &str) -> Result<Calldata, AnalysisError> {
    let data = data.trim();
    if data.is_empty() || data == EMPTY_SELECTOR {
        return Ok(Calldata {
            selector: None,
            params: Vec::new(),
        });
    }

    let body = strip_hex_prefix(data)
        .ok_or_else(|| AnalysisError::InvalidCalldata("missing 0x prefix".to_string()))?;
    let bytes = hex::decode(body).map_err(|e| AnalysisError::InvalidCalldata(e.to_string()))?;

    if bytes.len() < SELECTOR_LEN {
        return Err(AnalysisError::InvalidCalldata(format!(
            "expected at least {} bytes, got {}",
            SELECTOR_LEN,
            bytes.len()
        )));
    }

    let mut selector = [0u8; SELECTOR_LEN];
    selector.copy_from_slice(&bytes[..SELECTOR_LEN]);
    Ok(Calldata {
        selector: Some(selector),
        params: bytes[SELECTOR_LEN..].to_vec(),
    })
}

/// Parse a wei amount. Absent or empty means zero; `0x` means hex, otherwise decimal.
pub fn parse_wei(value: Option<&str>) -> Result<u128, AnalysisError> {
    let raw = match value.map(str::trim) {
        None | Some("") => return Ok(0),
        Some(v) => v,
    };

    let invalid = |cause: String| AnalysisError::InvalidValue {
        value: raw.to_string(),
        cause,
    };

    match strip_hex_prefix(raw) {
        Some("") => Ok(0),
        Some(digits) => u128::from_str_radix(digits, 16).map_err(|e| invalid(e.to_string())),
        None => {
            if !raw.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid("expected a decimal or 0x-prefixed hex integer".to_string()));
            }
            raw.parse::<u128>().map_err(|e| invalid(e.to_string()))
        }
    }
}

/// Convert wei to native-currency units.
pub fn format_ether(wei: u128) -> f64 {
    let whole = wei / WEI_PER_ETHER;
    let frac = wei % WEI_PER_ETHER;
    whole as f64 + frac as f64 / WEI_PER_ETHER as f64
}

/// Decimal native-currency string for a wei amount, trimmed of trailing zeros.
pub fn ether_string(wei: u128) -> String {
    let whole = wei / WEI_PER_ETHER;
    let frac = wei % WEI_PER_ETHER;
    if frac == 0 {
        return format!("{whole}.0");
    }
    let frac = format!("{frac:018}");
    format!("{whole}.{}", frac.trim_end_matches('0'))
}

/// Whether `s` is a `0x`-prefixed 20-byte hex address.
pub fn is_address(s: &str) -> bool {
    match strip_hex_prefix(s) {
        Some(body) => body.len() == 40 && body.bytes().all(|b| b.is_ascii_hexdigit()),
        None => false,
    }
}

/// Shorten an address to `0x1234...abcd`.
pub fn short_address(address: &str) -> String {
    if address.is_empty() {
        return "Unknown".to_string();
    }
    let chars: Vec<char> = address.chars().collect();
    if chars.len() < 10 {
        return address.to_string();
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

fn strip_hex_prefix(s: &str) -> Option<&str> {
    s.strip_prefix("0x").or_else(|| s.strip_prefix("0X"))
}
