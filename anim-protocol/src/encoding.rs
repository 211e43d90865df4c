//! Percent encoding for declaration fields and parameter values
//!
//! Everything outside the URL "unreserved" set is escaped, so values may carry
//! spaces and newlines without breaking the line framing.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Bytes left untouched when encoding: `A-Z a-z 0-9 - . _ ~`
const UNRESERVED: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Decode a percent-encoded field, trimming whitespace before and after.
pub fn decode_field(raw: &str) -> String {
    percent_decode_str(raw.trim())
        .decode_utf8_lossy()
        .trim()
        .to_string()
}

/// Percent-encode a value for transmission to the child.
pub fn encode_value(value: &str) -> String {
    utf8_percent_encode(value, UNRESERVED).to_string()
}

/// Parse a hexadecimal color word, with or without a `0x` prefix.
pub fn parse_hex_u32(raw: &str) -> Option<u32> {
    let digits = raw
        .strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
        .unwrap_or(raw);
    if digits.is_empty() || digits.len() > 8 {
        return None;
    }
    u32::from_str_radix(digits, 16).ok()
}
