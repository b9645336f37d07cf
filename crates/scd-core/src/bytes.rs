//! Hex text and printable rendering helpers.

use crate::error::DecodeError;

/// Decode hex text (either case) into bytes.
///
/// Surrounding whitespace is ignored; anything else that is not a hex digit,
/// or an odd number of digits, is a format error.
pub fn decode_hex(text: &str) -> Result<Vec<u8>, DecodeError> {
    Ok(hex::decode(text.trim())?)
}

/// Encode bytes as upper-case hex text.
pub fn encode_hex(bytes: &[u8]) -> String {
    hex::encode_upper(bytes)
}

fn printable_char(b: u8) -> Option<char> {
    if b.is_ascii_graphic() {
        Some(b as char)
    } else {
        None
    }
}

/// One character per byte, non-printable bytes as `.`.
pub fn printable(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| printable_char(b).unwrap_or('.'))
        .collect()
}

/// Two characters per byte so the text lines up under the hex rendering.
pub fn printable_aligned(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for &b in bytes {
        match printable_char(b) {
            Some(c) => {
                out.push(c);
                out.push(' ');
            }
            None => out.push_str(".."),
        }
    }
    out
}
