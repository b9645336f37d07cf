//! Length field encoding.
//!
//! One byte when the high bit is clear, otherwise the low seven bits of the
//! first byte and all of a second byte form a 15-bit big-endian length.

use crate::error::DecodeError;

/// Largest length that fits the 1-byte form.
pub const MAX_SHORT_LENGTH: usize = 0x7F;

/// Largest length that fits the 2-byte form.
pub const MAX_LENGTH: usize = 0x7FFF;

const LONG_FORM: u8 = 0x80;

/// Append the encoding of `len` to `out`.
pub fn encode_into(len: usize, out: &mut Vec<u8>) -> Result<(), DecodeError> {
    if len <= MAX_SHORT_LENGTH {
        out.push(len as u8);
    } else if len <= MAX_LENGTH {
        out.push(LONG_FORM | (len >> 8) as u8);
        out.push(len as u8);
    } else {
        return Err(DecodeError::LengthTooLarge(len));
    }
    Ok(())
}

pub fn encode(len: usize) -> Result<Vec<u8>, DecodeError> {
    let mut out = Vec::with_capacity(2);
    encode_into(len, &mut out)?;
    Ok(out)
}

/// Decode the length at the start of `data`.
///
/// Returns `(length, bytes consumed)`, or `None` when the field is cut off.
pub fn decode(data: &[u8]) -> Option<(usize, usize)> {
    let first = *data.first()?;
    if first & LONG_FORM == 0 {
        return Some((first as usize, 1));
    }
    let second = *data.get(1)?;
    let len = (((first & !LONG_FORM) as usize) << 8) | second as usize;
    Some((len, 2))
}
