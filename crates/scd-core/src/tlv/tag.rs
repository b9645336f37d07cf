//! BER-TLV tag identity.

use std::fmt;
use std::str::FromStr;

use crate::bytes;
use crate::error::DecodeError;

/// Low five bits of the first tag byte all set: a second tag byte follows.
pub const TAG_NUMBER_MASK: u8 = 0x1F;

/// Bit 6 of the first tag byte: the value holds nested objects.
pub const CONSTRUCTED_BIT: u8 = 0x20;

/// One- or two-byte tag, kept exactly as encoded.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag {
    bytes: [u8; 2],
    len: u8,
}

impl Tag {
    /// Build a tag from its full encoding.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        match *bytes {
            [b0] if b0 & TAG_NUMBER_MASK != TAG_NUMBER_MASK => Ok(Self {
                bytes: [b0, 0],
                len: 1,
            }),
            [b0, b1] if b0 & TAG_NUMBER_MASK == TAG_NUMBER_MASK => Ok(Self {
                bytes: [b0, b1],
                len: 2,
            }),
            _ => Err(DecodeError::InvalidTag(bytes::encode_hex(bytes))),
        }
    }

    /// Read the tag at the start of an encoded object.
    ///
    /// Returns the tag and the number of bytes it occupies.
    pub fn read(data: &[u8]) -> Result<(Self, usize), DecodeError> {
        let first = *data.first().ok_or(DecodeError::EmptyBuffer)?;
        if first & TAG_NUMBER_MASK == TAG_NUMBER_MASK {
            let second = *data.get(1).ok_or(DecodeError::MissingTagByte { first })?;
            Ok((
                Self {
                    bytes: [first, second],
                    len: 2,
                },
                2,
            ))
        } else {
            Ok((
                Self {
                    bytes: [first, 0],
                    len: 1,
                },
                1,
            ))
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Tag as an integer (big-endian), for table lookups.
    pub fn value(&self) -> u16 {
        match self.len {
            1 => self.bytes[0] as u16,
            _ => u16::from_be_bytes(self.bytes),
        }
    }

    pub fn is_constructed(&self) -> bool {
        self.bytes[0] & CONSTRUCTED_BIT == CONSTRUCTED_BIT
    }

    pub fn to_hex(&self) -> String {
        bytes::encode_hex(self.as_bytes())
    }
}

impl FromStr for Tag {
    type Err = DecodeError;

    /// Parse hex text such as `"5F2D"` or `"a5"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tag::from_bytes(&bytes::decode_hex(s)?)
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tag({})", self.to_hex())
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_and_double() {
        let t: Tag = "6F".parse().unwrap();
        assert_eq!(t.len(), 1);
        assert!(t.is_constructed());

        let t: Tag = "5f2d".parse().unwrap();
        assert_eq!(t.as_bytes(), &[0x5F, 0x2D]);
        assert_eq!(t.value(), 0x5F2D);
        assert!(!t.is_constructed());
        assert_eq!(t.to_string(), "5F2D");
    }

    #[test]
    fn test_inconsistent_encodings_rejected() {
        assert!("5F".parse::<Tag>().is_err());
        assert!("842D".parse::<Tag>().is_err());
        assert!("5F2D01".parse::<Tag>().is_err());
        assert!("8".parse::<Tag>().is_err());
    }

    #[test]
    fn test_read() {
        assert_eq!(Tag::read(&[0x9F, 0x02, 0x06]).unwrap().1, 2);
        assert_eq!(Tag::read(&[0x84, 0x0E]).unwrap().1, 1);
        assert_eq!(
            Tag::read(&[0x9F]),
            Err(DecodeError::MissingTagByte { first: 0x9F })
        );
        assert_eq!(Tag::read(&[]), Err(DecodeError::EmptyBuffer));
    }
}
