//! Status word (SW1 SW2) classification.
//!
//! Parameterised ranges, where the trailing nibbles carry data rather than
//! an enumerable code, are recognised before the generic table. Among the
//! table entries covering a code, the one with the fewest wildcards wins.

use std::fmt;
use std::sync::LazyLock;

use super::constants::{STATUS_WORD_LEN, STATUS_WORDS};
use super::pattern::NibblePattern;

static STATUS_TABLE: LazyLock<Vec<(NibblePattern, &'static str)>> = LazyLock::new(|| {
    STATUS_WORDS
        .iter()
        .filter_map(|&(pattern, meaning)| NibblePattern::parse(pattern).map(|p| (p, meaning)))
        .collect()
});

/// Meaning of a status word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusMeaning {
    /// Fixed meaning from the table.
    Known(&'static str),
    /// 61XX: XX more bytes can be fetched.
    BytesAvailable(u8),
    /// 63CX: retry counter value X.
    Counter(u8),
    /// 66XX: security-related issue XX.
    SecurityError(u8),
    /// 6CXX: wrong Le, XX is the exact length.
    WrongLength(u8),
    Unknown,
}

impl StatusMeaning {
    pub fn is_known(&self) -> bool {
        !matches!(self, StatusMeaning::Unknown)
    }
}

impl fmt::Display for StatusMeaning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusMeaning::Known(text) => write!(f, "{}", text),
            StatusMeaning::BytesAvailable(n) => write!(f, "OK: 0x{:02X} bytes available", n),
            StatusMeaning::Counter(n) => write!(f, "Warning: counter is 0x{:02X}", n),
            StatusMeaning::SecurityError(n) => write!(f, "Security error 0x{:02X}", n),
            StatusMeaning::WrongLength(n) => {
                write!(f, "Checking error: wrong length, should be 0x{:02X}", n)
            }
            StatusMeaning::Unknown => write!(f, "Unknown response"),
        }
    }
}

/// Two-byte status word closing every response.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusWord(u16);

impl StatusWord {
    pub const OK: StatusWord = StatusWord(0x9000);

    pub const fn new(sw1: u8, sw2: u8) -> Self {
        Self(((sw1 as u16) << 8) | sw2 as u16)
    }

    pub const fn from_u16(value: u16) -> Self {
        Self(value)
    }

    /// Take the status word from the start of a response.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < STATUS_WORD_LEN {
            return None;
        }
        Some(Self::new(bytes[0], bytes[1]))
    }

    pub fn value(&self) -> u16 {
        self.0
    }

    pub fn sw1(&self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub fn sw2(&self) -> u8 {
        self.0 as u8
    }

    pub fn meaning(&self) -> StatusMeaning {
        let (sw1, sw2) = (self.sw1(), self.sw2());
        match sw1 {
            0x63 if sw2 & 0xF0 == 0xC0 => return StatusMeaning::Counter(sw2 & 0x0F),
            0x61 => return StatusMeaning::BytesAvailable(sw2),
            0x66 => return StatusMeaning::SecurityError(sw2),
            0x6C => return StatusMeaning::WrongLength(sw2),
            _ => {}
        }

        STATUS_TABLE
            .iter()
            .filter(|(pattern, _)| pattern.matches(self.0))
            .min_by_key(|(pattern, _)| pattern.wildcards())
            .map(|&(_, meaning)| StatusMeaning::Known(meaning))
            .unwrap_or(StatusMeaning::Unknown)
    }
}

impl fmt::Debug for StatusWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StatusWord({:04X})", self.0)
    }
}

impl fmt::Display for StatusWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:04X})", self.meaning(), self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_entries() {
        assert_eq!(StatusWord::OK.meaning(), StatusMeaning::Known("OK"));
        assert_eq!(
            StatusWord::new(0x6A, 0x82).meaning(),
            StatusMeaning::Known("Checking error: file not found")
        );
        assert_eq!(StatusWord::OK.to_string(), "OK (0x9000)");
    }

    #[test]
    fn test_parameterised_ranges_win() {
        assert_eq!(
            StatusWord::new(0x63, 0xC2).meaning(),
            StatusMeaning::Counter(2)
        );
        assert_eq!(
            StatusWord::new(0x61, 0x1A).to_string(),
            "OK: 0x1A bytes available (0x611A)"
        );
        assert_eq!(
            StatusWord::new(0x6C, 0x10).meaning(),
            StatusMeaning::WrongLength(0x10)
        );
        assert_eq!(
            StatusWord::new(0x66, 0x00).meaning(),
            StatusMeaning::SecurityError(0)
        );
    }

    #[test]
    fn test_wildcard_fallback() {
        // 6A89 is not enumerated, falls back to the 6Axx class.
        assert_eq!(
            StatusWord::new(0x6A, 0x89).meaning(),
            StatusMeaning::Known("Checking error: wrong parameters P1-P2")
        );
        // 6382 is not 63Cx, so it reaches the 63xx class.
        assert_eq!(
            StatusWord::new(0x63, 0x82).meaning(),
            StatusMeaning::Known("Warning: state of non-volatile memory changed")
        );
    }

    #[test]
    fn test_unknown() {
        let sw = StatusWord::new(0x12, 0x34);
        assert_eq!(sw.meaning(), StatusMeaning::Unknown);
        assert_eq!(sw.to_string(), "Unknown response (0x1234)");
        assert!(StatusWord::from_bytes(&[0x90]).is_none());
    }
}
