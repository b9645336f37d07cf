//! Nibble-wildcard patterns over 2-byte codes.

use std::fmt;

/// Four-nibble pattern over a 16-bit code, most significant nibble first.
/// `None` positions match any nibble.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NibblePattern([Option<u8>; 4]);

impl NibblePattern {
    /// Parse a pattern such as `"8xAE"` or `"6Cxx"`.
    pub fn parse(text: &str) -> Option<Self> {
        let bytes = text.as_bytes();
        if bytes.len() != 4 {
            return None;
        }
        let mut nibbles = [None; 4];
        for (slot, &c) in nibbles.iter_mut().zip(bytes) {
            *slot = match c {
                b'x' | b'X' => None,
                _ => Some((c as char).to_digit(16)? as u8),
            };
        }
        Some(Self(nibbles))
    }

    /// Whether `code` is covered by this pattern.
    pub fn matches(&self, code: u16) -> bool {
        self.0
            .iter()
            .enumerate()
            .all(|(i, n)| n.is_none_or(|n| n == nibble(code, i)))
    }

    pub fn wildcards(&self) -> usize {
        self.0.iter().filter(|n| n.is_none()).count()
    }
}

fn nibble(code: u16, index: usize) -> u8 {
    ((code >> ((3 - index) * 4)) & 0x0F) as u8
}

impl fmt::Debug for NibblePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NibblePattern({})", self)
    }
}

impl fmt::Display for NibblePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for n in &self.0 {
            match n {
                Some(n) => write!(f, "{:X}", n)?,
                None => write!(f, "x")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let p = NibblePattern::parse("8xae").unwrap();
        assert_eq!(p.to_string(), "8xAE");
        assert_eq!(p.wildcards(), 1);
        assert!(NibblePattern::parse("8xa").is_none());
        assert!(NibblePattern::parse("8gae").is_none());
    }

    #[test]
    fn test_matches() {
        let p = NibblePattern::parse("63Cx").unwrap();
        assert!(p.matches(0x63C2));
        assert!(!p.matches(0x6382));
        assert!(NibblePattern::parse("6A82").unwrap().matches(0x6A82));
        assert!(NibblePattern::parse("6Axx").unwrap().matches(0x6A82));
        assert!(NibblePattern::parse("8xAE").unwrap().matches(0x83AE));
    }
}
