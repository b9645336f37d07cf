//! Decoding errors.
//!
//! Every failure carries a coarse [`ErrorKind`] so callers can tell hard
//! format errors from the recoverable conditions the extractors report as
//! notices.

use std::fmt;

use thiserror::Error;

/// Coarse classification of a [`DecodeError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed tag/length encoding, truncated buffer or bad hex text.
    Format,
    /// A uniqueness lookup matched more than one node.
    AmbiguousTag,
    /// The event log ended in the middle of a record.
    TruncatedLog,
    /// A transaction start marker has no matching end marker.
    UnterminatedTrace,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Format => write!(f, "FormatError"),
            ErrorKind::AmbiguousTag => write!(f, "AmbiguousTagError"),
            ErrorKind::TruncatedLog => write!(f, "TruncatedLogError"),
            ErrorKind::UnterminatedTrace => write!(f, "UnterminatedTraceError"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Empty buffer")]
    EmptyBuffer,

    #[error("Tag {first:02X} announces a second byte that is missing")]
    MissingTagByte { first: u8 },

    #[error("Length of tag {tag} is missing or truncated")]
    MissingLength { tag: String },

    #[error("Tag {tag} declares length {length} but only {available} bytes remain")]
    LengthExceedsBuffer {
        tag: String,
        length: usize,
        available: usize,
    },

    #[error("Invalid hex text: {0}")]
    InvalidHex(String),

    #[error("Invalid tag encoding: {0}")]
    InvalidTag(String),

    #[error("Length {0} does not fit the 2-byte length form")]
    LengthTooLarge(usize),

    #[error("TLV nesting deeper than {limit} levels")]
    NestingTooDeep { limit: usize },

    #[error("Tag {tag} is primitive and cannot hold children")]
    NotConstructed { tag: String },

    #[error("Found {count} nodes with tag {tag} when expecting at most one")]
    AmbiguousTag { tag: String, count: usize },

    #[error("Dump too small: expected at least {expected} bytes, got {actual}")]
    DumpTooSmall { expected: usize, actual: usize },

    #[error("Log record at offset {offset} needs {needed} bytes but only {available} remain")]
    TruncatedLog {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("Transaction starting at nibble {offset} has no end marker")]
    UnterminatedTrace { offset: usize },

    #[error("Command at nibble {offset} has no response before the end marker")]
    MissingResponse { offset: usize },
}

impl DecodeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DecodeError::AmbiguousTag { .. } => ErrorKind::AmbiguousTag,
            DecodeError::TruncatedLog { .. } => ErrorKind::TruncatedLog,
            DecodeError::UnterminatedTrace { .. } | DecodeError::MissingResponse { .. } => {
                ErrorKind::UnterminatedTrace
            }
            _ => ErrorKind::Format,
        }
    }

    /// Whether decoding may continue past this error with partial results.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::TruncatedLog | ErrorKind::UnterminatedTrace
        )
    }
}

/// A recoverable problem recorded next to the partial results it interrupted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Where it happened, e.g. `transaction 2, exchange 1`.
    pub location: String,
    pub error: DecodeError,
}

impl Notice {
    pub fn new(location: impl Into<String>, error: DecodeError) -> Self {
        Self {
            location: location.into(),
            error,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} [{}]", self.location, self.error, self.kind())
    }
}

impl From<hex::FromHexError> for DecodeError {
    fn from(e: hex::FromHexError) -> Self {
        DecodeError::InvalidHex(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(DecodeError::EmptyBuffer.kind(), ErrorKind::Format);
        assert_eq!(
            DecodeError::AmbiguousTag {
                tag: "88".into(),
                count: 2
            }
            .kind(),
            ErrorKind::AmbiguousTag
        );
        assert!(DecodeError::UnterminatedTrace { offset: 0 }.is_recoverable());
        assert!(!DecodeError::NestingTooDeep { limit: 4 }.is_recoverable());
        assert!(DecodeError::MissingResponse { offset: 8 }.is_recoverable());
    }

    #[test]
    fn test_notice_display() {
        let notice = Notice::new("log", DecodeError::UnterminatedTrace { offset: 40 });
        assert_eq!(
            notice.to_string(),
            "log: Transaction starting at nibble 40 has no end marker [UnterminatedTraceError]"
        );
    }

    #[test]
    fn test_hex_error_is_format() {
        let err: DecodeError = hex::decode("0G").unwrap_err().into();
        assert_eq!(err.kind(), ErrorKind::Format);
    }
}
