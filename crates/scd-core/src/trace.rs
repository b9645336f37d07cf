//! Trace extraction.
//!
//! The probe records a transaction as one long hex stream in which 5-byte
//! sentinel runs delimit the pieces:
//!
//! ```text
//! DDDDDDDDDD  CCCCCCCCCC <command>  AAAAAAAAAA <response>  ...  BBBBBBBBBB
//!   start       command              response                    end
//! ```
//!
//! Because the stream is indexed by nibble, a sentinel-like run inside APDU
//! data can match at an odd offset. Such matches straddle two bytes and are
//! skipped. A response marker additionally has to be followed by the first
//! nibble of a status word (`6` or `9`), which disambiguates it from `AA`
//! data bytes running into the marker.

use std::fmt;

use tracing::debug;

use crate::apdu::{
    ApduHeader, COMMAND_HEADER_LEN, CommandMeaning, STATUS_WORD_LEN, StatusMeaning, StatusWord,
};
use crate::bytes;
use crate::error::{DecodeError, Notice};
use crate::events::{DecodeEvent, DecodeObserver, NullObserver};
use crate::tlv::{DEFAULT_MAX_DEPTH, TlvNode};

/// Length of every sentinel in nibbles.
pub const MARKER_LEN: usize = 10;

/// First nibbles a status word following a response marker may start with.
pub const STATUS_NIBBLES: [u8; 2] = [b'6', b'9'];

/// Sentinel markers of a probe trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Start,
    Command,
    Response,
    End,
}

impl Marker {
    pub fn pattern(&self) -> &'static str {
        match self {
            Marker::Start => "DDDDDDDDDD",
            Marker::Command => "CCCCCCCCCC",
            Marker::Response => "AAAAAAAAAA",
            Marker::End => "BBBBBBBBBB",
        }
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Marker::Start => write!(f, "start"),
            Marker::Command => write!(f, "command"),
            Marker::Response => write!(f, "response"),
            Marker::End => write!(f, "end"),
        }
    }
}

/// Find the next valid `marker` at or after nibble offset `from`.
pub fn find_marker<O: DecodeObserver + ?Sized>(
    hex: &str,
    marker: Marker,
    from: usize,
    observer: &O,
) -> Option<usize> {
    let text = hex.as_bytes();
    let pattern = marker.pattern().as_bytes();
    let mut pos = from;

    while pos + pattern.len() <= text.len() {
        let at = pos
            + text[pos..]
                .windows(pattern.len())
                .position(|w| w.eq_ignore_ascii_case(pattern))?;

        let aligned = at % 2 == 0;
        let status_follows = marker != Marker::Response
            || text
                .get(at + MARKER_LEN)
                .is_some_and(|c| STATUS_NIBBLES.contains(c));

        if aligned && status_follows {
            return Some(at);
        }
        observer.on_event(&DecodeEvent::MarkerRejected { marker, offset: at });
        pos = at + 1;
    }
    None
}

/// A command APDU as sent by the terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandApdu {
    raw: Vec<u8>,
}

impl CommandApdu {
    pub fn new(raw: Vec<u8>) -> Self {
        Self { raw }
    }

    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// CLA INS P1 P2 P3, when the command is at least 5 bytes long.
    pub fn header(&self) -> Option<ApduHeader> {
        ApduHeader::from_bytes(&self.raw)
    }

    /// Bytes after the header, or everything when there is no header.
    pub fn data(&self) -> &[u8] {
        if self.raw.len() >= COMMAND_HEADER_LEN {
            &self.raw[COMMAND_HEADER_LEN..]
        } else {
            &self.raw
        }
    }

    pub fn name(&self) -> CommandMeaning {
        self.header()
            .map(|h| h.code().lookup())
            .unwrap_or(CommandMeaning::Unknown)
    }
}

/// A response APDU: status word first, then data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseApdu {
    raw: Vec<u8>,
}

impl ResponseApdu {
    pub fn new(raw: Vec<u8>) -> Self {
        Self { raw }
    }

    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    pub fn status_word(&self) -> Option<StatusWord> {
        StatusWord::from_bytes(&self.raw)
    }

    pub fn data(&self) -> &[u8] {
        if self.raw.len() >= STATUS_WORD_LEN {
            &self.raw[STATUS_WORD_LEN..]
        } else {
            &self.raw
        }
    }

    pub fn meaning(&self) -> StatusMeaning {
        self.status_word()
            .map(|sw| sw.meaning())
            .unwrap_or(StatusMeaning::Unknown)
    }

    /// TLV decode of the data, `None` when there is no data.
    pub fn tlv(&self) -> Option<Result<TlvNode, DecodeError>> {
        self.tlv_with_limit(DEFAULT_MAX_DEPTH)
    }

    pub fn tlv_with_limit(&self, max_depth: usize) -> Option<Result<TlvNode, DecodeError>> {
        let data = self.data();
        if data.is_empty() || self.raw.len() < STATUS_WORD_LEN {
            return None;
        }
        Some(TlvNode::parse_with_limit(data, max_depth))
    }
}

/// One command and the response that followed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub index: usize,
    /// Nibble offset of the command marker.
    pub offset: usize,
    pub command: CommandApdu,
    pub response: ResponseApdu,
}

/// Exchanges between a start and an end marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub index: usize,
    /// Nibble offset of the start marker.
    pub offset: usize,
    pub exchanges: Vec<Exchange>,
}

/// Everything recovered from one stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub transactions: Vec<Transaction>,
    pub notices: Vec<Notice>,
}

impl Extraction {
    pub fn exchange_count(&self) -> usize {
        self.transactions.iter().map(|t| t.exchanges.len()).sum()
    }
}

/// Extract every terminated transaction from a contiguous hex stream.
pub fn extract_transactions(hex: &str) -> Extraction {
    extract_transactions_observed(hex, &NullObserver)
}

pub fn extract_transactions_observed<O: DecodeObserver + ?Sized>(
    hex: &str,
    observer: &O,
) -> Extraction {
    let mut out = Extraction::default();
    let mut pos = 0;

    while let Some(start) = find_marker(hex, Marker::Start, pos, observer) {
        let index = out.transactions.len() + 1;
        let body = start + MARKER_LEN;

        let Some(end) = find_marker(hex, Marker::End, body, observer) else {
            observer.on_event(&DecodeEvent::TransactionUnterminated { offset: start });
            out.notices.push(Notice::new(
                format!("transaction {}", index),
                DecodeError::UnterminatedTrace { offset: start },
            ));
            break;
        };

        observer.on_event(&DecodeEvent::TransactionStarted {
            index,
            offset: start,
        });
        let mut transaction = Transaction {
            index,
            offset: start,
            exchanges: Vec::new(),
        };
        frame_exchanges(hex, body, end, &mut transaction, &mut out.notices, observer);
        out.transactions.push(transaction);

        pos = end + MARKER_LEN;
    }

    out
}

/// Frame command/response pairs in `[from, end)`.
fn frame_exchanges<O: DecodeObserver + ?Sized>(
    hex: &str,
    from: usize,
    end: usize,
    transaction: &mut Transaction,
    notices: &mut Vec<Notice>,
    observer: &O,
) {
    let before_end = |found: Option<usize>| found.filter(|&p| p < end);
    let mut next_command = before_end(find_marker(hex, Marker::Command, from, observer));

    while let Some(command_at) = next_command {
        let exchange_no = transaction.exchanges.len() + 1;
        let location = format!("transaction {}, exchange {}", transaction.index, exchange_no);

        let command_data = command_at + MARKER_LEN;
        let Some(response_at) =
            before_end(find_marker(hex, Marker::Response, command_data, observer))
        else {
            notices.push(Notice::new(
                location,
                DecodeError::MissingResponse { offset: command_at },
            ));
            return;
        };

        let response_data = response_at + MARKER_LEN;
        next_command = before_end(find_marker(hex, Marker::Command, response_data, observer));
        let response_end = next_command.unwrap_or(end);

        let command = bytes::decode_hex(&hex[command_data..response_at]);
        let response = bytes::decode_hex(&hex[response_data..response_end]);
        match (command, response) {
            (Ok(command), Ok(response)) => {
                observer.on_event(&DecodeEvent::ExchangeFramed {
                    transaction: transaction.index,
                    index: exchange_no,
                    command_len: command.len(),
                    response_len: response.len(),
                });
                transaction.exchanges.push(Exchange {
                    index: exchange_no,
                    offset: command_at,
                    command: CommandApdu::new(command),
                    response: ResponseApdu::new(response),
                });
            }
            (Err(e), _) | (_, Err(e)) => {
                debug!(offset = command_at, error = %e, "Exchange skipped");
                notices.push(Notice::new(location, e));
            }
        }
    }
}
