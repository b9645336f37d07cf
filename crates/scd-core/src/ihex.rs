//! Intel-Hex unpacking.
//!
//! The probe dumps its EEPROM (and raw traces) as Intel-Hex text. Only data
//! records matter here: their payloads are concatenated into one contiguous
//! hex string. Unpacking stops quietly at the first line that is not a
//! complete data record, which is how every well-formed file ends anyway.

use std::fmt;

use ihex::{ReaderError, Record as HexRecord};
use tracing::warn;

use crate::bytes;
use crate::events::{DecodeEvent, DecodeObserver, NullObserver};

/// Record start code.
pub const START_CODE: char = ':';

/// Record type of a data record.
pub const DATA_RECORD: u8 = 0x00;

/// Why unpacking stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// Every line was a data record.
    EndOfInput,
    /// The line does not start with `:`.
    NotARecord,
    /// The line length does not match its byte count.
    LengthMismatch,
    /// A field is not hex or the line has an odd length.
    BadField,
    /// A non-data record such as end-of-file (`01`).
    NonDataRecord(u8),
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::EndOfInput => write!(f, "end of input"),
            StopReason::NotARecord => write!(f, "not a record"),
            StopReason::LengthMismatch => write!(f, "record length does not match byte count"),
            StopReason::BadField => write!(f, "malformed record field"),
            StopReason::NonDataRecord(t) => write!(f, "record type {:02X}", t),
        }
    }
}

impl From<ReaderError> for StopReason {
    fn from(e: ReaderError) -> Self {
        match e {
            ReaderError::MissingStartCode => StopReason::NotARecord,
            ReaderError::RecordTooShort | ReaderError::PayloadLengthMismatch => {
                StopReason::LengthMismatch
            }
            ReaderError::UnsupportedRecordType(t) => StopReason::NonDataRecord(t),
            _ => StopReason::BadField,
        }
    }
}

/// One accepted data record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// 1-based line number.
    pub line: usize,
    pub address: u16,
    pub data: Vec<u8>,
    /// False when the record was kept despite a checksum mismatch.
    pub checksum_valid: bool,
}

impl Record {
    pub fn byte_count(&self) -> usize {
        self.data.len()
    }
}

fn record_type(record: &HexRecord) -> u8 {
    match record {
        HexRecord::Data { .. } => DATA_RECORD,
        HexRecord::EndOfFile => 0x01,
        HexRecord::ExtendedSegmentAddress(_) => 0x02,
        HexRecord::StartSegmentAddress { .. } => 0x03,
        HexRecord::ExtendedLinearAddress(_) => 0x04,
        HexRecord::StartLinearAddress(_) => 0x05,
    }
}

/// Data record with a bad checksum. The reader has already checked the
/// framing, so only the fields are taken apart here.
fn unchecked_data(line: &str) -> Result<(u16, Vec<u8>), StopReason> {
    let body = line.strip_prefix(START_CODE).ok_or(StopReason::NotARecord)?;
    let raw = bytes::decode_hex(body).map_err(|_| StopReason::BadField)?;
    match raw.as_slice() {
        [count, hi, lo, kind, rest @ ..] if rest.len() == *count as usize + 1 => {
            if *kind != DATA_RECORD {
                return Err(StopReason::NonDataRecord(*kind));
            }
            Ok((u16::from_be_bytes([*hi, *lo]), rest[..*count as usize].to_vec()))
        }
        _ => Err(StopReason::LengthMismatch),
    }
}

/// Iterator over the leading data records of an Intel-Hex text.
pub struct Records<'a> {
    lines: std::iter::Enumerate<std::str::Lines<'a>>,
    stop: Option<(usize, StopReason)>,
}

impl Records<'_> {
    /// Line and reason unpacking stopped at, once iteration has ended.
    pub fn stop(&self) -> Option<&(usize, StopReason)> {
        self.stop.as_ref()
    }

    fn parse_line(line: usize, text: &str) -> Result<Record, StopReason> {
        let text = text.trim_end();
        if !text.starts_with(START_CODE) {
            return Err(StopReason::NotARecord);
        }
        match HexRecord::from_record_string(text) {
            Ok(HexRecord::Data { offset, value }) => Ok(Record {
                line,
                address: offset,
                data: value,
                checksum_valid: true,
            }),
            Ok(other) => Err(StopReason::NonDataRecord(record_type(&other))),
            Err(ReaderError::ChecksumMismatch(..)) => {
                let (address, data) = unchecked_data(text)?;
                warn!(line, "Intel-Hex checksum mismatch, record kept");
                Ok(Record {
                    line,
                    address,
                    data,
                    checksum_valid: false,
                })
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl Iterator for Records<'_> {
    type Item = Record;

    fn next(&mut self) -> Option<Self::Item> {
        if self.stop.is_some() {
            return None;
        }
        let Some((i, text)) = self.lines.next() else {
            self.stop = Some((0, StopReason::EndOfInput));
            return None;
        };
        match Self::parse_line(i + 1, text) {
            Ok(record) => Some(record),
            Err(reason) => {
                self.stop = Some((i + 1, reason));
                None
            }
        }
    }
}

/// Iterate the data records at the start of `text`.
pub fn records(text: &str) -> Records<'_> {
    Records {
        lines: text.lines().enumerate(),
        stop: None,
    }
}

/// Concatenate the data payloads into one hex string.
pub fn unpack(text: &str) -> String {
    unpack_observed(text, &NullObserver)
}

pub fn unpack_observed<O: DecodeObserver + ?Sized>(text: &str, observer: &O) -> String {
    let mut data = Vec::new();
    let mut iter = records(text);
    let mut count = 0usize;
    for record in iter.by_ref() {
        data.extend_from_slice(&record.data);
        count += 1;
    }
    if let Some((line, reason)) = iter.stop()
        && *reason != StopReason::EndOfInput
    {
        observer.on_event(&DecodeEvent::HexStopped {
            line: *line,
            reason: reason.to_string(),
        });
    }
    observer.on_event(&DecodeEvent::HexUnpacked {
        records: count,
        bytes: data.len(),
    });
    bytes::encode_hex(&data)
}

/// Unpack straight to binary.
pub fn unpack_bytes(text: &str) -> Vec<u8> {
    records(text).flat_map(|r| r.data).collect()
}
