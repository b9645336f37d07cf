//! EEPROM dump layout.
//!
//! The first 128 bytes of the probe's EEPROM hold runtime state; the event
//! log follows and grows up to the address stored in the log pointer.

use std::ops::Range;

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{DecodeError, Notice};
use crate::events::{DecodeEvent, DecodeObserver};

/// Warm-reset flag (1 byte).
pub const WARM_RESET_OFFSET: usize = 0x00;
/// Value of the warm-reset byte after a watchdog-triggered restart.
pub const WARM_RESET_MAGIC: u8 = 0xAA;
/// Selected application (1 byte).
pub const APPLICATION_OFFSET: usize = 0x32;
/// Transaction counter (1 byte).
pub const TRANSACTION_COUNTER_OFFSET: usize = 0x40;

/// Configurable offsets of the dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EepromLayout {
    /// Timer counter, little-endian u32.
    pub counter_offset: usize,
    /// Log end pointer, big-endian u16.
    pub log_pointer_offset: usize,
    /// First byte of the log.
    pub log_data_offset: usize,
    /// Total EEPROM size.
    pub size: usize,
}

impl Default for EepromLayout {
    fn default() -> Self {
        Self {
            counter_offset: 0x04,
            log_pointer_offset: 0x48,
            log_data_offset: 0x80,
            size: 4096,
        }
    }
}

impl EepromLayout {
    /// Bytes a dump needs before any header field can be read.
    pub fn header_len(&self) -> usize {
        [
            self.log_data_offset,
            self.counter_offset + 4,
            self.log_pointer_offset + 2,
            APPLICATION_OFFSET + 1,
            TRANSACTION_COUNTER_OFFSET + 1,
        ]
        .into_iter()
        .max()
        .unwrap_or(self.log_data_offset)
    }
}

/// Metadata stored ahead of the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EepromHeader {
    pub warm_reset: bool,
    pub timer: u32,
    pub application: u8,
    pub transaction_counter: u8,
    /// Address one past the last log byte.
    pub log_end: u16,
}

impl EepromHeader {
    pub fn from_bytes(dump: &[u8], layout: &EepromLayout) -> Result<Self, DecodeError> {
        let expected = layout.header_len();
        if dump.len() < expected {
            return Err(DecodeError::DumpTooSmall {
                expected,
                actual: dump.len(),
            });
        }

        let timer = &dump[layout.counter_offset..layout.counter_offset + 4];
        let pointer = &dump[layout.log_pointer_offset..layout.log_pointer_offset + 2];
        Ok(Self {
            warm_reset: dump[WARM_RESET_OFFSET] == WARM_RESET_MAGIC,
            timer: LittleEndian::read_u32(timer),
            application: dump[APPLICATION_OFFSET],
            transaction_counter: dump[TRANSACTION_COUNTER_OFFSET],
            log_end: BigEndian::read_u16(pointer),
        })
    }
}

/// A parsed dump: header plus the live log slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EepromDump<'a> {
    /// `None` when the dump is too short to hold the header.
    pub header: Option<EepromHeader>,
    /// Byte range of the log within the dump.
    pub region: Range<usize>,
    pub log: &'a [u8],
    pub notices: Vec<Notice>,
}

/// Split a dump into header and log region.
///
/// A log pointer beyond the dump (or the EEPROM size) is clamped with a
/// notice; a pointer at or before the log start gives an empty log. A dump
/// too short for the header gives no header, an empty log and a notice.
pub fn read_dump<'a, O: DecodeObserver + ?Sized>(
    dump: &'a [u8],
    layout: &EepromLayout,
    observer: &O,
) -> EepromDump<'a> {
    let start = layout.log_data_offset;
    let mut notices = Vec::new();

    let header = match EepromHeader::from_bytes(dump, layout) {
        Ok(header) => header,
        Err(error) => {
            warn!(bytes = dump.len(), "EEPROM dump too small for its header");
            observer.on_event(&DecodeEvent::Notice {
                message: error.to_string(),
            });
            notices.push(Notice::new("EEPROM header", error));
            let empty = start.min(dump.len());
            return EepromDump {
                header: None,
                region: empty..empty,
                log: &[],
                notices,
            };
        }
    };

    let limit = dump.len().min(layout.size.max(start));
    let pointer = header.log_end as usize;
    let end = if pointer <= start {
        start
    } else if pointer > limit {
        let error = DecodeError::TruncatedLog {
            offset: start,
            needed: pointer - start,
            available: limit - start,
        };
        warn!(pointer, limit, "Log pointer past end of dump, clamped");
        observer.on_event(&DecodeEvent::Notice {
            message: error.to_string(),
        });
        notices.push(Notice::new("log pointer", error));
        limit
    } else {
        pointer
    };

    observer.on_event(&DecodeEvent::LogRegion { start, end });
    EepromDump {
        header: Some(header),
        region: start..end,
        log: &dump[start..end],
        notices,
    }
}
