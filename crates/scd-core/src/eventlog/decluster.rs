//! Event-log record framing.
//!
//! Each record is one header byte, `type << 2 | (count - 1)`, followed by
//! `count` payload bytes (1 to 4). Consecutive records of the same type are
//! merged into one event since the firmware splits long byte runs.

use crate::error::DecodeError;
use crate::events::{DecodeEvent, DecodeObserver, NullObserver};

use super::kind::EventKind;

/// Payload bytes declared by a record header.
pub fn record_len(header: u8) -> usize {
    (header & 0x03) as usize + 1
}

pub fn record_type(header: u8) -> u8 {
    header >> 2
}

/// One coalesced log event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent {
    pub kind: EventKind,
    /// Log offset of the first record of the run.
    pub offset: usize,
    pub payload: Vec<u8>,
}

impl LogEvent {
    pub fn code(&self) -> u8 {
        self.kind.code()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Declustered {
    pub events: Vec<LogEvent>,
    /// Set when the log ended inside a record.
    pub truncated: Option<DecodeError>,
}

pub fn decluster(log: &[u8]) -> Declustered {
    decluster_observed(log, &NullObserver)
}

pub fn decluster_observed<O: DecodeObserver + ?Sized>(log: &[u8], observer: &O) -> Declustered {
    let mut out = Declustered::default();
    let mut pending: Option<LogEvent> = None;
    let mut pos = 0;

    while pos < log.len() {
        let header = log[pos];
        let needed = record_len(header);
        let available = log.len() - pos - 1;
        if needed > available {
            observer.on_event(&DecodeEvent::LogTruncated {
                offset: pos,
                needed,
                available,
            });
            out.truncated = Some(DecodeError::TruncatedLog {
                offset: pos,
                needed,
                available,
            });
            break;
        }

        let kind = EventKind::from_code(record_type(header));
        let payload = &log[pos + 1..pos + 1 + needed];
        match pending.as_mut() {
            Some(event) if event.kind == kind => event.payload.extend_from_slice(payload),
            _ => {
                if let Some(done) = pending.take() {
                    emit(&mut out.events, done, observer);
                }
                pending = Some(LogEvent {
                    kind,
                    offset: pos,
                    payload: payload.to_vec(),
                });
            }
        }
        pos += 1 + needed;
    }

    if let Some(done) = pending {
        emit(&mut out.events, done, observer);
    }
    out
}

fn emit<O: DecodeObserver + ?Sized>(events: &mut Vec<LogEvent>, event: LogEvent, observer: &O) {
    observer.on_event(&DecodeEvent::EventDeclustered {
        code: event.code(),
        length: event.payload.len(),
    });
    events.push(event);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_header_fields() {
        assert_eq!(record_type(0xC7), 0x31);
        assert_eq!(record_len(0xC7), 4);
        assert_eq!(record_len(0x08), 1);
    }

    #[test]
    fn test_same_type_coalesced() {
        // type 0x05, two bytes then one byte
        let log = [0x05 << 2 | 1, 0x90, 0x00, 0x05 << 2, 0x61];
        let out = decluster(&log);
        assert!(out.truncated.is_none());
        assert_eq!(out.events.len(), 1);
        assert_eq!(out.events[0].kind, EventKind::ByteFromIcc);
        assert_eq!(out.events[0].payload, vec![0x90, 0x00, 0x61]);
    }

    #[test]
    fn test_type_change_starts_event() {
        let log = [
            0x03 << 2 | 3,
            0x00,
            0xA4,
            0x04,
            0x00,
            0x03 << 2,
            0x07,
            0x04 << 2 | 1,
            0x00,
            0xA4,
            0x20 << 2,
            0x00,
        ];
        let out = decluster(&log);
        let kinds: Vec<_> = out.events.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::ByteFromTerminal,
                EventKind::ByteToIcc,
                EventKind::IccActivated
            ]
        );
        assert_eq!(out.events[0].payload.len(), 5);
        assert_eq!(out.events[1].offset, 7);
    }

    #[test]
    fn test_truncated_log_keeps_complete_records() {
        let log = [0x02 << 2 | 1, 0x90, 0x00, 0x31 << 2 | 3, 0x01, 0x02];
        let out = decluster(&log);
        assert_eq!(out.events.len(), 1);
        assert_eq!(out.events[0].payload, vec![0x90, 0x00]);
        let err = out.truncated.unwrap();
        assert_eq!(err.kind(), ErrorKind::TruncatedLog);
        assert_eq!(
            err,
            DecodeError::TruncatedLog {
                offset: 3,
                needed: 4,
                available: 2
            }
        );
    }

    #[test]
    fn test_empty_log() {
        let out = decluster(&[]);
        assert!(out.events.is_empty());
        assert!(out.truncated.is_none());
    }
}
