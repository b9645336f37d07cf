//! Event payload interpretation.

use byteorder::{ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};

use crate::apdu::{ApduHeader, COMMAND_HEADER_LEN, CommandMeaning, STATUS_WORD_LEN, StatusWord};
use crate::error::DecodeError;
use crate::tlv::TlvNode;

use super::decluster::LogEvent;
use super::kind::EventKind;

/// Bytes per timer value in a timing event.
pub const TIMESTAMP_LEN: usize = 4;

/// Conversion from timer ticks to milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimerScale {
    pub scale_numerator: u64,
    pub scale_denominator: u64,
}

impl Default for TimerScale {
    fn default() -> Self {
        Self {
            scale_numerator: 1024,
            scale_denominator: 1000,
        }
    }
}

impl TimerScale {
    pub fn to_millis(&self, ticks: u32) -> u64 {
        u64::from(ticks) * self.scale_numerator / self.scale_denominator.max(1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timestamp {
    pub ticks: u32,
    pub millis: u64,
}

/// What a payload decodes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Annotation {
    /// Nothing beyond the raw bytes.
    None,
    Timestamps(Vec<Timestamp>),
    /// Response data between the procedure byte and the status word.
    Tlv {
        tree: TlvNode,
        status: Option<StatusWord>,
    },
    Status(StatusWord),
    Command {
        header: ApduHeader,
        meaning: CommandMeaning,
    },
    /// The payload looked like TLV but did not parse.
    Failed(DecodeError),
}

/// Interpret the payload of one event.
pub fn annotate(event: &LogEvent, scale: &TimerScale, max_depth: usize) -> Annotation {
    let payload = event.payload.as_slice();

    if event.kind.carries_timestamp() {
        let stamps = payload
            .chunks_exact(TIMESTAMP_LEN)
            .map(|chunk| {
                let ticks = LittleEndian::read_u32(chunk);
                Timestamp {
                    ticks,
                    millis: scale.to_millis(ticks),
                }
            })
            .collect();
        return Annotation::Timestamps(stamps);
    }

    match event.kind {
        EventKind::ByteToTerminal | EventKind::ByteFromIcc => {
            if payload.len() > 3 {
                // procedure byte, data, SW1 SW2
                let data = &payload[1..payload.len() - STATUS_WORD_LEN];
                let status = StatusWord::from_bytes(&payload[payload.len() - STATUS_WORD_LEN..]);
                match TlvNode::parse_with_limit(data, max_depth) {
                    Ok(tree) => Annotation::Tlv { tree, status },
                    Err(e) => Annotation::Failed(e),
                }
            } else if payload.len() == STATUS_WORD_LEN {
                StatusWord::from_bytes(payload)
                    .map(Annotation::Status)
                    .unwrap_or(Annotation::None)
            } else {
                Annotation::None
            }
        }
        EventKind::ByteFromTerminal | EventKind::ByteToIcc
            if payload.len() == COMMAND_HEADER_LEN =>
        {
            match ApduHeader::from_bytes(payload) {
                Some(header) => Annotation::Command {
                    header,
                    meaning: header.code().lookup(),
                },
                None => Annotation::None,
            }
        }
        _ => Annotation::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytes::decode_hex;
    use crate::tlv::DEFAULT_MAX_DEPTH;

    fn event(kind: EventKind, payload: &str) -> LogEvent {
        LogEvent {
            kind,
            offset: 0,
            payload: decode_hex(payload).unwrap(),
        }
    }

    fn run(e: &LogEvent) -> Annotation {
        annotate(e, &TimerScale::default(), DEFAULT_MAX_DEPTH)
    }

    #[test]
    fn test_timestamps() {
        // 1000 ticks, then 2000 ticks, then a stray byte
        let e = event(EventKind::TimeGeneral, "E8030000D007000001");
        match run(&e) {
            Annotation::Timestamps(stamps) => {
                assert_eq!(stamps.len(), 2);
                assert_eq!(stamps[0].ticks, 1000);
                assert_eq!(stamps[0].millis, 1024);
                assert_eq!(stamps[1].millis, 2048);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_response_tlv() {
        let e = event(
            EventKind::ByteFromIcc,
            "A46F1A840E315041592E5359532E4444463031A5088801025F2D02656E9000",
        );
        match run(&e) {
            Annotation::Tlv { tree, status } => {
                assert_eq!(tree.tag().to_hex(), "6F");
                assert_eq!(status, Some(StatusWord::OK));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_status_only() {
        let e = event(EventKind::ByteToTerminal, "6A82");
        assert_eq!(run(&e), Annotation::Status(StatusWord::from_u16(0x6A82)));
    }

    #[test]
    fn test_command_header() {
        let e = event(EventKind::ByteFromTerminal, "00B2010C00");
        match run(&e) {
            Annotation::Command { header, meaning } => {
                assert_eq!(header.p1, 0x01);
                assert_eq!(meaning.to_string(), "(READ RECORD)");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(run(&event(EventKind::ByteToIcc, "00B2")), Annotation::None);
    }

    #[test]
    fn test_bad_tlv_is_reported() {
        let e = event(EventKind::ByteFromIcc, "606F05019000");
        assert!(matches!(run(&e), Annotation::Failed(_)));
    }

    #[test]
    fn test_zero_denominator() {
        let scale = TimerScale {
            scale_numerator: 1,
            scale_denominator: 0,
        };
        assert_eq!(scale.to_millis(5), 5);
    }
}
