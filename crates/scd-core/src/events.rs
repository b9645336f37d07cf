//! Decode progress events.
//!
//! Decoders report framing decisions and recoverable corruption through a
//! [`DecodeObserver`] so the CLI (or a test) can watch a pass without the
//! decoders knowing how the information is presented.

use crate::trace::Marker;

/// Events emitted while decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeEvent {
    /// Intel-Hex unpacking finished.
    HexUnpacked { records: usize, bytes: usize },
    /// Intel-Hex unpacking stopped before the end of the input.
    HexStopped { line: usize, reason: String },
    /// A transaction start marker was found.
    TransactionStarted { index: usize, offset: usize },
    /// A command/response pair was framed.
    ExchangeFramed {
        transaction: usize,
        index: usize,
        command_len: usize,
        response_len: usize,
    },
    /// A marker-like pattern was skipped (odd nibble offset or wrong status nibble).
    MarkerRejected { marker: Marker, offset: usize },
    /// A start marker without end marker; the partial transaction is dropped.
    TransactionUnterminated { offset: usize },
    /// The live log region of an EEPROM dump.
    LogRegion { start: usize, end: usize },
    /// One coalesced log event.
    EventDeclustered { code: u8, length: usize },
    /// The log ended in the middle of a record.
    LogTruncated {
        offset: usize,
        needed: usize,
        available: usize,
    },
    /// Anything else worth telling the user.
    Notice { message: String },
}

/// Observer trait for receiving decode events.
pub trait DecodeObserver: Send + Sync {
    fn on_event(&self, event: &DecodeEvent);
}

/// Observer that discards all events.
pub struct NullObserver;

impl DecodeObserver for NullObserver {
    fn on_event(&self, _event: &DecodeEvent) {}
}

/// Observer that logs events using tracing.
pub struct TracingObserver;

impl DecodeObserver for TracingObserver {
    fn on_event(&self, event: &DecodeEvent) {
        match event {
            DecodeEvent::HexUnpacked { records, bytes } => {
                tracing::debug!(records, bytes, "Intel-Hex unpacked");
            }
            DecodeEvent::HexStopped { line, reason } => {
                tracing::debug!(line, reason = %reason, "Intel-Hex unpacking stopped");
            }
            DecodeEvent::TransactionStarted { index, offset } => {
                tracing::info!(index, offset, "Transaction found");
            }
            DecodeEvent::ExchangeFramed {
                transaction,
                index,
                command_len,
                response_len,
            } => {
                tracing::debug!(
                    transaction,
                    index,
                    command_len,
                    response_len,
                    "Exchange framed"
                );
            }
            DecodeEvent::MarkerRejected { marker, offset } => {
                tracing::debug!(marker = %marker, offset, "Marker candidate rejected");
            }
            DecodeEvent::TransactionUnterminated { offset } => {
                tracing::warn!(offset, "Transaction has no end marker, dropped");
            }
            DecodeEvent::LogRegion { start, end } => {
                tracing::info!(start, end, "Log region located");
            }
            DecodeEvent::EventDeclustered { code, length } => {
                tracing::trace!(code = %format!("0x{:02X}", code), length, "Log event");
            }
            DecodeEvent::LogTruncated {
                offset,
                needed,
                available,
            } => {
                tracing::warn!(offset, needed, available, "Log truncated mid-record");
            }
            DecodeEvent::Notice { message } => {
                tracing::warn!("{}", message);
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::*;

    /// Observer that keeps every event for inspection.
    #[derive(Default)]
    pub struct RecordingObserver {
        events: Mutex<Vec<DecodeEvent>>,
    }

    impl RecordingObserver {
        pub fn events(&self) -> Vec<DecodeEvent> {
            self.events.lock().unwrap().clone()
        }
    }

    impl DecodeObserver for RecordingObserver {
        fn on_event(&self, event: &DecodeEvent) {
            self.events.lock().unwrap().push(event.clone());
        }
    }
}
