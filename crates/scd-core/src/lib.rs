//! SCD-Core: decoders for smart-card probe traces and event logs.
//!
//! The probe sits between a payment terminal and a card and records what
//! passes through it. This crate turns its raw output back into structured
//! data.
//!
//! # Architecture
//!
//! The crate is organized into layers:
//!
//! - **TLV**: BER-TLV codec with path-addressable access
//! - **APDU**: Command and status word semantics tables
//! - **Intel-Hex**: Unpacking of probe dumps
//! - **Trace**: Marker-based command/response framing
//! - **Event log**: EEPROM layout, record declustering, annotation
//! - **Transport**: Probe link abstraction (AT commands, mock)
//! - **Events**: Observer pattern for progress reporting
//! - **Session**: High-level orchestrator producing text reports
//!
//! # Example
//!
//! ```no_run
//! use scd_core::{DecodeSession, DecoderConfig};
//!
//! let session = DecodeSession::new(DecoderConfig::default());
//! let dump = std::fs::read_to_string("eeprom.hex").unwrap();
//! println!("{}", session.decode_log(&dump).unwrap());
//! ```

pub mod apdu;
pub mod bytes;
pub mod config;
pub mod error;
pub mod eventlog;
pub mod events;
pub mod ihex;
pub mod report;
pub mod session;
pub mod tlv;
pub mod trace;
pub mod transport;

// Re-exports for convenience
pub use apdu::{ApduHeader, CommandCode, CommandMeaning, Direction, StatusMeaning, StatusWord};
pub use config::DecoderConfig;
pub use error::{DecodeError, ErrorKind, Notice};
pub use eventlog::{EepromHeader, EepromLayout, EventKind, LogEvent, TimerScale};
pub use events::{DecodeEvent, DecodeObserver, NullObserver, TracingObserver};
pub use session::DecodeSession;
pub use tlv::{Tag, TlvNode};
pub use trace::{CommandApdu, Exchange, Extraction, Marker, ResponseApdu, Transaction};
pub use transport::{AtCommand, MockTransport, ProbeTransport, TransportError};
