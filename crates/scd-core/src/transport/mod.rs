//! Probe link.
//!
//! The probe talks a line-based AT protocol over a serial port. Only the
//! interface and a scripted mock live here; a concrete serial backend plugs in
//! by implementing [`ProbeTransport`].

pub mod at;
pub mod mock;
pub mod traits;

pub use at::{AtCommand, LINE_TERMINATOR, REPLY_OK};
pub use mock::MockTransport;
pub use traits::{ProbeTransport, TransportError};
