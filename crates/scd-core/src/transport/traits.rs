//! Probe transport abstraction.
//!
//! Defines the `ProbeTransport` trait for the line-based link to the probe,
//! allowing different implementations (serial port, mock, etc.).

use thiserror::Error;
use tracing::{debug, info, warn};

use super::at::{AtCommand, REPLY_OK};

/// Upper bound on reply lines of a single EEPROM dump (4 KiB in 16-byte records).
pub const MAX_DUMP_LINES: usize = 1024;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Probe disconnected")]
    Disconnected,

    #[error("Timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("No AT OK after {lines} lines")]
    MissingOk { lines: usize },
}

/// Abstract probe link.
pub trait ProbeTransport: Send + Sync {
    /// Write one line; the implementation appends the line terminator.
    fn write_line(&self, line: &str) -> Result<(), TransportError>;

    /// Read one line without its terminator.
    fn read_line(&self) -> Result<String, TransportError>;

    /// Check if the probe is still connected.
    fn is_connected(&self) -> bool;

    /// Send a command and report whether the probe acknowledged it.
    fn send_command(&self, command: AtCommand) -> Result<bool, TransportError> {
        debug!(command = %command, "Sending");
        self.write_line(command.as_str())?;
        let reply = self.read_line()?;
        let ok = reply.trim() == REPLY_OK;
        if !ok {
            warn!(command = %command, reply = %reply.trim(), "Command not acknowledged");
        }
        Ok(ok)
    }

    /// Ask for the EEPROM and collect the Intel-Hex lines up to `AT OK`.
    fn fetch_eeprom_hex(&self) -> Result<String, TransportError> {
        self.write_line(AtCommand::GetEeprom.as_str())?;
        let mut text = String::new();
        for _ in 0..MAX_DUMP_LINES {
            let line = self.read_line()?;
            let line = line.trim();
            if line == REPLY_OK {
                info!(bytes = text.len(), "EEPROM dump received");
                return Ok(text);
            }
            text.push_str(line);
            text.push('\n');
        }
        Err(TransportError::MissingOk {
            lines: MAX_DUMP_LINES,
        })
    }
}
