//! Event type codes recorded by the probe firmware.

use std::fmt;

/// Broad grouping of event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventCategory {
    /// A byte passed through the probe.
    ByteTransfer,
    /// Terminal-side line conditions.
    Terminal,
    /// Card-side line conditions.
    Icc,
    /// Timestamps.
    Timing,
    /// Firmware faults.
    Fault,
    Unknown,
}

/// Event type (top 6 bits of a log record header).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    AtrByteFromIcc,
    AtrByteToTerminal,
    ByteToTerminal,
    ByteFromTerminal,
    ByteToIcc,
    ByteFromIcc,
    AtrFromUsb,
    TerminalClockActive,
    TerminalResetLow,
    TerminalTimedOut,
    TerminalReceiveError,
    TerminalSendError,
    TerminalNoClock,
    IccActivated,
    IccDeactivated,
    IccResetHigh,
    IccReceiveError,
    IccSendError,
    IccInserted,
    TimeDataToIcc,
    TimeGeneral,
    AllocationError,
    WatchdogReset,
    Unknown(u8),
}

/// Highest code a 6-bit type field can hold.
pub const MAX_EVENT_CODE: u8 = 0x3F;

impl EventKind {
    pub fn from_code(code: u8) -> Self {
        match code {
            0x00 => EventKind::AtrByteFromIcc,
            0x01 => EventKind::AtrByteToTerminal,
            0x02 => EventKind::ByteToTerminal,
            0x03 => EventKind::ByteFromTerminal,
            0x04 => EventKind::ByteToIcc,
            0x05 => EventKind::ByteFromIcc,
            0x06 => EventKind::AtrFromUsb,
            0x10 => EventKind::TerminalClockActive,
            0x11 => EventKind::TerminalResetLow,
            0x12 => EventKind::TerminalTimedOut,
            0x13 => EventKind::TerminalReceiveError,
            0x14 => EventKind::TerminalSendError,
            0x15 => EventKind::TerminalNoClock,
            0x20 => EventKind::IccActivated,
            0x21 => EventKind::IccDeactivated,
            0x22 => EventKind::IccResetHigh,
            0x23 => EventKind::IccReceiveError,
            0x24 => EventKind::IccSendError,
            0x25 => EventKind::IccInserted,
            0x30 => EventKind::TimeDataToIcc,
            0x31 => EventKind::TimeGeneral,
            0x32 => EventKind::AllocationError,
            0x33 => EventKind::WatchdogReset,
            other => EventKind::Unknown(other),
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            EventKind::AtrByteFromIcc => 0x00,
            EventKind::AtrByteToTerminal => 0x01,
            EventKind::ByteToTerminal => 0x02,
            EventKind::ByteFromTerminal => 0x03,
            EventKind::ByteToIcc => 0x04,
            EventKind::ByteFromIcc => 0x05,
            EventKind::AtrFromUsb => 0x06,
            EventKind::TerminalClockActive => 0x10,
            EventKind::TerminalResetLow => 0x11,
            EventKind::TerminalTimedOut => 0x12,
            EventKind::TerminalReceiveError => 0x13,
            EventKind::TerminalSendError => 0x14,
            EventKind::TerminalNoClock => 0x15,
            EventKind::IccActivated => 0x20,
            EventKind::IccDeactivated => 0x21,
            EventKind::IccResetHigh => 0x22,
            EventKind::IccReceiveError => 0x23,
            EventKind::IccSendError => 0x24,
            EventKind::IccInserted => 0x25,
            EventKind::TimeDataToIcc => 0x30,
            EventKind::TimeGeneral => 0x31,
            EventKind::AllocationError => 0x32,
            EventKind::WatchdogReset => 0x33,
            EventKind::Unknown(code) => *code,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            EventKind::AtrByteFromIcc => "ATR Byte from ICC",
            EventKind::AtrByteToTerminal => "ATR Byte to Terminal",
            EventKind::ByteToTerminal => "Byte to Terminal",
            EventKind::ByteFromTerminal => "Byte from Terminal",
            EventKind::ByteToIcc => "Byte to ICC",
            EventKind::ByteFromIcc => "Byte from ICC",
            EventKind::AtrFromUsb => "ATR from USB",
            EventKind::TerminalClockActive => "Terminal clock active",
            EventKind::TerminalResetLow => "Terminal reset low",
            EventKind::TerminalTimedOut => "Terminal timed out",
            EventKind::TerminalReceiveError => "Error receiving byte from terminal",
            EventKind::TerminalSendError => "Error sending byte to terminal",
            EventKind::TerminalNoClock => "No clock from terminal",
            EventKind::IccActivated => "ICC activated",
            EventKind::IccDeactivated => "ICC deactivated",
            EventKind::IccResetHigh => "ICC reset high",
            EventKind::IccReceiveError => "Error receiving byte from ICC",
            EventKind::IccSendError => "Error sending byte to ICC",
            EventKind::IccInserted => "ICC inserted",
            EventKind::TimeDataToIcc => "Time data sent to ICC",
            EventKind::TimeGeneral => "Time for a general event",
            EventKind::AllocationError => "Error allocating memory",
            EventKind::WatchdogReset => "Watchdog timer reset",
            EventKind::Unknown(_) => "Unknown event",
        }
    }

    pub fn category(&self) -> EventCategory {
        match self.code() {
            _ if matches!(self, EventKind::Unknown(_)) => EventCategory::Unknown,
            0x00..=0x06 => EventCategory::ByteTransfer,
            0x10..=0x15 => EventCategory::Terminal,
            0x20..=0x25 => EventCategory::Icc,
            0x30 | 0x31 => EventCategory::Timing,
            _ => EventCategory::Fault,
        }
    }

    /// Payload is a sequence of 4-byte little-endian timer values.
    pub fn carries_timestamp(&self) -> bool {
        self.category() == EventCategory::Timing
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Unknown(code) => write!(f, "Unknown event 0x{:02X}", code),
            other => write!(f, "{}", other.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_round_trip() {
        for code in 0..=MAX_EVENT_CODE {
            assert_eq!(EventKind::from_code(code).code(), code);
        }
    }

    #[test]
    fn test_categories() {
        assert_eq!(EventKind::ByteFromIcc.category(), EventCategory::ByteTransfer);
        assert_eq!(EventKind::TerminalTimedOut.category(), EventCategory::Terminal);
        assert_eq!(EventKind::IccInserted.category(), EventCategory::Icc);
        assert_eq!(EventKind::WatchdogReset.category(), EventCategory::Fault);
        assert_eq!(EventKind::from_code(0x07).category(), EventCategory::Unknown);
        assert!(EventKind::TimeGeneral.carries_timestamp());
        assert!(!EventKind::ByteToIcc.carries_timestamp());
    }

    #[test]
    fn test_display() {
        assert_eq!(EventKind::from_code(0x25).to_string(), "ICC inserted");
        assert_eq!(EventKind::from_code(0x3A).to_string(), "Unknown event 0x3A");
    }
}
