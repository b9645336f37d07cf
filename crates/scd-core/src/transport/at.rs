//! AT command set understood by the probe firmware.

use std::fmt;

/// Appended to every command on the wire.
pub const LINE_TERMINATOR: &str = "\r\n";

/// Reply closing a successful command.
pub const REPLY_OK: &str = "AT OK";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AtCommand {
    /// No operation, used to check the link.
    None,
    /// Reset the probe.
    Reset,
    /// Act as a plain pass-through terminal.
    Terminal,
    /// Act as a terminal driven over USB.
    TerminalUsb,
    /// Log the terminal/card exchange.
    Log,
    /// Filter the PIN out of VERIFY commands.
    DummyPin,
    /// Dump the EEPROM as Intel-Hex.
    GetEeprom,
    /// Erase the EEPROM.
    EraseEeprom,
    /// Enter the bootloader.
    Bootloader,
    /// Start a card session driven over USB.
    CardInit,
    /// Send an APDU to the card.
    CardApdu,
    /// Wait for the terminal.
    TerminalWait,
    /// Send data over USB.
    UsbData,
    /// End the card session.
    CardEnd,
}

impl AtCommand {
    pub const ALL: [AtCommand; 14] = [
        AtCommand::None,
        AtCommand::Reset,
        AtCommand::Terminal,
        AtCommand::TerminalUsb,
        AtCommand::Log,
        AtCommand::DummyPin,
        AtCommand::GetEeprom,
        AtCommand::EraseEeprom,
        AtCommand::Bootloader,
        AtCommand::CardInit,
        AtCommand::CardApdu,
        AtCommand::TerminalWait,
        AtCommand::UsbData,
        AtCommand::CardEnd,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AtCommand::None => "AT+CNONE",
            AtCommand::Reset => "AT+CRST",
            AtCommand::Terminal => "AT+CTERM",
            AtCommand::TerminalUsb => "AT+CTUSB",
            AtCommand::Log => "AT+CLET",
            AtCommand::DummyPin => "AT+CDPIN",
            AtCommand::GetEeprom => "AT+CGEE",
            AtCommand::EraseEeprom => "AT+CEEE",
            AtCommand::Bootloader => "AT+CGBM",
            AtCommand::CardInit => "AT+CCINIT",
            AtCommand::CardApdu => "AT+CCAPDU",
            AtCommand::TerminalWait => "AT+CTWAIT",
            AtCommand::UsbData => "AT+UDATA",
            AtCommand::CardEnd => "AT+CCEND",
        }
    }

    /// Bytes written to the serial line.
    pub fn encode(&self) -> Vec<u8> {
        format!("{}{}", self.as_str(), LINE_TERMINATOR).into_bytes()
    }

    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(text))
    }
}

impl fmt::Display for AtCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode() {
        assert_eq!(AtCommand::GetEeprom.encode(), b"AT+CGEE\r\n");
        assert_eq!(AtCommand::CardEnd.to_string(), "AT+CCEND");
    }

    #[test]
    fn test_parse() {
        assert_eq!(AtCommand::parse("at+clet\r\n"), Some(AtCommand::Log));
        assert_eq!(AtCommand::parse("AT+FOO"), None);
        for cmd in AtCommand::ALL {
            assert_eq!(AtCommand::parse(cmd.as_str()), Some(cmd));
        }
    }
}
