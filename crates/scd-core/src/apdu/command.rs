//! Command (C-APDU) header parsing and classification.

use std::fmt;
use std::sync::LazyLock;

use tracing::warn;

use super::constants::{COMMAND_HEADER_LEN, COMMANDS, ESCAPE_COMMAND};
use super::pattern::NibblePattern;

/// Which party receives the data of a command's exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Terminal sends data to the card.
    ToCard,
    /// Card returns data to the terminal.
    ToTerminal,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::ToCard => write!(f, "terminal -> card"),
            Direction::ToTerminal => write!(f, "card -> terminal"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandInfo {
    pub direction: Direction,
    pub name: &'static str,
}

/// Result of a command table lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandMeaning {
    Known(CommandInfo),
    Unknown,
}

impl fmt::Display for CommandMeaning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandMeaning::Known(info) => write!(f, "({})", info.name),
            CommandMeaning::Unknown => write!(f, "(Unknown command)"),
        }
    }
}

static COMMAND_TABLE: LazyLock<Vec<(NibblePattern, CommandInfo)>> = LazyLock::new(|| {
    COMMANDS
        .iter()
        .filter_map(|&(pattern, direction, name)| {
            NibblePattern::parse(pattern).map(|p| (p, CommandInfo { direction, name }))
        })
        .collect()
});

/// CLA + INS pair used as the command table key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandCode {
    pub cla: u8,
    pub ins: u8,
}

impl CommandCode {
    pub fn new(cla: u8, ins: u8) -> Self {
        Self { cla, ins }
    }

    /// Take CLA and INS from the start of a command.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        match bytes {
            [cla, ins, ..] => Some(Self::new(*cla, *ins)),
            _ => None,
        }
    }

    pub fn value(&self) -> u16 {
        u16::from_be_bytes([self.cla, self.ins])
    }

    /// Most specific table entry covering the code. Every entry wildcards
    /// the second CLA nibble, so logical channels share one entry.
    pub fn lookup(&self) -> CommandMeaning {
        let code = self.value();
        COMMAND_TABLE
            .iter()
            .filter(|(pattern, _)| pattern.matches(code))
            .min_by_key(|(pattern, _)| pattern.wildcards())
            .map(|&(_, info)| CommandMeaning::Known(info))
            .unwrap_or(CommandMeaning::Unknown)
    }

    pub fn name(&self) -> Option<&'static str> {
        match self.lookup() {
            CommandMeaning::Known(info) => Some(info.name),
            CommandMeaning::Unknown => None,
        }
    }

    /// Data direction of the exchange; unknown commands are assumed to go
    /// to the card.
    pub fn direction(&self) -> Direction {
        match self.lookup() {
            CommandMeaning::Known(info) => info.direction,
            CommandMeaning::Unknown => {
                warn!(code = %format!("{:04X}", self.value()), "Failed to find command");
                Direction::ToCard
            }
        }
    }
}

impl fmt::Display for CommandCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X}{:02X}", self.cla, self.ins)
    }
}

/// Five-byte command header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApduHeader {
    pub cla: u8,
    pub ins: u8,
    pub p1: u8,
    pub p2: u8,
    /// Lc or Le depending on the case of the command.
    pub p3: u8,
}

impl ApduHeader {
    pub const SIZE: usize = COMMAND_HEADER_LEN;

    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        match bytes {
            [cla, ins, p1, p2, p3, ..] => Some(Self {
                cla: *cla,
                ins: *ins,
                p1: *p1,
                p2: *p2,
                p3: *p3,
            }),
            _ => None,
        }
    }

    pub fn to_bytes(&self) -> [u8; COMMAND_HEADER_LEN] {
        [self.cla, self.ins, self.p1, self.p2, self.p3]
    }

    pub fn code(&self) -> CommandCode {
        CommandCode::new(self.cla, self.ins)
    }

    /// The probe's card-removal marker.
    pub fn is_escape(&self) -> bool {
        self.to_bytes() == ESCAPE_COMMAND
    }
}

impl fmt::Display for ApduHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CLA={:02X} INS={:02X} P1={:02X} P2={:02X} P3={:02X}",
            self.cla, self.ins, self.p1, self.p2, self.p3
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_ignores_channel_nibble() {
        let plain = CommandCode::new(0x80, 0xAE);
        let channel = CommandCode::new(0x83, 0xAE);
        assert_eq!(plain.name(), Some("GENERATE AC"));
        assert_eq!(channel.lookup(), plain.lookup());
    }

    #[test]
    fn test_select_and_read_record() {
        let select = CommandCode::from_bytes(&[0x00, 0xA4, 0x04, 0x00]).unwrap();
        assert_eq!(select.name(), Some("SELECT/READ FILE"));
        assert_eq!(select.direction(), Direction::ToCard);

        let read = CommandCode::new(0x00, 0xB2);
        assert_eq!(read.direction(), Direction::ToTerminal);
    }

    #[test]
    fn test_unknown_command() {
        let code = CommandCode::new(0x00, 0x01);
        assert_eq!(code.lookup(), CommandMeaning::Unknown);
        assert_eq!(code.direction(), Direction::ToCard);
        assert_eq!(code.lookup().to_string(), "(Unknown command)");
    }

    #[test]
    fn test_header() {
        let header = ApduHeader::from_bytes(&[0x00, 0xA4, 0x04, 0x00, 0x0E, 0x31]).unwrap();
        assert_eq!(header.p3, 0x0E);
        assert_eq!(header.code().to_string(), "00A4");
        assert!(!header.is_escape());
        assert!(ApduHeader::from_bytes(&ESCAPE_COMMAND).unwrap().is_escape());
        assert!(ApduHeader::from_bytes(&[0x00, 0xA4]).is_none());
    }
}
