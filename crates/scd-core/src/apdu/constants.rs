//! EMV / ISO 7816-4 command and status tables.
//!
//! Patterns are four hex nibbles where `x` matches any nibble. Command
//! patterns always wildcard the second nibble (the logical-channel / secure
//! messaging bits of CLA).

use super::command::Direction;

/// Invalid command the probe injects to signal card removal.
/// CLA 0x6B sits in the RFU range and INS 0x99 (0x9X) is not allowed.
pub const ESCAPE_COMMAND: [u8; 5] = [0x6B, 0x99, 0x00, 0x00, 0x00];

/// Command header length (CLA INS P1 P2 P3).
pub const COMMAND_HEADER_LEN: usize = 5;

/// Status word length (SW1 SW2).
pub const STATUS_WORD_LEN: usize = 2;

pub const COMMANDS: &[(&str, Direction, &str)] = &[
    ("0xC0", Direction::ToTerminal, "READ MORE"),
    ("8x1E", Direction::ToCard, "APPLICATION BLOCK"),
    ("8x18", Direction::ToCard, "APPLICATION UNBLOCK"),
    ("8x16", Direction::ToCard, "CARD BLOCK"),
    ("0x82", Direction::ToCard, "EXTERNAL AUTHENTICATE"),
    ("8xAE", Direction::ToCard, "GENERATE AC"),
    ("0x84", Direction::ToTerminal, "GET CHALLENGE"),
    ("8xCA", Direction::ToTerminal, "GET DATA"),
    ("8xA8", Direction::ToCard, "GET PROCESSING OPTIONS"),
    ("0x88", Direction::ToCard, "INTERNAL AUTHENTICATE"),
    ("8x24", Direction::ToCard, "PIN CHANGE/UNBLOCK"),
    ("0xB2", Direction::ToTerminal, "READ RECORD"),
    ("0xA4", Direction::ToCard, "SELECT/READ FILE"),
    ("0x20", Direction::ToCard, "VERIFY"),
    ("4x41", Direction::ToCard, "TEST A TO CARD"),
    ("4x42", Direction::ToTerminal, "TEST B TO TERM"),
];

/// Enumerated status words, most specific entries first within each class.
pub const STATUS_WORDS: &[(&str, &str)] = &[
    // Normal processing
    ("9000", "OK"),
    // Warning, non-volatile memory unchanged
    ("6200", "Warning: state of non-volatile memory unchanged"),
    ("6281", "Warning: part of returned data may be corrupted"),
    ("6282", "Warning: End of file/record reached before reading Le bytes"),
    ("6283", "Selected file invalidated"),
    ("6284", "FCI not formatted according to 1.1.5"),
    ("62xx", "Warning: state of non-volatile memory unchanged"),
    // Warning, non-volatile memory changed
    ("6300", "Warning: state of non-volatile memory changed"),
    ("6381", "Warning: file filled up by the last write"),
    ("63xx", "Warning: state of non-volatile memory changed"),
    // Execution errors
    ("6400", "Error: state of non-volatile memory unchanged"),
    ("64xx", "Error: state of non-volatile memory unchanged"),
    ("6500", "Error: state of non-volatile memory changed"),
    ("6581", "Error: memory failure"),
    ("65xx", "Error: state of non-volatile memory changed"),
    // Checking errors
    ("6700", "Wrong length"),
    ("6800", "Checking error: functions in CLA not supported"),
    ("6881", "Checking error: logical channel not supported"),
    ("6882", "Checking error: secure messaging not supported"),
    ("68xx", "Checking error: functions in CLA not supported"),
    ("6900", "Checking error: command not allowed"),
    ("6981", "Checking error: Command incompatible with file structure"),
    ("6982", "Checking error: security status not satisfied"),
    ("6983", "Checking error: authentication method blocked"),
    ("6984", "Checking error: referenced data invalidated"),
    ("6985", "Checking error: conditions of use not satisfied"),
    ("6986", "Checking error: command not allowed (no current EF)"),
    ("6987", "Checking error: expected SM data objects missing"),
    ("6988", "Checking error: SM data objects incorrect"),
    ("69xx", "Checking error: command not allowed"),
    ("6A00", "Checking error: wrong parameters P1-P2 (a)"),
    ("6A80", "Checking error: incorrect parameters in the data field"),
    ("6A81", "Checking error: function not supported"),
    ("6A82", "Checking error: file not found"),
    ("6A83", "Checking error: record not found"),
    ("6A84", "Checking error: not enough memory space in the file"),
    ("6A85", "Checking error: Lc inconsistent with TLV structure"),
    ("6A86", "Checking error: wrong parameters P1-P2 (b)"),
    ("6A87", "Checking error: Lc inconsistent with P1-P2"),
    ("6A88", "Checking error: referenced data not found"),
    ("6Axx", "Checking error: wrong parameters P1-P2"),
    ("6B00", "Checking error: wrong parameters P1-P2 (c)"),
    ("6D00", "Instruction code not supported or invalid"),
    ("6E00", "Class not supported"),
    ("6F00", "No precise diagnosis"),
];
