//! Text reports for extracted traces and event logs.
//!
//! Reports list everything that decoded, in input order, and finish with a
//! `Notices` section naming whatever could not be decoded.

use crate::apdu::CommandMeaning;
use crate::bytes::encode_hex;
use crate::config::DecoderConfig;
use crate::error::Notice;
use crate::eventlog::{Annotation, Declustered, EepromDump, EepromHeader, LogEvent, annotate};
use crate::trace::{Exchange, Extraction};

/// Render a trace extraction.
pub fn render_trace(extraction: &Extraction, config: &DecoderConfig) -> String {
    let mut out = String::new();
    let mut notices = extraction.notices.clone();

    if extraction.transactions.is_empty() {
        out.push_str("No transactions found.\n");
    }
    for tx in &extraction.transactions {
        out.push_str(&format!(
            "Transaction {} (offset {}, {} messages)\n",
            tx.index,
            tx.offset,
            tx.exchanges.len()
        ));
        for exchange in &tx.exchanges {
            out.push('\n');
            render_exchange(&mut out, tx.index, exchange, config, &mut notices);
        }
        out.push('\n');
    }

    render_notices(&mut out, &notices);
    out
}

fn render_exchange(
    out: &mut String,
    transaction: usize,
    exchange: &Exchange,
    config: &DecoderConfig,
    notices: &mut Vec<Notice>,
) {
    let pad = " ".repeat(config.indent_width);
    let command = &exchange.command;
    let response = &exchange.response;

    out.push_str(&format!("message {}:\n", exchange.index));
    out.push_str(&format!("command: {}\n", encode_hex(command.raw())));
    if let Some(header) = command.header() {
        out.push_str(&format!("{pad}header: {} {}\n", header, command.name()));
        if header.is_escape() {
            out.push_str(&format!("{pad}(card removed)\n"));
        }
    }
    out.push_str(&format!("{pad}data: {}\n", encode_hex(command.data())));

    out.push_str(&format!("response: {}\n", encode_hex(response.raw())));
    if let Some(sw) = response.status_word() {
        out.push_str(&format!("{pad}status: {}\n", sw));
    }
    out.push_str(&format!("{pad}data: {}\n", encode_hex(response.data())));

    if !config.decode_response_tlv {
        return;
    }
    match response.tlv_with_limit(config.max_tlv_depth) {
        Some(Ok(tree)) => {
            out.push_str(&tree.dump_with(&config.dump_style(), 1));
            out.push('\n');
        }
        Some(Err(e)) => {
            out.push_str(&format!("{pad}(data is not TLV: {})\n", e));
            notices.push(Notice::new(
                format!(
                    "transaction {}, message {} response data",
                    transaction, exchange.index
                ),
                e,
            ));
        }
        None => {}
    }
}

fn render_header(out: &mut String, header: &EepromHeader) {
    out.push_str(&format!(
        "EEPROM: warm reset {}, timer 0x{:08X}, application 0x{:02X}, transactions {}, log end 0x{:04X}\n",
        if header.warm_reset { "yes" } else { "no" },
        header.timer,
        header.application,
        header.transaction_counter,
        header.log_end
    ));
}

/// Render a declustered event log. With `raw`, payloads are not interpreted.
pub fn render_log(
    dump: &EepromDump<'_>,
    declustered: &Declustered,
    config: &DecoderConfig,
    raw: bool,
) -> String {
    let mut out = String::new();
    let mut notices = dump.notices.clone();

    match &dump.header {
        Some(header) => render_header(&mut out, header),
        None => out.push_str("EEPROM: header unreadable\n"),
    }
    out.push_str(&format!(
        "Log: bytes {}..{} ({} bytes, {} events)\n\n",
        dump.region.start,
        dump.region.end,
        dump.log.len(),
        declustered.events.len()
    ));

    if declustered.events.is_empty() {
        out.push_str("No data available.\n");
    }
    for event in &declustered.events {
        render_event(&mut out, event, config, raw, &mut notices);
    }

    if let Some(e) = &declustered.truncated {
        notices.push(Notice::new("event log", e.clone()));
    }
    render_notices(&mut out, &notices);
    out
}

fn render_event(
    out: &mut String,
    event: &LogEvent,
    config: &DecoderConfig,
    raw: bool,
    notices: &mut Vec<Notice>,
) {
    let pad = " ".repeat(config.indent_width);
    out.push_str(&format!(
        "{:04X} {} (0x{:02X}): {}\n",
        event.offset,
        event.kind,
        event.code(),
        encode_hex(&event.payload)
    ));
    if raw {
        return;
    }

    match annotate(event, &config.timer, config.max_tlv_depth) {
        Annotation::None => {}
        Annotation::Timestamps(stamps) => {
            for stamp in stamps {
                out.push_str(&format!(
                    "{pad}time: {} ms ({} ticks)\n",
                    stamp.millis, stamp.ticks
                ));
            }
        }
        Annotation::Tlv { tree, status } => {
            out.push_str(&tree.dump_with(&config.dump_style(), 1));
            out.push('\n');
            if let Some(sw) = status {
                out.push_str(&format!("{pad}status: {}\n", sw));
            }
        }
        Annotation::Status(sw) => {
            out.push_str(&format!("{pad}status: {}\n", sw));
        }
        Annotation::Command { header, meaning } => {
            let name = match meaning {
                CommandMeaning::Known(info) => format!("{} [{}]", info.name, info.direction),
                CommandMeaning::Unknown => "Unknown command".to_string(),
            };
            out.push_str(&format!("{pad}command: {} {}\n", name, header));
        }
        Annotation::Failed(e) => {
            out.push_str(&format!("{pad}(payload is not TLV: {})\n", e));
            notices.push(Notice::new(format!("event at 0x{:04X}", event.offset), e));
        }
    }
}

/// Append the trailing notices section, if there is anything to report.
pub fn render_notices(out: &mut String, notices: &[Notice]) {
    if notices.is_empty() {
        return;
    }
    out.push_str(&format!("Notices ({}):\n", notices.len()));
    for notice in notices {
        out.push_str(&format!("  - {}\n", notice));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eventlog::{EepromLayout, decluster, read_dump};
    use crate::events::NullObserver;
    use crate::trace::extract_transactions;

    const FCI: &str = "6F1A840E315041592E5359532E4444463031A5088801025F2D02656E";

    #[test]
    fn test_trace_report() {
        let hex = format!(
            "DDDDDDDDDDCCCCCCCCCC00A4040000AAAAAAAAAA9000{}BBBBBBBBBB",
            FCI
        );
        let report = render_trace(&extract_transactions(&hex), &DecoderConfig::default());
        assert!(report.starts_with("Transaction 1 (offset 0, 1 messages)"));
        assert!(report.contains("command: 00A4040000\n"));
        assert!(report.contains("header: CLA=00 INS=A4 P1=04 P2=00 P3=00 (SELECT/READ FILE)"));
        assert!(report.contains("status: OK (0x9000)"));
        assert!(report.contains("File Control Information (FCI) Template"));
        assert!(!report.contains("Notices"));
    }

    #[test]
    fn test_trace_report_notices() {
        let hex = "DDDDDDDDDDCCCCCCCCCC00B2010C00AAAAAAAAAA9000";
        let report = render_trace(&extract_transactions(hex), &DecoderConfig::default());
        assert!(report.starts_with("No transactions found."));
        assert!(report.contains("Notices (1):"));
        assert!(report.contains("[UnterminatedTraceError]"));
    }

    #[test]
    fn test_log_report() {
        let mut dump = vec![0u8; 140];
        let log = [
            0x03 << 2 | 3,
            0x00,
            0xB2,
            0x01,
            0x0C,
            0x03 << 2,
            0x00,
            0x31 << 2 | 3,
            0xE8,
            0x03,
            0x00,
            0x00,
        ];
        dump[128..140].copy_from_slice(&log);
        dump[72..74].copy_from_slice(&140u16.to_be_bytes());

        let config = DecoderConfig::default();
        let parsed = read_dump(&dump, &EepromLayout::default(), &NullObserver);
        let events = decluster(parsed.log);
        let report = render_log(&parsed, &events, &config, false);

        assert!(report.contains("Log: bytes 128..140 (12 bytes, 2 events)"));
        assert!(report.contains("0000 Byte from Terminal (0x03): 00B2010C00"));
        assert!(report.contains("command: READ RECORD [card -> terminal] CLA=00 INS=B2"));
        assert!(report.contains("time: 1024 ms (1000 ticks)"));

        let raw = render_log(&parsed, &events, &config, true);
        assert!(!raw.contains("time:"));
    }
}
