//! Decode session - runs one parse-and-print pass per input.

use std::sync::Arc;

use anyhow::{Result, bail};
use tracing::{info, instrument};

use crate::config::DecoderConfig;
use crate::eventlog::{decluster_observed, read_dump};
use crate::events::{DecodeObserver, TracingObserver};
use crate::ihex;
use crate::report;
use crate::tlv::TlvNode;
use crate::trace::extract_transactions_observed;
use crate::transport::ProbeTransport;

/// Decode session - owns the configuration and the observer.
pub struct DecodeSession<O: DecodeObserver> {
    config: DecoderConfig,
    observer: Arc<O>,
    raw_log: bool,
}

impl DecodeSession<TracingObserver> {
    /// Create a new session with default tracing observer.
    pub fn new(config: DecoderConfig) -> Self {
        Self::with_observer(config, Arc::new(TracingObserver))
    }
}

impl<O: DecodeObserver> DecodeSession<O> {
    /// Create a new session with a custom observer.
    pub fn with_observer(config: DecoderConfig, observer: Arc<O>) -> Self {
        Self {
            config,
            observer,
            raw_log: false,
        }
    }

    /// Print log payloads without interpreting them.
    pub fn with_raw_log(mut self, raw: bool) -> Self {
        self.raw_log = raw;
        self
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    fn parse_tlv(&self, hex: &str) -> Result<TlvNode> {
        let data = crate::bytes::decode_hex(hex)?;
        Ok(TlvNode::parse_with_limit(&data, self.config.max_tlv_depth)?)
    }

    /// Dump a TLV object given as hex text.
    #[instrument(skip(self, hex))]
    pub fn decode_tlv(&self, hex: &str) -> Result<String> {
        let tree = self.parse_tlv(hex)?;
        info!(tag = %tree.tag(), length = tree.length(), "TLV decoded");
        Ok(tree.dump_with(&self.config.dump_style(), 0))
    }

    /// Dump the single node tagged `tag` anywhere in the tree, if any.
    #[instrument(skip(self, hex))]
    pub fn find_tlv(&self, hex: &str, tag: &str) -> Result<Option<String>> {
        let tree = self.parse_tlv(hex)?;
        let found = tree.find_one(tag)?;
        Ok(found.map(|node| node.dump_with(&self.config.dump_style(), 0)))
    }

    /// Dump the node at a `/`-separated tag path, if any.
    #[instrument(skip(self, hex))]
    pub fn lookup_tlv(&self, hex: &str, path: &str) -> Result<Option<String>> {
        let tree = self.parse_tlv(hex)?;
        Ok(tree
            .lookup(path)
            .map(|node| node.dump_with(&self.config.dump_style(), 0)))
    }

    /// Report the transactions of a trace, given as Intel-Hex or plain hex.
    #[instrument(skip(self, text), fields(len = text.len()))]
    pub fn decode_trace(&self, text: &str) -> Result<String> {
        let hex = self.hex_stream(text);
        let extraction = extract_transactions_observed(&hex, self.observer.as_ref());
        info!(
            transactions = extraction.transactions.len(),
            exchanges = extraction.exchange_count(),
            notices = extraction.notices.len(),
            "Trace decoded"
        );
        Ok(report::render_trace(&extraction, &self.config))
    }

    /// Report the event log of an Intel-Hex EEPROM dump.
    #[instrument(skip(self, text), fields(len = text.len()))]
    pub fn decode_log(&self, text: &str) -> Result<String> {
        let hex = ihex::unpack_observed(text, self.observer.as_ref());
        let dump = crate::bytes::decode_hex(&hex)?;
        let parsed = read_dump(&dump, &self.config.eeprom, self.observer.as_ref());
        let events = decluster_observed(parsed.log, self.observer.as_ref());
        info!(
            log_bytes = parsed.log.len(),
            events = events.events.len(),
            truncated = events.truncated.is_some(),
            "Log decoded"
        );
        Ok(report::render_log(&parsed, &events, &self.config, self.raw_log))
    }

    /// Fetch the EEPROM over the probe link and report its log.
    #[instrument(skip(self, transport))]
    pub fn decode_log_from<T: ProbeTransport + ?Sized>(&self, transport: &T) -> Result<String> {
        if !transport.is_connected() {
            bail!("Probe is not connected");
        }
        let text = transport.fetch_eeprom_hex()?;
        self.decode_log(&text)
    }

    /// Intel-Hex input is unpacked, anything else is taken as bare hex.
    fn hex_stream(&self, text: &str) -> String {
        if text.trim_start().starts_with(ihex::START_CODE) {
            ihex::unpack_observed(text.trim_start(), self.observer.as_ref())
        } else {
            text.chars().filter(|c| !c.is_whitespace()).collect()
        }
    }
}
