//! Mock probe transport for testing.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use super::traits::{ProbeTransport, TransportError};

/// Mock transport replaying scripted reply lines.
pub struct MockTransport {
    /// Queued lines to return on read.
    replies: Arc<Mutex<VecDeque<String>>>,
    /// Captured writes.
    write_log: Arc<Mutex<Vec<String>>>,
    /// Whether the probe is "connected".
    connected: Arc<Mutex<bool>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            replies: Arc::new(Mutex::new(VecDeque::new())),
            write_log: Arc::new(Mutex::new(Vec::new())),
            connected: Arc::new(Mutex::new(true)),
        }
    }

    /// Queue a reply line.
    pub fn queue_line(&self, line: &str) {
        self.lock_replies().push_back(line.to_string());
    }

    /// Queue every line of a multi-line text.
    pub fn queue_text(&self, text: &str) {
        let mut replies = self.lock_replies();
        replies.extend(text.lines().map(str::to_string));
    }

    /// Get all captured writes.
    pub fn get_writes(&self) -> Vec<String> {
        self.write_log
            .lock()
            .map(|w| w.clone())
            .unwrap_or_default()
    }

    /// Simulate probe disconnect.
    pub fn disconnect(&self) {
        self.set_connected(false);
    }

    /// Simulate probe reconnect.
    pub fn reconnect(&self) {
        self.set_connected(true);
    }

    fn set_connected(&self, value: bool) {
        if let Ok(mut connected) = self.connected.lock() {
            *connected = value;
        }
    }

    fn lock_replies(&self) -> std::sync::MutexGuard<'_, VecDeque<String>> {
        self.replies.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl ProbeTransport for MockTransport {
    fn write_line(&self, line: &str) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::Disconnected);
        }
        self.write_log
            .lock()
            .map_err(|e| TransportError::WriteFailed(e.to_string()))?
            .push(line.to_string());
        Ok(())
    }

    fn read_line(&self) -> Result<String, TransportError> {
        if !self.is_connected() {
            return Err(TransportError::Disconnected);
        }
        self.lock_replies()
            .pop_front()
            .ok_or(TransportError::Timeout { timeout_ms: 1000 })
    }

    fn is_connected(&self) -> bool {
        self.connected.lock().map(|c| *c).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{AtCommand, REPLY_OK};

    #[test]
    fn test_send_command() {
        let mock = MockTransport::new();
        mock.queue_line(REPLY_OK);
        mock.queue_line("AT BAD");

        assert!(mock.send_command(AtCommand::Log).unwrap());
        assert!(!mock.send_command(AtCommand::Terminal).unwrap());
        assert_eq!(mock.get_writes(), vec!["AT+CLET", "AT+CTERM"]);

        // Queue is empty now
        assert!(mock.send_command(AtCommand::None).is_err());
    }

    #[test]
    fn test_fetch_eeprom_hex() {
        let mock = MockTransport::new();
        mock.queue_text(":020000000102FB\r\n:020002000304F5\r\nAT OK\r\n");

        let text = mock.fetch_eeprom_hex().unwrap();
        assert_eq!(text, ":020000000102FB\n:020002000304F5\n");
        assert_eq!(mock.get_writes(), vec!["AT+CGEE"]);
    }

    #[test]
    fn test_fetch_without_ok_times_out() {
        let mock = MockTransport::new();
        mock.queue_line(":020000000102FB");
        assert!(matches!(
            mock.fetch_eeprom_hex(),
            Err(TransportError::Timeout { .. })
        ));
    }

    #[test]
    fn test_mock_disconnect() {
        let mock = MockTransport::new();
        assert!(mock.is_connected());

        mock.disconnect();
        assert!(!mock.is_connected());
        assert!(mock.write_line("AT+CNONE").is_err());

        mock.reconnect();
        assert!(mock.write_line("AT+CNONE").is_ok());
    }
}
