//! Decoder configuration.

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

use crate::eventlog::{EepromLayout, TimerScale};
use crate::tlv::{DEFAULT_MAX_DEPTH, DumpStyle};

/// Configuration for a decode session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Deepest TLV nesting accepted before parsing fails.
    pub max_tlv_depth: usize,
    /// Primitive values up to this many bytes print their ASCII inline.
    pub inline_value_limit: usize,
    /// Spaces per nesting level in dumps.
    pub indent_width: usize,
    /// TLV-decode response data in trace reports.
    pub decode_response_tlv: bool,
    pub eeprom: EepromLayout,
    pub timer: TimerScale,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            max_tlv_depth: DEFAULT_MAX_DEPTH,
            inline_value_limit: 10,
            indent_width: 4,
            decode_response_tlv: true,
            eeprom: EepromLayout::default(),
            timer: TimerScale::default(),
        }
    }
}

impl DecoderConfig {
    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: DecoderConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_tlv_depth == 0 {
            bail!("max_tlv_depth must be at least 1");
        }
        if self.timer.scale_denominator == 0 {
            bail!("timer.scale_denominator must not be zero");
        }
        Ok(())
    }

    pub fn dump_style(&self) -> DumpStyle {
        DumpStyle {
            indent_width: self.indent_width,
            inline_limit: self.inline_value_limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DecoderConfig::default();
        assert_eq!(config.max_tlv_depth, 32);
        assert_eq!(config.eeprom.log_pointer_offset, 72);
        assert_eq!(config.eeprom.log_data_offset, 128);
        assert_eq!(config.timer.scale_numerator, 1024);
        assert_eq!(config.dump_style(), DumpStyle::default());
    }

    #[test]
    fn test_partial_toml() {
        let config: DecoderConfig = toml::from_str(
            "indent_width = 2\n\n[eeprom]\nlog_data_offset = 256\n",
        )
        .unwrap();
        assert_eq!(config.indent_width, 2);
        assert_eq!(config.eeprom.log_data_offset, 256);
        assert_eq!(config.eeprom.log_pointer_offset, 72);
        assert!(config.decode_response_tlv);
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!("scd-config-{}.toml", std::process::id()));
        let mut config = DecoderConfig::default();
        config.decode_response_tlv = false;
        config.save_to_file(&path).unwrap();
        let loaded = DecoderConfig::load_from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_rejects_zero_denominator() {
        let mut config = DecoderConfig::default();
        config.timer.scale_denominator = 0;
        assert!(config.validate().is_err());
    }
}
