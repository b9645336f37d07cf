//! EEPROM event log: dump layout, record framing and payload annotation.

pub mod annotate;
pub mod decluster;
pub mod eeprom;
pub mod kind;

pub use annotate::{Annotation, TimerScale, Timestamp, annotate};
pub use decluster::{Declustered, LogEvent, decluster, decluster_observed};
pub use eeprom::{EepromDump, EepromHeader, EepromLayout, read_dump};
pub use kind::{EventCategory, EventKind};
