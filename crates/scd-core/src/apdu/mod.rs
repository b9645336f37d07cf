//! APDU semantics - command names, data direction and status word meanings.

pub mod command;
pub mod constants;
pub mod pattern;
pub mod status;

pub use command::{ApduHeader, CommandCode, CommandInfo, CommandMeaning, Direction};
pub use constants::*;
pub use pattern::NibblePattern;
pub use status::{StatusMeaning, StatusWord};
