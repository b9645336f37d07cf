//! EMV BER-TLV codec.
//!
//! Tags are one or two bytes, lengths one or two bytes. Constructed objects
//! are parsed recursively into [`TlvNode`] trees whose children stay
//! addressable by tag even when siblings repeat a tag.

pub mod length;
pub mod names;
pub mod node;
pub mod tag;

pub use names::tag_name;
pub use node::{DEFAULT_MAX_DEPTH, DumpStyle, TlvChild, TlvNode};
pub use tag::Tag;
