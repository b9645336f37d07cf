//! TLV tree: parsing, building, lookup and dumping.

use std::collections::BTreeMap;
use std::fmt;

use tracing::debug;

use super::length;
use super::names::tag_name;
use super::tag::Tag;
use crate::bytes::{self, printable, printable_aligned};
use crate::error::DecodeError;

/// Default bound on nesting while parsing.
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Layout of [`TlvNode::dump`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DumpStyle {
    /// Spaces per nesting level.
    pub indent_width: usize,
    /// Values up to this many bytes print their text on the hex line.
    pub inline_limit: usize,
}

impl Default for DumpStyle {
    fn default() -> Self {
        Self {
            indent_width: 4,
            inline_limit: 10,
        }
    }
}

/// A child handed to a constructed node: an encoded object still to be
/// parsed, or an already built node.
#[derive(Debug, Clone)]
pub enum TlvChild {
    Encoded(Vec<u8>),
    Node(TlvNode),
}

impl TlvChild {
    /// Encoded child given as hex text.
    pub fn hex(text: &str) -> Result<Self, DecodeError> {
        Ok(TlvChild::Encoded(bytes::decode_hex(text)?))
    }

    fn into_node(self) -> Result<TlvNode, DecodeError> {
        match self {
            TlvChild::Encoded(data) => TlvNode::parse(&data),
            TlvChild::Node(node) => Ok(node),
        }
    }
}

impl From<TlvNode> for TlvChild {
    fn from(node: TlvNode) -> Self {
        TlvChild::Node(node)
    }
}

impl From<Vec<u8>> for TlvChild {
    fn from(data: Vec<u8>) -> Self {
        TlvChild::Encoded(data)
    }
}

impl From<&[u8]> for TlvChild {
    fn from(data: &[u8]) -> Self {
        TlvChild::Encoded(data.to_vec())
    }
}

/// One tag-length-value object.
///
/// `raw` always holds the exact encoding; for constructed nodes the value
/// part of `raw` is the concatenation of the children's encodings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlvNode {
    tag: Tag,
    length: usize,
    header_len: usize,
    raw: Vec<u8>,
    children: Vec<TlvNode>,
    /// Positions in `children` per tag, in encounter order.
    index: BTreeMap<Tag, Vec<usize>>,
}

impl TlvNode {
    // ---------------------------------------------------------------- parsing

    /// Parse the object at the start of `data`. Bytes after it are ignored.
    pub fn parse(data: &[u8]) -> Result<Self, DecodeError> {
        Self::parse_with_limit(data, DEFAULT_MAX_DEPTH)
    }

    pub fn parse_with_limit(data: &[u8], max_depth: usize) -> Result<Self, DecodeError> {
        let (node, consumed) = Self::decode_at(data, 0, max_depth)?;
        if consumed < data.len() {
            debug!(
                tag = %node.tag,
                trailing = data.len() - consumed,
                "Ignoring bytes after TLV object"
            );
        }
        Ok(node)
    }

    /// Parse hex text.
    pub fn from_hex(text: &str) -> Result<Self, DecodeError> {
        Self::parse(&bytes::decode_hex(text)?)
    }

    /// Parse a buffer holding several objects back to back.
    pub fn parse_sequence(data: &[u8]) -> Result<Vec<Self>, DecodeError> {
        Self::parse_sequence_with_limit(data, DEFAULT_MAX_DEPTH)
    }

    pub fn parse_sequence_with_limit(
        data: &[u8],
        max_depth: usize,
    ) -> Result<Vec<Self>, DecodeError> {
        let mut nodes = Vec::new();
        let mut rest = data;
        while !rest.is_empty() {
            let (node, consumed) = Self::decode_at(rest, 0, max_depth)?;
            rest = &rest[consumed..];
            nodes.push(node);
        }
        Ok(nodes)
    }

    fn decode_at(data: &[u8], depth: usize, max_depth: usize) -> Result<(Self, usize), DecodeError> {
        if depth >= max_depth {
            return Err(DecodeError::NestingTooDeep { limit: max_depth });
        }

        let (tag, tag_len) = Tag::read(data)?;
        let (length, len_len) =
            length::decode(&data[tag_len..]).ok_or_else(|| DecodeError::MissingLength {
                tag: tag.to_hex(),
            })?;

        let header_len = tag_len + len_len;
        let available = data.len() - header_len;
        if length > available {
            return Err(DecodeError::LengthExceedsBuffer {
                tag: tag.to_hex(),
                length,
                available,
            });
        }

        let total = header_len + length;
        let mut children = Vec::new();
        if tag.is_constructed() {
            let mut value = &data[header_len..total];
            while !value.is_empty() {
                let (child, consumed) = Self::decode_at(value, depth + 1, max_depth)?;
                value = &value[consumed..];
                children.push(child);
            }
        }

        let node = Self {
            tag,
            length,
            header_len,
            raw: data[..total].to_vec(),
            index: build_index(&children),
            children,
        };
        Ok((node, total))
    }

    // --------------------------------------------------------------- building

    /// Build a primitive object from hex tag and hex value.
    pub fn primitive(tag: &str, value: &str) -> Result<Self, DecodeError> {
        Self::from_value(tag.parse()?, &bytes::decode_hex(value)?)
    }

    /// Build a primitive object from a typed tag and raw value.
    pub fn from_value(tag: Tag, value: &[u8]) -> Result<Self, DecodeError> {
        if tag.is_constructed() {
            return Err(DecodeError::InvalidTag(format!(
                "{} is constructed and needs children",
                tag
            )));
        }
        let mut raw = Vec::with_capacity(tag.len() + 2 + value.len());
        raw.extend_from_slice(tag.as_bytes());
        length::encode_into(value.len(), &mut raw)?;
        let header_len = raw.len();
        raw.extend_from_slice(value);
        Ok(Self {
            tag,
            length: value.len(),
            header_len,
            raw,
            children: Vec::new(),
            index: BTreeMap::new(),
        })
    }

    /// Build a constructed object from a hex tag and children, in order.
    pub fn constructed<I, C>(tag: &str, children: I) -> Result<Self, DecodeError>
    where
        I: IntoIterator<Item = C>,
        C: Into<TlvChild>,
    {
        let tag: Tag = tag.parse()?;
        let children = children
            .into_iter()
            .map(|c| c.into().into_node())
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_children(tag, children)
    }

    /// Build a constructed object from a typed tag and parsed children.
    pub fn from_children(tag: Tag, children: Vec<TlvNode>) -> Result<Self, DecodeError> {
        if !tag.is_constructed() {
            return Err(DecodeError::NotConstructed { tag: tag.to_hex() });
        }
        let value_len: usize = children.iter().map(|c| c.raw.len()).sum();
        let mut raw = Vec::with_capacity(tag.len() + 2 + value_len);
        raw.extend_from_slice(tag.as_bytes());
        length::encode_into(value_len, &mut raw)?;
        let header_len = raw.len();
        for child in &children {
            raw.extend_from_slice(&child.raw);
        }
        Ok(Self {
            tag,
            length: value_len,
            header_len,
            raw,
            index: build_index(&children),
            children,
        })
    }

    /// Append a child and re-derive length and encoding.
    pub fn add(&mut self, child: impl Into<TlvChild>) -> Result<&mut Self, DecodeError> {
        if !self.is_constructed() {
            return Err(DecodeError::NotConstructed {
                tag: self.tag.to_hex(),
            });
        }
        let mut children = self.children.clone();
        children.push(child.into().into_node()?);
        *self = Self::from_children(self.tag, children)?;
        Ok(self)
    }

    // -------------------------------------------------------------- accessors

    pub fn tag(&self) -> Tag {
        self.tag
    }

    /// Length of the value in bytes.
    pub fn length(&self) -> usize {
        self.length
    }

    pub fn is_constructed(&self) -> bool {
        self.tag.is_constructed()
    }

    /// Full encoding: tag, length and value.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// Tag and length bytes.
    pub fn header(&self) -> &[u8] {
        &self.raw[..self.header_len]
    }

    /// Value bytes (the children's encodings for constructed nodes).
    pub fn value(&self) -> &[u8] {
        &self.raw[self.header_len..]
    }

    pub fn value_hex(&self) -> String {
        bytes::encode_hex(self.value())
    }

    /// Immediate children, empty for primitive nodes.
    pub fn children(&self) -> &[TlvNode] {
        &self.children
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TlvNode> {
        self.children.iter()
    }

    // ----------------------------------------------------------------- lookup

    /// First immediate child with the given tag.
    pub fn child(&self, tag: &str) -> Option<&TlvNode> {
        self.child_at(tag, 0)
    }

    /// The `ordinal`-th immediate child with the given tag.
    pub fn child_at(&self, tag: &str, ordinal: usize) -> Option<&TlvNode> {
        let tag: Tag = tag.parse().ok()?;
        let positions = self.index.get(&tag)?;
        positions.get(ordinal).map(|&i| &self.children[i])
    }

    /// All immediate children with the given tag, in encounter order.
    pub fn children_tagged(&self, tag: &str) -> Vec<&TlvNode> {
        let Ok(tag) = tag.parse::<Tag>() else {
            return Vec::new();
        };
        self.index
            .get(&tag)
            .map(|positions| positions.iter().map(|&i| &self.children[i]).collect())
            .unwrap_or_default()
    }

    /// Whether a tag appears among the immediate children.
    pub fn contains(&self, tag: &str) -> bool {
        tag.parse::<Tag>()
            .map(|t| self.index.contains_key(&t))
            .unwrap_or(false)
    }

    /// Walk a path of immediate-child steps such as `"A5/5F2D"`.
    ///
    /// A step may select a later sibling with a `_NN` suffix (`"88_01"` is
    /// the second `88`). `.` is accepted as a separator too.
    pub fn lookup(&self, path: &str) -> Option<&TlvNode> {
        let mut node = self;
        for step in path.split(['/', '.']).filter(|s| !s.is_empty()) {
            let (tag, ordinal) = match step.split_once('_') {
                Some((tag, n)) => (tag, n.parse().ok()?),
                None => (step, 0),
            };
            node = node.child_at(tag, ordinal)?;
        }
        Some(node)
    }

    /// Depth-first, pre-order search of this node and all descendants.
    pub fn search(&self, tag: &str) -> Vec<&TlvNode> {
        let mut found = Vec::new();
        if let Ok(tag) = tag.parse::<Tag>() {
            self.collect_tagged(tag, &mut found);
        }
        found
    }

    fn collect_tagged<'a>(&'a self, tag: Tag, found: &mut Vec<&'a TlvNode>) {
        if self.tag == tag {
            found.push(self);
        }
        for child in &self.children {
            child.collect_tagged(tag, found);
        }
    }

    /// Search expecting at most one match.
    pub fn find_one(&self, tag: &str) -> Result<Option<&TlvNode>, DecodeError> {
        let mut found = self.search(tag);
        match found.len() {
            0 => Ok(None),
            1 => Ok(found.pop()),
            count => Err(DecodeError::AmbiguousTag {
                tag: tag.to_ascii_uppercase(),
                count,
            }),
        }
    }

    // ---------------------------------------------------------------- dumping

    /// Indented multi-line rendering with the default layout.
    pub fn dump(&self) -> String {
        self.dump_with(&DumpStyle::default(), 0)
    }

    /// Indented rendering starting `depth` levels in.
    pub fn dump_with(&self, style: &DumpStyle, depth: usize) -> String {
        let mut out = String::new();
        self.write_dump(&mut out, style, depth);
        if out.ends_with('\n') {
            out.pop();
        }
        out
    }

    fn write_dump(&self, out: &mut String, style: &DumpStyle, depth: usize) {
        let pad = " ".repeat(depth * style.indent_width);
        let tab = " ".repeat(style.indent_width);
        let name = tag_name(&self.tag);

        if self.is_constructed() {
            out.push_str(&format!("{pad}> {name} ({}):\n", self.tag));
            out.push_str(&format!("{pad}{tab}|\n"));
            for (i, child) in self.children.iter().enumerate() {
                if i > 0 {
                    out.push_str(&format!("{pad}{tab}|\n"));
                }
                child.write_dump(out, style, depth + 1);
            }
        } else {
            let value = self.value();
            out.push_str(&format!("{pad}|-{name} ({})\n", self.tag));
            if value.len() > style.inline_limit {
                out.push_str(&format!("{pad}|{tab}{}\n", bytes::encode_hex(value)));
                out.push_str(&format!("{pad}|{tab}{}\n", printable_aligned(value)));
            } else {
                out.push_str(&format!(
                    "{pad}|{tab}{} - {}\n",
                    bytes::encode_hex(value),
                    printable(value)
                ));
            }
        }
    }
}

fn build_index(children: &[TlvNode]) -> BTreeMap<Tag, Vec<usize>> {
    let mut index: BTreeMap<Tag, Vec<usize>> = BTreeMap::new();
    for (i, child) in children.iter().enumerate() {
        index.entry(child.tag).or_default().push(i);
    }
    index
}

impl<'a> IntoIterator for &'a TlvNode {
    type Item = &'a TlvNode;
    type IntoIter = std::slice::Iter<'a, TlvNode>;

    fn into_iter(self) -> Self::IntoIter {
        self.children.iter()
    }
}

/// Compact one-line form, e.g. `T6F={ T_84=3150 TA5={ T_88=02 } }`.
impl fmt::Display for TlvNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_constructed() {
            write!(f, "T{}={{", self.tag)?;
            for child in &self.children {
                write!(f, " {}", child)?;
            }
            write!(f, " }}")
        } else {
            write!(f, "T_{}={}", self.tag, self.value_hex())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    const FCI: &str = "6F1A840E315041592E5359532E4444463031A5088801025F2D02656E";

    #[test]
    fn test_parse_fci() {
        let t = TlvNode::from_hex(FCI).unwrap();
        assert_eq!(t.tag().to_hex(), "6F");
        assert!(t.is_constructed());
        assert_eq!(t.length(), 0x1A);
        assert_eq!(t.children().len(), 2);

        let df = t.child("84").unwrap();
        assert!(!df.is_constructed());
        assert_eq!(df.value_hex(), "315041592E5359532E4444463031");

        let a5 = t.child("a5").unwrap();
        assert!(a5.is_constructed());
        assert_eq!(a5.child("88").unwrap().value(), &[0x02]);
        assert_eq!(a5.child("5F2D").unwrap().value(), b"en");
        assert_eq!(bytes::encode_hex(t.raw()), FCI);
    }

    #[test]
    fn test_path_lookup() {
        let t = TlvNode::from_hex(FCI).unwrap();
        assert_eq!(t.lookup("A5/5F2D").unwrap().value_hex(), "656E");
        assert_eq!(t.lookup("a5.88").unwrap().value_hex(), "02");
        assert!(t.lookup("A5/9F38").is_none());
        assert!(t.lookup("77").is_none());
        assert!(t.child("ZZ").is_none());
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(TlvNode::parse(&[]).unwrap_err(), DecodeError::EmptyBuffer);
        assert_eq!(
            TlvNode::parse(&[0x9F]).unwrap_err(),
            DecodeError::MissingTagByte { first: 0x9F }
        );
        assert_eq!(
            TlvNode::parse(&[0x84]).unwrap_err(),
            DecodeError::MissingLength { tag: "84".into() }
        );
        let err = TlvNode::from_hex("840531").unwrap_err();
        assert_eq!(
            err,
            DecodeError::LengthExceedsBuffer {
                tag: "84".into(),
                length: 5,
                available: 1
            }
        );
        assert_eq!(err.kind(), ErrorKind::Format);
        assert_eq!(TlvNode::from_hex("6F0").unwrap_err().kind(), ErrorKind::Format);
    }

    #[test]
    fn test_truncated_child_fails() {
        // A5 holds 3 bytes but its only child claims 5.
        assert!(TlvNode::from_hex("A503880531").is_err());
    }

    #[test]
    fn test_nesting_bound() {
        // 40 nested E1 templates around a primitive.
        let mut data = vec![0x88, 0x01, 0x02];
        for _ in 0..40 {
            let mut outer = vec![0xE1];
            length::encode_into(data.len(), &mut outer).unwrap();
            outer.extend_from_slice(&data);
            data = outer;
        }
        assert_eq!(
            TlvNode::parse(&data).unwrap_err(),
            DecodeError::NestingTooDeep {
                limit: DEFAULT_MAX_DEPTH
            }
        );
        assert!(TlvNode::parse_with_limit(&data, 64).is_ok());
    }

    #[test]
    fn test_trailing_bytes_ignored() {
        let t = TlvNode::from_hex("8801029000").unwrap();
        assert_eq!(t.raw(), &[0x88, 0x01, 0x02]);
        let seq = TlvNode::parse_sequence(&bytes::decode_hex("8801029000").unwrap()).unwrap();
        assert_eq!(seq.len(), 2);
        assert!(TlvNode::parse_sequence(&bytes::decode_hex("88010290").unwrap()).is_err());
    }

    #[test]
    fn test_build_matches_parse() {
        let built = TlvNode::constructed(
            "6F",
            [
                TlvNode::primitive("84", "315041592E5359532E4444463031").unwrap(),
                TlvNode::constructed(
                    "A5",
                    [
                        TlvNode::primitive("88", "02").unwrap(),
                        TlvNode::primitive("5F2D", "656E").unwrap(),
                    ],
                )
                .unwrap(),
            ],
        )
        .unwrap();
        assert_eq!(bytes::encode_hex(built.raw()), FCI);
        assert_eq!(TlvNode::parse(built.raw()).unwrap(), built);
    }

    #[test]
    fn test_build_from_encoded_children() {
        let built = TlvNode::constructed(
            "A5",
            [TlvChild::hex("880102").unwrap(), TlvChild::hex("5F2D02656E").unwrap()],
        )
        .unwrap();
        assert_eq!(bytes::encode_hex(built.raw()), "A5088801025F2D02656E");
    }

    #[test]
    fn test_build_errors() {
        assert!(TlvNode::primitive("8", "02").is_err());
        assert!(TlvNode::primitive("88", "0").is_err());
        assert!(TlvNode::primitive("88", "GG").is_err());
        assert!(TlvNode::primitive("6F", "02").is_err());
        assert_eq!(
            TlvNode::constructed("88", Vec::<TlvNode>::new()).unwrap_err(),
            DecodeError::NotConstructed { tag: "88".into() }
        );
    }

    #[test]
    fn test_length_boundary() {
        let short = TlvNode::from_value("84".parse().unwrap(), &[0x41; 127]).unwrap();
        assert_eq!(short.header(), &[0x84, 0x7F]);

        let long = TlvNode::from_value("84".parse().unwrap(), &[0x41; 256]).unwrap();
        assert_eq!(long.header(), &[0x84, 0x81, 0x00]);
        assert_eq!(TlvNode::parse(long.raw()).unwrap(), long);

        let mid = TlvNode::from_value("84".parse().unwrap(), &[0x41; 255]).unwrap();
        assert_eq!(TlvNode::parse(mid.raw()).unwrap().length(), 255);
    }

    #[test]
    fn test_add_grows_template() {
        let mut t = TlvNode::constructed("6F", Vec::<TlvNode>::new()).unwrap();
        assert_eq!(t.raw(), &[0x6F, 0x00]);
        t.add(TlvNode::primitive("84", "315041592E5359532E4444463031").unwrap())
            .unwrap();
        t.add(TlvChild::hex("A5088801025F2D02656E").unwrap()).unwrap();
        assert_eq!(bytes::encode_hex(t.raw()), FCI);
        assert_eq!(t.length(), 0x1A);
        assert!(t.contains("A5"));

        let mut leaf = TlvNode::primitive("88", "02").unwrap();
        assert!(leaf.add(TlvNode::primitive("88", "03").unwrap()).is_err());
    }

    #[test]
    fn test_duplicate_siblings_kept_in_order() {
        let t = TlvNode::from_hex("7009880101880102880103").unwrap();
        let all = t.children_tagged("88");
        assert_eq!(all.len(), 3);
        assert_eq!(t.child("88").unwrap().value(), &[0x01]);
        assert_eq!(t.child_at("88", 2).unwrap().value(), &[0x03]);
        assert_eq!(t.lookup("88_01").unwrap().value(), &[0x02]);
        assert!(t.lookup("88_03").is_none());
    }

    #[test]
    fn test_search_and_find_one() {
        let t = TlvNode::from_hex("700C880101A5078801025F2D0100").unwrap();
        assert_eq!(t.search("88").len(), 2);
        assert_eq!(t.search("A5").len(), 1);
        assert_eq!(
            t.find_one("5f2d").unwrap().unwrap().value(),
            &[0x00]
        );
        assert!(t.find_one("9F38").unwrap().is_none());
        let err = t.find_one("88").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AmbiguousTag);
    }

    #[test]
    fn test_membership_is_shallow() {
        let t = TlvNode::from_hex(FCI).unwrap();
        assert!(t.contains("84"));
        assert!(t.contains("a5"));
        assert!(!t.contains("88"));
    }

    #[test]
    fn test_dump_layout() {
        let t = TlvNode::from_hex("A5088801025F2D02656E").unwrap();
        let expected = "\
> File Control Information (FCI) Proprietary Template (A5):
    |
    |-Short File Identifier (SFI) (88)
    |    02 - .
    |
    |-Language Preference (5F2D)
    |    656E - en";
        assert_eq!(t.dump(), expected);
    }

    #[test]
    fn test_dump_long_value() {
        let t = TlvNode::from_hex("840E315041592E5359532E4444463031").unwrap();
        let dump = t.dump();
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "|    315041592E5359532E4444463031");
        assert_eq!(lines[2], "|    1 P A Y . S Y S . D D F 0 1 ");
    }

    #[test]
    fn test_display_compact() {
        let t = TlvNode::from_hex("A5088801025F2D02656E").unwrap();
        assert_eq!(t.to_string(), "TA5={ T_88=02 T_5F2D=656E }");
    }
}
