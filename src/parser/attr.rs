//! The attribute sub-grammar.
//!
//! Runs over the region between `[name` and the closing `]`. Two dialects:
//! *direct* (the default), where the tag name may carry `=value` binding the
//! fallback attribute, and *indirect*, where only named `key=value` pairs are
//! accepted. On any non-conforming byte the parser skips to the next `]`
//! (or end of input) and reports the region invalid; the scanner then either
//! rejects the whole tag or proceeds with empty attributes, depending on the
//! `STRICT_ATTRIBUTES` flag.

use static_assertions::assert_obj_safe;

use crate::tree::Attributes;

/// Which quote characters delimit quoted attribute values.
///
/// Quoted values may contain spaces and the opposite quote character. There
/// is no escape mechanism inside quotes; a literal closing quote is
/// unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttributeQuote {
    #[default]
    Double,
    Single,
    Both,
}

impl AttributeQuote {
    fn matches(self, byte: u8) -> bool {
        match self {
            AttributeQuote::Double => byte == b'"',
            AttributeQuote::Single => byte == b'\'',
            AttributeQuote::Both => byte == b'"' || byte == b'\'',
        }
    }
}

/// Result of scanning one attribute region.
#[derive(Debug, Clone)]
pub struct AttrScan {
    /// Parsed attributes; `attributes.is_valid()` reports conformance and
    /// `attributes.raw()` the exact region text either way.
    pub attributes: Attributes,
    /// Bytes consumed from the scanned slice, including the `]` when found.
    pub consumed: usize,
    /// Whether a closing `]` was found before end of input.
    pub closed: bool,
}

/// The replaceable attribute-parser entry point.
///
/// `rest` begins at the first byte after the tag name; implementations scan
/// up to and including the closing `]` and report how much they consumed.
/// Register a replacement with
/// [`BBParser::set_attribute_parser`][crate::BBParser::set_attribute_parser]
/// to support ad-hoc dialects.
pub trait AttributeParser {
    fn parse(&self, rest: &str, tag_name: &str) -> AttrScan;
}

assert_obj_safe!(AttributeParser);

/// The built-in dialect implementation.
#[derive(Debug, Clone, Copy)]
pub struct DefaultAttributeParser {
    pub direct: bool,
    pub quote: AttributeQuote,
}

impl DefaultAttributeParser {
    /// Scans one value at `pos`: quoted per the configured quote characters,
    /// otherwise a greedy run of non-space, non-`]` bytes (possibly empty).
    /// Returns the value and the position after it, or `None` when a quote
    /// never closes.
    fn value(&self, rest: &str, pos: usize) -> Option<(String, usize)> {
        let bytes = rest.as_bytes();
        if pos < bytes.len() && self.quote.matches(bytes[pos]) {
            let quote = bytes[pos] as char;
            let body = &rest[pos + 1..];
            let end = body.find(quote)?;
            return Some((body[..end].to_string(), pos + 1 + end + 1));
        }
        let mut end = pos;
        while end < bytes.len() && !bytes[end].is_ascii_whitespace() && bytes[end] != b']' {
            end += 1;
        }
        Some((rest[pos..end].to_string(), end))
    }

    /// Failure recovery: skip from the offending byte to the next `]` (or
    /// end of input) and report the whole region raw.
    fn invalid(rest: &str, from: usize) -> AttrScan {
        let (raw, consumed, closed) = match rest[from..].find(']') {
            Some(i) => (&rest[..from + i], from + i + 1, true),
            None => (rest, rest.len(), false),
        };
        AttrScan {
            attributes: Attributes {
                fallback: String::new(),
                named: Vec::new(),
                raw: raw.to_string(),
                valid: false,
            },
            consumed,
            closed,
        }
    }
}

impl AttributeParser for DefaultAttributeParser {
    fn parse(&self, rest: &str, _tag_name: &str) -> AttrScan {
        let bytes = rest.as_bytes();
        let mut pos = 0;
        let mut fallback = String::new();
        let mut named: Vec<(String, String)> = Vec::new();

        if self.direct && bytes.first() == Some(&b'=') {
            pos += 1;
            match self.value(rest, pos) {
                Some((value, next)) => {
                    fallback = value;
                    pos = next;
                }
                None => return Self::invalid(rest, pos),
            }
        }

        loop {
            let ws_start = pos;
            while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
                pos += 1;
            }
            if pos >= bytes.len() {
                // Ran off the end without a `]`.
                return Self::invalid(rest, pos);
            }
            if bytes[pos] == b']' {
                break;
            }
            // A named pair needs separating whitespace and a key.
            if pos == ws_start {
                return Self::invalid(rest, pos);
            }
            if !(bytes[pos].is_ascii_alphabetic() || bytes[pos] == b'_') {
                return Self::invalid(rest, pos);
            }
            let key_start = pos;
            pos += 1;
            while pos < bytes.len()
                && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'_' || bytes[pos] == b'-')
            {
                pos += 1;
            }
            let key = rest[key_start..pos].to_string();
            if pos >= bytes.len() || bytes[pos] != b'=' {
                return Self::invalid(rest, pos);
            }
            pos += 1;
            match self.value(rest, pos) {
                Some((value, next)) => {
                    named.push((key, value));
                    pos = next;
                }
                None => return Self::invalid(rest, pos),
            }
        }

        AttrScan {
            attributes: Attributes {
                fallback,
                named,
                raw: rest[..pos].to_string(),
                valid: true,
            },
            consumed: pos + 1,
            closed: true,
        }
    }
}
