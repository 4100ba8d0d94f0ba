//! Named string filters applied to attribute values and raw content.
//!
//! Every parser instance owns its own registry; user entries shadow the
//! built-ins. Escapes are pure `&str -> String` functions. The validating
//! escapes (`link`, `email`, `htmlcolor`, `num`) return the empty string on
//! rejection rather than erroring, keeping rendering total.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use regex::Regex;

/// A named escape filter.
pub type EscapeFn = Box<dyn Fn(&str) -> String>;

/// HTML entity-escapes `< > & " '`.
///
/// Deliberately not idempotent: escaping twice double-escapes, like any
/// plain entity encoder.
pub fn escape_html(input: &str) -> String {
    html_escape::encode_quoted_attribute(input).into_owned()
}

// RFC 3986 unreserved characters stay literal; everything else is
// percent-encoded, with space emitted as `+`.
const FORM: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

static SCHEME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*://").unwrap());

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}$").unwrap()
});

static HEX_COLOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#(?:[0-9A-Fa-f]{3}|[0-9A-Fa-f]{6})$").unwrap());

static NUM_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-?\d+(?:\.\d+)?$").unwrap());

const COLOR_NAMES: &[&str] = &[
    "aqua", "black", "blue", "fuchsia", "gray", "green", "lime", "maroon",
    "navy", "olive", "purple", "red", "silver", "teal", "white", "yellow",
];

fn escape_uri(input: &str) -> String {
    let encoded = utf8_percent_encode(input, FORM).to_string().replace("%20", "+");
    escape_html(&encoded)
}

fn escape_link(input: &str) -> String {
    if input.starts_with('/') || SCHEME_RE.is_match(input) {
        escape_html(input)
    } else {
        String::new()
    }
}

fn escape_email(input: &str) -> String {
    if EMAIL_RE.is_match(input) {
        escape_html(input)
    } else {
        String::new()
    }
}

fn escape_htmlcolor(input: &str) -> String {
    let named = COLOR_NAMES.contains(&input.to_ascii_lowercase().as_str());
    if named || HEX_COLOR_RE.is_match(input) {
        escape_html(input)
    } else {
        String::new()
    }
}

fn escape_num(input: &str) -> String {
    if NUM_RE.is_match(input) {
        input.to_string()
    } else {
        String::new()
    }
}

/// Per-parser mapping from escape name to filter.
pub struct EscapeRegistry {
    map: HashMap<String, EscapeFn>,
}

impl Default for EscapeRegistry {
    fn default() -> Self {
        EscapeRegistry::with_defaults()
    }
}

impl EscapeRegistry {
    /// A registry holding the built-in escapes.
    pub fn with_defaults() -> Self {
        let mut registry = EscapeRegistry { map: HashMap::new() };
        registry.insert("html", |s| escape_html(s));
        registry.insert("uri", escape_uri);
        registry.insert("link", escape_link);
        registry.insert("email", escape_email);
        registry.insert("htmlcolor", escape_htmlcolor);
        registry.insert("num", escape_num);
        registry.insert("noescape", |s| s.to_string());
        registry
    }

    /// Registers `f` under `name`, shadowing any previous entry.
    pub fn insert(&mut self, name: impl Into<String>, f: impl Fn(&str) -> String + 'static) {
        self.map.insert(name.into(), Box::new(f));
    }

    /// Applies the escape called `name`; unknown names fall back to `html`.
    pub fn apply(&self, name: &str, input: &str) -> String {
        match self.map.get(name) {
            Some(f) => f(input),
            None => escape_html(input),
        }
    }
}
