//! Tag definitions supplied by the caller.
//!
//! A definition's output is either a format-string template or a callback;
//! the variant is resolved once at registration, and templates are compiled
//! to a directive list so rendering never re-scans format strings.

use crate::render::TagContext;
use crate::tree::TagClass;

/// A user callback producing the final output for one tag.
pub type TagCallback = Box<dyn Fn(&TagContext<'_>) -> String>;

/// How a tag turns into output.
pub enum Output {
    Template(Template),
    Callback(TagCallback),
}

/// How a `%s` directive sources its text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ContentMode {
    /// Rendered children when the tag parses its content, escaped raw
    /// content otherwise.
    Default,
    /// Rendered children (`%{parse}s`).
    Parsed,
    /// HTML-escaped raw content (`%{html}s`).
    RawEscaped,
    /// Raw content verbatim (`%{noescape}s`).
    RawVerbatim,
}

#[derive(Debug, Clone)]
pub(crate) enum Piece {
    Lit(String),
    Content(ContentMode),
    /// `%a` / `%A` (and their `%{name}` forms). `content_fallback` marks
    /// `%A`: substitute the raw content when the fallback attribute is empty.
    Attr {
        escape: Option<String>,
        content_fallback: bool,
    },
}

/// A compiled format-string template.
#[derive(Debug, Clone, Default)]
pub struct Template {
    pub(crate) pieces: Vec<Piece>,
}

impl Template {
    pub(crate) fn compile(source: &str) -> Template {
        let mut pieces: Vec<Piece> = Vec::new();
        let mut lit = String::new();
        let mut chars = source.chars().peekable();

        fn flush(pieces: &mut Vec<Piece>, lit: &mut String) {
            if !lit.is_empty() {
                pieces.push(Piece::Lit(std::mem::take(lit)));
            }
        }

        while let Some(c) = chars.next() {
            if c != '%' {
                lit.push(c);
                continue;
            }
            match chars.peek().copied() {
                Some('%') => {
                    chars.next();
                    lit.push('%');
                }
                Some('s') => {
                    chars.next();
                    flush(&mut pieces, &mut lit);
                    pieces.push(Piece::Content(ContentMode::Default));
                }
                Some('a') => {
                    chars.next();
                    flush(&mut pieces, &mut lit);
                    pieces.push(Piece::Attr { escape: None, content_fallback: false });
                }
                Some('A') => {
                    chars.next();
                    flush(&mut pieces, &mut lit);
                    pieces.push(Piece::Attr { escape: None, content_fallback: true });
                }
                Some('{') => {
                    chars.next();
                    let mut name = String::new();
                    for c in chars.by_ref() {
                        if c == '}' {
                            break;
                        }
                        name.push(c);
                    }
                    match chars.next() {
                        Some('s') => {
                            flush(&mut pieces, &mut lit);
                            let mode = match name.as_str() {
                                "parse" => ContentMode::Parsed,
                                "html" => ContentMode::RawEscaped,
                                "noescape" => ContentMode::RawVerbatim,
                                _ => ContentMode::Default,
                            };
                            pieces.push(Piece::Content(mode));
                        }
                        Some('a') => {
                            flush(&mut pieces, &mut lit);
                            pieces.push(Piece::Attr { escape: Some(name), content_fallback: false });
                        }
                        Some('A') => {
                            flush(&mut pieces, &mut lit);
                            pieces.push(Piece::Attr { escape: Some(name), content_fallback: true });
                        }
                        // Malformed directive; keep it literally.
                        other => {
                            lit.push('%');
                            lit.push('{');
                            lit.push_str(&name);
                            lit.push('}');
                            if let Some(other) = other {
                                lit.push(other);
                            }
                        }
                    }
                }
                _ => lit.push('%'),
            }
        }
        flush(&mut pieces, &mut lit);
        Template { pieces }
    }
}

/// Definition of one tag name.
///
/// Built with [`TagDef::template`] or [`TagDef::callback`] and refined with
/// the builder methods:
///
/// ```rust
/// use bbtree::{TagClass, TagDef};
///
/// let quote = TagDef::template("<blockquote>%s</blockquote>").class(TagClass::Block);
/// let item = TagDef::template("<li>%s</li>").class(TagClass::Block).close(false);
/// # let _ = (quote, item);
/// ```
pub struct TagDef {
    pub(crate) output: Output,
    pub(crate) parse: bool,
    pub(crate) class: TagClass,
    pub(crate) single: bool,
    pub(crate) short: bool,
    pub(crate) classic: bool,
    pub(crate) close: bool,
}

impl TagDef {
    /// A template-driven tag. Content is parsed recursively by default.
    ///
    /// A `url:` prefix on the template is shorthand for
    /// `.class(TagClass::Url)` and is stripped from the format string.
    pub fn template(source: &str) -> TagDef {
        let (source, class) = match source.strip_prefix("url:") {
            Some(rest) => (rest, TagClass::Url),
            None => (source, TagClass::Inline),
        };
        TagDef {
            output: Output::Template(Template::compile(source)),
            parse: true,
            class,
            single: false,
            short: false,
            classic: true,
            close: true,
        }
    }

    /// A callback-driven tag. Content is left unparsed unless `.parse(true)`
    /// is set.
    pub fn callback(f: impl Fn(&TagContext<'_>) -> String + 'static) -> TagDef {
        TagDef {
            output: Output::Callback(Box::new(f)),
            parse: false,
            class: TagClass::Inline,
            single: false,
            short: false,
            classic: true,
            close: true,
        }
    }

    /// Whether the tag's content is parsed recursively.
    pub fn parse(mut self, parse: bool) -> TagDef {
        self.parse = parse;
        self
    }

    pub fn class(mut self, class: TagClass) -> TagDef {
        self.class = class;
        self
    }

    /// Declares the tag void: no content, no closer.
    pub fn single(mut self, single: bool) -> TagDef {
        self.single = single;
        self
    }

    /// Accepts the short form `[name://body|title]`.
    pub fn short(mut self, short: bool) -> TagDef {
        self.short = short;
        self
    }

    /// Accepts the classic `[name]…[/name]` form (on by default).
    pub fn classic(mut self, classic: bool) -> TagDef {
        self.classic = classic;
        self
    }

    /// Whether a closing tag is required. `close(false)` tags are implicitly
    /// closed by a same-name sibling, by their parent's closer, or by end of
    /// input, without an error record (list-item semantics).
    pub fn close(mut self, close: bool) -> TagDef {
        self.close = close;
        self
    }

    pub fn is_single(&self) -> bool {
        self.single
    }

    pub fn tag_class(&self) -> TagClass {
        self.class
    }
}
