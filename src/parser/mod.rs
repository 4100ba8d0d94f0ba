//! The scanner and tree builder.
//!
//! A single pass over a byte-index cursor recognizes classic tags, closers,
//! short tags and free text, and assembles the tree against an open-tag
//! stack. Malformed input never aborts a parse: anything that fails to
//! scan as a tag falls back to literal text, and the class-based nesting
//! policy recovers either by refusing the offending tag or by synthesizing
//! closers, depending on [`ParserFeature::CLOSE_OPEN_TAGS`].

use std::collections::{HashMap, HashSet};

use bitflags::bitflags;

use crate::def::TagDef;
use crate::escape::EscapeRegistry;
use crate::render::text::SmileySearch;
use crate::render::{RenderInfo, TextProcessorFn};
use crate::tree::{Attributes, Node, Tag, TagClass, Tree};

pub mod attr;

use attr::{AttributeParser, AttributeQuote, DefaultAttributeParser};

bitflags! {
    /// The parser's boolean options.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct ParserFeature: u32 {
        /// Recover from unbalanced and mis-nested input by synthesizing
        /// closers instead of refusing tags.
        const CLOSE_OPEN_TAGS = 1 << 0;

        /// Reject a whole tag when its attribute region is malformed.
        /// Without this flag the tag proceeds with empty attributes.
        const STRICT_ATTRIBUTES = 1 << 1;

        /// Allow `[tag=value]` to bind the fallback attribute (the direct
        /// dialect). Without this flag only named `key=value` pairs parse.
        const DIRECT_ATTRIBUTES = 1 << 2;

        /// Rewrite line breaks in processed text to `<br>`.
        const LINEBREAKS = 1 << 3;

        /// Trim a single newline after a block tag's opener and before its
        /// closer.
        const STRIP_LINEBREAKS = 1 << 4;
    }
}

impl Default for ParserFeature {
    fn default() -> Self {
        ParserFeature::STRICT_ATTRIBUTES
            | ParserFeature::DIRECT_ATTRIBUTES
            | ParserFeature::LINEBREAKS
            | ParserFeature::STRIP_LINEBREAKS
    }
}

/// URL auto-linking applied to free text.
#[derive(Debug, Clone)]
pub struct UrlFinderConfig {
    /// Display text longer than this is truncated with a `...` suffix.
    pub max_length: usize,
    /// Output template; the first `%s` receives the link target, the second
    /// the display text.
    pub format: String,
}

impl Default for UrlFinderConfig {
    fn default() -> Self {
        UrlFinderConfig {
            max_length: 50,
            format: r#"<a href="%s" rel="nofollow">%s</a>"#.to_string(),
        }
    }
}

/// Smiley substitution applied to free text.
///
/// A smiley only matches when flanked by whitespace or a text boundary.
#[derive(Debug, Clone)]
pub struct SmileyConfig {
    pub base_url: String,
    /// Smiley text to icon file name, e.g. `(":)", "smile.png")`.
    pub icons: Vec<(String, String)>,
    /// Output template; the first `%s` receives the icon URL, the second the
    /// original smiley text.
    pub format: String,
}

impl Default for SmileyConfig {
    fn default() -> Self {
        SmileyConfig {
            base_url: String::new(),
            icons: Vec::new(),
            format: r#"<img src="%s" alt="%s">"#.to_string(),
        }
    }
}

/// Plain-data construction options. Tag definitions, escapes and the
/// replaceable hooks are registered on the parser afterwards.
#[derive(Debug, Clone, Default)]
pub struct ParserOptions {
    pub feature_flags: ParserFeature,
    pub attribute_quote: AttributeQuote,
    pub url_finder: Option<UrlFinderConfig>,
    pub smileys: Option<SmileyConfig>,
}

/// The BBCode processor: a tag-definition registry plus the parse and
/// render entry points.
///
/// A parser services sequential calls only; construct one per thread for
/// concurrent use.
pub struct BBParser {
    pub(crate) options: ParserOptions,
    pub(crate) tags: HashMap<String, TagDef>,
    pub(crate) escapes: EscapeRegistry,
    pub(crate) attribute_parser: Box<dyn AttributeParser>,
    pub(crate) text_processor: Option<TextProcessorFn>,
    pub(crate) smiley_search: Option<SmileySearch>,
    forbidden: HashSet<String>,
    tree: Option<Tree>,
    errors: Vec<String>,
}

impl Default for BBParser {
    fn default() -> Self {
        BBParser::new()
    }
}

impl BBParser {
    /// A parser with default options and an empty tag table.
    pub fn new() -> BBParser {
        BBParser {
            options: ParserOptions::default(),
            tags: HashMap::new(),
            escapes: EscapeRegistry::with_defaults(),
            attribute_parser: Box::new(DefaultAttributeParser {
                direct: true,
                quote: AttributeQuote::Double,
            }),
            text_processor: None,
            smiley_search: None,
            forbidden: HashSet::new(),
            tree: None,
            errors: Vec::new(),
        }
    }

    /// A parser with the given options. The only failure is a smiley table
    /// whose search pattern does not compile.
    pub fn with_options(options: ParserOptions) -> Result<BBParser, regex::Error> {
        let smiley_search = match &options.smileys {
            Some(config) if config.icons.iter().any(|(key, _)| !key.is_empty()) => {
                Some(SmileySearch::compile(config)?)
            }
            _ => None,
        };
        let attribute_parser = Box::new(DefaultAttributeParser {
            direct: options.feature_flags.contains(ParserFeature::DIRECT_ATTRIBUTES),
            quote: options.attribute_quote,
        });
        Ok(BBParser {
            options,
            tags: HashMap::new(),
            escapes: EscapeRegistry::with_defaults(),
            attribute_parser,
            text_processor: None,
            smiley_search,
            forbidden: HashSet::new(),
            tree: None,
            errors: Vec::new(),
        })
    }

    /// Registers a tag definition. The empty name is the text-handler
    /// pseudo-tag: a callback registered there replaces the whole text
    /// pipeline.
    pub fn register(&mut self, name: impl Into<String>, def: TagDef) -> &mut BBParser {
        self.tags.insert(name.into(), def);
        self
    }

    /// Registers an escape, shadowing a built-in of the same name.
    pub fn register_escape(
        &mut self,
        name: impl Into<String>,
        f: impl Fn(&str) -> String + 'static,
    ) -> &mut BBParser {
        self.escapes.insert(name, f);
        self
    }

    /// Replaces the attribute sub-grammar (see [`attr::AttributeParser`]).
    pub fn set_attribute_parser(&mut self, parser: Box<dyn AttributeParser>) {
        self.attribute_parser = parser;
    }

    /// Installs a custom text processor. It replaces the HTML-escape stage
    /// of the pipeline and owns its own escaping; the smiley, URL-finder and
    /// line-break stages still run around it.
    pub fn set_text_processor(&mut self, f: impl Fn(&str, &RenderInfo) -> String + 'static) {
        self.text_processor = Some(Box::new(f));
    }

    /// Disables tag names; a forbidden name parses as if undefined.
    pub fn forbid<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            self.forbidden.insert(name.into());
        }
    }

    /// Re-enables names previously passed to [`BBParser::forbid`].
    pub fn permit<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            self.forbidden.remove(&name.into());
        }
    }

    /// Parses `input` into a tree, retrievable again via
    /// [`BBParser::get_tree`].
    pub fn parse(&mut self, input: &str) -> &Tree {
        let tree = self.build_tree(input);
        self.tree.insert(tree)
    }

    /// Names of defined tags that were refused, rejected, auto-closed or
    /// left open during the last parse.
    pub fn error(&self) -> &[String] {
        &self.errors
    }

    /// The tree produced by the last parse or render call.
    pub fn get_tree(&self) -> Option<&Tree> {
        self.tree.as_ref()
    }

    pub fn options(&self) -> &ParserOptions {
        &self.options
    }

    pub(crate) fn build_tree(&mut self, input: &str) -> Tree {
        let (tree, errors) = {
            let builder = TreeBuilder {
                parser: &*self,
                input,
                pos: 0,
                stack: Vec::new(),
                root: Vec::new(),
                errors: Vec::new(),
                counts: HashMap::new(),
            };
            builder.build()
        };
        self.errors = errors;
        tree
    }

    pub(crate) fn store_tree(&mut self, tree: Tree) {
        self.tree = Some(tree);
    }

    /// Looks up a definition, treating forbidden names as undefined.
    pub(crate) fn definition(&self, name: &str) -> Option<&TagDef> {
        if self.forbidden.contains(name) {
            return None;
        }
        self.tags.get(name)
    }
}

/// An open tag awaiting its closer.
struct Frame {
    tag: Tag,
    /// Set for `close=false` definitions, which may be closed implicitly.
    implicit_close: bool,
}

struct TreeBuilder<'a, 'p> {
    parser: &'p BBParser,
    input: &'a str,
    pos: usize,
    stack: Vec<Frame>,
    root: Vec<Node>,
    errors: Vec<String>,
    counts: HashMap<String, usize>,
}

impl TreeBuilder<'_, '_> {
    fn build(mut self) -> (Tree, Vec<String>) {
        let input = self.input;
        while self.pos < input.len() {
            match input[self.pos..].find('[') {
                None => {
                    let text = &input[self.pos..];
                    self.pos = input.len();
                    self.push_text(text);
                }
                Some(0) => self.bracket(),
                Some(offset) => {
                    let text = &input[self.pos..self.pos + offset];
                    self.pos += offset;
                    self.push_text(text);
                }
            }
        }
        self.unwind();
        (Tree { nodes: self.root }, self.errors)
    }

    /// Classifies the token starting at the `[` under the cursor. Anything
    /// that fails to scan leaves the bracket as literal text.
    fn bracket(&mut self) {
        let input = self.input;
        let rest = &input[self.pos + 1..];
        if let Some(after_slash) = rest.strip_prefix('/') {
            if self.close_tag(after_slash) {
                return;
            }
        } else if let Some(name) = scan_name(rest) {
            if rest[name.len()..].starts_with("://") && self.short_tag(name) {
                return;
            }
            if self.open_tag(name) {
                return;
            }
        }
        self.push_text("[");
        self.pos += 1;
    }

    /// Handles `[/name]`. `rest` starts after the `[/`.
    fn close_tag(&mut self, rest: &str) -> bool {
        let Some(name) = scan_name(rest) else {
            return false;
        };
        if rest.as_bytes().get(name.len()) != Some(&b']') {
            return false;
        }
        let Some(target) = self.stack.iter().rposition(|f| f.tag.name == name) else {
            // Nothing to close; singles never enter the stack either.
            return false;
        };
        let all_implicit = self.stack[target + 1..].iter().all(|f| f.implicit_close);
        if !all_implicit && !self.flag(ParserFeature::CLOSE_OPEN_TAGS) {
            return false;
        }
        while self.stack.len() > target + 1 {
            if let Some(frame) = self.stack.pop() {
                self.finish_auto(frame);
            }
        }
        let token_len = name.len() + 3;
        let end_delim = self.input[self.pos..self.pos + token_len].to_string();
        self.pos += token_len;
        if let Some(frame) = self.stack.pop() {
            self.finish_closed(frame, &end_delim);
        }
        true
    }

    /// Handles `[name://body]` and `[name://body|title]` when the name's
    /// definition allows the short form.
    fn short_tag(&mut self, name: &str) -> bool {
        let parser = self.parser;
        let input = self.input;
        let Some(def) = parser.definition(name) else {
            return false;
        };
        if !def.short {
            return false;
        }
        let body_start = self.pos + 1 + name.len() + 3;
        let Some(close) = input[body_start..].find(']') else {
            return false;
        };
        let source = &input[self.pos..body_start + close + 1];
        if def.class == TagClass::Url && self.in_class(TagClass::Url) {
            self.pos += source.len();
            self.push_text(source);
            self.errors.push(name.to_string());
            return true;
        }
        if def.class == TagClass::Block && self.in_class(TagClass::Inline) {
            if self.flag(ParserFeature::CLOSE_OPEN_TAGS) {
                // Synthesize closers down to the nearest non-inline frame.
                while matches!(self.stack.last(), Some(f) if f.tag.class == TagClass::Inline) {
                    if let Some(frame) = self.stack.pop() {
                        self.finish_auto(frame);
                    }
                }
            } else {
                self.pos += source.len();
                self.push_text(source);
                self.errors.push(name.to_string());
                return true;
            }
        }
        let inner = &input[body_start..body_start + close];
        // The first `|` separates the title, URI-like or not.
        let (body, title) = match inner.find('|') {
            Some(i) => (&inner[..i], &inner[i + 1..]),
            None => (inner, ""),
        };
        let text = if title.is_empty() { body } else { title };
        let mut children = Vec::new();
        if !text.is_empty() {
            children.push(Node::Text(text.to_string()));
        }
        let num = self.next_num(name);
        let tag = Tag {
            name: name.to_string(),
            attributes: Attributes {
                fallback: body.to_string(),
                named: Vec::new(),
                raw: input[self.pos + 1 + name.len()..body_start + close].to_string(),
                valid: true,
            },
            start_delim: source.to_string(),
            end_delim: String::new(),
            children,
            closed: true,
            single: false,
            short: true,
            class: def.class,
            num,
        };
        self.pos += source.len();
        self.push_node(Node::Tag(tag));
        true
    }

    /// Handles a classic opening tag at the cursor.
    fn open_tag(&mut self, name: &str) -> bool {
        let parser = self.parser;
        let input = self.input;
        let after = self.pos + 1 + name.len();
        let rest = &input[after..];

        let Some(def) = parser.definition(name).filter(|d| d.classic) else {
            // Unknown name: the opener stays literal, its contents parse as
            // siblings, and the eventual stray closer stays literal too.
            let Some(close) = rest.find(']') else {
                return false;
            };
            let source = &input[self.pos..after + close + 1];
            self.pos += source.len();
            self.push_text(source);
            return true;
        };

        let scan = parser.attribute_parser.parse(rest, name);
        let source_end = after + scan.consumed;
        if !scan.attributes.valid && self.flag(ParserFeature::STRICT_ATTRIBUTES) {
            self.reject(name, source_end);
            return true;
        }
        if def.class == TagClass::Url && self.in_class(TagClass::Url) {
            self.reject(name, source_end);
            return true;
        }
        if def.class == TagClass::Block && self.in_class(TagClass::Inline) {
            if self.flag(ParserFeature::CLOSE_OPEN_TAGS) {
                // Synthesize closers down to the nearest non-inline frame.
                while matches!(self.stack.last(), Some(f) if f.tag.class == TagClass::Inline) {
                    if let Some(frame) = self.stack.pop() {
                        self.finish_auto(frame);
                    }
                }
            } else {
                self.reject(name, source_end);
                return true;
            }
        }
        // A close-optional sibling of the same name closes implicitly.
        if matches!(self.stack.last(), Some(f) if f.implicit_close && f.tag.name == name) {
            if let Some(frame) = self.stack.pop() {
                self.finish_auto(frame);
            }
        }

        let num = self.next_num(name);
        let mut tag = Tag {
            name: name.to_string(),
            attributes: scan.attributes,
            start_delim: input[self.pos..source_end].to_string(),
            end_delim: String::new(),
            children: Vec::new(),
            closed: false,
            single: def.single,
            short: false,
            class: def.class,
            num,
        };
        self.pos = source_end;

        if def.single {
            tag.closed = true;
            self.push_node(Node::Tag(tag));
            return true;
        }
        if !def.parse {
            self.verbatim(tag);
            return true;
        }
        self.strip_leading_newline(&mut tag);
        self.stack.push(Frame {
            tag,
            implicit_close: !def.close,
        });
        true
    }

    /// Copies input verbatim up to the first `[/name]` for a `parse=false`
    /// tag; nested same-name openers are literal.
    fn verbatim(&mut self, mut tag: Tag) {
        self.strip_leading_newline(&mut tag);
        let input = self.input;
        let closer = format!("[/{}]", tag.name);
        match input[self.pos..].find(&closer) {
            Some(offset) => {
                let mut content = input[self.pos..self.pos + offset].to_string();
                self.pos += offset + closer.len();
                let mut end_delim = String::new();
                if tag.class == TagClass::Block && self.flag(ParserFeature::STRIP_LINEBREAKS) {
                    for newline in ["\r\n", "\n", "\r"] {
                        if content.ends_with(newline) {
                            content.truncate(content.len() - newline.len());
                            end_delim.push_str(newline);
                            break;
                        }
                    }
                }
                end_delim.push_str(&closer);
                if !content.is_empty() {
                    tag.children.push(Node::Text(content));
                }
                tag.end_delim = end_delim;
                tag.closed = true;
            }
            None => {
                let content = &input[self.pos..];
                self.pos = input.len();
                if !content.is_empty() {
                    tag.children.push(Node::Text(content.to_string()));
                }
                tag.closed = self.flag(ParserFeature::CLOSE_OPEN_TAGS);
                self.errors.push(tag.name.clone());
            }
        }
        self.push_node(Node::Tag(tag));
    }

    /// Leaves a refused tag's opener as literal text and records the name.
    fn reject(&mut self, name: &str, source_end: usize) {
        let source = self.input[self.pos..source_end].to_string();
        self.pos = source_end;
        self.push_text(&source);
        self.errors.push(name.to_string());
    }

    fn unwind(&mut self) {
        let auto = self.flag(ParserFeature::CLOSE_OPEN_TAGS);
        while let Some(frame) = self.stack.pop() {
            if auto {
                self.finish_auto(frame);
            } else {
                self.finish_unclosed(frame);
            }
        }
    }

    /// Closes a frame with a synthesized closer. Close-optional frames are
    /// implicitly closable and not an error.
    fn finish_auto(&mut self, mut frame: Frame) {
        if !frame.implicit_close {
            self.errors.push(frame.tag.name.clone());
        }
        if frame.tag.class == TagClass::Block && self.flag(ParserFeature::STRIP_LINEBREAKS) {
            frame.tag.end_delim = pop_trailing_newline(&mut frame.tag.children);
        }
        frame.tag.closed = true;
        self.push_node(Node::Tag(frame.tag));
    }

    /// Closes a frame against the real closer source text.
    fn finish_closed(&mut self, mut frame: Frame, end_delim: &str) {
        let mut delim = String::new();
        if frame.tag.class == TagClass::Block && self.flag(ParserFeature::STRIP_LINEBREAKS) {
            delim = pop_trailing_newline(&mut frame.tag.children);
        }
        delim.push_str(end_delim);
        frame.tag.end_delim = delim;
        frame.tag.closed = true;
        self.push_node(Node::Tag(frame.tag));
    }

    /// End of input without recovery: the frame stays open and renders
    /// transparently.
    fn finish_unclosed(&mut self, mut frame: Frame) {
        if frame.implicit_close {
            frame.tag.closed = true;
        } else {
            frame.tag.closed = false;
            self.errors.push(frame.tag.name.clone());
        }
        self.push_node(Node::Tag(frame.tag));
    }

    fn strip_leading_newline(&mut self, tag: &mut Tag) {
        if tag.class != TagClass::Block || !self.flag(ParserFeature::STRIP_LINEBREAKS) {
            return;
        }
        let input = self.input;
        let rest = &input[self.pos..];
        let len = if rest.starts_with("\r\n") {
            2
        } else if rest.starts_with('\n') || rest.starts_with('\r') {
            1
        } else {
            0
        };
        if len > 0 {
            tag.start_delim.push_str(&rest[..len]);
            self.pos += len;
        }
    }

    fn in_class(&self, class: TagClass) -> bool {
        self.stack.iter().any(|f| f.tag.class == class)
    }

    fn push_node(&mut self, node: Node) {
        match self.stack.last_mut() {
            Some(frame) => frame.tag.children.push(node),
            None => self.root.push(node),
        }
    }

    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let children = match self.stack.last_mut() {
            Some(frame) => &mut frame.tag.children,
            None => &mut self.root,
        };
        if let Some(Node::Text(existing)) = children.last_mut() {
            existing.push_str(text);
        } else {
            children.push(Node::Text(text.to_string()));
        }
    }

    fn next_num(&mut self, name: &str) -> usize {
        let counter = self.counts.entry(name.to_string()).or_insert(0);
        let num = *counter;
        *counter += 1;
        num
    }

    fn flag(&self, flag: ParserFeature) -> bool {
        self.parser.options.feature_flags.contains(flag)
    }
}

/// Removes a single trailing newline from the last text child, returning the
/// removed text so it can be folded into the closing delimiter.
fn pop_trailing_newline(children: &mut Vec<Node>) -> String {
    if let Some(Node::Text(text)) = children.last_mut() {
        for newline in ["\r\n", "\n", "\r"] {
            if text.ends_with(newline) {
                text.truncate(text.len() - newline.len());
                if text.is_empty() {
                    children.pop();
                }
                return newline.to_string();
            }
        }
    }
    String::new()
}

/// Scans a tag name: ASCII letters, digits, `_` and `*`.
fn scan_name(rest: &str) -> Option<&str> {
    let bytes = rest.as_bytes();
    let mut len = 0;
    while len < bytes.len()
        && (bytes[len].is_ascii_alphanumeric() || bytes[len] == b'_' || bytes[len] == b'*')
    {
        len += 1;
    }
    if len == 0 {
        None
    } else {
        Some(&rest[..len])
    }
}

#[cfg(test)]
mod tests;
