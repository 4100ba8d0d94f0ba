//! The tag tree produced by parsing.
//!
//! Trees are built left-to-right in a single pass and are not mutated
//! afterwards; rendering consumes them read-only. Every node keeps enough of
//! the original source text (delimiters and the raw attribute region) that
//! [`Tree::raw_text`] reconstructs the input verbatim, malformed or not.

/// Nesting class of a tag, taken from its definition.
///
/// `Url` tags refuse `Url` descendants; `Block` tags refuse to open under an
/// `Inline` ancestor (see the parser's recovery strategies).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TagClass {
    #[default]
    Inline,
    Block,
    Url,
}

/// Parsed attribute region of a tag.
///
/// The value following `=` on the tag name itself is the *fallback*; named
/// `key=value` pairs follow in source order. The raw region text is kept so
/// refused tags can be echoed back exactly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes {
    pub(crate) fallback: String,
    pub(crate) named: Vec<(String, String)>,
    pub(crate) raw: String,
    pub(crate) valid: bool,
}

impl Attributes {
    /// Assembles a region, mainly for custom
    /// [`AttributeParser`][crate::AttributeParser] implementations.
    pub fn new(
        fallback: impl Into<String>,
        named: Vec<(String, String)>,
        raw: impl Into<String>,
        valid: bool,
    ) -> Attributes {
        Attributes {
            fallback: fallback.into(),
            named,
            raw: raw.into(),
            valid,
        }
    }

    /// The fallback value (`[tag=fallback]`), empty when none was given.
    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    /// Named `key=value` pairs in source order.
    pub fn named(&self) -> &[(String, String)] {
        &self.named
    }

    /// Looks up the first named attribute called `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.named
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// The exact source text between the tag name and the closing `]`.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Whether the region conformed to the attribute grammar.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// The legacy pair-list form: the fallback under the empty key first,
    /// then the named pairs in source order.
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::with_capacity(1 + self.named.len());
        pairs.push((String::new(), self.fallback.clone()));
        pairs.extend(self.named.iter().cloned());
        pairs
    }
}

/// A node of the parse tree: a run of free text or a recognized tag.
#[derive(Debug, Clone)]
pub enum Node {
    Text(String),
    Tag(Tag),
}

impl Node {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Node::Text(t) => Some(t),
            Node::Tag(_) => None,
        }
    }

    pub fn as_tag(&self) -> Option<&Tag> {
        match self {
            Node::Tag(t) => Some(t),
            Node::Text(_) => None,
        }
    }

    pub(crate) fn raw_text_into(&self, out: &mut String) {
        match self {
            Node::Text(t) => out.push_str(t),
            Node::Tag(t) => t.raw_text_into(out),
        }
    }
}

/// A recognized tag with its children.
///
/// `start_delim` holds the exact source of the opening token (brackets, name
/// and attribute region included) and `end_delim` the closing token, so the
/// original input can always be rebuilt. A synthesized closer leaves
/// `end_delim` empty.
#[derive(Debug, Clone)]
pub struct Tag {
    pub(crate) name: String,
    pub(crate) attributes: Attributes,
    pub(crate) start_delim: String,
    pub(crate) end_delim: String,
    pub(crate) children: Vec<Node>,
    pub(crate) closed: bool,
    pub(crate) single: bool,
    pub(crate) short: bool,
    pub(crate) class: TagClass,
    pub(crate) num: usize,
}

impl Tag {
    pub fn get_name(&self) -> &str {
        &self.name
    }

    /// The fallback attribute value.
    pub fn get_attr(&self) -> &str {
        &self.attributes.fallback
    }

    /// The full attribute region.
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Per-name occurrence counter assigned at parse time; the first
    /// occurrence of a name is 0.
    pub fn get_num(&self) -> usize {
        self.num
    }

    pub fn get_children(&self) -> &[Node] {
        &self.children
    }

    /// The raw inner content: the children's source text, without this tag's
    /// own delimiters.
    pub fn get_content(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            child.raw_text_into(&mut out);
        }
        out
    }

    /// Reconstructs this tag's verbatim source, delimiters included.
    pub fn raw_text(&self) -> String {
        let mut out = String::new();
        self.raw_text_into(&mut out);
        out
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn is_single(&self) -> bool {
        self.single
    }

    pub fn is_short(&self) -> bool {
        self.short
    }

    pub fn class(&self) -> TagClass {
        self.class
    }

    pub(crate) fn raw_text_into(&self, out: &mut String) {
        // A short tag's opener is its entire source; its children only carry
        // the display title for rendering.
        out.push_str(&self.start_delim);
        if !self.short {
            for child in &self.children {
                child.raw_text_into(out);
            }
            out.push_str(&self.end_delim);
        }
    }

    /// A zero-content tag standing in for the text-handler pseudo-tag when a
    /// user callback replaces the text pipeline.
    pub(crate) fn text_handler() -> Tag {
        Tag {
            name: String::new(),
            attributes: Attributes::default(),
            start_delim: String::new(),
            end_delim: String::new(),
            children: Vec::new(),
            closed: true,
            single: false,
            short: false,
            class: TagClass::Inline,
            num: 0,
        }
    }
}

/// The root node list produced by one parse.
#[derive(Debug, Clone, Default)]
pub struct Tree {
    pub(crate) nodes: Vec<Node>,
}

impl Tree {
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Reconstructs the exact input the tree was parsed from.
    pub fn raw_text(&self) -> String {
        let mut out = String::new();
        for node in &self.nodes {
            node.raw_text_into(&mut out);
        }
        out
    }
}
