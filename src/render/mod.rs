//! The render engine.
//!
//! A depth-first walk over the tree. Each tag either runs its callback with
//! a fully-contextualized [`TagContext`], or has its compiled template
//! interpreted. Children are rendered and composed before any other
//! directive of the enclosing tag is substituted, so callbacks and templates
//! always observe finished descendants. Tags without a definition (or whose
//! closer never arrived under the non-recovering strategy) are transparent:
//! only their delimiters survive, around normally-rendered children.

use std::collections::HashMap;

use crate::def::{ContentMode, Output, Piece, TagDef, Template};
use crate::escape::escape_html;
use crate::parser::BBParser;
use crate::tree::{Attributes, Node, Tag, TagClass, Tree};

pub(crate) mod text;

/// Caller-supplied key/value payload threaded through a render call.
pub type UserContext = HashMap<String, String>;

/// A custom text processor; replaces the HTML-escape stage of the pipeline.
pub type TextProcessorFn = Box<dyn Fn(&str, &RenderInfo) -> String>;

/// Strict-ancestry snapshot handed to callbacks and the text pipeline.
#[derive(Debug, Clone, Default)]
pub struct RenderInfo {
    /// Open ancestor counts per tag name.
    pub tags: HashMap<String, usize>,
    /// Ancestor names, outermost first.
    pub stack: Vec<String>,
    /// Open ancestor counts per nesting class.
    pub classes: HashMap<TagClass, usize>,
    /// The payload given to `render_with`/`render_tree_with`.
    pub user: UserContext,
}

/// Everything a tag callback gets to see.
pub struct TagContext<'a> {
    pub parser: &'a BBParser,
    /// The full attribute region.
    pub attr: &'a Attributes,
    /// The fallback attribute value.
    pub fallback: &'a str,
    /// Rendered content when the definition parses its content, the raw
    /// source otherwise.
    pub content: &'a str,
    pub tag: &'a Tag,
    pub info: &'a RenderInfo,
}

impl BBParser {
    /// Parses and renders in one call.
    pub fn render(&mut self, input: &str) -> String {
        self.render_with(input, &UserContext::new())
    }

    /// Like [`BBParser::render`], with a user payload surfaced through
    /// [`RenderInfo::user`].
    pub fn render_with(&mut self, input: &str, context: &UserContext) -> String {
        let tree = self.build_tree(input);
        let out = self.render_tree_with(&tree, context);
        self.store_tree(tree);
        out
    }

    /// Renders a previously parsed tree.
    pub fn render_tree(&self, tree: &Tree) -> String {
        self.render_tree_with(tree, &UserContext::new())
    }

    pub fn render_tree_with(&self, tree: &Tree, context: &UserContext) -> String {
        let mut renderer = Renderer {
            parser: self,
            stack: Vec::new(),
            user: context,
        };
        let mut out = String::new();
        renderer.render_nodes(tree.nodes(), &mut out);
        out
    }
}

struct Renderer<'p> {
    parser: &'p BBParser,
    /// Open ancestors at the point of evaluation; `RenderInfo` is built from
    /// this instead of parent pointers in the tree.
    stack: Vec<(String, TagClass)>,
    user: &'p UserContext,
}

impl Renderer<'_> {
    fn info(&self) -> RenderInfo {
        let mut tags: HashMap<String, usize> = HashMap::new();
        let mut classes: HashMap<TagClass, usize> = HashMap::new();
        let mut stack = Vec::with_capacity(self.stack.len());
        for (name, class) in &self.stack {
            *tags.entry(name.clone()).or_insert(0) += 1;
            *classes.entry(*class).or_insert(0) += 1;
            stack.push(name.clone());
        }
        RenderInfo {
            tags,
            stack,
            classes,
            user: self.user.clone(),
        }
    }

    fn render_nodes(&mut self, nodes: &[Node], out: &mut String) {
        for node in nodes {
            match node {
                Node::Text(text) => {
                    let info = self.info();
                    out.push_str(&self.parser.process_text(text, &info));
                }
                Node::Tag(tag) => self.render_tag(tag, out),
            }
        }
    }

    fn render_tag(&mut self, tag: &Tag, out: &mut String) {
        let parser = self.parser;
        let Some(def) = parser.definition(&tag.name) else {
            self.render_transparent(tag, out);
            return;
        };
        if !tag.closed {
            self.render_transparent(tag, out);
            return;
        }
        self.stack.push((tag.name.clone(), tag.class));
        match &def.output {
            Output::Template(template) => self.render_template(tag, def, template, out),
            Output::Callback(callback) => {
                let content = if def.parse {
                    self.render_children(tag)
                } else {
                    tag.get_content()
                };
                let info = self.info();
                let ctx = TagContext {
                    parser,
                    attr: tag.attributes(),
                    fallback: tag.get_attr(),
                    content: &content,
                    tag,
                    info: &info,
                };
                out.push_str(&callback(&ctx));
            }
        }
        self.stack.pop();
    }

    /// Only the delimiters survive; children render as if the tag were not
    /// there.
    fn render_transparent(&mut self, tag: &Tag, out: &mut String) {
        out.push_str(&tag.start_delim);
        if !tag.short {
            self.render_nodes(&tag.children, out);
            out.push_str(&tag.end_delim);
        }
    }

    fn render_template(&mut self, tag: &Tag, def: &TagDef, template: &Template, out: &mut String) {
        let effective = |mode: ContentMode| match mode {
            ContentMode::Default if def.parse => ContentMode::Parsed,
            ContentMode::Default => ContentMode::RawEscaped,
            other => other,
        };
        // Children compose before any directive substitutes.
        let wants_parsed = template.pieces.iter().any(|piece| {
            matches!(piece, Piece::Content(mode) if effective(*mode) == ContentMode::Parsed)
        });
        let parsed = if wants_parsed {
            Some(self.render_children(tag))
        } else {
            None
        };
        for piece in &template.pieces {
            match piece {
                Piece::Lit(lit) => out.push_str(lit),
                Piece::Content(mode) => match effective(*mode) {
                    ContentMode::Parsed => out.push_str(parsed.as_deref().unwrap_or_default()),
                    ContentMode::RawEscaped => out.push_str(&escape_html(&tag.get_content())),
                    ContentMode::RawVerbatim => out.push_str(&tag.get_content()),
                    ContentMode::Default => unreachable!(),
                },
                Piece::Attr {
                    escape,
                    content_fallback,
                } => {
                    let content;
                    let value = if *content_fallback && tag.get_attr().is_empty() {
                        content = tag.get_content();
                        content.as_str()
                    } else {
                        tag.get_attr()
                    };
                    let name = escape.as_deref().unwrap_or("html");
                    out.push_str(&self.parser.escapes.apply(name, value));
                }
            }
        }
    }

    fn render_children(&mut self, tag: &Tag) -> String {
        let mut out = String::new();
        self.render_nodes(&tag.children, &mut out);
        out
    }
}
