//! The stock HTML tag definitions.
//! While not comprehensive of every forum dialect, likely sufficient for
//! most, and the starting point to extend with [`BBParser::register`].

use crate::def::TagDef;
use crate::parser::BBParser;
use crate::tree::TagClass;

macro_rules! simple_tags {
    ($($name:literal => $template:literal),* $(,)?) => {
        vec![
            $(
                ($name, TagDef::template($template)),
            )*
        ]
    };
}

/// The default definition set:
///
/// | Name | Output |
/// |------|--------|
/// | `b` `i` `u` `s` | the matching inline HTML element |
/// | `url` `email` | `url`-class anchors, short form allowed |
/// | `img` | `url`-class image, content unparsed |
/// | `quote` `list` `*` | block elements; `*` closes implicitly |
/// | `code` `noparse` | content unparsed, entity-escaped |
/// | `size` `color` | `<font>` with a validated attribute |
pub fn default_tags() -> Vec<(&'static str, TagDef)> {
    let mut tags = simple_tags![
        "b" => "<b>%s</b>",
        "i" => "<i>%s</i>",
        "u" => "<u>%s</u>",
        "s" => "<s>%s</s>",
        "size" => r#"<font size="%{num}a">%s</font>"#,
        "color" => r#"<font color="%{htmlcolor}a">%s</font>"#,
    ];
    tags.push(("noparse", TagDef::template("<pre>%{html}s</pre>").parse(false)));
    tags.push((
        "url",
        TagDef::template(r#"url:<a href="%{link}A" rel="nofollow">%s</a>"#).short(true),
    ));
    tags.push((
        "email",
        TagDef::template(r#"url:<a href="mailto:%{email}A">%s</a>"#).short(true),
    ));
    tags.push((
        "img",
        TagDef::template(r#"<img src="%{link}A" alt="[%{html}a]" title="%{html}a">"#)
            .parse(false)
            .class(TagClass::Url),
    ));
    tags.push((
        "quote",
        TagDef::template("<blockquote>%s</blockquote>").class(TagClass::Block),
    ));
    tags.push((
        "code",
        TagDef::template("<code>%{html}s</code>")
            .parse(false)
            .class(TagClass::Block),
    ));
    tags.push((
        "list",
        TagDef::template("<ul>%s</ul>").class(TagClass::Block),
    ));
    tags.push((
        "*",
        TagDef::template("<li>%s</li>")
            .class(TagClass::Block)
            .close(false),
    ));
    tags
}

/// A ready parser loaded with [`default_tags`].
pub fn default_parser() -> BBParser {
    let mut parser = BBParser::new();
    for (name, def) in default_tags() {
        parser.register(name, def);
    }
    parser
}

#[cfg(test)]
mod tests;
