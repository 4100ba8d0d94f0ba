use pretty_assertions::assert_eq;

use super::{default_parser, default_tags};
use crate::{BBParser, ParserFeature, ParserOptions, TagDef};

fn recovering_parser() -> BBParser {
    let mut parser = BBParser::with_options(ParserOptions {
        feature_flags: ParserFeature::default() | ParserFeature::CLOSE_OPEN_TAGS,
        ..ParserOptions::default()
    })
    .unwrap();
    for (name, def) in default_tags() {
        parser.register(name, def);
    }
    parser
}

#[test]
pub fn bold() {
    let mut parser = default_parser();
    assert_eq!(parser.render("[b]hello[/b]"), "<b>hello</b>");
}

#[test]
pub fn bold_escapes_raw_html() {
    let mut parser = default_parser();
    assert_eq!(
        parser.render("[b]bold<html>[/b]"),
        "<b>bold&lt;html&gt;</b>"
    );
}

#[test]
pub fn url_with_local_target() {
    let mut parser = default_parser();
    assert_eq!(
        parser.render("[url=/foo.html]a link[/url]"),
        "<a href=\"/foo.html\" rel=\"nofollow\">a link</a>"
    );
}

#[test]
pub fn url_rejects_unsafe_targets() {
    let mut parser = default_parser();
    assert_eq!(
        parser.render("[url=javascript:alert(1)]x[/url]"),
        "<a href=\"\" rel=\"nofollow\">x</a>"
    );
}

#[test]
pub fn url_takes_target_from_content() {
    let mut parser = default_parser();
    assert_eq!(
        parser.render("[url]https://x.example/a[/url]"),
        "<a href=\"https://x.example/a\" rel=\"nofollow\">https://x.example/a</a>"
    );
}

#[test]
pub fn noparse_keeps_tags_literal() {
    let mut parser = default_parser();
    assert_eq!(
        parser.render("[noparse] [b]x[/b] [/noparse]"),
        "<pre> [b]x[/b] </pre>"
    );
}

#[test]
pub fn unclosed_tag_is_echoed_without_recovery() {
    let mut parser = default_parser();
    assert_eq!(parser.render("[b]open"), "[b]open");
    assert_eq!(parser.error(), ["b".to_string()]);
}

#[test]
pub fn unclosed_tag_is_completed_with_recovery() {
    let mut parser = recovering_parser();
    assert_eq!(parser.render("[b]open"), "<b>open</b>");
    assert_eq!(parser.error(), ["b".to_string()]);
}

#[test]
pub fn custom_url_class_tag_with_uri_escape() {
    let mut parser = default_parser();
    parser.register(
        "wikipedia",
        TagDef::template("url:<a href=\"http://w/?q=%{uri}A\">%{parse}s</a>"),
    );
    assert_eq!(
        parser.render("[wikipedia]Harold & Maude[/wikipedia]"),
        "<a href=\"http://w/?q=Harold+%26+Maude\">Harold &amp; Maude</a>"
    );
}

#[test]
pub fn size_validates_numbers() {
    let mut parser = default_parser();
    assert_eq!(parser.render("[size=7]big[/size]"), "<font size=\"7\">big</font>");
    assert_eq!(parser.render("[size=huge]x[/size]"), "<font size=\"\">x</font>");
}

#[test]
pub fn malformed_attributes_echo_the_whole_tag() {
    let mut parser = default_parser();
    parser.register("foo", TagDef::template("<foo>%s</foo>"));
    assert_eq!(
        parser.render("[foo=bar far boo]x[/foo]"),
        "[foo=bar far boo]x[/foo]"
    );
    assert_eq!(parser.error(), ["foo".to_string()]);
}

#[test]
pub fn color_accepts_names_and_hex() {
    let mut parser = default_parser();
    assert_eq!(
        parser.render("[color=red]r[/color]"),
        "<font color=\"red\">r</font>"
    );
    assert_eq!(
        parser.render("[color=#00ff00]g[/color]"),
        "<font color=\"#00ff00\">g</font>"
    );
    assert_eq!(
        parser.render("[color=blurple]x[/color]"),
        "<font color=\"\">x</font>"
    );
}

#[test]
pub fn list_items_render_without_stray_breaks() {
    let mut parser = default_parser();
    assert_eq!(
        parser.render("[list]\n[*]one\n[*]two\n[/list]"),
        "<ul><li>one</li><li>two</li></ul>"
    );
}

#[test]
pub fn code_escapes_content() {
    let mut parser = default_parser();
    assert_eq!(
        parser.render("[code]\nlet x = 1 < 2;\n[/code]"),
        "<code>let x = 1 &lt; 2;</code>"
    );
}

#[test]
pub fn img_uses_content_as_source() {
    let mut parser = default_parser();
    assert_eq!(
        parser.render("[img]http://x.example/y.png[/img]"),
        "<img src=\"http://x.example/y.png\" alt=\"[]\" title=\"\">"
    );
}

#[test]
pub fn email_short_form() {
    let mut parser = default_parser();
    assert_eq!(
        parser.render("[email://a@b.example|mail me]"),
        "<a href=\"mailto:a@b.example\">mail me</a>"
    );
}

#[test]
pub fn unknown_tags_echo_with_parsed_contents() {
    let mut parser = default_parser();
    assert_eq!(
        parser.render("[unknown][b]x[/b][/unknown]"),
        "[unknown]<b>x</b>[/unknown]"
    );
    assert!(parser.error().is_empty());
}
