use crate::html::{default_parser, default_tags};
use crate::parser::attr::{AttrScan, AttributeParser, AttributeQuote};
use crate::tree::{Attributes, TagClass};
use crate::{BBParser, ParserFeature, ParserOptions, TagDef};

fn html_parser_with(options: ParserOptions) -> BBParser {
    let mut parser = BBParser::with_options(options).unwrap();
    for (name, def) in default_tags() {
        parser.register(name, def);
    }
    parser
}

fn recovering() -> BBParser {
    html_parser_with(ParserOptions {
        feature_flags: ParserFeature::default() | ParserFeature::CLOSE_OPEN_TAGS,
        ..ParserOptions::default()
    })
}

const ROUND_TRIPS: &[&str] = &[
    "plain text, no tags at all",
    "[b]x[/b] tail",
    "[b]open",
    "[/b]",
    "[quote=Alice name=x]hi[/quote]",
    "[quote=\"a ]b\"]x[/quote]",
    "[quote]\nfoo\n[/quote]",
    "[url=/x]a link[/url]",
    "[url://example.com/x|here]",
    "[noparse] [b]x[/b] [/noparse]",
    "[noparse] unterminated",
    "[foo=bar far boo]x[/foo]",
    "[list]\n[*]one\n[*]two\n[/list]",
    "[][[][6][a[ab]c[i]italic[but][* not] 8[]]][",
    "[b]foo[i]bar[/b]quux",
];

#[test]
pub fn round_trip_default() {
    let mut parser = default_parser();
    for input in ROUND_TRIPS {
        assert_eq!(parser.parse(input).raw_text(), *input, "for {input:?}");
    }
}

#[test]
pub fn round_trip_recovering() {
    let mut parser = recovering();
    for input in ROUND_TRIPS {
        assert_eq!(parser.parse(input).raw_text(), *input, "for {input:?}");
    }
}

const SIMPLE: &str = "[b]This is a test![/b] and it's very cool.";

#[test]
pub fn simple_tag_tree() {
    let mut parser = default_parser();
    let tree = parser.parse(SIMPLE);
    assert_eq!(tree.nodes().len(), 2);
    let bold = tree.nodes()[0].as_tag().unwrap();
    assert_eq!(bold.get_name(), "b");
    assert!(bold.is_closed());
    assert_eq!(bold.get_content(), "This is a test!");
    assert_eq!(
        tree.nodes()[1].as_text(),
        Some(" and it's very cool.")
    );
    assert!(parser.error().is_empty());
}

#[test]
pub fn stray_brackets_coalesce_into_text() {
    let mut parser = default_parser();
    let tree = parser.parse("a [not-a-tag");
    assert_eq!(tree.nodes().len(), 1);
    assert_eq!(tree.nodes()[0].as_text(), Some("a [not-a-tag"));
}

#[test]
pub fn direct_attributes() {
    let mut parser = default_parser();
    let tree = parser.parse("[quote=Alice name=x n2=\"a ]b\"]hi[/quote]");
    let quote = tree.nodes()[0].as_tag().unwrap();
    let attrs = quote.attributes();
    assert!(attrs.is_valid());
    assert_eq!(attrs.fallback(), "Alice");
    assert_eq!(attrs.named(), &[
        ("name".to_string(), "x".to_string()),
        ("n2".to_string(), "a ]b".to_string()),
    ]);
    assert_eq!(attrs.raw(), "=Alice name=x n2=\"a ]b\"");
    assert_eq!(attrs.get("n2"), Some("a ]b"));
    // The legacy pair list leads with the empty-key fallback.
    assert_eq!(attrs.to_pairs()[0], (String::new(), "Alice".to_string()));
}

#[test]
pub fn quoted_value_keeps_spaces_and_opposite_quote() {
    let mut parser = default_parser();
    let tree = parser.parse("[quote=\"it's a ]test\"]x[/quote]");
    let quote = tree.nodes()[0].as_tag().unwrap();
    assert_eq!(quote.get_attr(), "it's a ]test");
}

#[test]
pub fn empty_values_are_allowed() {
    let mut parser = default_parser();
    let tree = parser.parse("[quote= name=]x[/quote]");
    let quote = tree.nodes()[0].as_tag().unwrap();
    assert!(quote.attributes().is_valid());
    assert_eq!(quote.get_attr(), "");
    assert_eq!(quote.attributes().get("name"), Some(""));
}

#[test]
pub fn single_quote_configuration() {
    let mut parser = html_parser_with(ParserOptions {
        attribute_quote: AttributeQuote::Single,
        ..ParserOptions::default()
    });
    let tree = parser.parse("[quote='a b']x[/quote]");
    assert_eq!(tree.nodes()[0].as_tag().unwrap().get_attr(), "a b");

    // Double quotes are no longer quote characters, so the space splits an
    // unquoted value from a word that is not a key=value pair.
    parser.parse("[quote=\"a b\"]x[/quote]");
    assert_eq!(parser.error(), ["quote".to_string()]);
}

#[test]
pub fn indirect_attributes() {
    let mut parser = html_parser_with(ParserOptions {
        feature_flags: ParserFeature::default() - ParserFeature::DIRECT_ATTRIBUTES,
        ..ParserOptions::default()
    });
    let tree = parser.parse("[quote name=Alice]x[/quote]");
    let quote = tree.nodes()[0].as_tag().unwrap();
    assert_eq!(quote.get_attr(), "");
    assert_eq!(quote.attributes().get("name"), Some("Alice"));

    // A direct fallback is non-conforming in this dialect.
    parser.parse("[quote=Alice]x[/quote]");
    assert_eq!(parser.error(), ["quote".to_string()]);
}

#[test]
pub fn strict_rejects_malformed_attributes() {
    let mut parser = default_parser();
    let tree = parser.parse("[quote=bar far boo]x[/quote]");
    assert_eq!(tree.nodes().len(), 1);
    assert_eq!(tree.nodes()[0].as_text(), Some("[quote=bar far boo]x[/quote]"));
    assert_eq!(parser.error(), ["quote".to_string()]);
}

#[test]
pub fn lenient_keeps_tag_with_empty_attributes() {
    let mut parser = html_parser_with(ParserOptions {
        feature_flags: ParserFeature::default() - ParserFeature::STRICT_ATTRIBUTES,
        ..ParserOptions::default()
    });
    let tree = parser.parse("[quote=bar far boo]x[/quote]");
    let quote = tree.nodes()[0].as_tag().unwrap();
    assert!(!quote.attributes().is_valid());
    assert_eq!(quote.get_attr(), "");
    assert_eq!(quote.attributes().raw(), "=bar far boo");
    assert_eq!(quote.get_content(), "x");
    assert_eq!(quote.raw_text(), "[quote=bar far boo]x[/quote]");
}

#[test]
pub fn unknown_tag_stays_literal() {
    let mut parser = default_parser();
    let tree = parser.parse("[unknown]x[/unknown]");
    assert_eq!(tree.nodes().len(), 1);
    assert_eq!(tree.nodes()[0].as_text(), Some("[unknown]x[/unknown]"));
    assert!(parser.error().is_empty());
}

#[test]
pub fn single_tags_take_no_closer() {
    let mut parser = default_parser();
    parser.register("hr", TagDef::template("<hr>").single(true));
    let tree = parser.parse("[hr]a[/hr]");
    let hr = tree.nodes()[0].as_tag().unwrap();
    assert!(hr.is_single());
    assert!(hr.get_children().is_empty());
    // The stray closer is literal text.
    assert_eq!(tree.nodes()[1].as_text(), Some("a[/hr]"));
}

#[test]
pub fn short_tag_structure() {
    let mut parser = default_parser();
    let tree = parser.parse("[url://example.com/x|here]");
    let url = tree.nodes()[0].as_tag().unwrap();
    assert!(url.is_short());
    assert!(url.is_closed());
    assert_eq!(url.get_attr(), "example.com/x");
    assert_eq!(url.get_content(), "here");
    assert_eq!(url.raw_text(), "[url://example.com/x|here]");
}

#[test]
pub fn short_tag_without_title_uses_body() {
    let mut parser = default_parser();
    let tree = parser.parse("[url://example.com/x]");
    let url = tree.nodes()[0].as_tag().unwrap();
    assert_eq!(url.get_attr(), "example.com/x");
    assert_eq!(url.get_content(), "example.com/x");
}

#[test]
pub fn first_pipe_separates_title() {
    let mut parser = default_parser();
    let tree = parser.parse("[url://a|b|c]");
    let url = tree.nodes()[0].as_tag().unwrap();
    assert_eq!(url.get_attr(), "a");
    assert_eq!(url.get_content(), "b|c");
}

#[test]
pub fn short_block_tag_is_refused_under_inline_ancestor() {
    let mut parser = default_parser();
    parser.register(
        "panel",
        TagDef::template("<div>%s</div>")
            .class(TagClass::Block)
            .short(true),
    );
    let tree = parser.parse("[b]a[panel://x|y][/b]");
    let bold = tree.nodes()[0].as_tag().unwrap();
    assert!(bold.is_closed());
    assert_eq!(bold.get_content(), "a[panel://x|y]");
    assert_eq!(parser.error(), ["panel".to_string()]);
}

#[test]
pub fn short_block_tag_closes_inline_ancestors_when_recovering() {
    let mut parser = recovering();
    parser.register(
        "panel",
        TagDef::template("<div>%s</div>")
            .class(TagClass::Block)
            .short(true),
    );
    let tree = parser.parse("[b]a[panel://x|y]");
    let bold = tree.nodes()[0].as_tag().unwrap();
    assert!(bold.is_closed());
    assert_eq!(bold.get_content(), "a");
    let panel = tree.nodes()[1].as_tag().unwrap();
    assert_eq!(panel.get_name(), "panel");
    assert!(panel.is_short());
    assert_eq!(panel.get_attr(), "x");
    assert_eq!(panel.get_content(), "y");
    assert_eq!(parser.error(), ["b".to_string()]);
}

#[test]
pub fn short_only_tags_ignore_the_classic_form() {
    let mut parser = default_parser();
    parser.register(
        "wiki",
        TagDef::template("url:<a href=\"/w/%{uri}A\">%s</a>")
            .classic(false)
            .short(true),
    );
    // The classic form is treated like an undefined name: literal
    // delimiters, no error record.
    assert_eq!(parser.render("[wiki]x[/wiki]"), "[wiki]x[/wiki]");
    assert!(parser.error().is_empty());

    let tree = parser.parse("[wiki://Harold|the page]");
    let wiki = tree.nodes()[0].as_tag().unwrap();
    assert!(wiki.is_short());
    assert_eq!(wiki.get_attr(), "Harold");
    assert_eq!(wiki.get_content(), "the page");
    assert_eq!(
        parser.render("[wiki://Harold|the page]"),
        "<a href=\"/w/Harold\">the page</a>"
    );
}

#[test]
pub fn short_form_requires_definition_flag() {
    let mut parser = default_parser();
    // `b` does not allow the short form, and `://` is not valid attribute
    // syntax, so the tag is rejected.
    let tree = parser.parse("[b://x]");
    assert_eq!(tree.nodes()[0].as_text(), Some("[b://x]"));
    assert_eq!(parser.error(), ["b".to_string()]);
}

#[test]
pub fn url_inside_url_is_refused() {
    let mut parser = default_parser();
    let tree = parser.parse("[url=/a][url=/b]x[/url][/url]");
    let outer = tree.nodes()[0].as_tag().unwrap();
    assert_eq!(outer.get_name(), "url");
    assert!(outer.is_closed());
    assert_eq!(outer.get_children().len(), 1);
    assert_eq!(outer.get_children()[0].as_text(), Some("[url=/b]x"));
    assert_eq!(tree.nodes()[1].as_text(), Some("[/url]"));
    assert_eq!(parser.error(), ["url".to_string()]);
}

#[test]
pub fn block_in_inline_is_refused_by_default() {
    let mut parser = default_parser();
    let tree = parser.parse("[b]a[quote]c[/quote]d[/b]");
    let bold = tree.nodes()[0].as_tag().unwrap();
    assert!(bold.is_closed());
    assert_eq!(bold.get_content(), "a[quote]c[/quote]d");
    assert_eq!(parser.error(), ["quote".to_string()]);
}

#[test]
pub fn block_in_inline_closes_ancestors_when_recovering() {
    let mut parser = recovering();
    let tree = parser.parse("[b]a[quote]c[/quote][/b]");
    let bold = tree.nodes()[0].as_tag().unwrap();
    assert!(bold.is_closed());
    assert_eq!(bold.get_content(), "a");
    let quote = tree.nodes()[1].as_tag().unwrap();
    assert_eq!(quote.get_name(), "quote");
    assert_eq!(quote.class(), TagClass::Block);
    // The leftover closer has nothing to close.
    assert_eq!(tree.nodes()[2].as_text(), Some("[/b]"));
    assert_eq!(parser.error(), ["b".to_string()]);
}

#[test]
pub fn mismatched_close_is_literal_by_default() {
    let mut parser = default_parser();
    let tree = parser.parse("[b]foo[i]bar[/b]quux");
    let bold = tree.nodes()[0].as_tag().unwrap();
    assert!(!bold.is_closed());
    let italic = bold.get_children()[1].as_tag().unwrap();
    assert!(!italic.is_closed());
    assert_eq!(italic.get_content(), "bar[/b]quux");
    assert_eq!(parser.error(), ["i".to_string(), "b".to_string()]);
}

#[test]
pub fn mismatched_close_autocloses_when_recovering() {
    let mut parser = recovering();
    let tree = parser.parse("[b]foo[i]bar[/b]quux");
    let bold = tree.nodes()[0].as_tag().unwrap();
    assert!(bold.is_closed());
    let italic = bold.get_children()[1].as_tag().unwrap();
    assert!(italic.is_closed());
    assert_eq!(italic.get_content(), "bar");
    assert_eq!(tree.nodes()[1].as_text(), Some("quux"));
    assert_eq!(parser.error(), ["i".to_string()]);
}

#[test]
pub fn list_items_close_implicitly() {
    let mut parser = default_parser();
    let tree = parser.parse("[list][*]one[*]two[/list]");
    let list = tree.nodes()[0].as_tag().unwrap();
    assert_eq!(list.get_children().len(), 2);
    for item in list.get_children() {
        let item = item.as_tag().unwrap();
        assert_eq!(item.get_name(), "*");
        assert!(item.is_closed());
    }
    // Implicit closes are not errors.
    assert!(parser.error().is_empty());
}

#[test]
pub fn unclosed_frames_stay_open_at_end_of_input() {
    let mut parser = default_parser();
    let tree = parser.parse("[b]open");
    let bold = tree.nodes()[0].as_tag().unwrap();
    assert!(!bold.is_closed());
    assert_eq!(parser.error(), ["b".to_string()]);
}

#[test]
pub fn unclosed_frames_autoclose_when_recovering() {
    let mut parser = recovering();
    let tree = parser.parse("[b]open");
    let bold = tree.nodes()[0].as_tag().unwrap();
    assert!(bold.is_closed());
    assert_eq!(parser.error(), ["b".to_string()]);
}

#[test]
pub fn noparse_captures_verbatim() {
    let mut parser = default_parser();
    let tree = parser.parse("[noparse] [b]x[/b] [/noparse]");
    let noparse = tree.nodes()[0].as_tag().unwrap();
    assert!(noparse.is_closed());
    assert_eq!(noparse.get_children().len(), 1);
    assert_eq!(noparse.get_children()[0].as_text(), Some(" [b]x[/b] "));
}

#[test]
pub fn noparse_closer_is_case_sensitive() {
    let mut parser = default_parser();
    let tree = parser.parse("[noparse]x[/NOPARSE]");
    let noparse = tree.nodes()[0].as_tag().unwrap();
    assert!(!noparse.is_closed());
    assert_eq!(noparse.get_content(), "x[/NOPARSE]");
    assert_eq!(parser.error(), ["noparse".to_string()]);
}

#[test]
pub fn nested_closer_ends_noparse_immediately() {
    let mut parser = default_parser();
    let tree = parser.parse("[noparse]a[/noparse]b");
    let noparse = tree.nodes()[0].as_tag().unwrap();
    assert_eq!(noparse.get_content(), "a");
    assert_eq!(tree.nodes()[1].as_text(), Some("b"));
}

#[test]
pub fn strip_linebreaks_folds_newlines_into_delimiters() {
    let mut parser = default_parser();
    let tree = parser.parse("[quote]\nfoo\n[/quote]");
    let quote = tree.nodes()[0].as_tag().unwrap();
    assert_eq!(quote.get_content(), "foo");
    assert_eq!(quote.raw_text(), "[quote]\nfoo\n[/quote]");
}

#[test]
pub fn strip_linebreaks_can_be_disabled() {
    let mut parser = html_parser_with(ParserOptions {
        feature_flags: ParserFeature::default() - ParserFeature::STRIP_LINEBREAKS,
        ..ParserOptions::default()
    });
    let tree = parser.parse("[quote]\nfoo\n[/quote]");
    assert_eq!(tree.nodes()[0].as_tag().unwrap().get_content(), "\nfoo\n");
}

#[test]
pub fn occurrence_numbers_count_per_name() {
    let mut parser = default_parser();
    let tree = parser.parse("[b]a[/b][i]c[/i][b]d[/b]");
    assert_eq!(tree.nodes()[0].as_tag().unwrap().get_num(), 0);
    assert_eq!(tree.nodes()[1].as_tag().unwrap().get_num(), 0);
    assert_eq!(tree.nodes()[2].as_tag().unwrap().get_num(), 1);
}

#[test]
pub fn forbid_and_permit_toggle_names() {
    let mut parser = default_parser();
    parser.forbid(["b"]);
    let tree = parser.parse("[b]x[/b]");
    assert_eq!(tree.nodes()[0].as_text(), Some("[b]x[/b]"));
    assert!(parser.error().is_empty());

    parser.permit(["b"]);
    let tree = parser.parse("[b]x[/b]");
    assert_eq!(tree.nodes()[0].as_tag().unwrap().get_name(), "b");
}

struct WholeRegionParser;

impl AttributeParser for WholeRegionParser {
    fn parse(&self, rest: &str, _tag_name: &str) -> AttrScan {
        match rest.find(']') {
            Some(end) => AttrScan {
                attributes: Attributes::new(&rest[..end], Vec::new(), &rest[..end], true),
                consumed: end + 1,
                closed: true,
            },
            None => AttrScan {
                attributes: Attributes::new("", Vec::new(), rest, false),
                consumed: rest.len(),
                closed: false,
            },
        }
    }
}

#[test]
pub fn attribute_parser_is_replaceable() {
    let mut parser = default_parser();
    parser.set_attribute_parser(Box::new(WholeRegionParser));
    let tree = parser.parse("[b ?! junk]x[/b]");
    let bold = tree.nodes()[0].as_tag().unwrap();
    assert_eq!(bold.get_attr(), " ?! junk");
    assert_eq!(bold.get_content(), "x");
    assert_eq!(bold.raw_text(), "[b ?! junk]x[/b]");
}
