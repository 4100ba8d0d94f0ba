//! The free-text pipeline.
//!
//! Text inside `parse=true` tags and at the tree root runs through a fixed
//! stage order: smiley substitution, URL detection, HTML escaping (or the
//! user's text processor), line-break rewriting. The first two stages turn
//! their matches into finished HTML segments that the later stages leave
//! alone; everything else stays pending until the escape stage.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::def::Output;
use crate::escape::escape_html;
use crate::parser::{BBParser, ParserFeature, SmileyConfig, UrlFinderConfig};
use crate::render::{RenderInfo, TagContext};
use crate::tree::{Tag, TagClass};

static URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:[a-z][a-z0-9+.\-]*://[^\s<>\[\]]+|www\.[^\s<>\[\]]+)").unwrap()
});

/// The smiley table compiled into one alternation, longest key first.
pub(crate) struct SmileySearch {
    regex: Regex,
    icons: Vec<(String, String)>,
    base_url: String,
    format: String,
}

impl SmileySearch {
    pub(crate) fn compile(config: &SmileyConfig) -> Result<SmileySearch, regex::Error> {
        let mut keys: Vec<&str> = config
            .icons
            .iter()
            .map(|(key, _)| key.as_str())
            .filter(|key| !key.is_empty())
            .collect();
        keys.sort_by(|a, b| b.len().cmp(&a.len()));
        let pattern = keys
            .iter()
            .map(|key| regex::escape(key))
            .collect::<Vec<_>>()
            .join("|");
        Ok(SmileySearch {
            regex: Regex::new(&pattern)?,
            icons: config.icons.clone(),
            base_url: config.base_url.clone(),
            format: config.format.clone(),
        })
    }

    fn icon_for(&self, text: &str) -> Option<&str> {
        self.icons
            .iter()
            .find(|(key, _)| key == text)
            .map(|(_, icon)| icon.as_str())
    }
}

enum Seg {
    /// Still subject to the remaining stages.
    Pending(String),
    /// Finished HTML from the smiley or URL stage.
    Done(String),
}

impl BBParser {
    /// Runs one text run through the pipeline.
    pub(crate) fn process_text(&self, text: &str, info: &RenderInfo) -> String {
        // A callback on the text-handler pseudo-tag replaces everything.
        if let Some(def) = self.tags.get("") {
            if let Output::Callback(callback) = &def.output {
                let tag = Tag::text_handler();
                let ctx = TagContext {
                    parser: self,
                    attr: tag.attributes(),
                    fallback: "",
                    content: text,
                    tag: &tag,
                    info,
                };
                return callback(&ctx);
            }
        }

        let mut segs = vec![Seg::Pending(text.to_string())];

        if let Some(search) = &self.smiley_search {
            smiley_pass(search, &mut segs);
        }
        let inside_url = info.classes.get(&TagClass::Url).copied().unwrap_or(0) > 0;
        if !inside_url {
            if let Some(config) = &self.options.url_finder {
                url_pass(config, &mut segs);
            }
        }

        let breaks = self.options.feature_flags.contains(ParserFeature::LINEBREAKS);
        let mut out = String::new();
        for seg in segs {
            match seg {
                Seg::Done(html) => out.push_str(&html),
                Seg::Pending(pending) => {
                    let escaped = match &self.text_processor {
                        Some(processor) => processor(&pending, info),
                        None => escape_html(&pending),
                    };
                    if breaks {
                        out.push_str(&linebreaks(&escaped));
                    } else {
                        out.push_str(&escaped);
                    }
                }
            }
        }
        out
    }
}

/// Left-to-right non-overlapping smiley replacement. A smiley counts only
/// when flanked by whitespace or a boundary of the text run.
fn smiley_pass(search: &SmileySearch, segs: &mut Vec<Seg>) {
    let mut next: Vec<Seg> = Vec::with_capacity(segs.len());
    for seg in segs.drain(..) {
        match seg {
            Seg::Done(done) => next.push(Seg::Done(done)),
            Seg::Pending(text) => {
                let mut last = 0;
                for found in search.regex.find_iter(&text) {
                    if !flanked(&text, found.start(), found.end()) {
                        continue;
                    }
                    let Some(icon) = search.icon_for(found.as_str()) else {
                        continue;
                    };
                    if found.start() > last {
                        next.push(Seg::Pending(text[last..found.start()].to_string()));
                    }
                    let src = format!("{}{}", search.base_url, icon);
                    next.push(Seg::Done(fill_format(
                        &search.format,
                        &escape_html(&src),
                        &escape_html(found.as_str()),
                    )));
                    last = found.end();
                }
                push_tail(&mut next, text, last);
            }
        }
    }
    *segs = next;
}

/// Detects URLs in the still-unescaped segments and renders them per the
/// configured format.
fn url_pass(config: &UrlFinderConfig, segs: &mut Vec<Seg>) {
    let mut next: Vec<Seg> = Vec::with_capacity(segs.len());
    for seg in segs.drain(..) {
        match seg {
            Seg::Done(done) => next.push(Seg::Done(done)),
            Seg::Pending(text) => {
                let mut last = 0;
                for found in URL_RE.find_iter(&text) {
                    if found.start() > last {
                        next.push(Seg::Pending(text[last..found.start()].to_string()));
                    }
                    let url = found.as_str();
                    let href = if url.get(..4).is_some_and(|p| p.eq_ignore_ascii_case("www.")) {
                        format!("http://{url}")
                    } else {
                        url.to_string()
                    };
                    let mut title = url.to_string();
                    if title.chars().count() > config.max_length {
                        title = title.chars().take(config.max_length).collect();
                        title.push_str("...");
                    }
                    next.push(Seg::Done(fill_format(
                        &config.format,
                        &escape_html(&href),
                        &escape_html(&title),
                    )));
                    last = found.end();
                }
                push_tail(&mut next, text, last);
            }
        }
    }
    *segs = next;
}

fn push_tail(next: &mut Vec<Seg>, text: String, last: usize) {
    if last == 0 {
        next.push(Seg::Pending(text));
    } else if last < text.len() {
        next.push(Seg::Pending(text[last..].to_string()));
    }
}

fn flanked(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start]
        .chars()
        .next_back()
        .map_or(true, char::is_whitespace);
    let after = text[end..].chars().next().map_or(true, char::is_whitespace);
    before && after
}

/// Substitutes up to two `%s` slots in a format string.
fn fill_format(format: &str, first: &str, second: &str) -> String {
    format.replacen("%s", first, 1).replacen("%s", second, 1)
}

fn linebreaks(text: &str) -> String {
    text.replace("\r\n", "\n")
        .replace('\r', "\n")
        .replace('\n', "<br>\n")
}
