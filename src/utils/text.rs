//! Text normalization shared by the feed and search-API readers.

use quick_xml::escape::resolve_html5_entity;
use regex::{Captures, Regex};
use scraper::Html;
use std::sync::OnceLock;

static TITLE_ANNOTATION: OnceLock<Regex> = OnceLock::new();
static ANNOUNCE_PREAMBLE: OnceLock<Regex> = OnceLock::new();
static VERSION_SUFFIX: OnceLock<Regex> = OnceLock::new();
static ENTITY: OnceLock<Regex> = OnceLock::new();

fn title_annotation() -> &'static Regex {
    TITLE_ANNOTATION.get_or_init(|| {
        Regex::new(r"\(arXiv:[0-9]+\.[0-9]+v[0-9]+ \[.*\]\)$")
            .expect("valid title annotation regex")
    })
}

fn announce_preamble() -> &'static Regex {
    ANNOUNCE_PREAMBLE.get_or_init(|| {
        Regex::new(r"^\s*arXiv:\S+\s+Announce Type:\s*\S+\s*(Abstract:\s*)?")
            .expect("valid announce preamble regex")
    })
}

fn version_suffix() -> &'static Regex {
    VERSION_SUFFIX.get_or_init(|| Regex::new(r"^(.*[0-9])v[0-9]+$").expect("valid version regex"))
}

fn entity() -> &'static Regex {
    ENTITY.get_or_init(|| {
        Regex::new(r"&(#[xX][0-9A-Fa-f]+|#[0-9]+|[A-Za-z][A-Za-z0-9]*);")
            .expect("valid entity regex")
    })
}

fn resolve_entity(name: &str) -> Option<String> {
    let code = match name.strip_prefix('#') {
        Some(num) => match num.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse().ok()?,
        },
        None => return resolve_html5_entity(name).map(str::to_string),
    };
    char::from_u32(code).map(String::from)
}

/// Decode HTML entities (named and numeric).
///
/// Each entity is decoded on its own; bare `&` and unknown entities are
/// left as they are.
pub fn unescape_html(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    entity()
        .replace_all(text, |caps: &Captures| {
            resolve_entity(&caps[1]).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Drop markup and decode entities, keeping only the text content.
pub fn strip_markup(text: &str) -> String {
    if !text.contains('<') && !text.contains('&') {
        return text.to_string();
    }
    let fragment = Html::parse_fragment(text);
    fragment.root_element().text().collect()
}

/// Replace line breaks with single spaces
pub fn collapse_newlines(text: &str) -> String {
    text.replace("\r\n", " ").replace('\n', " ")
}

/// Remove a trailing `(arXiv:<id>v<n> [<area>])` re-announcement annotation.
///
/// Trailing whitespace left behind is trimmed.
pub fn strip_title_annotation(title: &str) -> String {
    title_annotation().replace(title, "").trim_end().to_string()
}

/// Remove the `arXiv:<id> Announce Type: <type> Abstract:` lead-in that the
/// RSS feed puts in front of each abstract.
pub fn strip_announce_preamble(summary: &str) -> &str {
    match announce_preamble().find(summary) {
        Some(m) => &summary[m.end()..],
        None => summary,
    }
}

/// Split a feed author string into names.
///
/// Line breaks separate authors just like commas do. Each name has its
/// markup stripped and entities decoded.
pub fn split_authors(raw: &str) -> Vec<String> {
    raw.replace('\n', ", ")
        .split(',')
        .map(|author| strip_markup(author).trim().to_string())
        .filter(|author| !author.is_empty())
        .collect()
}

/// Canonical arXiv id: whitespace trimmed and version suffix removed.
///
/// `2501.00002v1` becomes `2501.00002`; ids without a version pass through.
pub fn canonical_id(raw: &str) -> String {
    let raw = raw.trim();
    match version_suffix().captures(raw) {
        Some(caps) => caps[1].to_string(),
        None => raw.to_string(),
    }
}

/// Id from the last non-empty path segment of an abstract-page link
pub fn id_from_link(link: &str) -> Option<String> {
    let link = link.trim();
    let segment = url::Url::parse(link)
        .ok()
        .and_then(|url| {
            url.path_segments()
                .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
                .map(str::to_string)
        })
        .or_else(|| link.rsplit('/').find(|s| !s.is_empty()).map(str::to_string))?;

    let id = canonical_id(&segment);
    (!id.is_empty()).then_some(id)
}

/// Id from a search API entry URL such as `http://arxiv.org/abs/2501.00002v1`.
///
/// Everything after `/abs/` is kept so old-style ids like
/// `hep-th/0101001v1` survive.
pub fn id_from_abs_url(url: &str) -> Option<String> {
    let tail = url.trim().rsplit_once("/abs/").map(|(_, tail)| tail)?;
    let id = canonical_id(tail.trim_matches('/'));
    (!id.is_empty()).then_some(id)
}
