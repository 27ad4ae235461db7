//! Extraction of structured data from the portal's rendered HTML.
//!
//! If the portal changes its markup, this is the only module that should need
//! to follow.

use std::sync::LazyLock;

use regex::Regex;

use super::{FolderEntry, FolderNode, TreeSnapshot};

static OPEN_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[A-Za-z][^>]*>").expect("valid regex"));

static ID_ATTR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\bid="([^"]+)""#).expect("valid regex"));

static EXPANDED_ATTR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\baria-expanded="([^"]+)""#).expect("valid regex"));

static LISTING_ROW_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"div index="\d+".*?\bid="([^"]+)""#).expect("valid regex"));

/// Parses the folder tree rendered under `root_id`.
///
/// Every element whose id extends `root_id` becomes a node. A node counts as
/// collapsed only when its own tag carries `aria-expanded="false"`; leaves
/// without the attribute have nothing left to reveal.
#[must_use]
pub fn parse_tree(markup: &str, root_id: &str) -> TreeSnapshot {
    let nodes = OPEN_TAG_RE
        .find_iter(markup)
        .filter_map(|tag| {
            let tag = tag.as_str();
            let id = unescape(ID_ATTR_RE.captures(tag)?.get(1)?.as_str());
            if id.len() <= root_id.len() || !id.starts_with(root_id) {
                return None;
            }
            let expanded = EXPANDED_ATTR_RE
                .captures(tag)
                .and_then(|c| c.get(1))
                .is_none_or(|v| !v.as_str().eq_ignore_ascii_case("false"));
            Some(FolderNode { id, expanded })
        })
        .collect();
    TreeSnapshot { nodes }
}

/// Parses the listing grid of an opened folder into entries.
#[must_use]
pub fn parse_listing(markup: &str) -> Vec<FolderEntry> {
    LISTING_ROW_RE
        .captures_iter(markup)
        .filter_map(|c| c.get(1))
        .map(|m| FolderEntry::from_id(unescape(m.as_str())))
        .collect()
}

/// Builds a CSS attribute selector matching an element id exactly.
///
/// Portal ids contain `:` which a plain `#id` selector would misread.
#[must_use]
pub fn id_selector(id: &str) -> String {
    format!("[id=\"{}\"]", id.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Builds the XPath of the clickable label inside a tree node.
#[must_use]
pub fn node_label_xpath(id: &str) -> String {
    if id.contains('"') {
        format!("//*[@id='{id}']/a/span")
    } else {
        format!("//*[@id=\"{id}\"]/a/span")
    }
}

fn unescape(value: &str) -> String {
    if !value.contains('&') {
        return value.to_string();
    }
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
