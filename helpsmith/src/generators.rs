//! Build artifact generation
//!
//! A build turns the in-memory project into the static files the viewer and
//! the host application consume:
//! - `helpCodes.xml`: context-help code to topic mapping (F1 integration)
//! - `helpCodes.js`: the same codes for the viewer runtime
//! - `toc.js`: the tree as positional JSON for the viewer
//! - `hmcontent.htm`: the legacy TOC document itself
//! - `search_index.js`: client-side search payload
//!
//! The `.js` artifacts assign `window.*` globals instead of being JSON files
//! so the viewer keeps working from `file://` urls without CORS headers.

use std::collections::BTreeMap;

use itertools::Itertools;
use log::warn;
use serde_json::{json, Map, Value};

use crate::search::SearchIndex;
use crate::toc::{codec, TocDocument, TocNode};

/// Per-document content cap in the search payload, in characters
const PAYLOAD_CONTENT_LIMIT: usize = 15_000;

/// One context-help mapping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelpCode {
    /// Identifier safe for XML attributes and host-side lookups
    pub code: String,
    /// Topic page the code resolves to
    pub topic: String,
}

/// Derive the help code for a topic url: extension dropped, every character
/// outside `[A-Za-z0-9_]` replaced with `_`
pub fn code_for_url(url: &str) -> String {
    url.strip_suffix(".htm")
        .or_else(|| url.strip_suffix(".HTM"))
        .unwrap_or(url)
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// Help codes for every page-backed node, in document order
pub fn help_codes(toc: &TocDocument) -> Vec<HelpCode> {
    let mut codes = Vec::new();
    toc.for_each_node(|node, _, _| {
        if !node.url.is_empty() {
            codes.push(HelpCode {
                code: code_for_url(&node.url),
                topic: node.url.clone(),
            });
        }
    });
    codes
}

/// Codes claimed by more than one topic, with the claiming topics.
///
/// Distinct urls can sanitize to the same code (`a-b.htm` and `a_b.htm`
/// both become `a_b`); the host resolves such a code to one arbitrary
/// topic, so collisions are worth surfacing before shipping a build.
pub fn detect_code_collisions(toc: &TocDocument) -> Vec<(String, Vec<String>)> {
    let mut by_code: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for entry in help_codes(toc) {
        by_code.entry(entry.code).or_default().push(entry.topic);
    }
    by_code
        .into_iter()
        .filter(|(_, topics)| topics.len() > 1)
        .collect()
}

/// Render `helpCodes.xml`
pub fn help_codes_xml(toc: &TocDocument) -> String {
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<HelpCodes>\n");
    for entry in help_codes(toc) {
        xml.push_str(&format!(
            "  <HelpCode code=\"{}\" topic=\"{}\" />\n",
            escape_xml(&entry.code),
            escape_xml(&entry.topic)
        ));
    }
    xml.push_str("</HelpCodes>");
    xml
}

/// Render `helpCodes.js`.
///
/// Unlike the XML artifact, codes here keep the raw url characters; the
/// viewer matches them against urls, not sanitized identifiers.
pub fn help_codes_js(toc: &TocDocument) -> String {
    let codes = {
        let mut raw = Vec::new();
        toc.for_each_node(|node, _, _| {
            if !node.url.is_empty() {
                let code = node
                    .url
                    .strip_suffix(".htm")
                    .or_else(|| node.url.strip_suffix(".HTM"))
                    .unwrap_or(&node.url)
                    .to_string();
                raw.push(code);
            }
        });
        raw
    };

    let body = codes.iter().map(|code| format!("\"{code}\"")).join(",\n");
    format!("window.helpCodes = {{ data: [\n{body}\n] }};")
}

/// The tree as the viewer's positional-key JSON structure.
///
/// Keys are 1-based dotted paths ("2", "2.1"); a folder's `child` carries a
/// synthetic list id `ul<key>`, a leaf's `child` is null.
fn toc_value(nodes: &[TocNode], prefix: &str) -> Value {
    let mut elements = Map::new();
    let level = if prefix.is_empty() {
        1
    } else {
        prefix.split('.').count() + 1
    };

    for (index, node) in nodes.iter().enumerate() {
        let key = if prefix.is_empty() {
            format!("{}", index + 1)
        } else {
            format!("{prefix}.{}", index + 1)
        };
        let child = if node.children.is_empty() {
            Value::Null
        } else {
            json!({
                "id": format!("ul{key}"),
                "elements": toc_value(&node.children, &key),
            })
        };
        elements.insert(
            key,
            json!({
                "level": level,
                "url": node.url,
                "text": node.text,
                "child": child,
            }),
        );
    }
    Value::Object(elements)
}

fn toc_structure(toc: &TocDocument) -> Value {
    json!({
        "id": "toc",
        "elements": toc_value(&toc.elements, ""),
    })
}

/// Render `toc.js`
pub fn toc_js(toc: &TocDocument) -> String {
    format!("window.TOC={};", toc_structure(toc))
}

/// Render `search_index.js`: indexed documents (content capped), the tree
/// for breadcrumbs and a url-to-title map.
///
/// An index that is not ready produces an empty entry list so a build never
/// fails on search state.
pub fn search_payload_js(toc: &TocDocument, index: &SearchIndex) -> String {
    if !index.is_ready() {
        warn!("search index not ready, search payload will have no entries");
    }

    let entries: Vec<Value> = if index.is_ready() {
        index
            .documents()
            .map(|doc| {
                json!({
                    "id": doc.id,
                    "title": doc.title,
                    "url": doc.url,
                    "content": doc.content.chars().take(PAYLOAD_CONTENT_LIMIT).collect::<String>(),
                })
            })
            .collect()
    } else {
        Vec::new()
    };

    let mut titles = Map::new();
    if index.is_ready() {
        for doc in index.documents() {
            if !doc.url.is_empty() && !doc.title.is_empty() {
                titles.insert(doc.url.to_lowercase(), Value::String(doc.title.clone()));
            }
        }
    }

    let payload = json!({
        "entries": entries,
        "toc": toc_structure(toc),
        "titles": Value::Object(titles),
    });
    format!("window.__SEARCH_DATA__={payload};")
}

/// Generate every build artifact as a filename-to-content map.
///
/// Help-code collisions are logged but do not block the build.
pub fn generate_all(toc: &TocDocument, index: &SearchIndex) -> BTreeMap<String, String> {
    for (code, topics) in detect_code_collisions(toc) {
        warn!(
            "help code '{code}' is claimed by multiple topics: {}",
            topics.join(", ")
        );
    }

    let mut files = BTreeMap::new();
    files.insert("helpCodes.xml".to_string(), help_codes_xml(toc));
    files.insert("helpCodes.js".to_string(), help_codes_js(toc));
    files.insert("toc.js".to_string(), toc_js(toc));
    files.insert("hmcontent.htm".to_string(), codec::serialize(toc));
    files.insert(
        "search_index.js".to_string(),
        search_payload_js(toc, index),
    );
    files
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::toc::TocNode;

    fn sample_toc() -> TocDocument {
        let mut doc = TocDocument::new();
        doc.elements.push(TocNode::new("1", "intro.htm", "Introduction"));
        let mut guide = TocNode::new("2", "", "Guide");
        guide.children.push(TocNode::new("3", "setup-1.htm", "Setup"));
        doc.elements.push(guide);
        doc
    }

    #[test]
    fn test_code_sanitization() {
        assert_eq!(code_for_url("pages/setup-1.htm"), "pages_setup_1");
        assert_eq!(code_for_url("intro.htm"), "intro");
        assert_eq!(code_for_url("настройка.htm"), "_________");
    }

    #[test]
    fn test_help_codes_xml() {
        let xml = help_codes_xml(&sample_toc());
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<HelpCodes>"));
        assert!(xml.contains(r#"<HelpCode code="intro" topic="intro.htm" />"#));
        assert!(xml.contains(r#"<HelpCode code="setup_1" topic="setup-1.htm" />"#));
        assert!(xml.ends_with("</HelpCodes>"));
    }

    #[test]
    fn test_folders_have_no_codes() {
        let codes = help_codes(&sample_toc());
        assert_eq!(codes.len(), 2);
    }

    #[test]
    fn test_help_codes_js_keeps_raw_urls() {
        let js = help_codes_js(&sample_toc());
        assert!(js.starts_with("window.helpCodes = { data: ["));
        assert!(js.contains("\"setup-1\""));
    }

    #[test]
    fn test_collision_detection() {
        let mut doc = TocDocument::new();
        doc.elements.push(TocNode::new("1", "a-b.htm", "First"));
        doc.elements.push(TocNode::new("2", "a_b.htm", "Second"));
        doc.elements.push(TocNode::new("3", "c.htm", "Third"));

        let collisions = detect_code_collisions(&doc);
        assert_eq!(collisions.len(), 1);
        assert_eq!(collisions[0].0, "a_b");
        assert_eq!(collisions[0].1, vec!["a-b.htm", "a_b.htm"]);
    }

    #[test]
    fn test_toc_js_structure() {
        let js = toc_js(&sample_toc());
        assert!(js.starts_with("window.TOC={"));

        let value: Value =
            serde_json::from_str(js.trim_start_matches("window.TOC=").trim_end_matches(';'))
                .unwrap();
        assert_eq!(value["id"], "toc");
        assert_eq!(value["elements"]["1"]["url"], "intro.htm");
        assert_eq!(value["elements"]["1"]["child"], Value::Null);
        assert_eq!(value["elements"]["2"]["level"], 1);
        assert_eq!(value["elements"]["2"]["child"]["id"], "ul2");
        assert_eq!(value["elements"]["2"]["child"]["elements"]["2.1"]["level"], 2);
        assert_eq!(
            value["elements"]["2"]["child"]["elements"]["2.1"]["url"],
            "setup-1.htm"
        );
    }

    #[test]
    fn test_search_payload_with_unready_index() {
        let js = search_payload_js(&sample_toc(), &SearchIndex::new());
        let value: Value = serde_json::from_str(
            js.trim_start_matches("window.__SEARCH_DATA__=").trim_end_matches(';'),
        )
        .unwrap();

        assert_eq!(value["entries"], json!([]));
        assert_eq!(value["toc"]["id"], "toc");
    }

    #[test]
    fn test_generate_all_produces_every_artifact() {
        let files = generate_all(&sample_toc(), &SearchIndex::new());
        for name in [
            "helpCodes.xml",
            "helpCodes.js",
            "toc.js",
            "hmcontent.htm",
            "search_index.js",
        ] {
            assert!(files.contains_key(name), "missing artifact {name}");
        }
        assert!(files["hmcontent.htm"].contains("id=\"toc\""));
    }
}
