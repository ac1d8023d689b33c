//! Legacy WebHelp TOC round trip
//!
//! The table of contents lives in `hmcontent.htm`, a nested `<ul>/<li>`
//! document produced by a legacy authoring tool and consumed by its viewer
//! runtime. Parsing must survive that tool's quirks (missing ids, list items
//! that escaped the root list); serialization must emit markup the viewer
//! still understands: `heading<N>` depth classes, `i<id>` element ids,
//! anchors targeting the content frame, and the inline expand/collapse
//! script.
//!
//! No HTML-parser dependency is involved: a small tolerant tag lexer is
//! enough for this dialect, and it never rejects malformed input — an
//! unrecognizable document simply parses to an empty tree.

use log::warn;
use regex::Regex;

use super::{TocDocument, TocNode};

/// Element id of the root list
const ROOT_LIST_ID: &str = "toc";

/// Prefix stripped from list-item element ids to recover node ids
const ITEM_ID_PREFIX: char = 'i';

/// Frame name targeted by every topic anchor
const CONTENT_FRAME: &str = "hmcontent";

/// Deepest heading class emitted; deeper nesting is clamped
const MAX_HEADING_LEVEL: usize = 6;

/// Title used when the original document has none
const DEFAULT_TITLE: &str = "Help";

/// Parse a TOC document from its HTML text.
///
/// A document without the root list (a brand-new project, or one the legacy
/// tool mangled beyond recognition) yields an empty tree, not an error. The
/// full input text is retained on the document for later re-serialization.
pub fn parse(html: &str) -> TocDocument {
    let events = lex(html);

    let root_range = find_root_list(&events);
    let mut elements = match root_range {
        Some((open, close)) => {
            let mut pos = open;
            parse_list(&events, &mut pos, close)
        }
        None => {
            warn!("TOC root list (id=\"{ROOT_LIST_ID}\") not found; treating as empty");
            Vec::new()
        }
    };

    // Recover top-level items that ended up outside the root list, a known
    // malformed-input pattern from the legacy authoring tool.
    if let Some((open, close)) = root_range {
        let mut pos = 0;
        while pos < events.len() {
            if pos >= open && pos < close {
                pos = close;
                continue;
            }
            if let Event::Open(tag) = &events[pos] {
                if tag.name == "li" && is_stray_heading(tag) {
                    let index = elements.len();
                    let mut item_pos = pos;
                    elements.push(parse_item(&events, &mut item_pos, events.len(), index));
                    pos = item_pos;
                    continue;
                }
            }
            pos += 1;
        }
    }

    TocDocument {
        elements,
        original_html: html.to_string(),
    }
}

/// Serialize a TOC document back to the legacy HTML dialect.
///
/// The `<title>` is recovered from the document's original text; everything
/// else in the head is regenerated from a fixed template.
pub fn serialize(doc: &TocDocument) -> String {
    let title = extract_title(&doc.original_html).unwrap_or_else(|| DEFAULT_TITLE.to_string());

    let mut out = String::with_capacity(doc.original_html.len().max(4096));
    out.push_str(&head_template(&title));
    write_list(&mut out, &doc.elements, 1);
    out.push_str("\n</body>\n</html>\n");
    out
}

/// First `<title>` element content, if any
fn extract_title(html: &str) -> Option<String> {
    let re = Regex::new(r"(?is)<title>(.*?)</title>").expect("static regex");
    re.captures(html)
        .map(|caps| unescape(caps[1].trim()))
        .filter(|title| !title.is_empty())
}

fn write_list(out: &mut String, items: &[TocNode], level: usize) {
    if items.is_empty() {
        return;
    }

    if level == 1 {
        out.push_str(
            "<ul id=\"toc\" style=\"list-style-type:none;display:block;padding-left:0\">\n",
        );
    } else {
        out.push_str("<ul style=\"list-style-type:none\">\n");
    }

    for item in items {
        let heading = format!("heading{}", level.min(MAX_HEADING_LEVEL));
        let kind = if item.is_folder() { "toc-folder" } else { "toc-page" };
        let dblclick = if item.is_folder() {
            " ondblclick=\"return dblclicked(this)\""
        } else {
            ""
        };

        out.push_str(&format!(
            "<li class=\"{heading} {kind}\" id=\"{prefix}{id}\" onclick=\"return clicked(this,event)\">",
            prefix = ITEM_ID_PREFIX,
            id = escape(&item.id),
        ));
        out.push_str(&format!(
            "<a class=\"{heading}\" id=\"a{id}\" href=\"{url}\" target=\"{CONTENT_FRAME}\">",
            id = escape(&item.id),
            url = escape(&item.url),
        ));
        out.push_str(&format!(
            "<span class=\"{heading}\" id=\"s{id}\"{dblclick}>{text}</span></a>\n",
            id = escape(&item.id),
            text = escape(&item.text),
        ));

        if item.is_folder() {
            write_list(out, &item.children, (level + 1).min(MAX_HEADING_LEVEL));
        }

        out.push_str("</li>\n");
    }

    out.push_str("</ul>\n");
}

// ---------------------------------------------------------------------------
// Tag lexer
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct Tag {
    name: String,
    attrs: Vec<(String, String)>,
}

impl Tag {
    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug)]
enum Event {
    Open(Tag),
    Close(String),
    Text(String),
}

/// Tokenize HTML into open/close/text events.
///
/// Comments and doctype declarations are dropped; `<script>` and `<style>`
/// bodies are consumed opaquely (their content may contain `<`). A `<` that
/// does not start a plausible tag is treated as text.
fn lex(html: &str) -> Vec<Event> {
    let bytes = html.as_bytes();
    let mut events = Vec::new();
    let mut pos = 0;
    let mut text_start = 0;

    while pos < bytes.len() {
        if bytes[pos] != b'<' {
            pos += 1;
            continue;
        }

        let rest = &html[pos..];
        if rest.starts_with("<!--") {
            flush_text(html, text_start, pos, &mut events);
            pos = match html[pos..].find("-->") {
                Some(end) => pos + end + 3,
                None => bytes.len(),
            };
            text_start = pos;
            continue;
        }
        if rest.starts_with("<!") || rest.starts_with("<?") {
            flush_text(html, text_start, pos, &mut events);
            pos = match html[pos..].find('>') {
                Some(end) => pos + end + 1,
                None => bytes.len(),
            };
            text_start = pos;
            continue;
        }

        let closing = rest.starts_with("</");
        let name_start = pos + if closing { 2 } else { 1 };
        if name_start >= bytes.len() || !bytes[name_start].is_ascii_alphabetic() {
            // Not a tag ("a < b" and the like)
            pos += 1;
            continue;
        }

        flush_text(html, text_start, pos, &mut events);

        let mut cursor = name_start;
        while cursor < bytes.len() && (bytes[cursor].is_ascii_alphanumeric() || bytes[cursor] == b'-')
        {
            cursor += 1;
        }
        let name = html[name_start..cursor].to_ascii_lowercase();

        if closing {
            pos = match html[cursor..].find('>') {
                Some(end) => cursor + end + 1,
                None => bytes.len(),
            };
            events.push(Event::Close(name));
            text_start = pos;
            continue;
        }

        let (attrs, tag_end, self_closed) = lex_attrs(html, cursor);
        pos = tag_end;
        text_start = pos;

        // Raw-text elements: skip to the matching close without tokenizing
        if !self_closed && (name == "script" || name == "style") {
            let close_pat = format!("</{name}");
            if let Some(found) = html[pos..].to_ascii_lowercase().find(&close_pat) {
                pos += found;
            } else {
                pos = bytes.len();
            }
            text_start = pos;
            events.push(Event::Open(Tag { name, attrs }));
            continue;
        }

        events.push(Event::Open(Tag { name, attrs }));
        if self_closed {
            // Represent <br/> style tags as an immediately closed pair
            if let Some(Event::Open(tag)) = events.last() {
                let name = tag.name.clone();
                events.push(Event::Close(name));
            }
        }
    }

    flush_text(html, text_start, bytes.len(), &mut events);
    events
}

fn flush_text(html: &str, start: usize, end: usize, events: &mut Vec<Event>) {
    if start >= end {
        return;
    }
    let text = &html[start..end];
    if !text.trim().is_empty() {
        events.push(Event::Text(text.to_string()));
    }
}

/// Lex attributes from after the tag name through `>`.
///
/// Returns the attribute list, the index just past `>`, and whether the tag
/// self-closed with `/>`.
fn lex_attrs(html: &str, mut pos: usize) -> (Vec<(String, String)>, usize, bool) {
    let bytes = html.as_bytes();
    let mut attrs = Vec::new();
    let mut self_closed = false;

    loop {
        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        if pos >= bytes.len() {
            break;
        }
        match bytes[pos] {
            b'>' => {
                pos += 1;
                break;
            }
            b'/' => {
                self_closed = true;
                pos += 1;
            }
            _ => {
                let name_start = pos;
                while pos < bytes.len()
                    && !bytes[pos].is_ascii_whitespace()
                    && bytes[pos] != b'='
                    && bytes[pos] != b'>'
                    && bytes[pos] != b'/'
                {
                    pos += 1;
                }
                let name = html[name_start..pos].to_ascii_lowercase();

                while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
                    pos += 1;
                }
                let mut value = String::new();
                if pos < bytes.len() && bytes[pos] == b'=' {
                    pos += 1;
                    while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
                        pos += 1;
                    }
                    if pos < bytes.len() && (bytes[pos] == b'"' || bytes[pos] == b'\'') {
                        let quote = bytes[pos];
                        pos += 1;
                        let value_start = pos;
                        while pos < bytes.len() && bytes[pos] != quote {
                            pos += 1;
                        }
                        value = unescape(&html[value_start..pos]);
                        if pos < bytes.len() {
                            pos += 1;
                        }
                    } else {
                        let value_start = pos;
                        while pos < bytes.len()
                            && !bytes[pos].is_ascii_whitespace()
                            && bytes[pos] != b'>'
                        {
                            pos += 1;
                        }
                        value = unescape(&html[value_start..pos]);
                    }
                }
                if !name.is_empty() {
                    attrs.push((name, value));
                }
            }
        }
    }

    (attrs, pos, self_closed)
}

// ---------------------------------------------------------------------------
// List parser
// ---------------------------------------------------------------------------

/// Index range (open, matching close) of the root `<ul id="toc">`
fn find_root_list(events: &[Event]) -> Option<(usize, usize)> {
    let open = events.iter().position(|event| {
        matches!(event, Event::Open(tag) if tag.name == "ul" && tag.attr("id") == Some(ROOT_LIST_ID))
    })?;

    let mut depth = 0usize;
    for (index, event) in events.iter().enumerate().skip(open) {
        match event {
            Event::Open(tag) if tag.name == "ul" => depth += 1,
            Event::Close(name) if name == "ul" => {
                depth -= 1;
                if depth == 0 {
                    return Some((open, index));
                }
            }
            _ => {}
        }
    }
    // Unterminated root list; run to end of input
    Some((open, events.len()))
}

/// Parse a `<ul>` starting at `*pos` (which points at its open event),
/// consuming through the matching close.
fn parse_list(events: &[Event], pos: &mut usize, end: usize) -> Vec<TocNode> {
    let mut items = Vec::new();
    *pos += 1; // consume the <ul>

    while *pos < end {
        match &events[*pos] {
            Event::Open(tag) if tag.name == "li" => {
                let index = items.len();
                items.push(parse_item(events, pos, end, index));
            }
            Event::Close(name) if name == "ul" => {
                *pos += 1;
                break;
            }
            _ => *pos += 1,
        }
    }
    items
}

/// Parse one `<li>` starting at `*pos`.
///
/// The item ends at its `</li>`, at a sibling `<li>` that was never closed,
/// or at the enclosing `</ul>`.
fn parse_item(events: &[Event], pos: &mut usize, end: usize, index: usize) -> TocNode {
    let id = match &events[*pos] {
        Event::Open(tag) => match tag.attr("id") {
            Some(raw) => raw.strip_prefix(ITEM_ID_PREFIX).unwrap_or(raw).to_string(),
            None => format!("item_{index}"),
        },
        _ => format!("item_{index}"),
    };
    *pos += 1;

    let mut url = String::new();
    let mut span_text: Option<String> = None;
    let mut link_text = String::new();
    let mut children = Vec::new();
    let mut in_anchor = false;
    let mut seen_anchor = false;

    while *pos < end {
        match &events[*pos] {
            Event::Open(tag) if tag.name == "li" => break, // unclosed sibling
            Event::Close(name) if name == "li" => {
                *pos += 1;
                break;
            }
            Event::Close(name) if name == "ul" => break, // enclosing list ends
            Event::Open(tag) if tag.name == "ul" => {
                children = parse_list(events, pos, end);
            }
            Event::Open(tag) if tag.name == "a" && !seen_anchor => {
                in_anchor = true;
                seen_anchor = true;
                url = tag.attr("href").unwrap_or_default().to_string();
                *pos += 1;
            }
            Event::Close(name) if name == "a" => {
                in_anchor = false;
                *pos += 1;
            }
            Event::Open(tag) if tag.name == "span" && in_anchor && span_text.is_none() => {
                *pos += 1;
                span_text = Some(collect_text(events, pos, end, "span"));
            }
            Event::Text(text) if in_anchor => {
                link_text.push_str(&unescape(text));
                *pos += 1;
            }
            _ => *pos += 1,
        }
    }

    let text = span_text.unwrap_or(link_text).trim().to_string();
    TocNode {
        id,
        url,
        text,
        children,
    }
}

/// Accumulate text until the matching close of `name`, starting just past
/// its open event.
fn collect_text(events: &[Event], pos: &mut usize, end: usize, name: &str) -> String {
    let mut text = String::new();
    let mut depth = 1usize;

    while *pos < end {
        match &events[*pos] {
            Event::Open(tag) if tag.name == name => depth += 1,
            Event::Close(close) if close == name => {
                depth -= 1;
                if depth == 0 {
                    *pos += 1;
                    break;
                }
            }
            Event::Text(chunk) => text.push_str(&unescape(chunk)),
            _ => {}
        }
        *pos += 1;
    }
    text
}

/// A list item the legacy tool emitted outside the root list: has an
/// `i`-prefixed id and the top-level heading class
fn is_stray_heading(tag: &Tag) -> bool {
    let has_item_id = tag
        .attr("id")
        .is_some_and(|id| id.starts_with(ITEM_ID_PREFIX));
    let is_top_heading = tag
        .attr("class")
        .is_some_and(|class| class.split_whitespace().any(|c| c == "heading1"));
    has_item_id && is_top_heading
}

// ---------------------------------------------------------------------------
// Escaping
// ---------------------------------------------------------------------------

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

/// Fixed head emitted on every serialization: viewer stylesheets, chevron
/// and hover styling for the tree, and the expand/collapse/active-highlight
/// script the generated list's handlers call into.
fn head_template(title: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <title>{title}</title>
  <meta http-equiv="Content-Type" content="text/html; charset=UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1">

  <link type="text/css" href="default.css" rel="stylesheet" />
  <link type="text/css" href="scrollbars.css" rel="stylesheet" />

  <style type="text/css">
    body {{
      font-size: 13px;
      font-family: 'Segoe UI', '-apple-system', BlinkMacSystemFont, Roboto, Helvetica, Arial, sans-serif;
      margin: 0;
      padding: 8px 0 8px 12px;
      color: #002669;
    }}
    .heading1, .heading2, .heading3,
    .heading4, .heading5, .heading6 {{ color: #002669; text-decoration: none; }}

    #toc, #toc ul {{ list-style: none; margin: 0; padding: 0; }}
    #toc li {{ margin: 0; padding: 0; }}

    #toc a {{
      display: block;
      padding: 4px 8px 4px 4px;
      border-radius: 6px;
      color: #002669;
      text-decoration: none;
      line-height: 1.4;
      transition: background 0.15s ease;
    }}
    #toc a:hover {{ background: #ecf4fb; }}

    #toc .toc-folder > a::before {{
      content: '';
      display: inline-block;
      width: 0; height: 0;
      border-top: 4px solid transparent;
      border-bottom: 4px solid transparent;
      border-left: 5px solid #93a3b8;
      margin-right: 6px;
      vertical-align: middle;
      transition: transform 0.2s ease;
    }}
    #toc .toc-folder.expanded > a::before {{
      transform: rotate(90deg);
      border-left-color: #0054a0;
    }}

    #toc .toc-page > a::before {{
      content: '';
      display: inline-block;
      width: 4px; height: 4px;
      border-radius: 50%;
      background: #93a3b8;
      margin-right: 8px;
      vertical-align: middle;
    }}

    #toc .toc-folder > ul {{
      margin-left: 9px;
      padding-left: 12px !important;
      border-left: 1px solid #e0f0fc;
    }}

    #toc .toc-active > a {{
      background: #e0f0fc;
      font-weight: 600;
    }}
  </style>
  <link type="text/css" href="custom.css" rel="stylesheet" />
  <script type="text/javascript" src="helpman_settings.js"></script>
  <script type="text/javascript">
    function toggleNode(li, expand) {{
      var ul = li.querySelector(':scope > ul');
      if (!ul) return;
      ul.style.display = expand ? 'block' : 'none';
      li.classList.toggle('expanded', expand);
    }}

    function setAll(expand) {{
      var folders = document.querySelectorAll('#toc .toc-folder');
      for (var i = 0; i < folders.length; i++) toggleNode(folders[i], expand);
    }}

    function clicked(node, event) {{
      event.stopPropagation();
      var ul = node.querySelector(':scope > ul');
      document.querySelectorAll('#toc .toc-active').forEach(function(el) {{ el.classList.remove('toc-active'); }});
      node.classList.add('toc-active');
      if (ul) toggleNode(node, ul.style.display === 'none');
      return true;
    }}

    function dblclicked(node) {{
      var li = node.closest('li');
      var ul = li.querySelector(':scope > ul');
      if (ul) toggleNode(li, ul.style.display === 'none');
      return false;
    }}

    document.addEventListener('DOMContentLoaded', function() {{
      var state = (typeof initialtocstate !== 'undefined') ? initialtocstate : 'collapseall';
      setAll(state === 'expandall');
    }});
  </script>
</head>
<body>
"#,
        title = escape(title)
    )
}
