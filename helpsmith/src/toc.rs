//! Table-of-contents model
//!
//! This module defines the in-memory tree behind the help project's
//! navigation structure:
//! - `TocNode`: one entry, optionally backed by a topic page
//! - `TocDocument`: the whole ordered tree plus the original HTML text
//!   (kept only to recover head-level boilerplate when re-serializing)
//!
//! Structural edit operations live in [`ops`], the legacy HTML round trip
//! in [`codec`].

use serde::{Deserialize, Serialize};

pub mod codec;
pub mod ops;

pub use ops::{NodeLocation, TocError};

/// One entry in the table of contents.
///
/// A node with a non-empty `url` is backed by a topic page; a node with an
/// empty `url` is a pure folder heading. `children` is always present (an
/// empty vec means a leaf), and its ordering defines document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocNode {
    /// Unique id within the tree, stable across edits (not positional)
    pub id: String,
    /// Relative path to the topic page; empty for folder-only headings
    pub url: String,
    /// Display title
    pub text: String,
    /// Ordered child nodes
    #[serde(default)]
    pub children: Vec<TocNode>,
}

impl TocNode {
    /// Create a leaf node with no children
    pub fn new(
        id: impl Into<String>,
        url: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            text: text.into(),
            children: Vec::new(),
        }
    }

    /// Whether this node renders as an expandable folder
    pub fn is_folder(&self) -> bool {
        !self.children.is_empty()
    }
}

/// The whole table-of-contents tree.
///
/// Owns every node; a move transfers ownership between children lists, never
/// duplicates. `original_html` is provenance data used only to recover the
/// page `<title>` during serialization.
#[derive(Debug, Clone, Default)]
pub struct TocDocument {
    /// Ordered root-level nodes
    pub elements: Vec<TocNode>,
    /// Full text of the TOC file as read from disk, if any
    pub original_html: String,
}

impl TocDocument {
    /// Create an empty document with no source text
    pub fn new() -> Self {
        Self::default()
    }

    /// Visit every node depth-first in document order.
    ///
    /// The callback receives the node, its parent (None at root level) and
    /// its index within the owning children list.
    pub fn for_each_node<'a, F>(&'a self, mut f: F)
    where
        F: FnMut(&'a TocNode, Option<&'a TocNode>, usize),
    {
        fn walk<'a, F>(nodes: &'a [TocNode], parent: Option<&'a TocNode>, f: &mut F)
        where
            F: FnMut(&'a TocNode, Option<&'a TocNode>, usize),
        {
            for (index, node) in nodes.iter().enumerate() {
                f(node, parent, index);
                walk(&node.children, Some(node), f);
            }
        }
        walk(&self.elements, None, &mut f);
    }

    /// Collect every non-empty page url in document order
    pub fn page_urls(&self) -> Vec<String> {
        let mut urls = Vec::new();
        self.for_each_node(|node, _, _| {
            if !node.url.is_empty() {
                urls.push(node.url.clone());
            }
        });
        urls
    }

    /// Total number of nodes in the tree
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        self.for_each_node(|_, _, _| count += 1);
        count
    }
}
