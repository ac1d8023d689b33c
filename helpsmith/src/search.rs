//! Full-text search over topic pages
//!
//! The index has two layers:
//! - a document store holding extracted plain text per TOC node, used for
//!   substring and wildcard queries with ranked results
//! - an inverted stem index used for cache persistence, stem lookups and
//!   typo-tolerant stem matching
//!
//! Queries against an index that is not ready return no results instead of
//! failing; the caller decides when to (re)build.

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, info, warn};
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::fs_access::FileAccess;
use crate::toc::{TocDocument, TocNode};

pub mod cache;
pub mod extract;
pub mod query;
pub mod text;

pub use cache::{CACHE_FILE, CACHE_VERSION};
pub use extract::extract_text;

/// Maximum number of results returned by a single query
const RESULT_LIMIT: usize = 50;

/// Default edit distance for typo-tolerant stem matching
const FUZZY_DISTANCE: usize = 2;

/// One indexed topic page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchDocument {
    /// TOC node id this page belongs to
    pub id: String,
    /// Node title at indexing time
    pub title: String,
    /// Relative page path
    pub url: String,
    /// Extracted plain text
    pub content: String,
}

/// Index lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexState {
    /// No index built yet
    Empty,
    /// A build is in progress; queries return nothing
    Indexing,
    /// Index is queryable
    Ready,
}

/// One ranked search hit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    pub id: String,
    pub title: String,
    pub url: String,
    /// HTML snippet with `<mark>` highlights
    pub snippet: String,
    /// Lower is more relevant: 0 title prefix, 1 title, 2 content
    pub priority: u8,
    pub in_title: bool,
    pub in_content: bool,
}

/// The full-text index over a project's topic pages.
///
/// All mutation goes through `&mut self`, so concurrent builds or updates
/// cannot interleave; reads work on any shared reference.
#[derive(Debug, Default)]
pub struct SearchIndex {
    documents: BTreeMap<String, SearchDocument>,
    inverted: BTreeMap<String, BTreeSet<String>>,
    state: IndexState,
}

impl Default for IndexState {
    fn default() -> Self {
        IndexState::Empty
    }
}

impl SearchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> IndexState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == IndexState::Ready
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    /// All indexed documents in id order
    pub fn documents(&self) -> impl Iterator<Item = &SearchDocument> {
        self.documents.values()
    }

    /// Build the index from every page-backed node in the tree.
    ///
    /// Unreadable pages are skipped with a warning. Returns the number of
    /// documents indexed. A build already in progress is not restarted.
    ///
    /// # Parameters
    /// * `toc` - tree whose page urls to index
    /// * `fs` - file access used to read the pages
    pub fn build(&mut self, toc: &TocDocument, fs: &dyn FileAccess) -> usize {
        if self.state == IndexState::Indexing {
            debug!("index build already in progress, skipping");
            return 0;
        }
        self.state = IndexState::Indexing;
        self.documents.clear();
        self.inverted.clear();

        let mut pages: Vec<(String, String, String)> = Vec::new();
        toc.for_each_node(|node, _, _| {
            if !node.url.is_empty() {
                pages.push((node.id.clone(), node.text.clone(), node.url.clone()));
            }
        });

        let extracted = read_pages(&pages, fs);

        for (id, title, url, content) in extracted {
            self.index_text(&id, &format!("{title} {content}"));
            self.documents.insert(
                id.clone(),
                SearchDocument {
                    id,
                    title,
                    url,
                    content,
                },
            );
        }

        self.state = IndexState::Ready;
        info!("search index built: {} documents", self.documents.len());
        self.documents.len()
    }

    /// Re-index a single node after its page content changed.
    ///
    /// Nodes without a page, and pages that cannot be read, leave the index
    /// unchanged. Returns whether the document was (re)indexed.
    pub fn update_document(&mut self, node: &TocNode, fs: &dyn FileAccess) -> bool {
        if node.url.is_empty() {
            return false;
        }
        let content = match fs.read_text_file(&node.url) {
            Ok(html) => extract_text(&html),
            Err(err) => {
                warn!("cannot reindex {}: {err}", node.url);
                return false;
            }
        };

        self.remove_from_inverted(&node.id);
        self.index_text(&node.id, &format!("{} {content}", node.text));
        self.documents.insert(
            node.id.clone(),
            SearchDocument {
                id: node.id.clone(),
                title: node.text.clone(),
                url: node.url.clone(),
                content,
            },
        );
        if self.state == IndexState::Empty {
            self.state = IndexState::Ready;
        }
        true
    }

    /// Drop a document from both layers of the index
    pub fn remove_document(&mut self, id: &str) {
        self.remove_from_inverted(id);
        self.documents.remove(id);
    }

    /// Run a query: wildcard when it contains `*` or `?`, otherwise ranked
    /// substring search over titles and content.
    ///
    /// Results are capped at 50 and ordered by priority; ties keep document
    /// id order. An index that is not ready yields nothing.
    pub fn search(&self, raw_query: &str) -> Vec<SearchResult> {
        let query = raw_query.trim();
        if query.is_empty() || !self.is_ready() {
            return Vec::new();
        }

        if query.contains('*') || query.contains('?') {
            return self.wildcard_search(query);
        }

        let needle = query.to_lowercase();
        let mut results = Vec::new();

        for doc in self.documents.values() {
            let title_lower = doc.title.to_lowercase();
            let content_lower = doc.content.to_lowercase();
            let in_title = title_lower.contains(&needle);
            let in_content = content_lower.contains(&needle);
            if !in_title && !in_content {
                continue;
            }

            let priority = if title_lower.starts_with(&needle) {
                0
            } else if in_title {
                1
            } else {
                2
            };

            results.push(SearchResult {
                id: doc.id.clone(),
                title: doc.title.clone(),
                url: doc.url.clone(),
                snippet: query::snippet(&doc.content, query),
                priority,
                in_title,
                in_content,
            });
        }

        results.sort_by_key(|result| result.priority);
        results.truncate(RESULT_LIMIT);
        results
    }

    fn wildcard_search(&self, pattern: &str) -> Vec<SearchResult> {
        let Some(regex) = query::wildcard_regex(pattern) else {
            return Vec::new();
        };
        let plain: String = pattern
            .chars()
            .filter(|c| *c != '*' && *c != '?')
            .collect();

        let mut results = Vec::new();
        for doc in self.documents.values() {
            let in_title = regex.is_match(&doc.title);
            let in_content = regex.is_match(&doc.content);
            if !in_title && !in_content {
                continue;
            }
            results.push(SearchResult {
                id: doc.id.clone(),
                title: doc.title.clone(),
                url: doc.url.clone(),
                snippet: query::snippet(&doc.content, &plain),
                priority: u8::from(!in_title),
                in_title,
                in_content,
            });
        }

        results.sort_by_key(|result| result.priority);
        results.truncate(RESULT_LIMIT);
        results
    }

    /// Ids of documents whose text contains a word with the same stem
    pub fn lookup_stem(&self, word: &str) -> BTreeSet<String> {
        self.inverted
            .get(&text::stem(&word.to_lowercase()))
            .cloned()
            .unwrap_or_default()
    }

    /// Indexed stems within edit distance [`FUZZY_DISTANCE`] of the given
    /// word's stem, for typo-tolerant lookups
    pub fn find_similar_stems(&self, word: &str) -> Vec<String> {
        let target = text::stem(&word.to_lowercase());
        let target_len = target.chars().count();

        self.inverted
            .keys()
            .filter(|candidate| {
                let candidate_len = candidate.chars().count();
                candidate_len.abs_diff(target_len) <= FUZZY_DISTANCE
                    && text::levenshtein(&target, candidate) <= FUZZY_DISTANCE
            })
            .cloned()
            .collect()
    }

    /// Serialize the index to its cache representation
    pub fn to_cache_json(&self) -> String {
        cache::encode(&self.documents, &self.inverted)
    }

    /// Restore an index from cache JSON; `None` on version mismatch or
    /// unparseable input
    pub fn from_cache_json(json: &str) -> Option<Self> {
        let (documents, inverted) = cache::decode(json)?;
        Some(Self {
            documents,
            inverted,
            state: IndexState::Ready,
        })
    }

    fn index_text(&mut self, id: &str, full_text: &str) {
        for word in text::tokenize(full_text) {
            let stem = text::stem(&word);
            if stem.chars().count() < 2 {
                continue;
            }
            self.inverted
                .entry(stem)
                .or_default()
                .insert(id.to_string());
        }
    }

    fn remove_from_inverted(&mut self, id: &str) {
        for ids in self.inverted.values_mut() {
            ids.remove(id);
        }
        self.inverted.retain(|_, ids| !ids.is_empty());
    }
}

/// Read and extract every page, skipping unreadable ones
#[cfg(feature = "parallel")]
fn read_pages(
    pages: &[(String, String, String)],
    fs: &dyn FileAccess,
) -> Vec<(String, String, String, String)> {
    pages
        .par_iter()
        .filter_map(|(id, title, url)| match fs.read_text_file(url) {
            Ok(html) => Some((
                id.clone(),
                title.clone(),
                url.clone(),
                extract_text(&html),
            )),
            Err(err) => {
                warn!("skipping {url}: {err}");
                None
            }
        })
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn read_pages(
    pages: &[(String, String, String)],
    fs: &dyn FileAccess,
) -> Vec<(String, String, String, String)> {
    pages
        .iter()
        .filter_map(|(id, title, url)| match fs.read_text_file(url) {
            Ok(html) => Some((
                id.clone(),
                title.clone(),
                url.clone(),
                extract_text(&html),
            )),
            Err(err) => {
                warn!("skipping {url}: {err}");
                None
            }
        })
        .collect()
}
