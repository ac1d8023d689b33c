//! Search index cache serialization
//!
//! The index is expensive to rebuild on large projects, so it is persisted
//! as JSON next to the project. The payload is versioned; any version
//! mismatch (or parse failure) silently falls back to a full rebuild.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::SearchDocument;

/// Current cache payload version
pub const CACHE_VERSION: u32 = 2;

/// Cache file name inside the project directory
pub const CACHE_FILE: &str = ".helpsmith_cache.json";

#[derive(Serialize, Deserialize)]
struct CachePayload {
    version: u32,
    documents: Vec<(String, SearchDocument)>,
    #[serde(rename = "invertedIndex")]
    inverted_index: Vec<(String, Vec<String>)>,
}

/// Serialize the index state to the cache JSON format
pub fn encode(
    documents: &BTreeMap<String, SearchDocument>,
    inverted: &BTreeMap<String, BTreeSet<String>>,
) -> String {
    let payload = CachePayload {
        version: CACHE_VERSION,
        documents: documents
            .iter()
            .map(|(id, doc)| (id.clone(), doc.clone()))
            .collect(),
        inverted_index: inverted
            .iter()
            .map(|(stem, ids)| (stem.clone(), ids.iter().cloned().collect()))
            .collect(),
    };
    serde_json::to_string(&payload).unwrap_or_else(|_| String::from("{}"))
}

/// Restore index state from cache JSON.
///
/// Returns `None` for unparseable payloads and for any version other than
/// [`CACHE_VERSION`].
#[allow(clippy::type_complexity)]
pub fn decode(
    json: &str,
) -> Option<(
    BTreeMap<String, SearchDocument>,
    BTreeMap<String, BTreeSet<String>>,
)> {
    let payload: CachePayload = serde_json::from_str(json).ok()?;
    if payload.version != CACHE_VERSION {
        return None;
    }

    let documents = payload.documents.into_iter().collect();
    let inverted = payload
        .inverted_index
        .into_iter()
        .map(|(stem, ids)| (stem, ids.into_iter().collect()))
        .collect();
    Some((documents, inverted))
}
