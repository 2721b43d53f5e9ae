//! Address-bar input handling.

use std::collections::HashSet;

use serde::Serialize;

use crate::history::HistoryEntry;

/// Turn what the user typed into a URL to load.
///
/// Returns `None` for blank input. Anything that does not look like an
/// address becomes a search on `search_url` (which must end in the query
/// parameter, e.g. `...?q=`).
pub fn resolve_input(input: &str, search_url: &str) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    let url = if input.contains("://") {
        input.to_string()
    } else if input.starts_with("localhost") || input.starts_with("127.0.0.1") {
        format!("http://{input}")
    } else if input.contains('.') && !input.contains(char::is_whitespace) {
        format!("https://{input}")
    } else {
        format!("{}{}", search_url, urlencoding::encode(input))
    };
    Some(url)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suggestion {
    pub url: String,
    pub title: String,
}

/// Up to `limit` visited pages whose URL or title contains `query`
/// (case-insensitive). `entries` must be newest first; each URL appears once.
pub fn suggestions(entries: &[HistoryEntry], query: &str, limit: usize) -> Vec<Suggestion> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() || limit == 0 {
        return Vec::new();
    }

    let mut seen = HashSet::new();
    entries
        .iter()
        .filter(|entry| {
            entry.url.to_lowercase().contains(&needle) || entry.title.to_lowercase().contains(&needle)
        })
        .filter(|entry| seen.insert(entry.url.as_str()))
        .take(limit)
        .map(|entry| Suggestion {
            url: entry.url.clone(),
            title: entry.title.clone(),
        })
        .collect()
}
