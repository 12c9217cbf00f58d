//! Free-text search over the catalog
//!
//! User input is never passed to FTS5 as query syntax. Punctuation is blanked out
//! and what remains is searched as a single literal phrase, which the trigram
//! tokenizer matches as a substring anywhere in a document's text.

use crate::config::DEFAULT_SEARCH_LIMIT;
use crate::storage::{CatalogStore, SnippetConfig};
use anyhow::Result;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// ASCII punctuation that is replaced by a space before searching, along with
/// every control character.
const EXCLUDED_CHARACTERS: &str = "!\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~";

/// One search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    /// Catalogued original path
    pub path: String,
    /// Final segment of `path`
    pub filename: String,
    /// Matching passage with highlight markers
    pub snippet: String,
}

/// Turn raw user input into an FTS5 phrase, or `None` when nothing searchable remains.
pub fn sanitize_query(raw: &str) -> Option<String> {
    let blanked: String = raw
        .chars()
        .map(|c| {
            if c.is_control() || EXCLUDED_CHARACTERS.contains(c) {
                ' '
            } else {
                c
            }
        })
        .collect();
    let collapsed = blanked.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.is_empty() {
        None
    } else {
        Some(format!("\"{collapsed}\""))
    }
}

/// Final path segment, accepting either separator.
pub fn file_name_of(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

#[derive(Clone)]
pub struct QueryEngine {
    catalog: Arc<dyn CatalogStore>,
    snippet: SnippetConfig,
    limit: usize,
}

impl std::fmt::Debug for QueryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryEngine")
            .field("snippet", &self.snippet)
            .field("limit", &self.limit)
            .finish_non_exhaustive()
    }
}

impl QueryEngine {
    pub fn new(catalog: Arc<dyn CatalogStore>) -> Self {
        Self {
            catalog,
            snippet: SnippetConfig::default(),
            limit: DEFAULT_SEARCH_LIMIT,
        }
    }

    pub fn with_snippet_config(mut self, snippet: SnippetConfig) -> Self {
        self.snippet = snippet;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Best matches for `raw_query`, at most the configured limit.
    pub async fn search(&self, raw_query: &str) -> Result<Vec<SearchHit>> {
        let Some(phrase) = sanitize_query(raw_query) else {
            debug!("Query {:?} is empty after sanitizing", raw_query);
            return Ok(Vec::new());
        };

        let rows = self.catalog.search(&phrase, &self.snippet, self.limit).await?;
        debug!("{} matches for {}", rows.len(), phrase);

        Ok(rows
            .into_iter()
            .map(|row| SearchHit {
                filename: file_name_of(&row.original_path).to_string(),
                path: row.original_path,
                snippet: row.snippet,
            })
            .collect())
    }

    /// Indexed text of a catalogued path.
    pub async fn content(&self, path: &str) -> Result<Option<String>> {
        self.catalog.content(path).await
    }
}
