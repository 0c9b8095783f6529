//! Query execution and result enrichment.
//!
//! A query is answered from the full-text index, then every matching
//! attachment is expanded into one row per note that references it.

use crate::config::{OrphanPolicy, SearchConfig};
use crate::host::{NoteLookup, NoteRef};
use crate::index::{IndexStore, SearchMatch};
use crate::protocol::SearchResult;
use crate::Result;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Answers `search` requests.
#[derive(Clone)]
pub struct QueryService {
    store: IndexStore,
    notes: Arc<dyn NoteLookup>,
    config: SearchConfig,
}

impl QueryService {
    pub fn new(store: IndexStore, notes: Arc<dyn NoteLookup>, config: SearchConfig) -> Self {
        Self {
            store,
            notes,
            config,
        }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Run `text` against the index and enrich the ranked matches.
    ///
    /// Blank input answers with no rows without touching storage.
    pub async fn query(&self, text: &str) -> Result<Vec<SearchResult>> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let start = Instant::now();
        let query = text.to_string();
        let matches = self
            .store
            .with_blocking(move |store| store.search(&query))
            .await?;
        let results = self.enrich(matches).await;
        debug!(
            "Query {:?}: {} rows in {}ms",
            text,
            results.len(),
            start.elapsed().as_millis()
        );
        Ok(results)
    }

    /// Expand matches into (attachment, note) rows, keeping match order.
    pub async fn enrich(&self, matches: Vec<SearchMatch>) -> Vec<SearchResult> {
        let lookups = join_all(matches.iter().map(|m| self.referencing_notes(&m.id))).await;

        let mut results = Vec::new();
        for (m, notes) in matches.into_iter().zip(lookups) {
            if notes.is_empty() {
                if self.config.orphan_policy == OrphanPolicy::Include {
                    results.push(SearchResult::orphan(&m));
                }
                continue;
            }
            results.extend(notes.into_iter().map(|note| SearchResult::for_note(&m, note)));
        }
        results
    }

    async fn referencing_notes(&self, resource_id: &str) -> Vec<NoteRef> {
        match self.notes.list_referencing_notes(resource_id).await {
            Ok(notes) => notes,
            Err(e) => {
                warn!("Failed to look up notes for {}: {}", resource_id, e);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AttachmentSearchError;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use tempfile::TempDir;

    struct StaticNotes(HashMap<String, Vec<NoteRef>>);

    #[async_trait]
    impl NoteLookup for StaticNotes {
        async fn list_referencing_notes(&self, resource_id: &str) -> Result<Vec<NoteRef>> {
            if resource_id == "broken" {
                return Err(AttachmentSearchError::Host {
                    message: "lookup failed".to_string(),
                });
            }
            Ok(self.0.get(resource_id).cloned().unwrap_or_default())
        }
    }

    fn note(id: &str) -> NoteRef {
        NoteRef {
            id: id.to_string(),
            title: format!("Note {}", id),
        }
    }

    fn service(dir: &TempDir, policy: OrphanPolicy) -> QueryService {
        let store = IndexStore::open_in_dir(dir.path()).unwrap();
        store.upsert_record("r1", "invoice.pdf", "quarterly invoice").unwrap();
        store.upsert_record("r2", "orphan.pdf", "invoice copy").unwrap();

        let mut notes = HashMap::new();
        notes.insert("r1".to_string(), vec![note("n1"), note("n2")]);

        QueryService::new(
            store,
            Arc::new(StaticNotes(notes)),
            SearchConfig {
                orphan_policy: policy,
            },
        )
    }

    fn sorted_rows(results: &[SearchResult]) -> Vec<(String, Option<String>)> {
        let mut rows: Vec<_> = results
            .iter()
            .map(|r| (r.id.clone(), r.note.as_ref().map(|n| n.id.clone())))
            .collect();
        rows.sort();
        rows
    }

    #[tokio::test]
    async fn test_one_row_per_referencing_note() {
        let dir = TempDir::new().unwrap();
        let results = service(&dir, OrphanPolicy::Omit)
            .query("invoice")
            .await
            .unwrap();

        assert_eq!(
            sorted_rows(&results),
            vec![
                ("r1".to_string(), Some("n1".to_string())),
                ("r1".to_string(), Some("n2".to_string())),
            ]
        );
    }

    #[tokio::test]
    async fn test_orphans_included_with_null_note() {
        let dir = TempDir::new().unwrap();
        let results = service(&dir, OrphanPolicy::Include)
            .query("invoice")
            .await
            .unwrap();

        assert_eq!(results.len(), 3);
        assert!(results
            .iter()
            .any(|r| r.id == "r2" && r.note.is_none() && r.title == "orphan.pdf"));
    }

    #[tokio::test]
    async fn test_blank_query_is_empty() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir, OrphanPolicy::Include);
        assert!(service.query("").await.unwrap().is_empty());
        assert!(service.query("  \t").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_enrich_preserves_match_order() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir, OrphanPolicy::Include);
        let matches = vec![
            SearchMatch {
                id: "r2".to_string(),
                title: "orphan.pdf".to_string(),
            },
            SearchMatch {
                id: "r1".to_string(),
                title: "invoice.pdf".to_string(),
            },
        ];

        let results = service.enrich(matches).await;
        let ids: Vec<_> = results
            .iter()
            .map(|r| (r.id.as_str(), r.note.as_ref().map(|n| n.id.as_str())))
            .collect();
        assert_eq!(
            ids,
            vec![("r2", None), ("r1", Some("n1")), ("r1", Some("n2"))]
        );
    }

    #[tokio::test]
    async fn test_failed_lookup_treated_as_orphan() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir, OrphanPolicy::Omit);
        let results = service
            .enrich(vec![SearchMatch {
                id: "broken".to_string(),
                title: "x.pdf".to_string(),
            }])
            .await;
        assert!(results.is_empty());
    }
}
