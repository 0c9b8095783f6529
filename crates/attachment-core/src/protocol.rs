//! Two-message wire protocol between the search surface and the backend.
//!
//! ```json
//! { "type": "search", "query": "invoice" }
//! { "type": "goto", "resourceId": "a1", "noteId": "n1" }
//! ```
//!
//! `search` answers with a list of [`SearchResult`]; `goto` answers `null`.

use crate::host::{NoteRef, Navigator};
use crate::index::SearchMatch;
use crate::search::QueryService;
use crate::{AttachmentSearchError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

/// Request to open the note that references a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GotoRequest {
    pub resource_id: String,
    pub note_id: String,
}

/// A message sent by the search surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Message {
    Search { query: String },
    Goto(GotoRequest),
}

/// One result row: a matching attachment paired with one referencing note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: String,
    pub title: String,
    /// `None` (`null` on the wire) when no note references the attachment.
    pub note: Option<NoteRef>,
}

impl SearchResult {
    pub fn for_note(m: &SearchMatch, note: NoteRef) -> Self {
        Self {
            id: m.id.clone(),
            title: m.title.clone(),
            note: Some(note),
        }
    }

    pub fn orphan(m: &SearchMatch) -> Self {
        Self {
            id: m.id.clone(),
            title: m.title.clone(),
            note: None,
        }
    }

    /// The navigation request for this row, if it has a note.
    pub fn goto_request(&self) -> Option<GotoRequest> {
        self.note.as_ref().map(|note| GotoRequest {
            resource_id: self.id.clone(),
            note_id: note.id.clone(),
        })
    }
}

/// Answers protocol messages against the query service and the host.
#[derive(Clone)]
pub struct ProtocolHandler {
    query: QueryService,
    navigator: Arc<dyn Navigator>,
}

impl ProtocolHandler {
    pub fn new(query: QueryService, navigator: Arc<dyn Navigator>) -> Self {
        Self { query, navigator }
    }

    pub async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        self.query.query(query).await
    }

    pub async fn goto(&self, request: &GotoRequest) -> Result<()> {
        if request.note_id.is_empty() {
            return Err(AttachmentSearchError::InvalidParams {
                message: "goto requires a noteId".to_string(),
            });
        }
        info!(
            "Navigating to note {} for attachment {}",
            request.note_id, request.resource_id
        );
        self.navigator.navigate_to_note(&request.note_id).await
    }

    /// Dispatch one message and return its JSON response.
    pub async fn handle(&self, message: Message) -> Result<Value> {
        match message {
            Message::Search { query } => Ok(serde_json::to_value(self.search(&query).await?)?),
            Message::Goto(request) => {
                self.goto(&request).await?;
                Ok(Value::Null)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SearchConfig;
    use crate::host::NoteLookup;
    use crate::index::IndexStore;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[test]
    fn test_search_message_shape() {
        let message: Message =
            serde_json::from_value(json!({"type": "search", "query": "cat"})).unwrap();
        assert_eq!(
            message,
            Message::Search {
                query: "cat".to_string()
            }
        );
    }

    #[test]
    fn test_goto_message_shape() {
        let message = Message::Goto(GotoRequest {
            resource_id: "r1".to_string(),
            note_id: "n1".to_string(),
        });
        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({"type": "goto", "resourceId": "r1", "noteId": "n1"})
        );
    }

    #[test]
    fn test_unknown_message_type_rejected() {
        assert!(serde_json::from_value::<Message>(json!({"type": "delete", "id": "x"})).is_err());
    }

    #[test]
    fn test_orphan_result_serializes_null_note() {
        let result = SearchResult::orphan(&SearchMatch {
            id: "r1".to_string(),
            title: "a.pdf".to_string(),
        });
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({"id": "r1", "title": "a.pdf", "note": null})
        );
        assert!(result.goto_request().is_none());
    }

    struct NoNotes;

    #[async_trait]
    impl NoteLookup for NoNotes {
        async fn list_referencing_notes(&self, _resource_id: &str) -> Result<Vec<NoteRef>> {
            Ok(Vec::new())
        }
    }

    #[derive(Default)]
    struct RecordingNavigator(Mutex<Vec<String>>);

    #[async_trait]
    impl Navigator for RecordingNavigator {
        async fn navigate_to_note(&self, note_id: &str) -> Result<()> {
            self.0.lock().unwrap().push(note_id.to_string());
            Ok(())
        }
    }

    fn handler(dir: &TempDir, navigator: Arc<RecordingNavigator>) -> ProtocolHandler {
        let store = IndexStore::open_in_dir(dir.path()).unwrap();
        store.upsert_record("r1", "scan.pdf", "hello world").unwrap();
        ProtocolHandler::new(
            QueryService::new(store, Arc::new(NoNotes), SearchConfig::default()),
            navigator,
        )
    }

    #[tokio::test]
    async fn test_handle_search_returns_rows() {
        let dir = TempDir::new().unwrap();
        let handler = handler(&dir, Arc::new(RecordingNavigator::default()));

        let response = handler
            .handle(Message::Search {
                query: "hello".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(
            response,
            json!([{"id": "r1", "title": "scan.pdf", "note": null}])
        );
    }

    #[tokio::test]
    async fn test_handle_goto_navigates() {
        let dir = TempDir::new().unwrap();
        let navigator = Arc::new(RecordingNavigator::default());
        let handler = handler(&dir, navigator.clone());

        let response = handler
            .handle(Message::Goto(GotoRequest {
                resource_id: "r1".to_string(),
                note_id: "n9".to_string(),
            }))
            .await
            .unwrap();

        assert_eq!(response, Value::Null);
        assert_eq!(*navigator.0.lock().unwrap(), vec!["n9".to_string()]);
    }

    #[tokio::test]
    async fn test_goto_without_note_is_invalid() {
        let dir = TempDir::new().unwrap();
        let handler = handler(&dir, Arc::new(RecordingNavigator::default()));
        let err = handler
            .goto(&GotoRequest {
                resource_id: "r1".to_string(),
                note_id: String::new(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AttachmentSearchError::InvalidParams { .. }));
    }
}
