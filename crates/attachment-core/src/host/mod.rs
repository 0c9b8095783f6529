//! Capabilities the host note application provides.
//!
//! The core never talks to the host directly; it is handed implementations
//! of these traits. [`DataApiClient`] is the HTTP implementation used by the
//! RPC backend, tests use in-memory fakes.

mod data_api;

pub use data_api::DataApiClient;

use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// An attachment as the host lists it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub mime: String,
    /// Milliseconds since the Unix epoch of the last content change.
    #[serde(default)]
    pub updated_time: i64,
}

/// One page of the host's attachment listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourcePage {
    #[serde(default)]
    pub items: Vec<Resource>,
    #[serde(default)]
    pub has_more: bool,
}

/// A note that references an attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteRef {
    pub id: String,
    #[serde(default)]
    pub title: String,
}

/// Paginated attachment listing (pages start at 1).
#[async_trait]
pub trait ResourceCatalog: Send + Sync {
    async fn list_resources(&self, page: u32) -> Result<ResourcePage>;
}

/// Reverse lookup from an attachment to the notes that embed it.
#[async_trait]
pub trait NoteLookup: Send + Sync {
    async fn list_referencing_notes(&self, resource_id: &str) -> Result<Vec<NoteRef>>;
}

/// Opens a note in the host and closes the search surface.
#[async_trait]
pub trait Navigator: Send + Sync {
    async fn navigate_to_note(&self, note_id: &str) -> Result<()>;
}
