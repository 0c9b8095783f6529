//! HTTP client for the host's REST data API.

use super::{NoteLookup, NoteRef, Resource, ResourceCatalog, ResourcePage};
use crate::config::DataApiConfig;
use crate::{AttachmentSearchError, Result};
use async_trait::async_trait;
use mini_moka::sync::Cache;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Paginated envelope used by every listing endpoint.
#[derive(Debug, Deserialize)]
struct Paginated<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
    #[serde(default)]
    has_more: bool,
}

/// Client for the host data API (`/resources`, `/resources/{id}/notes`).
///
/// Note lookups are cached briefly: every keystroke in the search box
/// resolves the same handful of matches again.
pub struct DataApiClient {
    http: Client,
    base_url: Url,
    token: Option<String>,
    note_cache: Cache<String, Vec<NoteRef>>,
}

impl DataApiClient {
    /// Create a client for the API rooted at `base_url`.
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self> {
        Self::with_cache_ttl(base_url, token, DataApiConfig::NOTE_CACHE_TTL)
    }

    /// Create a client with a custom note cache TTL (zero disables caching).
    pub fn with_cache_ttl(base_url: &str, token: Option<String>, ttl: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(AttachmentSearchError::Config {
                message: format!("Data API URL cannot be a base: {}", base_url),
            });
        }

        let http = Client::builder()
            .timeout(DataApiConfig::REQUEST_TIMEOUT)
            .user_agent(concat!("attachment-search/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AttachmentSearchError::Network {
                message: format!("Failed to create HTTP client: {}", e),
                status_code: None,
            })?;

        let capacity = if ttl.is_zero() {
            0
        } else {
            DataApiConfig::NOTE_CACHE_CAPACITY
        };

        Ok(Self {
            http,
            base_url,
            token,
            note_cache: Cache::builder()
                .time_to_live(ttl.max(Duration::from_millis(1)))
                .max_capacity(capacity)
                .build(),
        })
    }

    /// Build an endpoint URL from path segments and query pairs.
    fn endpoint(&self, segments: &[&str], query: &[(&str, String)]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| AttachmentSearchError::Config {
                message: format!("Data API URL cannot be a base: {}", self.base_url),
            })?
            .pop_if_empty()
            .extend(segments);

        if !query.is_empty() || self.token.is_some() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
            if let Some(token) = &self.token {
                pairs.append_pair("token", token);
            }
        }
        Ok(url)
    }

    async fn get_page<T: DeserializeOwned>(&self, url: Url) -> Result<Paginated<T>> {
        debug!("GET {}", url.path());
        let response = self.http.get(url).send().await?.error_for_status()?;
        Ok(response.json::<Paginated<T>>().await?)
    }
}

#[async_trait]
impl ResourceCatalog for DataApiClient {
    async fn list_resources(&self, page: u32) -> Result<ResourcePage> {
        let url = self.endpoint(
            &["resources"],
            &[
                ("page", page.to_string()),
                ("fields", DataApiConfig::RESOURCE_FIELDS.to_string()),
            ],
        )?;
        let listing: Paginated<Resource> = self.get_page(url).await?;
        Ok(ResourcePage {
            items: listing.items,
            has_more: listing.has_more,
        })
    }
}

#[async_trait]
impl NoteLookup for DataApiClient {
    async fn list_referencing_notes(&self, resource_id: &str) -> Result<Vec<NoteRef>> {
        if let Some(notes) = self.note_cache.get(&resource_id.to_string()) {
            return Ok(notes);
        }

        let mut notes = Vec::new();
        let mut page = 1u32;
        loop {
            let url = self.endpoint(
                &["resources", resource_id, "notes"],
                &[
                    ("page", page.to_string()),
                    ("fields", DataApiConfig::NOTE_FIELDS.to_string()),
                ],
            )?;
            let listing: Paginated<NoteRef> = self.get_page(url).await?;
            notes.extend(listing.items);
            if !listing.has_more {
                break;
            }
            page += 1;
        }

        self.note_cache.insert(resource_id.to_string(), notes.clone());
        Ok(notes)
    }
}
