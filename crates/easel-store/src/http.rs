//! REST client for the hosted version store

use crate::error::StoreError;
use crate::snapshot::StateSnapshot;
use crate::{VersionListing, VersionStore};
use async_trait::async_trait;
use easel_artifact::ArtifactVersion;
use reqwest::StatusCode;

/// HTTP-backed version store
///
/// Paths, relative to the base URL:
/// - `GET  /threads/{id}/artifact/versions`
/// - `GET  /threads/{id}/artifact/versions/{index}`
/// - `POST /threads/{id}/state`
#[derive(Debug, Clone)]
pub struct HttpVersionStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpVersionStore {
    /// Create a client against a base URL
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Create with a preconfigured reqwest client (timeouts, headers)
    #[must_use]
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

#[async_trait]
impl VersionStore for HttpVersionStore {
    async fn list_versions(&self, thread_id: &str) -> Result<VersionListing, StoreError> {
        let url = self.url(&format!("/threads/{thread_id}/artifact/versions"));
        tracing::debug!(%url, "listing artifact versions");
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(StoreError::Status {
                code: response.status().as_u16(),
            });
        }
        Ok(response.json().await?)
    }

    async fn fetch_version(
        &self,
        thread_id: &str,
        index: u32,
    ) -> Result<ArtifactVersion, StoreError> {
        let url = self.url(&format!("/threads/{thread_id}/artifact/versions/{index}"));
        tracing::debug!(%url, index, "fetching artifact version");
        let response = self.client.get(&url).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Err(StoreError::VersionNotFound { index }),
            status if !status.is_success() => Err(StoreError::Status {
                code: status.as_u16(),
            }),
            _ => Ok(response.json().await?),
        }
    }

    async fn persist_state(&self, snapshot: &StateSnapshot) -> Result<(), StoreError> {
        let url = self.url(&format!("/threads/{}/state", snapshot.thread_id));
        tracing::debug!(%url, messages = snapshot.messages.len(), "persisting state");
        let response = self.client.post(&url).json(snapshot).send().await?;
        if !response.status().is_success() {
            return Err(StoreError::Status {
                code: response.status().as_u16(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_normalized() {
        let store = HttpVersionStore::new("http://localhost:8123/");
        assert_eq!(
            store.url("/threads/t1/state"),
            "http://localhost:8123/threads/t1/state"
        );
    }
}
