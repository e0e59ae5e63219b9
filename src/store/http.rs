use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::{RemoteStore, SnapshotStore};
use crate::errors::{StoreError, StoreResult};
use crate::model::{Node, NodePosition, Snapshot, SnapshotSummary};

#[derive(Clone, Debug)]
pub struct HttpStoreConfig {
    pub base_url: String,
    pub api_token: Option<String>,
    pub timeout: Duration,
}

impl HttpStoreConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_token: None,
            timeout: Duration::from_secs(10),
        }
    }
}

/// REST client for a remote script store.
///
/// | call               | request                        |
/// |--------------------|--------------------------------|
/// | `list_nodes`       | `GET {base}/nodes`             |
/// | `create_node`      | `POST {base}/nodes`            |
/// | `update_node`      | `PUT {base}/nodes/{id}`        |
/// | `delete_node`      | `DELETE {base}/nodes/{id}`     |
/// | `update_positions` | `PUT {base}/positions`         |
/// | `create_snapshot`  | `POST {base}/snapshots`        |
/// | `list_snapshots`   | `GET {base}/snapshots`         |
/// | `get_snapshot`     | `GET {base}/snapshots/{id}`    |
#[derive(Clone)]
pub struct HttpRemoteStore {
    client: Client,
    base: Url,
    token: Option<String>,
}

enum Missing {
    Node(String),
    Snapshot(String),
    None,
}

impl HttpRemoteStore {
    pub fn new(config: &HttpStoreConfig) -> StoreResult<Self> {
        let base = Url::parse(&config.base_url)
            .map_err(|err| StoreError::InvalidUrl(format!("{}: {}", config.base_url, err)))?;
        if base.cannot_be_a_base() {
            return Err(StoreError::InvalidUrl(config.base_url.clone()));
        }
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            base,
            token: config.api_token.clone().filter(|t| !t.is_empty()),
        })
    }

    fn endpoint(&self, segments: &[&str]) -> StoreResult<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| StoreError::InvalidUrl(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder, missing: Missing) -> StoreResult<Response> {
        let response = self.authorize(request).send().await.map_err(|err| {
            if err.is_connect() || err.is_timeout() {
                StoreError::Unavailable(err.to_string())
            } else {
                StoreError::Http(err)
            }
        })?;

        let status = response.status();
        debug!(url = %response.url(), %status, "Remote store response");
        if status.is_success() {
            return Ok(response);
        }

        let message = response.text().await.unwrap_or_default();
        let err = match (status, missing) {
            (StatusCode::NOT_FOUND, Missing::Node(id)) => StoreError::NotFound(id),
            (StatusCode::NOT_FOUND, Missing::Snapshot(id)) => StoreError::SnapshotNotFound(id),
            (StatusCode::CONFLICT, Missing::Node(id)) => StoreError::AlreadyExists(id),
            (status, _) => StoreError::Rejected {
                status: status.as_u16(),
                message,
            },
        };
        warn!("Remote store rejected request: {}", err);
        Err(err)
    }

    /// Parses a JSON body, or returns `fallback` when the store sent none.
    async fn body_or<T: DeserializeOwned>(response: Response, fallback: T) -> StoreResult<T> {
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(fallback);
        }
        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn list_nodes(&self) -> StoreResult<Vec<Node>> {
        let url = self.endpoint(&["nodes"])?;
        let response = self.send(self.client.get(url), Missing::None).await?;
        Ok(response.json().await?)
    }

    async fn create_node(&self, node: &Node) -> StoreResult<Node> {
        let url = self.endpoint(&["nodes"])?;
        let request = self.client.post(url).json(node);
        let response = self.send(request, Missing::Node(node.id.clone())).await?;
        Self::body_or(response, node.clone()).await
    }

    async fn update_node(&self, id: &str, node: &Node) -> StoreResult<Node> {
        let url = self.endpoint(&["nodes", id])?;
        let request = self.client.put(url).json(node);
        let response = self.send(request, Missing::Node(id.to_string())).await?;
        Self::body_or(response, node.clone()).await
    }

    async fn delete_node(&self, id: &str) -> StoreResult<()> {
        let url = self.endpoint(&["nodes", id])?;
        self.send(self.client.delete(url), Missing::Node(id.to_string()))
            .await?;
        Ok(())
    }

    async fn update_positions(&self, positions: &[NodePosition]) -> StoreResult<()> {
        let url = self.endpoint(&["positions"])?;
        self.send(self.client.put(url).json(positions), Missing::None)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl SnapshotStore for HttpRemoteStore {
    async fn create_snapshot(&self, snapshot: &Snapshot) -> StoreResult<()> {
        let url = self.endpoint(&["snapshots"])?;
        self.send(self.client.post(url).json(snapshot), Missing::None)
            .await?;
        Ok(())
    }

    async fn get_snapshot(&self, id: &str) -> StoreResult<Snapshot> {
        let url = self.endpoint(&["snapshots", id])?;
        let response = self
            .send(self.client.get(url), Missing::Snapshot(id.to_string()))
            .await?;
        Ok(response.json().await?)
    }

    async fn list_snapshots(&self) -> StoreResult<Vec<SnapshotSummary>> {
        let url = self.endpoint(&["snapshots"])?;
        let response = self.send(self.client.get(url), Missing::None).await?;
        let mut summaries: Vec<SnapshotSummary> = response.json().await?;
        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(summaries)
    }
}
