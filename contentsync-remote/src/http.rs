//! HTTP implementation of [`SearchClient`].
//!
//! Speaks the Upstash Search REST protocol: bearer-token auth, JSON bodies and
//! responses wrapped in `{"result": ...}` or `{"error": "..."}`.

use crate::client::{RemoteOperation, SearchClient, SearchClientConfig, TaskHandle};
use crate::error::{RemoteError, RemoteResult};
use async_trait::async_trait;
use contentsync_types::{Credentials, IndexInfo, SearchDocument};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Default, Deserialize)]
struct InfoResult {
    #[serde(default)]
    indexes: HashMap<String, IndexInfo>,
}

/// Remote search client over HTTP.
pub struct HttpSearchClient {
    config: SearchClientConfig,
    client: Client,
    credentials: Arc<RwLock<Credentials>>,
}

impl HttpSearchClient {
    /// Creates a client with no credentials; every call fails with
    /// [`RemoteError::NotConfigured`] until [`SearchClient::use_credentials`].
    pub fn new(config: SearchClientConfig) -> RemoteResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RemoteError::Client(e.to_string()))?;

        Ok(Self {
            config,
            client,
            credentials: Arc::new(RwLock::new(Credentials::default())),
        })
    }

    /// Creates a client already pointed at a host.
    pub fn with_credentials(config: SearchClientConfig, credentials: Credentials) -> RemoteResult<Self> {
        let mut client = Self::new(config)?;
        client.credentials = Arc::new(RwLock::new(credentials));
        Ok(client)
    }

    async fn request(&self, method: Method, path: &str) -> RemoteResult<(RequestBuilder, String)> {
        let credentials = self.credentials.read().await.clone();
        if !credentials.is_configured() {
            return Err(RemoteError::NotConfigured);
        }
        let host = credentials.host.trim().trim_end_matches('/').to_string();
        let builder = self
            .client
            .request(method, format!("{host}/{path}"))
            .bearer_auth(&credentials.api_key);
        Ok((builder, host))
    }

    /// Sends a request and returns the `result` member of the response
    /// (`null` when the service omits it).
    async fn send_value(&self, builder: RequestBuilder, host: &str) -> RemoteResult<Value> {
        let response = builder.send().await.map_err(|e| RemoteError::Connectivity {
            host: host.to_string(),
            message: e.to_string(),
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| RemoteError::Connectivity {
            host: host.to_string(),
            message: format!("failed to read response body: {e}"),
        })?;

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(RemoteError::Connectivity {
                host: host.to_string(),
                message: format!("authentication failed ({status}): {}", error_message(&body)),
            });
        }

        if !status.is_success() {
            return Err(self.service_error(status, error_message(&body)));
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        let envelope: Value = serde_json::from_str(&body)
            .map_err(|e| RemoteError::InvalidResponse(format!("{e}: {body}")))?;
        if let Some(error) = envelope.get("error").and_then(Value::as_str) {
            return Err(self.service_error(status, error.to_string()));
        }
        Ok(envelope.get("result").cloned().unwrap_or(Value::Null))
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder, host: &str) -> RemoteResult<T> {
        let result = self.send_value(builder, host).await?;
        serde_json::from_value(result).map_err(|e| RemoteError::InvalidResponse(e.to_string()))
    }

    fn service_error(&self, status: StatusCode, message: String) -> RemoteError {
        RemoteError::Service {
            status: status.as_u16(),
            message,
            link: Some(self.config.reference_url.clone()),
        }
    }
}

/// Pulls the `error` member out of an error body, or returns the body itself.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

fn index_path(operation: &str, index: &str) -> String {
    format!("{operation}/{}", urlencoding::encode(index))
}

#[async_trait]
impl SearchClient for HttpSearchClient {
    async fn use_credentials(&self, credentials: &Credentials) {
        *self.credentials.write().await = credentials.clone();
    }

    async fn host(&self) -> String {
        self.credentials.read().await.host.clone()
    }

    async fn list_indexes(&self) -> RemoteResult<Vec<String>> {
        let (builder, host) = self.request(Method::GET, "list-indexes").await?;
        let raw: Vec<Value> = self.send(builder, &host).await?;
        // The service has answered both with bare names and with objects.
        Ok(raw
            .into_iter()
            .filter_map(|v| match v {
                Value::String(name) => Some(name),
                Value::Object(obj) => obj.get("name").and_then(Value::as_str).map(str::to_string),
                _ => None,
            })
            .collect())
    }

    async fn upsert(&self, index: &str, documents: &[SearchDocument]) -> RemoteResult<TaskHandle> {
        let (builder, host) = self
            .request(Method::POST, &index_path("upsert-data", index))
            .await?;
        debug!("Upserting {} documents into {}", documents.len(), index);
        self.send_value(builder.json(documents), &host).await?;
        Ok(TaskHandle::new(index, RemoteOperation::Upsert, documents.len()))
    }

    async fn delete(&self, index: &str, ids: &[String]) -> RemoteResult<TaskHandle> {
        let (builder, host) = self.request(Method::POST, &index_path("delete", index)).await?;
        debug!("Deleting {} documents from {}", ids.len(), index);
        let body = serde_json::json!({ "ids": ids });
        self.send_value(builder.json(&body), &host).await?;
        Ok(TaskHandle::new(index, RemoteOperation::Delete, ids.len()))
    }

    async fn delete_index(&self, index: &str) -> RemoteResult<TaskHandle> {
        let (builder, host) = self
            .request(Method::DELETE, &index_path("delete-index", index))
            .await?;
        debug!("Deleting index {}", index);
        self.send_value(builder, &host).await?;
        Ok(TaskHandle::new(index, RemoteOperation::DeleteIndex, 0))
    }

    async fn info(&self, index: &str) -> RemoteResult<IndexInfo> {
        let (builder, host) = self.request(Method::GET, "info").await?;
        let mut info: InfoResult = self.send(builder, &host).await?;
        Ok(info.indexes.remove(index).unwrap_or_default())
    }
}
