//! reqwest-backed [`QueryClient`].

use async_trait::async_trait;
use futures::StreamExt;
use log::{debug, info, warn};
use reqwest::header::ACCEPT;

use super::records::RecordStream;
use super::types::QueryRequest;
use super::{ApiError, QueryClient};

/// HTTP client for the lecture question-answering API.
pub struct HttpQueryClient {
    base_url: String,
    query_path: String,
    health_path: String,
    client: reqwest::Client,
}

impl HttpQueryClient {
    /// Creates a client for `base_url` (e.g. `http://localhost:8000`).
    ///
    /// Paths are joined verbatim, so they should start with `/`.
    pub fn new(base_url: &str, query_path: &str, health_path: &str) -> Result<Self, ApiError> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ApiError::Config(format!(
                "base URL must start with http:// or https://, got '{base_url}'"
            )));
        }
        Ok(Self {
            base_url,
            query_path: normalize_path(query_path),
            health_path: normalize_path(health_path),
            client: reqwest::Client::new(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Turn a non-success response into `ApiError::Api`, consuming the body.
    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "unknown error".to_string());
        warn!("API error: {} - {}", status, message);
        Err(ApiError::Api { status, message })
    }
}

fn normalize_path(path: &str) -> String {
    let path = path.trim();
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

#[async_trait]
impl QueryClient for HttpQueryClient {
    fn endpoint(&self) -> &str {
        &self.base_url
    }

    async fn open(&self, question: &str) -> Result<RecordStream, ApiError> {
        let url = self.url(&self.query_path);
        info!("POST {} (question: {} chars)", url, question.chars().count());

        let response = self
            .client
            .post(&url)
            .header(ACCEPT, "text/event-stream")
            .json(&QueryRequest { question })
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        debug!("Query response status: {}", response.status());
        let response = Self::check_status(response).await?;

        let bytes = response
            .bytes_stream()
            .map(|chunk| {
                chunk
                    .map(|b| b.to_vec())
                    .map_err(|e| ApiError::Network(e.to_string()))
            })
            .boxed();
        Ok(RecordStream::new(bytes))
    }

    async fn health(&self) -> Result<(), ApiError> {
        let url = self.url(&self.health_path);
        debug!("GET {}", url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        Self::check_status(response).await.map(|_| ())
    }
}
