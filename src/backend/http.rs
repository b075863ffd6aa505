//! reqwest implementation of [`Transport`]

use super::types::ErrorResponse;
use super::{ByteStream, ChatRequest, Transport, CHAT_PATH};
use crate::config::BackendConfig;
use crate::error::{ChatlineError, Result};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, Response};
use std::time::Duration;

/// HTTP transport for the chat backend
///
/// Cloning is cheap; clones share the connection pool.
///
/// # Examples
///
/// ```
/// use chatline::backend::HttpTransport;
/// use chatline::config::BackendConfig;
///
/// let transport = HttpTransport::new(&BackendConfig::default()).unwrap();
/// assert_eq!(transport.endpoint("/chat"), "http://localhost:8000/api/v1/chat");
/// ```
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    api_base: String,
    request_timeout: Duration,
}

impl HttpTransport {
    /// Creates a transport from backend settings
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .user_agent(concat!("chatline/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ChatlineError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        let api_base = format!(
            "{}/{}",
            config.base_url.trim_end_matches('/'),
            config.api_prefix.trim_matches('/')
        );

        tracing::debug!("Initialized HTTP transport: api_base={}", api_base);

        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            request_timeout: Duration::from_secs(config.timeout_seconds),
        })
    }

    /// Full URL of an API path
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_base, path.trim_start_matches('/'))
    }

    pub(crate) fn client(&self) -> &Client {
        &self.client
    }

    /// Timeout for non-streaming requests
    pub(crate) fn request_timeout(&self) -> Duration {
        self.request_timeout
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn open_chat_stream(
        &self,
        request: &ChatRequest,
    ) -> std::result::Result<ByteStream, ChatlineError> {
        let url = self.endpoint(CHAT_PATH);
        tracing::debug!(
            model = %request.model,
            messages = request.messages.len(),
            "POST {}",
            url
        );

        // No overall timeout: a generation may legitimately stream for minutes.
        let response = self
            .client
            .post(&url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("Failed to reach chat backend: {}", e);
                ChatlineError::Transport(format!("Failed to connect to backend: {}", e))
            })?;

        let response = check_status(response).await?;

        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| ChatlineError::Transport(format!("Stream read failed: {}", e))));
        Ok(Box::pin(stream))
    }
}

/// Turns a non-success response into [`ChatlineError::HttpStatus`]
///
/// The body is parsed as the backend's error envelope when possible.
pub(crate) async fn check_status(response: Response) -> std::result::Result<Response, ChatlineError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ErrorResponse>(&body) {
        Ok(envelope) => envelope.error.to_string(),
        Err(_) if !body.trim().is_empty() => body.trim().to_string(),
        Err(_) => status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string(),
    };

    tracing::error!("Backend returned error {}: {}", status, message);
    Err(ChatlineError::HttpStatus {
        status: status.as_u16(),
        message,
    })
}
