//! Model catalog endpoints

use super::http::check_status;
use super::{HttpTransport, ModelEntry, ModelsResponse, MODELS_PATH};
use crate::error::{ChatlineError, Result};

/// Lists, loads and unloads backend models
#[derive(Debug, Clone)]
pub struct ModelCatalog {
    transport: HttpTransport,
}

impl ModelCatalog {
    /// Creates a catalog sharing the transport's connection pool
    pub fn new(transport: HttpTransport) -> Self {
        Self { transport }
    }

    /// Fetches `GET /models`
    pub async fn list(&self) -> Result<Vec<ModelEntry>> {
        let url = self.transport.endpoint(MODELS_PATH);
        tracing::debug!("Fetching models from backend: {}", url);

        let response = self
            .transport
            .client()
            .get(&url)
            .timeout(self.transport.request_timeout())
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("Failed to fetch models: {}", e);
                ChatlineError::Transport(format!("Failed to connect to backend: {}", e))
            })?;
        let response = check_status(response).await?;

        let parsed: ModelsResponse = response.json().await.map_err(|e| {
            tracing::error!("Failed to parse models response: {}", e);
            ChatlineError::Decode(format!("Failed to parse models response: {}", e))
        })?;

        tracing::info!("Backend reported {} models", parsed.models.len());
        Ok(parsed.models)
    }

    /// Finds one model by id
    pub async fn find(&self, model_id: &str) -> Result<Option<ModelEntry>> {
        Ok(self.list().await?.into_iter().find(|m| m.id == model_id))
    }

    /// Asks the backend to load a model into memory
    pub async fn load(&self, model_id: &str) -> Result<()> {
        self.post_action(model_id, "load").await
    }

    /// Asks the backend to free a model
    pub async fn unload(&self, model_id: &str) -> Result<()> {
        self.post_action(model_id, "unload").await
    }

    async fn post_action(&self, model_id: &str, action: &str) -> Result<()> {
        let url = self
            .transport
            .endpoint(&format!("{}/{}/{}", MODELS_PATH, model_id, action));
        tracing::info!("Requesting {} of model {}", action, model_id);

        let response = self
            .transport
            .client()
            .post(&url)
            .timeout(self.transport.request_timeout())
            .send()
            .await
            .map_err(|e| ChatlineError::Transport(format!("Failed to connect to backend: {}", e)))?;
        check_status(response).await?;
        Ok(())
    }
}
