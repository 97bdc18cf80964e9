#[cfg(test)]
pub(crate) mod fake;
mod huggingface;
mod models;
mod ollama;
mod sse;

pub use huggingface::HuggingFaceClient;
pub use models::{ChatRequest, Fragment, Message, Role};
pub use ollama::OllamaClient;

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;

use crate::config::{Provider, SessionConfig};

/// Lazy, finite sequence of fragments produced by one streaming completion.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<Fragment, InferenceError>> + Send>>;

/// Failures surfaced by an inference backend.
///
/// The display text is what the chat layer inspects when it decides how to
/// present the failure, so variants keep the server's own wording.
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{status}: {message}")]
    Status { status: u16, message: String },

    #[error("invalid stream payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("{0}")]
    Stream(String),
}

#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Name of the backend, for the status bar and logs.
    fn provider_name(&self) -> &'static str;

    /// Start a streaming chat completion.
    async fn stream_chat(&self, request: ChatRequest) -> Result<FragmentStream, InferenceError>;
}

pub fn create_client(config: &SessionConfig) -> anyhow::Result<Arc<dyn InferenceClient>> {
    let client: Arc<dyn InferenceClient> = match config.provider {
        Provider::HuggingFace => Arc::new(HuggingFaceClient::new(
            &config.base_url,
            config.api_key.clone().unwrap_or_default(),
        )),
        Provider::Ollama => Arc::new(OllamaClient::new(&config.base_url)?),
    };
    Ok(client)
}
