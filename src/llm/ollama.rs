use super::models::{ChatRequest, Fragment, Message};
use super::{FragmentStream, InferenceClient, InferenceError, Role};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use ollama_rs::generation::chat::{request::ChatMessageRequest, ChatMessage};
use ollama_rs::models::ModelOptions;
use ollama_rs::Ollama;
use reqwest::Url;
use tracing::debug;

const DEFAULT_URL: &str = "http://localhost:11434";
const DEFAULT_PORT: u16 = 11434;

/// Streaming client for a local Ollama server.
pub struct OllamaClient {
    client: Ollama,
}

impl OllamaClient {
    /// `base_url` is `scheme://host[:port]`; the port defaults to 11434.
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = match base_url.trim() {
            "" => DEFAULT_URL,
            trimmed => trimmed,
        };

        let mut url = Url::parse(base_url)
            .with_context(|| format!("Invalid Ollama base URL {}", base_url))?;
        if url.port().is_none() && url.set_port(Some(DEFAULT_PORT)).is_err() {
            bail!("Ollama base URL {} cannot carry a port", base_url);
        }

        Ok(Self {
            client: Ollama::from_url(url),
        })
    }

    fn convert_message(message: &Message) -> ChatMessage {
        match message.role {
            Role::User => ChatMessage::user(message.content.clone()),
            Role::Assistant => ChatMessage::assistant(message.content.clone()),
            Role::System => ChatMessage::system(message.content.clone()),
        }
    }
}

#[async_trait]
impl InferenceClient for OllamaClient {
    fn provider_name(&self) -> &'static str {
        "ollama"
    }

    async fn stream_chat(&self, request: ChatRequest) -> Result<FragmentStream, InferenceError> {
        let messages: Vec<ChatMessage> = request.messages.iter().map(Self::convert_message).collect();

        let options = ModelOptions::default()
            .temperature(request.temperature)
            .num_predict(request.max_tokens as i32);

        let chat_request = ChatMessageRequest::new(request.model.clone(), messages).options(options);

        debug!(model = %request.model, "opening ollama chat stream");

        let stream = self
            .client
            .send_chat_messages_stream(chat_request)
            .await
            .map_err(|err| InferenceError::Stream(err.to_string()))?;

        let fragments = stream.map(|item| {
            item.map(|response| Fragment::text(response.message.content))
                .map_err(|_| InferenceError::Stream("ollama stream interrupted".to_string()))
        });

        Ok(Box::pin(fragments))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url_of(base_url: &str) -> String {
        OllamaClient::new(base_url).unwrap().client.url_str().to_string()
    }

    #[test]
    fn test_base_url_keeps_explicit_port() {
        assert_eq!(url_of("http://gpu-box:8080/"), "http://gpu-box:8080/");
        assert_eq!(url_of("http://localhost:11434"), "http://localhost:11434/");
    }

    #[test]
    fn test_base_url_defaults_port_and_host() {
        assert_eq!(url_of("http://gpu-box"), "http://gpu-box:11434/");
        assert_eq!(url_of(""), "http://localhost:11434/");
        assert_eq!(url_of("  "), "http://localhost:11434/");
    }

    #[test]
    fn test_invalid_base_url_is_an_error() {
        let err = OllamaClient::new("not a url").err().unwrap();
        assert!(err.to_string().contains("Invalid Ollama base URL"));
    }
}
