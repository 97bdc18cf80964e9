use super::models::{ChatCompletionChunk, ChatCompletionRequest, ChatRequest, ErrorBody};
use super::sse::{SseDecoder, SseEvent};
use super::{FragmentStream, InferenceClient, InferenceError};
use async_trait::async_trait;
use futures::StreamExt;
use tracing::debug;

/// Streaming client for the Hugging Face inference router.
///
/// The router speaks the OpenAI chat-completions protocol, so responses arrive
/// as server-sent events with one JSON chunk per `data:` line.
pub struct HuggingFaceClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HuggingFaceClient {
    pub fn new(base_url: &str, api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }
}

/// Prefer the server's own error text over the raw body.
fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => parsed.error.message().to_string(),
        Err(_) if body.trim().is_empty() => "empty response body".to_string(),
        Err(_) => body.trim().to_string(),
    }
}

#[async_trait]
impl InferenceClient for HuggingFaceClient {
    fn provider_name(&self) -> &'static str {
        "huggingface"
    }

    async fn stream_chat(&self, request: ChatRequest) -> Result<FragmentStream, InferenceError> {
        let body = ChatCompletionRequest {
            model: &request.model,
            messages: &request.messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            stream: true,
        };

        debug!(model = %request.model, url = %self.endpoint(), "opening completion stream");

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(InferenceError::Status {
                status: status.as_u16(),
                message: error_message(&text),
            });
        }

        let byte_stream = response.bytes_stream();

        let out = async_stream::try_stream! {
            let mut decoder = SseDecoder::new();
            let mut done = false;
            futures::pin_mut!(byte_stream);

            while !done {
                let events = match byte_stream.next().await {
                    Some(chunk) => decoder.push(&chunk?),
                    None => {
                        done = true;
                        decoder.finish()
                    }
                };

                for event in events {
                    let data = match event {
                        SseEvent::Done => {
                            done = true;
                            break;
                        }
                        SseEvent::Data(data) => data,
                    };

                    let parsed: ChatCompletionChunk = serde_json::from_str(&data)?;
                    if let Some(error) = &parsed.error {
                        Err::<(), _>(InferenceError::Stream(error.message().to_string()))?;
                    }
                    yield parsed.into_fragment();
                }
            }
        };

        Ok(Box::pin(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::completion;
    use crate::error::ChatError;
    use crate::llm::Message;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::sync::oneshot;

    const HELLO_STREAM: &str = concat!(
        "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n",
        "data: [DONE]\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"X\"}}]}\n\n",
    );

    fn request() -> ChatRequest {
        ChatRequest {
            model: "test-model".to_string(),
            messages: vec![Message::system("be brief"), Message::user("hi")],
            max_tokens: 250,
            temperature: 0.7,
        }
    }

    /// Client for the loopback server, ignoring any proxy set in the environment.
    fn local_client(base_url: &str, api_key: &str) -> HuggingFaceClient {
        HuggingFaceClient {
            client: reqwest::Client::builder().no_proxy().build().unwrap(),
            ..HuggingFaceClient::new(base_url, api_key.to_string())
        }
    }

    /// Read one HTTP request, headers plus a `content-length` body.
    async fn read_request(socket: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);

            if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let headers = String::from_utf8_lossy(&buf[..end]).to_lowercase();
                let body_len = headers
                    .lines()
                    .find_map(|line| line.strip_prefix("content-length:"))
                    .and_then(|value| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + body_len {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).to_string()
    }

    /// Serve a single canned response; the received request comes back on the channel.
    async fn serve_once(
        status: &'static str,
        content_type: &'static str,
        body: &'static str,
    ) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let received = read_request(&mut socket).await;
            let response = format!(
                "HTTP/1.1 {}\r\ncontent-type: {}\r\nconnection: close\r\n\r\n{}",
                status, content_type, body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            tx.send(received).ok();
        });

        (format!("http://{}", addr), rx)
    }

    #[tokio::test]
    async fn test_stream_stops_at_done_marker() {
        let (base_url, received) = serve_once("200 OK", "text/event-stream", HELLO_STREAM).await;
        let client = local_client(&base_url, "hf_test");

        let reply = completion(&client, request()).await;
        assert_eq!(reply, Ok("Hello".to_string()));

        let received = received.await.unwrap();
        assert!(received.starts_with("POST /v1/chat/completions "));
        assert!(received.to_lowercase().contains("authorization: bearer hf_test"));
        assert!(received.contains(r#""stream":true"#));
        assert!(received.contains(r#""max_tokens":250"#));
    }

    #[tokio::test]
    async fn test_error_chunk_classifies_as_warming_up() {
        let body = "data: {\"error\":{\"message\":\"Model is loading\"}}\n\n";
        let (base_url, _received) = serve_once("200 OK", "text/event-stream", body).await;
        let client = local_client(&base_url, "hf_test");

        let reply = completion(&client, request()).await;
        assert_eq!(reply, Err(ChatError::ModelWarmingUp));
    }

    #[tokio::test]
    async fn test_unauthorized_status_classifies_as_invalid_credential() {
        let body = r#"{"error":"Invalid API key"}"#;
        let (base_url, _received) =
            serve_once("401 Unauthorized", "application/json", body).await;
        let client = local_client(&base_url, "hf_wrong");

        let reply = completion(&client, request()).await;
        assert_eq!(reply, Err(ChatError::InvalidCredential));
    }

    #[tokio::test]
    async fn test_server_error_keeps_message() {
        let (base_url, _received) =
            serve_once("502 Bad Gateway", "text/plain", "upstream timed out").await;
        let client = local_client(&base_url, "hf_test");

        let reply = completion(&client, request()).await;
        assert_eq!(
            reply,
            Err(ChatError::GenericFailure("502: upstream timed out".to_string()))
        );
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let client = HuggingFaceClient::new("https://router.huggingface.co/", "k".to_string());
        assert_eq!(
            client.endpoint(),
            "https://router.huggingface.co/v1/chat/completions"
        );
    }

    #[test]
    fn test_error_message_prefers_error_field() {
        assert_eq!(
            error_message(r#"{"error":"Model Qwen is currently loading","estimated_time":20.0}"#),
            "Model Qwen is currently loading"
        );
        assert_eq!(error_message("Bad Gateway\n"), "Bad Gateway");
        assert_eq!(error_message(""), "empty response body");
    }
}
