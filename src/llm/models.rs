use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Role {
    #[serde(rename = "system")]
    System,
    #[serde(rename = "user")]
    User,
    #[serde(rename = "assistant")]
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Backend-neutral streaming chat request.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// One incremental piece of a streamed completion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fragment {
    pub delta: Option<String>,
}

impl Fragment {
    pub fn text(delta: impl Into<String>) -> Self {
        Self {
            delta: Some(delta.into()),
        }
    }
}

// Hugging Face router (OpenAI-compatible) wire models
#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [Message],
    pub max_tokens: u32,
    pub temperature: f32,
    pub stream: bool,
}

#[derive(Debug, Deserialize)]
pub struct ChatCompletionChunk {
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
    #[serde(default)]
    pub error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
pub struct ChunkChoice {
    #[serde(default)]
    pub delta: ChunkDelta,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChunkDelta {
    #[serde(default)]
    pub content: Option<String>,
}

/// Error payloads come back either as `{"error": "text"}` or
/// `{"error": {"message": "text", ...}}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ApiError {
    Text(String),
    Detailed { message: String },
}

impl ApiError {
    pub fn message(&self) -> &str {
        match self {
            ApiError::Text(message) => message,
            ApiError::Detailed { message } => message,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub error: ApiError,
}

impl ChatCompletionChunk {
    /// Text delta of the first choice, if any.
    pub fn into_fragment(self) -> Fragment {
        let delta = self
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta.content);
        Fragment { delta }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serializes_roles_lowercase() {
        let messages = vec![Message::system("be brief"), Message::user("hi")];
        let request = ChatCompletionRequest {
            model: "m",
            messages: &messages,
            max_tokens: 250,
            temperature: 0.5,
            stream: true,
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1]["role"], "user");
        assert_eq!(value["messages"][1]["content"], "hi");
        assert_eq!(value["stream"], true);
        assert_eq!(value["max_tokens"], 250);
    }

    #[test]
    fn test_chunk_without_choices_has_no_delta() {
        let chunk: ChatCompletionChunk = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert_eq!(chunk.into_fragment(), Fragment::default());
    }

    #[test]
    fn test_chunk_with_null_content() {
        let chunk: ChatCompletionChunk =
            serde_json::from_str(r#"{"choices":[{"index":0,"delta":{"role":"assistant","content":null}}]}"#)
                .unwrap();
        assert_eq!(chunk.into_fragment().delta, None);
    }

    #[test]
    fn test_error_body_shapes() {
        let flat: ErrorBody = serde_json::from_str(r#"{"error":"Model is currently loading"}"#).unwrap();
        assert_eq!(flat.error.message(), "Model is currently loading");

        let nested: ErrorBody =
            serde_json::from_str(r#"{"error":{"message":"Invalid API key","type":"auth"}}"#).unwrap();
        assert_eq!(nested.error.message(), "Invalid API key");
    }
}
