use thiserror::Error;

use crate::config::API_KEY_VAR;
use crate::llm::InferenceError;

/// Every way a chat turn can fail, as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    #[error("API key not found! Make sure you created a .env file with {}.", API_KEY_VAR)]
    MissingCredential,

    #[error("Invalid API key. Please check your .env file and make sure {} is set correctly.", API_KEY_VAR)]
    InvalidCredential,

    #[error("Model is loading. Please wait a moment and try again.")]
    ModelWarmingUp,

    #[error("Failed to get AI response: {0}")]
    GenericFailure(String),
}

impl ChatError {
    /// Sort an inference failure into the user-facing taxonomy.
    ///
    /// Backends do not expose stable error codes, so this matches on the
    /// message text. An unrelated error that mentions "loading" or "API key"
    /// will be misclassified.
    pub fn classify(message: &str) -> Self {
        if message.contains("API key") {
            ChatError::InvalidCredential
        } else if message.contains("loading") {
            ChatError::ModelWarmingUp
        } else {
            ChatError::GenericFailure(message.to_string())
        }
    }

    /// The inline banner text for this failure.
    pub fn banner(&self) -> String {
        format!("⚠️ Error: {}", self)
    }
}

impl From<InferenceError> for ChatError {
    fn from(err: InferenceError) -> Self {
        ChatError::classify(&err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_api_key() {
        assert_eq!(
            ChatError::classify("401: Invalid API key provided"),
            ChatError::InvalidCredential
        );
    }

    #[test]
    fn test_classify_loading() {
        assert_eq!(
            ChatError::classify("503: Model Qwen/Qwen2.5-72B-Instruct is currently loading"),
            ChatError::ModelWarmingUp
        );
    }

    #[test]
    fn test_api_key_wins_over_loading() {
        assert_eq!(
            ChatError::classify("API key loading failed"),
            ChatError::InvalidCredential
        );
    }

    #[test]
    fn test_classify_generic_keeps_message() {
        let err = ChatError::classify("connection reset");
        assert_eq!(err, ChatError::GenericFailure("connection reset".to_string()));
        assert_eq!(
            err.to_string(),
            "Failed to get AI response: connection reset"
        );
    }

    #[test]
    fn test_matching_is_case_sensitive() {
        assert!(matches!(
            ChatError::classify("api key rejected"),
            ChatError::GenericFailure(_)
        ));
    }

    #[test]
    fn test_from_inference_error_uses_display() {
        let err: ChatError = InferenceError::Status {
            status: 503,
            message: "Model is loading".to_string(),
        }
        .into();
        assert_eq!(err, ChatError::ModelWarmingUp);
    }

    #[test]
    fn test_banner_prefix() {
        let banner = ChatError::MissingCredential.banner();
        assert!(banner.starts_with("⚠️ Error: "));
        assert!(banner.contains("API key not found"));
    }
}
