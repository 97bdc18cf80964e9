mod input;
mod transcript;

pub use input::InputField;
pub use transcript::{Author, ChatMessage, Entry, Transcript, WELCOME_TEXT};

use futures::StreamExt;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::error::ChatError;
use crate::llm::{ChatRequest, InferenceClient, Message};

/// Shown when a stream finishes without producing any text.
pub const NO_RESPONSE: &str = "No response generated.";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RequestState {
    #[default]
    Idle,
    Sending,
}

/// What `submit` did with the text it was given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// Blank input, or a request is already in flight.
    Ignored,
    /// Refused before any network call; a banner was shown.
    Rejected,
    /// The trimmed text was recorded and a completion should now run.
    Accepted(String),
}

/// Owns the transcript, the input box and the request state for one session.
pub struct ChatController {
    config: SessionConfig,
    client: Arc<dyn InferenceClient>,
    transcript: Transcript,
    input: InputField,
    state: RequestState,
    pending: Option<Uuid>,
}

impl ChatController {
    pub fn new(config: SessionConfig, client: Arc<dyn InferenceClient>) -> Self {
        Self {
            config,
            client,
            transcript: Transcript::new(),
            input: InputField::new(),
            state: RequestState::Idle,
            pending: None,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn client(&self) -> Arc<dyn InferenceClient> {
        Arc::clone(&self.client)
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn input(&self) -> &InputField {
        &self.input
    }

    pub fn state(&self) -> RequestState {
        self.state
    }

    /// The input box and send action are usable only while idle.
    pub fn is_input_enabled(&self) -> bool {
        self.state == RequestState::Idle
    }

    /// Apply an editing operation to the input box unless it is disabled.
    pub fn edit(&mut self, op: impl FnOnce(&mut InputField)) {
        if self.is_input_enabled() {
            op(&mut self.input);
        }
    }

    /// Record `raw_text` as the next user turn.
    ///
    /// On acceptance the caller must run [`completion`] with
    /// [`ChatController::request_for`] and hand the outcome to
    /// [`ChatController::finish`].
    pub fn submit(&mut self, raw_text: &str) -> Submission {
        if !self.is_input_enabled() {
            debug!("submit ignored, request already in flight");
            return Submission::Ignored;
        }

        let text = raw_text.trim();
        if text.is_empty() {
            return Submission::Ignored;
        }

        if !self.config.has_credential() {
            warn!("submit rejected, no API key configured");
            self.transcript.push_error(ChatError::MissingCredential.banner());
            return Submission::Rejected;
        }

        let message = ChatMessage::user(text);
        let turn = message.id;
        self.transcript.push_message(message);
        self.input.clear();
        self.input.blur();
        self.state = RequestState::Sending;
        self.pending = Some(turn);
        info!(%turn, chars = text.chars().count(), "message submitted");

        Submission::Accepted(text.to_string())
    }

    /// Submit whatever is currently in the input box.
    pub fn submit_input(&mut self) -> Submission {
        let raw = self.input.text().to_string();
        self.submit(&raw)
    }

    /// The streaming request for one user turn: fixed system prompt plus the text.
    pub fn request_for(&self, user_text: &str) -> ChatRequest {
        ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                Message::system(self.config.system_prompt.clone()),
                Message::user(user_text),
            ],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        }
    }

    /// Id of the user message whose completion is in flight.
    pub fn pending_turn(&self) -> Option<Uuid> {
        self.pending
    }

    /// Render the outcome of a completion and return to idle.
    pub fn finish(&mut self, result: Result<String, ChatError>) {
        let turn = self.pending.take();
        match result {
            Ok(text) => {
                let text = if text.is_empty() { NO_RESPONSE.to_string() } else { text };
                let reply = ChatMessage::assistant(text);
                debug!(?turn, reply = %reply.id, "completion rendered");
                self.transcript.push_message(reply);
            }
            Err(err) => {
                warn!(?turn, error = %err, "completion failed");
                self.transcript.push_error(err.banner());
            }
        }

        self.state = RequestState::Idle;
        self.input.focus();
    }

    /// Submit, complete and render in one call, for callers without an event loop.
    pub async fn send(&mut self, raw_text: &str) -> Submission {
        let submission = self.submit(raw_text);
        if let Submission::Accepted(text) = &submission {
            let request = self.request_for(text);
            let result = completion(self.client.as_ref(), request).await;
            self.finish(result);
        }
        submission
    }

    /// Copy the prompt template into the input, cursor just after the first `[`.
    pub fn use_template(&mut self) {
        if !self.is_input_enabled() {
            return;
        }

        let template = self.config.template.clone();
        let cursor = template
            .chars()
            .position(|c| c == '[')
            .map(|idx| idx + 1)
            .unwrap_or_else(|| template.chars().count());

        self.input.set(template, cursor);
        self.input.focus();
    }
}

/// Run one streaming completion and fold its fragments into a single string.
///
/// Fragments are concatenated in arrival order; empty deltas are skipped. The
/// stream is consumed to the end and cannot be restarted.
pub async fn completion(
    client: &dyn InferenceClient,
    request: ChatRequest,
) -> Result<String, ChatError> {
    debug!(provider = client.provider_name(), model = %request.model, "starting completion");

    let mut stream = client.stream_chat(request).await?;

    let mut response = String::new();
    let mut fragments = 0usize;
    while let Some(fragment) = stream.next().await {
        if let Some(delta) = fragment?.delta {
            if !delta.is_empty() {
                response.push_str(&delta);
                fragments += 1;
            }
        }
    }

    info!(fragments, chars = response.chars().count(), "completion finished");
    Ok(response)
}
