use super::models::{ChatRequest, Fragment};
use super::{FragmentStream, InferenceClient, InferenceError};
use async_trait::async_trait;
use std::sync::Mutex;

/// Inference backend that replays a fixed script and records requests.
pub struct ScriptedClient {
    script: Mutex<Option<Result<Vec<Result<Fragment, InferenceError>>, InferenceError>>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedClient {
    pub fn fragments(deltas: &[&str]) -> Self {
        let items = deltas.iter().map(|d| Ok(Fragment::text(*d))).collect();
        Self::with_items(items)
    }

    pub fn with_items(items: Vec<Result<Fragment, InferenceError>>) -> Self {
        Self {
            script: Mutex::new(Some(Ok(items))),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(err: InferenceError) -> Self {
        Self {
            script: Mutex::new(Some(Err(err))),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl InferenceClient for ScriptedClient {
    fn provider_name(&self) -> &'static str {
        "scripted"
    }

    async fn stream_chat(&self, request: ChatRequest) -> Result<FragmentStream, InferenceError> {
        self.requests.lock().unwrap().push(request);
        let items = self
            .script
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| Ok(Vec::new()))?;
        Ok(Box::pin(futures::stream::iter(items)))
    }
}
