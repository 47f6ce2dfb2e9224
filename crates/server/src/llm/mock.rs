//! Scripted model for tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::ChatModel;
use super::error::ModelError;
use super::types::{ChatMessage, ChatResponse, FunctionDefinition};

/// One scripted answer.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Plain text content.
    Text(String),
    /// A function invocation with the given raw arguments payload.
    Call { name: String, arguments: Value },
    /// A choice with neither text nor an invocation.
    Empty,
    /// A response with no choices at all.
    NoChoices,
    /// An API failure.
    Fail(String),
}

/// Mock model with a queue of scripted replies.
///
/// When the queue is empty the default reply is returned. Every transcript
/// the model receives is recorded for inspection.
pub struct MockModel {
    model_id: String,
    available: AtomicBool,
    default_reply: MockReply,
    script: Mutex<VecDeque<MockReply>>,
    transcripts: Mutex<Vec<Vec<ChatMessage>>>,
    delay: Option<Duration>,
    call_count: AtomicU32,
}

impl MockModel {
    /// Create a new mock model.
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            available: AtomicBool::new(true),
            default_reply: MockReply::Text("Mock response".to_string()),
            script: Mutex::new(VecDeque::new()),
            transcripts: Mutex::new(Vec::new()),
            delay: None,
            call_count: AtomicU32::new(0),
        }
    }

    /// Set the reply used once the script runs out.
    #[must_use]
    pub fn with_response(mut self, content: impl Into<String>) -> Self {
        self.default_reply = MockReply::Text(content.into());
        self
    }

    /// Queue a reply.
    #[must_use]
    pub fn with_reply(self, reply: MockReply) -> Self {
        self.push(reply);
        self
    }

    /// Queue a function invocation.
    #[must_use]
    pub fn with_call(self, name: impl Into<String>, arguments: Value) -> Self {
        self.with_reply(MockReply::Call {
            name: name.into(),
            arguments,
        })
    }

    /// Set availability. An unavailable model fails every call.
    #[must_use]
    pub fn with_available(self, available: bool) -> Self {
        self.available.store(available, Ordering::SeqCst);
        self
    }

    /// Sleep before answering.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queue a reply on a shared model.
    pub fn push(&self, reply: MockReply) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(reply);
        }
    }

    /// Number of times `complete` was called.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Transcripts received so far, oldest first.
    pub fn transcripts(&self) -> Vec<Vec<ChatMessage>> {
        self.transcripts
            .lock()
            .map(|t| t.clone())
            .unwrap_or_default()
    }

    fn next_reply(&self) -> MockReply {
        self.script
            .lock()
            .ok()
            .and_then(|mut script| script.pop_front())
            .unwrap_or_else(|| self.default_reply.clone())
    }
}

impl Default for MockModel {
    fn default() -> Self {
        Self::new("mock-model")
    }
}

#[async_trait]
impl ChatModel for MockModel {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        _functions: Vec<FunctionDefinition>,
    ) -> Result<ChatResponse, ModelError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut transcripts) = self.transcripts.lock() {
            transcripts.push(messages);
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if !self.available.load(Ordering::SeqCst) {
            return Err(ModelError::Api {
                status: 503,
                message: "Mock model disabled".to_string(),
            });
        }

        match self.next_reply() {
            MockReply::Text(content) => Ok(ChatResponse::text(content)),
            MockReply::Call { name, arguments } => Ok(ChatResponse::function_call(name, arguments)),
            MockReply::Empty => Ok(ChatResponse::text("")),
            MockReply::NoChoices => Ok(ChatResponse::default()),
            MockReply::Fail(message) => Err(ModelError::Api {
                status: 500,
                message,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn test_mock_model_plays_script_then_default() {
        let model = MockModel::new("test-model")
            .with_response("fallback")
            .with_call("list_providers", json!("{}"));

        let first = model
            .complete(vec![ChatMessage::user("hi")], Vec::new())
            .await
            .expect("first");
        let call = first
            .first_message()
            .and_then(|m| m.invocation())
            .expect("invocation");
        assert_eq!(call.name, "list_providers");

        let second = model.complete(Vec::new(), Vec::new()).await.expect("second");
        assert_eq!(
            second.first_message().and_then(|m| m.text()),
            Some("fallback")
        );

        assert_eq!(model.call_count(), 2);
        assert_eq!(model.transcripts()[0], vec![ChatMessage::user("hi")]);
    }

    #[tokio::test]
    async fn test_mock_unavailable() {
        let model = MockModel::default().with_available(false);
        let result = model.complete(Vec::new(), Vec::new()).await;
        assert!(matches!(result, Err(ModelError::Api { status: 503, .. })));
    }
}
