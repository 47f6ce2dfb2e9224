//! Conversation orchestration.
//!
//! One call to [`ConversationService::handle_turn`] processes one inbound
//! message:
//! 1. Resolve the participant's email (explicit, else found in the text)
//! 2. Log the message
//! 3. Rebuild the transcript from the store (system prompt, profile status
//!    note, recent history)
//! 4. Call the model with the function catalog
//! 5. Execute a requested function and log its result, then log any text
//!
//! Nothing is cached between turns; the store is the only state.

use std::time::Duration;

use askama::Template;
use serde::Serialize;
use tracing::{info, instrument, warn};

use helper_core::{ConversationRole, Email, ProfileRole};

use crate::db::{RepositoryError, Store};
use crate::llm::{
    ArgumentParseError, ChatMessage, ChatModel, ModelError, helper_tools, parse_arguments,
};
use crate::models::conversation::DEFAULT_RECIPIENT;
use crate::models::{ConversationEntry, ParticipantStage};

use super::tools::{ToolError, ToolExecutor};

/// Reply sent while the participant's email is unknown.
pub const IDENTIFY_PROMPT: &str =
    "Hi! To get started, please tell me your email address so I can find or create your profile.";

/// Reply logged when the model returns neither text nor a function call.
pub const FALLBACK_PROMPT: &str = "Could you tell me a bit more? Let me know whether you are a \
    caregiver or a patient, and where you are located.";

/// System prompt template for the matchmaking assistant.
#[derive(Template)]
#[template(path = "prompts/system_prompt.txt")]
struct SystemPromptTemplate;

/// Per-turn note describing what is known about the participant.
#[derive(Template)]
#[template(path = "prompts/profile_status.txt")]
struct ProfileStatusTemplate<'a> {
    email: &'a str,
    stage: String,
    role: Option<ProfileRole>,
    complete: bool,
    missing: Vec<&'static str>,
    skills: &'a [String],
}

fn render_system_prompt() -> String {
    SystemPromptTemplate.render().unwrap_or_else(|_| {
        String::from("You are a matchmaking assistant connecting caregivers with patients.")
    })
}

/// Errors that abort a turn.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    /// Store read or write failed.
    #[error("storage error: {0}")]
    Storage(#[from] RepositoryError),

    /// The model call failed or timed out.
    #[error("model error: {0}")]
    Model(#[from] ModelError),

    /// The model's function arguments could not be decoded.
    #[error(transparent)]
    Arguments(#[from] ArgumentParseError),

    /// A requested function failed.
    #[error("tool error: {0}")]
    Tool(#[from] ToolError),
}

/// Limits applied to every turn.
#[derive(Debug, Clone, Copy)]
pub struct ChatSettings {
    /// Most recent log entries included in the transcript.
    pub max_history: usize,
    /// Upper bound on one model call.
    pub model_timeout: Duration,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            max_history: 100,
            model_timeout: Duration::from_secs(30),
        }
    }
}

/// One entry of a turn's output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reply {
    pub role: ConversationRole,
    pub content: String,
}

impl From<ConversationEntry> for Reply {
    fn from(entry: ConversationEntry) -> Self {
        Self {
            role: entry.role,
            content: entry.content,
        }
    }
}

/// Result of one processed message.
#[derive(Debug, Clone, Serialize)]
pub struct TurnOutcome {
    /// Resolved participant, if any.
    pub email: Option<Email>,
    /// Stage after the turn.
    pub stage: ParticipantStage,
    /// Assistant entries produced by the turn, in order.
    pub replies: Vec<Reply>,
}

/// Conversation orchestrator.
pub struct ConversationService<'a> {
    store: &'a Store,
    model: &'a dyn ChatModel,
    settings: ChatSettings,
}

impl<'a> ConversationService<'a> {
    /// Create a new conversation service.
    #[must_use]
    pub const fn new(store: &'a Store, model: &'a dyn ChatModel, settings: ChatSettings) -> Self {
        Self {
            store,
            model,
            settings,
        }
    }

    /// Process one inbound message.
    ///
    /// # Errors
    ///
    /// Returns `ChatError` if the model call fails or times out, the
    /// function arguments cannot be decoded, or the store fails. The user's
    /// message stays logged in every case once the email is known.
    #[instrument(
        skip(self, email, message),
        fields(model = %self.model.model_id(), email = tracing::field::Empty)
    )]
    pub async fn handle_turn(
        &self,
        email: Option<Email>,
        message: &str,
    ) -> Result<TurnOutcome, ChatError> {
        let Some(email) = email.or_else(|| Email::find_in_text(message)) else {
            info!("Message without an email, asking for one");
            return Ok(TurnOutcome {
                email: None,
                stage: ParticipantStage::Unidentified,
                replies: vec![Reply {
                    role: ConversationRole::Assistant,
                    content: IDENTIFY_PROMPT.to_string(),
                }],
            });
        };

        tracing::Span::current().record("email", tracing::field::display(&email));
        self.store.ensure_participant(&email).await?;

        let log = self.store.conversations();
        log.append(&email, ConversationRole::User, message, DEFAULT_RECIPIENT)
            .await?;

        let transcript = self.build_transcript(&email).await?;
        let response = self.call_model(transcript).await?;

        let mut replies = Vec::new();
        let reply = response.first_message();

        if let Some(call) = reply.and_then(|m| m.invocation()) {
            info!(function = %call.name, "Model requested a function");
            let args = parse_arguments(&call.arguments).inspect_err(|e| {
                warn!(function = %call.name, raw = %e.raw, "Undecodable function arguments");
            })?;
            let result = ToolExecutor::new(self.store, &email)
                .execute(&call.name, &args)
                .await?;
            let entry = log
                .append(&email, ConversationRole::Assistant, &result, DEFAULT_RECIPIENT)
                .await?;
            replies.push(Reply::from(entry));
        }

        if let Some(text) = reply.and_then(|m| m.text()) {
            let entry = log
                .append(&email, ConversationRole::Assistant, text, DEFAULT_RECIPIENT)
                .await?;
            replies.push(Reply::from(entry));
        }

        if replies.is_empty() {
            warn!("Model returned neither text nor a function call");
            let entry = log
                .append(&email, ConversationRole::Assistant, FALLBACK_PROMPT, DEFAULT_RECIPIENT)
                .await?;
            replies.push(Reply::from(entry));
        }

        let stage = self.stage_of(&email).await?;
        Ok(TurnOutcome {
            email: Some(email),
            stage,
            replies,
        })
    }

    /// Current stage of an identified participant.
    ///
    /// # Errors
    ///
    /// Returns `ChatError::Storage` if a lookup fails.
    pub async fn stage_of(&self, email: &Email) -> Result<ParticipantStage, ChatError> {
        let provider = self.store.providers().find(email).await?;
        let seeker = self.store.seekers().find(email).await?;
        Ok(ParticipantStage::of(provider.as_ref(), seeker.as_ref()))
    }

    async fn build_transcript(&self, email: &Email) -> Result<Vec<ChatMessage>, ChatError> {
        let provider = self.store.providers().find(email).await?;
        let seeker = self.store.seekers().find(email).await?;
        let skills = self.store.skills().list(email).await?;
        let stage = ParticipantStage::of(provider.as_ref(), seeker.as_ref());

        let missing = match stage.role() {
            Some(ProfileRole::Provider) => provider.as_ref().map(|p| p.missing_fields()),
            Some(ProfileRole::Seeker) => seeker.as_ref().map(|s| s.missing_fields()),
            None => None,
        }
        .unwrap_or_default();

        let status = ProfileStatusTemplate {
            email: email.as_str(),
            stage: stage.to_string(),
            role: stage.role(),
            complete: matches!(stage, ParticipantStage::ProfileComplete(_)),
            missing,
            skills: &skills,
        }
        .render()
        .unwrap_or_else(|_| format!("Profile status for {email}: {stage}."));

        let history = self
            .store
            .conversations()
            .load(email, Some(self.settings.max_history))
            .await?;

        let mut transcript = Vec::with_capacity(history.len() + 2);
        transcript.push(ChatMessage::system(render_system_prompt()));
        transcript.push(ChatMessage::system(status));
        transcript.extend(history.into_iter().map(|entry| ChatMessage {
            role: entry.role,
            content: entry.content,
        }));
        Ok(transcript)
    }

    async fn call_model(
        &self,
        transcript: Vec<ChatMessage>,
    ) -> Result<crate::llm::ChatResponse, ChatError> {
        let timeout = self.settings.model_timeout;
        let call = self.model.complete(transcript, helper_tools());
        let response = tokio::time::timeout(timeout, call)
            .await
            .map_err(|_| ModelError::Timeout(timeout.as_secs()))??;

        info!(choices = response.choices.len(), "Model response received");
        Ok(response)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::llm::{MockModel, MockReply};

    fn email(s: &str) -> Email {
        Email::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_unidentified_turn_persists_nothing() {
        let store = Store::in_memory().await.unwrap();
        let model = MockModel::default();
        let service = ConversationService::new(&store, &model, ChatSettings::default());

        let outcome = service.handle_turn(None, "hello there").await.unwrap();

        assert_eq!(outcome.stage, ParticipantStage::Unidentified);
        assert_eq!(outcome.replies[0].content, IDENTIFY_PROMPT);
        assert_eq!(model.call_count(), 0);
        assert!(store.seekers().list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_email_in_text_identifies_participant() {
        let store = Store::in_memory().await.unwrap();
        let model = MockModel::default().with_response("Are you a caregiver or a patient?");
        let service = ConversationService::new(&store, &model, ChatSettings::default());

        let outcome = service
            .handle_turn(None, "hi, I'm patient1@example.com")
            .await
            .unwrap();

        assert_eq!(outcome.email, Some(email("patient1@example.com")));
        assert_eq!(outcome.stage, ParticipantStage::RoleUnknown);
        assert_eq!(outcome.replies.len(), 1);

        let log = store
            .conversations()
            .load(&email("patient1@example.com"), None)
            .await
            .unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].role, ConversationRole::User);
        assert_eq!(log[1].content, "Are you a caregiver or a patient?");
    }

    #[tokio::test]
    async fn test_transcript_has_prompt_status_and_history() {
        let store = Store::in_memory().await.unwrap();
        let model = MockModel::default();
        let service = ConversationService::new(&store, &model, ChatSettings::default());
        let me = email("caregiver1@example.com");

        service.handle_turn(Some(me.clone()), "first").await.unwrap();
        service.handle_turn(Some(me), "second").await.unwrap();

        let transcript = model.transcripts().pop().unwrap();
        assert_eq!(transcript[0].role, ConversationRole::System);
        assert!(transcript[0].content.contains("matchmaking assistant"));
        assert!(transcript[1].content.contains("caregiver1@example.com"));
        assert!(transcript[1].content.contains("role_unknown"));
        let tail: Vec<&str> = transcript[2..].iter().map(|m| m.content.as_str()).collect();
        assert_eq!(tail, vec!["first", "Mock response", "second"]);
    }

    #[tokio::test]
    async fn test_history_is_capped() {
        let store = Store::in_memory().await.unwrap();
        let model = MockModel::default();
        let settings = ChatSettings {
            max_history: 3,
            ..ChatSettings::default()
        };
        let service = ConversationService::new(&store, &model, settings);
        let me = email("patient1@example.com");

        for n in 0..4 {
            service
                .handle_turn(Some(me.clone()), &format!("message {n}"))
                .await
                .unwrap();
        }

        let transcript = model.transcripts().pop().unwrap();
        assert_eq!(transcript.len(), 2 + 3);
        assert_eq!(transcript[4].content, "message 3");
    }

    #[tokio::test]
    async fn test_function_result_then_text_are_logged() {
        let store = Store::in_memory().await.unwrap();
        let model = MockModel::default().with_reply(MockReply::Call {
            name: "store_provider".to_string(),
            arguments: json!(r#"{"location": "New York, NY", "rate_expectations": "$35"}"#),
        });
        let service = ConversationService::new(&store, &model, ChatSettings::default());
        let me = email("caregiver1@example.com");

        let outcome = service
            .handle_turn(Some(me.clone()), "I'm a caregiver in New York, $35/hour")
            .await
            .unwrap();

        assert_eq!(
            outcome.stage,
            ParticipantStage::ProfileComplete(ProfileRole::Provider)
        );
        assert_eq!(outcome.replies[0].content, "Successfully registered as a caregiver.");
        let provider = store.providers().get(&me).await.unwrap();
        assert!((provider.rate_expectations - 35.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_empty_reply_logs_fallback() {
        let store = Store::in_memory().await.unwrap();
        let model = MockModel::default().with_reply(MockReply::NoChoices);
        let service = ConversationService::new(&store, &model, ChatSettings::default());

        let outcome = service
            .handle_turn(Some(email("a@example.com")), "hm")
            .await
            .unwrap();

        assert_eq!(outcome.replies[0].content, FALLBACK_PROMPT);
    }

    #[tokio::test]
    async fn test_model_failure_keeps_user_entry_only() {
        let store = Store::in_memory().await.unwrap();
        let model = MockModel::default().with_reply(MockReply::Fail("boom".to_string()));
        let service = ConversationService::new(&store, &model, ChatSettings::default());
        let me = email("a@example.com");

        let result = service.handle_turn(Some(me.clone()), "hello").await;
        assert!(matches!(result, Err(ChatError::Model(_))));

        let log = store.conversations().load(&me, None).await.unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].role, ConversationRole::User);
    }

    #[tokio::test]
    async fn test_model_timeout_is_model_error() {
        let store = Store::in_memory().await.unwrap();
        let model = MockModel::default().with_delay(Duration::from_millis(200));
        let settings = ChatSettings {
            model_timeout: Duration::from_millis(20),
            ..ChatSettings::default()
        };
        let service = ConversationService::new(&store, &model, settings);

        let result = service.handle_turn(Some(email("a@example.com")), "hello").await;
        assert!(matches!(result, Err(ChatError::Model(ModelError::Timeout(_)))));
    }

    #[tokio::test]
    async fn test_bad_arguments_write_nothing_more() {
        let store = Store::in_memory().await.unwrap();
        let model = MockModel::default().with_call("store_seeker", json!("{broken"));
        let service = ConversationService::new(&store, &model, ChatSettings::default());
        let me = email("patient1@example.com");

        let result = service.handle_turn(Some(me.clone()), "budget is 40").await;
        assert!(matches!(result, Err(ChatError::Arguments(ref e)) if e.raw == "{broken"));

        assert_eq!(store.conversations().load(&me, None).await.unwrap().len(), 1);
        let seeker = store.seekers().get(&me).await.unwrap();
        assert!(seeker.budget.abs() < f64::EPSILON);
    }
}
