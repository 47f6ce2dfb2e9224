//! Language model integration.
//!
//! The orchestrator talks to the model through the [`ChatModel`] trait:
//! [`OpenAiClient`] in production, [`MockModel`] in tests.

pub mod arguments;
pub mod client;
pub mod error;
pub mod mock;
pub mod tools;
pub mod types;

use async_trait::async_trait;

pub use arguments::{
    ArgumentParseError, ArgumentShape, ArgumentValue, ToolArguments, parse_arguments,
};
pub use client::OpenAiClient;
pub use error::ModelError;
pub use mock::{MockModel, MockReply};
pub use tools::helper_tools;
pub use types::{ChatMessage, ChatResponse, FunctionCall, FunctionDefinition, ResponseMessage};

/// A chat-completion backend.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Model identifier, for logging.
    fn model_id(&self) -> &str;

    /// Send a transcript and the function catalog, returning the raw response.
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        functions: Vec<FunctionDefinition>,
    ) -> Result<ChatResponse, ModelError>;
}
