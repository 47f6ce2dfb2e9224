//! Business logic services.
//!
//! # Services
//!
//! - `chat` - Conversation orchestration with function execution
//! - `listing` - Plain-text rendering of profile lists
//! - `matching` - Provider/seeker matching and the full match report
//! - `tools` - Dispatch of model-requested functions

pub mod chat;
pub mod listing;
pub mod matching;
pub mod tools;

pub use chat::{
    ChatError, ChatSettings, ConversationService, FALLBACK_PROMPT, IDENTIFY_PROMPT, Reply,
    TurnOutcome,
};
pub use matching::{MatchReport, MatchingService, ProviderMatches, SeekerMatches};
pub use tools::{ToolError, ToolExecutor};
