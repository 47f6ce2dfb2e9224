//! Domain models for the helper.
//!
//! - [`profile`] - Provider/seeker profiles and the intake stage derived from them
//! - [`conversation`] - Conversation log entries
//! - [`matching`] - Recorded provider/seeker pairings

pub mod conversation;
pub mod matching;
pub mod profile;

pub use conversation::ConversationEntry;
pub use matching::MatchRecord;
pub use profile::{ParticipantStage, Provider, ProviderFields, Seeker, SeekerFields};
