//! Conversation log models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use helper_core::{ConversationEntryId, ConversationRole, Email};

/// Recipient tag written when the caller does not name one.
pub const DEFAULT_RECIPIENT: &str = "admin";

/// One turn of a participant's conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationEntry {
    /// Row id.
    pub id: ConversationEntryId,
    /// Participant the entry belongs to.
    pub email: Email,
    /// Per-participant sequence number, strictly increasing.
    pub seq: i64,
    /// Who produced the entry.
    pub role: ConversationRole,
    /// Free text shown to the participant (or sent to the model).
    pub content: String,
    /// Recipient tag.
    pub recipient: String,
    /// Write time; non-decreasing per participant.
    pub created_at: DateTime<Utc>,
}
