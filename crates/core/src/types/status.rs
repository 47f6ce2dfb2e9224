//! Role and status enums shared by the store and the conversation layer.
//!
//! All of these are persisted as lowercase `snake_case` text so the tables
//! stay readable from the `sqlite3` shell.

use serde::{Deserialize, Serialize};

/// Role tag of a conversation log entry.
///
/// `User` is the participant side of the conversation; `Assistant` entries are
/// written by the orchestrator on the model's behalf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlite", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlite", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum ConversationRole {
    User,
    Assistant,
    System,
}

impl ConversationRole {
    /// Wire name used by chat-completion APIs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        }
    }
}

impl std::fmt::Display for ConversationRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ConversationRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            "system" => Ok(Self::System),
            _ => Err(format!("invalid conversation role: {s}")),
        }
    }
}

/// Status label of a recorded provider/seeker pairing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "sqlite", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlite", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    /// Suggested by the assistant, not yet confirmed by either side.
    #[default]
    Proposed,
    /// Both sides agreed to the pairing.
    Accepted,
    /// One side turned the pairing down.
    Declined,
}

impl MatchStatus {
    /// Stored text form.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Proposed => "proposed",
            Self::Accepted => "accepted",
            Self::Declined => "declined",
        }
    }
}

impl std::fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MatchStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "proposed" => Ok(Self::Proposed),
            "accepted" => Ok(Self::Accepted),
            "declined" => Ok(Self::Declined),
            _ => Err(format!("invalid match status: {s}")),
        }
    }
}

/// Which side of the marketplace a profile belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileRole {
    /// Offers care (caregiver).
    Provider,
    /// Looks for care (patient or their representative).
    Seeker,
}

impl std::fmt::Display for ProfileRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Provider => write!(f, "provider"),
            Self::Seeker => write!(f, "seeker"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversation_role_round_trips_through_text() {
        for role in [
            ConversationRole::User,
            ConversationRole::Assistant,
            ConversationRole::System,
        ] {
            let parsed: ConversationRole = role.as_str().parse().expect("parse");
            assert_eq!(parsed, role);
        }
        assert!("tool".parse::<ConversationRole>().is_err());
    }

    #[test]
    fn test_match_status_parse_is_lenient_about_case() {
        assert_eq!(
            " Accepted ".parse::<MatchStatus>().expect("parse"),
            MatchStatus::Accepted
        );
        assert!("maybe".parse::<MatchStatus>().is_err());
    }

    #[test]
    fn test_match_status_default_is_proposed() {
        assert_eq!(MatchStatus::default(), MatchStatus::Proposed);
    }

    #[test]
    fn test_serde_uses_snake_case() {
        let json = serde_json::to_string(&ConversationRole::Assistant).expect("serialize");
        assert_eq!(json, "\"assistant\"");
        let json = serde_json::to_string(&ProfileRole::Seeker).expect("serialize");
        assert_eq!(json, "\"seeker\"");
    }
}
