//! Recorded pairings between providers and seekers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use helper_core::{Email, MatchStatus};

/// A provider/seeker pairing and where it stands.
///
/// Matching never reads these rows; they only record what was proposed or
/// agreed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub provider_email: Email,
    pub seeker_email: Email,
    pub status: MatchStatus,
    /// First time the pair was recorded.
    pub created_at: DateTime<Utc>,
}
