//! Database operations for the conversation log.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tokio::sync::Mutex;
use tracing::instrument;

use helper_core::{ConversationEntryId, ConversationRole, Email};

use super::RepositoryError;
use crate::models::conversation::ConversationEntry;

// =============================================================================
// Internal Row Types
// =============================================================================

/// Internal row type for conversation log queries.
#[derive(Debug, sqlx::FromRow)]
struct ConversationRow {
    id: ConversationEntryId,
    email: Email,
    seq: i64,
    role: String,
    content: String,
    recipient: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<ConversationRow> for ConversationEntry {
    type Error = RepositoryError;

    fn try_from(row: ConversationRow) -> Result<Self, Self::Error> {
        let role: ConversationRole = row
            .role
            .parse()
            .map_err(RepositoryError::DataCorruption)?;

        Ok(Self {
            id: row.id,
            email: row.email,
            seq: row.seq,
            role,
            content: row.content,
            recipient: row.recipient,
            created_at: row.created_at,
        })
    }
}

/// Tail of a participant's log, used to assign the next entry.
#[derive(Debug, sqlx::FromRow)]
struct LastEntry {
    seq: i64,
    created_at: DateTime<Utc>,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for the append-only conversation log.
pub struct ConversationRepository<'a> {
    pool: &'a SqlitePool,
    write_lock: &'a Mutex<()>,
}

impl<'a> ConversationRepository<'a> {
    /// Create a new conversation repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool, write_lock: &'a Mutex<()>) -> Self {
        Self { pool, write_lock }
    }

    /// Append one entry to a participant's log.
    ///
    /// The entry gets the next sequence number for `email`, and a timestamp
    /// that never precedes the previous entry's even if the wall clock steps
    /// backwards.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self, content), fields(email = %email, role = %role))]
    pub async fn append(
        &self,
        email: &Email,
        role: ConversationRole,
        content: &str,
        recipient: &str,
    ) -> Result<ConversationEntry, RepositoryError> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await?;

        let last = sqlx::query_as::<_, LastEntry>(
            r"
            SELECT seq, created_at
            FROM conversation_log
            WHERE email = ?
            ORDER BY seq DESC
            LIMIT 1
            ",
        )
        .bind(email)
        .fetch_optional(&mut *tx)
        .await?;

        let now = Utc::now();
        let (seq, created_at) = match last {
            Some(last) => (last.seq + 1, now.max(last.created_at)),
            None => (1, now),
        };

        let result = sqlx::query(
            r"
            INSERT INTO conversation_log (email, seq, role, content, recipient, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(email)
        .bind(seq)
        .bind(role.as_str())
        .bind(content)
        .bind(recipient)
        .bind(created_at)
        .execute(&mut *tx)
        .await
        .map_err(RepositoryError::from_write)?;

        tx.commit().await?;

        Ok(ConversationEntry {
            id: ConversationEntryId::new(result.last_insert_rowid()),
            email: email.clone(),
            seq,
            role,
            content: content.to_string(),
            recipient: recipient.to_string(),
            created_at,
        })
    }

    /// Load a participant's log in append order.
    ///
    /// With a `limit`, only the most recent `limit` entries are returned
    /// (still oldest first).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn load(
        &self,
        email: &Email,
        limit: Option<usize>,
    ) -> Result<Vec<ConversationEntry>, RepositoryError> {
        let rows = if let Some(limit) = limit {
            let mut rows = sqlx::query_as::<_, ConversationRow>(
                r"
                SELECT id, email, seq, role, content, recipient, created_at
                FROM conversation_log
                WHERE email = ?
                ORDER BY seq DESC
                LIMIT ?
                ",
            )
            .bind(email)
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .fetch_all(self.pool)
            .await?;
            rows.reverse();
            rows
        } else {
            sqlx::query_as::<_, ConversationRow>(
                r"
                SELECT id, email, seq, role, content, recipient, created_at
                FROM conversation_log
                WHERE email = ?
                ORDER BY seq ASC
                ",
            )
            .bind(email)
            .fetch_all(self.pool)
            .await?
        };

        rows.into_iter().map(TryInto::try_into).collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::Store;
    use crate::models::conversation::DEFAULT_RECIPIENT;

    #[tokio::test]
    async fn test_append_assigns_increasing_seq_per_email() {
        let store = Store::in_memory().await.unwrap();
        let log = store.conversations();
        let a = Email::parse("a@example.com").unwrap();
        let b = Email::parse("b@example.com").unwrap();

        let first = log
            .append(&a, ConversationRole::User, "hi", DEFAULT_RECIPIENT)
            .await
            .unwrap();
        let other = log
            .append(&b, ConversationRole::User, "hello", DEFAULT_RECIPIENT)
            .await
            .unwrap();
        let second = log
            .append(&a, ConversationRole::Assistant, "welcome", DEFAULT_RECIPIENT)
            .await
            .unwrap();

        assert_eq!(first.seq, 1);
        assert_eq!(other.seq, 1);
        assert_eq!(second.seq, 2);
        assert!(second.created_at >= first.created_at);

        let entries = log.load(&a, None).await.unwrap();
        let contents: Vec<&str> = entries.iter().map(|e| e.content.as_str()).collect();
        assert_eq!(contents, vec!["hi", "welcome"]);
        assert_eq!(entries[1].role, ConversationRole::Assistant);
    }

    #[tokio::test]
    async fn test_load_with_limit_returns_tail_in_order() {
        let store = Store::in_memory().await.unwrap();
        let log = store.conversations();
        let who = Email::parse("a@example.com").unwrap();

        for n in 1..=5 {
            log.append(&who, ConversationRole::User, &format!("m{n}"), DEFAULT_RECIPIENT)
                .await
                .unwrap();
        }

        let tail = log.load(&who, Some(2)).await.unwrap();
        let contents: Vec<&str> = tail.iter().map(|e| e.content.as_str()).collect();
        assert_eq!(contents, vec!["m4", "m5"]);
    }

    #[tokio::test]
    async fn test_load_unknown_email_is_empty() {
        let store = Store::in_memory().await.unwrap();
        let who = Email::parse("ghost@example.com").unwrap();
        assert!(store.conversations().load(&who, None).await.unwrap().is_empty());
    }
}
