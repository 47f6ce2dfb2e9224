//! Transcript replay command.
//!
//! Feeds a file of `email: message` lines through the conversation service,
//! one turn at a time, and prints each assistant reply.
//!
//! # Usage
//!
//! ```bash
//! helper-cli replay transcript.txt
//! ```

use helper_core::Email;
use helper_server::config::HelperConfig;
use helper_server::db::{self, Store};
use helper_server::llm::OpenAiClient;
use helper_server::services::{ConversationService, TurnOutcome};

use super::CommandError;

/// Counts from one replay run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Replay a transcript file against the configured database and model.
pub async fn run(path: &str) -> Result<ReplaySummary, CommandError> {
    let config = HelperConfig::from_env()?;
    let transcript = std::fs::read_to_string(path).map_err(|source| CommandError::Io {
        path: path.to_string(),
        source,
    })?;

    let pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(&pool).await?;
    let store = Store::new(pool);
    let model = OpenAiClient::new(&config.openai)?;
    let service = ConversationService::new(&store, &model, config.chat_settings());

    let summary = replay(&service, &transcript, print_outcome).await;
    tracing::info!(
        processed = summary.processed,
        skipped = summary.skipped,
        failed = summary.failed,
        "Replay finished"
    );
    Ok(summary)
}

/// Process every line of `transcript` in order.
///
/// Malformed lines and failed turns are logged and skipped.
pub async fn replay<F>(
    service: &ConversationService<'_>,
    transcript: &str,
    mut on_outcome: F,
) -> ReplaySummary
where
    F: FnMut(&TurnOutcome),
{
    let mut summary = ReplaySummary::default();

    for (number, line) in transcript.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let Some((email, message)) = parse_line(line) else {
            tracing::warn!(line = number + 1, "Skipping malformed transcript line");
            summary.skipped += 1;
            continue;
        };

        match service.handle_turn(Some(email), message).await {
            Ok(outcome) => {
                on_outcome(&outcome);
                summary.processed += 1;
            }
            Err(e) => {
                tracing::error!(line = number + 1, error = %e, "Turn failed");
                summary.failed += 1;
            }
        }
    }

    summary
}

/// Split `email: message` on the first `": "`.
#[must_use]
pub fn parse_line(line: &str) -> Option<(Email, &str)> {
    let (email, message) = line.split_once(": ")?;
    let email = Email::parse(email.trim()).ok()?;
    let message = message.trim();
    (!message.is_empty()).then_some((email, message))
}

#[allow(clippy::print_stdout)]
fn print_outcome(outcome: &TurnOutcome) {
    let who = outcome
        .email
        .as_ref()
        .map_or_else(|| "unknown".to_string(), ToString::to_string);
    for reply in &outcome.replies {
        println!("[{who}] {}: {}", reply.role, reply.content);
    }
}
