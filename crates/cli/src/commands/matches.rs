//! Match report command.
//!
//! Prints, for every stored patient, the caregivers that suit them, and for
//! every caregiver, the patients they suit.

use std::fmt::Write;

use helper_server::config::get_database_url;
use helper_server::db::{self, Store};
use helper_server::services::{MatchReport, MatchingService};

use super::CommandError;

/// Build and print the match report.
pub async fn run() -> Result<(), CommandError> {
    dotenvy::dotenv().ok();

    let pool = db::create_pool(&get_database_url("HELPER_DATABASE_URL")).await?;
    db::run_migrations(&pool).await?;
    let store = Store::new(pool);

    let report = MatchingService::new(&store).match_report().await?;

    #[allow(clippy::print_stdout)]
    {
        print!("{}", format_report(&report));
    }
    Ok(())
}

/// Render the report as plain text.
#[must_use]
pub fn format_report(report: &MatchReport) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Patients ({})", report.seekers.len());
    for entry in &report.seekers {
        let _ = writeln!(
            out,
            "  {} [{} | budget ${:.2}/hour]",
            entry.seeker.email, entry.seeker.location, entry.seeker.budget
        );
        if entry.providers.is_empty() {
            let _ = writeln!(out, "    no matching caregivers");
        }
        for provider in &entry.providers {
            let _ = writeln!(
                out,
                "    - {} ({}, ${:.2}/hour)",
                provider.email, provider.location, provider.rate_expectations
            );
        }
    }

    let _ = writeln!(out, "Caregivers ({})", report.providers.len());
    for entry in &report.providers {
        let _ = writeln!(
            out,
            "  {} [{} | rate ${:.2}/hour]",
            entry.provider.email, entry.provider.location, entry.provider.rate_expectations
        );
        if entry.seekers.is_empty() {
            let _ = writeln!(out, "    no matching patients");
        }
        for seeker in &entry.seekers {
            let _ = writeln!(
                out,
                "    - {} ({}, budget ${:.2}/hour)",
                seeker.email, seeker.location, seeker.budget
            );
        }
    }

    out
}
