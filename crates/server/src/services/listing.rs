//! Plain-text rendering of profile listings.
//!
//! Tool results are shown to the participant verbatim, so these read as
//! chat messages rather than tables.

use std::fmt::Write;

use crate::db::{RepositoryError, Store};
use crate::models::{Provider, Seeker};

/// A profile together with its skill tags.
#[derive(Debug, Clone, PartialEq)]
pub struct Tagged<T> {
    pub profile: T,
    pub skills: Vec<String>,
}

/// Attach skill tags to providers.
///
/// # Errors
///
/// Returns `RepositoryError` if a tag lookup fails.
pub async fn tag_providers(
    store: &Store,
    providers: Vec<Provider>,
) -> Result<Vec<Tagged<Provider>>, RepositoryError> {
    let mut tagged = Vec::with_capacity(providers.len());
    for profile in providers {
        let skills = store.skills().list(&profile.email).await?;
        tagged.push(Tagged { profile, skills });
    }
    Ok(tagged)
}

/// Attach skill tags to seekers.
///
/// # Errors
///
/// Returns `RepositoryError` if a tag lookup fails.
pub async fn tag_seekers(
    store: &Store,
    seekers: Vec<Seeker>,
) -> Result<Vec<Tagged<Seeker>>, RepositoryError> {
    let mut tagged = Vec::with_capacity(seekers.len());
    for profile in seekers {
        let skills = store.skills().list(&profile.email).await?;
        tagged.push(Tagged { profile, skills });
    }
    Ok(tagged)
}

/// Render caregivers, or `empty` when there are none.
#[must_use]
pub fn render_providers(providers: &[Tagged<Provider>], empty: &str) -> String {
    if providers.is_empty() {
        return empty.to_string();
    }

    let mut out = format!("Found {} {}:\n", providers.len(), plural(providers.len(), "caregiver"));
    for (n, Tagged { profile: p, skills }) in providers.iter().enumerate() {
        let _ = writeln!(out, "\n{}. {}", n + 1, heading(&p.name, p.email.as_str()));
        line(&mut out, "Location", &p.location);
        let _ = writeln!(out, "   Rate: ${:.2}/hour", p.rate_expectations);
        line(&mut out, "Availability", &p.availability);
        line(&mut out, "Experience", &p.experience);
        line(&mut out, "Specializations", &p.specializations);
        line(&mut out, "Certifications", &p.certifications);
        line(&mut out, "Skills", &skills.join(", "));
    }
    out.trim_end().to_string()
}

/// Render patients, or `empty` when there are none.
#[must_use]
pub fn render_seekers(seekers: &[Tagged<Seeker>], empty: &str) -> String {
    if seekers.is_empty() {
        return empty.to_string();
    }

    let mut out = format!("Found {} {}:\n", seekers.len(), plural(seekers.len(), "patient"));
    for (n, Tagged { profile: s, skills }) in seekers.iter().enumerate() {
        let _ = writeln!(out, "\n{}. {}", n + 1, heading(&s.name, s.email.as_str()));
        line(&mut out, "Location", &s.location);
        let _ = writeln!(out, "   Budget: ${:.2}/hour", s.budget);
        line(&mut out, "Schedule", &s.schedule_requirements);
        line(&mut out, "Care needs", &s.care_needs);
        line(&mut out, "Special requirements", &s.special_requirements);
        line(&mut out, "Contact", &s.phone_number);
        line(&mut out, "Skills", &skills.join(", "));
    }
    out.trim_end().to_string()
}

fn heading(name: &str, email: &str) -> String {
    if name.is_empty() {
        email.to_string()
    } else {
        format!("{name} <{email}>")
    }
}

/// Blank fields are left out.
fn line(out: &mut String, label: &str, value: &str) {
    if !value.is_empty() {
        let _ = writeln!(out, "   {label}: {value}");
    }
}

const fn plural(count: usize, noun: &str) -> PluralNoun<'_> {
    PluralNoun { count, noun }
}

struct PluralNoun<'a> {
    count: usize,
    noun: &'a str,
}

impl std::fmt::Display for PluralNoun<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 1 {
            f.write_str(self.noun)
        } else {
            write!(f, "{}s", self.noun)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use helper_core::Email;

    use super::*;
    use crate::models::{ProviderFields, SeekerFields};

    #[test]
    fn test_empty_listing_uses_message() {
        assert_eq!(
            render_providers(&[], "No matching caregivers found."),
            "No matching caregivers found."
        );
        assert_eq!(render_seekers(&[], "No patients yet."), "No patients yet.");
    }

    #[test]
    fn test_provider_listing_includes_skills_and_rate() {
        let provider = Provider::new(
            Email::parse("caregiver1@example.com").unwrap(),
            &ProviderFields {
                name: "Ana".to_string(),
                location: "New York, NY".to_string(),
                rate_expectations: 35.0,
                ..Default::default()
            },
            Utc::now(),
        );
        let text = render_providers(
            &[Tagged {
                profile: provider,
                skills: vec!["cpr".to_string(), "dementia care".to_string()],
            }],
            "",
        );

        assert!(text.starts_with("Found 1 caregiver:"));
        assert!(text.contains("1. Ana <caregiver1@example.com>"));
        assert!(text.contains("Rate: $35.00/hour"));
        assert!(text.contains("Skills: cpr, dementia care"));
        assert!(!text.contains("Availability"));
    }

    #[test]
    fn test_seeker_listing_without_name_uses_email() {
        let seeker = Seeker::new(
            Email::parse("patient1@example.com").unwrap(),
            &SeekerFields {
                budget: 40.0,
                ..Default::default()
            },
            Utc::now(),
        );
        let text = render_seekers(
            &[
                Tagged {
                    profile: seeker.clone(),
                    skills: Vec::new(),
                },
                Tagged {
                    profile: seeker,
                    skills: Vec::new(),
                },
            ],
            "",
        );

        assert!(text.starts_with("Found 2 patients:"));
        assert!(text.contains("1. patient1@example.com"));
        assert!(text.contains("Budget: $40.00/hour"));
    }
}
