//! Provider and seeker profiles.
//!
//! Profiles are built up over several chat turns, so every write goes through
//! a `*Fields` value holding whatever the model extracted this turn. Merging a
//! `*Fields` into a stored profile only overwrites a column when the incoming
//! value carries information (non-blank text, positive amount).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use helper_core::{Email, ProfileRole};

/// A care provider (caregiver).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provider {
    pub email: Email,
    pub name: String,
    pub experience: String,
    pub location: String,
    pub availability: String,
    pub specializations: String,
    /// Expected hourly rate in dollars.
    pub rate_expectations: f64,
    pub certifications: String,
    /// Set on first insert, never overwritten.
    pub created_at: DateTime<Utc>,
}

/// Provider attributes submitted in one turn. Blank/zero means "not given".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderFields {
    pub name: String,
    pub experience: String,
    pub location: String,
    pub availability: String,
    pub specializations: String,
    pub rate_expectations: f64,
    pub certifications: String,
}

/// A care seeker (patient or their representative).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Seeker {
    pub email: Email,
    pub name: String,
    pub care_needs: String,
    pub location: String,
    pub schedule_requirements: String,
    /// Hourly budget in dollars.
    pub budget: f64,
    pub special_requirements: String,
    pub phone_number: String,
    /// Set on first insert, never overwritten.
    pub created_at: DateTime<Utc>,
}

/// Seeker attributes submitted in one turn. Blank/zero means "not given".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeekerFields {
    pub name: String,
    pub care_needs: String,
    pub location: String,
    pub schedule_requirements: String,
    pub budget: f64,
    pub special_requirements: String,
    pub phone_number: String,
}

impl Provider {
    /// Build a fresh provider row from the first submission.
    #[must_use]
    pub fn new(email: Email, fields: &ProviderFields, created_at: DateTime<Utc>) -> Self {
        let mut provider = Self {
            email,
            name: String::new(),
            experience: String::new(),
            location: String::new(),
            availability: String::new(),
            specializations: String::new(),
            rate_expectations: 0.0,
            certifications: String::new(),
            created_at,
        };
        provider.merge(fields);
        provider
    }

    /// Overlay the informative parts of `fields` onto this profile.
    pub fn merge(&mut self, fields: &ProviderFields) {
        overlay_text(&mut self.name, &fields.name);
        overlay_text(&mut self.experience, &fields.experience);
        overlay_text(&mut self.location, &fields.location);
        overlay_text(&mut self.availability, &fields.availability);
        overlay_text(&mut self.specializations, &fields.specializations);
        overlay_amount(&mut self.rate_expectations, fields.rate_expectations);
        overlay_text(&mut self.certifications, &fields.certifications);
    }

    /// Required fields still missing before matching can run.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.location.trim().is_empty() {
            missing.push("location");
        }
        if self.rate_expectations <= 0.0 {
            missing.push("rate_expectations");
        }
        missing
    }

    /// A provider can be matched once location and rate are known.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }

    fn has_details(&self) -> bool {
        [
            &self.name,
            &self.experience,
            &self.location,
            &self.availability,
            &self.specializations,
            &self.certifications,
        ]
        .iter()
        .any(|s| !s.is_empty())
            || self.rate_expectations > 0.0
    }
}

impl Seeker {
    /// Build a fresh seeker row from the first submission.
    #[must_use]
    pub fn new(email: Email, fields: &SeekerFields, created_at: DateTime<Utc>) -> Self {
        let mut seeker = Self {
            email,
            name: String::new(),
            care_needs: String::new(),
            location: String::new(),
            schedule_requirements: String::new(),
            budget: 0.0,
            special_requirements: String::new(),
            phone_number: String::new(),
            created_at,
        };
        seeker.merge(fields);
        seeker
    }

    /// Overlay the informative parts of `fields` onto this profile.
    pub fn merge(&mut self, fields: &SeekerFields) {
        overlay_text(&mut self.name, &fields.name);
        overlay_text(&mut self.care_needs, &fields.care_needs);
        overlay_text(&mut self.location, &fields.location);
        overlay_text(&mut self.schedule_requirements, &fields.schedule_requirements);
        overlay_amount(&mut self.budget, fields.budget);
        overlay_text(&mut self.special_requirements, &fields.special_requirements);
        overlay_text(&mut self.phone_number, &fields.phone_number);
    }

    /// Required fields still missing before matching can run.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.care_needs.trim().is_empty() {
            missing.push("care_needs");
        }
        if self.location.trim().is_empty() {
            missing.push("location");
        }
        if self.schedule_requirements.trim().is_empty() {
            missing.push("schedule_requirements");
        }
        if self.budget <= 0.0 {
            missing.push("budget");
        }
        missing
    }

    /// A seeker can be matched once needs, location, schedule, and budget are known.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }

    fn has_details(&self) -> bool {
        [
            &self.name,
            &self.care_needs,
            &self.location,
            &self.schedule_requirements,
            &self.special_requirements,
            &self.phone_number,
        ]
        .iter()
        .any(|s| !s.is_empty())
            || self.budget > 0.0
    }
}

/// Where a participant is in the intake flow.
///
/// Derived from the stored rows on every turn; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "stage", content = "role", rename_all = "snake_case")]
pub enum ParticipantStage {
    /// No email known for this participant yet.
    Unidentified,
    /// Identified, but neither profile carries any details.
    RoleUnknown,
    /// A profile is partially filled in.
    ProfileBuilding(ProfileRole),
    /// A profile satisfies the completeness predicate.
    ProfileComplete(ProfileRole),
}

impl ParticipantStage {
    /// Derive the stage of an identified participant from their stored rows.
    ///
    /// A complete profile wins over a partial one; when both sides are at the
    /// same level the provider side is reported.
    #[must_use]
    pub fn of(provider: Option<&Provider>, seeker: Option<&Seeker>) -> Self {
        if provider.is_some_and(Provider::is_complete) {
            Self::ProfileComplete(ProfileRole::Provider)
        } else if seeker.is_some_and(Seeker::is_complete) {
            Self::ProfileComplete(ProfileRole::Seeker)
        } else if provider.is_some_and(Provider::has_details) {
            Self::ProfileBuilding(ProfileRole::Provider)
        } else if seeker.is_some_and(Seeker::has_details) {
            Self::ProfileBuilding(ProfileRole::Seeker)
        } else {
            Self::RoleUnknown
        }
    }

    /// The role implied by the stage, if any.
    #[must_use]
    pub const fn role(&self) -> Option<ProfileRole> {
        match self {
            Self::ProfileBuilding(role) | Self::ProfileComplete(role) => Some(*role),
            Self::Unidentified | Self::RoleUnknown => None,
        }
    }
}

impl std::fmt::Display for ParticipantStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unidentified => write!(f, "unidentified"),
            Self::RoleUnknown => write!(f, "role_unknown"),
            Self::ProfileBuilding(role) => write!(f, "building_{role}_profile"),
            Self::ProfileComplete(role) => write!(f, "{role}_profile_complete"),
        }
    }
}

/// Clamp an amount to a finite, non-negative value.
#[must_use]
pub fn sanitize_amount(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

fn overlay_text(target: &mut String, incoming: &str) {
    let incoming = incoming.trim();
    if !incoming.is_empty() {
        incoming.clone_into(target);
    }
}

fn overlay_amount(target: &mut f64, incoming: f64) {
    let incoming = sanitize_amount(incoming);
    if incoming > 0.0 {
        *target = incoming;
    }
}
