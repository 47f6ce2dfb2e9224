//! Execution of model-requested functions.
//!
//! Every function acts on behalf of one participant: profile writes and tag
//! changes always target the participant's own email, whatever the arguments
//! say.

use thiserror::Error;
use tracing::instrument;

use helper_core::{Email, MatchStatus};

use crate::db::{DynamicQuery, QueryError, QueryFilter, RepositoryError, Store};
use crate::llm::ToolArguments;
use crate::models::{ProviderFields, SeekerFields};

use super::listing::{render_providers, render_seekers, tag_providers, tag_seekers};
use super::matching::MatchingService;

/// Errors from executing a function call.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Store read or write failed.
    #[error("storage error: {0}")]
    Storage(#[from] RepositoryError),

    /// Dynamic query was rejected or failed.
    #[error("query error: {0}")]
    Query(#[from] QueryError),

    /// Arguments decoded but do not make sense for the function.
    #[error("invalid arguments for {tool}: {message}")]
    InvalidArguments { tool: &'static str, message: String },

    /// The model asked for a function that is not in the catalog.
    #[error("unknown tool: {0}")]
    UnknownTool(String),
}

/// Dispatches function calls for one participant.
pub struct ToolExecutor<'a> {
    store: &'a Store,
    participant: &'a Email,
}

impl<'a> ToolExecutor<'a> {
    /// Create an executor acting for `participant`.
    #[must_use]
    pub const fn new(store: &'a Store, participant: &'a Email) -> Self {
        Self { store, participant }
    }

    /// Execute a function and return its textual result.
    ///
    /// # Errors
    ///
    /// Returns `ToolError` if the function is unknown, its arguments are
    /// unusable, or the store fails. A missing profile in a matching call
    /// is reported in the text, not as an error.
    #[instrument(skip(self, args), fields(tool_name = %name, participant = %self.participant))]
    pub async fn execute(&self, name: &str, args: &ToolArguments) -> Result<String, ToolError> {
        match name {
            "store_provider" => self.store_provider(args).await,
            "store_seeker" => self.store_seeker(args).await,
            "list_providers" => self.list_providers().await,
            "list_seekers" => self.list_seekers().await,
            "find_matching_providers" => self.find_matching_providers(args).await,
            "find_matching_seekers" => self.find_matching_seekers(args).await,
            "add_skills" => self.add_skills(args).await,
            "remove_skill" => self.remove_skill(args).await,
            "record_match" => self.record_match(args).await,
            "execute_dynamic_query" => self.execute_dynamic_query(args).await,
            _ => Err(ToolError::UnknownTool(name.to_string())),
        }
    }

    async fn store_provider(&self, args: &ToolArguments) -> Result<String, ToolError> {
        let fields = ProviderFields {
            name: args.text("name"),
            experience: args.text("experience"),
            location: args.text("location"),
            availability: args.text("availability"),
            specializations: args.text("specializations"),
            rate_expectations: args.number("rate_expectations", 0.0),
            certifications: args.text("certifications"),
        };

        let provider = self.store.providers().upsert(self.participant, &fields).await?;
        Ok(with_missing(
            "Successfully registered as a caregiver.",
            &provider.missing_fields(),
        ))
    }

    async fn store_seeker(&self, args: &ToolArguments) -> Result<String, ToolError> {
        let fields = SeekerFields {
            name: args.text("name"),
            care_needs: args.text("care_needs"),
            location: args.text("location"),
            schedule_requirements: args.text("schedule_requirements"),
            budget: args.number("budget", 0.0),
            special_requirements: args.text("special_requirements"),
            phone_number: args.text("phone_number"),
        };

        let seeker = self.store.seekers().upsert(self.participant, &fields).await?;
        Ok(with_missing(
            "Successfully registered as a patient.",
            &seeker.missing_fields(),
        ))
    }

    async fn list_providers(&self) -> Result<String, ToolError> {
        let providers = self.store.providers().list().await?;
        let tagged = tag_providers(self.store, providers).await?;
        Ok(render_providers(&tagged, "No caregivers are registered yet."))
    }

    async fn list_seekers(&self) -> Result<String, ToolError> {
        let seekers = self.store.seekers().list().await?;
        let tagged = tag_seekers(self.store, seekers).await?;
        Ok(render_seekers(&tagged, "No patients are registered yet."))
    }

    async fn find_matching_providers(&self, args: &ToolArguments) -> Result<String, ToolError> {
        let seeker = self.email_arg(args, "seeker_email", "find_matching_providers")?;

        match MatchingService::new(self.store)
            .find_matching_providers(&seeker)
            .await
        {
            Ok(providers) => {
                let tagged = tag_providers(self.store, providers).await?;
                Ok(render_providers(&tagged, "No matching caregivers found."))
            }
            Err(RepositoryError::NotFound) => Ok(format!(
                "{seeker} is not registered as a patient yet. Share your care needs, location, \
                 schedule and budget to get matched."
            )),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_matching_seekers(&self, args: &ToolArguments) -> Result<String, ToolError> {
        let provider = self.email_arg(args, "provider_email", "find_matching_seekers")?;

        match MatchingService::new(self.store)
            .find_matching_seekers(&provider)
            .await
        {
            Ok(seekers) => {
                let tagged = tag_seekers(self.store, seekers).await?;
                Ok(render_seekers(&tagged, "No matching patients found."))
            }
            Err(RepositoryError::NotFound) => Ok(format!(
                "{provider} is not registered as a caregiver yet. Share your location and \
                 hourly rate to get matched."
            )),
            Err(e) => Err(e.into()),
        }
    }

    async fn add_skills(&self, args: &ToolArguments) -> Result<String, ToolError> {
        let mut skills = args.string_list("skills");
        if skills.is_empty() {
            skills = args.fact_list();
        }

        let mut added = Vec::new();
        for skill in &skills {
            if self.store.skills().add(self.participant, skill).await? {
                added.push(skill.trim());
            }
        }

        if added.is_empty() {
            Ok("No new tags to add.".to_string())
        } else {
            Ok(format!("Added tags: {}.", added.join(", ")))
        }
    }

    async fn remove_skill(&self, args: &ToolArguments) -> Result<String, ToolError> {
        let skill = args.text("skill");
        if skill.is_empty() {
            return Err(ToolError::InvalidArguments {
                tool: "remove_skill",
                message: "skill is required".to_string(),
            });
        }

        if self.store.skills().remove(self.participant, &skill).await? {
            Ok(format!("Removed tag: {skill}."))
        } else {
            Ok(format!("Tag {skill} was not set."))
        }
    }

    async fn record_match(&self, args: &ToolArguments) -> Result<String, ToolError> {
        let provider = self.email_arg(args, "provider_email", "record_match")?;
        let seeker = self.email_arg(args, "seeker_email", "record_match")?;
        let status = match args.optional_text("status") {
            Some(raw) => raw
                .parse::<MatchStatus>()
                .map_err(|message| ToolError::InvalidArguments {
                    tool: "record_match",
                    message,
                })?,
            None => MatchStatus::default(),
        };

        let record = self.store.matches().record(&provider, &seeker, status).await?;
        Ok(format!(
            "Recorded match between {} and {} ({}).",
            record.provider_email, record.seeker_email, record.status
        ))
    }

    async fn execute_dynamic_query(&self, args: &ToolArguments) -> Result<String, ToolError> {
        let rows = dynamic_query(args).execute(self.store.pool()).await?;
        if rows.is_empty() {
            return Ok("No rows found.".to_string());
        }

        serde_json::to_string_pretty(&rows).map_err(|e| ToolError::InvalidArguments {
            tool: "execute_dynamic_query",
            message: e.to_string(),
        })
    }

    /// Email named by `key`, defaulting to the participant.
    fn email_arg(
        &self,
        args: &ToolArguments,
        key: &str,
        tool: &'static str,
    ) -> Result<Email, ToolError> {
        args.optional_text(key).map_or_else(
            || Ok(self.participant.clone()),
            |raw| {
                Email::parse(&raw).map_err(|e| ToolError::InvalidArguments {
                    tool,
                    message: format!("{key}: {e}"),
                })
            },
        )
    }
}

/// Read a query request, dropping whatever cannot be used.
///
/// Filters without a field or an operator are skipped. A limit below one
/// means no limit.
#[allow(clippy::cast_possible_truncation)]
fn dynamic_query(args: &ToolArguments) -> DynamicQuery {
    let filters = args
        .records("filters")
        .into_iter()
        .filter_map(|filter| {
            let field = filter.optional_text("field")?;
            let operator = filter.optional_text("operator")?;
            Some(QueryFilter {
                field,
                operator,
                value: filter.value("value"),
            })
        })
        .collect();

    let limit = args.number("limit", 0.0).trunc();

    DynamicQuery {
        table: args.text("table"),
        fields: args.string_list("fields"),
        filters,
        order_by: args.optional_text("order_by"),
        limit: (limit >= 1.0).then_some(limit as i64),
    }
}

fn with_missing(confirmation: &str, missing: &[&str]) -> String {
    if missing.is_empty() {
        confirmation.to_string()
    } else {
        format!("{confirmation} Still needed: {}.", missing.join(", "))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::llm::parse_arguments;

    fn args(value: serde_json::Value) -> ToolArguments {
        parse_arguments(&value).unwrap()
    }

    #[tokio::test]
    async fn test_store_provider_uses_participant_email() {
        let store = Store::in_memory().await.unwrap();
        let me = Email::parse("caregiver1@example.com").unwrap();
        let executor = ToolExecutor::new(&store, &me);

        let reply = executor
            .execute(
                "store_provider",
                &args(json!({"email": "someone-else@example.com", "location": "New York, NY"})),
            )
            .await
            .unwrap();

        assert_eq!(
            reply,
            "Successfully registered as a caregiver. Still needed: rate_expectations."
        );
        assert!(store.providers().get(&me).await.is_ok());
        let other = Email::parse("someone-else@example.com").unwrap();
        assert!(store.providers().find(&other).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_matching_for_unregistered_profile_is_friendly_text() {
        let store = Store::in_memory().await.unwrap();
        let me = Email::parse("caregiver1@example.com").unwrap();

        let reply = ToolExecutor::new(&store, &me)
            .execute("find_matching_seekers", &ToolArguments::default())
            .await
            .unwrap();

        assert!(reply.contains("not registered as a caregiver yet"));
    }

    #[tokio::test]
    async fn test_add_skills_accepts_both_list_shapes() {
        let store = Store::in_memory().await.unwrap();
        let me = Email::parse("caregiver1@example.com").unwrap();
        let executor = ToolExecutor::new(&store, &me);

        executor
            .execute("add_skills", &args(json!({"skills": ["cpr"]})))
            .await
            .unwrap();
        let reply = executor
            .execute("add_skills", &args(json!(r#"{"arguments": ["cpr", "speaks Spanish"]}"#)))
            .await
            .unwrap();

        assert_eq!(reply, "Added tags: speaks Spanish.");
        assert_eq!(
            store.skills().list(&me).await.unwrap(),
            vec!["cpr", "speaks Spanish"]
        );
    }

    #[tokio::test]
    async fn test_dynamic_query_rejects_unknown_table() {
        let store = Store::in_memory().await.unwrap();
        let me = Email::parse("caregiver1@example.com").unwrap();

        let result = ToolExecutor::new(&store, &me)
            .execute("execute_dynamic_query", &args(json!({"table": "users"})))
            .await;

        assert!(matches!(
            result,
            Err(ToolError::Query(QueryError::InvalidTable(_)))
        ));
    }

    async fn store_with_caregivers() -> Store {
        let store = Store::in_memory().await.unwrap();
        for (address, name, rate) in [
            ("caregiver1@example.com", "Ana", 35.0),
            ("caregiver2@example.com", "Ben", 50.0),
        ] {
            let fields = ProviderFields {
                name: name.to_string(),
                location: "New York, NY".to_string(),
                rate_expectations: rate,
                ..ProviderFields::default()
            };
            store
                .providers()
                .upsert(&Email::parse(address).unwrap(), &fields)
                .await
                .unwrap();
        }
        store
    }

    async fn query_rows(store: &Store, value: serde_json::Value) -> Vec<serde_json::Value> {
        let me = Email::parse("patient1@example.com").unwrap();
        let reply = ToolExecutor::new(store, &me)
            .execute("execute_dynamic_query", &args(value))
            .await
            .unwrap();
        serde_json::from_str(&reply).unwrap()
    }

    #[tokio::test]
    async fn test_dynamic_query_accepts_numeric_string_limit() {
        let store = store_with_caregivers().await;

        let rows = query_rows(&store, json!({"table": "providers", "limit": "1"})).await;
        assert_eq!(rows.len(), 1);

        let rows = query_rows(&store, json!({"table": "providers", "limit": "lots"})).await;
        assert_eq!(rows.len(), 2);
    }

    #[tokio::test]
    async fn test_dynamic_query_accepts_single_field_string() {
        let store = store_with_caregivers().await;

        let rows = query_rows(
            &store,
            json!({"table": "providers", "fields": "name", "order_by": "name"}),
        )
        .await;

        assert_eq!(rows, vec![json!({"name": "Ana"}), json!({"name": "Ben"})]);
    }

    #[tokio::test]
    async fn test_dynamic_query_skips_incomplete_filters() {
        let store = store_with_caregivers().await;

        let rows = query_rows(
            &store,
            json!({
                "table": "providers",
                "fields": ["email"],
                "filters": [
                    {"field": "name", "value": "Ana"},
                    {"operator": "=", "value": "Ben"},
                    {"field": "rate_expectations", "operator": "<", "value": 40}
                ]
            }),
        )
        .await;

        assert_eq!(rows, vec![json!({"email": "caregiver1@example.com"})]);
    }

    #[tokio::test]
    async fn test_record_match_defaults_to_proposed() {
        let store = Store::in_memory().await.unwrap();
        let me = Email::parse("caregiver1@example.com").unwrap();

        let reply = ToolExecutor::new(&store, &me)
            .execute(
                "record_match",
                &args(json!({"seeker_email": "patient1@example.com"})),
            )
            .await
            .unwrap();

        assert_eq!(
            reply,
            "Recorded match between caregiver1@example.com and patient1@example.com (proposed)."
        );
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let store = Store::in_memory().await.unwrap();
        let me = Email::parse("caregiver1@example.com").unwrap();

        let result = ToolExecutor::new(&store, &me)
            .execute("delete_everything", &ToolArguments::default())
            .await;
        assert!(matches!(result, Err(ToolError::UnknownTool(name)) if name == "delete_everything"));
    }
}
