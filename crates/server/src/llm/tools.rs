//! Function catalog offered to the model on every turn.

use serde_json::json;

use crate::db::QueryTable;

use super::types::FunctionDefinition;

/// Get the functions the assistant may invoke.
#[must_use]
pub fn helper_tools() -> Vec<FunctionDefinition> {
    let mut tools = profile_tools();
    tools.extend(matching_tools());
    tools.extend(skill_tools());
    tools.push(dynamic_query_tool());
    tools
}

/// Profile writes and listings.
fn profile_tools() -> Vec<FunctionDefinition> {
    vec![
        FunctionDefinition {
            name: "store_provider".to_string(),
            description: "Store or update the current user's caregiver profile. Send whatever \
                fields are known so far; fields already stored are kept when omitted."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "name": {"type": "string", "description": "Caregiver's full name"},
                    "experience": {"type": "string", "description": "Years of experience"},
                    "location": {"type": "string", "description": "City and state, e.g. 'New York, NY'"},
                    "availability": {"type": "string", "description": "Availability schedule"},
                    "specializations": {"type": "string", "description": "Areas of specialization"},
                    "rate_expectations": {"type": "number", "description": "Hourly rate in dollars"},
                    "certifications": {"type": "string", "description": "Professional certifications"}
                }
            }),
        },
        FunctionDefinition {
            name: "store_seeker".to_string(),
            description: "Store or update the current user's patient profile. Send whatever \
                fields are known so far; fields already stored are kept when omitted."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "name": {"type": "string", "description": "Patient's full name"},
                    "care_needs": {"type": "string", "description": "Description of care needs"},
                    "location": {"type": "string", "description": "City and state, e.g. 'New York, NY'"},
                    "schedule_requirements": {"type": "string", "description": "When care is needed"},
                    "budget": {"type": "number", "description": "Hourly budget in dollars"},
                    "special_requirements": {"type": "string", "description": "Any special requirements"},
                    "phone_number": {"type": "string", "description": "Contact phone number"}
                }
            }),
        },
        FunctionDefinition {
            name: "list_providers".to_string(),
            description: "List all registered caregivers".to_string(),
            parameters: json!({"type": "object", "properties": {}}),
        },
        FunctionDefinition {
            name: "list_seekers".to_string(),
            description: "List all registered patients".to_string(),
            parameters: json!({"type": "object", "properties": {}}),
        },
    ]
}

fn matching_tools() -> Vec<FunctionDefinition> {
    vec![
        FunctionDefinition {
            name: "find_matching_providers".to_string(),
            description: "Find caregivers in the patient's location whose rate fits the \
                patient's budget, cheapest first."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "seeker_email": {
                        "type": "string",
                        "description": "Email of the patient seeking care (defaults to the current user)"
                    }
                }
            }),
        },
        FunctionDefinition {
            name: "find_matching_seekers".to_string(),
            description: "Find patients in the caregiver's location whose budget covers the \
                caregiver's rate, highest budget first."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "provider_email": {
                        "type": "string",
                        "description": "Email of the caregiver (defaults to the current user)"
                    }
                }
            }),
        },
        FunctionDefinition {
            name: "record_match".to_string(),
            description: "Record a pairing between a caregiver and a patient".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "provider_email": {"type": "string", "description": "Caregiver's email"},
                    "seeker_email": {"type": "string", "description": "Patient's email"},
                    "status": {
                        "type": "string",
                        "enum": ["proposed", "accepted", "declined"],
                        "description": "Where the pairing stands (default proposed)"
                    }
                },
                "required": ["provider_email", "seeker_email"]
            }),
        },
    ]
}

fn skill_tools() -> Vec<FunctionDefinition> {
    vec![
        FunctionDefinition {
            name: "add_skills".to_string(),
            description: "Tag the current user with skills or facts, e.g. 'dementia care' or \
                'speaks Spanish'."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "skills": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Tags to add"
                    }
                },
                "required": ["skills"]
            }),
        },
        FunctionDefinition {
            name: "remove_skill".to_string(),
            description: "Remove one tag from the current user".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "skill": {"type": "string", "description": "Tag to remove"}
                },
                "required": ["skill"]
            }),
        },
    ]
}

fn dynamic_query_tool() -> FunctionDefinition {
    let tables: Vec<&str> = QueryTable::ALL.iter().map(|t| t.as_str()).collect();

    FunctionDefinition {
        name: "execute_dynamic_query".to_string(),
        description: "Run a read-only query against the caregiver, patient, match or skill \
            tables. Operators: =, >, <, >=, <=, LIKE, NOT LIKE, IN, NOT IN, IS NULL, IS NOT NULL."
            .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "table": {
                    "type": "string",
                    "enum": tables,
                    "description": "Table to query"
                },
                "fields": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Columns to return (all when omitted)"
                },
                "filters": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "field": {"type": "string"},
                            "operator": {"type": "string"},
                            "value": {}
                        },
                        "required": ["field", "operator"]
                    }
                },
                "order_by": {"type": "string", "description": "Column, optionally followed by ASC or DESC"},
                "limit": {"type": "integer", "description": "Maximum rows to return"}
            },
            "required": ["table"]
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_names_are_unique() {
        let tools = helper_tools();
        let mut names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
        let total = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), total);
        assert_eq!(total, 10);
    }

    #[test]
    fn test_dynamic_query_enumerates_tables() {
        let tool = dynamic_query_tool();
        let tables = &tool.parameters["properties"]["table"]["enum"];
        assert_eq!(
            tables,
            &json!(["providers", "seekers", "matches", "skills"])
        );
    }

    #[test]
    fn test_store_tools_take_no_email() {
        for tool in helper_tools().iter().filter(|t| t.name.starts_with("store_")) {
            assert!(tool.parameters["properties"].get("email").is_none(), "{}", tool.name);
        }
    }
}
