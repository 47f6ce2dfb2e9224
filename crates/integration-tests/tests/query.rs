//! Integration tests for the dynamic query builder.

#![allow(clippy::unwrap_used)]

use serde_json::json;

use helper_core::MatchStatus;
use helper_integration_tests::{TestContext, email};
use helper_server::db::{DynamicQuery, QueryError};

fn query(value: serde_json::Value) -> DynamicQuery {
    serde_json::from_value(value).unwrap()
}

#[tokio::test]
async fn test_unknown_table_is_rejected() {
    let ctx = TestContext::new().await;

    let err = query(json!({"table": "users"}))
        .execute(ctx.store.pool())
        .await
        .unwrap_err();
    assert!(matches!(err, QueryError::InvalidTable(table) if table == "users"));

    let err = query(json!({"table": "sqlite_master"}))
        .execute(ctx.store.pool())
        .await
        .unwrap_err();
    assert!(matches!(err, QueryError::InvalidTable(_)));
}

#[tokio::test]
async fn test_like_filter_finds_by_location() {
    let ctx = TestContext::new().await;
    ctx.provider("caregiver1@example.com", "New York, NY", 35.0).await;
    ctx.provider("caregiver2@example.com", "Boston, MA", 30.0).await;

    let rows = query(json!({
        "table": "providers",
        "fields": ["email", "rate_expectations"],
        "filters": [{"field": "location", "operator": "like", "value": "%York%"}]
    }))
    .execute(ctx.store.pool())
    .await
    .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["email"], json!("caregiver1@example.com"));
    assert_eq!(rows[0]["rate_expectations"], json!(35.0));
    assert!(!rows[0].contains_key("location"));
}

#[tokio::test]
async fn test_in_filter_with_order_and_limit() {
    let ctx = TestContext::new().await;
    ctx.seeker("a@example.com", "Denver", 20.0).await;
    ctx.seeker("b@example.com", "Denver", 50.0).await;
    ctx.seeker("c@example.com", "Denver", 35.0).await;

    let rows = query(json!({
        "table": "seekers",
        "fields": ["email"],
        "filters": [{"field": "email", "operator": "IN", "value": ["a@example.com", "b@example.com", "c@example.com"]}],
        "order_by": "budget DESC",
        "limit": 2
    }))
    .execute(ctx.store.pool())
    .await
    .unwrap();

    let emails: Vec<&serde_json::Value> = rows.iter().map(|r| &r["email"]).collect();
    assert_eq!(emails, vec![&json!("b@example.com"), &json!("c@example.com")]);
}

#[tokio::test]
async fn test_injection_attempts_are_neutralized() {
    let ctx = TestContext::new().await;
    ctx.provider("caregiver1@example.com", "New York, NY", 35.0).await;

    let rows = query(json!({
        "table": "providers",
        "fields": ["email; DROP TABLE providers"],
        "filters": [
            {"field": "location", "operator": "=", "value": "x' OR '1'='1"},
            {"field": "1=1 OR email", "operator": "=", "value": "anything"}
        ],
        "order_by": "rate_expectations; DELETE FROM providers"
    }))
    .execute(ctx.store.pool())
    .await
    .unwrap();
    assert!(rows.is_empty());

    assert_eq!(ctx.store.providers().list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_matches_and_skills_are_queryable() {
    let ctx = TestContext::new().await;
    let caregiver = email("caregiver1@example.com");
    ctx.store
        .matches()
        .record(&caregiver, &email("patient1@example.com"), MatchStatus::Accepted)
        .await
        .unwrap();
    ctx.store.skills().add(&caregiver, "cpr").await.unwrap();

    let matches = query(json!({
        "table": "matches",
        "filters": [{"field": "status", "operator": "=", "value": "accepted"}]
    }))
    .execute(ctx.store.pool())
    .await
    .unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0]["seeker_email"], json!("patient1@example.com"));

    let skills = query(json!({
        "table": "skills",
        "fields": ["skill"],
        "filters": [{"field": "email", "operator": "=", "value": "caregiver1@example.com"}]
    }))
    .execute(ctx.store.pool())
    .await
    .unwrap();
    assert_eq!(skills[0]["skill"], json!("cpr"));
}
