//! Declarative read-only queries over the whitelisted tables.
//!
//! The model can ask for ad-hoc reads through the `execute_dynamic_query`
//! tool. Requests are turned into parameterized SQL here; table and column
//! names only ever come from the fixed lists below, and every value is bound.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Row, SqlitePool, TypeInfo, ValueRef};
use thiserror::Error;
use tracing::instrument;

/// Errors from building or running a dynamic query.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The requested table is not one of the queryable tables.
    #[error("invalid table: {0}")]
    InvalidTable(String),

    /// The query failed to execute or a column failed to decode.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// One filter clause of a dynamic query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryFilter {
    pub field: String,
    pub operator: String,
    #[serde(default)]
    pub value: Value,
}

/// A read request as the model phrases it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DynamicQuery {
    pub table: String,
    #[serde(default)]
    pub fields: Vec<String>,
    #[serde(default)]
    pub filters: Vec<QueryFilter>,
    #[serde(default)]
    pub order_by: Option<String>,
    #[serde(default)]
    pub limit: Option<i64>,
}

/// A bound parameter of a planned query.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl From<&Value> for QueryValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Integer(i64::from(*b)),
            Value::Number(n) => n
                .as_i64()
                .map_or_else(|| Self::Real(n.as_f64().unwrap_or_default()), Self::Integer),
            Value::String(s) => Self::Text(s.clone()),
            Value::Array(_) | Value::Object(_) => Self::Text(value.to_string()),
        }
    }
}

/// SQL text plus its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    pub sql: String,
    pub params: Vec<QueryValue>,
}

// =============================================================================
// Whitelists
// =============================================================================

/// Tables the query builder may touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryTable {
    Providers,
    Seekers,
    Matches,
    Skills,
}

impl QueryTable {
    /// Every queryable table, in catalog order.
    pub const ALL: [Self; 4] = [Self::Providers, Self::Seekers, Self::Matches, Self::Skills];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Providers => "providers",
            Self::Seekers => "seekers",
            Self::Matches => "matches",
            Self::Skills => "skills",
        }
    }

    /// Columns that exist on this table.
    #[must_use]
    pub const fn columns(self) -> &'static [&'static str] {
        match self {
            Self::Providers => &[
                "email",
                "name",
                "experience",
                "location",
                "availability",
                "specializations",
                "rate_expectations",
                "certifications",
                "created_at",
            ],
            Self::Seekers => &[
                "email",
                "name",
                "care_needs",
                "location",
                "schedule_requirements",
                "budget",
                "special_requirements",
                "phone_number",
                "created_at",
            ],
            Self::Matches => &["provider_email", "seeker_email", "status", "created_at"],
            Self::Skills => &["email", "skill", "created_at"],
        }
    }

    /// Resolve a requested column to its whitelisted spelling.
    fn column(self, requested: &str) -> Option<&'static str> {
        let requested = requested.trim();
        self.columns().iter().copied().find(|c| *c == requested)
    }
}

impl fmt::Display for QueryTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueryTable {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s.trim())
            .ok_or_else(|| QueryError::InvalidTable(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    Eq,
    Gt,
    Lt,
    Ge,
    Le,
    Like,
    NotLike,
    In,
    NotIn,
    IsNull,
    IsNotNull,
}

impl Operator {
    /// Parse an operator, ignoring case and extra inner whitespace.
    fn parse(raw: &str) -> Option<Self> {
        let normalized = raw
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_ascii_uppercase();

        Some(match normalized.as_str() {
            "=" => Self::Eq,
            ">" => Self::Gt,
            "<" => Self::Lt,
            ">=" => Self::Ge,
            "<=" => Self::Le,
            "LIKE" => Self::Like,
            "NOT LIKE" => Self::NotLike,
            "IN" => Self::In,
            "NOT IN" => Self::NotIn,
            "IS NULL" => Self::IsNull,
            "IS NOT NULL" => Self::IsNotNull,
            _ => return None,
        })
    }

    const fn as_sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Ge => ">=",
            Self::Le => "<=",
            Self::Like => "LIKE",
            Self::NotLike => "NOT LIKE",
            Self::In => "IN",
            Self::NotIn => "NOT IN",
            Self::IsNull => "IS NULL",
            Self::IsNotNull => "IS NOT NULL",
        }
    }
}

// =============================================================================
// Planning and execution
// =============================================================================

impl DynamicQuery {
    /// Build the parameterized SQL for this request.
    ///
    /// Unknown columns are dropped from the projection, filters on unknown
    /// columns or with unknown operators are skipped, and an unknown order-by
    /// column is ignored.
    ///
    /// # Errors
    ///
    /// Returns `QueryError::InvalidTable` if the table is not queryable.
    pub fn plan(&self) -> Result<QueryPlan, QueryError> {
        let table: QueryTable = self.table.parse()?;
        let mut params = Vec::new();

        let projection: Vec<&str> = self
            .fields
            .iter()
            .filter_map(|f| table.column(f))
            .collect();
        let projection = if projection.is_empty() {
            "*".to_string()
        } else {
            projection.join(", ")
        };

        let mut sql = format!("SELECT {projection} FROM {table}");

        let mut clauses = Vec::new();
        for filter in &self.filters {
            let Some(column) = table.column(&filter.field) else {
                tracing::debug!(field = %filter.field, "Skipping filter on unknown column");
                continue;
            };
            let Some(operator) = Operator::parse(&filter.operator) else {
                tracing::debug!(
                    operator = %filter.operator,
                    "Skipping filter with unknown operator"
                );
                continue;
            };

            let clause = match operator {
                Operator::IsNull | Operator::IsNotNull => {
                    format!("{column} {}", operator.as_sql())
                }
                Operator::In | Operator::NotIn => {
                    let placeholders = match &filter.value {
                        Value::Array(items) if !items.is_empty() => {
                            params.extend(items.iter().map(QueryValue::from));
                            vec!["?"; items.len()].join(", ")
                        }
                        other => {
                            params.push(QueryValue::from(other));
                            "?".to_string()
                        }
                    };
                    format!("{column} {} ({placeholders})", operator.as_sql())
                }
                _ => {
                    params.push(QueryValue::from(&filter.value));
                    format!("{column} {} ?", operator.as_sql())
                }
            };
            clauses.push(clause);
        }

        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }

        if let Some(order) = self.order_by.as_deref().and_then(|o| order_clause(table, o)) {
            sql.push_str(" ORDER BY ");
            sql.push_str(&order);
        }

        if let Some(limit) = self.limit.filter(|l| *l > 0) {
            sql.push_str(" LIMIT ?");
            params.push(QueryValue::Integer(limit));
        }

        Ok(QueryPlan { sql, params })
    }

    /// Plan and run the request, returning each row as a JSON object.
    ///
    /// # Errors
    ///
    /// Returns `QueryError::InvalidTable` before touching the database if the
    /// table is not queryable, `QueryError::Database` if execution fails.
    #[instrument(skip(self, pool), fields(table = %self.table))]
    pub async fn execute(&self, pool: &SqlitePool) -> Result<Vec<Map<String, Value>>, QueryError> {
        let plan = self.plan()?;
        tracing::debug!(sql = %plan.sql, params = plan.params.len(), "Running dynamic query");

        let mut query = sqlx::query(&plan.sql);
        for param in &plan.params {
            query = match param {
                QueryValue::Null => query.bind(None::<String>),
                QueryValue::Integer(i) => query.bind(*i),
                QueryValue::Real(r) => query.bind(*r),
                QueryValue::Text(s) => query.bind(s.as_str()),
            };
        }

        let rows = query.fetch_all(pool).await?;
        rows.iter().map(row_to_json).collect()
    }
}

/// Parse `column [ASC|DESC]`, returning `None` when it cannot be applied.
fn order_clause(table: QueryTable, raw: &str) -> Option<String> {
    let mut parts = raw.split_whitespace();
    let column = table.column(parts.next()?)?;
    let direction = match parts.next() {
        None => None,
        Some(d) if d.eq_ignore_ascii_case("asc") => Some("ASC"),
        Some(d) if d.eq_ignore_ascii_case("desc") => Some("DESC"),
        Some(_) => return None,
    };
    if parts.next().is_some() {
        return None;
    }

    Some(direction.map_or_else(|| column.to_string(), |d| format!("{column} {d}")))
}

/// Decode a row by the storage class of each value.
fn row_to_json(row: &SqliteRow) -> Result<Map<String, Value>, QueryError> {
    let mut out = Map::new();
    for column in row.columns() {
        let index = column.ordinal();
        let raw = row.try_get_raw(index)?;

        let value = if raw.is_null() {
            Value::Null
        } else {
            match raw.type_info().name() {
                "INTEGER" | "BOOLEAN" => Value::from(row.try_get::<i64, _>(index)?),
                "REAL" => Value::from(row.try_get::<f64, _>(index)?),
                "BLOB" => {
                    let bytes = row.try_get::<Vec<u8>, _>(index)?;
                    Value::from(String::from_utf8_lossy(&bytes).into_owned())
                }
                _ => Value::from(row.try_get::<String, _>(index)?),
            }
        };
        out.insert(column.name().to_string(), value);
    }
    Ok(out)
}
