//! Query documents attached to feature extractors.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{LtrError, Result};

/// Clause name of the query that matches no documents.
pub const MATCH_NONE_QUERY: &str = "match_none";

/// Immutable wrapper around a structured query document.
///
/// A valid query is a JSON object holding exactly one clause whose body is
/// itself an object, e.g. `{"term": {"status": "active"}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct QueryProvider {
    query: Value,
}

impl QueryProvider {
    /// Parse query text into a provider.
    pub fn from_parsed_text(text: &str) -> Result<Self> {
        let query: Value = serde_json::from_str(text)
            .map_err(|e| LtrError::invalid_query(format!("failed to parse query: {}", e)))?;
        Self::from_literal_query(query)
    }

    /// Build a provider from an already structured query.
    pub fn from_literal_query(query: Value) -> Result<Self> {
        let clause = query
            .as_object()
            .ok_or_else(|| LtrError::invalid_query("query must be an object"))?;

        let mut clauses = clause.iter();
        let (name, body) = match (clauses.next(), clauses.next()) {
            (Some(only), None) => only,
            _ => {
                return Err(LtrError::invalid_query(format!(
                    "query must contain exactly one clause, found {}",
                    clause.len()
                )))
            }
        };
        if !body.is_object() {
            return Err(LtrError::invalid_query(format!(
                "body of [{}] must be an object",
                name
            )));
        }

        Ok(Self { query })
    }

    /// The canonical query that matches zero documents.
    pub fn match_none() -> Self {
        Self {
            query: json!({ "match_none": {} }),
        }
    }

    /// Serialize the query document to compact JSON text.
    pub fn to_text(&self) -> String {
        self.query.to_string()
    }

    /// Name of the top-level query clause.
    pub fn query_type(&self) -> &str {
        self.query
            .as_object()
            .and_then(|clause| clause.keys().next())
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// Whether this is the match-nothing query.
    pub fn is_match_none(&self) -> bool {
        self.query_type() == MATCH_NONE_QUERY
    }

    /// The underlying query document.
    pub fn query(&self) -> &Value {
        &self.query
    }
}

impl TryFrom<Value> for QueryProvider {
    type Error = LtrError;

    fn try_from(value: Value) -> Result<Self> {
        Self::from_literal_query(value)
    }
}

impl From<QueryProvider> for Value {
    fn from(provider: QueryProvider) -> Self {
        provider.query
    }
}

impl std::fmt::Display for QueryProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.query)
    }
}
