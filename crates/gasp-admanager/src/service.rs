//! Remote service boundary.
//!
//! Everything the synchronizers need from the ad platform fits in two calls:
//! a filtered query and a batch create, both addressed by [`Endpoint`].

use std::fmt;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::RemoteError;

/// One remote operation: `service.method`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Endpoint {
    pub service: &'static str,
    pub method: &'static str,
}

impl Endpoint {
    pub const fn new(service: &'static str, method: &'static str) -> Self {
        Self { service, method }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.service, self.method)
    }
}

/// Endpoints used by the pipeline.
pub mod endpoints {
    use super::Endpoint;

    pub const COMPANIES: Endpoint = Endpoint::new("CompanyService", "getCompaniesByStatement");
    pub const USERS: Endpoint = Endpoint::new("UserService", "getUsersByStatement");

    pub const ORDERS: Endpoint = Endpoint::new("OrderService", "getOrdersByStatement");
    pub const CREATE_ORDERS: Endpoint = Endpoint::new("OrderService", "createOrders");

    pub const LINE_ITEMS: Endpoint = Endpoint::new("LineItemService", "getLineItemsByStatement");
    pub const CREATE_LINE_ITEMS: Endpoint = Endpoint::new("LineItemService", "createLineItems");

    pub const CREATIVES: Endpoint = Endpoint::new("CreativeService", "getCreativesByStatement");
    pub const CREATE_CREATIVES: Endpoint = Endpoint::new("CreativeService", "createCreatives");

    pub const ASSOCIATIONS: Endpoint = Endpoint::new(
        "LineItemCreativeAssociationService",
        "getLineItemCreativeAssociationsByStatement",
    );
    pub const CREATE_ASSOCIATIONS: Endpoint = Endpoint::new(
        "LineItemCreativeAssociationService",
        "createLineItemCreativeAssociations",
    );

    pub const TARGETING_KEYS: Endpoint = Endpoint::new(
        "CustomTargetingService",
        "getCustomTargetingKeysByStatement",
    );
    pub const TARGETING_VALUES: Endpoint = Endpoint::new(
        "CustomTargetingService",
        "getCustomTargetingValuesByStatement",
    );
}

// ---------------------------------------------------------------------------
// Statement
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Predicate {
    Eq { field: String, value: Value },
    In { field: String, values: Vec<Value> },
}

impl Predicate {
    pub fn field(&self) -> &str {
        match self {
            Predicate::Eq { field, .. } | Predicate::In { field, .. } => field,
        }
    }

    pub fn matches(&self, entity: &Value) -> bool {
        let Some(actual) = entity.get(self.field()) else {
            return false;
        };
        match self {
            Predicate::Eq { value, .. } => actual == value,
            Predicate::In { values, .. } => values.contains(actual),
        }
    }
}

/// Conjunction of field predicates.
///
/// Rendered to the platform's query language with positional bind variables
/// (`:v0`, `:v1`, ...) so row values never get spliced into query text.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Statement {
    predicates: Vec<Predicate>,
}

impl Statement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn and_eq(mut self, field: impl Into<String>, value: Value) -> Self {
        self.predicates.push(Predicate::Eq {
            field: field.into(),
            value,
        });
        self
    }

    pub fn and_in(mut self, field: impl Into<String>, values: Vec<Value>) -> Self {
        self.predicates.push(Predicate::In {
            field: field.into(),
            values,
        });
        self
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    /// `WHERE a = :v0 AND b IN (:v1)`; empty string for an unfiltered query.
    pub fn to_query(&self) -> String {
        if self.predicates.is_empty() {
            return String::new();
        }
        let clauses: Vec<String> = self
            .predicates
            .iter()
            .enumerate()
            .map(|(i, p)| match p {
                Predicate::Eq { field, .. } => format!("{field} = :v{i}"),
                Predicate::In { field, .. } => format!("{field} IN (:v{i})"),
            })
            .collect();
        format!("WHERE {}", clauses.join(" AND "))
    }

    /// Bind variables matching [`Statement::to_query`]; `IN` binds an array.
    pub fn bind_variables(&self) -> Map<String, Value> {
        self.predicates
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let v = match p {
                    Predicate::Eq { value, .. } => value.clone(),
                    Predicate::In { values, .. } => Value::Array(values.clone()),
                };
                (format!("v{i}"), v)
            })
            .collect()
    }

    /// Evaluate against a serialized entity. An absent field never matches.
    pub fn matches(&self, entity: &Value) -> bool {
        self.predicates.iter().all(|p| p.matches(entity))
    }

    /// Compact rendering with values inlined, for log lines and errors.
    pub fn describe(&self) -> String {
        if self.predicates.is_empty() {
            return "<all>".to_string();
        }
        self.predicates
            .iter()
            .map(|p| match p {
                Predicate::Eq { field, value } => format!("{field} == {value}"),
                Predicate::In { field, values } => {
                    format!("{field} in {}", Value::Array(values.clone()))
                }
            })
            .collect::<Vec<_>>()
            .join(" AND ")
    }
}

// ---------------------------------------------------------------------------
// Service trait
// ---------------------------------------------------------------------------

/// Query/create access to the ad platform.
///
/// Entities travel as JSON objects carrying at least `id` (except
/// associations) and `name`.
#[async_trait]
pub trait AdManagerService: Send + Sync {
    async fn query(&self, endpoint: Endpoint, statement: &Statement)
        -> Result<Vec<Value>, RemoteError>;

    /// Create `objects`; returns the created entities with their new ids.
    async fn create(&self, endpoint: Endpoint, objects: Vec<Value>)
        -> Result<Vec<Value>, RemoteError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn query_text_uses_positional_binds() {
        let st = Statement::new()
            .and_in("name", vec![json!("L1"), json!("L2")])
            .and_eq("orderId", json!(42));
        assert_eq!(st.to_query(), "WHERE name IN (:v0) AND orderId = :v1");

        let binds = st.bind_variables();
        assert_eq!(binds["v0"], json!(["L1", "L2"]));
        assert_eq!(binds["v1"], json!(42));
    }

    #[test]
    fn empty_statement_renders_unfiltered() {
        let st = Statement::new();
        assert_eq!(st.to_query(), "");
        assert!(st.bind_variables().is_empty());
        assert!(st.matches(&json!({"id": 1})));
        assert_eq!(st.describe(), "<all>");
    }

    #[test]
    fn matches_requires_every_predicate() {
        let st = Statement::new()
            .and_eq("customTargetingKeyId", json!(7))
            .and_eq("name", json!("US"));
        assert!(st.matches(&json!({"id": 1, "customTargetingKeyId": 7, "name": "US"})));
        assert!(!st.matches(&json!({"id": 2, "customTargetingKeyId": 8, "name": "US"})));
        assert!(!st.matches(&json!({"id": 3, "name": "US"})));
    }

    #[test]
    fn in_predicate_matches_membership() {
        let st = Statement::new().and_in("lineItemId", vec![json!(1), json!(2)]);
        assert!(st.matches(&json!({"lineItemId": 2, "creativeId": 9})));
        assert!(!st.matches(&json!({"lineItemId": 3, "creativeId": 9})));
    }

    #[test]
    fn describe_inlines_values() {
        let st = Statement::new().and_eq("name", json!("Acme"));
        assert_eq!(st.describe(), "name == \"Acme\"");
    }
}
