//! Wire types for the branching API.
//!
//! Only the fields the supervisor depends on are modeled; unknown fields
//! are ignored on deserialization.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One resolved set of connection parameters for a single database on a
/// branch. Ephemeral: produced per reload cycle for the config renderer,
/// never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    /// Endpoint hostname.
    pub host: String,
    /// Database name.
    pub database: String,
    /// Role that owns the database.
    pub user: String,
    /// Role password.
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BranchesResponse {
    #[serde(default)]
    pub branches: Vec<Branch>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BranchResponse {
    pub branch: Branch,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Branch {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DatabasesResponse {
    #[serde(default)]
    pub databases: Vec<Database>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Database {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub owner_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PasswordResponse {
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EndpointsResponse {
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Endpoint {
    #[serde(default)]
    pub branch_id: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub host: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateBranchRequest {
    pub annotation_value: BTreeMap<String, String>,
    pub endpoints: Vec<EndpointSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<BranchSpec>,
}

#[derive(Debug, Serialize)]
pub(crate) struct EndpointSpec {
    #[serde(rename = "type")]
    pub kind: &'static str,
}

#[derive(Debug, Serialize)]
pub(crate) struct BranchSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_branch_response_ignores_unknown_fields() {
        let json = r#"{"branch":{"id":"br-1","name":"main","created_at":"2024-01-01"}}"#;
        let parsed: BranchResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.branch.id, "br-1");
        assert_eq!(parsed.branch.name.as_deref(), Some("main"));
    }

    #[test]
    fn test_create_request_omits_empty_branch_spec() {
        let request = CreateBranchRequest {
            annotation_value: BTreeMap::from([("dblocal".to_string(), "true".to_string())]),
            endpoints: vec![EndpointSpec { kind: "read_write" }],
            branch: None,
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(!json.contains("\"branch\""));
        assert!(json.contains(r#""type":"read_write""#));
    }

    #[test]
    fn test_create_request_with_parent_and_name() {
        let request = CreateBranchRequest {
            annotation_value: BTreeMap::new(),
            endpoints: vec![EndpointSpec { kind: "read_write" }],
            branch: Some(BranchSpec {
                parent_id: Some("br-parent".to_string()),
                name: Some("feature-x".to_string()),
            }),
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains(r#""parent_id":"br-parent""#));
        assert!(json.contains(r#""name":"feature-x""#));
    }
}
