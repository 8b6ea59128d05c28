//! Typed client for the branching API.

use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use super::error::ApiError;
use super::http::AsyncHttpClient;
use super::types::{
    Branch, BranchResponse, BranchSpec, BranchesResponse, ConnectionInfo, CreateBranchRequest,
    DatabasesResponse, EndpointSpec, EndpointsResponse, PasswordResponse,
};
use crate::settings::ApiSettings;

/// Typed calls against the branching API. Pure request/response, no state.
///
/// Generic over [`AsyncHttpClient`] so the reconciler and supervisor can be
/// tested against a mock transport.
pub struct BranchApi<C> {
    http: C,
    base_url: String,
    api_key: String,
    project_id: String,
}

impl<C: AsyncHttpClient> BranchApi<C> {
    /// Create a client from validated API settings.
    pub fn new(http: C, settings: &ApiSettings) -> Self {
        Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            project_id: settings.project_id.clone(),
        }
    }

    fn project_url(&self, suffix: &str) -> String {
        format!("{}/projects/{}{}", self.base_url, self.project_id, suffix)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        url: &str,
    ) -> Result<T, ApiError> {
        let body = self
            .http
            .get(url, &self.api_key)
            .await
            .map_err(|e| ApiError::from_http(operation, e))?;
        serde_json::from_slice(&body).map_err(|e| ApiError::Unexpected {
            operation,
            detail: e.to_string(),
        })
    }

    /// Check whether a branch still exists remotely.
    ///
    /// A 404 is a normal answer (`Ok(false)`); any other failure is an error.
    pub async fn branch_exists(&self, branch_id: &str) -> Result<bool, ApiError> {
        let url = self.project_url(&format!("/branches/{}", branch_id));
        match self.get_json::<BranchResponse>("verify branch", &url).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Names of all branches currently present in the project.
    pub async fn list_branch_names(&self) -> Result<Vec<String>, ApiError> {
        let url = self.project_url("/branches");
        let response: BranchesResponse = self.get_json("list branches", &url).await?;
        Ok(response
            .branches
            .into_iter()
            .filter_map(|b: Branch| b.name)
            .collect())
    }

    /// Pick a branch name that does not collide with an existing one.
    ///
    /// Returns `base` unchanged when free, otherwise `base_2`, `base_3`, …
    pub async fn available_branch_name(&self, base: &str) -> Result<String, ApiError> {
        let existing = self.list_branch_names().await?;
        if !existing.iter().any(|n| n == base) {
            return Ok(base.to_string());
        }
        let mut counter = 2u32;
        loop {
            let candidate = format!("{}_{}", base, counter);
            if !existing.iter().any(|n| n == &candidate) {
                return Ok(candidate);
            }
            counter += 1;
        }
    }

    /// Create a new branch with a read-write endpoint.
    ///
    /// Returns the id of the created branch.
    pub async fn create_branch(
        &self,
        parent_id: Option<&str>,
        name: Option<&str>,
        vscode: bool,
    ) -> Result<String, ApiError> {
        let mut annotation_value =
            std::collections::BTreeMap::from([("dblocal".to_string(), "true".to_string())]);
        if vscode {
            annotation_value.insert("vscode".to_string(), "true".to_string());
        }

        let branch = if parent_id.is_some() || name.is_some() {
            Some(BranchSpec {
                parent_id: parent_id.map(str::to_string),
                name: name.map(str::to_string),
            })
        } else {
            None
        };

        let request = CreateBranchRequest {
            annotation_value,
            endpoints: vec![EndpointSpec { kind: "read_write" }],
            branch,
        };
        let payload = serde_json::to_string(&request).map_err(|e| ApiError::Unexpected {
            operation: "create branch",
            detail: e.to_string(),
        })?;

        let url = self.project_url("/branches");
        let body = self
            .http
            .post_json(&url, &self.api_key, &payload)
            .await
            .map_err(|e| ApiError::from_http("create branch", e))?;
        let response: BranchResponse =
            serde_json::from_slice(&body).map_err(|e| ApiError::Unexpected {
                operation: "create branch",
                detail: e.to_string(),
            })?;

        info!(
            branch_id = %response.branch.id,
            name = response.branch.name.as_deref().unwrap_or("<unnamed>"),
            "created remote branch"
        );
        Ok(response.branch.id)
    }

    /// Delete a branch.
    pub async fn delete_branch(&self, branch_id: &str) -> Result<(), ApiError> {
        let url = self.project_url(&format!("/branches/{}", branch_id));
        self.http
            .delete(&url, &self.api_key)
            .await
            .map_err(|e| ApiError::from_http("delete branch", e))?;
        info!(branch_id = branch_id, "deleted remote branch");
        Ok(())
    }

    /// Resolve all connection descriptors for a branch: one per database,
    /// with the read-write endpoint host and the owner role's password.
    pub async fn connection_info(&self, branch_id: &str) -> Result<Vec<ConnectionInfo>, ApiError> {
        let host = self.endpoint_host(branch_id).await?;

        let url = self.project_url(&format!("/branches/{}/databases", branch_id));
        let response: DatabasesResponse = self.get_json("list databases", &url).await?;

        let mut descriptors = Vec::new();
        for database in response.databases {
            let (Some(name), Some(owner)) = (database.name, database.owner_name) else {
                warn!("database entry missing name or owner, skipping");
                continue;
            };
            let password = self.role_password(branch_id, &owner).await?;
            descriptors.push(ConnectionInfo {
                host: host.clone(),
                database: name,
                user: owner,
                password,
            });
        }

        if descriptors.is_empty() {
            return Err(ApiError::Unexpected {
                operation: "list databases",
                detail: format!("no usable databases on branch {}", branch_id),
            });
        }

        debug!(
            branch_id = branch_id,
            databases = descriptors.len(),
            "resolved connection descriptors"
        );
        Ok(descriptors)
    }

    /// Host of the first read-write endpoint attached to the branch.
    async fn endpoint_host(&self, branch_id: &str) -> Result<String, ApiError> {
        let url = self.project_url("/endpoints");
        let response: EndpointsResponse = self.get_json("list endpoints", &url).await?;

        response
            .endpoints
            .into_iter()
            .find(|e| {
                e.branch_id.as_deref() == Some(branch_id) && e.kind.as_deref() == Some("read_write")
            })
            .and_then(|e| e.host)
            .ok_or_else(|| ApiError::Unexpected {
                operation: "list endpoints",
                detail: format!("no read_write endpoint for branch {}", branch_id),
            })
    }

    async fn role_password(&self, branch_id: &str, role: &str) -> Result<String, ApiError> {
        let url = self.project_url(&format!(
            "/branches/{}/roles/{}/reveal_password",
            branch_id, role
        ));
        let response: PasswordResponse = self.get_json("reveal password", &url).await?;
        response.password.ok_or_else(|| ApiError::Unexpected {
            operation: "reveal password",
            detail: format!("password missing for role {}", role),
        })
    }
}
