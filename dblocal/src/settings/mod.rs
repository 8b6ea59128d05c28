//! Supervisor configuration.
//!
//! The sidecar is configured through environment variables, the way it is
//! deployed in containers. [`Settings::from_env`] validates required
//! credentials at construction time so that misconfiguration fails before
//! any worker loop starts.

mod defaults;

pub use defaults::*;

use std::env;
use std::path::PathBuf;
use thiserror::Error;

/// Settings validation errors.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// A required environment variable is missing or empty.
    #[error("{0} environment variable is required")]
    MissingVar(&'static str),
}

/// Complete supervisor configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Branching API credentials and endpoint.
    pub api: ApiSettings,
    /// Branch resolution policy.
    pub branch: BranchSettings,
    /// Filesystem locations for state, templates and rendered configs.
    pub paths: PathSettings,
}

/// Branching API access configuration.
#[derive(Debug, Clone)]
pub struct ApiSettings {
    /// Base URL of the branching API.
    pub base_url: String,
    /// Bearer token for all API calls.
    pub api_key: String,
    /// Project that owns the branches.
    pub project_id: String,
}

/// Branch resolution policy.
#[derive(Debug, Clone)]
pub struct BranchSettings {
    /// Externally pinned branch id. When set, reconciliation and state
    /// bookkeeping are bypassed entirely.
    pub pinned_branch_id: Option<String>,
    /// Parent for newly created branches. `None` creates root-level branches.
    pub parent_branch_id: Option<String>,
    /// Delete the ephemeral branch on shutdown.
    pub delete_branch: bool,
    /// Kind of client this sidecar serves; changes the advertised
    /// application name.
    pub client: ClientKind,
}

/// The client the sidecar was launched for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientKind {
    /// Plain container deployment.
    Container,
    /// Editor-integrated deployment.
    Vscode,
}

impl ClientKind {
    /// Application name advertised to the database.
    pub fn app_name(&self) -> &'static str {
        match self {
            Self::Container => "dblocal_container",
            Self::Vscode => "dblocal_vscode_container",
        }
    }

    /// Suffix appended to the forwarded User-Agent header.
    pub fn user_agent_suffix(&self) -> &'static str {
        match self {
            Self::Container => "_dblocal_container",
            Self::Vscode => "_dblocal_vscode_container",
        }
    }

    /// Whether branches created for this client get the editor annotation.
    pub fn is_vscode(&self) -> bool {
        matches!(self, Self::Vscode)
    }
}

/// Filesystem locations used by the supervisor.
#[derive(Debug, Clone)]
pub struct PathSettings {
    /// File whose content determines the current logical branch name.
    pub control_file: PathBuf,
    /// JSON state file mapping logical names to remote branch ids.
    pub state_file: PathBuf,
    /// Pooler configuration template.
    pub pooler_template: PathBuf,
    /// Proxy configuration template.
    pub proxy_template: PathBuf,
    /// Destination for the rendered pooler configuration.
    pub pooler_config: PathBuf,
    /// Destination for the rendered proxy configuration.
    pub proxy_config: PathBuf,
    /// Pooler stdout/stderr log.
    pub pooler_log: PathBuf,
    /// Proxy stdout/stderr log.
    pub proxy_log: PathBuf,
    /// TLS certificate path.
    pub tls_cert: PathBuf,
    /// TLS private key path.
    pub tls_key: PathBuf,
    /// Pooler executable.
    pub pooler_bin: PathBuf,
    /// Proxy executable.
    pub proxy_bin: PathBuf,
}

impl Settings {
    /// Load settings from the process environment.
    ///
    /// `DBLOCAL_API_KEY` and `DBLOCAL_PROJECT_ID` are required; everything
    /// else has a default. An empty `PARENT_BRANCH_ID` is treated as absent.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::MissingVar`] when a required variable is
    /// missing or empty.
    pub fn from_env() -> Result<Self, SettingsError> {
        let api_key = require_var("DBLOCAL_API_KEY")?;
        let project_id = require_var("DBLOCAL_PROJECT_ID")?;
        let base_url =
            non_empty_var("DBLOCAL_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let delete_branch = env::var("DELETE_BRANCH")
            .map(|v| v.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(true);

        let client = match env::var("CLIENT") {
            Ok(v) if v.trim().eq_ignore_ascii_case("vscode") => ClientKind::Vscode,
            _ => ClientKind::Container,
        };

        Ok(Self {
            api: ApiSettings {
                base_url,
                api_key,
                project_id,
            },
            branch: BranchSettings {
                pinned_branch_id: non_empty_var("BRANCH_ID"),
                parent_branch_id: non_empty_var("PARENT_BRANCH_ID"),
                delete_branch,
                client,
            },
            paths: PathSettings::default(),
        })
    }
}

fn require_var(name: &'static str) -> Result<String, SettingsError> {
    non_empty_var(name).ok_or(SettingsError::MissingVar(name))
}

fn non_empty_var(name: &str) -> Option<String> {
    match env::var(name) {
        Ok(v) if !v.trim().is_empty() => Some(v.trim().to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Environment-variable manipulation is process-global, so these tests
    // construct settings directly and only exercise the pure helpers.

    #[test]
    fn test_client_kind_app_names() {
        assert_eq!(ClientKind::Container.app_name(), "dblocal_container");
        assert_eq!(ClientKind::Vscode.app_name(), "dblocal_vscode_container");
        assert!(ClientKind::Vscode.is_vscode());
        assert!(!ClientKind::Container.is_vscode());
    }

    #[test]
    fn test_user_agent_suffix_matches_app_name() {
        for kind in [ClientKind::Container, ClientKind::Vscode] {
            assert_eq!(
                kind.user_agent_suffix(),
                format!("_{}", kind.app_name())
            );
        }
    }

    #[test]
    fn test_default_paths() {
        let paths = PathSettings::default();
        assert_eq!(paths.control_file, PathBuf::from("/tmp/.git/HEAD"));
        assert_eq!(
            paths.state_file,
            PathBuf::from("/tmp/.dblocal/branches.json")
        );
        assert!(paths.pooler_config.to_string_lossy().ends_with(".ini"));
    }

    #[test]
    fn test_missing_var_error_names_variable() {
        let err = SettingsError::MissingVar("DBLOCAL_API_KEY");
        assert!(err.to_string().contains("DBLOCAL_API_KEY"));
    }
}
