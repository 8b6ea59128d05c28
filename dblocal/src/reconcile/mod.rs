//! Branch-state reconciliation.
//!
//! Decides, per reload cycle, which remote branch the proxy stack should
//! point at. The inputs are the persisted state map, the logical branch
//! name from the control file, and the operator's pinning/parent settings;
//! the output is a set of connection descriptors plus the updated state.
//!
//! Remote existence is always verified before reusing a recorded branch so
//! that deleting a branch in the console simply causes a fresh one to be
//! created on the next cycle.

use tracing::{info, warn};

use crate::api::{ApiError, AsyncHttpClient, BranchApi, ConnectionInfo};
use crate::state::{entry_branch_id, BranchEntry, StateMap, DETACHED_KEY};

/// Resolves logical branch names to live remote branches.
pub struct Reconciler<'a, C> {
    api: &'a BranchApi<C>,
    vscode: bool,
}

impl<'a, C: AsyncHttpClient> Reconciler<'a, C> {
    /// Create a reconciler over the given API client.
    pub fn new(api: &'a BranchApi<C>, vscode: bool) -> Self {
        Self { api, vscode }
    }

    /// Resolve the branch to serve and return its connection descriptors
    /// together with the (possibly updated) state map.
    ///
    /// A pinned branch id bypasses reconciliation entirely and leaves the
    /// state untouched. Otherwise the logical name (or [`DETACHED_KEY`])
    /// selects a state entry: a recorded branch is reused when it still
    /// exists remotely, and replaced with a freshly created one when it
    /// does not. New entries are recorded only after the branch exists.
    pub async fn resolve(
        &self,
        mut state: StateMap,
        logical: Option<&str>,
        pinned: Option<&str>,
        parent: Option<&str>,
    ) -> Result<(Vec<ConnectionInfo>, StateMap), ApiError> {
        if let Some(branch_id) = pinned {
            info!(branch_id = branch_id, "using pinned branch");
            let info = self.api.connection_info(branch_id).await?;
            return Ok((info, state));
        }

        let parent = parent.filter(|p| !p.is_empty());
        let key = logical.unwrap_or(DETACHED_KEY);

        let recorded = state.get(key).and_then(entry_branch_id).map(str::to_string);
        let branch_id = match recorded {
            Some(id) if self.api.branch_exists(&id).await? => {
                info!(branch = key, branch_id = %id, "reusing recorded branch");
                id
            }
            Some(id) => {
                warn!(branch = key, branch_id = %id, "recorded branch vanished, creating a new one");
                self.create_for(key, logical, parent).await?
            }
            None => self.create_for(key, logical, parent).await?,
        };

        state.insert(
            key.to_string(),
            BranchEntry::Handle {
                branch_id: branch_id.clone(),
            },
        );

        let info = self.api.connection_info(&branch_id).await?;
        Ok((info, state))
    }

    async fn create_for(
        &self,
        key: &str,
        logical: Option<&str>,
        parent: Option<&str>,
    ) -> Result<String, ApiError> {
        let name = match logical {
            Some(base) => Some(self.api.available_branch_name(base).await?),
            None => None,
        };
        let branch_id = self
            .api
            .create_branch(parent, name.as_deref(), self.vscode)
            .await?;
        info!(branch = key, branch_id = %branch_id, "created branch");
        Ok(branch_id)
    }

    /// Remove the entry for `logical` from the state, deleting the remote
    /// branch when it still exists.
    ///
    /// A branch that is already gone, or unverifiable because the API is
    /// unreachable, is dropped from the state without a delete call. Other
    /// delete failures keep the entry so a later run can retry.
    pub async fn cleanup(
        &self,
        mut state: StateMap,
        logical: Option<&str>,
    ) -> Result<StateMap, ApiError> {
        let key = logical.unwrap_or(DETACHED_KEY);
        let Some(branch_id) = state.get(key).and_then(entry_branch_id).map(str::to_string)
        else {
            return Ok(state);
        };

        match self.api.branch_exists(&branch_id).await {
            Ok(true) => match self.api.delete_branch(&branch_id).await {
                Ok(()) => {}
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e),
            },
            Ok(false) => {
                info!(branch_id = %branch_id, "branch already gone, nothing to delete");
            }
            Err(e) => {
                warn!(branch_id = %branch_id, error = %e, "could not verify branch, skipping delete");
            }
        }

        state.remove(key);
        Ok(state)
    }
}
