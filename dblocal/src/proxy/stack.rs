//! The supervised proxy stack: pooler and proxy processes bound to the
//! currently resolved remote branch.

use std::future::Future;
use thiserror::Error;
use tracing::{info, warn};

use super::process::{ManagedProcess, ProcessError};
use super::render::{self, RenderError};
use super::tls::{self, TlsError};
use crate::api::{ApiError, AsyncHttpClient, BranchApi};
use crate::reconcile::Reconciler;
use crate::settings::Settings;
use crate::state::BranchStateStore;
use crate::supervisor::head::logical_branch_name;

/// Errors raised while bringing the stack up.
#[derive(Debug, Error)]
pub enum StackError {
    /// Branch resolution against the API failed.
    #[error(transparent)]
    Api(#[from] ApiError),
    /// Config rendering failed.
    #[error(transparent)]
    Render(#[from] RenderError),
    /// TLS bootstrap failed.
    #[error(transparent)]
    Tls(#[from] TlsError),
    /// A child process could not be started.
    #[error(transparent)]
    Process(#[from] ProcessError),
    /// Writing a rendered config failed.
    #[error("failed to write {path}: {source}")]
    WriteConfig {
        /// Destination path.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// What the supervisor drives: a stack that can be (re)started against the
/// current branch, stopped, and asked to release its branch on shutdown.
///
/// Abstracted as a trait so the supervisor's reload loop is testable
/// without child processes or a network.
pub trait ProxyStack: Send {
    /// Resolve the branch and start the managed processes.
    fn start(&mut self) -> impl Future<Output = Result<(), StackError>> + Send;

    /// Stop the managed processes. Idempotent.
    fn stop(&mut self) -> impl Future<Output = ()> + Send;

    /// Delete the ephemeral branch if configured to. Called once, at
    /// shutdown, after the processes are stopped.
    fn cleanup_branch(&mut self) -> impl Future<Output = ()> + Send;
}

/// Production stack: renders pgbouncer/haproxy configs for the resolved
/// branch and supervises both binaries.
pub struct LocalProxyStack<C> {
    settings: Settings,
    api: BranchApi<C>,
    store: BranchStateStore,
    pooler: Option<ManagedProcess>,
    proxy: Option<ManagedProcess>,
}

impl<C: AsyncHttpClient> LocalProxyStack<C> {
    /// Build a stack from validated settings and an API transport.
    pub fn new(settings: Settings, http: C) -> Self {
        let api = BranchApi::new(http, &settings.api);
        let store = BranchStateStore::new(settings.paths.state_file.clone());
        Self {
            settings,
            api,
            store,
            pooler: None,
            proxy: None,
        }
    }

    fn logical_name(&self) -> Option<String> {
        logical_branch_name(&self.settings.paths.control_file)
    }

    fn write_config(path: &std::path::Path, contents: &str) -> Result<(), StackError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StackError::WriteConfig {
                path: parent.display().to_string(),
                source,
            })?;
        }
        std::fs::write(path, contents).map_err(|source| StackError::WriteConfig {
            path: path.display().to_string(),
            source,
        })
    }
}

impl<C: AsyncHttpClient> ProxyStack for LocalProxyStack<C> {
    async fn start(&mut self) -> Result<(), StackError> {
        let paths = &self.settings.paths;
        let branch = &self.settings.branch;

        tls::ensure_certificates(&paths.tls_cert, &paths.tls_key).await?;

        let logical = self.logical_name();
        let loaded = self.store.load();
        let reconciler = Reconciler::new(&self.api, branch.client.is_vscode());
        let (databases, updated) = reconciler
            .resolve(
                loaded.clone(),
                logical.as_deref(),
                branch.pinned_branch_id.as_deref(),
                branch.parent_branch_id.as_deref(),
            )
            .await?;
        if updated != loaded {
            self.store.save(&updated);
        }

        let app_name = branch.client.app_name();
        let pooler_template = render::load_template(&paths.pooler_template)?;
        let proxy_template = render::load_template(&paths.proxy_template)?;
        let pooler_config = render::render_pooler_config(&databases, &pooler_template, app_name)?;
        let proxy_config = render::render_proxy_config(
            &databases,
            &proxy_template,
            app_name,
            branch.client.user_agent_suffix(),
        )?;
        Self::write_config(&paths.pooler_config, &pooler_config)?;
        Self::write_config(&paths.proxy_config, &proxy_config)?;

        // The proxy fronts the pooler, so the pooler comes up first.
        let pooler_config_arg = paths.pooler_config.display().to_string();
        self.pooler = Some(ManagedProcess::spawn(
            "pooler",
            &paths.pooler_bin,
            &[&pooler_config_arg],
            &paths.pooler_log,
        )?);

        let proxy_config_arg = paths.proxy_config.display().to_string();
        self.proxy = Some(ManagedProcess::spawn(
            "proxy",
            &paths.proxy_bin,
            &["-f", &proxy_config_arg],
            &paths.proxy_log,
        )?);

        info!(
            branch = logical.as_deref().unwrap_or("<detached>"),
            "proxy stack running"
        );
        Ok(())
    }

    async fn stop(&mut self) {
        // Reverse start order.
        if let Some(proxy) = self.proxy.take() {
            proxy.stop().await;
        }
        if let Some(pooler) = self.pooler.take() {
            pooler.stop().await;
        }
    }

    async fn cleanup_branch(&mut self) {
        if !self.settings.branch.delete_branch {
            info!("branch deletion disabled, leaving branch in place");
            return;
        }
        if self.settings.branch.pinned_branch_id.is_some() {
            info!("pinned branch is never deleted");
            return;
        }

        let logical = self.logical_name();
        let state = self.store.load();
        let reconciler = Reconciler::new(&self.api, self.settings.branch.client.is_vscode());
        match reconciler.cleanup(state.clone(), logical.as_deref()).await {
            Ok(updated) => {
                if updated != state {
                    self.store.save(&updated);
                }
            }
            Err(e) => {
                // Shutdown continues; the branch can be removed manually.
                warn!(error = %e, "branch cleanup failed");
            }
        }
    }
}
