//! dblocal - sidecar supervisor for database-branch proxying.
//!
//! Resolves a remote database branch for the current working branch,
//! keeps a local pooler/proxy pair pointed at it, and reconciles on
//! branch switches until told to shut down.

mod error;
mod runner;

use clap::Parser;
use dblocal::api::ReqwestClient;
use dblocal::proxy::LocalProxyStack;
use dblocal::supervisor::Supervisor;
use error::CliError;
use runner::CliRunner;
use std::path::PathBuf;
use std::process;
use tokio::signal::unix::{signal, SignalKind};
use tracing::info;

#[derive(Parser)]
#[command(name = "dblocal")]
#[command(about = "Branch-aware database proxy sidecar", long_about = None)]
struct Args {
    /// Pin a specific branch id, bypassing branch-state reconciliation
    #[arg(long)]
    branch_id: Option<String>,

    /// Parent branch for newly created branches
    #[arg(long)]
    parent_branch_id: Option<String>,

    /// Keep the ephemeral branch on shutdown
    #[arg(long)]
    keep_branch: bool,

    /// File watched for the current working branch (git HEAD format)
    #[arg(long)]
    control_file: Option<PathBuf>,

    /// Enable debug-level logging regardless of RUST_LOG
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let runner = match CliRunner::with_debug(args.debug) {
        Ok(r) => r,
        Err(e) => e.exit(),
    };
    runner.log_startup();

    // Command-line flags override the environment.
    let mut settings = runner.settings().clone();
    if args.branch_id.is_some() {
        settings.branch.pinned_branch_id = args.branch_id;
    }
    if args.parent_branch_id.is_some() {
        settings.branch.parent_branch_id = args.parent_branch_id;
    }
    if args.keep_branch {
        settings.branch.delete_branch = false;
    }
    if let Some(path) = args.control_file {
        settings.paths.control_file = path;
    }

    let http = match ReqwestClient::new() {
        Ok(client) => client,
        Err(e) => CliError::HttpClient(e.to_string()).exit(),
    };

    let control_file = settings.paths.control_file.clone();
    let stack = LocalProxyStack::new(settings, http);
    let mut supervisor = Supervisor::spawn(stack, control_file);

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: failed to install signal handler: {}", e);
            process::exit(1);
        }
    };

    let result = tokio::select! {
        r = supervisor.wait() => r,
        _ = tokio::signal::ctrl_c() => {
            info!("received SIGINT");
            Ok(())
        }
        _ = sigterm.recv() => {
            info!("received SIGTERM");
            Ok(())
        }
    };

    supervisor.cleanup().await;

    if let Err(e) = result {
        CliError::from(e).exit();
    }
}
