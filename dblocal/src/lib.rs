//! dblocal - local proxies for remote database branches
//!
//! This library implements a sidecar supervisor that keeps a connection
//! pooler and a TCP/HTTP proxy running against a remote database branch.
//! The branch is resolved dynamically from the developer's current
//! source-control branch: when the checkout changes, the supervisor
//! re-resolves (or creates) the matching remote branch, re-renders the
//! proxy configuration and restarts both managed processes.
//!
//! # Architecture
//!
//! ```text
//! control file ──► ControlFileWatcher ──► ReloadSignal
//!                                              │
//!                                              ▼
//!                 Supervisor ──► reloader loop ──► ProxyStack
//!                                                     │
//!                              Reconciler ◄───────────┤
//!                                  │                  │
//!                              BranchApi          pooler + proxy
//!                                  │               processes
//!                           branching service
//! ```
//!
//! The [`supervisor`] module owns the concurrency model (edge-triggered
//! reload signalling, shutdown latch, reload serialization); [`reconcile`]
//! maps logical branch names to live remote branches; [`state`] persists
//! that mapping; [`api`] is the typed client for the branching service;
//! [`proxy`] renders configuration and manages the child processes.

pub mod api;
pub mod logging;
pub mod proxy;
pub mod reconcile;
pub mod settings;
pub mod state;
pub mod supervisor;

/// Version of the dblocal library and CLI, injected from `Cargo.toml`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
