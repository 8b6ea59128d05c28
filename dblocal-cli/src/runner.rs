//! CLI runner for common setup.
//!
//! Encapsulates settings loading and logging initialization so `main`
//! only deals with wiring the supervisor together.

use crate::error::CliError;
use dblocal::logging::{self, LogOptions, LoggingGuard};
use dblocal::settings::Settings;
use tracing::info;

/// Runner that manages CLI lifecycle.
pub struct CliRunner {
    /// Logging guard - keeps logging active while runner exists
    #[allow(dead_code)]
    logging_guard: LoggingGuard,
    /// Validated settings from the environment
    settings: Settings,
}

impl CliRunner {
    /// Create a new CLI runner with optional debug logging.
    ///
    /// Loads settings from the environment and initializes file plus
    /// stdout logging. Container logs are collected from stdout, so it
    /// stays enabled.
    pub fn with_debug(debug_mode: bool) -> Result<Self, CliError> {
        let settings = Settings::from_env()?;

        let options = LogOptions {
            debug: debug_mode,
            ..LogOptions::default()
        };
        let logging_guard =
            logging::init(&options).map_err(|e| CliError::LoggingInit(e.to_string()))?;

        Ok(Self {
            logging_guard,
            settings,
        })
    }

    /// Get the loaded settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Log startup information.
    pub fn log_startup(&self) {
        info!("dblocal v{}", dblocal::VERSION);
        info!(
            project = %self.settings.api.project_id,
            client = ?self.settings.branch.client,
            delete_branch = self.settings.branch.delete_branch,
            "supervisor starting"
        );
    }
}
