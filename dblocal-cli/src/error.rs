//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use dblocal::proxy::StackError;
use dblocal::settings::SettingsError;
use std::fmt;
use std::process;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration error
    Config(SettingsError),
    /// Failed to create HTTP client
    HttpClient(String),
    /// The proxy stack could not be brought up
    Startup(StackError),
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        // Print additional help for specific errors
        match self {
            CliError::Config(_) => {
                eprintln!();
                eprintln!("Required environment:");
                eprintln!("  DBLOCAL_API_KEY     API key for the branching service");
                eprintln!("  DBLOCAL_PROJECT_ID  Project that owns the branches");
            }
            CliError::Startup(StackError::Api(_)) => {
                eprintln!();
                eprintln!("Branch resolution failed. Make sure:");
                eprintln!("  1. The API key has access to the project");
                eprintln!("  2. The project id is correct");
                eprintln!("  3. The API endpoint is reachable from this container");
            }
            _ => {}
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(e) => write!(f, "Configuration error: {}", e),
            CliError::HttpClient(msg) => write!(f, "Failed to create HTTP client: {}", msg),
            CliError::Startup(e) => write!(f, "Failed to start proxy stack: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(e) => Some(e),
            CliError::Startup(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SettingsError> for CliError {
    fn from(e: SettingsError) -> Self {
        CliError::Config(e)
    }
}

impl From<StackError> for CliError {
    fn from(e: StackError) -> Self {
        CliError::Startup(e)
    }
}
