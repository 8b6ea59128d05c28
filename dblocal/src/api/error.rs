//! Branching API error types.

use super::http::HttpError;
use thiserror::Error;

/// Errors from the branching API client.
///
/// Every variant carries the failing operation so that log lines are
/// diagnosable without a debugger. `NotFound` is split from the other
/// HTTP failures because callers treat a vanished resource as a normal,
/// recoverable condition (re-create) rather than a fault.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The referenced resource does not exist remotely.
    #[error("{operation}: not found ({url})")]
    NotFound {
        /// Operation that was being performed.
        operation: &'static str,
        /// URL that returned 404.
        url: String,
    },

    /// The API answered with a non-2xx, non-404 status.
    #[error("{operation}: HTTP {code} from {url}")]
    Status {
        /// Operation that was being performed.
        operation: &'static str,
        /// HTTP status code.
        code: u16,
        /// Requested URL.
        url: String,
    },

    /// The API was unreachable.
    #[error("{operation}: {detail}")]
    Transport {
        /// Operation that was being performed.
        operation: &'static str,
        /// Transport failure description.
        detail: String,
    },

    /// The API answered successfully but the payload was not usable.
    #[error("{operation}: unexpected response: {detail}")]
    Unexpected {
        /// Operation that was being performed.
        operation: &'static str,
        /// What was wrong with the payload.
        detail: String,
    },
}

impl ApiError {
    /// Attach an operation name to a transport-level error.
    pub(crate) fn from_http(operation: &'static str, err: HttpError) -> Self {
        match err {
            HttpError::Status { code: 404, url } => Self::NotFound { operation, url },
            HttpError::Status { code, url } => Self::Status {
                operation,
                code,
                url,
            },
            HttpError::Transport(detail) => Self::Transport { operation, detail },
        }
    }

    /// Whether the error is a vanished-resource condition.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_http_maps_404_to_not_found() {
        let err = ApiError::from_http(
            "verify branch",
            HttpError::Status {
                code: 404,
                url: "http://api/branches/br-1".to_string(),
            },
        );
        assert!(err.is_not_found());
        assert!(err.to_string().contains("verify branch"));
    }

    #[test]
    fn test_from_http_keeps_other_statuses() {
        let err = ApiError::from_http(
            "create branch",
            HttpError::Status {
                code: 500,
                url: "http://api/branches".to_string(),
            },
        );
        assert!(!err.is_not_found());
        assert!(err.to_string().contains("500"));
    }

    #[test]
    fn test_transport_carries_operation() {
        let err = ApiError::from_http(
            "list branches",
            HttpError::Transport("connection refused".to_string()),
        );
        assert!(err.to_string().contains("list branches"));
        assert!(err.to_string().contains("connection refused"));
    }
}
