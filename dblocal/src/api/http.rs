//! HTTP client abstraction for testability.

use std::future::Future;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Transport-level HTTP errors, split so callers can distinguish a
/// missing resource from an unreachable service without parsing
/// error-message text.
#[derive(Debug, Clone)]
pub enum HttpError {
    /// The server answered with a non-2xx status.
    Status {
        /// HTTP status code.
        code: u16,
        /// Requested URL.
        url: String,
    },
    /// The request never produced a response (connect/timeout/body errors).
    Transport(String),
}

impl std::fmt::Display for HttpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Status { code, url } => write!(f, "HTTP {} from {}", code, url),
            Self::Transport(msg) => write!(f, "request failed: {}", msg),
        }
    }
}

impl std::error::Error for HttpError {}

impl HttpError {
    /// Whether this error is an HTTP 404.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { code: 404, .. })
    }
}

/// Trait for asynchronous HTTP operations against the branching API.
///
/// This abstraction allows dependency injection and easier testing by
/// enabling mock HTTP clients in tests. All requests carry a bearer token.
pub trait AsyncHttpClient: Send + Sync {
    /// Performs an HTTP GET request.
    fn get(
        &self,
        url: &str,
        bearer_token: &str,
    ) -> impl Future<Output = Result<Vec<u8>, HttpError>> + Send;

    /// Performs an HTTP POST request with a JSON body.
    fn post_json(
        &self,
        url: &str,
        bearer_token: &str,
        json_body: &str,
    ) -> impl Future<Output = Result<Vec<u8>, HttpError>> + Send;

    /// Performs an HTTP DELETE request.
    fn delete(
        &self,
        url: &str,
        bearer_token: &str,
    ) -> impl Future<Output = Result<Vec<u8>, HttpError>> + Send;
}

/// Default request timeout for branching API calls.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Async HTTP client implementation using reqwest.
#[derive(Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    /// Creates a new client with the default timeout.
    pub fn new() -> Result<Self, HttpError> {
        Self::with_timeout(DEFAULT_TIMEOUT_SECS)
    }

    /// Creates a new client with a custom timeout.
    pub fn with_timeout(timeout_secs: u64) -> Result<Self, HttpError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("dblocal/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| HttpError::Transport(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    async fn read_response(
        url: &str,
        response: reqwest::Response,
    ) -> Result<Vec<u8>, HttpError> {
        let status = response.status();
        if !status.is_success() {
            warn!(url = url, status = status.as_u16(), "HTTP error status");
            return Err(HttpError::Status {
                code: status.as_u16(),
                url: url.to_string(),
            });
        }

        match response.bytes().await {
            Ok(bytes) => {
                trace!(url = url, bytes = bytes.len(), "HTTP response body read");
                Ok(bytes.to_vec())
            }
            Err(e) => Err(HttpError::Transport(format!(
                "failed to read response: {}",
                e
            ))),
        }
    }
}

impl AsyncHttpClient for ReqwestClient {
    async fn get(&self, url: &str, bearer_token: &str) -> Result<Vec<u8>, HttpError> {
        trace!(url = url, "HTTP GET");
        let response = self
            .client
            .get(url)
            .bearer_auth(bearer_token)
            .send()
            .await
            .map_err(|e| HttpError::Transport(e.to_string()))?;
        debug!(url = url, status = response.status().as_u16(), "HTTP response");
        Self::read_response(url, response).await
    }

    async fn post_json(
        &self,
        url: &str,
        bearer_token: &str,
        json_body: &str,
    ) -> Result<Vec<u8>, HttpError> {
        trace!(url = url, "HTTP POST");
        let response = self
            .client
            .post(url)
            .bearer_auth(bearer_token)
            .header("Content-Type", "application/json")
            .body(json_body.to_string())
            .send()
            .await
            .map_err(|e| HttpError::Transport(e.to_string()))?;
        Self::read_response(url, response).await
    }

    async fn delete(&self, url: &str, bearer_token: &str) -> Result<Vec<u8>, HttpError> {
        trace!(url = url, "HTTP DELETE");
        let response = self
            .client
            .delete(url)
            .bearer_auth(bearer_token)
            .send()
            .await
            .map_err(|e| HttpError::Transport(e.to_string()))?;
        Self::read_response(url, response).await
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::sync::Mutex;

    /// One canned route of the mock client.
    struct Route {
        method: &'static str,
        url_fragment: String,
        response: Result<Vec<u8>, HttpError>,
    }

    /// Mock HTTP client routing requests by method and URL fragment.
    ///
    /// Routes are matched first-to-last; a request with no matching route
    /// fails the test loudly via a transport error carrying the URL.
    #[derive(Default)]
    pub struct MockHttpClient {
        routes: Mutex<Vec<Route>>,
        calls: Mutex<Vec<String>>,
    }

    impl MockHttpClient {
        pub fn new() -> Self {
            Self::default()
        }

        /// Register a canned response for requests whose URL contains
        /// `url_fragment`.
        pub fn on(
            self,
            method: &'static str,
            url_fragment: &str,
            response: Result<Vec<u8>, HttpError>,
        ) -> Self {
            self.routes.lock().unwrap().push(Route {
                method,
                url_fragment: url_fragment.to_string(),
                response,
            });
            self
        }

        /// Register a canned JSON response.
        pub fn on_json(self, method: &'static str, url_fragment: &str, body: &str) -> Self {
            self.on(method, url_fragment, Ok(body.as_bytes().to_vec()))
        }

        /// Register an HTTP 404 for the given fragment.
        pub fn on_not_found(self, method: &'static str, url_fragment: &str) -> Self {
            let url = url_fragment.to_string();
            self.on(method, url_fragment, Err(HttpError::Status { code: 404, url }))
        }

        /// All requests issued so far, as `"METHOD url"` strings.
        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn dispatch(&self, method: &'static str, url: &str) -> Result<Vec<u8>, HttpError> {
            self.calls.lock().unwrap().push(format!("{} {}", method, url));
            let routes = self.routes.lock().unwrap();
            for route in routes.iter() {
                if route.method == method && url.contains(&route.url_fragment) {
                    return route.response.clone();
                }
            }
            Err(HttpError::Transport(format!(
                "no mock route for {} {}",
                method, url
            )))
        }
    }

    impl AsyncHttpClient for MockHttpClient {
        async fn get(&self, url: &str, _bearer_token: &str) -> Result<Vec<u8>, HttpError> {
            self.dispatch("GET", url)
        }

        async fn post_json(
            &self,
            url: &str,
            _bearer_token: &str,
            _json_body: &str,
        ) -> Result<Vec<u8>, HttpError> {
            self.dispatch("POST", url)
        }

        async fn delete(&self, url: &str, _bearer_token: &str) -> Result<Vec<u8>, HttpError> {
            self.dispatch("DELETE", url)
        }
    }

    #[test]
    fn test_not_found_detection() {
        let err = HttpError::Status {
            code: 404,
            url: "http://example.com/x".to_string(),
        };
        assert!(err.is_not_found());

        let err = HttpError::Status {
            code: 500,
            url: "http://example.com/x".to_string(),
        };
        assert!(!err.is_not_found());
        assert!(!HttpError::Transport("boom".to_string()).is_not_found());
    }

    #[tokio::test]
    async fn test_mock_routes_by_method_and_fragment() {
        let mock = MockHttpClient::new()
            .on_json("GET", "/branches", r#"{"branches":[]}"#)
            .on_not_found("DELETE", "/branches/br-1");

        let body = mock.get("http://api/projects/p/branches", "k").await.unwrap();
        assert_eq!(body, br#"{"branches":[]}"#.to_vec());

        let err = mock
            .delete("http://api/projects/p/branches/br-1", "k")
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        assert_eq!(mock.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_mock_unrouted_request_is_transport_error() {
        let mock = MockHttpClient::new();
        let err = mock.get("http://api/unrouted", "k").await.unwrap_err();
        assert!(matches!(err, HttpError::Transport(_)));
    }
}
