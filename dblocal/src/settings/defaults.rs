//! Default values and constants for supervisor settings.

use std::path::PathBuf;

use super::PathSettings;

/// Default base URL of the branching API.
pub const DEFAULT_API_URL: &str = "https://console.neon.tech/api/v2";

/// Control file whose content names the current logical branch.
pub const DEFAULT_CONTROL_FILE: &str = "/tmp/.git/HEAD";

/// Durable mapping from logical branch names to remote branch ids.
pub const DEFAULT_STATE_FILE: &str = "/tmp/.dblocal/branches.json";

/// Template for the connection pooler configuration.
pub const DEFAULT_POOLER_TEMPLATE: &str = "/app/templates/pgbouncer.ini.tmpl";

/// Template for the proxy configuration.
pub const DEFAULT_PROXY_TEMPLATE: &str = "/app/templates/haproxy.cfg.tmpl";

/// Rendered pooler configuration consumed by the pooler process.
pub const DEFAULT_POOLER_CONFIG: &str = "/etc/pgbouncer/pgbouncer.ini";

/// Rendered proxy configuration consumed by the proxy process.
pub const DEFAULT_PROXY_CONFIG: &str = "/tmp/haproxy.cfg";

/// Append-only log for pooler stdout/stderr.
pub const DEFAULT_POOLER_LOG: &str = "/var/log/pgbouncer.log";

/// Append-only log for proxy stdout/stderr.
pub const DEFAULT_PROXY_LOG: &str = "/var/log/haproxy.log";

/// Self-signed TLS certificate presented by the pooler.
pub const DEFAULT_TLS_CERT: &str = "/etc/pgbouncer/server.crt";

/// Private key for the self-signed TLS certificate.
pub const DEFAULT_TLS_KEY: &str = "/etc/pgbouncer/server.key";

/// Pooler binary.
pub const DEFAULT_POOLER_BIN: &str = "/usr/bin/pgbouncer";

/// Proxy binary.
pub const DEFAULT_PROXY_BIN: &str = "haproxy";

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            control_file: PathBuf::from(DEFAULT_CONTROL_FILE),
            state_file: PathBuf::from(DEFAULT_STATE_FILE),
            pooler_template: PathBuf::from(DEFAULT_POOLER_TEMPLATE),
            proxy_template: PathBuf::from(DEFAULT_PROXY_TEMPLATE),
            pooler_config: PathBuf::from(DEFAULT_POOLER_CONFIG),
            proxy_config: PathBuf::from(DEFAULT_PROXY_CONFIG),
            pooler_log: PathBuf::from(DEFAULT_POOLER_LOG),
            proxy_log: PathBuf::from(DEFAULT_PROXY_LOG),
            tls_cert: PathBuf::from(DEFAULT_TLS_CERT),
            tls_key: PathBuf::from(DEFAULT_TLS_KEY),
            pooler_bin: PathBuf::from(DEFAULT_POOLER_BIN),
            proxy_bin: PathBuf::from(DEFAULT_PROXY_BIN),
        }
    }
}
