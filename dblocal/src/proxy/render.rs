//! Configuration rendering for the pooler and proxy processes.
//!
//! Both configs start from an on-disk template. The pooler template is
//! split at its `[pgbouncer]` section and per-database entries are
//! injected above it; the proxy template carries an explicit marker
//! comment where backend routing rules are spliced in.

use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

use crate::api::ConnectionInfo;

/// Port the pooler listens on internally. The templates bind the public
/// listener to 5432 and the pooler is rewritten to sit behind it here.
pub const INTERNAL_POOLER_PORT: u16 = 6432;

/// Marker line in the proxy template where backend rules are injected.
const PROXY_RULES_MARKER: &str = "# Backend selection rules will be added here";

/// Config rendering errors.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The template file does not exist or cannot be read.
    #[error("template {path} unavailable: {source}")]
    MissingTemplate {
        /// Template path.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// The template lacks the section or marker the renderer splices at.
    #[error("template missing expected section: {0}")]
    MissingSection(&'static str),
}

/// Read a template file.
pub fn load_template(path: &Path) -> Result<String, RenderError> {
    fs::read_to_string(path).map_err(|source| RenderError::MissingTemplate {
        path: path.display().to_string(),
        source,
    })
}

/// Render the pooler configuration for the given databases.
///
/// One `[databases]` entry is emitted per descriptor, plus a wildcard `*`
/// entry pointing at the first database so unknown names still connect.
/// The template's public `listen_port = 5432` is rewritten to the internal
/// pooler port.
pub fn render_pooler_config(
    databases: &[ConnectionInfo],
    template: &str,
    app_name: &str,
) -> Result<String, RenderError> {
    let (head, tail) = template
        .split_once("[pgbouncer]")
        .ok_or(RenderError::MissingSection("[pgbouncer]"))?;

    let mut entries = String::new();
    for db in databases {
        entries.push_str(&db_entry(&db.database, db, app_name));
    }
    if let Some(first) = databases.first() {
        entries.push_str(&db_entry("*", first, app_name));
    }

    let rendered = format!("{}{}[pgbouncer]{}", head, entries, tail).replace(
        "listen_port = 5432",
        &format!("listen_port = {}", INTERNAL_POOLER_PORT),
    );

    debug!(databases = databases.len(), "pooler config rendered");
    Ok(rendered)
}

fn db_entry(key: &str, db: &ConnectionInfo, app_name: &str) -> String {
    format!(
        "{} = host={} port=5432 dbname={} user={} password={} application_name={}\n",
        key, db.host, db.database, db.user, db.password, app_name
    )
}

/// Render the proxy configuration for the given databases.
///
/// Routing rules for the first database are spliced in at the marker
/// comment: the upstream server line, the connection-string header the
/// remote proxy expects, and Host/User-Agent rewrites.
pub fn render_proxy_config(
    databases: &[ConnectionInfo],
    template: &str,
    app_name: &str,
    user_agent_suffix: &str,
) -> Result<String, RenderError> {
    let (head, tail) = template
        .split_once(PROXY_RULES_MARKER)
        .ok_or(RenderError::MissingSection("backend rules marker"))?;

    let first = databases
        .first()
        .ok_or(RenderError::MissingSection("no databases to route"))?;

    let connection_string = format!(
        "postgresql://{}:{}@{}/{}?sslmode=require&application_name={}",
        first.user, first.password, first.host, first.database, app_name
    );

    let mut rules = String::new();
    rules.push_str(&format!(
        "    server ws_server_{db} {host}:443 ssl verify none sni str({host}) check\n",
        db = first.database,
        host = first.host
    ));
    rules.push_str(&format!(
        "    http-request set-header Neon-Connection-String {}\n",
        connection_string
    ));
    rules.push_str(&format!(
        "    http-request set-header Host {}\n",
        first.host
    ));
    rules.push_str(&format!(
        "    http-request set-header User-Agent %[req.hdr(User-Agent)]{}\n",
        user_agent_suffix
    ));

    debug!(database = %first.database, "proxy config rendered");
    Ok(format!("{}{}{}{}", head, PROXY_RULES_MARKER, rules, tail))
}
