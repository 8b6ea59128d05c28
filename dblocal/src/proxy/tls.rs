//! Self-signed TLS material for the pooler's client-facing listener.
//!
//! Certificates are generated once with the system `openssl` binary and
//! reused across restarts. Local clients connect with verification off,
//! so a throwaway self-signed pair is all that is needed.

use std::path::Path;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};

/// TLS bootstrap errors.
#[derive(Debug, Error)]
pub enum TlsError {
    /// Spawning or waiting on `openssl` failed.
    #[error("failed to run openssl {step}: {source}")]
    Spawn {
        /// Which generation step failed.
        step: &'static str,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// `openssl` exited non-zero.
    #[error("openssl {step} exited with {status}")]
    Failed {
        /// Which generation step failed.
        step: &'static str,
        /// Exit status.
        status: std::process::ExitStatus,
    },
    /// Adjusting file permissions failed.
    #[error("failed to set permissions on {path}: {source}")]
    Permissions {
        /// Affected file.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Ensure a certificate/key pair exists at the given paths, generating a
/// self-signed one when either file is missing.
pub async fn ensure_certificates(cert: &Path, key: &Path) -> Result<(), TlsError> {
    if cert.exists() && key.exists() {
        debug!(cert = %cert.display(), "TLS material already present");
        return Ok(());
    }

    info!(cert = %cert.display(), key = %key.display(), "generating self-signed TLS certificate");

    let csr = cert.with_extension("csr");

    run_openssl("genrsa", &["genrsa", "-out", &path_str(key), "2048"]).await?;
    run_openssl(
        "req",
        &[
            "req",
            "-new",
            "-key",
            &path_str(key),
            "-out",
            &path_str(&csr),
            "-subj",
            "/CN=localhost",
        ],
    )
    .await?;
    run_openssl(
        "x509",
        &[
            "x509",
            "-req",
            "-days",
            "365",
            "-in",
            &path_str(&csr),
            "-signkey",
            &path_str(key),
            "-out",
            &path_str(cert),
        ],
    )
    .await?;

    set_mode(key, 0o600)?;
    set_mode(cert, 0o644)?;

    // The CSR is an intermediate artifact.
    let _ = std::fs::remove_file(&csr);

    Ok(())
}

fn path_str(path: &Path) -> String {
    path.display().to_string()
}

async fn run_openssl(step: &'static str, args: &[&str]) -> Result<(), TlsError> {
    let status = Command::new("openssl")
        .args(args)
        .status()
        .await
        .map_err(|source| TlsError::Spawn { step, source })?;
    if !status.success() {
        return Err(TlsError::Failed { step, status });
    }
    Ok(())
}

fn set_mode(path: &Path, mode: u32) -> Result<(), TlsError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).map_err(|source| {
        TlsError::Permissions {
            path: path.display().to_string(),
            source,
        }
    })
}
