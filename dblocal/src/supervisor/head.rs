//! Control-file parsing.
//!
//! The control file uses the git HEAD format: a symbolic reference line
//! `ref: refs/heads/<name>`. The `<name>` part is the logical branch name;
//! anything else (a detached-HEAD hash, a missing file) means there is no
//! logical name.

use std::path::Path;
use tracing::debug;

/// Extract the logical branch name from the control file, if any.
pub fn logical_branch_name(path: &Path) -> Option<String> {
    let contents = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "control file unreadable");
            return None;
        }
    };

    let line = contents.lines().next()?.trim();
    let reference = line.strip_prefix("ref:")?.trim();
    // Strip the "refs/heads/" prefix; branch names may themselves
    // contain slashes.
    let name = reference.splitn(3, '/').last()?;
    if name.is_empty() {
        return None;
    }
    Some(name.to_string())
}
