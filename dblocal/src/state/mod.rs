//! Persistent mapping from logical branch names to remote branch ids.
//!
//! The state file is a JSON object keyed by logical name. Newer writers
//! store a `{"branch_id": ...}` handle per key; older deployments stored a
//! list of full connection records. Both shapes load, and legacy entries
//! are normalized to handles the first time the file is rewritten.
//!
//! Loading never fails: a missing or corrupt file yields an empty map so a
//! bad state file degrades to re-creating branches rather than refusing to
//! start.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Key used when no logical branch name is available, e.g. when the
/// control file is missing.
pub const DETACHED_KEY: &str = "None";

/// Logical branch name to persisted entry.
pub type StateMap = BTreeMap<String, BranchEntry>;

/// One persisted entry of the state file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BranchEntry {
    /// Current format: just the remote branch id.
    Handle {
        /// Remote branch id.
        branch_id: String,
    },
    /// Pre-handle format: a list of per-database connection records.
    Legacy(Vec<LegacyConnection>),
}

/// One record of a legacy list entry. Only `branch_id` matters; the rest
/// is carried opaquely so un-normalizable entries round-trip unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyConnection {
    /// Remote branch id, when the record has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_id: Option<String>,
    /// Remaining fields of the record, preserved verbatim.
    #[serde(flatten)]
    pub rest: serde_json::Map<String, serde_json::Value>,
}

/// Extract the remote branch id from an entry of either format.
pub fn entry_branch_id(entry: &BranchEntry) -> Option<&str> {
    match entry {
        BranchEntry::Handle { branch_id } => Some(branch_id),
        BranchEntry::Legacy(records) => records.first().and_then(|r| r.branch_id.as_deref()),
    }
}

/// Loads and saves the branch state file.
pub struct BranchStateStore {
    path: PathBuf,
}

impl BranchStateStore {
    /// Create a store for the given state file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the state map, normalizing legacy entries to handles.
    ///
    /// Missing or unreadable files yield an empty map with a warning.
    pub fn load(&self) -> StateMap {
        let raw = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no state file, starting empty");
                return StateMap::new();
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to read state file");
                return StateMap::new();
            }
        };

        let parsed: StateMap = match serde_json::from_slice(&raw) {
            Ok(map) => map,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "corrupt state file, starting empty");
                return StateMap::new();
            }
        };

        parsed
            .into_iter()
            .map(|(name, entry)| (name, normalize(entry)))
            .collect()
    }

    /// Write the state map back to disk, creating parent directories.
    ///
    /// Persistence is best-effort: failures are logged, never fatal, since
    /// losing the file only costs an extra branch on the next run.
    pub fn save(&self, state: &StateMap) {
        if let Some(parent) = self.path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                warn!(path = %parent.display(), error = %e, "failed to create state directory");
                return;
            }
        }
        let json = match serde_json::to_string_pretty(state) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "failed to serialize state");
                return;
            }
        };
        if let Err(e) = fs::write(&self.path, json) {
            warn!(path = %self.path.display(), error = %e, "failed to write state file");
        } else {
            debug!(path = %self.path.display(), entries = state.len(), "state file written");
        }
    }
}

/// Collapse a legacy list entry to a handle when its first record carries
/// a branch id. Entries without one are kept as-is so nothing is lost.
fn normalize(entry: BranchEntry) -> BranchEntry {
    match &entry {
        BranchEntry::Legacy(records) => match records.first().and_then(|r| r.branch_id.clone()) {
            Some(branch_id) => BranchEntry::Handle { branch_id },
            None => {
                warn!("legacy state entry without branch_id, keeping verbatim");
                entry
            }
        },
        BranchEntry::Handle { .. } => entry,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> BranchStateStore {
        BranchStateStore::new(dir.path().join("branches.json"))
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        assert!(store_in(&dir).load().is_empty());
    }

    #[test]
    fn test_load_corrupt_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), b"not json at all").unwrap();
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_save_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let store = BranchStateStore::new(dir.path().join("nested/deep/branches.json"));
        let mut state = StateMap::new();
        state.insert(
            "main".to_string(),
            BranchEntry::Handle {
                branch_id: "br-1".to_string(),
            },
        );
        store.save(&state);
        assert_eq!(store.load(), state);
    }

    #[test]
    fn test_legacy_list_entry_normalizes_to_handle() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::write(
            store.path(),
            r#"{"feature":[{"branch_id":"br-9","host":"old.db","database":"appdb"}]}"#,
        )
        .unwrap();

        let state = store.load();
        assert_eq!(
            state.get("feature"),
            Some(&BranchEntry::Handle {
                branch_id: "br-9".to_string()
            })
        );
    }

    #[test]
    fn test_legacy_entry_without_branch_id_round_trips() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), r#"{"odd":[{"host":"old.db"}]}"#).unwrap();

        let state = store.load();
        assert!(matches!(state.get("odd"), Some(BranchEntry::Legacy(_))));
        assert_eq!(entry_branch_id(state.get("odd").unwrap()), None);

        store.save(&state);
        let reloaded = store.load();
        assert_eq!(reloaded, state);
    }

    #[test]
    fn test_save_then_load_is_identity_on_normalized_state() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let mut state = StateMap::new();
        state.insert(
            "main".to_string(),
            BranchEntry::Handle {
                branch_id: "br-1".to_string(),
            },
        );
        state.insert(
            DETACHED_KEY.to_string(),
            BranchEntry::Handle {
                branch_id: "br-2".to_string(),
            },
        );
        store.save(&state);
        assert_eq!(store.load(), state);
    }

    #[test]
    fn test_entry_branch_id_for_both_shapes() {
        let handle = BranchEntry::Handle {
            branch_id: "br-1".to_string(),
        };
        assert_eq!(entry_branch_id(&handle), Some("br-1"));

        let legacy = BranchEntry::Legacy(vec![LegacyConnection {
            branch_id: Some("br-2".to_string()),
            rest: serde_json::Map::new(),
        }]);
        assert_eq!(entry_branch_id(&legacy), Some("br-2"));
    }
}
