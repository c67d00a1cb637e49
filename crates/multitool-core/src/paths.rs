use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Settings file looked up from the working directory upward.
pub const CONFIG_FILE: &str = "multitool.yaml";

/// Name of the lock artifact shared by every orchestrator run on the host.
pub const DEFAULT_LOCK_NAME: &str = "multi_tool_orchestrator.lock";

/// Admin override consulted on platforms without an effective-UID check.
pub const ADMIN_ENV: &str = "MULTI_TOOL_IS_ADMIN";

const LOCK_SUFFIX: &str = "lock";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

/// Directory that independent processes agree on for the lock artifact.
pub fn default_lock_dir() -> PathBuf {
    std::env::temp_dir()
}

pub fn default_lock_path() -> PathBuf {
    default_lock_dir().join(DEFAULT_LOCK_NAME)
}

/// The file the flock backend opens: `path` itself if it already ends in
/// `.lock`, otherwise `path` with `.lock` appended.
pub fn lock_file_for(path: &Path) -> PathBuf {
    if path.extension().is_some_and(|e| e == LOCK_SUFFIX) {
        return path.to_path_buf();
    }
    let mut name = path.as_os_str().to_os_string();
    name.push(".");
    name.push(LOCK_SUFFIX);
    PathBuf::from(name)
}
