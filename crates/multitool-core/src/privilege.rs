//! Privilege probe used to gate admin-only actions.
//!
//! The registry asks a `PrivilegeProbe` rather than the OS directly so tests
//! can substitute `FixedPrivilege` without touching the environment.

pub trait PrivilegeProbe: Send + Sync {
    /// Whether the current process may run admin-only actions.
    fn is_elevated(&self) -> bool;
}

/// Native check: effective UID 0 on Unix, the `MULTI_TOOL_IS_ADMIN`
/// environment flag everywhere else.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsPrivilegeProbe;

impl PrivilegeProbe for OsPrivilegeProbe {
    #[cfg(unix)]
    fn is_elevated(&self) -> bool {
        // SAFETY: geteuid has no preconditions and cannot fail.
        unsafe { libc::geteuid() == 0 }
    }

    #[cfg(not(unix))]
    fn is_elevated(&self) -> bool {
        env_override(std::env::var(crate::paths::ADMIN_ENV).ok().as_deref())
    }
}

/// Interpret the admin override flag.
pub fn env_override(value: Option<&str>) -> bool {
    matches!(value, Some("1" | "true" | "True"))
}

/// A probe with a fixed answer.
#[derive(Debug, Clone, Copy)]
pub struct FixedPrivilege(pub bool);

impl PrivilegeProbe for FixedPrivilege {
    fn is_elevated(&self) -> bool {
        self.0
    }
}
