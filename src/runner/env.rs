use std::env;

pub const DEBUG_VAR: &str = "TFWRAP_DEBUG";
pub const SKIP_EXEC_VAR: &str = "TFWRAP_SKIP_EXEC";
pub const NO_CLEANUP_VAR: &str = "TFWRAP_NO_CLEANUP";
pub const BINARY_VAR: &str = "TFWRAP_BINARY";

pub const DEFAULT_BINARY: &str = "terraform";

/// Process-wide switches, read once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Diagnostic logging on stderr.
    pub debug: bool,
    /// Skip running the wrapped binary and report success.
    pub skip_exec: bool,
    /// Leave the generated file in place after the run.
    pub no_cleanup: bool,
    /// Wrapped executable, looked up on `PATH` when not a path.
    pub binary: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug: false,
            skip_exec: false,
            no_cleanup: false,
            binary: DEFAULT_BINARY.to_string(),
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build settings from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let flag = |key: &str| lookup(key).as_deref() == Some("true");

        let binary = lookup(BINARY_VAR)
            .filter(|b| !b.is_empty())
            .unwrap_or_else(|| DEFAULT_BINARY.to_string());

        Self {
            debug: flag(DEBUG_VAR),
            skip_exec: flag(SKIP_EXEC_VAR),
            no_cleanup: flag(NO_CLEANUP_VAR),
            binary,
        }
    }
}
