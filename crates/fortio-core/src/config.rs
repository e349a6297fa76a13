//! Runtime configuration.
//!
//! Read from the environment on first use and cached for the life of the
//! process:
//! - `FORTIO_SCRATCH_DIR`: directory for `STATUS='SCRATCH'` files
//!   (default: the system temporary directory).
//! - `FORTIO_LIST_SEPARATORS`: insert one blank between list-directed output
//!   items (default: on).
//! - `FORTIO_CARRIAGE_CONTROL`: interpret the first character of every
//!   formatted output record as a carriage-control code (default: off).

use std::path::PathBuf;
use std::sync::OnceLock;

/// Process-wide I/O settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub scratch_dir: PathBuf,
    pub list_separators: bool,
    pub carriage_control: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            scratch_dir: std::env::temp_dir(),
            list_separators: true,
            carriage_control: false,
        }
    }
}

impl RuntimeConfig {
    /// Build from the current environment, ignoring the cache.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (used by tests).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            scratch_dir: lookup("FORTIO_SCRATCH_DIR")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.scratch_dir),
            list_separators: lookup("FORTIO_LIST_SEPARATORS")
                .and_then(|v| parse_flag(&v))
                .unwrap_or(defaults.list_separators),
            carriage_control: lookup("FORTIO_CARRIAGE_CONTROL")
                .and_then(|v| parse_flag(&v))
                .unwrap_or(defaults.carriage_control),
        }
    }
}

/// Loose boolean parsing; `None` for unrecognised values.
#[must_use]
pub fn parse_flag(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

static GLOBAL_CONFIG: OnceLock<RuntimeConfig> = OnceLock::new();

/// The cached process configuration (reads the environment on first call).
#[must_use]
pub fn runtime_config() -> &'static RuntimeConfig {
    GLOBAL_CONFIG.get_or_init(RuntimeConfig::from_env)
}
