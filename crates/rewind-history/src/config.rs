#![forbid(unsafe_code)]

//! History configuration.
//!
//! ```toml
//! # rewind-history.toml
//! merge_window_ms = 1000
//! max_depth = 1000
//! ```
//!
//! ```rust,ignore
//! let config = HistoryConfig::from_toml_file("rewind-history.toml")?;
//! let history = SharedHistory::with_config(&config);
//! let attachment = attach(&editor, &history, config.merge_window());
//! ```
//!
//! Omitted keys keep their defaults.

#[cfg(feature = "history-config")]
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default coalescing window.
pub const DEFAULT_MERGE_WINDOW_MS: u64 = 1000;

/// Default undo stack cap.
pub const DEFAULT_MAX_DEPTH: usize = 1000;

/// Tunables for a history state and its attachments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Material edits closer together than this coalesce into one entry.
    /// Zero disables timed coalescing.
    pub merge_window_ms: u64,
    /// Maximum undo stack length; the oldest entry is dropped on overflow.
    pub max_depth: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            merge_window_ms: DEFAULT_MERGE_WINDOW_MS,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl HistoryConfig {
    #[must_use]
    pub fn new(merge_window_ms: u64, max_depth: usize) -> Self {
        Self {
            merge_window_ms,
            max_depth,
        }
    }

    #[must_use]
    pub fn with_merge_window_ms(mut self, ms: u64) -> Self {
        self.merge_window_ms = ms;
        self
    }

    #[must_use]
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Merge window as a [`Duration`].
    #[must_use]
    pub fn merge_window(&self) -> Duration {
        Duration::from_millis(self.merge_window_ms)
    }

    /// Check parameters. An empty list means the config is usable.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.max_depth == 0 {
            errors.push("max_depth must be > 0".into());
        }
        errors
    }

    /// Load from a TOML string.
    #[cfg(feature = "history-config")]
    pub fn from_toml_str(s: &str) -> Result<Self, HistoryConfigError> {
        let config: Self = toml::from_str(s).map_err(HistoryConfigError::Toml)?;
        config.checked()
    }

    /// Load from a TOML file on disk.
    #[cfg(feature = "history-config")]
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, HistoryConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(HistoryConfigError::Io)?;
        Self::from_toml_str(&content)
    }

    /// Load from a JSON string.
    #[cfg(feature = "history-config")]
    pub fn from_json_str(s: &str) -> Result<Self, HistoryConfigError> {
        let config: Self = serde_json::from_str(s).map_err(HistoryConfigError::Json)?;
        config.checked()
    }

    /// Load from a JSON file on disk.
    #[cfg(feature = "history-config")]
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, HistoryConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(HistoryConfigError::Io)?;
        Self::from_json_str(&content)
    }

    #[cfg(feature = "history-config")]
    fn checked(self) -> Result<Self, HistoryConfigError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(HistoryConfigError::Validation(errors))
        }
    }
}

/// Errors that can occur when loading a history configuration.
#[derive(Debug)]
pub enum HistoryConfigError {
    /// I/O error reading a file.
    Io(std::io::Error),
    /// TOML parse error.
    #[cfg(feature = "history-config")]
    Toml(toml::de::Error),
    /// JSON parse error.
    #[cfg(feature = "history-config")]
    Json(serde_json::Error),
    /// Validation errors.
    Validation(Vec<String>),
}

impl std::fmt::Display for HistoryConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            #[cfg(feature = "history-config")]
            Self::Toml(e) => write!(f, "TOML parse error: {e}"),
            #[cfg(feature = "history-config")]
            Self::Json(e) => write!(f, "JSON parse error: {e}"),
            Self::Validation(errors) => write!(f, "validation errors: {}", errors.join("; ")),
        }
    }
}

impl std::error::Error for HistoryConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            #[cfg(feature = "history-config")]
            Self::Toml(e) => Some(e),
            #[cfg(feature = "history-config")]
            Self::Json(e) => Some(e),
            Self::Validation(_) => None,
        }
    }
}
