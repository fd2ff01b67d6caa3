// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! YAML settings for the study facade.
//!
//! ```yaml
//! matrix_store: /var/lib/studies/matrices
//! locks:
//!   dir: /var/lib/studies/locks
//!   retry_delay_ms: 50
//!   max_attempts: 200
//! formatted: true
//! ```

use crate::error::{Result, StudyError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Overrides the matrix store root
pub const MATRIX_STORE_ENV: &str = "STUDYFS_MATRIX_STORE";

/// Switches to file locks under this directory
pub const LOCK_DIR_ENV: &str = "STUDYFS_LOCK_DIR";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Root directory of the content-addressed matrix store
    #[serde(default = "default_matrix_store")]
    pub matrix_store: PathBuf,

    #[serde(default)]
    pub locks: LockSettings,

    /// Whether `get` formats matrices unless told otherwise
    #[serde(default = "default_formatted")]
    pub formatted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LockSettings {
    /// Lock file directory; in-process locks when absent
    #[serde(default)]
    pub dir: Option<PathBuf>,

    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
}

fn default_matrix_store() -> PathBuf {
    PathBuf::from("matrixstore")
}

fn default_formatted() -> bool {
    true
}

fn default_retry_delay_ms() -> u64 {
    50
}

fn default_max_attempts() -> usize {
    200
}

impl Default for LockSettings {
    fn default() -> Self {
        Self {
            dir: None,
            retry_delay_ms: default_retry_delay_ms(),
            max_attempts: default_max_attempts(),
        }
    }
}

impl LockSettings {
    #[must_use]
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            matrix_store: default_matrix_store(),
            locks: LockSettings::default(),
            formatted: default_formatted(),
        }
    }
}

impl Settings {
    /// Defaults with the matrix store rooted at `root`
    #[must_use]
    pub fn with_store<P: AsRef<Path>>(root: P) -> Self {
        Self {
            matrix_store: root.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        Ok(serde_yaml_ng::from_str(text)?)
    }

    /// Read a YAML settings file, then apply environment overrides
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text =
            std::fs::read_to_string(path).map_err(|err| StudyError::settings_file(path, err))?;
        let settings = Self::from_yaml(&text)?.with_overrides(|name| std::env::var(name).ok());
        diagnostics::log_debug!(
            "Loaded settings from {path}",
            path: path.display().to_string()
        );
        Ok(settings)
    }

    /// Defaults with environment overrides applied
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().with_overrides(|name| std::env::var(name).ok())
    }

    /// Apply `STUDYFS_*` overrides looked up through `lookup`
    #[must_use]
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(root) = lookup(MATRIX_STORE_ENV).filter(|value| !value.is_empty()) {
            self.matrix_store = PathBuf::from(root);
        }
        if let Some(dir) = lookup(LOCK_DIR_ENV).filter(|value| !value.is_empty()) {
            self.locks.dir = Some(PathBuf::from(dir));
        }
        self
    }
}
