// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use matrixstore::StoreError;
use std::path::{Path, PathBuf};

pub type Result<T> = std::result::Result<T, StudyError>;

#[derive(Debug, thiserror::Error)]
pub enum StudyError {
    #[error(transparent)]
    Tree(#[from] studyfs::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Cannot read settings {}: {source}", path.display())]
    SettingsFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid settings: {0}")]
    Settings(#[from] serde_yaml_ng::Error),

    /// The path names a node that is not an input series
    #[error("{path} is not a matrix node ({kind})")]
    NotAMatrix { path: String, kind: String },
}

impl StudyError {
    pub fn settings_file<P: AsRef<Path>>(path: P, source: std::io::Error) -> Self {
        StudyError::SettingsFile {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn not_a_matrix<S: Into<String>>(path: S, kind: &str) -> Self {
        StudyError::NotAMatrix {
            path: path.into(),
            kind: kind.to_string(),
        }
    }
}
