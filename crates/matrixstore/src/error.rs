// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::path::{Path, PathBuf};

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Identifiers are lowercase hex digests; anything else never names a file
    #[error("Invalid matrix id '{0}'")]
    InvalidId(String),

    #[error("Corrupt matrix file {} at line {line}: {reason}", path.display())]
    Corrupt {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Tree(#[from] studyfs::Error),

    #[error("Temporary file error: {0}")]
    Persist(#[from] tempfile::PersistError),
}

impl StoreError {
    pub fn corrupt<P: AsRef<Path>, S: Into<String>>(path: P, line: usize, reason: S) -> Self {
        StoreError::Corrupt {
            path: path.as_ref().to_path_buf(),
            line,
            reason: reason.into(),
        }
    }
}

impl From<StoreError> for studyfs::Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Io(err) => studyfs::Error::Io(err),
            StoreError::Tree(err) => err,
            other => studyfs::Error::matrix_store(other.to_string()),
        }
    }
}
