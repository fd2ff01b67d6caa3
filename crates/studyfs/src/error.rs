// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::path::{Path, PathBuf};

pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while resolving, reading or writing study tree nodes
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A path segment or a physical file has no counterpart in the tree
    #[error("{0}")]
    ChildNotFound(String),

    /// Path segments were left over at a node unable to consume them
    #[error("{node} has no children, remaining url: {}", remaining.join("/"))]
    Resolution { node: String, remaining: Vec<String> },

    #[error("Cannot parse {node} at {}: {reason}", path.display())]
    IniParse {
        node: String,
        path: PathBuf,
        reason: String,
    },

    #[error("{0}")]
    Denormalization(String),

    /// First violation reported by `check_errors(.., raising = true)`
    #[error("{0}")]
    Validation(String),

    /// Children selected by a multi-name segment have different kinds
    #[error("Filter selection has different classes: {0}")]
    Filter(String),

    #[error("Failed to parse simulation {}: {reason}", path.display())]
    SimulationParsing { path: PathBuf, reason: String },

    #[error("Failed to parse xpansion output {}: {reason}", path.display())]
    XpansionParsing { path: PathBuf, reason: String },

    #[error("Invalid data for {node}: {reason}")]
    InvalidData { node: String, reason: String },

    /// Writes are refused inside archived output runs
    #[error("Cannot modify {} inside archive {}", path.display(), archive.display())]
    Archived { path: PathBuf, archive: PathBuf },

    #[error("Matrix store error: {0}")]
    MatrixStore(String),

    #[error("Lock {name} unavailable: {reason}")]
    Lock { name: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

impl Error {
    pub fn child_not_found<S: Into<String>>(message: S) -> Self {
        Error::ChildNotFound(message.into())
    }

    /// Missing child `name` below a container of kind `kind`
    pub fn not_a_child(name: &str, kind: &str) -> Self {
        Error::ChildNotFound(format!("'{name}' not a child of {kind}"))
    }

    pub fn resolution(node: &str, remaining: &[String]) -> Self {
        Error::Resolution {
            node: node.to_string(),
            remaining: remaining.to_vec(),
        }
    }

    pub fn ini_parse<P: AsRef<Path>, S: Into<String>>(node: &str, path: P, reason: S) -> Self {
        Error::IniParse {
            node: node.to_string(),
            path: path.as_ref().to_path_buf(),
            reason: reason.into(),
        }
    }

    pub fn invalid_data<S: Into<String>>(node: &str, reason: S) -> Self {
        Error::InvalidData {
            node: node.to_string(),
            reason: reason.into(),
        }
    }

    pub fn archived<P: AsRef<Path>, A: AsRef<Path>>(path: P, archive: A) -> Self {
        Error::Archived {
            path: path.as_ref().to_path_buf(),
            archive: archive.as_ref().to_path_buf(),
        }
    }

    pub fn simulation_parsing<P: AsRef<Path>, S: Into<String>>(path: P, reason: S) -> Self {
        Error::SimulationParsing {
            path: path.as_ref().to_path_buf(),
            reason: reason.into(),
        }
    }

    pub fn xpansion_parsing<P: AsRef<Path>, S: Into<String>>(path: P, reason: S) -> Self {
        Error::XpansionParsing {
            path: path.as_ref().to_path_buf(),
            reason: reason.into(),
        }
    }

    pub fn matrix_store<S: Into<String>>(message: S) -> Self {
        Error::MatrixStore(message.into())
    }

    pub fn lock<S: Into<String>>(name: &str, reason: S) -> Self {
        Error::Lock {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    /// True for the missing-node family, which callers often treat as "absent"
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::ChildNotFound(_) => true,
            Error::Io(err) => err.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}
