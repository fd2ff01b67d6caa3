// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! StudyFS - typed tree view over a simulation study on disk
//!
//! Every file and folder of a study is a node addressed by a path such as
//! `input/areas/fr/ui`. Nodes read, write, validate and delete their
//! content; matrix leaves can also be moved to and restored from an
//! external store, leaving a `.link` file behind.
//!
//! Set STUDYFS_LOG to control logging (see the `diagnostics` crate).

/// Configuration snapshot parsed from the study files
pub mod config;

/// Shared collaborators: matrix store, URI resolver, locks
pub mod context;
pub mod lock;
pub mod resolver;
pub mod store;

// Node abstraction and path dispatch
pub mod folder;
pub mod lazy;
pub mod node;
pub mod path;

// Containers
pub mod bucket;

// Leaves
pub mod ini;
pub mod matrix;
pub mod raw;

/// Catalog of the study layout
pub mod tree;

pub mod archive;
pub mod error;
pub mod frequency;
pub mod ini_format;

pub use bucket::BucketNode;
pub use config::{StudyConfig, StudySnapshot};
pub use context::Context;
pub use error::{Error, Result};
pub use folder::{FolderNode, StructuredFolder};
pub use frequency::MatrixFrequency;
pub use ini::IniFileNode;
pub use lazy::LazyNode;
pub use lock::{FileLocks, LockProvider, MemoryLocks};
pub use matrix::InputSeriesMatrix;
pub use node::{Content, GetOptions, Node, Tree};
pub use path::split_url;
pub use raw::RawFileNode;
pub use resolver::UriResolver;
pub use store::MatrixStore;
pub use tree::file_study_tree;
