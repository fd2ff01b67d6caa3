// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! The node handle every tree element is reached through.
//!
//! [`Node`] dispatches to one of three concrete families: containers
//! ([`FolderNode`]), INI files ([`IniFileNode`]) and lazily materialized
//! files ([`LazyNode`]: raw files and matrices).

use crate::config::StudyConfig;
use crate::error::{Error, Result};
use crate::folder::FolderNode;
use crate::ini::IniFileNode;
use crate::lazy::{self, LazyNode};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

/// Children of a container, by name
pub type Tree = BTreeMap<String, Node>;

/// Data read from or written to a node
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    Json(Value),
    Bytes(Vec<u8>),
}

impl Content {
    /// JSON view; bytes become a (lossy) UTF-8 string
    #[must_use]
    pub fn into_json(self) -> Value {
        match self {
            Content::Json(value) => value,
            Content::Bytes(bytes) => Value::String(String::from_utf8_lossy(&bytes).into_owned()),
        }
    }

    #[must_use]
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Content::Json(value) => Some(value),
            Content::Bytes(_) => None,
        }
    }
}

impl From<Value> for Content {
    fn from(value: Value) -> Self {
        Content::Json(value)
    }
}

impl From<Vec<u8>> for Content {
    fn from(bytes: Vec<u8>) -> Self {
        Content::Bytes(bytes)
    }
}

/// Read options propagated down a path walk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetOptions {
    /// Expansion limit: 0 gives `{}`, 1 one level of placeholders, -1 everything
    pub depth: i32,
    /// Leaves answer with a lazy URI instead of their content
    pub expanded: bool,
    /// Matrices answer with JSON rather than raw file bytes
    pub formatted: bool,
}

impl Default for GetOptions {
    fn default() -> Self {
        Self {
            depth: -1,
            expanded: false,
            formatted: true,
        }
    }
}

impl GetOptions {
    #[must_use]
    pub fn with_depth(depth: i32) -> Self {
        Self {
            depth,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn expanded(self) -> Self {
        Self {
            expanded: true,
            ..self
        }
    }

    #[must_use]
    pub fn raw(self) -> Self {
        Self {
            formatted: false,
            ..self
        }
    }
}

/// Fail when path segments remain at a node that cannot consume them
pub fn assert_url_end(kind: &str, url: &[String]) -> Result<()> {
    if url.is_empty() {
        Ok(())
    } else {
        Err(Error::resolution(kind, url))
    }
}

/// Writes are refused below an archived output run
pub fn assert_not_archived(config: &StudyConfig) -> Result<()> {
    match config.archive_path() {
        Some(archive) => Err(Error::archived(&config.path, archive)),
        None => Ok(()),
    }
}

pub async fn remove_file_if_exists(path: &Path) -> Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}

/// Write `content`, creating missing parent directories
pub async fn write_file(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, content).await?;
    Ok(())
}

#[derive(Clone)]
pub enum Node {
    Folder(Arc<dyn FolderNode>),
    Ini(Arc<IniFileNode>),
    Lazy(Arc<dyn LazyNode>),
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.kind(), self.config().path.display())
    }
}

impl Node {
    /// Name of the concrete node type, used in messages and filter checks
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Folder(folder) => folder.kind(),
            Node::Ini(ini) => ini.kind(),
            Node::Lazy(leaf) => leaf.kind(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &StudyConfig {
        match self {
            Node::Folder(folder) => folder.config(),
            Node::Ini(ini) => ini.config(),
            Node::Lazy(leaf) => leaf.config(),
        }
    }

    /// Children of a container; leaves have none
    pub fn build(&self) -> Result<Tree> {
        match self {
            Node::Folder(folder) => folder.build(),
            Node::Ini(_) | Node::Lazy(_) => Ok(Tree::new()),
        }
    }

    /// Walk `url` and return the node found there
    pub fn get_node(&self, url: &[String]) -> Result<Node> {
        let Some((first, rest)) = url.split_first() else {
            return Ok(self.clone());
        };
        match self {
            Node::Folder(folder) => {
                let mut children = folder.build()?;
                let child = children
                    .remove(first)
                    .ok_or_else(|| Error::not_a_child(first, folder.kind()))?;
                child.get_node(rest)
            }
            _ => Err(Error::resolution(self.kind(), url)),
        }
    }

    pub async fn get(&self, url: &[String], options: GetOptions) -> Result<Content> {
        match self {
            Node::Folder(folder) => folder.get(url, options).await,
            Node::Ini(ini) => ini.get(url, options).await,
            Node::Lazy(leaf) => lazy::get(leaf.as_ref(), url, options).await,
        }
    }

    pub async fn save(&self, data: Content, url: &[String]) -> Result<()> {
        match self {
            Node::Folder(folder) => folder.save(data, url).await,
            Node::Ini(ini) => ini.save(data, url).await,
            Node::Lazy(leaf) => lazy::save(leaf.as_ref(), data, url).await,
        }
    }

    pub async fn delete(&self, url: &[String]) -> Result<()> {
        match self {
            Node::Folder(folder) => folder.delete(url).await,
            Node::Ini(ini) => ini.delete(url).await,
            Node::Lazy(leaf) => lazy::delete(leaf.as_ref(), url).await,
        }
    }

    /// Structural violations of `data` against this node.
    ///
    /// With `raising`, the first violation is returned as
    /// [`Error::Validation`] instead of being collected.
    pub async fn check_errors(
        &self,
        data: &Value,
        url: &[String],
        raising: bool,
    ) -> Result<Vec<String>> {
        match self {
            Node::Folder(folder) => folder.check_errors(data, url, raising).await,
            Node::Ini(ini) => ini.check_errors(data, url, raising).await,
            Node::Lazy(leaf) => leaf.check_errors(data, url, raising).await,
        }
    }

    pub async fn normalize(&self) -> Result<()> {
        match self {
            Node::Folder(folder) => folder.normalize().await,
            Node::Ini(_) => Ok(()),
            Node::Lazy(leaf) => leaf.normalize().await,
        }
    }

    pub async fn denormalize(&self) -> Result<()> {
        match self {
            Node::Folder(folder) => folder.denormalize().await,
            Node::Ini(_) => Ok(()),
            Node::Lazy(leaf) => leaf.denormalize().await,
        }
    }

    /// Downcast a lazy leaf to its concrete type
    #[must_use]
    pub fn downcast_leaf<T: 'static>(&self) -> Option<&T> {
        match self {
            Node::Lazy(leaf) => leaf.as_any().downcast_ref::<T>(),
            _ => None,
        }
    }
}

/// Report a violation: collect it, or fail with it when `raising`
pub fn report(errors: &mut Vec<String>, message: String, raising: bool) -> Result<()> {
    if raising {
        return Err(Error::Validation(message));
    }
    errors.push(message);
    Ok(())
}
