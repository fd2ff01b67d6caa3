// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Leaves whose content is materialized only on demand.
//!
//! A lazy leaf answers an expanded read with a URI placeholder, and any
//! read through its `.link` file when one exists. Loading and dumping the
//! physical file is left to the concrete leaf.

use crate::archive::{self, ExtractedMember};
use crate::config::StudyConfig;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::matrix::link_path;
use crate::node::{Content, GetOptions, assert_not_archived, assert_url_end, remove_file_if_exists};
use async_trait::async_trait;
use serde_json::Value;
use std::any::Any;
use std::path::{Path, PathBuf};

#[async_trait]
pub trait LazyNode: Send + Sync {
    fn kind(&self) -> &'static str;

    fn config(&self) -> &StudyConfig;

    fn context(&self) -> &Context;

    /// Placeholder returned instead of the content on expanded reads
    fn lazy_content(&self) -> String;

    /// Read the physical file at `path`
    async fn load(&self, path: &Path, options: GetOptions) -> Result<Content>;

    /// Replace the physical file with `data`
    async fn dump(&self, data: Content) -> Result<()>;

    async fn check_errors(&self, data: &Value, url: &[String], raising: bool)
    -> Result<Vec<String>>;

    async fn normalize(&self) -> Result<()> {
        Ok(())
    }

    async fn denormalize(&self) -> Result<()> {
        Ok(())
    }

    fn as_any(&self) -> &dyn Any;

    #[must_use]
    fn link_path(&self) -> PathBuf {
        link_path(&self.config().path)
    }
}

/// Readable location of a leaf: its own path, or an extracted archive copy
pub enum RealPath {
    Disk(PathBuf),
    Extracted(ExtractedMember),
}

impl RealPath {
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            RealPath::Disk(path) => path,
            RealPath::Extracted(member) => member.path(),
        }
    }
}

/// Where the content of the node at `config` can be read.
///
/// Members of archived runs are extracted to a temporary directory that
/// lives as long as the returned value.
pub async fn real_path(config: &StudyConfig) -> Result<RealPath> {
    let (Some(archive), Some(member)) = (config.archive_path(), config.archive_member()) else {
        return Ok(RealPath::Disk(config.path.clone()));
    };
    match archive::extract_member(archive, &member).await? {
        Some(extracted) => Ok(RealPath::Extracted(extracted)),
        None => Ok(RealPath::Disk(config.path.clone())),
    }
}

async fn read_link(node: &(impl LazyNode + ?Sized)) -> Result<Option<String>> {
    match tokio::fs::read_to_string(node.link_path()).await {
        Ok(uri) => Ok(Some(uri.trim().to_string())),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}

pub async fn get<N: LazyNode + ?Sized>(
    node: &N,
    url: &[String],
    options: GetOptions,
) -> Result<Content> {
    assert_url_end(node.kind(), url)?;

    if let Some(uri) = read_link(node).await? {
        if options.expanded {
            return Ok(Content::Json(Value::String(uri)));
        }
        return node
            .context()
            .resolver
            .resolve(&uri, options.formatted)
            .await?
            .ok_or_else(|| {
                Error::child_not_found(format!(
                    "Link '{uri}' of {} cannot be resolved",
                    node.config().relative_path()
                ))
            });
    }

    if options.expanded {
        return Ok(Content::Json(Value::String(node.lazy_content())));
    }

    let real = real_path(node.config()).await?;
    node.load(real.path(), options).await
}

pub async fn save<N: LazyNode + ?Sized>(node: &N, data: Content, url: &[String]) -> Result<()> {
    assert_not_archived(node.config())?;
    assert_url_end(node.kind(), url)?;

    if let Content::Json(Value::String(uri)) = &data {
        if uri.contains("://") && node.context().resolver.resolve(uri, true).await?.is_some() {
            tokio::fs::write(node.link_path(), uri.as_bytes()).await?;
            return remove_file_if_exists(&node.config().path).await;
        }
    }

    node.dump(data).await?;
    remove_file_if_exists(&node.link_path()).await
}

pub async fn delete<N: LazyNode + ?Sized>(node: &N, url: &[String]) -> Result<()> {
    assert_not_archived(node.config())?;
    assert_url_end(node.kind(), url)?;
    remove_file_if_exists(&node.config().path).await?;
    remove_file_if_exists(&node.link_path()).await
}
