// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Container nodes.
//!
//! A container resolves the first segment of a url against the children
//! returned by `build()` and forwards the rest. A segment may name several
//! children (`a,b`) or all of them (`*`), in which case the answer is an
//! object keyed by child name.

use crate::archive;
use crate::config::StudyConfig;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::node::{Content, GetOptions, Node, Tree, assert_not_archived, report};
use async_trait::async_trait;
use futures::future::try_join_all;
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::runtime::RuntimeFlavor;

#[async_trait]
pub trait FolderNode: Send + Sync {
    fn kind(&self) -> &'static str;

    fn config(&self) -> &StudyConfig;

    fn context(&self) -> &Context;

    /// Children of this container, derived from the configuration
    fn build(&self) -> Result<Tree>;

    async fn get(&self, url: &[String], options: GetOptions) -> Result<Content> {
        get(self, url, options).await
    }

    async fn save(&self, data: Content, url: &[String]) -> Result<()> {
        save(self, data, url).await
    }

    async fn delete(&self, url: &[String]) -> Result<()> {
        delete(self, url).await
    }

    async fn check_errors(
        &self,
        data: &Value,
        url: &[String],
        raising: bool,
    ) -> Result<Vec<String>> {
        check_errors(self, data, url, raising).await
    }

    async fn normalize(&self) -> Result<()> {
        let children = self.build()?;
        let _ = try_join_all(children.values().map(Node::normalize)).await?;
        Ok(())
    }

    async fn denormalize(&self) -> Result<()> {
        let children = self.build()?;
        let _ = try_join_all(children.values().map(Node::denormalize)).await?;
        Ok(())
    }
}

/// Names selected by the first url segment, and the remaining url
pub fn extract_child<'u>(
    kind: &str,
    children: &Tree,
    url: &'u [String],
) -> Result<(Vec<String>, &'u [String])> {
    let Some((first, rest)) = url.split_first() else {
        return Ok((Vec::new(), url));
    };
    let names: Vec<String> = if first == "*" {
        children.keys().cloned().collect()
    } else {
        first.split(',').map(str::to_string).collect()
    };

    let mut selected_kind = None;
    for name in &names {
        let child = children
            .get(name)
            .ok_or_else(|| Error::not_a_child(name, kind))?;
        match selected_kind {
            None => selected_kind = Some(child.kind()),
            Some(previous) if previous != child.kind() => {
                return Err(Error::Filter(format!("{previous} and {}", child.kind())));
            }
            Some(_) => {}
        }
    }
    Ok((names, rest))
}

fn is_root(url: &[String]) -> bool {
    url.is_empty() || (url.len() == 1 && url[0].is_empty())
}

pub async fn get<F: FolderNode + ?Sized>(
    folder: &F,
    url: &[String],
    options: GetOptions,
) -> Result<Content> {
    let children = folder.build()?;
    if is_root(url) {
        return expand(children, options).await;
    }

    let (names, sub_url) = extract_child(folder.kind(), &children, url)?;
    if let [name] = names.as_slice() {
        if !url[0].contains(',') && url[0] != "*" {
            let child = children
                .get(name)
                .ok_or_else(|| Error::not_a_child(name, folder.kind()))?;
            return child.get(sub_url, options).await;
        }
    }

    let mut selected = Map::new();
    for name in names {
        if let Some(child) = children.get(&name) {
            let content = child.get(sub_url, options).await?;
            let _ = selected.insert(name, content.into_json());
        }
    }
    Ok(Content::Json(Value::Object(selected)))
}

/// Shape of a subtree, `depth` levels deep
async fn expand(children: Tree, options: GetOptions) -> Result<Content> {
    let mut tree = Map::new();
    if options.depth == 0 {
        return Ok(Content::Json(Value::Object(tree)));
    }
    for (name, child) in children {
        let value = if options.depth == 1 {
            Value::Object(Map::new())
        } else {
            let child_options = GetOptions {
                depth: options.depth - 1,
                expanded: true,
                formatted: options.formatted,
            };
            child.get(&[], child_options).await?.into_json()
        };
        let _ = tree.insert(name, value);
    }
    Ok(Content::Json(Value::Object(tree)))
}

pub async fn save<F: FolderNode + ?Sized>(folder: &F, data: Content, url: &[String]) -> Result<()> {
    assert_not_archived(folder.config())?;
    let children = folder.build()?;

    if is_root(url) {
        let Content::Json(Value::Object(entries)) = data else {
            return Err(Error::invalid_data(
                folder.kind(),
                "a container is written from an object of its children",
            ));
        };
        for (key, value) in entries {
            let child = children
                .get(&key)
                .ok_or_else(|| Error::not_a_child(&key, folder.kind()))?;
            child.save(Content::Json(value), &[]).await?;
        }
        return Ok(());
    }

    let (names, sub_url) = extract_child(folder.kind(), &children, url)?;
    for name in names {
        if let Some(child) = children.get(&name) {
            child.save(data.clone(), sub_url).await?;
        }
    }
    Ok(())
}

pub async fn delete<F: FolderNode + ?Sized>(folder: &F, url: &[String]) -> Result<()> {
    assert_not_archived(folder.config())?;
    if is_root(url) {
        return match tokio::fs::remove_dir_all(&folder.config().path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        };
    }

    let children = folder.build()?;
    let (names, sub_url) = extract_child(folder.kind(), &children, url)?;
    for name in names {
        if let Some(child) = children.get(&name) {
            child.delete(sub_url).await?;
        }
    }
    Ok(())
}

pub async fn check_errors<F: FolderNode + ?Sized>(
    folder: &F,
    data: &Value,
    url: &[String],
    raising: bool,
) -> Result<Vec<String>> {
    let children = folder.build()?;

    if !is_root(url) {
        let (names, sub_url) = extract_child(folder.kind(), &children, url)?;
        let mut errors = Vec::new();
        for name in names {
            if let Some(child) = children.get(&name) {
                errors.extend(child.check_errors(data, sub_url, raising).await?);
            }
        }
        return Ok(errors);
    }

    let mut errors = Vec::new();
    let Some(entries) = data.as_object() else {
        return Ok(errors);
    };
    for (key, value) in entries {
        match children.get(key) {
            Some(child) => errors.extend(child.check_errors(value, &[], raising).await?),
            None => {
                let known: Vec<&String> = children.keys().collect();
                report(
                    &mut errors,
                    format!("key={key} not in {known:?} for {}", folder.kind()),
                    raising,
                )?;
            }
        }
    }
    Ok(errors)
}

/// Builds the children of a [`StructuredFolder`]
pub type FolderBuilder = Arc<dyn Fn(&Context, &StudyConfig) -> Result<Tree> + Send + Sync>;

/// Container whose children are declared by a builder over the configuration
pub struct StructuredFolder {
    kind: &'static str,
    context: Context,
    config: StudyConfig,
    builder: FolderBuilder,
}

impl StructuredFolder {
    #[must_use]
    pub fn new<B>(kind: &'static str, context: &Context, config: StudyConfig, builder: B) -> Self
    where
        B: Fn(&Context, &StudyConfig) -> Result<Tree> + Send + Sync + 'static,
    {
        Self {
            kind,
            context: context.clone(),
            config,
            builder: Arc::new(builder),
        }
    }

    /// Wrap a new structured folder as a [`Node`]
    #[must_use]
    pub fn node<B>(kind: &'static str, context: &Context, config: StudyConfig, builder: B) -> Node
    where
        B: Fn(&Context, &StudyConfig) -> Result<Tree> + Send + Sync + 'static,
    {
        Node::Folder(Arc::new(Self::new(kind, context, config, builder)))
    }
}

impl FolderNode for StructuredFolder {
    fn kind(&self) -> &'static str {
        self.kind
    }

    fn config(&self) -> &StudyConfig {
        &self.config
    }

    fn context(&self) -> &Context {
        &self.context
    }

    fn build(&self) -> Result<Tree> {
        (self.builder)(&self.context, &self.config)
    }
}

/// Run filesystem work from a synchronous builder without stalling the
/// runtime. On a multi-threaded runtime the worker hands its queued tasks
/// to another thread first; elsewhere the closure runs inline.
fn blocking<T>(work: impl FnOnce() -> T) -> T {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(work)
        }
        _ => work(),
    }
}

/// Entries of the directory at `config`, as (name, is_directory), sorted.
///
/// Reads the archive listing for nodes inside an archived run; a missing
/// directory lists as empty.
pub fn list_entries(config: &StudyConfig) -> Result<Vec<(String, bool)>> {
    blocking(|| read_entries(config))
}

fn read_entries(config: &StudyConfig) -> Result<Vec<(String, bool)>> {
    if let (Some(archive), Some(member)) = (config.archive_path(), config.archive_member()) {
        return archive::list_dir(archive, &member);
    }
    let read_dir = match std::fs::read_dir(&config.path) {
        Ok(read_dir) => read_dir,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) if err.kind() == std::io::ErrorKind::NotADirectory => return Ok(Vec::new()),
        Err(err) => return Err(err.into()),
    };
    let mut entries = Vec::new();
    for entry in read_dir {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        entries.push((name, entry.file_type()?.is_dir()));
    }
    entries.sort();
    Ok(entries)
}

/// Whether `name` exists below the node at `config`, on disk or in its archive
pub fn entry_exists(config: &StudyConfig, name: &str) -> Result<bool> {
    if let (Some(archive), Some(member)) = (config.archive_path(), config.archive_member()) {
        let member = if member.is_empty() {
            name.to_string()
        } else {
            format!("{member}/{name}")
        };
        return blocking(|| archive::member_exists(archive, &member));
    }
    Ok(blocking(|| config.path.join(name).try_exists())?)
}
