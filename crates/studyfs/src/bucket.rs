// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Free-form folders whose children are whatever lies on disk.
//!
//! Files become [`RawFileNode`]s and directories nested buckets, unless a
//! planned factory claims the name.

use crate::config::StudyConfig;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::folder::{FolderNode, list_entries};
use crate::matrix::InputSeriesMatrix;
use crate::node::{Content, Node, Tree};
use crate::raw::RawFileNode;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Builds the node for a planned child of a bucket
pub type NodeFactory = Arc<dyn Fn(&Context, StudyConfig) -> Node + Send + Sync>;

/// What a bucket makes of entries without a planned factory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Entries {
    Files,
    /// Every file is a matrix, named without its `.link` suffix
    Matrices,
}

pub struct BucketNode {
    kind: &'static str,
    context: Context,
    config: StudyConfig,
    planned: BTreeMap<String, NodeFactory>,
    entries: Entries,
}

impl BucketNode {
    #[must_use]
    pub fn new(context: &Context, config: StudyConfig) -> Self {
        Self {
            kind: "BucketNode",
            context: context.clone(),
            config,
            planned: BTreeMap::new(),
            entries: Entries::Files,
        }
    }

    /// Bucket of input matrices such as the xpansion `capa` folder
    #[must_use]
    pub fn matrix_resources(context: &Context, config: StudyConfig) -> Self {
        Self {
            kind: "ExpansionMatrixResources",
            entries: Entries::Matrices,
            ..Self::new(context, config)
        }
    }

    /// Claim `name` for the node built by `factory`
    #[must_use]
    pub fn with_planned<F>(mut self, name: &str, factory: F) -> Self
    where
        F: Fn(&Context, StudyConfig) -> Node + Send + Sync + 'static,
    {
        let _ = self.planned.insert(name.to_string(), Arc::new(factory));
        self
    }

    #[must_use]
    pub fn into_node(self) -> Node {
        Node::Folder(Arc::new(self))
    }

    fn nested(&self, name: &str) -> Node {
        BucketNode::new(&self.context, self.config.next_file(name)).into_node()
    }

    fn planned_node(&self, name: &str) -> Option<Node> {
        self.planned
            .get(name)
            .map(|factory| factory(&self.context, self.config.next_file(name)))
    }

    async fn save_entry(&self, key: &str, data: Content) -> Result<()> {
        if let Some(node) = self.planned_node(key) {
            return node.save(data, &[]).await;
        }
        match data {
            Content::Bytes(_) | Content::Json(Value::String(_)) => {
                RawFileNode::new(&self.context, self.config.next_file(key))
                    .into_node()
                    .save(data, &[])
                    .await
            }
            Content::Json(value @ Value::Object(_)) => {
                self.nested(key).save(Content::Json(value), &[]).await
            }
            Content::Json(other) => Err(Error::invalid_data(
                self.kind,
                format!("cannot store {other} as '{key}'"),
            )),
        }
    }
}

#[async_trait]
impl FolderNode for BucketNode {
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
        let mut children = Tree::new();
        for (name, is_dir) in list_entries(&self.config)? {
            let node = match self.entries {
                Entries::Matrices if !is_dir => {
                    let name = name.strip_suffix(".link").unwrap_or(&name).to_string();
                    let node =
                        InputSeriesMatrix::new(&self.context, self.config.next_file(&name))
                            .into_node();
                    let _ = children.insert(name, node);
                    continue;
                }
                _ if self.planned.contains_key(&name) => self.planned_node(&name),
                _ if is_dir => Some(self.nested(&name)),
                _ => Some(RawFileNode::new(&self.context, self.config.next_file(&name)).into_node()),
            };
            if let Some(node) = node {
                let _ = children.insert(name, node);
            }
        }
        Ok(children)
    }

    async fn save(&self, data: Content, url: &[String]) -> Result<()> {
        crate::node::assert_not_archived(&self.config)?;
        match url {
            [] => {
                let Content::Json(Value::Object(entries)) = data else {
                    return Err(Error::invalid_data(
                        self.kind,
                        "saving a whole bucket requires an object",
                    ));
                };
                for (key, value) in entries {
                    self.save_entry(&key, Content::Json(value)).await?;
                }
                Ok(())
            }
            [key] => self.save_entry(key, data).await,
            [key, rest @ ..] => {
                let node = self.planned_node(key).unwrap_or_else(|| self.nested(key));
                node.save(data, rest).await
            }
        }
    }

    async fn check_errors(
        &self,
        _data: &Value,
        _url: &[String],
        _raising: bool,
    ) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StudySnapshot;
    use crate::ini::IniFileNode;
    use crate::node::GetOptions;
    use serde_json::json;
    use tempfile::TempDir;

    fn config(dir: &TempDir) -> StudyConfig {
        let snapshot = StudySnapshot {
            study_id: "s1".to_string(),
            version: 860,
            ..Default::default()
        };
        StudyConfig::new(dir.path().to_path_buf(), snapshot).next_file("user")
    }

    fn url(path: &str) -> Vec<String> {
        path.split('/').map(str::to_string).collect()
    }

    #[tokio::test]
    async fn test_build_lists_disk() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("user/notes/deep")).unwrap();
        std::fs::write(dir.path().join("user/readme.md"), "hi").unwrap();
        std::fs::write(dir.path().join("user/notes/a.txt"), "a").unwrap();

        let bucket = BucketNode::new(&Context::in_memory(), config(&dir)).into_node();
        let shape = bucket.get(&[], GetOptions::with_depth(-1)).await.unwrap();
        assert_eq!(
            shape,
            Content::Json(json!({
                "notes": {"a.txt": "file://a.txt", "deep": {}},
                "readme.md": "file://readme.md"
            }))
        );
        assert_eq!(
            bucket.get(&url("readme.md"), GetOptions::default()).await.unwrap(),
            Content::Bytes(b"hi".to_vec())
        );
    }

    #[tokio::test]
    async fn test_missing_bucket_is_empty() {
        let dir = TempDir::new().unwrap();
        let bucket = BucketNode::new(&Context::in_memory(), config(&dir)).into_node();
        assert_eq!(
            bucket.get(&[], GetOptions::default()).await.unwrap(),
            Content::Json(json!({}))
        );
    }

    #[tokio::test]
    async fn test_save_nested_content() {
        let dir = TempDir::new().unwrap();
        let bucket = BucketNode::new(&Context::in_memory(), config(&dir)).into_node();

        bucket
            .save(
                Content::Json(json!({"folder": {"file.txt": "content"}, "top.txt": "x"})),
                &[],
            )
            .await
            .unwrap();
        assert_eq!(
            std::fs::read_to_string(dir.path().join("user/folder/file.txt")).unwrap(),
            "content"
        );
        assert_eq!(std::fs::read_to_string(dir.path().join("user/top.txt")).unwrap(), "x");

        bucket
            .save(Content::Bytes(b"deep".to_vec()), &url("a/b/c.bin"))
            .await
            .unwrap();
        assert_eq!(std::fs::read(dir.path().join("user/a/b/c.bin")).unwrap(), b"deep");

        let err = bucket.save(Content::Json(json!(3)), &url("n")).await;
        assert!(matches!(err, Err(Error::InvalidData { .. })));
    }

    #[tokio::test]
    async fn test_planned_children() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("user")).unwrap();
        std::fs::write(dir.path().join("user/settings.ini"), "[s]\nk = 1\n").unwrap();
        let bucket = BucketNode::new(&Context::in_memory(), config(&dir))
            .with_planned("settings.ini", |ctx, cfg| IniFileNode::new(ctx, cfg).into_node())
            .into_node();

        assert_eq!(
            bucket.get(&url("settings.ini/s/k"), GetOptions::default()).await.unwrap(),
            Content::Json(json!(1))
        );
        bucket
            .save(Content::Json(json!(2)), &url("settings.ini/s/k"))
            .await
            .unwrap();
        assert_eq!(
            std::fs::read_to_string(dir.path().join("user/settings.ini")).unwrap(),
            "[s]\nk = 2\n\n"
        );
        assert!(
            bucket
                .check_errors(&json!({"anything": 1}), &[], true)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_matrix_resources_strip_link_suffix() {
        let dir = TempDir::new().unwrap();
        let capa = dir.path().join("user/capa");
        std::fs::create_dir_all(&capa).unwrap();
        std::fs::write(capa.join("solar.txt.link"), "matrix://unknown").unwrap();
        std::fs::write(capa.join("wind.txt"), "1\n").unwrap();

        let bucket =
            BucketNode::matrix_resources(&Context::in_memory(), config(&dir).next_file("capa"))
                .into_node();
        let names: Vec<String> = bucket.build().unwrap().into_keys().collect();
        assert_eq!(names, vec!["solar.txt".to_string(), "wind.txt".to_string()]);
        assert_eq!(
            bucket.get(&url("solar.txt"), GetOptions::default().expanded()).await.unwrap(),
            Content::Json(json!("matrix://unknown"))
        );
    }
}
