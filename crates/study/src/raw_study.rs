// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use crate::context::StudyContext;
use crate::error::{Result, StudyError};
use serde_json::Value;
use std::path::{Path, PathBuf};
use studyfs::matrix::input_series::OriginalFile;
use studyfs::{
    Content, Context, GetOptions, InputSeriesMatrix, Node, StudyConfig, file_study_tree,
    split_url,
};

/// An opened study: its configuration snapshot and the tree built on it
pub struct RawStudy {
    id: String,
    path: PathBuf,
    config: StudyConfig,
    tree: Node,
    formatted: bool,
}

impl RawStudy {
    /// Parse the study at `study_path` (directory or `.zip`) and build its tree
    pub fn open<P: AsRef<Path>>(ctx: &StudyContext, study_path: P, study_id: &str) -> Result<Self> {
        let path = study_path.as_ref().to_path_buf();
        let config = studyfs::config::build(&path, study_id, None)?.with_cache();
        let tree = file_study_tree(&ctx.context, config.clone());

        diagnostics::log_info!(
            "Opened study {id} version {version} with {areas} areas and {outputs} outputs",
            id: study_id,
            version: config.version(),
            areas: config.area_names().len(),
            outputs: config.snapshot().outputs.len()
        );

        Ok(Self {
            id: study_id.to_string(),
            path,
            config,
            tree,
            formatted: ctx.formatted,
        })
    }

    /// Open a study with in-process collaborators only
    pub fn open_in_memory<P: AsRef<Path>>(study_path: P, study_id: &str) -> Result<Self> {
        let ctx = StudyContext {
            context: Context::in_memory(),
            formatted: true,
        };
        Self::open(&ctx, study_path, study_id)
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn config(&self) -> &StudyConfig {
        &self.config
    }

    #[must_use]
    pub fn tree(&self) -> &Node {
        &self.tree
    }

    pub async fn get(&self, path: &str, depth: i32, formatted: bool) -> Result<Content> {
        let options = GetOptions {
            formatted,
            ..GetOptions::with_depth(depth)
        };
        Ok(self.tree.get(&split_url(path), options).await?)
    }

    /// `get` with the formatting chosen by the settings
    pub async fn get_default(&self, path: &str, depth: i32) -> Result<Content> {
        self.get(path, depth, self.formatted).await
    }

    /// Like `get`, but leaves return their file or link reference
    pub async fn get_expanded(&self, path: &str, depth: i32) -> Result<Content> {
        let options = GetOptions::with_depth(depth).expanded();
        Ok(self.tree.get(&split_url(path), options).await?)
    }

    pub async fn save(&self, path: &str, content: Content) -> Result<()> {
        Ok(self.tree.save(content, &split_url(path)).await?)
    }

    pub async fn delete(&self, path: &str) -> Result<()> {
        Ok(self.tree.delete(&split_url(path)).await?)
    }

    /// Every violation of `data` against the node at `path`
    pub async fn check_errors(&self, path: &str, data: &Value) -> Result<Vec<String>> {
        Ok(self.tree.check_errors(data, &split_url(path), false).await?)
    }

    /// Move every input matrix to the store, leaving `.link` files behind
    pub async fn normalize(&self) -> Result<()> {
        diagnostics::log_debug!("Normalizing study {id}", id: self.id.as_str());
        Ok(self.tree.normalize().await?)
    }

    /// Restore every linked matrix from the store
    pub async fn denormalize(&self) -> Result<()> {
        diagnostics::log_debug!("Denormalizing study {id}", id: self.id.as_str());
        Ok(self.tree.denormalize().await?)
    }

    /// Rename the series at `path` to the sibling name `target`
    pub async fn rename_matrix(&self, path: &str, target: &str) -> Result<()> {
        let node = self.matrix_node(path)?;
        as_matrix(&node, path)?.rename_file(target).await?;
        Ok(())
    }

    /// Copy the series at `path` to the sibling name `target`
    pub async fn copy_matrix(&self, path: &str, target: &str) -> Result<()> {
        let node = self.matrix_node(path)?;
        as_matrix(&node, path)?.copy_file(target).await?;
        Ok(())
    }

    /// The series at `path` as a downloadable file
    pub async fn file_content(&self, path: &str) -> Result<OriginalFile> {
        let node = self.matrix_node(path)?;
        Ok(as_matrix(&node, path)?.file_content().await?)
    }

    fn matrix_node(&self, path: &str) -> Result<Node> {
        Ok(self.tree.get_node(&split_url(path))?)
    }
}

fn as_matrix<'a>(node: &'a Node, path: &str) -> Result<&'a InputSeriesMatrix> {
    node.downcast_leaf::<InputSeriesMatrix>()
        .ok_or_else(|| StudyError::not_a_matrix(path, node.kind()))
}
