// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use crate::config::StudyConfig;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::lazy::LazyNode;
use crate::node::{Content, GetOptions, Node, report, write_file};
use async_trait::async_trait;
use serde_json::Value;
use std::any::Any;
use std::path::Path;
use std::sync::Arc;

/// Opaque file, read and written verbatim
pub struct RawFileNode {
    context: Context,
    config: StudyConfig,
}

impl RawFileNode {
    #[must_use]
    pub fn new(context: &Context, config: StudyConfig) -> Self {
        Self {
            context: context.clone(),
            config,
        }
    }

    #[must_use]
    pub fn into_node(self) -> Node {
        Node::Lazy(Arc::new(self))
    }
}

/// Missing physical file of a leaf, named relative to its study
pub fn missing_file(config: &StudyConfig) -> Error {
    Error::child_not_found(format!(
        "File '{}' not found in the study '{}'",
        config.relative_path(),
        config.study_id()
    ))
}

#[async_trait]
impl LazyNode for RawFileNode {
    fn kind(&self) -> &'static str {
        "RawFileNode"
    }

    fn config(&self) -> &StudyConfig {
        &self.config
    }

    fn context(&self) -> &Context {
        &self.context
    }

    fn lazy_content(&self) -> String {
        let name = self
            .config
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        format!("file://{name}")
    }

    async fn load(&self, path: &Path, _options: GetOptions) -> Result<Content> {
        match tokio::fs::read(path).await {
            Ok(content) => Ok(Content::Bytes(content)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(missing_file(&self.config))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn dump(&self, data: Content) -> Result<()> {
        let bytes = match data {
            Content::Bytes(bytes) => bytes,
            Content::Json(Value::String(text)) => text.into_bytes(),
            Content::Json(value) => value.to_string().into_bytes(),
        };
        write_file(&self.config.path, &bytes).await
    }

    async fn check_errors(
        &self,
        _data: &Value,
        url: &[String],
        raising: bool,
    ) -> Result<Vec<String>> {
        crate::node::assert_url_end(self.kind(), url)?;
        let mut errors = Vec::new();
        if !tokio::fs::try_exists(&self.config.path).await? {
            report(
                &mut errors,
                format!("{} not exist", self.config.path.display()),
                raising,
            )?;
        }
        Ok(errors)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
