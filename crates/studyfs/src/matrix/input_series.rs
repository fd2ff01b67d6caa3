// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Input time series and their externalization.
//!
//! A series lives either as a physical TSV file or as a `.link` file
//! pointing into the matrix store. `normalize()` moves the data to the
//! store and leaves the link; `denormalize()` reverses it. Both are no-ops
//! when the series is already in the target state.

use super::defaults::DefaultMatrix;
use super::{MatrixData, MatrixState, dump_tsv, json_rows, parse_tsv};
use crate::archive;
use crate::config::StudyConfig;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::frequency::MatrixFrequency;
use crate::lazy::LazyNode;
use crate::node::{Content, GetOptions, Node, remove_file_if_exists, report, write_file};
use crate::raw::missing_file;
use async_trait::async_trait;
use serde_json::Value;
use std::any::Any;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Downloadable form of a series
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginalFile {
    pub content: Vec<u8>,
    /// Extension with its dot, e.g. `.txt`
    pub suffix: String,
    pub filename: String,
}

pub struct InputSeriesMatrix {
    context: Context,
    config: StudyConfig,
    freq: MatrixFrequency,
    nb_columns: Option<usize>,
    default_empty: Option<DefaultMatrix>,
}

impl InputSeriesMatrix {
    #[must_use]
    pub fn new(context: &Context, config: StudyConfig) -> Self {
        Self {
            context: context.clone(),
            config,
            freq: MatrixFrequency::Hourly,
            nb_columns: None,
            default_empty: None,
        }
    }

    #[must_use]
    pub fn with_freq(mut self, freq: MatrixFrequency) -> Self {
        self.freq = freq;
        self
    }

    /// Expected width, checked by `check_errors`
    #[must_use]
    pub fn with_nb_columns(mut self, nb_columns: usize) -> Self {
        self.nb_columns = Some(nb_columns);
        self
    }

    /// Matrix read in place of an empty file
    #[must_use]
    pub fn with_default(mut self, default_empty: DefaultMatrix) -> Self {
        self.default_empty = Some(default_empty);
        self
    }

    #[must_use]
    pub fn into_node(self) -> Node {
        Node::Lazy(Arc::new(self))
    }

    #[must_use]
    pub fn freq(&self) -> MatrixFrequency {
        self.freq
    }

    /// Current storage form, `None` when neither file nor link exists
    pub async fn state(&self) -> Result<Option<MatrixState>> {
        Ok(MatrixState::detect(&self.config.path).await?)
    }

    /// Parse the series, through its link when there is one
    pub async fn parse(&self, path: &Path) -> Result<MatrixData> {
        if let Some(MatrixState::Linked(link)) = self.state().await? {
            let uri = tokio::fs::read_to_string(&link).await?;
            let resolved = self.context.resolver.resolve(uri.trim(), true).await?;
            return match resolved {
                Some(Content::Json(value)) => MatrixData::from_json(value),
                _ => Err(Error::child_not_found(format!(
                    "Link '{}' of {} cannot be resolved",
                    uri.trim(),
                    self.config.relative_path()
                ))),
            };
        }

        let content = match tokio::fs::read(path).await {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(missing_file(&self.config));
            }
            Err(err) => return Err(err.into()),
        };
        match parse_tsv(&String::from_utf8_lossy(&content))? {
            Some(matrix) => Ok(matrix),
            None => {
                diagnostics::log_debug!(
                    "Empty matrix file {path}",
                    path: self.config.relative_path()
                );
                Ok(self
                    .default_empty
                    .map(|build| MatrixData::from_rows(build()))
                    .unwrap_or_default())
            }
        }
    }

    fn infer_path(state: Option<MatrixState>, config: &StudyConfig) -> Result<PathBuf> {
        match state {
            Some(state) => Ok(state.path().to_path_buf()),
            None => Err(Error::child_not_found(format!(
                "Neither link file {} nor matrix file {} exists",
                super::link_path(&config.path).display(),
                config.path.display()
            ))),
        }
    }

    async fn target_path(&self, target: &str) -> Result<(PathBuf, PathBuf)> {
        let source = Self::infer_path(self.state().await?, &self.config)?;
        let name = source
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let parent = self.config.path.parent().unwrap_or(Path::new(""));
        let target_path = parent.join(format!("{target}{}", suffixes(&name)));
        remove_file_if_exists(&target_path).await?;
        Ok((source, target_path))
    }

    /// Move the series (file or link) to `target`, keeping its suffixes
    pub async fn rename_file(&self, target: &str) -> Result<()> {
        let (source, target_path) = self.target_path(target).await?;
        tokio::fs::rename(source, target_path).await?;
        Ok(())
    }

    /// Copy the series (file or link) to `target`, keeping its suffixes
    pub async fn copy_file(&self, target: &str) -> Result<()> {
        let (source, target_path) = self.target_path(target).await?;
        let _ = tokio::fs::copy(source, target_path).await?;
        Ok(())
    }

    /// The series as a downloadable file; linked series are rendered as TSV
    pub async fn file_content(&self) -> Result<OriginalFile> {
        let path = &self.config.path;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let suffix = path
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();

        if let (Some(archive), Some(member)) =
            (self.config.archive_path(), self.config.archive_member())
        {
            let content = archive::read_member_async(archive, &member)
                .await?
                .ok_or_else(|| missing_file(&self.config))?;
            return Ok(OriginalFile {
                content,
                suffix,
                filename,
            });
        }

        if let Some(MatrixState::Linked(_)) = self.state().await? {
            let matrix = self.parse(path).await?;
            let text_path = path.with_extension("txt");
            return Ok(OriginalFile {
                content: dump_tsv(&json_rows(&matrix))?.into_bytes(),
                suffix: ".txt".to_string(),
                filename: text_path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            });
        }

        match tokio::fs::read(path).await {
            Ok(content) => Ok(OriginalFile {
                content,
                suffix,
                filename,
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(missing_file(&self.config))
            }
            Err(err) => Err(err.into()),
        }
    }
}

/// All extensions of a file name, e.g. `.txt.link`
fn suffixes(name: &str) -> &str {
    let search_from = usize::from(name.starts_with('.'));
    match name[search_from..].find('.') {
        Some(index) => &name[search_from + index..],
        None => "",
    }
}

/// Rows of a split-orient JSON table, as JSON values
fn rows_of(node: &str, value: &Value) -> Result<Vec<Vec<Value>>> {
    let data = match value {
        Value::Object(table) => table.get("data").cloned().unwrap_or(Value::Array(Vec::new())),
        Value::Array(_) => value.clone(),
        other => {
            return Err(Error::invalid_data(
                node,
                format!("expected a table with a data field, got {other}"),
            ));
        }
    };
    Ok(serde_json::from_value(data)?)
}

#[async_trait]
impl LazyNode for InputSeriesMatrix {
    fn kind(&self) -> &'static str {
        "InputSeriesMatrix"
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
        format!("matrixfile://{name}")
    }

    async fn load(&self, path: &Path, options: GetOptions) -> Result<Content> {
        let matrix = self.parse(path).await?;
        if options.formatted {
            return Ok(Content::Json(matrix.to_json()));
        }
        if matrix.is_empty() {
            return Ok(Content::Bytes(Vec::new()));
        }
        Ok(Content::Bytes(dump_tsv(&json_rows(&matrix))?.into_bytes()))
    }

    async fn dump(&self, data: Content) -> Result<()> {
        let bytes = match data {
            Content::Bytes(bytes) => bytes,
            Content::Json(Value::String(text)) => text.into_bytes(),
            Content::Json(value) => dump_tsv(&rows_of(self.kind(), &value)?)?.into_bytes(),
        };
        write_file(&self.config.path, &bytes).await
    }

    async fn check_errors(
        &self,
        data: &Value,
        url: &[String],
        raising: bool,
    ) -> Result<Vec<String>> {
        crate::node::assert_url_end(self.kind(), url)?;
        let mut errors = Vec::new();
        if self.state().await?.is_none() {
            report(
                &mut errors,
                format!("Input Series Matrix {} not exists", self.config.path.display()),
                raising,
            )?;
        }
        if let Some(expected) = self.nb_columns {
            let width = data
                .get("data")
                .and_then(|rows| rows.get(0))
                .and_then(Value::as_array)
                .map_or(0, Vec::len);
            if width != expected {
                report(
                    &mut errors,
                    format!(
                        "{}: Data was wrong size. expected {expected} get {width}",
                        self.config.path.display()
                    ),
                    raising,
                )?;
            }
        }
        Ok(errors)
    }

    async fn normalize(&self) -> Result<()> {
        if self.config.archive_path().is_some() {
            return Ok(());
        }
        let Some(MatrixState::Physical(path)) = self.state().await? else {
            return Ok(());
        };

        let matrix = self.parse(&path).await?;
        let id = self.context.store.create(matrix).await?;
        let uri = self.context.resolver.build_matrix_uri(&id);
        tokio::fs::write(self.link_path(), uri.as_bytes()).await?;
        tokio::fs::remove_file(&path).await?;

        diagnostics::log_debug!(
            "Normalized {path} to {uri}",
            path: self.config.relative_path(),
            uri: uri.as_str()
        );
        Ok(())
    }

    async fn denormalize(&self) -> Result<()> {
        let Some(MatrixState::Linked(link)) = self.state().await? else {
            return Ok(());
        };
        if tokio::fs::try_exists(&self.config.path).await? {
            return Ok(());
        }

        let uri = tokio::fs::read_to_string(&link).await?;
        let failed = || {
            Error::Denormalization(format!(
                "Failed to retrieve original matrix for {}",
                self.config.path.display()
            ))
        };
        let value = match self.context.resolver.resolve(uri.trim(), true).await? {
            Some(Content::Json(value)) if value.is_object() => value,
            _ => return Err(failed()),
        };

        self.dump(Content::Json(value)).await?;
        tokio::fs::remove_file(&link).await?;

        diagnostics::log_debug!(
            "Denormalized {path}",
            path: self.config.relative_path()
        );
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suffixes() {
        assert_eq!(suffixes("load_fr.txt"), ".txt");
        assert_eq!(suffixes("load_fr.txt.link"), ".txt.link");
        assert_eq!(suffixes("noext"), "");
        assert_eq!(suffixes(".hidden.txt"), ".txt");
    }
}
