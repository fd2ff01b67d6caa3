// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Grid tables of an output run (`mc-all/grid/*.txt`).

use super::{tsv, typed_cell};
use crate::config::StudyConfig;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::lazy::LazyNode;
use crate::node::{Content, GetOptions, Node, report, write_file};
use crate::raw::missing_file;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::any::Any;
use std::path::Path;
use std::sync::Arc;

/// How a grid file is laid out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthesisLayout {
    /// One header row, then typed rows
    Table,
    /// Several tables of varying width; rows are padded and kept as text
    Digest,
}

pub struct OutputSynthesis {
    context: Context,
    config: StudyConfig,
    layout: SynthesisLayout,
}

impl OutputSynthesis {
    #[must_use]
    pub fn new(context: &Context, config: StudyConfig, layout: SynthesisLayout) -> Self {
        Self {
            context: context.clone(),
            config,
            layout,
        }
    }

    #[must_use]
    pub fn into_node(self) -> Node {
        Node::Lazy(Arc::new(self))
    }
}

/// `{columns, data}` of a table with one header row
pub fn parse_table(text: &str) -> Result<Value> {
    let mut records = tsv::read_records(text)?.into_iter();
    let columns: Vec<Value> = records
        .next()
        .map(|header| header.into_iter().map(Value::String).collect())
        .unwrap_or_default();
    let data: Vec<Vec<Value>> = records
        .map(|record| record.iter().map(|cell| typed_cell(cell)).collect())
        .collect();
    Ok(json!({"columns": columns, "data": data}))
}

/// `{columns, data}` of a digest: rows padded to the widest one, as text
#[must_use]
pub fn parse_digest(text: &str) -> Value {
    let rows: Vec<Vec<&str>> = text.lines().map(|line| line.split('\t').collect()).collect();
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    let data: Vec<Vec<String>> = rows
        .into_iter()
        .map(|row| {
            let mut cells: Vec<String> = row.into_iter().map(str::to_string).collect();
            cells.resize(width, String::new());
            cells
        })
        .collect();
    let columns: Vec<String> = (0..width).map(|i| i.to_string()).collect();
    json!({"columns": columns, "data": data})
}

#[async_trait]
impl LazyNode for OutputSynthesis {
    fn kind(&self) -> &'static str {
        match self.layout {
            SynthesisLayout::Table => "OutputSynthesis",
            SynthesisLayout::Digest => "DigestSynthesis",
        }
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
        let content = match tokio::fs::read(path).await {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(missing_file(&self.config));
            }
            Err(err) => return Err(err.into()),
        };
        if !options.formatted {
            return Ok(Content::Bytes(content));
        }
        let text = String::from_utf8_lossy(&content);
        Ok(Content::Json(match self.layout {
            SynthesisLayout::Table => parse_table(&text)?,
            SynthesisLayout::Digest => parse_digest(&text),
        }))
    }

    async fn dump(&self, data: Content) -> Result<()> {
        let bytes = match data {
            Content::Bytes(bytes) => bytes,
            Content::Json(Value::String(text)) => text.into_bytes(),
            Content::Json(other) => {
                return Err(Error::invalid_data(
                    self.kind(),
                    format!("grid files are written from raw text, got {other}"),
                ));
            }
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_table() {
        let table = parse_table("area\tcost\tname\nfr\t12\tx\nde\t0.5\ty\n").unwrap();
        assert_eq!(
            table,
            json!({
                "columns": ["area", "cost", "name"],
                "data": [["fr", 12, "x"], ["de", 0.5, "y"]]
            })
        );
    }

    #[test]
    fn test_parse_digest_pads_rows() {
        let digest = parse_digest("\tdigest\n\tVARIABLES\tAREAS\tLINKS\n\n\tfr\t1\n");
        assert_eq!(
            digest,
            json!({
                "columns": ["0", "1", "2", "3"],
                "data": [
                    ["", "digest", "", ""],
                    ["", "VARIABLES", "AREAS", "LINKS"],
                    ["", "", "", ""],
                    ["", "fr", "1", ""]
                ]
            })
        );
    }
}
