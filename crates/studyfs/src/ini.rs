// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! INI file leaves.
//!
//! Urls address the whole document (`[]`), a section (`[section]`) or one
//! key (`[section, key]`). Every write is a locked read-modify-write of the
//! complete file, committed by renaming a temporary file over the original.

use crate::config::StudyConfig;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::ini_format::{IniReader, IniWriter};
use crate::lazy::real_path;
use crate::lock::lock_name;
use crate::node::{Content, GetOptions, Node, assert_not_archived, remove_file_if_exists, report};
use crate::raw::missing_file;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

/// Prefix of the placeholder returned by expanded reads
pub const LAZY_PREFIX: &str = "json://";

/// Expected type of an INI value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IniType {
    Str,
    Int,
    Float,
    Bool,
    /// Any number, or one of the `+Inf` / `-Inf` markers
    Number,
    List,
}

impl IniType {
    #[must_use]
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            IniType::Str => value.is_string(),
            IniType::Int => value.is_i64() || value.is_u64(),
            IniType::Float => value.is_number(),
            IniType::Bool => value.is_boolean(),
            IniType::Number => {
                value.is_number() || matches!(value.as_str(), Some("+Inf" | "-Inf"))
            }
            IniType::List => value.is_array(),
        }
    }
}

/// Expected sections and keys of an INI file
pub type IniTypes = BTreeMap<String, BTreeMap<String, IniType>>;

/// Build an [`IniTypes`] table from `(section, key, type)` entries
#[must_use]
pub fn ini_types(entries: &[(&str, &str, IniType)]) -> IniTypes {
    let mut types = IniTypes::new();
    for (section, key, ty) in entries {
        let _ = types
            .entry(section.to_string())
            .or_default()
            .insert(key.to_string(), *ty);
    }
    types
}

#[derive(Clone)]
pub struct IniFileNode {
    kind: &'static str,
    context: Context,
    config: StudyConfig,
    types: IniTypes,
    reader: IniReader,
}

impl IniFileNode {
    #[must_use]
    pub fn new(context: &Context, config: StudyConfig) -> Self {
        Self {
            kind: "IniFileNode",
            context: context.clone(),
            config,
            types: IniTypes::new(),
            reader: IniReader::new(),
        }
    }

    /// Name reported in messages and used by filter selections
    #[must_use]
    pub fn named(mut self, kind: &'static str) -> Self {
        self.kind = kind;
        self
    }

    #[must_use]
    pub fn with_types(mut self, types: IniTypes) -> Self {
        self.types = types;
        self
    }

    /// Keys that may repeat, read as and written from lists
    #[must_use]
    pub fn with_special_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reader = self.reader.with_special_keys(keys);
        self
    }

    /// Section-less `key = value` file
    #[must_use]
    pub fn flat(mut self) -> Self {
        self.reader = self.reader.flat();
        self
    }

    #[must_use]
    pub fn into_node(self) -> Node {
        Node::Ini(Arc::new(self))
    }

    #[must_use]
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    #[must_use]
    pub fn config(&self) -> &StudyConfig {
        &self.config
    }

    #[must_use]
    pub fn types(&self) -> &IniTypes {
        &self.types
    }

    fn writer(&self) -> IniWriter {
        IniWriter::new().with_special_keys(self.reader.special_keys())
    }

    fn parse(&self, path: &Path, content: &[u8]) -> Result<Map<String, Value>> {
        self.reader
            .read_str(&String::from_utf8_lossy(content))
            .map_err(|err| Error::ini_parse(self.kind, path, err.to_string()))
    }

    /// Read the document; a missing file is a `ChildNotFound`
    pub async fn read(&self) -> Result<Map<String, Value>> {
        let real = real_path(&self.config).await?;
        match tokio::fs::read(real.path()).await {
            Ok(content) => self.parse(&self.config.path, &content),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(missing_file(&self.config))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Read the document; a missing file reads as empty
    async fn read_or_empty(&self) -> Result<Map<String, Value>> {
        match tokio::fs::read(&self.config.path).await {
            Ok(content) => self.parse(&self.config.path, &content),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Map::new()),
            Err(err) => Err(err.into()),
        }
    }

    async fn write(&self, document: &Map<String, Value>) -> Result<()> {
        write_atomic(&self.config.path, self.writer().write_str(document)).await
    }

    pub async fn get(&self, url: &[String], options: GetOptions) -> Result<Content> {
        if options.depth <= -1 && options.expanded {
            return Ok(Content::Json(Value::String(format!(
                "{LAZY_PREFIX}{}",
                file_name(&self.config.path)
            ))));
        }
        if options.depth == 0 {
            return Ok(Content::Json(Value::Object(Map::new())));
        }

        let mut document = self.read().await?;
        let value = match url {
            [] if options.depth == 1 => Value::Object(
                document
                    .keys()
                    .map(|section| (section.clone(), Value::Object(Map::new())))
                    .collect(),
            ),
            [] => Value::Object(document),
            [section] => document
                .remove(section)
                .ok_or_else(|| Error::not_a_child(section, self.kind))?,
            [section, key] => document
                .get_mut(section)
                .and_then(|entries| entries.as_object_mut())
                .and_then(|entries| entries.remove(key))
                .ok_or_else(|| Error::not_a_child(key, self.kind))?,
            _ => return Err(Error::resolution(self.kind, &url[2..])),
        };
        Ok(Content::Json(value))
    }

    fn update(
        &self,
        mut document: Map<String, Value>,
        data: Value,
        url: &[String],
    ) -> Result<Map<String, Value>> {
        match url {
            [] => match data {
                Value::Object(replacement) => Ok(replacement),
                other => Err(Error::invalid_data(
                    self.kind,
                    format!("expected an object of sections, got {other}"),
                )),
            },
            [section] => {
                let _ = document.insert(section.clone(), data);
                Ok(document)
            }
            [section, key] => {
                let entry = document
                    .entry(section.clone())
                    .or_insert_with(|| Value::Object(Map::new()));
                if !entry.is_object() {
                    *entry = Value::Object(Map::new());
                }
                if let Value::Object(entries) = entry {
                    let _ = entries.insert(key.clone(), data);
                }
                Ok(document)
            }
            _ => Err(Error::resolution(self.kind, &url[2..])),
        }
    }

    fn decode(&self, data: Content) -> Result<Value> {
        match data {
            Content::Json(Value::String(text)) => {
                Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
            }
            Content::Json(value) => Ok(value),
            Content::Bytes(bytes) => Ok(Value::Object(self.parse(&self.config.path, &bytes)?)),
        }
    }

    pub async fn save(&self, data: Content, url: &[String]) -> Result<()> {
        assert_not_archived(&self.config)?;
        if url.len() > 2 {
            return Err(Error::resolution(self.kind, &url[2..]));
        }
        let data = self.decode(data)?;

        let name = lock_name(self.config.study_id(), &self.config.relative_path());
        let _guard = self.context.locks.acquire(&name).await?;
        let document = self.read_or_empty().await?;
        let document = self.update(document, data, url)?;
        self.write(&document).await
    }

    pub async fn delete(&self, url: &[String]) -> Result<()> {
        assert_not_archived(&self.config)?;
        if url.is_empty() {
            return remove_file_if_exists(&self.config.path).await;
        }
        if url.len() > 2 {
            return Err(Error::resolution(self.kind, &url[2..]));
        }

        let name = lock_name(self.config.study_id(), &self.config.relative_path());
        let _guard = self.context.locks.acquire(&name).await?;
        let mut document = self.read_or_empty().await?;
        match url {
            [section] => {
                let _ = document.shift_remove(section);
            }
            [section, key] => {
                if let Some(Value::Object(entries)) = document.get_mut(section) {
                    let _ = entries.shift_remove(key);
                }
            }
            _ => {}
        }
        self.write(&document).await
    }

    pub async fn check_errors(
        &self,
        data: &Value,
        url: &[String],
        raising: bool,
    ) -> Result<Vec<String>> {
        let mut candidate = match data.as_str() {
            Some(text) if text.starts_with(LAZY_PREFIX) => Value::Object(self.read().await?),
            _ => data.clone(),
        };
        if !url.is_empty() {
            let current = self.read_or_empty().await?;
            candidate = Value::Object(self.update(current, candidate, url)?);
        }

        let mut errors = Vec::new();
        for (section, params) in &self.types {
            let Some(entries) = candidate.get(section) else {
                report(
                    &mut errors,
                    format!("section {section} not in {}", self.kind),
                    raising,
                )?;
                continue;
            };
            for (param, ty) in params {
                match entries.get(param) {
                    None => report(
                        &mut errors,
                        format!("param {param} of section {section} not in {}", self.kind),
                        raising,
                    )?,
                    Some(value) if !ty.matches(value) => report(
                        &mut errors,
                        format!("param {param} of section {section} in {} bad type", self.kind),
                        raising,
                    )?,
                    Some(_) => {}
                }
            }
        }
        Ok(errors)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Replace `path` with `text`: write a sibling temporary file, then rename it
pub async fn write_atomic(path: &Path, text: String) -> Result<()> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || -> Result<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => std::path::PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;
        let mut file = tempfile::NamedTempFile::new_in(&dir)?;
        file.write_all(text.as_bytes())?;
        file.flush()?;
        let _ = file.persist(&path).map_err(|err| err.error)?;
        Ok(())
    })
    .await
    .map_err(|err| Error::Io(std::io::Error::other(err)))?
}
