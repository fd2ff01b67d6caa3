// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Reader and writer for the `[section]` / `key = value` files of a study.
//!
//! Values are typed on read: booleans, infinities, integers and floats are
//! recognized, anything else stays a string. Keys listed as *special* may
//! repeat and are collected into lists (e.g. `+ = a` / `+ = b` in `sets.ini`).

use serde_json::{Map, Number, Value};

/// Section used for keys appearing before any `[section]` header
pub const DEFAULT_SECTION: &str = "settings";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid line {line_no}: '{line}'")]
pub struct IniSyntaxError {
    pub line_no: usize,
    pub line: String,
}

#[derive(Debug, Clone, Default)]
pub struct IniReader {
    special_keys: Vec<String>,
    flat: bool,
}

impl IniReader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys whose repeated occurrences are collected into a list
    #[must_use]
    pub fn with_special_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.special_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    /// Read a section-less `key = value` file into a flat mapping
    #[must_use]
    pub fn flat(mut self) -> Self {
        self.flat = true;
        self
    }

    #[must_use]
    pub fn special_keys(&self) -> &[String] {
        &self.special_keys
    }

    pub fn read_str(&self, text: &str) -> Result<Map<String, Value>, IniSyntaxError> {
        let mut document = Map::new();
        let mut section = DEFAULT_SECTION.to_string();

        for (index, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }
            if line.starts_with('[') && line.ends_with(']') && !self.flat {
                section = line[1..line.len() - 1].to_string();
                document
                    .entry(section.clone())
                    .or_insert_with(|| Value::Object(Map::new()));
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                return Err(IniSyntaxError {
                    line_no: index + 1,
                    line: raw.to_string(),
                });
            };
            let key = key.trim().to_string();
            let value = convert_value(value.trim());

            let target = if self.flat {
                &mut document
            } else {
                match document
                    .entry(section.clone())
                    .or_insert_with(|| Value::Object(Map::new()))
                {
                    Value::Object(map) => map,
                    // Sections are only ever created as objects above
                    _ => continue,
                }
            };
            if self.special_keys.contains(&key) {
                match target.entry(key).or_insert_with(|| Value::Array(Vec::new())) {
                    Value::Array(items) => items.push(value),
                    other => *other = Value::Array(vec![other.take(), value]),
                }
            } else {
                let _ = target.insert(key, value);
            }
        }
        Ok(document)
    }
}

/// Convert a raw INI value to its typed JSON form
#[must_use]
pub fn convert_value(raw: &str) -> Value {
    let lower = raw.to_ascii_lowercase();
    match lower.as_str() {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        "inf" | "+inf" => return Value::String("+Inf".to_string()),
        "-inf" => return Value::String("-Inf".to_string()),
        _ => {}
    }
    if let Ok(int) = raw.parse::<i64>() {
        return Value::Number(int.into());
    }
    if let Ok(float) = raw.parse::<f64>() {
        if let Some(number) = Number::from_f64(float).filter(|_| float.is_finite()) {
            return Value::Number(number);
        }
    }
    Value::String(raw.to_string())
}

#[derive(Debug, Clone, Default)]
pub struct IniWriter {
    special_keys: Vec<String>,
}

impl IniWriter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_special_keys(mut self, keys: &[String]) -> Self {
        self.special_keys = keys.to_vec();
        self
    }

    /// Serialize a document; scalar top-level entries are written before
    /// any section so that flat files survive a round trip.
    #[must_use]
    pub fn write_str(&self, document: &Map<String, Value>) -> String {
        let mut out = String::new();
        for (key, value) in document.iter().filter(|(_, v)| !v.is_object()) {
            self.write_entry(&mut out, key, value);
        }
        for (name, section) in document {
            let Value::Object(entries) = section else {
                continue;
            };
            out.push_str(&format!("[{name}]\n"));
            for (key, value) in entries {
                self.write_entry(&mut out, key, value);
            }
            out.push('\n');
        }
        out
    }

    fn write_entry(&self, out: &mut String, key: &str, value: &Value) {
        match value {
            Value::Array(items) if self.special_keys.iter().any(|k| k == key) => {
                for item in items {
                    out.push_str(&format!("{key} = {}\n", render_value(item)));
                }
            }
            _ => out.push_str(&format!("{key} = {}\n", render_value(value))),
        }
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items.iter().map(render_value).collect::<Vec<_>>().join(", "),
        Value::Object(_) => value.to_string(),
    }
}
