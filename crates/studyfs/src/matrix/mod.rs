// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Tab-separated numeric matrices.
//!
//! Input matrices have no header row and no index column. On read, any
//! column holding an empty or non-numeric cell is dropped. A column whose
//! cells are all integer literals stays integer; other columns read as
//! floats and are written back with six decimals. An empty matrix is a
//! zero-byte file.

pub mod defaults;
pub mod input_series;
pub mod output_series;
pub mod synthesis;
pub mod tsv;


pub use input_series::InputSeriesMatrix;
pub use output_series::{HeadWriter, OutputSeriesMatrix};
pub use synthesis::{OutputSynthesis, SynthesisLayout};

use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value, json};
use std::path::{Path, PathBuf};

/// Split-orient numeric table: `{index, columns, data}`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MatrixData {
    #[serde(default)]
    pub index: Vec<Value>,
    #[serde(default)]
    pub columns: Vec<Value>,
    #[serde(default)]
    pub data: Vec<Vec<f64>>,
    /// Per column, whether every source cell was an integer literal
    #[serde(skip)]
    pub integer_columns: Vec<bool>,
}

impl MatrixData {
    /// Table with positional index and columns; whole-valued columns are integer
    #[must_use]
    pub fn from_rows(data: Vec<Vec<f64>>) -> Self {
        let width = data.iter().map(Vec::len).max().unwrap_or(0);
        let integer_columns = (0..width)
            .map(|col| {
                data.iter()
                    .all(|row| row.get(col).is_none_or(|v| is_whole(*v)))
            })
            .collect();
        Self::typed(data, integer_columns)
    }

    /// Table with positional index and columns and explicit column types
    #[must_use]
    pub fn typed(data: Vec<Vec<f64>>, integer_columns: Vec<bool>) -> Self {
        let width = data.first().map_or(0, Vec::len);
        Self {
            index: (0..data.len()).map(|i| json!(i)).collect(),
            columns: (0..width).map(|i| json!(i)).collect(),
            data,
            integer_columns,
        }
    }

    /// Split-orient JSON table; a column is integer when all its numbers are
    pub fn from_json(value: Value) -> Result<Self> {
        let rows = value
            .get("data")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let mut matrix: Self = serde_json::from_value(value)?;
        let width = matrix.data.iter().map(Vec::len).max().unwrap_or(0);
        matrix.integer_columns = (0..width)
            .map(|col| {
                rows.iter().all(|row| {
                    row.get(col)
                        .is_none_or(|cell| cell.is_i64() || cell.is_u64())
                })
            })
            .collect();
        Ok(matrix)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.iter().all(Vec::is_empty)
    }

    fn is_integer(&self, col: usize) -> bool {
        self.integer_columns.get(col).copied().unwrap_or(false)
    }

    #[must_use]
    pub fn to_json(&self) -> Value {
        json!({
            "index": self.index,
            "columns": self.columns,
            "data": json_rows(self),
        })
    }

    /// Lossless TSV, the storage form of externalized matrices.
    ///
    /// Integer columns are written as integers and float columns in their
    /// shortest round-trip form, which always carries a `.` or an exponent.
    pub fn to_exact_tsv(&self) -> Result<String> {
        tsv::write_records(self.data.iter().map(|row| {
            row.iter()
                .enumerate()
                .map(|(col, v)| {
                    if self.is_integer(col) {
                        format!("{}", *v as i64)
                    } else {
                        format!("{v:?}")
                    }
                })
                .collect::<Vec<_>>()
        }))
    }
}

fn is_whole(v: f64) -> bool {
    v.fract() == 0.0 && v.abs() < 9.0e15
}

/// Rows of a table as JSON numbers, integer columns as JSON integers
#[must_use]
pub fn json_rows(matrix: &MatrixData) -> Vec<Vec<Value>> {
    matrix
        .data
        .iter()
        .map(|row| {
            row.iter()
                .enumerate()
                .map(|(col, v)| {
                    if matrix.is_integer(col) && is_whole(*v) {
                        Value::Number(Number::from(*v as i64))
                    } else {
                        float_value(*v)
                    }
                })
                .collect()
        })
        .collect()
}

fn float_value(v: f64) -> Value {
    Number::from_f64(v).map_or(Value::Null, Value::Number)
}

/// A text cell as a JSON integer or float following its literal, else trimmed text
pub(crate) fn typed_cell(cell: &str) -> Value {
    let cell = cell.trim();
    if let Ok(v) = cell.parse::<i64>() {
        return Value::Number(Number::from(v));
    }
    match cell.parse::<f64>() {
        Ok(v) if v.is_finite() => float_value(v),
        _ => Value::String(cell.to_string()),
    }
}

/// Parse TSV text into a numeric table, dropping columns with any
/// missing or unparseable cell. Returns `None` for empty content.
pub fn parse_tsv(text: &str) -> Result<Option<MatrixData>> {
    let records = tsv::read_records(text)?;
    if records.is_empty() {
        return Ok(None);
    }
    let cells: Vec<Vec<Option<(f64, bool)>>> = records
        .iter()
        .map(|record| {
            record
                .iter()
                .map(|cell| {
                    let cell = cell.trim();
                    let value = cell.parse::<f64>().ok().filter(|v| v.is_finite())?;
                    Some((value, cell.parse::<i64>().is_ok()))
                })
                .collect()
        })
        .collect();

    let width = cells.iter().map(Vec::len).max().unwrap_or(0);
    let kept: Vec<usize> = (0..width)
        .filter(|col| cells.iter().all(|row| row.get(*col).copied().flatten().is_some()))
        .collect();
    let cell = |row: &Vec<Option<(f64, bool)>>, col: usize| row.get(col).copied().flatten();
    let data = cells
        .iter()
        .map(|row| {
            kept.iter()
                .map(|col| cell(row, *col).map_or(0.0, |(v, _)| v))
                .collect()
        })
        .collect::<Vec<Vec<f64>>>();
    let integer_columns = kept
        .iter()
        .map(|col| cells.iter().all(|row| cell(row, *col).is_some_and(|(_, int)| int)))
        .collect();

    Ok(Some(MatrixData {
        index: (0..cells.len()).map(|i| json!(i)).collect(),
        columns: kept.iter().map(|c| json!(c)).collect(),
        data,
        integer_columns,
    }))
}

/// Serialize JSON rows as TSV, per-column integer or `%.6f` formatting.
/// Returns an empty string for an empty table.
pub fn dump_tsv(rows: &[Vec<Value>]) -> Result<String> {
    tsv::write_records(format_rows(rows))
}

/// Text cells of `rows`. A column made only of integers keeps them, any
/// other numeric column is written with six decimals.
#[must_use]
pub fn format_rows(rows: &[Vec<Value>]) -> Vec<Vec<String>> {
    if rows.iter().all(Vec::is_empty) {
        return Vec::new();
    }
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    let integer_columns: Vec<bool> = (0..width)
        .map(|col| {
            rows.iter()
                .all(|row| row.get(col).is_none_or(|v| v.is_i64() || v.is_u64()))
        })
        .collect();
    rows.iter()
        .map(|row| {
            row.iter()
                .enumerate()
                .map(|(col, value)| format_cell(value, integer_columns[col]))
                .collect()
        })
        .collect()
}

fn format_cell(value: &Value, integer: bool) -> String {
    match value {
        Value::Number(n) if integer => n.to_string(),
        Value::Number(n) => format!("{:.6}", n.as_f64().unwrap_or_default()),
        Value::String(s) => s.clone(),
        Value::Bool(b) => u8::from(*b).to_string(),
        _ => String::new(),
    }
}


/// Whether a matrix currently lives on disk or behind a link file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatrixState {
    Physical(PathBuf),
    Linked(PathBuf),
}

impl MatrixState {
    /// Inspect the disk; `None` when neither form exists
    pub async fn detect(path: &Path) -> std::io::Result<Option<Self>> {
        let link = link_path(path);
        if tokio::fs::try_exists(&link).await? {
            return Ok(Some(MatrixState::Linked(link)));
        }
        if tokio::fs::try_exists(path).await? {
            return Ok(Some(MatrixState::Physical(path.to_path_buf())));
        }
        Ok(None)
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            MatrixState::Physical(path) | MatrixState::Linked(path) => path,
        }
    }
}

/// `<path>.link`, the pointer file replacing an externalized matrix
#[must_use]
pub fn link_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".link");
    PathBuf::from(name)
}
