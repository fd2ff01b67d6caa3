// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Result series of an output run.
//!
//! A file starts with a four-line head, followed by three header rows
//! (variable, unit, statistic) and the data rows. The first columns of
//! every row hold the date, laid out according to the frequency.

use super::{format_rows, tsv, typed_cell};
use crate::config::StudyConfig;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::frequency::MatrixFrequency;
use crate::lazy::LazyNode;
use crate::node::{Content, GetOptions, Node, report, write_file};
use crate::raw::missing_file;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::any::Any;
use std::path::Path;
use std::sync::Arc;

const MONTHS: [&str; 12] = [
    "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
];

const HEAD_LINES: usize = 4;
const HEADER_ROWS: usize = 3;

/// `JAN` -> `01`
fn month_number(name: &str) -> Option<String> {
    MONTHS
        .iter()
        .position(|m| *m == name)
        .map(|i| format!("{:02}", i + 1))
}

/// `01` -> `JAN`
fn month_name(number: &str) -> Option<&'static str> {
    let index = number.trim().parse::<usize>().ok()?;
    MONTHS.get(index.checked_sub(1)?).copied()
}

/// First lines of an output series file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeadWriter {
    Area { area: String, data_type: String },
    Link { from: String, to: String },
    BindingConstraint,
}

impl HeadWriter {
    /// Head declaring `var` variables over rows `start..=end`
    #[must_use]
    pub fn build(&self, freq: MatrixFrequency, var: usize, end: usize, start: usize) -> String {
        match self {
            HeadWriter::Area { area, data_type } => format!(
                "{}\tarea\t{data_type}\t{freq}\n\tVARIABLES\tBEGIN\tEND\n\t{var}\t{start}\t{end}\n\n",
                area.to_uppercase()
            ),
            HeadWriter::Link { from, to } => format!(
                "{}\tlink\tva\t{freq}\n{}\tVARIABLES\tBEGIN\tEND\n\t{var}\t{start}\t{end}\n\n",
                from.to_uppercase(),
                to.to_uppercase()
            ),
            HeadWriter::BindingConstraint => format!(
                "\tarea\t\t{freq}\n\tVARIABLES\tBEGIN\tEND\n\t{var}\t{start}\t{end}\n\n"
            ),
        }
    }

    fn label(&self) -> &str {
        match self {
            HeadWriter::Area { area, .. } => area,
            HeadWriter::Link { from, .. } => from,
            HeadWriter::BindingConstraint => "",
        }
    }
}

/// Date label of a row from its leading date cells
fn extract_date(freq: MatrixFrequency, cells: &[&str]) -> String {
    let cell = |i: usize| cells.get(i).copied().unwrap_or_default().trim();
    let month = |i: usize| month_number(cell(i)).unwrap_or_else(|| cell(i).to_string());
    match freq {
        MatrixFrequency::Hourly => format!("{}/{:0>2} {}", month(3), cell(2), cell(4)),
        MatrixFrequency::Daily => format!("{}/{:0>2}", month(3), cell(2)),
        MatrixFrequency::Weekly | MatrixFrequency::Annual => cell(1).to_string(),
        MatrixFrequency::Monthly => month(2),
    }
}

/// Header rows of the date columns
fn date_headers(freq: MatrixFrequency, label: &str) -> [Vec<String>; HEADER_ROWS] {
    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }
    match freq {
        MatrixFrequency::Hourly => [
            row(&[label, "hourly", "", "", ""]),
            row(&["", "", "", "", ""]),
            row(&["", "index", "day", "month", "hour"]),
        ],
        MatrixFrequency::Daily => [
            row(&[label, "daily", "", ""]),
            row(&["", "", "", ""]),
            row(&["", "index", "day", "month"]),
        ],
        MatrixFrequency::Weekly => [
            row(&[label, "weekly"]),
            row(&["", ""]),
            row(&["", "week"]),
        ],
        MatrixFrequency::Monthly => [
            row(&[label, "monthly", ""]),
            row(&["", "", ""]),
            row(&["", "index", "month"]),
        ],
        MatrixFrequency::Annual => [row(&[label, "annual"]), row(&["", ""]), row(&["", ""])],
    }
}

/// Date cells of the row at `position` (0-based) labelled `label`
fn build_date(freq: MatrixFrequency, position: usize, label: &str) -> Vec<String> {
    let index = (position + 1).to_string();
    let month = |m: &str| month_name(m).map_or_else(|| m.to_string(), str::to_string);
    match freq {
        MatrixFrequency::Hourly => {
            let (day_part, hour) = label.split_once(' ').unwrap_or((label, ""));
            let (m, d) = day_part.split_once('/').unwrap_or(("", day_part));
            vec![String::new(), index, d.to_string(), month(m), hour.to_string()]
        }
        MatrixFrequency::Daily => {
            let (m, d) = label.split_once('/').unwrap_or(("", label));
            vec![String::new(), index, d.to_string(), month(m)]
        }
        MatrixFrequency::Weekly | MatrixFrequency::Annual => vec![String::new(), label.to_string()],
        MatrixFrequency::Monthly => vec![String::new(), index, month(label)],
    }
}

/// Parse the body of an output series into `{columns, index, data}`
pub fn parse_output(freq: MatrixFrequency, text: &str) -> Result<Option<Value>> {
    let body = text.splitn(HEAD_LINES + 1, '\n').nth(HEAD_LINES).unwrap_or_default();
    let rows = tsv::read_records(body)?;
    if rows.len() < HEADER_ROWS {
        return Ok(None);
    }
    let offset = freq.date_columns();
    let width = rows.iter().map(Vec::len).max().unwrap_or(0).saturating_sub(offset);
    let header = |r: usize, c: usize| {
        rows[r]
            .get(offset + c)
            .map_or_else(String::new, |cell| cell.trim().to_string())
    };
    let columns: Vec<Value> = (0..width)
        .map(|c| json!([header(0, c), header(1, c), header(2, c)]))
        .collect();

    let mut index = Vec::new();
    let mut data = Vec::new();
    for row in &rows[HEADER_ROWS..] {
        let cells: Vec<&str> = row.iter().map(String::as_str).collect();
        index.push(Value::String(extract_date(freq, &cells)));
        data.push(
            (0..width)
                .map(|c| cells.get(offset + c).map_or(Value::Null, |cell| typed_cell(cell)))
                .collect::<Vec<_>>(),
        );
    }
    Ok(Some(json!({"columns": columns, "index": index, "data": data})))
}

/// Serialize `{columns, index, data}` back to the file layout
pub fn render_output(freq: MatrixFrequency, head: &HeadWriter, table: &Value) -> Result<String> {
    let invalid = |reason: &str| Error::invalid_data("OutputSeriesMatrix", reason);
    let columns = table
        .get("columns")
        .and_then(Value::as_array)
        .ok_or_else(|| invalid("missing columns"))?;
    let index = table
        .get("index")
        .and_then(Value::as_array)
        .ok_or_else(|| invalid("missing index"))?;
    let data: Vec<Vec<Value>> = table
        .get("data")
        .cloned()
        .map(serde_json::from_value)
        .transpose()?
        .unwrap_or_default();

    let column_label = |column: &Value, level: usize| match column {
        Value::Array(levels) => levels.get(level).map(cell_text).unwrap_or_default(),
        other if level == 0 => cell_text(other),
        _ => String::new(),
    };

    let mut records: Vec<Vec<String>> = Vec::new();
    for (level, date_header) in date_headers(freq, head.label()).into_iter().enumerate() {
        let mut cells = date_header;
        cells.extend(columns.iter().map(|column| column_label(column, level)));
        records.push(cells);
    }
    let values = format_rows(&data);
    for (position, label) in index.iter().enumerate() {
        let mut cells = build_date(freq, position, &cell_text(label));
        if let Some(values) = values.get(position) {
            cells.extend(values.iter().cloned());
        }
        records.push(cells);
    }

    let mut out = head.build(freq, columns.len(), index.len(), 1);
    out.push_str(&tsv::write_records(records)?);
    Ok(out)
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

pub struct OutputSeriesMatrix {
    context: Context,
    config: StudyConfig,
    freq: MatrixFrequency,
    head: HeadWriter,
}

impl OutputSeriesMatrix {
    #[must_use]
    pub fn new(context: &Context, config: StudyConfig, freq: MatrixFrequency, head: HeadWriter) -> Self {
        Self {
            context: context.clone(),
            config,
            freq,
            head,
        }
    }

    #[must_use]
    pub fn into_node(self) -> Node {
        Node::Lazy(Arc::new(self))
    }

    #[must_use]
    pub fn freq(&self) -> MatrixFrequency {
        self.freq
    }
}

#[async_trait]
impl LazyNode for OutputSeriesMatrix {
    fn kind(&self) -> &'static str {
        match self.head {
            HeadWriter::Area { .. } => "AreaOutputSeriesMatrix",
            HeadWriter::Link { .. } => "LinkOutputSeriesMatrix",
            HeadWriter::BindingConstraint => "BindingConstraintOutputSeriesMatrix",
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
        parse_output(self.freq, &String::from_utf8_lossy(&content))?
            .map(Content::Json)
            .ok_or_else(|| Error::invalid_data(self.kind(), "missing header rows"))
    }

    async fn dump(&self, data: Content) -> Result<()> {
        let bytes = match data {
            Content::Bytes(bytes) => bytes,
            Content::Json(Value::String(text)) => text.into_bytes(),
            Content::Json(table) => render_output(self.freq, &self.head, &table)?.into_bytes(),
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
