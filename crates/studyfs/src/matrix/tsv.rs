// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Tab-separated records without headers or quoting.

use crate::error::{Error, Result};

/// Records of `text`, one per line holding a tab or a non-blank cell.
/// Rows may differ in width.
pub fn read_records(text: &str) -> Result<Vec<Vec<String>>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .from_reader(text.as_bytes());

    let mut records = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.len() == 1 && record[0].trim().is_empty() {
            continue;
        }
        records.push(record.iter().map(str::to_string).collect());
    }
    Ok(records)
}

/// `records` as tab-separated lines, each ending with `\n`
pub fn write_records<R, C>(records: R) -> Result<String>
where
    R: IntoIterator,
    R::Item: IntoIterator<Item = C>,
    C: AsRef<[u8]>,
{
    let mut builder = csv::WriterBuilder::new();
    builder
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .quote_style(csv::QuoteStyle::Never)
        .terminator(csv::Terminator::Any(b'\n'));
    let mut writer = builder.from_writer(Vec::new());

    for record in records {
        let cells: Vec<C> = record.into_iter().collect();
        if cells.iter().all(|cell| cell.as_ref().is_empty()) && cells.len() <= 1 {
            // An empty record is a bare line, not a quoted empty field
            let mut bytes = writer
                .into_inner()
                .map_err(|err| Error::Io(err.into_error()))?;
            bytes.push(b'\n');
            writer = builder.from_writer(bytes);
            continue;
        }
        writer.write_record(&cells)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|err| Error::Io(err.into_error()))?;
    String::from_utf8(bytes)
        .map_err(|err| Error::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, err)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_lines_are_skipped() {
        let records = read_records("1\t2\n\n  \n3\t4\t5\r\n").unwrap();
        assert_eq!(
            records,
            vec![
                vec!["1".to_string(), "2".to_string()],
                vec!["3".to_string(), "4".to_string(), "5".to_string()],
            ]
        );
    }

    #[test]
    fn test_tab_only_lines_are_records() {
        let records = read_records("\t\n\tx\n").unwrap();
        assert_eq!(records[0], vec![String::new(), String::new()]);
        assert_eq!(records[1], vec![String::new(), "x".to_string()]);
    }

    #[test]
    fn test_quotes_are_literal() {
        let records = read_records("\"a\tb\n").unwrap();
        assert_eq!(records, vec![vec!["\"a".to_string(), "b".to_string()]]);
        assert_eq!(write_records([["\"a", "b"]]).unwrap(), "\"a\tb\n");
    }

    #[test]
    fn test_ragged_rows_are_written() {
        let text = write_records(vec![vec!["", "x"], vec!["1", "2", "3"]]).unwrap();
        assert_eq!(text, "\tx\n1\t2\t3\n");
        let text = write_records(vec![vec!["1"], vec![], vec![""]]).unwrap();
        assert_eq!(text, "1\n\n\n");
        assert_eq!(write_records(Vec::<Vec<&str>>::new()).unwrap(), "");
    }
}
