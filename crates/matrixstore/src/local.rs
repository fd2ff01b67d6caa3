// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! On-disk matrix store: one full-precision TSV file per content id.

use crate::error::{Result, StoreError};
use async_trait::async_trait;
use std::io::Write;
use std::path::{Path, PathBuf};
use studyfs::matrix::MatrixData;
use studyfs::store::{MatrixStore, content_id};

/// Directory below the store root holding the payloads
pub const MATRICES_DIR: &str = "_matrices";

/// Payload path of matrix `id` under `root`
#[must_use]
pub fn matrix_path(root: &Path, id: &str) -> PathBuf {
    root.join(MATRICES_DIR).join(format!("{id}.tsv"))
}

fn check_id(id: &str) -> Result<()> {
    if !id.is_empty() && id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()) {
        Ok(())
    } else {
        Err(StoreError::InvalidId(id.to_string()))
    }
}

/// Matrix of an exact TSV payload. Columns written as integers read back
/// as integer columns.
pub fn parse_exact(path: &Path, text: &str) -> Result<MatrixData> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .from_reader(text.as_bytes());

    let mut data = Vec::new();
    let mut integer_columns: Vec<bool> = Vec::new();
    for record in reader.records() {
        let record = record?;
        let line = record.position().map_or(data.len() + 1, |pos| pos.line() as usize);
        let mut row = Vec::with_capacity(record.len());
        for (col, cell) in record.iter().enumerate() {
            let value = cell
                .parse::<f64>()
                .map_err(|err| StoreError::corrupt(path, line, err.to_string()))?;
            let integer = cell.parse::<i64>().is_ok();
            match integer_columns.get_mut(col) {
                Some(flag) => *flag &= integer,
                None => integer_columns.push(integer),
            }
            row.push(value);
        }
        data.push(row);
    }
    Ok(MatrixData::typed(data, integer_columns))
}

/// Content-addressed store rooted at a local directory
#[derive(Debug, Clone)]
pub struct LocalMatrixStore {
    root: PathBuf,
}

impl LocalMatrixStore {
    /// Open (creating if needed) the store at `root`
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(root.join(MATRICES_DIR))?;
        Ok(Self { root })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Identifiers of every stored matrix, sorted
    pub async fn ids(&self) -> Result<Vec<String>> {
        let mut ids = Vec::new();
        let mut entries = tokio::fs::read_dir(self.root.join(MATRICES_DIR)).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if let Some(id) = name.strip_suffix(".tsv") {
                ids.push(id.to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }

    async fn store(&self, matrix: MatrixData) -> Result<String> {
        let id = content_id(&matrix)?;
        let path = matrix_path(&self.root, &id);
        if tokio::fs::try_exists(&path).await? {
            return Ok(id);
        }

        let tsv = matrix.to_exact_tsv()?;
        let dir = self.root.join(MATRICES_DIR);
        tokio::task::spawn_blocking(move || -> Result<()> {
            let mut file = tempfile::NamedTempFile::new_in(&dir)?;
            file.write_all(tsv.as_bytes())?;
            file.as_file().sync_all()?;
            let _ = file.persist(&path)?;
            Ok(())
        })
        .await
        .map_err(|err| StoreError::Io(std::io::Error::other(err)))??;

        diagnostics::log_debug!("Stored matrix {id}", id: id.as_str());
        Ok(id)
    }

    async fn load(&self, id: &str) -> Result<Option<MatrixData>> {
        check_id(id)?;
        let path = matrix_path(&self.root, id);
        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        Ok(Some(parse_exact(&path, &text)?))
    }

    async fn remove(&self, id: &str) -> Result<()> {
        check_id(id)?;
        match tokio::fs::remove_file(matrix_path(&self.root, id)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[async_trait]
impl MatrixStore for LocalMatrixStore {
    async fn create(&self, matrix: MatrixData) -> studyfs::Result<String> {
        Ok(self.store(matrix).await?)
    }

    async fn get(&self, id: &str) -> studyfs::Result<Option<MatrixData>> {
        Ok(self.load(id).await?)
    }

    async fn exists(&self, id: &str) -> studyfs::Result<bool> {
        check_id(id)?;
        Ok(tokio::fs::try_exists(matrix_path(&self.root, id)).await?)
    }

    async fn delete(&self, id: &str) -> studyfs::Result<()> {
        Ok(self.remove(id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_create_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = LocalMatrixStore::open(dir.path()).unwrap();
        let data = vec![vec![1.0, 0.1], vec![3.0, 1e-7]];

        let first = store.create(MatrixData::from_rows(data.clone())).await.unwrap();
        let second = store.create(MatrixData::from_rows(data.clone())).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(store.ids().await.unwrap(), vec![first.clone()]);

        let matrix = store.get(&first).await.unwrap().unwrap();
        assert_eq!(matrix.data, data);
        assert_eq!(matrix.integer_columns, vec![true, false]);
    }

    #[tokio::test]
    async fn test_float_columns_read_back_as_floats() {
        let dir = TempDir::new().unwrap();
        let store = LocalMatrixStore::open(dir.path()).unwrap();
        let matrix = MatrixData::typed(vec![vec![1.0, 2.0], vec![3.0, 4.0]], vec![false, true]);

        let id = store.create(matrix).await.unwrap();
        let text = std::fs::read_to_string(matrix_path(dir.path(), &id)).unwrap();
        assert_eq!(text, "1.0\t2\n3.0\t4\n");

        let back = store.get(&id).await.unwrap().unwrap();
        assert_eq!(back.integer_columns, vec![false, true]);
        assert_eq!(back.to_exact_tsv().unwrap(), text);
    }

    #[tokio::test]
    async fn test_missing_and_invalid_ids() {
        let dir = TempDir::new().unwrap();
        let store = LocalMatrixStore::open(dir.path()).unwrap();
        assert!(store.get("abc123").await.unwrap().is_none());
        assert!(!store.exists("abc123").await.unwrap());
        assert!(store.get("../escape").await.is_err());
        store.delete("abc123").await.unwrap();
    }

    #[tokio::test]
    async fn test_empty_matrix() {
        let dir = TempDir::new().unwrap();
        let store = LocalMatrixStore::open(dir.path()).unwrap();
        let id = store.create(MatrixData::default()).await.unwrap();
        let matrix = store.get(&id).await.unwrap().unwrap();
        assert!(matrix.data.is_empty());
    }

    #[test]
    fn test_parse_exact_reports_line() {
        let err = parse_exact(Path::new("m.tsv"), "1\t2\n3\tx\n").unwrap_err();
        match err {
            StoreError::Corrupt { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected {other:?}"),
        }
    }
}
