// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! External matrix store seam.
//!
//! Matrices pushed by `normalize()` are addressed by the SHA-256 of their
//! full-precision TSV form, so identical payloads share one identifier.

use crate::error::Result;
use crate::matrix::MatrixData;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use tokio::sync::Mutex;

/// Content-addressed storage of 2-D numeric payloads
#[async_trait]
pub trait MatrixStore: Send + Sync {
    /// Store `matrix` with its column types, returning its content identifier
    async fn create(&self, matrix: MatrixData) -> Result<String>;

    async fn get(&self, id: &str) -> Result<Option<MatrixData>>;

    async fn exists(&self, id: &str) -> Result<bool>;

    async fn delete(&self, id: &str) -> Result<()>;
}

/// Identifier of a payload: lowercase hex SHA-256 of its exact TSV form
pub fn content_id(matrix: &MatrixData) -> Result<String> {
    let tsv = matrix.to_exact_tsv()?;
    let mut hasher = Sha256::new();
    hasher.update(tsv.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Process-local store, for tests and throwaway trees
#[derive(Default)]
pub struct MemoryMatrixStore {
    matrices: Mutex<HashMap<String, MatrixData>>,
}

impl MemoryMatrixStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn count(&self) -> usize {
        self.matrices.lock().await.len()
    }
}

#[async_trait]
impl MatrixStore for MemoryMatrixStore {
    async fn create(&self, matrix: MatrixData) -> Result<String> {
        let id = content_id(&matrix)?;
        let stored = MatrixData::typed(matrix.data, matrix.integer_columns);
        let _ = self.matrices.lock().await.entry(id.clone()).or_insert(stored);
        Ok(id)
    }

    async fn get(&self, id: &str) -> Result<Option<MatrixData>> {
        Ok(self
            .matrices
            .lock()
            .await
            .get(id)
            .cloned())
    }

    async fn exists(&self, id: &str) -> Result<bool> {
        Ok(self.matrices.lock().await.contains_key(id))
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let _ = self.matrices.lock().await.remove(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_identical_payloads_share_an_id() {
        let store = MemoryMatrixStore::new();
        let rows = vec![vec![1.0, 2.0], vec![3.0, 4.5]];
        let a = store.create(MatrixData::from_rows(rows.clone())).await.unwrap();
        let b = store.create(MatrixData::from_rows(rows)).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert_eq!(store.count().await, 1);

        let matrix = store.get(&a).await.unwrap().unwrap();
        assert_eq!(matrix.data, vec![vec![1.0, 2.0], vec![3.0, 4.5]]);
        assert_eq!(matrix.columns.len(), 2);
        assert_eq!(matrix.integer_columns, vec![true, false]);

        store.delete(&a).await.unwrap();
        assert!(!store.exists(&a).await.unwrap());
    }

    #[tokio::test]
    async fn test_column_types_change_the_id() {
        let store = MemoryMatrixStore::new();
        let ints = store
            .create(MatrixData::typed(vec![vec![1.0]], vec![true]))
            .await
            .unwrap();
        let floats = store
            .create(MatrixData::typed(vec![vec![1.0]], vec![false]))
            .await
            .unwrap();
        assert_ne!(ints, floats);

        let matrix = store.get(&floats).await.unwrap().unwrap();
        assert_eq!(matrix.to_exact_tsv().unwrap(), "1.0\n");
    }
}
