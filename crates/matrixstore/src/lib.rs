// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Local content-addressed matrix store.
//!
//! Matrices externalized by `normalize()` land under
//! `<root>/_matrices/<sha256>.tsv` and are addressed as `matrix://<sha256>`.

pub mod error;
pub mod local;

pub use error::StoreError;
pub use local::LocalMatrixStore;

use std::sync::Arc;
use studyfs::{Context, LockProvider};

/// Node context backed by `store`, resolving `matrix://` links against it
#[must_use]
pub fn store_context(store: LocalMatrixStore, locks: Arc<dyn LockProvider>) -> Context {
    Context::with_store(Arc::new(store), locks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use studyfs::matrix::MatrixData;
    use studyfs::{Content, MemoryLocks};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_links_resolve_against_local_store() {
        let dir = TempDir::new().unwrap();
        let store = LocalMatrixStore::open(dir.path()).unwrap();
        let context = store_context(store, Arc::new(MemoryLocks::new()));

        let matrix = MatrixData::from_rows(vec![vec![1.0, 2.5]]);
        let id = context.store.create(matrix).await.unwrap();
        let uri = context.resolver.build_matrix_uri(&id);
        assert_eq!(uri, format!("matrix://{id}"));
        assert_eq!(
            context.resolver.resolve(&uri, true).await.unwrap(),
            Some(Content::Json(json!({"index": [0], "columns": [0, 1], "data": [[1, 2.5]]})))
        );
    }
}
