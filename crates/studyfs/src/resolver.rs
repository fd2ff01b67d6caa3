// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! URI resolution for link files.

use crate::error::Result;
use crate::node::Content;
use crate::store::MatrixStore;
use async_trait::async_trait;
use std::sync::Arc;

/// Scheme of matrix store references
pub const MATRIX_SCHEME: &str = "matrix";

/// Turns link-file URIs into content
#[async_trait]
pub trait UriResolver: Send + Sync {
    fn build_matrix_uri(&self, id: &str) -> String;

    /// Content behind `uri`, `None` when the URI is not resolvable.
    ///
    /// `formatted` selects JSON for matrices, raw TSV bytes otherwise.
    async fn resolve(&self, uri: &str, formatted: bool) -> Result<Option<Content>>;
}

/// Resolves `matrix://<id>` against a [`MatrixStore`]
pub struct StoreUriResolver {
    store: Arc<dyn MatrixStore>,
}

impl StoreUriResolver {
    #[must_use]
    pub fn new(store: Arc<dyn MatrixStore>) -> Self {
        Self { store }
    }
}

/// Matrix id of a `matrix://<id>` URI
#[must_use]
pub fn matrix_id(uri: &str) -> Option<String> {
    let parsed = url::Url::parse(uri.trim()).ok()?;
    if parsed.scheme() != MATRIX_SCHEME {
        return None;
    }
    let id = match parsed.host_str() {
        Some(host) if !host.is_empty() => host.to_string(),
        _ => parsed.path().trim_matches('/').to_string(),
    };
    (!id.is_empty()).then_some(id)
}

#[async_trait]
impl UriResolver for StoreUriResolver {
    fn build_matrix_uri(&self, id: &str) -> String {
        format!("{MATRIX_SCHEME}://{id}")
    }

    async fn resolve(&self, uri: &str, formatted: bool) -> Result<Option<Content>> {
        let Some(id) = matrix_id(uri) else {
            return Ok(None);
        };
        let Some(matrix) = self.store.get(&id).await? else {
            return Ok(None);
        };
        Ok(Some(if formatted {
            Content::Json(matrix.to_json())
        } else {
            Content::Bytes(crate::matrix::dump_tsv(&crate::matrix::json_rows(&matrix))?.into_bytes())
        }))
    }
}
