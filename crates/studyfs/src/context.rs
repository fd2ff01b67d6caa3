// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use crate::lock::{LockProvider, MemoryLocks};
use crate::resolver::{StoreUriResolver, UriResolver};
use crate::store::{MatrixStore, MemoryMatrixStore};
use std::sync::Arc;

/// Collaborators shared by every node of a tree
#[derive(Clone)]
pub struct Context {
    pub store: Arc<dyn MatrixStore>,
    pub resolver: Arc<dyn UriResolver>,
    pub locks: Arc<dyn LockProvider>,
}

impl Context {
    #[must_use]
    pub fn new(
        store: Arc<dyn MatrixStore>,
        resolver: Arc<dyn UriResolver>,
        locks: Arc<dyn LockProvider>,
    ) -> Self {
        Self {
            store,
            resolver,
            locks,
        }
    }

    /// Store-backed resolver over `store`
    #[must_use]
    pub fn with_store(store: Arc<dyn MatrixStore>, locks: Arc<dyn LockProvider>) -> Self {
        let resolver: Arc<dyn UriResolver> = Arc::new(StoreUriResolver::new(Arc::clone(&store)));
        Self::new(store, resolver, locks)
    }

    /// Memory store and memory locks
    #[must_use]
    pub fn in_memory() -> Self {
        Self::with_store(Arc::new(MemoryMatrixStore::new()), Arc::new(MemoryLocks::new()))
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context").finish_non_exhaustive()
    }
}
