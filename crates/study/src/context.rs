// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use crate::error::Result;
use crate::settings::Settings;
use matrixstore::{LocalMatrixStore, store_context};
use std::sync::Arc;
use studyfs::{Context, FileLocks, LockProvider, MemoryLocks};

/// Node context built from settings, shared by every opened study
#[derive(Clone)]
pub struct StudyContext {
    pub context: Context,
    pub formatted: bool,
}

impl StudyContext {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        diagnostics::init_diagnostics();

        let store = LocalMatrixStore::open(&settings.matrix_store)?;
        let locks: Arc<dyn LockProvider> = match &settings.locks.dir {
            Some(dir) => Arc::new(FileLocks::new(
                dir.clone(),
                settings.locks.retry_delay(),
                settings.locks.max_attempts,
            )?),
            None => Arc::new(MemoryLocks::new()),
        };

        diagnostics::log_info!(
            "Matrix store at {root}, file locks: {file_locks}",
            root: settings.matrix_store.display().to_string(),
            file_locks: settings.locks.dir.is_some()
        );

        Ok(Self {
            context: store_context(store, locks),
            formatted: settings.formatted,
        })
    }
}
