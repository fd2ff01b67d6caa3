// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Named advisory locks serializing read-modify-write cycles on one file.
//!
//! Locks are held through a [`LockGuard`] and released when it is dropped,
//! on success and on error alike.

use crate::error::{Error, Result};
use async_trait::async_trait;
use fs4::fs_std::FileExt;
use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Holds a named lock until dropped
pub struct LockGuard {
    _held: Box<dyn Send + Sync>,
}

impl LockGuard {
    fn new<T: Send + Sync + 'static>(held: T) -> Self {
        Self {
            _held: Box::new(held),
        }
    }
}

#[async_trait]
pub trait LockProvider: Send + Sync {
    /// Wait for the lock `name` and hold it until the guard drops
    async fn acquire(&self, name: &str) -> Result<LockGuard>;
}

/// Lock name of a file: study id plus its path relative to the study
#[must_use]
pub fn lock_name(study_id: &str, relative_path: &str) -> String {
    format!("{study_id}-{relative_path}")
}

type LockTable = Arc<std::sync::Mutex<HashMap<String, Arc<Mutex<()>>>>>;

/// In-process locks, one async mutex per name.
///
/// A name's entry lives while the lock is held or awaited.
#[derive(Default)]
pub struct MemoryLocks {
    locks: LockTable,
}

impl MemoryLocks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, name: &str) -> Result<Arc<Mutex<()>>> {
        let mut locks = self
            .locks
            .lock()
            .map_err(|err| Error::lock(name, err.to_string()))?;
        Ok(Arc::clone(locks.entry(name.to_string()).or_default()))
    }
}

struct MemoryHold {
    locks: LockTable,
    name: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for MemoryHold {
    fn drop(&mut self) {
        drop(self.guard.take());
        if let Ok(mut locks) = self.locks.lock() {
            if locks
                .get(&self.name)
                .is_some_and(|mutex| Arc::strong_count(mutex) == 1)
            {
                let _ = locks.remove(&self.name);
            }
        }
    }
}

#[async_trait]
impl LockProvider for MemoryLocks {
    async fn acquire(&self, name: &str) -> Result<LockGuard> {
        let mutex = self.entry(name)?;
        let guard = mutex.lock_owned().await;
        Ok(LockGuard::new(MemoryHold {
            locks: Arc::clone(&self.locks),
            name: name.to_string(),
            guard: Some(guard),
        }))
    }
}

/// Cross-process locks: an OS advisory lock on one file per name.
///
/// The lock belongs to the open file, so the kernel releases it when the
/// holder exits. Lock files stay in place; a file nobody holds is free.
/// Contended acquisitions give up after `delay * max_attempts`.
pub struct FileLocks {
    dir: PathBuf,
    timeout: Duration,
}

impl FileLocks {
    pub fn new(dir: PathBuf, delay: Duration, max_attempts: usize) -> Result<Self> {
        std::fs::create_dir_all(&dir)?;
        let attempts = u32::try_from(max_attempts).unwrap_or(u32::MAX).max(1);
        Ok(Self {
            dir,
            timeout: delay.saturating_mul(attempts),
        })
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn lock_path(&self, name: &str) -> PathBuf {
        let file: String = name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' { c } else { '_' })
            .collect();
        self.dir.join(format!("{file}.lock"))
    }
}

fn lock_exclusive(path: &Path) -> std::io::Result<File> {
    let file = std::fs::OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(path)?;
    FileExt::lock_exclusive(&file)?;
    Ok(file)
}

#[async_trait]
impl LockProvider for FileLocks {
    async fn acquire(&self, name: &str) -> Result<LockGuard> {
        let path = self.lock_path(name);
        let task = tokio::task::spawn_blocking(move || lock_exclusive(&path));

        let file = match tokio::time::timeout(self.timeout, task).await {
            Ok(joined) => joined
                .map_err(|err| Error::lock(name, err.to_string()))?
                .map_err(|err| Error::lock(name, err.to_string()))?,
            Err(_) => {
                diagnostics::log_debug!(
                    "Lock {name} still busy after {timeout_ms} ms",
                    name: name,
                    timeout_ms: self.timeout.as_millis() as u64
                );
                return Err(Error::lock(name, "held by another process"));
            }
        };
        Ok(LockGuard::new(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_memory_lock_serializes_holders() {
        let locks = Arc::new(MemoryLocks::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let mut tasks = Vec::new();
        for _ in 0..8 {
            let locks = Arc::clone(&locks);
            let inside = Arc::clone(&inside);
            tasks.push(tokio::spawn(async move {
                let _guard = locks.acquire("study-settings/generaldata.ini").await.unwrap();
                assert_eq!(inside.fetch_add(1, Ordering::SeqCst), 0);
                tokio::time::sleep(Duration::from_millis(2)).await;
                let _ = inside.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_memory_lock_entries_are_dropped() {
        let locks = MemoryLocks::new();
        let first = locks.acquire("s1-a.ini").await.unwrap();
        let _second = locks.acquire("s1-b.ini").await.unwrap();
        assert_eq!(locks.locks.lock().unwrap().len(), 2);

        drop(first);
        assert_eq!(locks.locks.lock().unwrap().len(), 1);
        assert!(locks.locks.lock().unwrap().contains_key("s1-b.ini"));
    }

    #[tokio::test]
    async fn test_file_lock_released_on_drop() {
        let dir = TempDir::new().unwrap();
        let locks = FileLocks::new(dir.path().join("locks"), Duration::from_millis(5), 3).unwrap();
        let name = lock_name("s1", "input/areas/sets.ini");

        let guard = locks.acquire(&name).await.unwrap();
        assert!(locks.lock_path(&name).exists());

        // A second holder gives up while the first holds the lock
        let err = locks.acquire(&name).await;
        assert!(matches!(err, Err(Error::Lock { .. })));

        drop(guard);
        let _again = locks.acquire(&name).await.unwrap();
    }

    #[tokio::test]
    async fn test_leftover_lock_file_is_free() {
        let dir = TempDir::new().unwrap();
        let locks = FileLocks::new(dir.path().to_path_buf(), Duration::from_millis(5), 3).unwrap();
        let name = lock_name("s1", "settings/generaldata.ini");

        // Left behind by a holder that crashed
        std::fs::write(locks.lock_path(&name), b"").unwrap();
        let _guard = locks.acquire(&name).await.unwrap();
    }
}
