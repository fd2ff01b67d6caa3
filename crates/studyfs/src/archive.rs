// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Read access to archived studies and output runs.
//!
//! Member reads extract into a [`tempfile::TempDir`] owned by the returned
//! [`ExtractedMember`]; dropping it removes the extracted copy.

use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// An archive member copied to a scoped temporary location
pub struct ExtractedMember {
    _dir: TempDir,
    path: PathBuf,
}

impl ExtractedMember {
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn open(archive: &Path) -> Result<zip::ZipArchive<File>> {
    let file = File::open(archive)?;
    Ok(zip::ZipArchive::new(file)?)
}

/// Read a member fully, `None` when the archive has no such member
pub fn read_member(archive: &Path, member: &str) -> Result<Option<Vec<u8>>> {
    let mut zip = open(archive)?;
    let mut entry = match zip.by_name(member) {
        Ok(entry) => entry,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    let mut content = Vec::with_capacity(usize::try_from(entry.size()).unwrap_or_default());
    let _ = entry.read_to_end(&mut content)?;
    Ok(Some(content))
}

pub fn member_exists(archive: &Path, member: &str) -> Result<bool> {
    let zip = open(archive)?;
    let prefix = format!("{}/", member.trim_end_matches('/'));
    Ok(zip
        .file_names()
        .any(|name| name == member || name.starts_with(&prefix)))
}

/// Direct children of `dir` inside the archive, as (name, is_directory).
///
/// Directories are inferred from member paths, so archives without
/// explicit directory entries list correctly.
pub fn list_dir(archive: &Path, dir: &str) -> Result<Vec<(String, bool)>> {
    let zip = open(archive)?;
    let prefix = if dir.is_empty() {
        String::new()
    } else {
        format!("{}/", dir.trim_end_matches('/'))
    };
    let mut children: BTreeMap<String, bool> = BTreeMap::new();
    for name in zip.file_names() {
        let Some(rest) = name.strip_prefix(&prefix) else {
            continue;
        };
        match rest.split_once('/') {
            Some((child, _)) if !child.is_empty() => {
                let _ = children.insert(child.to_string(), true);
            }
            None if !rest.is_empty() => {
                let _ = children.entry(rest.to_string()).or_insert(false);
            }
            _ => {}
        }
    }
    Ok(children.into_iter().collect())
}

/// Extract one member to a temporary directory, off the async runtime
pub async fn extract_member(archive: &Path, member: &str) -> Result<Option<ExtractedMember>> {
    let archive = archive.to_path_buf();
    let member = member.to_string();
    tokio::task::spawn_blocking(move || -> Result<Option<ExtractedMember>> {
        let Some(content) = read_member(&archive, &member)? else {
            return Ok(None);
        };
        let dir = tempfile::Builder::new().prefix("studyfs-").tempdir()?;
        let file_name = Path::new(&member)
            .file_name()
            .map_or_else(|| "member".into(), |name| name.to_os_string());
        let path = dir.path().join(file_name);
        std::fs::write(&path, content)?;
        Ok(Some(ExtractedMember { _dir: dir, path }))
    })
    .await
    .map_err(|err| Error::Io(std::io::Error::other(err)))?
}

/// Read a member without blocking the async runtime
pub async fn read_member_async(archive: &Path, member: &str) -> Result<Option<Vec<u8>>> {
    let archive = archive.to_path_buf();
    let member = member.to_string();
    tokio::task::spawn_blocking(move || read_member(&archive, &member))
        .await
        .map_err(|err| Error::Io(std::io::Error::other(err)))?
}

#[cfg(test)]
pub(crate) mod testing {
    use std::io::Write;
    use std::path::Path;

    /// Write a zip archive holding `members` (name, content)
    pub fn write_archive(path: &Path, members: &[(&str, &[u8])]) {
        let file = std::fs::File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        for (name, content) in members {
            zip.start_file(*name, zip::write::SimpleFileOptions::default())
                .unwrap();
            zip.write_all(content).unwrap();
        }
        let _ = zip.finish().unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::testing::write_archive;
    use super::*;
    use tempfile::TempDir;

    fn fixture() -> (TempDir, PathBuf) {
        let dir = TempDir::new().expect("create temp dir");
        let archive = dir.path().join("run.zip");
        write_archive(
            &archive,
            &[
                ("about-the-study/parameters.ini", b"[general]\nnbyears = 1\n"),
                ("economy/mc-all/areas/fr/values-hourly.txt", b"x"),
                ("checkIntegrity.txt", b""),
            ],
        );
        (dir, archive)
    }

    #[test]
    fn test_read_member() {
        let (_dir, archive) = fixture();
        let content = read_member(&archive, "about-the-study/parameters.ini").unwrap();
        assert_eq!(content.as_deref(), Some(&b"[general]\nnbyears = 1\n"[..]));
        assert!(read_member(&archive, "missing.txt").unwrap().is_none());
    }

    #[test]
    fn test_list_dir_infers_directories() {
        let (_dir, archive) = fixture();
        let root = list_dir(&archive, "").unwrap();
        assert_eq!(
            root,
            vec![
                ("about-the-study".to_string(), true),
                ("checkIntegrity.txt".to_string(), false),
                ("economy".to_string(), true),
            ]
        );
        let areas = list_dir(&archive, "economy/mc-all/areas").unwrap();
        assert_eq!(areas, vec![("fr".to_string(), true)]);
        assert!(member_exists(&archive, "economy/mc-all").unwrap());
        assert!(!member_exists(&archive, "adequacy").unwrap());
    }

    #[tokio::test]
    async fn test_extracted_member_is_removed_on_drop() {
        let (_dir, archive) = fixture();
        let extracted = extract_member(&archive, "about-the-study/parameters.ini")
            .await
            .unwrap()
            .unwrap();
        let path = extracted.path().to_path_buf();
        assert!(path.exists());
        drop(extracted);
        assert!(!path.exists());
    }
}
