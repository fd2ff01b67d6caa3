// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use matrixstore::LocalMatrixStore;
use serde_json::json;
use std::path::Path;
use study::{RawStudy, Settings, StudyContext, StudyError};
use studyfs::{Content, LockProvider};
use tempfile::{TempDir, tempdir};

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn write(root: &Path, relative: &str, content: &str) -> std::io::Result<()> {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)
}

fn study_dir() -> Result<TempDir, Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let root = dir.path();
    write(root, "study.antares", "[antares]\nversion = 860\ncaption = facade\n")?;
    write(root, "settings/generaldata.ini", "[general]\nnbyears = 2\n")?;
    write(root, "input/areas/list.txt", "FR\nIT\n")?;
    write(root, "input/areas/fr/ui.ini", "[ui]\nx = 3\ny = 4\n")?;
    write(root, "input/load/series/load_fr.txt", "100\t200\n300\t400\n")?;
    Ok(dir)
}

fn context(store: &TempDir, locks: Option<&TempDir>) -> Result<StudyContext, StudyError> {
    let mut settings = Settings::with_store(store.path());
    settings.locks.dir = locks.map(|dir| dir.path().to_path_buf());
    settings.locks.retry_delay_ms = 1;
    StudyContext::from_settings(&settings)
}

#[tokio::test]
async fn test_get_save_delete_by_path() -> TestResult {
    let dir = study_dir()?;
    let store = tempdir()?;
    let locks = tempdir()?;
    let study = RawStudy::open(&context(&store, Some(&locks))?, dir.path(), "s1")?;
    assert_eq!(study.id(), "s1");
    assert_eq!(study.config().version(), 860);

    assert_eq!(
        study.get("input/areas/fr/ui/ui", -1, true).await?,
        Content::Json(json!({"x": 3, "y": 4}))
    );

    study
        .save("input/areas/fr/ui/ui/x", Content::Json(json!(7)))
        .await?;
    assert_eq!(
        study.get("/input/areas/fr/ui/ui/x/", -1, true).await?,
        Content::Json(json!(7))
    );

    study.delete("input/areas/fr/ui/ui/y").await?;
    assert_eq!(
        study.get("input/areas/fr/ui", -1, true).await?,
        Content::Json(json!({"ui": {"x": 7}}))
    );

    // Lock files stay behind unheld; a fresh provider takes them at once
    let again = context(&store, Some(&locks))?;
    for entry in std::fs::read_dir(locks.path())? {
        let name = entry?.file_name().to_string_lossy().into_owned();
        let name = name.trim_end_matches(".lock");
        let _guard = again.context.locks.acquire(name).await?;
    }
    Ok(())
}

#[tokio::test]
async fn test_matrix_reads() -> TestResult {
    let dir = study_dir()?;
    let store = tempdir()?;
    let study = RawStudy::open(&context(&store, None)?, dir.path(), "s1")?;

    assert_eq!(
        study.get_default("input/load/series/load_fr", -1).await?,
        Content::Json(json!({
            "index": [0, 1],
            "columns": [0, 1],
            "data": [[100, 200], [300, 400]]
        }))
    );
    assert!(matches!(
        study.get("input/load/series/load_fr", -1, false).await?,
        Content::Bytes(bytes) if !bytes.is_empty()
    ));
    assert_eq!(
        study.get_expanded("input/load/series", -1).await?,
        Content::Json(json!({"load_fr": "matrixfile://load_fr.txt", "load_it": "matrixfile://load_it.txt"}))
    );
    Ok(())
}

#[tokio::test]
async fn test_expanded_leaf_reads_return_references() -> TestResult {
    let dir = study_dir()?;
    let store = tempdir()?;
    let study = RawStudy::open(&context(&store, None)?, dir.path(), "s1")?;

    assert_eq!(
        study.get_expanded("input/load/series/load_fr", -1).await?,
        Content::Json(json!("matrixfile://load_fr.txt"))
    );
    assert_eq!(
        study.get_expanded("input/areas/fr/ui", -1).await?,
        Content::Json(json!("json://ui.ini"))
    );

    study.normalize().await?;
    let ids = LocalMatrixStore::open(store.path())?.ids().await?;
    assert_eq!(
        study.get_expanded("input/load/series/load_fr", -1).await?,
        Content::Json(json!(format!("matrix://{}", ids[0])))
    );

    // A link whose payload left the store is still reported by reference
    write(
        dir.path(),
        "input/load/series/load_it.txt.link",
        "matrix://0123abcd",
    )?;
    assert_eq!(
        study.get_expanded("input/load/series/load_it", -1).await?,
        Content::Json(json!("matrix://0123abcd"))
    );
    Ok(())
}

#[tokio::test]
async fn test_normalize_uses_local_store() -> TestResult {
    let dir = study_dir()?;
    let store = tempdir()?;
    let study = RawStudy::open(&context(&store, None)?, dir.path(), "s1")?;
    let before = study.get("input/load/series/load_fr", -1, true).await?;

    study.normalize().await?;
    let series = dir.path().join("input/load/series");
    assert!(series.join("load_fr.txt.link").exists());
    assert!(!series.join("load_fr.txt").exists());

    let ids = LocalMatrixStore::open(store.path())?.ids().await?;
    assert_eq!(ids.len(), 1);
    let link = std::fs::read_to_string(series.join("load_fr.txt.link"))?;
    assert!(link.contains(&ids[0]));

    assert_eq!(study.get("input/load/series/load_fr", -1, true).await?, before);

    let file = study.file_content("input/load/series/load_fr").await?;
    assert_eq!(file.filename, "load_fr.txt");
    assert_eq!(file.suffix, ".txt");

    study.denormalize().await?;
    assert!(series.join("load_fr.txt").exists());
    assert!(!series.join("load_fr.txt.link").exists());
    assert_eq!(study.get("input/load/series/load_fr", -1, true).await?, before);
    Ok(())
}

#[tokio::test]
async fn test_copy_and_rename_matrix() -> TestResult {
    let dir = study_dir()?;
    let study = RawStudy::open_in_memory(dir.path(), "s1")?;
    let series = dir.path().join("input/load/series");

    study.copy_matrix("input/load/series/load_fr", "load_it").await?;
    assert_eq!(
        std::fs::read_to_string(series.join("load_it.txt"))?,
        "100\t200\n300\t400\n"
    );

    study.rename_matrix("input/load/series/load_fr", "load_backup").await?;
    assert!(series.join("load_backup.txt").exists());
    assert!(!series.join("load_fr.txt").exists());

    let err = study
        .rename_matrix("input/areas/fr/ui", "elsewhere")
        .await
        .unwrap_err();
    assert!(matches!(err, StudyError::NotAMatrix { .. }));
    Ok(())
}

#[tokio::test]
async fn test_check_errors_by_path() -> TestResult {
    let dir = study_dir()?;
    let study = RawStudy::open_in_memory(dir.path(), "s1")?;

    let errors = study
        .check_errors("input/areas", &json!({"fr": {}, "es": {}}))
        .await?;
    assert_eq!(errors.len(), 1);
    assert!(errors[0].starts_with("key=es not in"));

    let missing = study.get("input/nowhere", -1, true).await.unwrap_err();
    assert!(matches!(missing, StudyError::Tree(studyfs::Error::ChildNotFound(_))));
    Ok(())
}

#[test]
fn test_settings_file_drives_context() -> TestResult {
    let dir = tempdir()?;
    let yaml = format!(
        "matrix_store: {}\nformatted: false\n",
        dir.path().join("store").display()
    );
    write(dir.path(), "settings.yaml", &yaml)?;

    let settings = Settings::load(dir.path().join("settings.yaml"))?;
    let ctx = StudyContext::from_settings(&settings)?;
    assert!(!ctx.formatted);
    assert!(dir.path().join("store/_matrices").is_dir());
    Ok(())
}
