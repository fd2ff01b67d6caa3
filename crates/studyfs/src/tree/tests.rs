// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use super::file_study_tree;
use crate::archive::testing::write_archive;
use crate::config::build;
use crate::context::Context;
use crate::error::Error;
use crate::frequency::MatrixFrequency;
use crate::matrix::{InputSeriesMatrix, link_path};
use crate::node::{Content, GetOptions, Node};
use serde_json::{Value, json};
use std::path::Path;
use tempfile::TempDir;

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

fn url(path: &str) -> Vec<String> {
    path.split('/').map(str::to_string).collect()
}

const RUN: &str = "20201014-1422eco-hello";

fn create_study(version: &str) -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(
        root,
        "study.antares",
        &format!("[antares]\nversion = {version}\ncaption = test\n"),
    );
    write(root, "settings/generaldata.ini", "[general]\nnbyears = 2\n");
    write(root, "input/areas/list.txt", "FR\nDE\n");
    write(root, "input/links/de/properties.ini", "[fr]\nhurdles-cost = true\n");
    write(root, "input/load/series/load_fr.txt", "1\t2\n3\t4\n");
    write(
        root,
        "input/st-storage/clusters/fr/list.ini",
        "[Battery]\ngroup = Battery\n",
    );
    write(
        root,
        "input/bindingconstraints/bindingconstraints.ini",
        "[0]\nid = bc_1\ntype = daily\n",
    );
    write(
        root,
        &format!("output/{RUN}/about-the-study/parameters.ini"),
        "[general]\nnbyears = 3\nyear-by-year = true\n\n[output]\nsynthesis = true\n",
    );
    write(root, &format!("output/{RUN}/checkIntegrity.txt"), "");
    write(
        root,
        &format!("output/{RUN}/economy/mc-all/areas/fr/values-hourly.txt"),
        "FR\tarea\tva\thourly\n",
    );
    write(root, &format!("output/{RUN}/economy/mc-all/grid/digest.txt"), "\tdigest\n");
    write(root, &format!("output/{RUN}/economy/mc-all/grid/areas.txt"), "id\tname\nfr\tFR\n");
    write(
        root,
        &format!("output/{RUN}/economy/mc-all/links/de - fr/values-daily.txt"),
        "DE\tlink\tva\tdaily\n",
    );
    dir
}

fn tree(dir: &TempDir, context: &Context) -> Node {
    let config = build(dir.path(), "study-id", None).unwrap();
    file_study_tree(context, config)
}

fn keys(content: Content) -> Vec<String> {
    match content.into_json() {
        Value::Object(map) => map.keys().cloned().collect(),
        other => panic!("expected an object, got {other}"),
    }
}

#[tokio::test]
async fn test_root_layout() {
    let dir = create_study("860");
    let root = tree(&dir, &Context::in_memory());

    let top = root.get(&[], GetOptions::with_depth(1)).await.unwrap();
    assert_eq!(
        keys(top),
        vec!["Desktop", "input", "layers", "logs", "output", "settings", "study", "user"]
    );
    assert_eq!(
        root.get(&url("study/antares/version"), GetOptions::default())
            .await
            .unwrap(),
        Content::Json(json!(860))
    );

    let input = root.get(&url("input"), GetOptions::with_depth(1)).await.unwrap();
    let input_keys = keys(input);
    assert!(input_keys.contains(&"renewables".to_string()));
    assert!(input_keys.contains(&"st-storage".to_string()));
}

#[tokio::test]
async fn test_version_gates() {
    let dir = create_study("800");
    let root = tree(&dir, &Context::in_memory());
    let input = keys(root.get(&url("input"), GetOptions::with_depth(1)).await.unwrap());
    assert!(!input.contains(&"renewables".to_string()));
    assert!(!input.contains(&"st-storage".to_string()));

    let modulation = root.get_node(&url("input/hydro/series/fr/mod")).unwrap();
    let matrix = modulation.downcast_leaf::<InputSeriesMatrix>().unwrap();
    assert_eq!(matrix.freq(), MatrixFrequency::Daily);

    let links = keys(
        root.get(&url("input/links/de"), GetOptions::with_depth(1))
            .await
            .unwrap(),
    );
    assert_eq!(links, vec!["fr", "properties"]);

    let constraints = keys(
        root.get(&url("input/bindingconstraints"), GetOptions::with_depth(1))
            .await
            .unwrap(),
    );
    assert_eq!(constraints, vec!["bc_1", "bindingconstraints"]);
}

#[tokio::test]
async fn test_recent_version_layout() {
    let dir = create_study("870");
    let root = tree(&dir, &Context::in_memory());

    let links = keys(
        root.get(&url("input/links/de"), GetOptions::with_depth(1))
            .await
            .unwrap(),
    );
    assert_eq!(links, vec!["capacities", "fr_parameters", "properties"]);
    let capacities = keys(
        root.get(&url("input/links/de/capacities"), GetOptions::with_depth(1))
            .await
            .unwrap(),
    );
    assert_eq!(capacities, vec!["fr_direct", "fr_indirect"]);

    let constraints = keys(
        root.get(&url("input/bindingconstraints"), GetOptions::with_depth(1))
            .await
            .unwrap(),
    );
    assert_eq!(
        constraints,
        vec!["bc_1_eq", "bc_1_gt", "bc_1_lt", "bindingconstraints"]
    );
    let bc = root.get_node(&url("input/bindingconstraints/bc_1_lt")).unwrap();
    assert_eq!(
        bc.downcast_leaf::<InputSeriesMatrix>().unwrap().freq(),
        MatrixFrequency::Daily
    );
}

#[tokio::test]
async fn test_st_storage_series_defaults() {
    let dir = create_study("860");
    write(
        dir.path(),
        "input/st-storage/series/fr/battery/PMAX-injection.txt",
        "",
    );
    let root = tree(&dir, &Context::in_memory());

    let series = keys(
        root.get(&url("input/st-storage/series/fr/battery"), GetOptions::with_depth(1))
            .await
            .unwrap(),
    );
    assert_eq!(
        series,
        vec![
            "inflows",
            "lower_rule_curve",
            "pmax_injection",
            "pmax_withdrawal",
            "upper_rule_curve"
        ]
    );
    let injection = root
        .get(
            &url("input/st-storage/series/fr/battery/pmax_injection"),
            GetOptions::default(),
        )
        .await
        .unwrap()
        .into_json();
    assert_eq!(injection["data"].as_array().map(Vec::len), Some(8760));
    assert_eq!(injection["data"][0], json!([1]));
}

#[tokio::test]
async fn test_output_layout() {
    let dir = create_study("860");
    let root = tree(&dir, &Context::in_memory());
    let run = format!("output/{RUN}");

    let mode = keys(
        root.get(&url(&format!("{run}/economy")), GetOptions::with_depth(1))
            .await
            .unwrap(),
    );
    assert_eq!(mode, vec!["mc-all", "mc-ind"]);
    let years = keys(
        root.get(&url(&format!("{run}/economy/mc-ind")), GetOptions::with_depth(1))
            .await
            .unwrap(),
    );
    assert_eq!(years, vec!["00001", "00002", "00003"]);

    let mc_all = keys(
        root.get(&url(&format!("{run}/economy/mc-all")), GetOptions::with_depth(1))
            .await
            .unwrap(),
    );
    assert_eq!(mc_all, vec!["areas", "grid", "links"]);

    let area = root
        .get_node(&url(&format!("{run}/economy/mc-all/areas/fr/values-hourly")))
        .unwrap();
    assert_eq!(area.kind(), "AreaOutputSeriesMatrix");
    let digest = root
        .get_node(&url(&format!("{run}/economy/mc-all/grid/digest")))
        .unwrap();
    assert_eq!(digest.kind(), "DigestSynthesis");
    let link = root
        .get_node(&url(&format!("{run}/economy/mc-all/links/de/fr/values-daily")))
        .unwrap();
    assert_eq!(link.kind(), "LinkOutputSeriesMatrix");

    let grid = root
        .get(
            &url(&format!("{run}/economy/mc-all/grid/areas")),
            GetOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!(
        grid,
        Content::Json(json!({"columns": ["id", "name"], "data": [["fr", "FR"]]}))
    );
}

#[tokio::test]
async fn test_archived_output_is_read_only() {
    let dir = create_study("860");
    std::fs::remove_dir_all(dir.path().join(format!("output/{RUN}"))).unwrap();
    write_archive(
        &dir.path().join("output/20210101-0000adq.zip"),
        &[
            (
                "about-the-study/parameters.ini",
                b"[general]\nnbyears = 1\n\n[output]\nsynthesis = true\n",
            ),
            ("info.antares", b"[general]\nversion = 860\n"),
        ],
    );
    let root = tree(&dir, &Context::in_memory());

    let info = root
        .get(
            &url("output/20210101-0000adq/info/general/version"),
            GetOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!(info, Content::Json(json!(860)));

    let err = root
        .save(
            Content::Json(json!(870)),
            &url("output/20210101-0000adq/info/general/version"),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Archived { .. }));
}

#[tokio::test]
async fn test_normalize_whole_tree() {
    let dir = create_study("860");
    let root = tree(&dir, &Context::in_memory());
    let path = dir.path().join("input/load/series/load_fr.txt");
    let before = root
        .get(&url("input/load/series/load_fr"), GetOptions::default())
        .await
        .unwrap();

    root.normalize().await.unwrap();
    assert!(!path.exists());
    assert!(link_path(&path).exists());
    assert_eq!(
        root.get(&url("input/load/series/load_fr"), GetOptions::default())
            .await
            .unwrap(),
        before
    );

    root.denormalize().await.unwrap();
    assert!(path.exists());
    assert!(!link_path(&path).exists());
}

#[tokio::test]
async fn test_user_expansion_planned_children() {
    let dir = create_study("860");
    write(dir.path(), "user/expansion/settings.ini", "optimality_gap = 1\nmaster = integer\n");
    write(dir.path(), "user/expansion/capa/wind.txt.link", "matrix://missing");
    let root = tree(&dir, &Context::in_memory());

    assert_eq!(
        root.get(&url("user/expansion/settings.ini/optimality_gap"), GetOptions::default())
            .await
            .unwrap(),
        Content::Json(json!(1))
    );
    let capa = root.get_node(&url("user/expansion/capa/wind.txt")).unwrap();
    assert_eq!(capa.kind(), "InputSeriesMatrix");
}
