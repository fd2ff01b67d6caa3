// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Tests for the configuration snapshot and its parser.

use crate::archive::testing::write_archive;
use crate::config::files::{StudySource, get_playlist, parse_outputs, parse_set, parse_version};
use crate::config::{
    BindingConstraintFrequency, DistrictSet, SimulationMode, StudyConfig, StudySnapshot, build,
    transform_name_to_id,
};
use crate::frequency::MatrixFrequency;
use crate::ini_format::IniReader;
use serde_json::{Value, json};
use std::path::Path;
use tempfile::TempDir;

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

const PARAMETERS: &str = "[general]\nnbyears = 3\nyear-by-year = true\nuser-playlist = false\n\n\
                          [output]\nsynthesis = true\n";

fn create_study(version: &str) -> TempDir {
    let dir = TempDir::new().expect("create temp dir");
    let root = dir.path();
    write(root, "study.antares", &format!("[antares]\nversion = {version}\ncaption = test\n"));
    write(
        root,
        "settings/generaldata.ini",
        "[output]\nstorenewset = true\narchives = load, wind\n\n\
         [other preferences]\nrenewable-generation-modelling = clusters\n",
    );
    write(root, "input/areas/list.txt", "FR\nDE\n\n");
    write(
        root,
        "input/areas/fr/optimization.ini",
        "[filtering]\nfilter-synthesis = daily, monthly\nfilter-year-by-year = hourly, weekly, annual\n",
    );
    write(
        root,
        "input/links/de/properties.ini",
        "[fr]\nfilter-synthesis = hourly\nfilter-year-by-year = annual\n",
    );
    write(
        root,
        "input/thermal/clusters/fr/list.ini",
        "[t1]\nname = t1\nenabled = true\n\n[t2]\nname = t2\nenabled = false\n",
    );
    write(
        root,
        "input/st-storage/clusters/fr/list.ini",
        "[Storage 1]\ngroup = Battery\n",
    );
    write(
        root,
        "input/renewables/clusters/de/list.ini",
        "[wind]\ngroup = Wind Onshore\n",
    );
    write(
        root,
        "input/areas/sets.ini",
        "[hello]\ncaption = Hello\noutput = true\n+ = fr\n+ = de\n\n\
         [All Others]\ncaption = all\napply-filter = add-all\n- = fr\noutput = false\n",
    );
    write(
        root,
        "input/bindingconstraints/bindingconstraints.ini",
        "[0]\nid = bc_1\ntype = daily\nde%fr = 1\nfr.t1 = 2\n",
    );
    write(root, "output/20201014-1422eco-hello/about-the-study/parameters.ini", PARAMETERS);
    write(root, "output/20201014-1422eco-hello/checkIntegrity.txt", "");
    write(root, "output/~20201014-1425eco/about-the-study/parameters.ini", PARAMETERS);
    write(root, "output/not-a-run/about-the-study/parameters.ini", PARAMETERS);
    dir
}

#[test]
fn test_transform_name_to_id() {
    assert_eq!(transform_name_to_id("Area 51!", true), "area 51");
    assert_eq!(transform_name_to_id("  $$ Hello//World ", true), "hello world");
    assert_eq!(transform_name_to_id("Storage (A&B)", false), "Storage (A&B)");
}

#[test]
fn test_build_study_config() {
    let dir = create_study("860");
    let config = build(dir.path(), "study-id", None).unwrap();
    let snapshot = config.snapshot();

    assert_eq!(config.version(), 860);
    assert_eq!(config.study_id(), "study-id");
    assert!(snapshot.store_new_set);
    assert_eq!(snapshot.archive_input_series, vec!["load", "wind"]);
    assert_eq!(snapshot.enr_modelling, crate::config::EnrModelling::Clusters);
    assert_eq!(config.area_names(), vec!["de", "fr"]);

    let fr = &snapshot.areas["fr"];
    assert_eq!(fr.name, "FR");
    assert_eq!(
        fr.filters_synthesis,
        vec![MatrixFrequency::Daily, MatrixFrequency::Monthly]
    );
    assert_eq!(
        fr.filters_year,
        vec![
            MatrixFrequency::Hourly,
            MatrixFrequency::Weekly,
            MatrixFrequency::Annual
        ]
    );
    assert_eq!(config.get_thermal_ids("fr"), vec!["t1", "t2"]);
    assert_eq!(config.get_thermal_names("fr", true), vec!["t1"]);
    assert_eq!(config.get_st_storage_ids("fr"), vec!["storage 1"]);
    assert_eq!(config.get_renewable_ids("de"), vec!["wind"]);
    assert_eq!(config.get_links("de"), vec!["fr"]);
    assert_eq!(
        config.get_filters_synthesis("de", Some("fr")),
        vec![MatrixFrequency::Hourly]
    );
    assert_eq!(
        config.get_filters_year("de", Some("fr")),
        vec![MatrixFrequency::Annual]
    );
    assert_eq!(
        config.get_filters_year("fr", None),
        vec![
            MatrixFrequency::Hourly,
            MatrixFrequency::Weekly,
            MatrixFrequency::Annual
        ]
    );
}

#[test]
fn test_st_storage_and_renewables_ignored_before_their_version() {
    let dir = create_study("800");
    let config = build(dir.path(), "old", None).unwrap();
    assert!(config.snapshot().areas["fr"].st_storages.is_empty());
    assert!(config.snapshot().areas["de"].renewables.is_empty());
}

#[test]
fn test_sets_and_bindings() {
    let dir = create_study("860");
    let config = build(dir.path(), "id", None).unwrap();
    let snapshot = config.snapshot();

    let hello = &snapshot.sets["hello"];
    assert_eq!(hello.areas, vec!["fr", "de"]);
    assert!(hello.output);
    assert!(!hello.inverted_set);
    assert_eq!(hello.name.as_deref(), Some("Hello"));

    let others = &snapshot.sets["all others"];
    assert!(others.inverted_set);
    assert_eq!(others.get_areas(&config.area_names()), vec!["de"]);
    assert_eq!(config.set_names(true), vec!["hello"]);
    assert_eq!(config.set_names(false), vec!["all others", "hello"]);

    let binding = &snapshot.bindings[0];
    assert_eq!(binding.id, "bc_1");
    assert_eq!(binding.time_step, BindingConstraintFrequency::Daily);
    assert_eq!(binding.areas.iter().collect::<Vec<_>>(), vec!["de", "fr"]);
    assert_eq!(binding.clusters.iter().collect::<Vec<_>>(), vec!["fr.t1"]);
}

#[test]
fn test_parse_set_section() {
    let doc = IniReader::new()
        .with_special_keys(["+", "-"])
        .read_str("[hello]\noutput = true\n+ = a\n+ = b\n")
        .unwrap();
    let set = parse_set(&doc["hello"]);
    assert_eq!(
        set,
        DistrictSet {
            areas: vec!["a".to_string(), "b".to_string()],
            output: true,
            inverted_set: false,
            ..DistrictSet::default()
        }
    );
}

#[test]
fn test_outputs_skip_invalid_runs() {
    let dir = create_study("860");
    let outputs = parse_outputs(&dir.path().join("output")).unwrap();
    assert_eq!(outputs.keys().collect::<Vec<_>>(), vec!["20201014-1422eco-hello"]);

    let run = &outputs["20201014-1422eco-hello"];
    assert_eq!(run.name, "hello");
    assert_eq!(run.date, "20201014-1422");
    assert_eq!(run.mode, SimulationMode::Economy);
    assert_eq!(run.nbyears, 3);
    assert!(run.by_year && run.synthesis);
    assert!(!run.error);
    assert!(!run.archived);
    assert_eq!(run.get_file(), "20201014-1422eco-hello");
    assert_eq!(run.years(), vec![1, 2, 3]);
}

#[test]
fn test_archived_output_and_xpansion() {
    let dir = create_study("860");
    write_archive(
        &dir.path().join("output/20210101-0000adq.zip"),
        &[
            ("about-the-study/parameters.ini", PARAMETERS.as_bytes()),
            ("expansion/out.json", br#"{"antares_xpansion": {"version": "1.1.0"}}"#),
        ],
    );
    let config = build(dir.path(), "id", None).unwrap();
    let run = &config.snapshot().outputs["20210101-0000adq"];
    assert!(run.archived);
    assert!(run.error);
    assert_eq!(run.mode, SimulationMode::Adequacy);
    assert_eq!(run.xpansion, "1.1.0");

    let output = config.next_file("output");
    let archived = output.next_output("20210101-0000adq");
    assert_eq!(
        archived.archive_path(),
        Some(dir.path().join("output/20210101-0000adq.zip").as_path())
    );
    let member = archived.next_file("about-the-study").next_file("parameters.ini");
    assert_eq!(
        member.archive_member().as_deref(),
        Some("about-the-study/parameters.ini")
    );
    assert!(output.next_output("20201014-1422eco-hello").archive_path().is_none());
}

#[test]
fn test_bad_xpansion_output_is_ignored() {
    let dir = create_study("860");
    write(
        dir.path(),
        "output/20201014-1422eco-hello/expansion/out.json",
        "{\"other\": 1}",
    );
    let outputs = parse_outputs(&dir.path().join("output")).unwrap();
    assert_eq!(outputs["20201014-1422eco-hello"].xpansion, "");
}

#[test]
fn test_playlist() {
    let params = |text: &str| -> serde_json::Map<String, Value> {
        IniReader::new()
            .with_special_keys(crate::config::files::PARAMETERS_SPECIAL_KEYS)
            .read_str(text)
            .unwrap()
    };
    assert_eq!(get_playlist(&params("[general]\nnbyears = 3\n")), None);
    assert_eq!(
        get_playlist(&params(
            "[general]\nnbyears = 4\nuser-playlist = true\n[playlist]\nplaylist_year - = 1\n"
        )),
        Some(vec![1, 3, 4])
    );
    assert_eq!(
        get_playlist(&params(
            "[general]\nnbyears = 4\nuser-playlist = true\n[playlist]\nplaylist_reset = false\n\
             playlist_year + = 0\nplaylist_year + = 2\n"
        )),
        Some(vec![1, 3])
    );
}

#[test]
fn test_version_formats() {
    let dir = TempDir::new().unwrap();
    let source = StudySource::Directory(dir.path().to_path_buf());
    assert_eq!(parse_version(&source).unwrap(), -1);
    write(dir.path(), "study.antares", "[antares]\nversion = 9.2\n");
    assert_eq!(parse_version(&source).unwrap(), 920);
    write(dir.path(), "study.antares", "[antares]\nversion = 870\n");
    assert_eq!(parse_version(&source).unwrap(), 870);
}

#[test]
fn test_zipped_study() {
    let dir = TempDir::new().unwrap();
    let archive = dir.path().join("study.zip");
    write_archive(
        &archive,
        &[
            ("study.antares", b"[antares]\nversion = 850\n"),
            ("input/areas/list.txt", b"North\n"),
        ],
    );
    let config = build(&archive, "zipped", None).unwrap();
    assert_eq!(config.version(), 850);
    assert_eq!(config.area_names(), vec!["north"]);
    assert!(config.snapshot().outputs.is_empty());
}

#[test]
fn test_cache_overrides_listings() {
    let mut snapshot = StudySnapshot {
        study_id: "cached".to_string(),
        version: 860,
        ..StudySnapshot::default()
    };
    let _ = snapshot
        .cache
        .insert("%areas".to_string(), vec!["x".to_string(), "y".to_string()]);
    let config = StudyConfig::new("/tmp/s".into(), snapshot);
    assert_eq!(config.area_names(), vec!["x", "y"]);

    let dir = create_study("860");
    let built = build(dir.path(), "id", None).unwrap().with_cache();
    assert_eq!(built.snapshot().cache["%areas"], vec!["de", "fr"]);
    assert_eq!(built.snapshot().cache["%thermal%fr%fr"], vec!["t1", "t2"]);
    assert_eq!(built.snapshot().cache["%links%de"], vec!["fr"]);
    assert_eq!(json!(built.get_links("de")), json!(["fr"]));
}

#[test]
fn test_relative_path() {
    let config = StudyConfig::new("/studies/s1".into(), StudySnapshot::default());
    let child = config.next_file("input").next_file("areas");
    assert_eq!(child.relative_path(), "input/areas");
    assert_eq!(config.relative_path(), "");
}
