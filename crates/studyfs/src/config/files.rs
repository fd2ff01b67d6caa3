// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Parse a [`StudySnapshot`] from the files of a study.
//!
//! The study can be a directory or a `.zip` archive of one. Output runs are
//! read from the output directory, each run being a directory or a `.zip`.

use crate::archive;
use crate::config::cluster::{parse_renewables, parse_st_storages, parse_thermals};
use crate::config::model::{
    Area, BindingConstraint, BindingConstraintFrequency, DistrictSet, EnrModelling, Link,
    Simulation, SimulationMode,
};
use crate::config::{StudyConfig, StudySnapshot, transform_name_to_id};
use crate::error::{Error, Result};
use crate::frequency::extract_filtering;
use crate::ini_format::IniReader;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Keys of `parameters.ini` that may repeat
pub const PARAMETERS_SPECIAL_KEYS: [&str; 5] = [
    "playlist_year_weight",
    "playlist_year +",
    "playlist_year -",
    "select_var -",
    "select_var +",
];

/// Keys of `sets.ini` that may repeat
pub const SETS_SPECIAL_KEYS: [&str; 2] = ["+", "-"];

static SIMULATION_NAME: LazyLock<std::result::Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^(\d{8}-\d{4})(eco|adq)-?(.*)"));

/// Where study files are read from
#[derive(Debug, Clone)]
pub enum StudySource {
    Directory(PathBuf),
    Archive(PathBuf),
}

impl StudySource {
    #[must_use]
    pub fn for_path(path: &Path) -> Self {
        if path.extension().is_some_and(|ext| ext == "zip") && path.is_file() {
            StudySource::Archive(path.to_path_buf())
        } else {
            StudySource::Directory(path.to_path_buf())
        }
    }

    fn root(&self) -> &Path {
        match self {
            StudySource::Directory(path) | StudySource::Archive(path) => path,
        }
    }

    /// Read a file, `None` when it does not exist
    pub fn read(&self, relative: &str) -> Result<Option<Vec<u8>>> {
        match self {
            StudySource::Directory(root) => match std::fs::read(root.join(relative)) {
                Ok(content) => Ok(Some(content)),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
                Err(err) => Err(err.into()),
            },
            StudySource::Archive(archive) => archive::read_member(archive, relative),
        }
    }

    pub fn exists(&self, relative: &str) -> Result<bool> {
        match self {
            StudySource::Directory(root) => Ok(root.join(relative).exists()),
            StudySource::Archive(archive) => archive::member_exists(archive, relative),
        }
    }

    /// Parse an INI file; a missing file reads as an empty document
    pub fn read_ini(&self, relative: &str, reader: &IniReader) -> Result<Map<String, Value>> {
        let Some(content) = self.read(relative)? else {
            return Ok(Map::new());
        };
        let text = String::from_utf8_lossy(&content);
        reader
            .read_str(&text)
            .map_err(|err| Error::ini_parse("IniFile", self.root().join(relative), err.to_string()))
    }
}

/// Build the configuration of the study at `study_path`.
///
/// Output runs are read from `output_path`, `<study>/output` by default.
pub fn build(study_path: &Path, study_id: &str, output_path: Option<&Path>) -> Result<StudyConfig> {
    let source = StudySource::for_path(study_path);
    let output_path = output_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| study_path.join("output"));

    let version = parse_version(&source)?;
    let general = source.read_ini("settings/generaldata.ini", &IniReader::new())?;
    let output = section(&general, "output");
    let store_new_set = output
        .and_then(|o| o.get("storenewset"))
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let archive_input_series = output
        .and_then(|o| o.get("archives"))
        .map(value_as_string)
        .map(|archives| {
            archives
                .split(',')
                .map(str::trim)
                .filter(|e| !e.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    let enr_modelling = section(&general, "other preferences")
        .and_then(|o| o.get("renewable-generation-modelling"))
        .map(|v| EnrModelling::parse(&value_as_string(v)))
        .unwrap_or_default();

    let areas = parse_areas(&source, version)?;
    let sets = parse_sets(&source)?;
    let bindings = parse_bindings(&source)?;
    let outputs = match source {
        StudySource::Directory(_) => parse_outputs(&output_path)?,
        StudySource::Archive(_) => BTreeMap::new(),
    };

    diagnostics::log_debug!(
        "Parsed study {study_id}: version {version}, {areas} areas, {outputs} outputs",
        study_id: study_id,
        version: version,
        areas: areas.len(),
        outputs: outputs.len()
    );

    let snapshot = StudySnapshot {
        study_id: study_id.to_string(),
        version,
        output_path: Some(output_path),
        areas,
        sets,
        outputs,
        bindings,
        store_new_set,
        archive_input_series,
        enr_modelling,
        cache: BTreeMap::new(),
    };
    Ok(StudyConfig::new(study_path.to_path_buf(), snapshot))
}

fn section<'a>(document: &'a Map<String, Value>, name: &str) -> Option<&'a Map<String, Value>> {
    document.get(name).and_then(Value::as_object)
}

fn value_as_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Format version from `study.antares`; `9.2` style versions map to 920
pub fn parse_version(source: &StudySource) -> Result<i32> {
    let document = source.read_ini("study.antares", &IniReader::new())?;
    let version = section(&document, "antares").and_then(|s| s.get("version"));
    Ok(version.map_or(-1, version_number))
}

fn version_number(value: &Value) -> i32 {
    match value {
        Value::Number(n) => match n.as_i64() {
            Some(v) => i32::try_from(v).unwrap_or(-1),
            None => n.as_f64().map_or(-1, |f| (f * 100.0).round() as i32),
        },
        Value::String(s) => {
            let mut parts = s.trim().splitn(2, '.');
            let major = parts.next().and_then(|p| p.parse::<i32>().ok());
            let minor = parts.next().map_or(Some(0), |p| p.parse::<i32>().ok());
            match (major, minor) {
                (Some(major), Some(minor)) => major * 100 + minor * 10,
                _ => -1,
            }
        }
        _ => -1,
    }
}

fn parse_areas(source: &StudySource, version: i32) -> Result<BTreeMap<String, Area>> {
    let list = source.read("input/areas/list.txt")?.unwrap_or_default();
    let mut areas = BTreeMap::new();
    for name in String::from_utf8_lossy(&list).lines() {
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        let id = transform_name_to_id(name, true);
        let area = parse_area(source, version, &id, name)?;
        let _ = areas.insert(id, area);
    }
    Ok(areas)
}

fn parse_area(source: &StudySource, version: i32, id: &str, name: &str) -> Result<Area> {
    let reader = IniReader::new();
    let optimization = source.read_ini(&format!("input/areas/{id}/optimization.ini"), &reader)?;
    let filtering = section(&optimization, "filtering");

    let thermals = parse_thermals(&source.read_ini(&format!("input/thermal/clusters/{id}/list.ini"), &reader)?);
    let renewables = if version >= crate::config::cluster::RENEWABLE_MIN_VERSION {
        parse_renewables(
            version,
            &source.read_ini(&format!("input/renewables/clusters/{id}/list.ini"), &reader)?,
        )
    } else {
        Vec::new()
    };
    let st_storages = if version >= crate::config::cluster::ST_STORAGE_MIN_VERSION {
        parse_st_storages(
            version,
            &source.read_ini(&format!("input/st-storage/clusters/{id}/list.ini"), &reader)?,
        )
    } else {
        Vec::new()
    };

    Ok(Area {
        name: name.to_string(),
        links: parse_links(source, id)?,
        thermals,
        renewables,
        st_storages,
        filters_synthesis: extract_filtering(filtering.and_then(|f| f.get("filter-synthesis"))),
        filters_year: extract_filtering(filtering.and_then(|f| f.get("filter-year-by-year"))),
    })
}

fn parse_links(source: &StudySource, area: &str) -> Result<BTreeMap<String, Link>> {
    let properties = source.read_ini(
        &format!("input/links/{area}/properties.ini"),
        &IniReader::new(),
    )?;
    Ok(properties
        .iter()
        .map(|(link, values)| {
            (
                link.clone(),
                Link {
                    filters_synthesis: extract_filtering(values.get("filter-synthesis")),
                    filters_year: extract_filtering(values.get("filter-year-by-year")),
                },
            )
        })
        .collect())
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items.iter().map(value_as_string).collect(),
        Some(Value::Null) | None => Vec::new(),
        Some(other) => vec![value_as_string(other)],
    }
}

fn parse_sets(source: &StudySource) -> Result<BTreeMap<String, DistrictSet>> {
    let reader = IniReader::new().with_special_keys(SETS_SPECIAL_KEYS);
    let document = source.read_ini("input/areas/sets.ini", &reader)?;
    Ok(document
        .iter()
        .map(|(name, item)| (transform_name_to_id(name, true), parse_set(item)))
        .collect())
}

/// One `sets.ini` section; `apply-filter = add-all` makes the set the
/// complement of its `-` entries.
pub fn parse_set(item: &Value) -> DistrictSet {
    let inverted_set = item
        .get("apply-filter")
        .is_some_and(|filter| filter.as_str() == Some("add-all"));
    let members = if inverted_set { "-" } else { "+" };
    let mut set = DistrictSet {
        name: item.get("caption").map(value_as_string),
        inverted_set,
        areas: string_list(item.get(members)),
        output: item.get("output").and_then(Value::as_bool).unwrap_or(true),
        ..DistrictSet::default()
    };
    if let Some(filters) = item.get("filter-synthesis") {
        set.filters_synthesis = extract_filtering(Some(filters));
    }
    if let Some(filters) = item.get("filter-year-by-year") {
        set.filters_year = extract_filtering(Some(filters));
    }
    set
}

fn parse_bindings(source: &StudySource) -> Result<Vec<BindingConstraint>> {
    let document = source.read_ini(
        "input/bindingconstraints/bindingconstraints.ini",
        &IniReader::new(),
    )?;
    let mut bindings = Vec::with_capacity(document.len());
    for (section, bind) in &document {
        let Some(values) = bind.as_object() else {
            continue;
        };
        let id = values
            .get("id")
            .map(value_as_string)
            .unwrap_or_else(|| section.clone());
        let time_step = values
            .get("type")
            .and_then(Value::as_str)
            .and_then(BindingConstraintFrequency::parse)
            .unwrap_or_default();
        let mut areas = BTreeSet::new();
        let mut clusters = BTreeSet::new();
        for key in values.keys() {
            if let Some((from, to)) = key.split_once('%') {
                let _ = areas.insert(from.to_string());
                let _ = areas.insert(to.to_string());
            } else if let Some((area, _)) = key.split_once('.') {
                let _ = clusters.insert(key.clone());
                let _ = areas.insert(area.to_string());
            }
        }
        bindings.push(BindingConstraint {
            id,
            areas,
            clusters,
            time_step,
        });
    }
    Ok(bindings)
}

/// Read every output run below `output_path`, skipping unreadable ones
pub fn parse_outputs(output_path: &Path) -> Result<BTreeMap<String, Simulation>> {
    let mut outputs = BTreeMap::new();
    let entries = match std::fs::read_dir(output_path) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(outputs),
        Err(err) => return Err(err.into()),
    };
    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .collect();
    paths.sort();

    for path in paths {
        let Some(file_name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };
        if file_name.starts_with('~') || file_name.ends_with(".tmp") {
            continue;
        }
        let (source, name, archived) = if path.is_file() {
            let Some(stem) = file_name.strip_suffix(".zip") else {
                continue;
            };
            (StudySource::Archive(path.clone()), stem.to_string(), true)
        } else {
            (StudySource::Directory(path.clone()), file_name.clone(), false)
        };
        if !source.exists("about-the-study/parameters.ini")? {
            continue;
        }
        match parse_simulation(&source, &name) {
            Ok(mut simulation) => {
                simulation.archived = archived;
                let _ = outputs.insert(name, simulation);
            }
            Err(err) => {
                let reason = err.to_string();
                diagnostics::log_warn!(
                    "Skipping output {name}: {reason}",
                    name: name.as_str(),
                    reason: reason
                );
            }
        }
    }
    Ok(outputs)
}

/// Parse one output run named like `20201014-1422eco-hello`
pub fn parse_simulation(source: &StudySource, name: &str) -> Result<Simulation> {
    let path = source.root().to_path_buf();
    let captures = SIMULATION_NAME
        .as_ref()
        .ok()
        .and_then(|re| re.captures(name))
        .ok_or_else(|| Error::simulation_parsing(&path, format!("unexpected run name '{name}'")))?;
    let date = captures.get(1).map_or("", |m| m.as_str()).to_string();
    let mode = captures
        .get(2)
        .and_then(|m| SimulationMode::from_abbreviation(m.as_str()))
        .ok_or_else(|| Error::simulation_parsing(&path, "unknown simulation mode"))?;
    let run_name = captures.get(3).map_or("", |m| m.as_str()).to_string();
    if chrono::NaiveDateTime::parse_from_str(&date, "%Y%m%d-%H%M").is_err() {
        return Err(Error::simulation_parsing(&path, format!("invalid date '{date}'")));
    }

    let reader = IniReader::new().with_special_keys(PARAMETERS_SPECIAL_KEYS);
    let parameters = source
        .read_ini("about-the-study/parameters.ini", &reader)
        .map_err(|err| Error::simulation_parsing(&path, err.to_string()))?;
    let general = section(&parameters, "general")
        .ok_or_else(|| Error::simulation_parsing(&path, "missing [general] section"))?;
    let nbyears = general
        .get("nbyears")
        .and_then(Value::as_u64)
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| Error::simulation_parsing(&path, "missing nbyears"))?;
    let by_year = general
        .get("year-by-year")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let synthesis = section(&parameters, "output")
        .and_then(|o| o.get("synthesis"))
        .and_then(Value::as_bool)
        .unwrap_or(false);

    let xpansion = match parse_xpansion_version(source, &path) {
        Ok(version) => version,
        Err(err) => {
            let reason = err.to_string();
            diagnostics::log_warn!("Ignoring xpansion output: {reason}", reason: reason);
            String::new()
        }
    };

    Ok(Simulation {
        name: run_name,
        date,
        mode,
        nbyears,
        synthesis,
        by_year,
        error: !source.exists("checkIntegrity.txt")?,
        playlist: get_playlist(&parameters),
        archived: false,
        xpansion,
    })
}

fn parse_xpansion_version(source: &StudySource, path: &Path) -> Result<String> {
    let Some(content) = source.read("expansion/out.json")? else {
        return Ok(String::new());
    };
    let out: Value = serde_json::from_slice(&content)
        .map_err(|err| Error::xpansion_parsing(path.join("expansion/out.json"), err.to_string()))?;
    out.pointer("/antares_xpansion/version")
        .map(value_as_string)
        .ok_or_else(|| {
            Error::xpansion_parsing(path.join("expansion/out.json"), "missing antares_xpansion.version")
        })
}

/// Monte-Carlo years selected by a user playlist, 1-based
#[must_use]
pub fn get_playlist(parameters: &Map<String, Value>) -> Option<Vec<u32>> {
    let general = section(parameters, "general")?;
    if !general
        .get("user-playlist")
        .and_then(Value::as_bool)
        .unwrap_or(false)
    {
        return None;
    }
    let nbyears = general.get("nbyears").and_then(Value::as_u64).unwrap_or(0);
    let empty = Map::new();
    let playlist = section(parameters, "playlist").unwrap_or(&empty);
    let reset = playlist
        .get("playlist_reset")
        .and_then(Value::as_bool)
        .unwrap_or(true);
    let years = |key: &str| -> Vec<u64> {
        match playlist.get(key) {
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_u64).collect(),
            Some(value) => value.as_u64().into_iter().collect(),
            None => Vec::new(),
        }
    };
    let removed = years("playlist_year -");
    let selected: Vec<u64> = if reset {
        (0..nbyears).collect()
    } else {
        years("playlist_year +")
    };
    Some(
        selected
            .into_iter()
            .filter(|year| !removed.contains(year))
            .filter_map(|year| u32::try_from(year + 1).ok())
            .collect(),
    )
}
