// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Structural snapshot of a study and its per-node view.
//!
//! A [`StudySnapshot`] is parsed once from the study's INI files and shared
//! behind an `Arc`. Every node owns a [`StudyConfig`], which pairs the
//! snapshot with the node's own location. Descending into a child derives a
//! new config with [`StudyConfig::next_file`]; configs are never mutated.

pub mod cluster;
pub mod files;
pub mod model;

#[cfg(test)]
mod tests;

pub use cluster::{RenewableConfig, StStorageConfig, StStorageGroup, ThermalConfig};
pub use files::build;
pub use model::{
    Area, BindingConstraint, BindingConstraintFrequency, DistrictSet, EnrModelling, Link,
    Simulation, SimulationMode,
};

use crate::frequency::MatrixFrequency;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

static INVALID_ID_CHARS: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9_(),& -]+"));

/// Canonical name to id transform shared by areas, sets and clusters.
///
/// Runs of characters outside `[a-zA-Z0-9_(),& -]` collapse to one space,
/// the result is trimmed and optionally lower-cased.
#[must_use]
pub fn transform_name_to_id(name: &str, lower: bool) -> String {
    let replaced = match INVALID_ID_CHARS.as_ref() {
        Ok(re) => re.replace_all(name, " ").into_owned(),
        Err(_) => name.to_string(),
    };
    let trimmed = replaced.trim();
    if lower {
        trimmed.to_lowercase()
    } else {
        trimmed.to_string()
    }
}

/// Study-wide metadata shared by every node of a tree
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StudySnapshot {
    pub study_id: String,
    /// Format version, e.g. 860; -1 when `study.antares` declares none
    pub version: i32,
    pub output_path: Option<PathBuf>,
    pub areas: BTreeMap<String, Area>,
    pub sets: BTreeMap<String, DistrictSet>,
    /// Output runs keyed by folder name
    pub outputs: BTreeMap<String, Simulation>,
    pub bindings: Vec<BindingConstraint>,
    pub store_new_set: bool,
    pub archive_input_series: Vec<String>,
    pub enr_modelling: EnrModelling,
    /// Precomputed listings keyed by `%areas`, `%links%<area>`, ...
    pub cache: BTreeMap<String, Vec<String>>,
}

/// A node's view of the study: the shared snapshot plus its own path
#[derive(Debug, Clone)]
pub struct StudyConfig {
    pub study_path: PathBuf,
    pub path: PathBuf,
    /// Archive holding this node, when it lives in an archived output run
    pub zip_path: Option<PathBuf>,
    snapshot: Arc<StudySnapshot>,
}

impl StudyConfig {
    /// Config of the study root
    #[must_use]
    pub fn new(study_path: PathBuf, snapshot: StudySnapshot) -> Self {
        Self {
            path: study_path.clone(),
            study_path,
            zip_path: None,
            snapshot: Arc::new(snapshot),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> &StudySnapshot {
        &self.snapshot
    }

    #[must_use]
    pub fn study_id(&self) -> &str {
        &self.snapshot.study_id
    }

    #[must_use]
    pub fn version(&self) -> i32 {
        self.snapshot.version
    }

    /// Config of the child `name` below this node
    #[must_use]
    pub fn next_file(&self, name: &str) -> Self {
        Self {
            study_path: self.study_path.clone(),
            path: self.path.join(name),
            zip_path: self.zip_path.clone(),
            snapshot: Arc::clone(&self.snapshot),
        }
    }

    /// Config of the output run `name`; archived runs switch the archive path
    #[must_use]
    pub fn next_output(&self, name: &str) -> Self {
        let mut next = self.next_file(name);
        if self
            .snapshot
            .outputs
            .get(name)
            .is_some_and(|simulation| simulation.archived)
        {
            next.zip_path = Some(self.path.join(format!("{name}.zip")));
        }
        next
    }

    /// Archive containing this node, if any
    #[must_use]
    pub fn archive_path(&self) -> Option<&Path> {
        self.zip_path.as_deref()
    }

    /// Path relative to the study root, with `/` separators
    #[must_use]
    pub fn relative_path(&self) -> String {
        let relative = self.path.strip_prefix(&self.study_path).unwrap_or(&self.path);
        relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Member name of this node inside its archive
    #[must_use]
    pub fn archive_member(&self) -> Option<String> {
        let archive = self.zip_path.as_ref()?;
        let root = archive.with_extension("");
        let inner = self.path.strip_prefix(&root).ok()?;
        Some(
            inner
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/"),
        )
    }

    fn cached(&self, key: &str) -> Option<Vec<String>> {
        self.snapshot.cache.get(key).cloned()
    }

    #[must_use]
    pub fn area_names(&self) -> Vec<String> {
        self.cached("%areas")
            .unwrap_or_else(|| self.snapshot.areas.keys().cloned().collect())
    }

    #[must_use]
    pub fn set_names(&self, only_output: bool) -> Vec<String> {
        self.cached(&format!("%districts%{only_output}")).unwrap_or_else(|| {
            self.snapshot
                .sets
                .iter()
                .filter(|(_, set)| !only_output || set.output)
                .map(|(id, _)| id.clone())
                .collect()
        })
    }

    #[must_use]
    pub fn get_thermal_ids(&self, area: &str) -> Vec<String> {
        self.cached(&format!("%thermal%{area}%{area}")).unwrap_or_else(|| {
            self.snapshot
                .areas
                .get(area)
                .map(|a| a.thermals.iter().map(|t| t.id.clone()).collect())
                .unwrap_or_default()
        })
    }

    #[must_use]
    pub fn get_thermal_names(&self, area: &str, only_enabled: bool) -> Vec<String> {
        self.snapshot
            .areas
            .get(area)
            .map(|a| {
                a.thermals
                    .iter()
                    .filter(|t| !only_enabled || t.enabled)
                    .map(|t| t.id.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    #[must_use]
    pub fn get_renewable_ids(&self, area: &str) -> Vec<String> {
        self.cached(&format!("%renewable%{area}")).unwrap_or_else(|| {
            self.snapshot
                .areas
                .get(area)
                .map(|a| a.renewables.iter().map(|r| r.id.clone()).collect())
                .unwrap_or_default()
        })
    }

    #[must_use]
    pub fn get_st_storage_ids(&self, area: &str) -> Vec<String> {
        self.cached(&format!("%st-storage%{area}")).unwrap_or_else(|| {
            self.snapshot
                .areas
                .get(area)
                .map(|a| a.st_storages.iter().map(|s| s.id.clone()).collect())
                .unwrap_or_default()
        })
    }

    #[must_use]
    pub fn get_links(&self, area: &str) -> Vec<String> {
        self.cached(&format!("%links%{area}")).unwrap_or_else(|| {
            self.snapshot
                .areas
                .get(area)
                .map(|a| a.links.keys().cloned().collect())
                .unwrap_or_default()
        })
    }

    /// Synthesis filters of a link, an output set or an area, in that order
    #[must_use]
    pub fn get_filters_synthesis(&self, area: &str, link: Option<&str>) -> Vec<MatrixFrequency> {
        self.filters(area, link, |l| &l.filters_synthesis, |s| &s.filters_synthesis, |a| {
            &a.filters_synthesis
        })
    }

    /// Year-by-year filters of a link, an output set or an area, in that order
    #[must_use]
    pub fn get_filters_year(&self, area: &str, link: Option<&str>) -> Vec<MatrixFrequency> {
        self.filters(area, link, |l| &l.filters_year, |s| &s.filters_year, |a| &a.filters_year)
    }

    fn filters(
        &self,
        area: &str,
        link: Option<&str>,
        of_link: impl Fn(&Link) -> &Vec<MatrixFrequency>,
        of_set: impl Fn(&DistrictSet) -> &Vec<MatrixFrequency>,
        of_area: impl Fn(&Area) -> &Vec<MatrixFrequency>,
    ) -> Vec<MatrixFrequency> {
        let snapshot = &self.snapshot;
        if let Some(link) = link {
            return snapshot
                .areas
                .get(area)
                .and_then(|a| a.links.get(link))
                .map(|l| of_link(l).clone())
                .unwrap_or_default();
        }
        if let Some(set) = snapshot.sets.get(area).filter(|set| set.output) {
            return of_set(set).clone();
        }
        snapshot
            .areas
            .get(area)
            .map(|a| of_area(a).clone())
            .unwrap_or_default()
    }

    /// Precompute every cached listing; the result shares nothing mutable
    #[must_use]
    pub fn with_cache(&self) -> Self {
        let mut snapshot = (*self.snapshot).clone();
        snapshot.cache.clear();
        let fresh = StudyConfig {
            snapshot: Arc::new(snapshot.clone()),
            ..self.clone()
        };

        let _ = snapshot.cache.insert("%areas".to_string(), fresh.area_names());
        for only_output in [true, false] {
            let _ = snapshot.cache.insert(
                format!("%districts%{only_output}"),
                fresh.set_names(only_output),
            );
        }
        for area in fresh.area_names() {
            let _ = snapshot
                .cache
                .insert(format!("%thermal%{area}%{area}"), fresh.get_thermal_ids(&area));
            let _ = snapshot
                .cache
                .insert(format!("%renewable%{area}"), fresh.get_renewable_ids(&area));
            let _ = snapshot
                .cache
                .insert(format!("%st-storage%{area}"), fresh.get_st_storage_ids(&area));
            let _ = snapshot
                .cache
                .insert(format!("%links%{area}"), fresh.get_links(&area));
        }
        StudyConfig {
            snapshot: Arc::new(snapshot),
            ..self.clone()
        }
    }
}
