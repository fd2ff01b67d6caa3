// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use crate::config::cluster::{RenewableConfig, StStorageConfig, ThermalConfig};
use crate::frequency::MatrixFrequency;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Output filters of a link between two areas
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Link {
    pub filters_synthesis: Vec<MatrixFrequency>,
    pub filters_year: Vec<MatrixFrequency>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Area {
    pub name: String,
    /// Links keyed by destination area id
    pub links: BTreeMap<String, Link>,
    pub thermals: Vec<ThermalConfig>,
    pub renewables: Vec<RenewableConfig>,
    pub st_storages: Vec<StStorageConfig>,
    pub filters_synthesis: Vec<MatrixFrequency>,
    pub filters_year: Vec<MatrixFrequency>,
}

/// A named group of areas, possibly defined as the complement of its members
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistrictSet {
    pub name: Option<String>,
    pub inverted_set: bool,
    pub areas: Vec<String>,
    pub output: bool,
    pub filters_synthesis: Vec<MatrixFrequency>,
    pub filters_year: Vec<MatrixFrequency>,
}

impl Default for DistrictSet {
    fn default() -> Self {
        Self {
            name: None,
            inverted_set: false,
            areas: Vec::new(),
            output: true,
            filters_synthesis: MatrixFrequency::ALL.to_vec(),
            filters_year: MatrixFrequency::ALL.to_vec(),
        }
    }
}

impl DistrictSet {
    /// Member areas, resolving an inverted set against `all_areas`
    #[must_use]
    pub fn get_areas(&self, all_areas: &[String]) -> Vec<String> {
        if self.inverted_set {
            all_areas
                .iter()
                .filter(|area| !self.areas.contains(area))
                .cloned()
                .collect()
        } else {
            self.areas.clone()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimulationMode {
    Economy,
    Adequacy,
    Draft,
}

impl SimulationMode {
    /// Abbreviation used in output run names
    #[must_use]
    pub fn abbreviation(&self) -> &'static str {
        match self {
            SimulationMode::Economy => "eco",
            SimulationMode::Adequacy => "adq",
            SimulationMode::Draft => "dft",
        }
    }

    #[must_use]
    pub fn from_abbreviation(abbr: &str) -> Option<Self> {
        match abbr {
            "eco" => Some(SimulationMode::Economy),
            "adq" => Some(SimulationMode::Adequacy),
            "dft" => Some(SimulationMode::Draft),
            _ => None,
        }
    }

    /// Name of the results folder inside an output run
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SimulationMode::Economy => "economy",
            SimulationMode::Adequacy => "adequacy",
            SimulationMode::Draft => "draft",
        }
    }
}

impl fmt::Display for SimulationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata of one recorded output run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Simulation {
    pub name: String,
    pub date: String,
    pub mode: SimulationMode,
    pub nbyears: u32,
    pub synthesis: bool,
    pub by_year: bool,
    /// True when the run left no `checkIntegrity.txt`
    pub error: bool,
    /// Selected Monte-Carlo years (1-based), `None` without a user playlist
    pub playlist: Option<Vec<u32>>,
    pub archived: bool,
    /// Xpansion version, empty when the run was not an xpansion run
    pub xpansion: String,
}

impl Simulation {
    /// Folder (or archive stem) name of the run
    #[must_use]
    pub fn get_file(&self) -> String {
        let suffix = if self.name.is_empty() {
            String::new()
        } else {
            format!("-{}", self.name)
        };
        format!("{}{}{}", self.date, self.mode.abbreviation(), suffix)
    }

    /// Years exposed under `mc-ind`
    #[must_use]
    pub fn years(&self) -> Vec<u32> {
        match &self.playlist {
            Some(years) => years.clone(),
            None => (1..=self.nbyears).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BindingConstraintFrequency {
    #[default]
    Hourly,
    Daily,
    Weekly,
}

impl BindingConstraintFrequency {
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "hourly" => Some(Self::Hourly),
            "daily" => Some(Self::Daily),
            "weekly" => Some(Self::Weekly),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BindingConstraint {
    pub id: String,
    pub areas: BTreeSet<String>,
    pub clusters: BTreeSet<String>,
    pub time_step: BindingConstraintFrequency,
}

/// How renewable production is declared in the study
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EnrModelling {
    #[default]
    Aggregated,
    Clusters,
}

impl EnrModelling {
    #[must_use]
    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("clusters") {
            EnrModelling::Clusters
        } else {
            EnrModelling::Aggregated
        }
    }
}
