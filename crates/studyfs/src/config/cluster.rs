// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Cluster records read from the `list.ini` files of an area.
//!
//! Each section of a list file describes one cluster; the section name is
//! the cluster id and the default display name.

use crate::config::transform_name_to_id;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// First version declaring renewable clusters
pub const RENEWABLE_MIN_VERSION: i32 = 810;
/// First version declaring short-term storages
pub const ST_STORAGE_MIN_VERSION: i32 = 860;

fn scalar_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

fn default_true() -> bool {
    true
}

fn default_one() -> u32 {
    1
}

fn default_efficiency() -> f64 {
    1.0
}

fn default_ts_interpretation() -> String {
    "power-generation".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThermalConfig {
    #[serde(deserialize_with = "scalar_string")]
    pub id: String,
    #[serde(deserialize_with = "scalar_string")]
    pub name: String,
    #[serde(default, deserialize_with = "scalar_string")]
    pub group: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_one", alias = "unitcount")]
    pub unit_count: u32,
    #[serde(default, alias = "nominalcapacity")]
    pub nominal_capacity: f64,
    #[serde(default, alias = "marginal-cost")]
    pub marginal_cost: f64,
    #[serde(default, alias = "market-bid-cost")]
    pub market_bid_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenewableConfig {
    #[serde(deserialize_with = "scalar_string")]
    pub id: String,
    #[serde(deserialize_with = "scalar_string")]
    pub name: String,
    #[serde(default, deserialize_with = "scalar_string")]
    pub group: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_one", alias = "unitcount")]
    pub unit_count: u32,
    #[serde(default, alias = "nominalcapacity")]
    pub nominal_capacity: f64,
    #[serde(default = "default_ts_interpretation", alias = "ts-interpretation")]
    pub ts_interpretation: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StStorageGroup {
    #[serde(rename = "PSP_open")]
    PspOpen,
    #[serde(rename = "PSP_closed")]
    PspClosed,
    Pondage,
    Battery,
    Other1,
    Other2,
    Other3,
    Other4,
    Other5,
}

impl FromStr for StStorageGroup {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let group = match s.trim().to_ascii_lowercase().as_str() {
            "psp_open" => StStorageGroup::PspOpen,
            "psp_closed" => StStorageGroup::PspClosed,
            "pondage" => StStorageGroup::Pondage,
            "battery" => StStorageGroup::Battery,
            "other1" => StStorageGroup::Other1,
            "other2" => StStorageGroup::Other2,
            "other3" => StStorageGroup::Other3,
            "other4" => StStorageGroup::Other4,
            "other5" => StStorageGroup::Other5,
            _ => return Err(format!("unknown short-term storage group '{s}'")),
        };
        Ok(group)
    }
}

impl fmt::Display for StStorageGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StStorageGroup::PspOpen => "PSP_open",
            StStorageGroup::PspClosed => "PSP_closed",
            StStorageGroup::Pondage => "Pondage",
            StStorageGroup::Battery => "Battery",
            StStorageGroup::Other1 => "Other1",
            StStorageGroup::Other2 => "Other2",
            StStorageGroup::Other3 => "Other3",
            StStorageGroup::Other4 => "Other4",
            StStorageGroup::Other5 => "Other5",
        };
        f.write_str(name)
    }
}

impl<'de> Deserialize<'de> for StStorageGroup {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StStorageConfig {
    #[serde(deserialize_with = "scalar_string")]
    pub id: String,
    #[serde(deserialize_with = "scalar_string")]
    pub name: String,
    pub group: StStorageGroup,
    #[serde(default, alias = "injectionnominalcapacity")]
    pub injection_nominal_capacity: f64,
    #[serde(default, alias = "withdrawalnominalcapacity")]
    pub withdrawal_nominal_capacity: f64,
    #[serde(default, alias = "reservoircapacity")]
    pub reservoir_capacity: f64,
    #[serde(default = "default_efficiency")]
    pub efficiency: f64,
    #[serde(default, alias = "initiallevel")]
    pub initial_level: f64,
    #[serde(default, alias = "initialleveloptim")]
    pub initial_level_optim: bool,
}

/// Deserialize one `list.ini` section, injecting the section name as id
/// and as the name when the section carries none.
fn from_section<T: for<'de> Deserialize<'de>>(
    section: &str,
    values: &Value,
    id: String,
) -> Result<T, serde_json::Error> {
    let mut record = match values {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };
    let _ = record.insert("id".to_string(), Value::String(id));
    let _ = record
        .entry("name")
        .or_insert_with(|| Value::String(section.to_string()));
    serde_json::from_value(Value::Object(record))
}

/// Parse a thermal `list.ini` document. Ids keep the section's case.
pub fn parse_thermals(document: &Map<String, Value>) -> Vec<ThermalConfig> {
    parse_sections(document, "thermal", |section, values| {
        from_section(section, values, section.to_string())
    })
}

pub fn parse_renewables(version: i32, document: &Map<String, Value>) -> Vec<RenewableConfig> {
    if version < RENEWABLE_MIN_VERSION {
        return Vec::new();
    }
    parse_sections(document, "renewable", |section, values| {
        from_section(section, values, section.to_string())
    })
}

/// Parse a short-term storage `list.ini` document. Storage ids are derived
/// from the section name and always lower case.
pub fn parse_st_storages(version: i32, document: &Map<String, Value>) -> Vec<StStorageConfig> {
    if version < ST_STORAGE_MIN_VERSION {
        return Vec::new();
    }
    parse_sections(document, "short-term storage", |section, values| {
        from_section(section, values, transform_name_to_id(section, true))
    })
}

fn parse_sections<T, F>(document: &Map<String, Value>, kind: &str, parse: F) -> Vec<T>
where
    F: Fn(&str, &Value) -> Result<T, serde_json::Error>,
{
    let mut clusters = Vec::with_capacity(document.len());
    for (section, values) in document {
        match parse(section, values) {
            Ok(cluster) => clusters.push(cluster),
            Err(err) => {
                let reason = err.to_string();
                diagnostics::log_warn!(
                    "Invalid {kind} cluster section {section}: {reason}",
                    kind: kind,
                    section: section.as_str(),
                    reason: reason
                );
            }
        }
    }
    clusters
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_thermal_sections() {
        let doc = json!({
            "t1": {"name": "t1", "enabled": true, "unitcount": 2, "nominalcapacity": 150},
            "T2": {"enabled": false, "group": "Nuclear"},
            "t3": {"name": 123},
        });
        let thermals = parse_thermals(doc.as_object().unwrap());
        assert_eq!(thermals.len(), 3);
        assert_eq!(thermals[0].id, "T2");
        assert_eq!(thermals[0].name, "T2");
        assert!(!thermals[0].enabled);
        assert_eq!(thermals[1].unit_count, 2);
        assert_eq!(thermals[1].nominal_capacity, 150.0);
        assert_eq!(thermals[2].name, "123");
        assert!(thermals[2].enabled);
    }

    #[test]
    fn test_renewables_gated_by_version() {
        let doc = json!({"wind farm": {"group": "Wind Onshore"}});
        assert!(parse_renewables(800, doc.as_object().unwrap()).is_empty());
        let renewables = parse_renewables(810, doc.as_object().unwrap());
        assert_eq!(renewables[0].ts_interpretation, "power-generation");
    }

    #[test]
    fn test_st_storages_gated_by_version() {
        let doc = json!({"Siemens Battery": {"group": "battery", "efficiency": 0.94}});
        assert!(parse_st_storages(850, doc.as_object().unwrap()).is_empty());

        let storages = parse_st_storages(860, doc.as_object().unwrap());
        assert_eq!(storages.len(), 1);
        assert_eq!(storages[0].id, "siemens battery");
        assert_eq!(storages[0].name, "Siemens Battery");
        assert_eq!(storages[0].group, StStorageGroup::Battery);
    }

    #[test]
    fn test_invalid_st_storage_section_is_skipped() {
        let doc = json!({
            "ok": {"group": "PSP_open"},
            "missing group": {"efficiency": 1},
            "bad group": {"group": "Volcano"},
        });
        let storages = parse_st_storages(860, doc.as_object().unwrap());
        assert_eq!(storages.len(), 1);
        assert_eq!(storages[0].group, StStorageGroup::PspOpen);
    }
}
