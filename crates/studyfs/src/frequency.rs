// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Time granularity of matrix rows and output filters.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatrixFrequency {
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Annual,
}

impl MatrixFrequency {
    /// All frequencies in canonical order
    pub const ALL: [MatrixFrequency; 5] = [
        MatrixFrequency::Hourly,
        MatrixFrequency::Daily,
        MatrixFrequency::Weekly,
        MatrixFrequency::Monthly,
        MatrixFrequency::Annual,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            MatrixFrequency::Hourly => "hourly",
            MatrixFrequency::Daily => "daily",
            MatrixFrequency::Weekly => "weekly",
            MatrixFrequency::Monthly => "monthly",
            MatrixFrequency::Annual => "annual",
        }
    }

    /// Number of leading date columns in an output series file
    #[must_use]
    pub fn date_columns(&self) -> usize {
        match self {
            MatrixFrequency::Hourly => 5,
            MatrixFrequency::Daily => 4,
            MatrixFrequency::Weekly => 2,
            MatrixFrequency::Monthly => 3,
            MatrixFrequency::Annual => 2,
        }
    }
}

impl fmt::Display for MatrixFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatrixFrequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MatrixFrequency::ALL
            .into_iter()
            .find(|freq| freq.as_str() == s.trim().to_ascii_lowercase())
            .ok_or_else(|| format!("unknown frequency '{s}'"))
    }
}

/// Parse an output filter value such as `"daily, monthly"`.
///
/// Unknown entries are dropped and the result follows canonical order.
/// A missing value yields an empty filter.
#[must_use]
pub fn extract_filtering(value: Option<&Value>) -> Vec<MatrixFrequency> {
    let entries: Vec<String> = match value {
        Some(Value::String(s)) => s.split(',').map(str::to_string).collect(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect(),
        _ => return Vec::new(),
    };
    let wanted: Vec<MatrixFrequency> = entries
        .iter()
        .filter_map(|entry| entry.parse().ok())
        .collect();
    MatrixFrequency::ALL
        .into_iter()
        .filter(|freq| wanted.contains(freq))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_filtering_keeps_canonical_order() {
        let value = json!("annual, hourly,weekly");
        assert_eq!(
            extract_filtering(Some(&value)),
            vec![
                MatrixFrequency::Hourly,
                MatrixFrequency::Weekly,
                MatrixFrequency::Annual
            ]
        );
    }

    #[test]
    fn test_extract_filtering_drops_unknown_and_empty() {
        let value = json!("daily, , fortnightly");
        assert_eq!(extract_filtering(Some(&value)), vec![MatrixFrequency::Daily]);
        assert!(extract_filtering(None).is_empty());
        assert!(extract_filtering(Some(&json!(""))).is_empty());
    }

    #[test]
    fn test_date_columns() {
        assert_eq!(MatrixFrequency::Hourly.date_columns(), 5);
        assert_eq!(MatrixFrequency::Monthly.date_columns(), 3);
        assert_eq!("Weekly".parse::<MatrixFrequency>(), Ok(MatrixFrequency::Weekly));
    }
}
