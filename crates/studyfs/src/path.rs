// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Path strings of the node API.
//!
//! A path such as `/input/areas/fr,de/ui` names a node by its segments.
//! Empty segments are ignored, so leading, trailing and doubled slashes
//! make no difference; `""` and `"/"` address the root.

/// Segments of a slash-separated node path
#[must_use]
pub fn split_url(path: &str) -> Vec<String> {
    path.split('/')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}

/// Slash-separated form of `url`, without a leading slash
#[must_use]
pub fn join_url(url: &[String]) -> String {
    url.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_url() {
        assert_eq!(split_url("/input/areas/fr/ui"), vec!["input", "areas", "fr", "ui"]);
        assert_eq!(split_url("settings//generaldata/"), vec!["settings", "generaldata"]);
        assert!(split_url("").is_empty());
        assert!(split_url("/").is_empty());
        assert_eq!(split_url("input/links/fr,de"), vec!["input", "links", "fr,de"]);
    }

    #[test]
    fn test_join_url() {
        let url = split_url("/output/run/economy/");
        assert_eq!(join_url(&url), "output/run/economy");
    }
}
