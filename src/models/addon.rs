// Copyright 2025 dentsusoken
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::error::Result;
use crate::models::source::{SourceInfo, parse_sources};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

pub const DEFAULT_ADDON_CHECKSUM_ALGORITHM: &str = "sha256";

/// One version of an addon as published in the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct AddonVersionInfo {
    pub version: String,
    /// `{name}_{version}`, also the name of the addon directory on disk.
    pub full_name: String,
    pub title: String,
    /// Versions without client source info are bundled and have no files.
    pub require_distribution: bool,
    pub sources: Vec<SourceInfo>,
    pub unknown_sources: Vec<Value>,
    pub checksum: Option<String>,
    pub checksum_algorithm: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AddonInfo {
    pub name: String,
    pub title: String,
    pub versions: BTreeMap<String, AddonVersionInfo>,
    pub description: Option<String>,
    pub license: Option<Value>,
    pub authors: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddonRecord {
    name: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    license: Option<Value>,
    #[serde(default)]
    authors: Option<Value>,
    #[serde(default)]
    versions: Option<BTreeMap<String, AddonVersionRecord>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddonVersionRecord {
    #[serde(default)]
    client_source_info: Option<Vec<Value>>,
    #[serde(default)]
    checksum: Option<String>,
    #[serde(default)]
    hash: Option<String>,
    #[serde(default)]
    checksum_algorithm: Option<String>,
}

impl AddonVersionInfo {
    fn from_record(name: &str, title: &str, version: &str, record: AddonVersionRecord) -> Self {
        let full_name = format!("{name}_{version}");
        let title = format!("{title} {version}");

        let require_distribution = record.client_source_info.is_some();
        let (sources, unknown_sources) = parse_sources(
            record.client_source_info.as_deref().unwrap_or_default(),
            &format!("Addon: '{title}'"),
        );

        Self {
            version: version.to_string(),
            full_name,
            title,
            require_distribution,
            sources,
            unknown_sources,
            checksum: record.checksum.or(record.hash),
            checksum_algorithm: record
                .checksum_algorithm
                .unwrap_or_else(|| DEFAULT_ADDON_CHECKSUM_ALGORITHM.to_string()),
        }
    }
}

impl AddonInfo {
    pub fn from_value(value: Value) -> Result<Self> {
        let record: AddonRecord = serde_json::from_value(value)?;
        let title = record
            .title
            .filter(|title| !title.is_empty())
            .unwrap_or_else(|| record.name.clone());

        let versions = record
            .versions
            .unwrap_or_default()
            .into_iter()
            .map(|(version, version_record)| {
                let info =
                    AddonVersionInfo::from_record(&record.name, &title, &version, version_record);
                (version, info)
            })
            .collect();

        Ok(Self {
            name: record.name,
            title,
            versions,
            description: record.description,
            license: record.license,
            authors: record.authors,
        })
    }
}
