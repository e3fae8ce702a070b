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
use crate::models::source::{SourceInfo, fill_server_filenames, parse_sources};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

pub const DEFAULT_DEPENDENCY_CHECKSUM_ALGORITHM: &str = "sha256";

/// A platform-specific package of runtime libraries shared by addons.
#[derive(Debug, Clone, PartialEq)]
pub struct DependencyItem {
    pub filename: String,
    pub platform: String,
    pub checksum: Option<String>,
    pub checksum_algorithm: String,
    pub sources: Vec<SourceInfo>,
    pub unknown_sources: Vec<Value>,
    pub source_addons: BTreeMap<String, Value>,
    pub python_modules: BTreeMap<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DependencyRecord {
    filename: String,
    platform: String,
    #[serde(default)]
    checksum: Option<String>,
    #[serde(default)]
    checksum_algorithm: Option<String>,
    #[serde(default)]
    sources: Option<Vec<Value>>,
    #[serde(default)]
    source_addons: Option<BTreeMap<String, Value>>,
    #[serde(default)]
    python_modules: Option<BTreeMap<String, Value>>,
}

impl DependencyItem {
    pub fn from_value(value: Value) -> Result<Self> {
        let record: DependencyRecord = serde_json::from_value(value)?;

        let mut raw_sources = record.sources.unwrap_or_default();
        fill_server_filenames(&mut raw_sources, &record.filename);
        let (sources, unknown_sources) = parse_sources(
            &raw_sources,
            &format!("Dependency package '{}'", record.filename),
        );

        Ok(Self {
            filename: record.filename,
            platform: record.platform,
            checksum: record.checksum,
            checksum_algorithm: record
                .checksum_algorithm
                .unwrap_or_else(|| DEFAULT_DEPENDENCY_CHECKSUM_ALGORITHM.to_string()),
            sources,
            unknown_sources,
            source_addons: record.source_addons.unwrap_or_default(),
            python_modules: record.python_modules.unwrap_or_default(),
        })
    }

    /// Package name without the archive extension.
    pub fn label(&self) -> String {
        crate::archive::strip_archive_extension(&self.filename)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_dependency_from_value() {
        let item = DependencyItem::from_value(json!({
            "filename": "deps-linux-2024.zip",
            "platform": "linux",
            "checksum": "deadbeef",
            "sources": [
                {"type": "server"},
                {"type": "http", "url": "https://mirror.example.com/deps.zip"}
            ],
            "sourceAddons": {"core": "1.2.0"},
            "pythonModules": {"requests": "2.31.0"}
        }))
        .unwrap();

        assert_eq!(item.filename, "deps-linux-2024.zip");
        assert_eq!(item.platform, "linux");
        assert_eq!(item.checksum_algorithm, "sha256");
        assert_eq!(
            item.sources[0],
            SourceInfo::Server {
                filename: Some("deps-linux-2024.zip".to_string()),
                path: None
            }
        );
        assert_eq!(item.source_addons["core"], "1.2.0");
        assert_eq!(item.label(), "deps-linux-2024");
    }

    #[test]
    fn test_dependency_requires_filename() {
        assert!(DependencyItem::from_value(json!({"platform": "linux"})).is_err());
    }
}
