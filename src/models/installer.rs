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

pub const DEFAULT_INSTALLER_CHECKSUM_ALGORITHM: &str = "md5";

/// A native launcher build for one platform and version.
#[derive(Debug, Clone, PartialEq)]
pub struct Installer {
    pub version: String,
    pub filename: String,
    pub platform: String,
    pub size: u64,
    pub checksum: Option<String>,
    pub checksum_algorithm: String,
    pub python_version: Option<String>,
    pub python_modules: BTreeMap<String, Value>,
    pub sources: Vec<SourceInfo>,
    pub unknown_sources: Vec<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InstallerRecord {
    version: String,
    filename: String,
    platform: String,
    #[serde(default)]
    size: Option<u64>,
    #[serde(default)]
    checksum: Option<String>,
    #[serde(default)]
    checksum_algorithm: Option<String>,
    #[serde(default)]
    python_version: Option<String>,
    #[serde(default)]
    python_modules: Option<BTreeMap<String, Value>>,
    #[serde(default)]
    sources: Option<Vec<Value>>,
}

impl Installer {
    pub fn from_value(value: Value) -> Result<Self> {
        let record: InstallerRecord = serde_json::from_value(value)?;

        let mut raw_sources = record.sources.unwrap_or_default();
        fill_server_filenames(&mut raw_sources, &record.filename);
        let (sources, unknown_sources) =
            parse_sources(&raw_sources, &format!("Installer '{}'", record.filename));

        Ok(Self {
            version: record.version,
            filename: record.filename,
            platform: record.platform,
            size: record.size.unwrap_or_default(),
            checksum: record.checksum,
            checksum_algorithm: record
                .checksum_algorithm
                .unwrap_or_else(|| DEFAULT_INSTALLER_CHECKSUM_ALGORITHM.to_string()),
            python_version: record.python_version,
            python_modules: record.python_modules.unwrap_or_default(),
            sources,
            unknown_sources,
        })
    }
}
