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

//! Durable record of what has been distributed.
//!
//! `addons.json` maps addon name to version to [`DistributionRecord`];
//! `dependency.json` maps package filename to [`DistributionRecord`]. Both
//! files are rewritten in full, never patched.

use crate::error::Result;
use crate::models::SourceInfo;
use crate::paths;
use crate::platform;
use chrono::Local;
use log::warn;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const DISTRIBUTED_DT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionRecord {
    #[serde(default)]
    pub source: Value,
    #[serde(default)]
    pub checksum: Option<String>,
    #[serde(default)]
    pub checksum_algorithm: Option<String>,
    #[serde(default)]
    pub distributed_dt: Option<String>,
}

impl DistributionRecord {
    /// Record stamped with the current local time.
    pub fn new(source: &SourceInfo, checksum: Option<String>, checksum_algorithm: &str) -> Self {
        Self {
            source: source.to_value(),
            checksum,
            checksum_algorithm: Some(checksum_algorithm.to_string()),
            distributed_dt: Some(Local::now().format(DISTRIBUTED_DT_FORMAT).to_string()),
        }
    }
}

pub type AddonsMetadata = BTreeMap<String, BTreeMap<String, DistributionRecord>>;
pub type DependencyMetadata = BTreeMap<String, DistributionRecord>;

/// Read a JSON file, falling back to the default when it is missing or
/// cannot be parsed.
pub fn read_json_file<T: DeserializeOwned + Default>(path: &Path) -> T {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(_) => return T::default(),
    };

    match serde_json::from_str(&contents) {
        Ok(data) => data,
        Err(e) => {
            warn!("Ignoring invalid metadata file {}: {e}", path.display());
            T::default()
        }
    }
}

/// Write `data` as pretty JSON through a temporary file and an atomic rename.
pub fn save_json_file<T: Serialize>(path: &Path, data: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        paths::ensure_directory(parent.to_path_buf())?;
    }

    let json = serde_json::to_string_pretty(data)?;

    let temp_path = path.with_extension("tmp");
    if temp_path.exists() {
        fs::remove_file(&temp_path)?;
    }

    fs::write(&temp_path, json)?;
    platform::file_ops::atomic_rename(&temp_path, path)?;
    Ok(())
}

/// Path an unreadable metadata file is moved to, e.g. `addons.json.invalid`.
pub fn invalid_file_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".invalid");
    path.with_file_name(name)
}

/// Move `path` aside when it exists but does not hold a JSON object, so a
/// following save never replaces readable content with defaults.
pub fn set_aside_if_invalid(path: &Path) -> Result<()> {
    match read_object(path) {
        Ok(_) => Ok(()),
        Err(reason) => {
            let aside = invalid_file_path(path);
            warn!(
                "Moving unreadable metadata file {} to {}: {reason}",
                path.display(),
                aside.display()
            );
            fs::rename(path, &aside)?;
            Ok(())
        }
    }
}

/// Top level JSON object of `path`. A missing file is an empty object.
fn read_object(path: &Path) -> std::result::Result<Map<String, Value>, String> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Map::new()),
        Err(e) => return Err(e.to_string()),
    };
    match serde_json::from_str(&contents) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err("expected a JSON object".to_string()),
        Err(e) => Err(e.to_string()),
    }
}

fn read_object_or_empty(path: &Path) -> Map<String, Value> {
    read_object(path).unwrap_or_else(|reason| {
        warn!("Ignoring invalid metadata file {}: {reason}", path.display());
        Map::new()
    })
}

fn parse_record(path: &Path, key: &str, raw: Value) -> Option<DistributionRecord> {
    match serde_json::from_value(raw) {
        Ok(record) => Some(record),
        Err(e) => {
            warn!("Skipping invalid entry {key} in {}: {e}", path.display());
            None
        }
    }
}

/// Every addon version record that parses. Malformed entries are skipped
/// one by one.
pub fn read_addons_metadata(path: &Path) -> AddonsMetadata {
    let mut metadata = AddonsMetadata::new();
    for (addon_name, versions) in read_object_or_empty(path) {
        let Value::Object(versions) = versions else {
            warn!("Skipping invalid entry {addon_name} in {}", path.display());
            continue;
        };
        for (version, raw) in versions {
            if let Some(record) = parse_record(path, &format!("{addon_name} {version}"), raw) {
                metadata
                    .entry(addon_name.clone())
                    .or_default()
                    .insert(version, record);
            }
        }
    }
    metadata
}

pub fn read_dependency_metadata(path: &Path) -> DependencyMetadata {
    read_object_or_empty(path)
        .into_iter()
        .filter_map(|(name, raw)| parse_record(path, &name, raw).map(|record| (name, record)))
        .collect()
}

/// Merge freshly distributed addon versions into the stored file. Entries
/// already on disk are kept verbatim, readable or not.
pub fn update_addons_metadata(
    path: &Path,
    updates: BTreeMap<String, BTreeMap<String, DistributionRecord>>,
) -> Result<()> {
    if updates.is_empty() {
        return Ok(());
    }

    set_aside_if_invalid(path)?;
    let mut metadata = read_object_or_empty(path);
    for (addon_name, versions) in updates {
        let entry = metadata
            .entry(addon_name)
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        if let Value::Object(stored) = entry {
            for (version, record) in versions {
                stored.insert(version, serde_json::to_value(record)?);
            }
        }
    }
    save_json_file(path, &metadata)
}

pub fn update_dependency_metadata(
    path: &Path,
    package_name: &str,
    record: DistributionRecord,
) -> Result<()> {
    set_aside_if_invalid(path)?;
    let mut metadata = read_object_or_empty(path);
    metadata.insert(package_name.to_string(), serde_json::to_value(record)?);
    save_json_file(path, &metadata)
}
