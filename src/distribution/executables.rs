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

//! Launcher executables known to be installed, kept in `executables.json`.

use super::metadata::{read_json_file, save_json_file, set_aside_if_invalid};
use crate::error::Result;
use chrono::Local;
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const EXECUTABLES_FILE_VERSION: &str = "1.0.0";
const ADDED_FORMAT: &str = "%y-%m-%d-%H%M";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutableEntry {
    pub version: String,
    pub executable: PathBuf,
    #[serde(default)]
    pub added: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutablesInfo {
    #[serde(default = "default_file_version")]
    pub file_version: String,
    #[serde(default)]
    pub available_versions: Vec<ExecutableEntry>,
}

fn default_file_version() -> String {
    EXECUTABLES_FILE_VERSION.to_string()
}

impl Default for ExecutablesInfo {
    fn default() -> Self {
        Self {
            file_version: default_file_version(),
            available_versions: Vec::new(),
        }
    }
}

/// Reader and writer of the executables file.
#[derive(Debug, Clone)]
pub struct ExecutablesRegistry {
    path: PathBuf,
}

impl ExecutablesRegistry {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> ExecutablesInfo {
        read_json_file(&self.path)
    }

    /// Existing executables registered for `version`, skipping `exclude`.
    pub fn find(&self, version: &str, exclude: Option<&Path>) -> Option<PathBuf> {
        self.load()
            .available_versions
            .into_iter()
            .filter(|entry| entry.version == version)
            .map(|entry| entry.executable)
            .find(|executable| executable.exists() && Some(executable.as_path()) != exclude)
    }

    /// Register `executable` as `version`. An entry with the same executable
    /// is updated in place. Returns `false` when nothing changed.
    pub fn record(&self, version: &str, executable: &Path) -> Result<bool> {
        set_aside_if_invalid(&self.path)?;
        let mut info = self.load();
        let added = Local::now().format(ADDED_FORMAT).to_string();

        match info
            .available_versions
            .iter_mut()
            .find(|entry| entry.executable == executable)
        {
            Some(entry) if entry.version == version => return Ok(false),
            Some(entry) => {
                entry.version = version.to_string();
                entry.added = added;
            }
            None => info.available_versions.push(ExecutableEntry {
                version: version.to_string(),
                executable: executable.to_path_buf(),
                added,
            }),
        }

        debug!(
            "Recording executable {} for version {version}",
            executable.display()
        );
        save_json_file(&self.path, &info)?;
        Ok(true)
    }

    /// Drop entries whose executable no longer exists.
    pub fn cleanup(&self) -> Result<usize> {
        set_aside_if_invalid(&self.path)?;
        let mut info = self.load();
        let before = info.available_versions.len();
        info.available_versions
            .retain(|entry| entry.executable.exists());
        let removed = before - info.available_versions.len();
        if removed > 0 {
            save_json_file(&self.path, &info)?;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn registry(temp: &TempDir) -> ExecutablesRegistry {
        ExecutablesRegistry::new(temp.path().join("executables.json"))
    }

    #[test]
    fn test_record_and_find() {
        let temp = TempDir::new().unwrap();
        let registry = registry(&temp);
        let exe = temp.path().join("launcher-1.2.0").join("distkit");
        fs::create_dir_all(exe.parent().unwrap()).unwrap();
        fs::write(&exe, b"").unwrap();

        assert!(registry.record("1.2.0", &exe).unwrap());
        assert!(!registry.record("1.2.0", &exe).unwrap());

        assert_eq!(registry.find("1.2.0", None), Some(exe.clone()));
        assert_eq!(registry.find("1.2.0", Some(&exe)), None);
        assert_eq!(registry.find("1.3.0", None), None);

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(registry.path()).unwrap()).unwrap();
        assert_eq!(raw["file_version"], EXECUTABLES_FILE_VERSION);
        assert_eq!(raw["available_versions"][0]["version"], "1.2.0");
    }

    #[test]
    fn test_record_updates_version_of_same_executable() {
        let temp = TempDir::new().unwrap();
        let registry = registry(&temp);
        let exe = temp.path().join("distkit");
        fs::write(&exe, b"").unwrap();

        registry.record("1.0.0", &exe).unwrap();
        registry.record("1.1.0", &exe).unwrap();

        let info = registry.load();
        assert_eq!(info.available_versions.len(), 1);
        assert_eq!(info.available_versions[0].version, "1.1.0");
    }

    #[test]
    fn test_missing_executables_are_ignored_and_cleaned() {
        let temp = TempDir::new().unwrap();
        let registry = registry(&temp);
        let gone = temp.path().join("gone");
        fs::write(&gone, b"").unwrap();
        registry.record("2.0.0", &gone).unwrap();
        fs::remove_file(&gone).unwrap();

        assert_eq!(registry.find("2.0.0", None), None);
        assert_eq!(registry.cleanup().unwrap(), 1);
        assert!(registry.load().available_versions.is_empty());
    }

    #[test]
    fn test_invalid_file_loads_defaults() {
        let temp = TempDir::new().unwrap();
        let registry = registry(&temp);
        fs::write(registry.path(), "[1, 2").unwrap();
        assert_eq!(registry.load(), ExecutablesInfo::default());
    }
}
