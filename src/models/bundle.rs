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
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Local development redirect of one addon.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AddonDevInfo {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub path: String,
}

/// Named pinning of installer, addon versions and dependency packages.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bundle {
    pub name: String,
    #[serde(default)]
    pub installer_version: Option<String>,
    /// Addon name to pinned version; `null` disables the addon in this bundle.
    #[serde(default, rename = "addons")]
    pub addon_versions: BTreeMap<String, Option<String>>,
    /// Platform name to dependency package filename.
    #[serde(default)]
    pub dependency_packages: BTreeMap<String, Option<String>>,
    #[serde(default)]
    pub is_production: bool,
    #[serde(default)]
    pub is_staging: bool,
    #[serde(default)]
    pub is_dev: bool,
    #[serde(default, rename = "activeUser")]
    pub active_dev_user: Option<String>,
    #[serde(default, rename = "addonDevelopment")]
    pub addons_dev_info: BTreeMap<String, AddonDevInfo>,
}

impl Bundle {
    pub fn from_value(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn addon_version(&self, addon_name: &str) -> Option<&str> {
        self.addon_versions
            .get(addon_name)
            .and_then(|version| version.as_deref())
            .filter(|version| !version.is_empty())
    }

    pub fn dependency_package(&self, platform: &str) -> Option<&str> {
        self.dependency_packages
            .get(platform)
            .and_then(|filename| filename.as_deref())
            .filter(|filename| !filename.is_empty())
    }

    /// Development redirect for the addon, if enabled.
    pub fn dev_addon(&self, addon_name: &str) -> Option<&AddonDevInfo> {
        self.addons_dev_info
            .get(addon_name)
            .filter(|info| info.enabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bundle_from_value() {
        let bundle = Bundle::from_value(json!({
            "name": "studio-2024.1",
            "installerVersion": "1.0.3",
            "addons": {"core": "1.2.0", "maya": null},
            "dependencyPackages": {"linux": "deps-linux.zip", "windows": null},
            "isProduction": true,
            "isStaging": false,
            "activeUser": "alice",
            "addonDevelopment": {
                "core": {"enabled": true, "path": "{HOME}/dev/core"},
                "maya": {"enabled": false, "path": "/dev/maya"}
            }
        }))
        .unwrap();

        assert_eq!(bundle.installer_version.as_deref(), Some("1.0.3"));
        assert_eq!(bundle.addon_version("core"), Some("1.2.0"));
        assert_eq!(bundle.addon_version("maya"), None);
        assert_eq!(bundle.dependency_package("linux"), Some("deps-linux.zip"));
        assert_eq!(bundle.dependency_package("windows"), None);
        assert!(bundle.is_production);
        assert!(!bundle.is_dev);
        assert_eq!(bundle.active_dev_user.as_deref(), Some("alice"));
        assert_eq!(bundle.dev_addon("core").unwrap().path, "{HOME}/dev/core");
        assert!(bundle.dev_addon("maya").is_none());
    }

    #[test]
    fn test_minimal_bundle() {
        let bundle = Bundle::from_value(json!({"name": "empty"})).unwrap();
        assert!(bundle.addon_versions.is_empty());
        assert!(!bundle.is_production && !bundle.is_staging && !bundle.is_dev);
    }
}
