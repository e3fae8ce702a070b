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

use crate::error::{DistError, Result};
use crate::paths;
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const HOME_ENV: &str = "DISTKIT_HOME";
pub const ADDONS_DIR_ENV: &str = "DISTKIT_ADDONS_DIR";
pub const DEPENDENCIES_DIR_ENV: &str = "DISTKIT_DEPENDENCIES_DIR";
const ENV_PREFIX: &str = "DISTKIT";
const HOME_DIR_NAME: &str = "distkit";

const DEFAULT_CATALOG_TIMEOUT_SECS: u64 = 30;
const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 300;
const DEFAULT_MAX_WORKERS: usize = 4;
const DEFAULT_EXECUTABLE_NAME: &str = "distkit";
const DEFAULT_APP_NAME: &str = "Distkit";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DistConfig {
    /// Home directory the configuration was loaded from.
    #[serde(skip)]
    pub home: PathBuf,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub distribution: DistributionConfig,

    #[serde(default)]
    pub launcher: LauncherConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_catalog_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            timeout_secs: DEFAULT_CATALOG_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributionConfig {
    #[serde(default)]
    pub addons_dir: Option<PathBuf>,
    #[serde(default)]
    pub dependencies_dir: Option<PathBuf>,
    /// Where downloads are staged; the system temp directory when unset.
    #[serde(default)]
    pub downloads_dir: Option<PathBuf>,
    #[serde(default)]
    pub bundle: Option<String>,
    #[serde(default)]
    pub use_staging: bool,
    #[serde(default)]
    pub use_dev: bool,
    /// Overrides the user reported by the server for dev bundles.
    #[serde(default)]
    pub active_user: Option<String>,
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
    #[serde(default)]
    pub require_checksum: bool,
    #[serde(default = "default_download_timeout_secs")]
    pub download_timeout_secs: u64,
}

impl Default for DistributionConfig {
    fn default() -> Self {
        Self {
            addons_dir: None,
            dependencies_dir: None,
            downloads_dir: None,
            bundle: None,
            use_staging: false,
            use_dev: false,
            active_user: None,
            max_workers: DEFAULT_MAX_WORKERS,
            require_checksum: false,
            download_timeout_secs: DEFAULT_DOWNLOAD_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LauncherConfig {
    /// Version of the running launcher. Installer distribution is skipped
    /// when unset.
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default = "default_executable_name")]
    pub executable_name: String,
    /// Application bundle name on macOS, without version and `.app`.
    #[serde(default = "default_app_name")]
    pub app_name: String,
    #[serde(default)]
    pub skip_installer_dist: bool,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            version: None,
            executable_name: default_executable_name(),
            app_name: default_app_name(),
            skip_installer_dist: false,
        }
    }
}

fn default_catalog_timeout_secs() -> u64 {
    DEFAULT_CATALOG_TIMEOUT_SECS
}

fn default_download_timeout_secs() -> u64 {
    DEFAULT_DOWNLOAD_TIMEOUT_SECS
}

fn default_max_workers() -> usize {
    DEFAULT_MAX_WORKERS
}

fn default_executable_name() -> String {
    DEFAULT_EXECUTABLE_NAME.to_string()
}

fn default_app_name() -> String {
    DEFAULT_APP_NAME.to_string()
}

/// `DISTKIT_HOME` when it is absolute, else the user data directory.
pub fn resolve_home() -> Result<PathBuf> {
    if let Ok(home) = std::env::var(HOME_ENV) {
        let path = PathBuf::from(home);
        if path.is_absolute() {
            return Ok(path);
        }
        log::warn!("Ignoring relative {HOME_ENV}: {}", path.display());
    }

    dirs::data_dir()
        .map(|dir| dir.join(HOME_DIR_NAME))
        .ok_or_else(|| DistError::ConfigError("Unable to determine data directory".to_string()))
}

/// Load from the resolved home directory.
pub fn new_dist_config() -> Result<DistConfig> {
    DistConfig::load(&resolve_home()?)
}

impl DistConfig {
    /// Defaults, then `{home}/config.toml`, then `DISTKIT_*` variables
    /// (`DISTKIT_SERVER__URL` sets `server.url`).
    pub fn load(home: &Path) -> Result<Self> {
        let config_path = paths::config_file(home);
        if config_path.exists() {
            log::debug!("Loading config from {}", config_path.display());
        } else {
            log::debug!("Config file not found at {}, using defaults", config_path.display());
        }

        let settings = Config::builder()
            .add_source(File::from(config_path).format(FileFormat::Toml).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let mut config: DistConfig = settings.try_deserialize()?;
        config.home = home.to_path_buf();
        Ok(config)
    }

    /// Addons root. `DISTKIT_ADDONS_DIR` beats the config file.
    pub fn addons_root(&self) -> PathBuf {
        env_dir(ADDONS_DIR_ENV)
            .or_else(|| self.distribution.addons_dir.clone())
            .unwrap_or_else(|| paths::addons_dir(&self.home))
    }

    /// Dependency packages root. `DISTKIT_DEPENDENCIES_DIR` beats the config
    /// file.
    pub fn dependencies_root(&self) -> PathBuf {
        env_dir(DEPENDENCIES_DIR_ENV)
            .or_else(|| self.distribution.dependencies_dir.clone())
            .unwrap_or_else(|| paths::dependencies_dir(&self.home))
    }

    pub fn executables_file(&self) -> PathBuf {
        paths::executables_file(&self.home)
    }

    pub fn catalog_timeout(&self) -> Duration {
        Duration::from_secs(self.server.timeout_secs)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.distribution.download_timeout_secs)
    }

    /// Server URL, required for anything that talks to the catalog.
    pub fn server_url(&self) -> Result<&str> {
        self.server
            .url
            .as_deref()
            .filter(|url| !url.is_empty())
            .ok_or_else(|| {
                DistError::ConfigError(
                    "Server URL is not configured; set server.url or DISTKIT_SERVER__URL"
                        .to_string(),
                )
            })
    }
}

fn env_dir(name: &str) -> Option<PathBuf> {
    std::env::var(name)
        .ok()
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}
