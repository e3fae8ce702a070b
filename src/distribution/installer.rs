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

//! Platform install routines for launcher builds.

use crate::archive::{extract_archive, strip_archive_extension};
use crate::error::{DistError, Result};
use crate::platform::Platform;
use crate::platform::file_ops::is_dir_writable;
use log::{debug, error, info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Environment variable through which the Windows setup reports the path of
/// the installed executable.
pub const INSTALL_EXE_OUTPUT_ENV: &str = "DISTKIT_INSTALL_EXE_OUTPUT";

pub const INSTALL_FAILED_MESSAGE: &str =
    "Install process failed without known reason. Try to install the launcher manually.";

const MACOS_APPLICATIONS_DIR: &str = "/Applications";

/// Installs a downloaded launcher build.
///
/// Errors of kind [`DistError::InstallerDistribution`] carry a message meant
/// for the end user; any other error is reported generically.
pub trait InstallRoutine: Send + Sync {
    /// Directory the new build is installed into.
    fn install_root(&self) -> PathBuf;

    /// Install `installer` and return the path of the new executable if it
    /// could be located.
    fn install(&self, installer: &Path) -> Result<Option<PathBuf>>;
}

/// Install routine for the platform the process runs on.
#[derive(Debug, Clone)]
pub struct PlatformInstaller {
    platform: Platform,
    install_root: PathBuf,
    executable_name: String,
    applications_dir: PathBuf,
}

impl PlatformInstaller {
    pub fn new(platform: Platform, install_root: PathBuf, executable_name: &str) -> Self {
        Self {
            platform,
            install_root,
            executable_name: executable_name.to_string(),
            applications_dir: PathBuf::from(MACOS_APPLICATIONS_DIR),
        }
    }

    /// Installs next to the running launcher: one directory above the
    /// directory of the current executable.
    pub fn for_current_exe(executable_name: &str) -> Result<Self> {
        let current_exe = std::env::current_exe()?;
        let install_root = current_exe
            .parent()
            .and_then(Path::parent)
            .map(Path::to_path_buf)
            .ok_or_else(|| {
                DistError::InstallerDistribution(format!(
                    "Cannot determine install root from {}",
                    current_exe.display()
                ))
            })?;
        Ok(Self::new(Platform::current(), install_root, executable_name))
    }

    pub fn with_applications_dir(mut self, dir: PathBuf) -> Self {
        self.applications_dir = dir;
        self
    }

    fn install_windows(&self, installer: &Path) -> Result<Option<PathBuf>> {
        let log_file = tempfile::Builder::new()
            .suffix("distkit_install")
            .tempfile()?;
        let exe_output = tempfile::Builder::new()
            .suffix("distkit_install_dir")
            .tempfile()?;

        let user_arg = if is_dir_writable(&self.install_root) {
            "/CURRENTUSER"
        } else {
            "/ALLUSERS"
        };

        let status = Command::new(installer)
            .arg(user_arg)
            .arg("/NOCANCEL")
            .arg(format!("/LOG={}", log_file.path().display()))
            .arg(format!("/INSTALLROOT={}", self.install_root.display()))
            .arg("/SILENT")
            .env(INSTALL_EXE_OUTPUT_ENV, exe_output.path())
            .status()?;

        let log_output = fs::read_to_string(log_file.path()).unwrap_or_default();
        let reported = fs::read_to_string(exe_output.path()).unwrap_or_default();

        if !status.success() {
            error!("{log_output}");
            return Err(DistError::InstallerDistribution(
                INSTALL_FAILED_MESSAGE.to_string(),
            ));
        }

        let reported = reported.trim();
        if !reported.is_empty() && Path::new(reported).exists() {
            return Ok(Some(PathBuf::from(reported)));
        }
        Ok(find_windows_executable(&log_output, &self.executable_name))
    }

    fn install_linux(&self, installer: &Path) -> Result<Option<PathBuf>> {
        info!(
            "Installing launcher {} into {}",
            installer.display(),
            self.install_root.display()
        );
        fs::create_dir_all(&self.install_root)?;

        if let Err(e) = extract_archive(installer, &self.install_root) {
            error!("{e}");
            return Err(DistError::InstallerDistribution(
                INSTALL_FAILED_MESSAGE.to_string(),
            ));
        }

        let file_name = installer
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        let executable = self
            .install_root
            .join(strip_archive_extension(&file_name))
            .join(&self.executable_name);
        if !executable.is_file() {
            warn!(
                "Launcher archive did not contain the expected executable {}",
                executable.display()
            );
            return Ok(None);
        }
        info!("Setting executable to {}", executable.display());
        Ok(Some(executable))
    }

    fn install_macos(&self, installer: &Path) -> Result<Option<PathBuf>> {
        let hdiutil = which::which("hdiutil").map_err(|_| {
            DistError::InstallerDistribution(
                "hdiutil is not available, cannot mount the launcher disk image.".to_string(),
            )
        })?;

        let output = Command::new(&hdiutil)
            .arg("attach")
            .arg(installer)
            .args(["-plist", "-nobrowse"])
            .output()?;
        if !output.status.success() {
            return Err(DistError::InstallerDistribution(
                INSTALL_FAILED_MESSAGE.to_string(),
            ));
        }

        let mount_points =
            plist_string_values(&String::from_utf8_lossy(&output.stdout), "mount-point");
        let copied = self.copy_app_bundle(&mount_points);

        for mount_point in &mount_points {
            if let Err(e) = Command::new(&hdiutil)
                .args(["detach", mount_point.as_str()])
                .status()
            {
                warn!("Failed to detach {mount_point}: {e}");
            }
        }

        let Some(app_path) = copied? else {
            return Ok(None);
        };

        let contents_dir = app_path.join("Contents");
        let info_plist = fs::read_to_string(contents_dir.join("Info.plist"))?;
        Ok(plist_string_values(&info_plist, "CFBundleExecutable")
            .into_iter()
            .next()
            .map(|name| contents_dir.join("MacOS").join(name)))
    }

    /// Copy the first `.app` found on the mounted volumes.
    fn copy_app_bundle(&self, mount_points: &[String]) -> Result<Option<PathBuf>> {
        for mount_point in mount_points {
            for entry in fs::read_dir(mount_point)? {
                let entry = entry?;
                let name = entry.file_name().to_string_lossy().to_string();
                if !name.ends_with(".app") {
                    continue;
                }

                debug!("Copying {name} to {}", self.applications_dir.display());
                let status = Command::new("cp")
                    .arg("-rf")
                    .arg(entry.path())
                    .arg(&self.applications_dir)
                    .status()?;
                if !status.success() {
                    return Err(DistError::InstallerDistribution(
                        INSTALL_FAILED_MESSAGE.to_string(),
                    ));
                }
                return Ok(Some(self.applications_dir.join(name)));
            }
        }
        Ok(None)
    }
}

impl InstallRoutine for PlatformInstaller {
    fn install_root(&self) -> PathBuf {
        match self.platform {
            Platform::Darwin => self.applications_dir.clone(),
            _ => self.install_root.clone(),
        }
    }

    fn install(&self, installer: &Path) -> Result<Option<PathBuf>> {
        match self.platform {
            Platform::Windows => self.install_windows(installer),
            Platform::Linux => self.install_linux(installer),
            Platform::Darwin => self.install_macos(installer),
        }
    }
}

/// Locate the installed executable in a setup log.
///
/// Log lines mention the executable somewhere after a timestamp or message
/// prefix, so every suffix of the text before the executable name is probed
/// until one exists on disk.
pub fn find_windows_executable(log_output: &str, executable_name: &str) -> Option<PathBuf> {
    for line in log_output.lines() {
        let Some(idx) = line.find(executable_name) else {
            continue;
        };
        let candidate = &line[..idx + executable_name.len()];
        for (start, _) in candidate.char_indices() {
            let path = Path::new(candidate[start..].trim_start());
            if path.is_absolute() && path.exists() {
                return Some(path.to_path_buf());
            }
        }
    }
    None
}

/// String values following `<key>{key}</key>` in an XML property list.
///
/// Accepts the XML plist text written by `hdiutil -plist` and found in
/// `Info.plist`: a `<key>` followed, after whitespace only, by a
/// `<string>` element. Other value types are skipped and XML entities are
/// returned undecoded.
fn plist_string_values(xml: &str, key: &str) -> Vec<String> {
    let key_tag = format!("<key>{key}</key>");
    let mut values = Vec::new();
    let mut rest = xml;
    while let Some(pos) = rest.find(&key_tag) {
        rest = &rest[pos + key_tag.len()..];
        let trimmed = rest.trim_start();
        if let Some(value) = trimmed.strip_prefix("<string>")
            && let Some(end) = value.find("</string>")
        {
            values.push(value[..end].to_string());
        }
    }
    values
}
