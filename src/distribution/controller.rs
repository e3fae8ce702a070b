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

use super::bundle::{BundleSelection, effective_use_dev, resolve_bundle};
use super::executables::ExecutablesRegistry;
use super::installer::{InstallRoutine, PlatformInstaller};
use super::item::{DistributionItem, ItemConfig};
use super::metadata::{
    self, DistributionRecord, read_addons_metadata, read_dependency_metadata,
};
use super::staging;
use super::state::UpdateState;
use crate::catalog::Catalog;
use crate::config::DistConfig;
use crate::download::{DownloadContext, DownloaderRegistry};
use crate::error::{DistError, Result};
use crate::indicator::{ProgressConfig, ProgressIndicator, ProgressStyle};
use crate::models::{AddonInfo, AddonVersionInfo, Bundle, DependencyItem, Installer};
use crate::paths;
use crate::platform::Platform;
use log::{debug, info, warn};
use rayon::prelude::*;
use std::cell::OnceCell;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const DEPENDENCY_PACKAGE_LABEL: &str = "Dependency package";
const DEPENDENCY_RUNTIME_DIR: &str = "runtime";
const DEPENDENCY_PYTHON_DIR: &str = "dependencies";

/// Settings the controller runs with.
#[derive(Debug, Clone)]
pub struct ControllerOptions {
    pub addons_root: PathBuf,
    pub dependencies_root: PathBuf,
    pub downloads_dir: Option<PathBuf>,
    pub executables_file: PathBuf,
    pub selection: BundleSelection,
    pub active_user: Option<String>,
    /// Version of the running launcher; `None` skips installer handling.
    pub current_version: Option<String>,
    pub current_executable: Option<PathBuf>,
    pub executable_name: String,
    pub app_name: String,
    pub skip_installer_dist: bool,
    pub require_checksum: bool,
    pub max_workers: usize,
    pub platform: Platform,
}

impl ControllerOptions {
    pub fn from_config(config: &DistConfig) -> Self {
        let distribution = &config.distribution;
        Self {
            addons_root: config.addons_root(),
            dependencies_root: config.dependencies_root(),
            downloads_dir: distribution.downloads_dir.clone(),
            executables_file: config.executables_file(),
            selection: BundleSelection {
                bundle_name: distribution.bundle.clone(),
                use_staging: distribution.use_staging,
                use_dev: distribution.use_dev,
            },
            active_user: distribution.active_user.clone(),
            current_version: config.launcher.version.clone(),
            current_executable: std::env::current_exe().ok(),
            executable_name: config.launcher.executable_name.clone(),
            app_name: config.launcher.app_name.clone(),
            skip_installer_dist: config.launcher.skip_installer_dist,
            require_checksum: distribution.require_checksum,
            max_workers: distribution.max_workers,
            platform: Platform::current(),
        }
    }
}

/// Addon item with the catalog data it was built from.
#[derive(Debug)]
pub struct AddonDistItem {
    pub addon_name: String,
    pub addon_version: String,
    pub version_info: AddonVersionInfo,
    pub dist_item: DistributionItem,
}

/// Orchestrates one distribution run.
///
/// Catalog data is fetched lazily and at most once. Distribution items are
/// built from the difference between the resolved bundle and the local
/// metadata, driven by [`distribute`](Self::distribute) and recorded by
/// [`finish_distribution`](Self::finish_distribution).
pub struct DistributionController {
    catalog: Arc<dyn Catalog>,
    registry: DownloaderRegistry,
    options: ControllerOptions,
    install_routine: Option<Arc<dyn InstallRoutine>>,
    progress: Option<Box<dyn ProgressIndicator>>,

    bundles: OnceCell<Vec<Bundle>>,
    active_user: OnceCell<String>,
    bundle_to_use: OnceCell<Option<Bundle>>,
    addons: OnceCell<BTreeMap<String, AddonInfo>>,
    dependency_packages: OnceCell<BTreeMap<String, DependencyItem>>,
    installers: OnceCell<Vec<Installer>>,

    addon_dist_items: Option<Vec<AddonDistItem>>,
    dependency_dist_item: Option<Option<DistributionItem>>,
    installer_executable: Option<Option<PathBuf>>,
    installer_dist_error: Option<String>,
    installer_filepath: Option<PathBuf>,
    dist_started: bool,
}

fn cached<T>(cell: &OnceCell<T>, init: impl FnOnce() -> Result<T>) -> Result<&T> {
    if let Some(value) = cell.get() {
        return Ok(value);
    }
    let value = init()?;
    Ok(cell.get_or_init(|| value))
}

impl DistributionController {
    pub fn new(
        catalog: Arc<dyn Catalog>,
        registry: DownloaderRegistry,
        options: ControllerOptions,
    ) -> Self {
        Self {
            catalog,
            registry,
            options,
            install_routine: None,
            progress: None,
            bundles: OnceCell::new(),
            active_user: OnceCell::new(),
            bundle_to_use: OnceCell::new(),
            addons: OnceCell::new(),
            dependency_packages: OnceCell::new(),
            installers: OnceCell::new(),
            addon_dist_items: None,
            dependency_dist_item: None,
            installer_executable: None,
            installer_dist_error: None,
            installer_filepath: None,
            dist_started: false,
        }
    }

    /// Replace the platform install routine used for launcher updates.
    pub fn with_install_routine(mut self, routine: Arc<dyn InstallRoutine>) -> Self {
        self.install_routine = Some(routine);
        self
    }

    /// Parent indicator receiving one child bar per source attempt.
    pub fn with_progress(mut self, progress: Box<dyn ProgressIndicator>) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn options(&self) -> &ControllerOptions {
        &self.options
    }

    pub fn bundles(&self) -> Result<&[Bundle]> {
        cached(&self.bundles, || self.catalog.get_bundles()).map(Vec::as_slice)
    }

    /// User name for dev bundles; configured value first, then the server.
    pub fn active_user(&self) -> Result<&str> {
        cached(&self.active_user, || match &self.options.active_user {
            Some(user) => Ok(user.clone()),
            None => self.catalog.current_user(),
        })
        .map(String::as_str)
    }

    pub fn use_dev(&self) -> Result<bool> {
        Ok(effective_use_dev(self.bundles()?, &self.options.selection))
    }

    /// Bundle selected for this run, `None` when nothing is configured.
    pub fn bundle_to_use(&self) -> Result<Option<&Bundle>> {
        cached(&self.bundle_to_use, || {
            resolve_bundle(self.bundles()?, &self.options.selection, || {
                self.active_user().map(str::to_string)
            })
        })
        .map(Option::as_ref)
    }

    pub fn addons(&self) -> Result<&BTreeMap<String, AddonInfo>> {
        cached(&self.addons, || {
            Ok(self
                .catalog
                .get_addons_info(true)?
                .into_iter()
                .map(|addon| (addon.name.clone(), addon))
                .collect())
        })
    }

    /// Catalog dependency packages by filename.
    pub fn dependency_packages(&self) -> Result<&BTreeMap<String, DependencyItem>> {
        cached(&self.dependency_packages, || {
            Ok(self
                .catalog
                .get_dependency_packages()?
                .into_iter()
                .map(|package| (package.filename.clone(), package))
                .collect())
        })
    }

    /// Package the bundle pins for this platform.
    pub fn dependency_package_item(&self) -> Result<Option<&DependencyItem>> {
        let Some(bundle) = self.bundle_to_use()? else {
            return Ok(None);
        };
        let Some(filename) = bundle.dependency_package(self.options.platform.as_str()) else {
            return Ok(None);
        };
        let package = self.dependency_packages()?.get(filename);
        if package.is_none() {
            warn!("Dependency package {filename} is not available on the server");
        }
        Ok(package)
    }

    pub fn installers(&self) -> Result<&[Installer]> {
        cached(&self.installers, || self.catalog.get_installers()).map(Vec::as_slice)
    }

    pub fn expected_installer_version(&self) -> Result<Option<&str>> {
        Ok(self
            .bundle_to_use()?
            .and_then(|bundle| bundle.installer_version.as_deref()))
    }

    /// Installer of the expected version for this platform.
    pub fn installer_item(&self) -> Result<Option<&Installer>> {
        let Some(version) = self.expected_installer_version()? else {
            return Ok(None);
        };
        let platform = self.options.platform.as_str();
        Ok(self
            .installers()?
            .iter()
            .find(|installer| installer.version == version && installer.platform == platform))
    }

    /// The running launcher differs from the version the bundle pins.
    pub fn need_installer_change(&self) -> Result<bool> {
        if self.options.skip_installer_dist {
            return Ok(false);
        }
        let Some(current) = self.options.current_version.as_deref() else {
            return Ok(false);
        };
        let Some(bundle) = self.bundle_to_use()? else {
            return Ok(false);
        };
        Ok(bundle.installer_version.as_deref() != Some(current))
    }

    pub fn need_installer_distribution(&mut self) -> Result<bool> {
        if !self.need_installer_change()? {
            return Ok(false);
        }
        Ok(self.installer_executable()?.is_none())
    }

    pub fn installer_dist_error(&self) -> Option<&str> {
        self.installer_dist_error.as_deref()
    }

    /// Where the downloaded installer was stored, for manual installation.
    pub fn installer_filepath(&self) -> Option<&Path> {
        self.installer_filepath.as_deref()
    }

    /// Launcher executable that should run the bundle.
    ///
    /// The running executable when no change is needed. Otherwise an already
    /// installed executable of the expected version, found through the
    /// executables file or next to the current installation.
    pub fn installer_executable(&mut self) -> Result<Option<PathBuf>> {
        if let Some(executable) = &self.installer_executable {
            return Ok(executable.clone());
        }

        let executable = if self.need_installer_change()? {
            self.find_installed_executable()?
        } else {
            self.options.current_executable.clone()
        };
        self.installer_executable = Some(executable.clone());
        Ok(executable)
    }

    fn find_installed_executable(&self) -> Result<Option<PathBuf>> {
        let Some(expected) = self.expected_installer_version()? else {
            return Ok(None);
        };

        let registry = ExecutablesRegistry::new(self.options.executables_file.clone());
        if let Some(path) = registry.find(expected, self.options.current_executable.as_deref()) {
            debug!("Found registered executable {}", path.display());
            return Ok(Some(path));
        }

        let guessed = match self.options.platform {
            Platform::Darwin => Some(
                PathBuf::from("/Applications")
                    .join(format!("{} {expected}.app", self.options.app_name))
                    .join("Contents")
                    .join("MacOS")
                    .join(&self.options.executable_name),
            ),
            _ => self.guess_sibling_executable(expected),
        };
        Ok(guessed.filter(|path| path.exists()))
    }

    /// `{root}/launcher-1.0.0/distkit` -> `{root}/launcher-1.2.0/distkit`
    fn guess_sibling_executable(&self, expected: &str) -> Option<PathBuf> {
        let current_version = self.options.current_version.as_deref()?;
        let current_exe = self.options.current_executable.as_deref()?;
        let exe_name = current_exe.file_name()?;
        let exe_dir = current_exe.parent()?;
        let dir_name = exe_dir.file_name()?.to_str()?;
        if !dir_name.contains(current_version) {
            return None;
        }
        let install_root = exe_dir.parent()?;
        Some(
            install_root
                .join(dir_name.replace(current_version, expected))
                .join(exe_name),
        )
    }

    /// Download and install the launcher build the bundle pins.
    ///
    /// Failures are not returned; they are stored in
    /// [`installer_dist_error`](Self::installer_dist_error).
    pub fn distribute_installer(&mut self) -> Result<()> {
        let installer = match self.installer_item()? {
            Some(installer) => installer.clone(),
            None => {
                let bundle_name = self
                    .bundle_to_use()?
                    .map(|bundle| bundle.name.clone())
                    .unwrap_or_default();
                self.installer_executable = Some(None);
                self.installer_dist_error = Some(format!(
                    "Bundle '{bundle_name}' does not have set installer version to use."
                ));
                return Ok(());
            }
        };

        if let Err(e) = self.run_installer_distribution(&installer) {
            warn!("Installer distribution failed due to unknown reasons: {e}");
            self.installer_dist_error = Some(format!(
                "Distribution of launcher {} failed with unexpected reason.",
                installer.version
            ));
        }
        Ok(())
    }

    fn run_installer_distribution(&mut self, installer: &Installer) -> Result<()> {
        let downloads_dir = self
            .options
            .downloads_dir
            .clone()
            .filter(|dir| dir.is_dir());
        let temp_dir = match downloads_dir {
            Some(_) => None,
            None => Some(tempfile::Builder::new().prefix("distkit_installer").tempdir()?),
        };
        let download_dir = match (&temp_dir, downloads_dir) {
            (Some(temp_dir), _) => temp_dir.path().to_path_buf(),
            (None, Some(dir)) => dir,
            (None, None) => std::env::temp_dir(),
        };

        let routine: Arc<dyn InstallRoutine> = match &self.install_routine {
            Some(routine) => routine.clone(),
            None => Arc::new(PlatformInstaller::for_current_exe(&self.options.executable_name)?),
        };

        let config = ItemConfig {
            label: format!("Installer {}", installer.version),
            state: UpdateState::Outdated,
            download_dir,
            checksum: installer.checksum.clone(),
            checksum_algorithm: installer.checksum_algorithm.clone(),
            require_checksum: self.options.require_checksum,
            sources: installer.sources.clone(),
            context: DownloadContext::Installer {
                version: installer.version.clone(),
                filename: installer.filename.clone(),
            },
        };
        let mut item = DistributionItem::installer(
            config,
            self.registry.clone(),
            routine,
            temp_dir.is_some(),
        );

        if self.options.platform != Platform::Windows && item.is_missing_permissions() {
            self.installer_dist_error = Some(
                "Your user does not have required permissions to update the launcher. \
                 Please contact your administrator, or use a user with permissions."
                    .to_string(),
            );
            return Ok(());
        }

        if let Some(progress) = self.progress.as_mut() {
            item.attach_progress(progress.as_mut());
        }
        item.distribute();

        let executable = item.executable().map(Path::to_path_buf);
        self.installer_filepath = item
            .installer_path()
            .filter(|path| path.exists())
            .map(Path::to_path_buf);
        self.installer_dist_error = if let Some(error) = item.installer_error() {
            Some(error.to_string())
        } else if item.state() == UpdateState::MissSourceFiles {
            Some(format!(
                "Couldn't find valid installer source for required launcher version {}.",
                installer.version
            ))
        } else if item.state() != UpdateState::Updated {
            Some(format!(
                "Failed to download installer for required launcher version {}.",
                installer.version
            ))
        } else if executable.is_none() {
            Some(
                "Couldn't find installed launcher. Please try to launch the launcher manually."
                    .to_string(),
            )
        } else {
            None
        };
        self.installer_executable = Some(executable);
        Ok(())
    }

    pub fn get_addons_metadata_filepath(&self) -> PathBuf {
        paths::addons_metadata_file(&self.options.addons_root)
    }

    pub fn get_dependency_metadata_filepath(&self) -> PathBuf {
        paths::dependency_metadata_file(&self.options.dependencies_root)
    }

    /// Addons the bundle requires, seeded `Updated` when both the metadata
    /// entry and the directory exist.
    pub fn get_addon_dist_items(&mut self) -> Result<&[AddonDistItem]> {
        self.prepare_dist_items()?;
        Ok(self.addon_dist_items.as_deref().unwrap_or_default())
    }

    pub fn get_dependency_dist_item(&mut self) -> Result<Option<&DistributionItem>> {
        self.prepare_dist_items()?;
        Ok(self.dependency_dist_item.as_ref().and_then(Option::as_ref))
    }

    /// Dependency package first, then addons.
    pub fn get_all_distribution_items(&mut self) -> Result<Vec<&DistributionItem>> {
        self.prepare_dist_items()?;
        let mut items: Vec<&DistributionItem> = Vec::new();
        if let Some(Some(item)) = &self.dependency_dist_item {
            items.push(item);
        }
        if let Some(addon_items) = &self.addon_dist_items {
            items.extend(addon_items.iter().map(|item| &item.dist_item));
        }
        Ok(items)
    }

    pub fn need_distribution(&mut self) -> Result<bool> {
        if self.need_installer_change()? {
            return self.need_installer_distribution();
        }
        Ok(self
            .get_all_distribution_items()?
            .iter()
            .any(|item| item.need_distribution()))
    }

    /// Some pending item cannot write its target directory. The launcher
    /// update reports permissions through
    /// [`installer_dist_error`](Self::installer_dist_error) instead.
    pub fn is_missing_permissions(&mut self) -> Result<bool> {
        Ok(self
            .get_all_distribution_items()?
            .iter()
            .any(|item| item.need_distribution() && item.is_missing_permissions()))
    }

    fn prepare_dist_items(&mut self) -> Result<()> {
        if self.addon_dist_items.is_some() && self.dependency_dist_item.is_some() {
            return Ok(());
        }
        let addon_items = self.build_addon_dist_items()?;
        let dependency_item = self.build_dependency_dist_item()?;
        self.addon_dist_items = Some(addon_items);
        self.dependency_dist_item = Some(dependency_item);
        Ok(())
    }

    fn new_download_dir(&self) -> PathBuf {
        staging::new_download_dir(&staging::download_root(
            self.options.downloads_dir.as_deref(),
        ))
    }

    fn build_addon_dist_items(&self) -> Result<Vec<AddonDistItem>> {
        let Some(bundle) = self.bundle_to_use()? else {
            return Ok(Vec::new());
        };
        let use_dev = self.use_dev()?;
        let addons = self.addons()?;
        let metadata = read_addons_metadata(&self.get_addons_metadata_filepath());

        let mut items = Vec::new();
        for (addon_name, version) in &bundle.addon_versions {
            let Some(version) = version.as_deref().filter(|v| !v.is_empty()) else {
                continue;
            };
            if use_dev && bundle.dev_addon(addon_name).is_some() {
                debug!("Addon {addon_name} is redirected to a development path");
                continue;
            }

            let Some(version_info) = addons
                .get(addon_name)
                .and_then(|addon| addon.versions.get(version))
            else {
                warn!("Version '{version}' of addon '{addon_name}' is not available on server.");
                continue;
            };
            if !version_info.require_distribution {
                continue;
            }

            let target_dir = self.options.addons_root.join(&version_info.full_name);
            debug!(
                "Checking {} in {}",
                version_info.full_name,
                target_dir.display()
            );
            let in_metadata = metadata
                .get(addon_name)
                .is_some_and(|versions| versions.contains_key(version));
            let state = if in_metadata && target_dir.is_dir() {
                UpdateState::Updated
            } else {
                UpdateState::Outdated
            };

            let config = ItemConfig {
                label: version_info.full_name.clone(),
                state,
                download_dir: self.new_download_dir(),
                checksum: version_info.checksum.clone(),
                checksum_algorithm: version_info.checksum_algorithm.clone(),
                require_checksum: self.options.require_checksum,
                sources: version_info.sources.clone(),
                context: DownloadContext::Addon {
                    name: addon_name.clone(),
                    version: version.to_string(),
                },
            };
            let dist_item = DistributionItem::unpack(
                config,
                self.registry.clone(),
                target_dir,
                staging::unzip_dir(&self.options.addons_root),
            );
            items.push(AddonDistItem {
                addon_name: addon_name.clone(),
                addon_version: version.to_string(),
                version_info: version_info.clone(),
                dist_item,
            });
        }
        Ok(items)
    }

    fn build_dependency_dist_item(&self) -> Result<Option<DistributionItem>> {
        let Some(package) = self.dependency_package_item()? else {
            return Ok(None);
        };

        let metadata = read_dependency_metadata(&self.get_dependency_metadata_filepath());
        let target_dir = self.options.dependencies_root.join(&package.filename);
        debug!("Checking {} in {}", package.filename, target_dir.display());
        let state = if target_dir.is_dir() && metadata.contains_key(&package.filename) {
            UpdateState::Updated
        } else {
            UpdateState::Outdated
        };

        let config = ItemConfig {
            label: package.label(),
            state,
            download_dir: self.new_download_dir(),
            checksum: package.checksum.clone(),
            checksum_algorithm: package.checksum_algorithm.clone(),
            require_checksum: self.options.require_checksum,
            sources: package.sources.clone(),
            context: DownloadContext::DependencyPackage {
                name: package.filename.clone(),
                platform: self.options.platform,
            },
        };
        Ok(Some(DistributionItem::unpack(
            config,
            self.registry.clone(),
            target_dir,
            staging::unzip_dir(&self.options.dependencies_root),
        )))
    }

    /// Distribute everything the bundle needs. Callable once per controller.
    ///
    /// When the launcher itself must change only the installer is handled;
    /// the caller is expected to restart with the new executable. Item
    /// failures are not errors here, see
    /// [`validate_distribution`](Self::validate_distribution).
    pub fn distribute(&mut self, threaded: bool) -> Result<()> {
        if self.dist_started {
            return Err(DistError::DistributionAlreadyStarted);
        }
        self.dist_started = true;

        if self.need_installer_change()? {
            if self.need_installer_distribution()? {
                self.distribute_installer()?;
            }
            return Ok(());
        }

        self.prepare_dist_items()?;
        let max_workers = self.options.max_workers.max(1);

        let mut pending: Vec<&mut DistributionItem> = Vec::new();
        if let Some(Some(item)) = self.dependency_dist_item.as_mut() {
            pending.push(item);
        }
        if let Some(addon_items) = self.addon_dist_items.as_mut() {
            pending.extend(addon_items.iter_mut().map(|item| &mut item.dist_item));
        }
        pending.retain(|item| !item.is_distributed());

        for item in pending.iter_mut() {
            if let Err(e) = staging::create_expire_file(item.download_dir()) {
                warn!(
                    "Failed to prepare download directory {}: {e}",
                    item.download_dir().display()
                );
            }
            if let Some(progress) = self.progress.as_mut() {
                item.attach_progress(progress.as_mut());
            }
        }

        let total = pending.len();
        info!("Distributing {total} item(s)");
        let mut overall = match self.progress.as_mut() {
            Some(progress) if total > 0 => {
                let mut overall = progress.create_child();
                overall.start(
                    ProgressConfig::new("Distributing", "bundle", ProgressStyle::Count)
                        .with_total(total as u64),
                );
                Some(overall)
            }
            _ => None,
        };

        if threaded && total > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(max_workers.min(total))
                .build()?;
            pool.install(|| pending.into_par_iter().for_each(|item| item.distribute()));
            if let Some(overall) = overall.as_mut() {
                overall.update(total as u64, None);
            }
        } else {
            for (done, item) in pending.into_iter().enumerate() {
                item.distribute();
                if let Some(overall) = overall.as_mut() {
                    overall.update(done as u64 + 1, None);
                }
            }
        }
        if let Some(mut overall) = overall {
            overall.complete(None);
        }

        self.finish_distribution()
    }

    /// Remove scratch directories and record every item that needed work and
    /// reached `Updated`. Failed items leave existing records untouched.
    pub fn finish_distribution(&mut self) -> Result<()> {
        self.prepare_dist_items()?;

        for item in self.get_all_distribution_items()? {
            let scratch = [Some(item.download_dir()), item.unzip_dir()];
            for dir in scratch.into_iter().flatten() {
                if dir.exists()
                    && let Err(e) = fs::remove_dir_all(dir)
                {
                    debug!("Failed to remove {}: {e}", dir.display());
                }
            }
        }

        let mut addon_records: BTreeMap<String, BTreeMap<String, DistributionRecord>> =
            BTreeMap::new();
        for item in self.addon_dist_items.iter().flatten() {
            if let Some(record) = distribution_record(&item.dist_item) {
                addon_records
                    .entry(item.addon_name.clone())
                    .or_default()
                    .insert(item.addon_version.clone(), record);
            }
        }
        metadata::update_addons_metadata(&self.get_addons_metadata_filepath(), addon_records)?;

        if let Some(Some(item)) = &self.dependency_dist_item
            && let Some(record) = distribution_record(item)
            && let DownloadContext::DependencyPackage { name, .. } = item.context()
        {
            metadata::update_dependency_metadata(
                &self.get_dependency_metadata_filepath(),
                name,
                record,
            )?;
        }

        staging::cleanup_expired_dirs(&staging::download_root(
            self.options.downloads_dir.as_deref(),
        ));
        for root in [&self.options.addons_root, &self.options.dependencies_root] {
            staging::cleanup_expired_dirs(&root.join(staging::UNZIP_DIR_NAME));
        }
        Ok(())
    }

    /// Fail with every required artifact that is not `Updated`.
    pub fn validate_distribution(&mut self) -> Result<()> {
        self.prepare_dist_items()?;
        let mut invalid = Vec::new();
        if let Some(Some(item)) = &self.dependency_dist_item
            && item.state() != UpdateState::Updated
        {
            invalid.push(DEPENDENCY_PACKAGE_LABEL.to_string());
        }
        for item in self.addon_dist_items.iter().flatten() {
            if item.dist_item.state() != UpdateState::Updated {
                invalid.push(item.addon_name.clone());
            }
        }

        if invalid.is_empty() {
            Ok(())
        } else {
            Err(DistError::DistributionFailed { items: invalid })
        }
    }

    /// Paths for the module search path of the launcher process only.
    pub fn get_sys_paths(&mut self) -> Result<Vec<PathBuf>> {
        let mut output = Vec::new();
        if let Some(target_dir) = self
            .get_dependency_dist_item()?
            .and_then(|item| item.target_dir())
        {
            let runtime_dir = target_dir.join(DEPENDENCY_RUNTIME_DIR);
            if runtime_dir.exists() {
                output.push(runtime_dir);
            }
        }
        Ok(output)
    }

    /// Paths for the module search path of the launcher and its children:
    /// distributed addons, dev addon paths and the dependency package's
    /// python packages.
    pub fn get_python_paths(&mut self) -> Result<Vec<PathBuf>> {
        let mut output: Vec<PathBuf> = self
            .get_addon_dist_items()?
            .iter()
            .filter(|item| item.dist_item.state() == UpdateState::Updated)
            .filter_map(|item| item.dist_item.target_dir())
            .filter(|dir| dir.exists())
            .map(Path::to_path_buf)
            .collect();

        output.extend(self.dev_addon_paths()?);

        if let Some(target_dir) = self
            .get_dependency_dist_item()?
            .and_then(|item| item.target_dir())
        {
            let python_dir = target_dir.join(DEPENDENCY_PYTHON_DIR);
            if python_dir.exists() {
                output.push(python_dir);
            }
        }
        Ok(output)
    }

    fn dev_addon_paths(&self) -> Result<Vec<PathBuf>> {
        if !self.use_dev()? {
            return Ok(Vec::new());
        }
        let Some(bundle) = self.bundle_to_use()? else {
            return Ok(Vec::new());
        };

        let addons = self.addons()?;
        let mut output = Vec::new();
        for addon_name in addons.keys() {
            if bundle.addon_version(addon_name).is_none() {
                continue;
            }
            let Some(dev_info) = bundle.dev_addon(addon_name) else {
                continue;
            };
            match expand_env_placeholders(&dev_info.path) {
                Some(path) => output.push(PathBuf::from(path)),
                None => warn!(
                    "Failed to format path '{}' for addon '{addon_name}'.",
                    dev_info.path
                ),
            }
        }
        Ok(output)
    }

    /// Register the running launcher in the executables file.
    pub fn record_current_executable(&self) -> Result<bool> {
        let (Some(version), Some(executable)) = (
            self.options.current_version.as_deref(),
            self.options.current_executable.as_deref(),
        ) else {
            return Ok(false);
        };
        ExecutablesRegistry::new(self.options.executables_file.clone()).record(version, executable)
    }
}

fn distribution_record(item: &DistributionItem) -> Option<DistributionRecord> {
    if !item.need_distribution() || item.state() != UpdateState::Updated {
        return None;
    }
    let source = item.used_source()?;
    Some(DistributionRecord::new(
        source,
        item.checksum().map(str::to_string),
        item.checksum_algorithm(),
    ))
}

/// Replace `{NAME}` with the value of environment variable `NAME`. `None`
/// when a referenced variable is not set.
///
/// Accepted shape: literal text with `{NAME}` placeholders, where `NAME` is
/// any run of characters other than `}`. An unclosed `{` also gives `None`.
pub fn expand_env_placeholders(template: &str) -> Option<String> {
    let mut output = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        output.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let end = after.find('}')?;
        let value = std::env::var(&after[..end]).ok()?;
        output.push_str(&value);
        rest = &after[end + 1..];
    }
    output.push_str(rest);
    Some(output)
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod tests;
