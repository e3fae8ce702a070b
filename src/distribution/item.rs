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

use super::installer::InstallRoutine;
use super::state::UpdateState;
use crate::checksum::{ChecksumAlgorithm, calculate_checksum};
use crate::download::{DownloadContext, DownloaderRegistry, SourceDownloader, TransferProgress};
use crate::error::{DistError, Result, format_error_chain};
use crate::indicator::ProgressIndicator;
use crate::models::SourceInfo;
use crate::platform::file_ops::is_dir_writable;
use log::{debug, error, info, warn};
use std::any::Any;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use uuid::Uuid;

const RENAME_ATTEMPTS: usize = 5;
const RENAME_RETRY_DELAY: Duration = Duration::from_millis(200);

pub const UNEXPECTED_INSTALLER_ERROR: &str =
    "Distribution of launcher failed with unexpected reason.";

/// Common inputs of every distribution item.
#[derive(Debug, Clone)]
pub struct ItemConfig {
    pub label: String,
    pub state: UpdateState,
    pub download_dir: PathBuf,
    pub checksum: Option<String>,
    pub checksum_algorithm: String,
    pub require_checksum: bool,
    pub sources: Vec<SourceInfo>,
    pub context: DownloadContext,
}

/// One source of an item together with the tracker of its attempt.
#[derive(Debug)]
pub struct SourceAttempt {
    pub source: SourceInfo,
    pub progress: TransferProgress,
}

/// Launcher installation state of an installer item.
struct InstallerTarget {
    routine: Arc<dyn InstallRoutine>,
    cleanup_on_fail: bool,
    executable: Option<PathBuf>,
    installer_path: Option<PathBuf>,
    installer_error: Option<String>,
}

enum ItemKind {
    /// Archive unpacked into `target_dir` through `unzip_dir`.
    Unpack { target_dir: PathBuf, unzip_dir: PathBuf },
    Install(InstallerTarget),
}

/// One artifact that has to reach the local machine.
///
/// Sources are tried in order. The first source that downloads, passes the
/// checksum and post-processes successfully wins. Errors never leave
/// [`distribute`](Self::distribute); they end up in the item state,
/// [`error_message`](Self::error_message) and the per-source trackers.
pub struct DistributionItem {
    label: String,
    state: UpdateState,
    need_distribution: bool,
    download_dir: PathBuf,
    checksum: Option<String>,
    checksum_algorithm: String,
    require_checksum: bool,
    registry: DownloaderRegistry,
    sources: Vec<SourceAttempt>,
    context: DownloadContext,
    kind: ItemKind,
    current_source: Option<usize>,
    used_source: Option<usize>,
    dist_started: bool,
    error_message: Option<String>,
    error_detail: Option<String>,
}

impl DistributionItem {
    /// Addon or dependency package extracted into `target_dir`.
    pub fn unpack(
        config: ItemConfig,
        registry: DownloaderRegistry,
        target_dir: PathBuf,
        unzip_dir: PathBuf,
    ) -> Self {
        Self::build(config, registry, ItemKind::Unpack { target_dir, unzip_dir })
    }

    /// Launcher build installed through `routine`.
    pub fn installer(
        config: ItemConfig,
        registry: DownloaderRegistry,
        routine: Arc<dyn InstallRoutine>,
        cleanup_on_fail: bool,
    ) -> Self {
        Self::build(
            config,
            registry,
            ItemKind::Install(InstallerTarget {
                routine,
                cleanup_on_fail,
                executable: None,
                installer_path: None,
                installer_error: None,
            }),
        )
    }

    fn build(config: ItemConfig, registry: DownloaderRegistry, kind: ItemKind) -> Self {
        let sources = config
            .sources
            .into_iter()
            .map(|source| SourceAttempt {
                source,
                progress: TransferProgress::new(),
            })
            .collect();

        Self {
            label: config.label,
            need_distribution: config.state != UpdateState::Updated,
            state: config.state,
            download_dir: config.download_dir,
            checksum: config.checksum,
            checksum_algorithm: config.checksum_algorithm,
            require_checksum: config.require_checksum,
            registry,
            sources,
            context: config.context,
            kind,
            current_source: None,
            used_source: None,
            dist_started: false,
            error_message: None,
            error_detail: None,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn state(&self) -> UpdateState {
        self.state
    }

    /// Whether work was needed when the item was created.
    pub fn need_distribution(&self) -> bool {
        self.need_distribution
    }

    pub fn is_distributed(&self) -> bool {
        !self.need_distribution || self.state == UpdateState::Updated
    }

    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    pub fn target_dir(&self) -> Option<&Path> {
        match &self.kind {
            ItemKind::Unpack { target_dir, .. } => Some(target_dir),
            ItemKind::Install(_) => None,
        }
    }

    pub fn unzip_dir(&self) -> Option<&Path> {
        match &self.kind {
            ItemKind::Unpack { unzip_dir, .. } => Some(unzip_dir),
            ItemKind::Install(_) => None,
        }
    }

    pub fn context(&self) -> &DownloadContext {
        &self.context
    }

    /// Declared checksum, or the one computed from the received file when the
    /// catalog had none.
    pub fn checksum(&self) -> Option<&str> {
        self.checksum.as_deref()
    }

    pub fn checksum_algorithm(&self) -> &str {
        &self.checksum_algorithm
    }

    pub fn sources(&self) -> &[SourceAttempt] {
        &self.sources
    }

    pub fn used_source(&self) -> Option<&SourceInfo> {
        self.used_source.map(|index| &self.sources[index].source)
    }

    pub fn used_source_progress(&self) -> Option<&TransferProgress> {
        self.used_source.map(|index| &self.sources[index].progress)
    }

    /// Short reason of a failed distribution.
    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    /// Full error chain or panic message behind [`error_message`](Self::error_message).
    pub fn error_detail(&self) -> Option<&str> {
        self.error_detail.as_deref()
    }

    /// Path of the installed launcher executable.
    pub fn executable(&self) -> Option<&Path> {
        match &self.kind {
            ItemKind::Install(target) => target.executable.as_deref(),
            ItemKind::Unpack { .. } => None,
        }
    }

    /// Where the downloaded installer was stored, for manual installation.
    pub fn installer_path(&self) -> Option<&Path> {
        match &self.kind {
            ItemKind::Install(target) => target.installer_path.as_deref(),
            ItemKind::Unpack { .. } => None,
        }
    }

    /// Known installer error, safe to show to the user verbatim.
    pub fn installer_error(&self) -> Option<&str> {
        match &self.kind {
            ItemKind::Install(target) => target.installer_error.as_deref(),
            ItemKind::Unpack { .. } => None,
        }
    }

    pub fn is_missing_permissions(&self) -> bool {
        match &self.kind {
            ItemKind::Unpack { target_dir, .. } => !is_dir_writable(target_dir),
            ItemKind::Install(target) => !is_dir_writable(&target.routine.install_root()),
        }
    }

    /// Give every source tracker a child bar of `parent`.
    pub fn attach_progress(&mut self, parent: &mut dyn ProgressIndicator) {
        for attempt in &mut self.sources {
            let label = format!("{} ({})", self.label, attempt.source.describe());
            attempt.progress.attach_indicator(&label, parent.create_child());
        }
    }

    /// Run the distribution once. Later calls and items that are already
    /// distributed return immediately.
    pub fn distribute(&mut self) {
        if self.is_distributed() || self.dist_started {
            return;
        }
        self.dist_started = true;

        match panic::catch_unwind(AssertUnwindSafe(|| self.run())) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                error!("{}: Distribution failed: {e}", self.label);
                self.state = UpdateState::UpdateFailed;
                self.error_message = Some(e.to_string());
                self.error_detail = Some(format_error_chain(&e));
            }
            Err(payload) => {
                let detail = panic_message(payload.as_ref());
                error!("{}: Distribution failed: {detail}", self.label);
                self.state = UpdateState::UpdateFailed;
                self.error_message = Some("Distribution failed unexpectedly".to_string());
                self.error_detail = Some(detail);
            }
        }

        if self.state == UpdateState::Outdated {
            self.state = UpdateState::UpdateFailed;
            self.error_message = Some("Distribution failed".to_string());
        }

        self.post_distribute();
    }

    fn run(&mut self) -> Result<()> {
        if self.sources.is_empty() {
            let message = format!("{}: Don't have any sources to download from.", self.label);
            error!("{message}");
            self.error_message = Some(message);
            self.state = UpdateState::MissSourceFiles;
            return Ok(());
        }

        for index in 0..self.sources.len() {
            self.current_source = Some(index);
            let source = self.sources[index].source.clone();
            let mut progress = std::mem::take(&mut self.sources[index].progress);
            let outcome = self.process_source(&source, &mut progress);
            self.sources[index].progress = progress;
            if outcome? {
                break;
            }
        }

        let last = self.current_source.take();
        if self.state == UpdateState::Updated {
            self.used_source = last;
            info!("{}: Distributed", self.label);
        } else {
            error!("{}: Failed to distribute", self.label);
            self.state = UpdateState::UpdateFailed;
            self.error_message = Some("Failed to receive or install source files".to_string());
        }
        Ok(())
    }

    /// Returns `true` when no further sources should be tried.
    fn process_source(
        &mut self,
        source: &SourceInfo,
        progress: &mut TransferProgress,
    ) -> Result<bool> {
        progress.set_started();
        fs::create_dir_all(&self.download_dir)?;

        let downloader = match self.registry.get(source.source_type()) {
            Ok(downloader) => downloader,
            Err(e) => {
                let message = e.to_string();
                progress.set_failed(message.as_str());
                warn!("{}: {message}", self.label);
                return Ok(false);
            }
        };

        match self.receive_and_process(source, progress, downloader.as_ref()) {
            Ok(stop) => Ok(stop),
            Err(e) => {
                let message = "Failed to process source";
                progress.set_failed(message);
                warn!("{}: {message}: {e}", self.label);
                Ok(false)
            }
        }
    }

    fn receive_and_process(
        &mut self,
        source: &SourceInfo,
        progress: &mut TransferProgress,
        downloader: &dyn SourceDownloader,
    ) -> Result<bool> {
        let Some((filepath, computed_checksum)) = self.receive_file(source, progress, downloader)
        else {
            return Ok(false);
        };

        let stop = if matches!(self.kind, ItemKind::Install(_)) {
            self.post_install(filepath, source, progress, downloader)
        } else {
            self.post_unpack(filepath, source, progress, downloader)?
        };

        if self.state == UpdateState::Updated {
            if self.checksum.is_none() {
                self.checksum = computed_checksum;
            }
            progress.finish("Distributed");
        }
        Ok(stop)
    }

    /// Download and verify. Returns the file and, when the catalog had no
    /// checksum, the digest computed from it.
    fn receive_file(
        &self,
        source: &SourceInfo,
        progress: &mut TransferProgress,
        downloader: &dyn SourceDownloader,
    ) -> Option<(PathBuf, Option<String>)> {
        let download = downloader.download(source, &self.download_dir, &self.context, progress);
        let filepath = match download {
            Ok(filepath) => filepath,
            Err(e) => {
                let message = "Failed to download source";
                progress.set_failed(message);
                warn!("{}: {message} {}: {e}", self.label, source.describe());
                return None;
            }
        };

        progress.set_hash_check_started();
        let computed = match self.check_file(&filepath, downloader) {
            Ok(computed) => computed,
            Err(e) => {
                let message = "File hash does not match";
                progress.set_failed(message);
                warn!("{}: {message}: {e}", self.label);
                return None;
            }
        };
        progress.set_hash_check_finished();
        Some((filepath, computed))
    }

    fn check_file(
        &self,
        filepath: &Path,
        downloader: &dyn SourceDownloader,
    ) -> Result<Option<String>> {
        let algorithm: ChecksumAlgorithm = self.checksum_algorithm.parse()?;
        match &self.checksum {
            Some(checksum) => {
                downloader.verify(filepath, checksum, algorithm)?;
                Ok(None)
            }
            None if self.require_checksum => Err(DistError::ValidationError(
                "Checksum is required but the catalog does not provide one".to_string(),
            )),
            None => {
                debug!("{}: No checksum in catalog, computing {algorithm}", self.label);
                Ok(Some(calculate_checksum(filepath, algorithm)?))
            }
        }
    }

    fn post_unpack(
        &mut self,
        filepath: PathBuf,
        source: &SourceInfo,
        progress: &mut TransferProgress,
        downloader: &dyn SourceDownloader,
    ) -> Result<bool> {
        let ItemKind::Unpack { target_dir, unzip_dir } = &self.kind else {
            return Ok(false);
        };
        let target_dir = target_dir.clone();
        progress.set_unzip_started();

        let target_name = target_dir.file_name().unwrap_or_default();
        let unzip_path = unzip_dir.join(target_name);

        // Dependency packages are stored in directories named like the archive
        let mut filepath = filepath;
        if filepath == unzip_path {
            let extension = filepath
                .extension()
                .map(|ext| format!(".{}", ext.to_string_lossy()))
                .unwrap_or_default();
            let renamed =
                filepath.with_file_name(format!("{}{extension}", Uuid::new_v4().simple()));
            fs::rename(&filepath, &renamed)?;
            filepath = renamed;
        }

        if unzip_path.exists() {
            fs::remove_dir_all(&unzip_path)?;
        }
        fs::create_dir_all(&unzip_path)?;

        if let Err(e) = downloader.unzip(&filepath, &unzip_path) {
            let message = "Couldn't unzip source file";
            progress.set_failed(message);
            warn!("{}: {message}: {e}", self.label);
            return Ok(false);
        }
        progress.set_unzip_finished();

        let Some(parent) = target_dir.parent() else {
            return Err(DistError::ValidationError(format!(
                "Target directory {} has no parent",
                target_dir.display()
            )));
        };
        let moved_aside_dir = parent.join(Uuid::new_v4().simple().to_string());
        fs::create_dir_all(&target_dir)?;

        let mut moved_aside: Vec<(PathBuf, PathBuf)> = Vec::new();
        for entry in fs::read_dir(&target_dir)? {
            let current = entry?.path();
            let Some(name) = current.file_name() else {
                continue;
            };
            let aside = moved_aside_dir.join(name);
            let moved =
                fs::create_dir_all(&moved_aside_dir).and_then(|_| fs::rename(&current, &aside));
            if let Err(e) = moved {
                let message = "Target files already exist and can't be renamed.";
                progress.set_failed(message);
                warn!("{}: {message} {e}", self.label);
                restore_moved_aside(&moved_aside);
                remove_dir_quietly(&moved_aside_dir);
                return Ok(false);
            }
            moved_aside.push((current, aside));
        }

        let mut moved_in: Vec<PathBuf> = Vec::new();
        let mut failed = false;
        for entry in fs::read_dir(&unzip_path)? {
            let src = entry?.path();
            let Some(name) = src.file_name() else {
                continue;
            };
            let dst = target_dir.join(name);
            debug!("Moving {} to {}", src.display(), dst.display());
            if let Err(e) = rename_with_retries(&src, &dst) {
                let message = "Failed to move unzipped content to target directory.";
                progress.set_failed(message);
                warn!("{}: {message} {e}", self.label);
                failed = true;
                break;
            }
            moved_in.push(dst);
        }

        if failed {
            for path in &moved_in {
                remove_path_quietly(path);
            }
            restore_moved_aside(&moved_aside);
        }
        remove_dir_quietly(&moved_aside_dir);
        if failed {
            return Ok(false);
        }

        self.state = UpdateState::Updated;
        self.cleanup_source(source, downloader);
        Ok(true)
    }

    fn post_install(
        &mut self,
        filepath: PathBuf,
        source: &SourceInfo,
        progress: &mut TransferProgress,
        downloader: &dyn SourceDownloader,
    ) -> bool {
        let ItemKind::Install(target) = &mut self.kind else {
            return false;
        };
        target.installer_path = Some(filepath.clone());

        let success = match target.routine.install(&filepath) {
            Ok(executable) => {
                target.executable = executable;
                true
            }
            Err(DistError::InstallerDistribution(message)) => {
                progress.set_failed("Installation failed");
                target.installer_error = Some(message);
                false
            }
            Err(e) => {
                progress.set_failed("Installation failed");
                warn!("{}: Installation failed: {e}", self.label);
                target.installer_error = Some(UNEXPECTED_INSTALLER_ERROR.to_string());
                false
            }
        };
        let cleanup = success || target.cleanup_on_fail;

        self.state = if success {
            UpdateState::Updated
        } else {
            UpdateState::UpdateFailed
        };
        if cleanup {
            self.cleanup_source(source, downloader);
        }
        true
    }

    fn cleanup_source(&self, source: &SourceInfo, downloader: &dyn SourceDownloader) {
        if let Err(e) = downloader.cleanup(source, &self.download_dir, &self.context) {
            warn!("{}: Failed to clean up downloaded files: {e}", self.label);
        }
    }

    fn post_distribute(&mut self) {
        if self.state == UpdateState::Updated {
            return;
        }
        if let ItemKind::Unpack { target_dir, .. } = &self.kind
            && target_dir.is_dir()
        {
            debug!("Cleaning {}", target_dir.display());
            if let Err(e) = fs::remove_dir_all(target_dir) {
                warn!("{}: Failed to remove {}: {e}", self.label, target_dir.display());
            }
        }
    }
}

impl std::fmt::Debug for DistributionItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DistributionItem")
            .field("label", &self.label)
            .field("state", &self.state)
            .field("need_distribution", &self.need_distribution)
            .field("target_dir", &self.target_dir())
            .field("sources", &self.sources.len())
            .finish()
    }
}

fn rename_with_retries(src: &Path, dst: &Path) -> std::io::Result<()> {
    let mut attempt = 1;
    loop {
        match fs::rename(src, dst) {
            Ok(()) => return Ok(()),
            Err(e) if attempt >= RENAME_ATTEMPTS => return Err(e),
            Err(e) => {
                debug!("Rename attempt {attempt} of {} failed: {e}", src.display());
                attempt += 1;
                thread::sleep(RENAME_RETRY_DELAY);
            }
        }
    }
}

fn restore_moved_aside(moved: &[(PathBuf, PathBuf)]) {
    for (original, aside) in moved {
        if let Err(e) = fs::rename(aside, original) {
            error!(
                "Failed to restore {} from {}: {e}",
                original.display(),
                aside.display()
            );
        }
    }
}

fn remove_path_quietly(path: &Path) {
    let result = if path.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    if let Err(e) = result {
        warn!("Failed to remove {}: {e}", path.display());
    }
}

fn remove_dir_quietly(path: &Path) {
    if path.exists()
        && let Err(e) = fs::remove_dir_all(path)
    {
        warn!("Failed to remove {}: {e}", path.display());
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
#[path = "item_tests.rs"]
mod tests;
