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

//! Fetching artifact bytes from the source kinds a catalog can declare.

mod client;
mod filesystem;
mod http;
mod http_file_downloader;
mod progress;
mod server;

pub use client::{AttohttpcClient, DEFAULT_TIMEOUT, HttpClient, HttpResponse};
pub use filesystem::FilesystemDownloader;
pub use http::{GOOGLE_DRIVE_ENDPOINT, HttpDownloader, MAX_REDIRECTS};
pub use http_file_downloader::{HttpFileDownloader, ProgressReporter};
pub use progress::TransferProgress;
pub use server::ServerDownloader;

use crate::archive::extract_archive;
use crate::catalog::Catalog;
use crate::checksum::{ChecksumAlgorithm, verify_checksum};
use crate::error::{DistError, Result};
use crate::models::{SourceInfo, SourceType};
use crate::platform::Platform;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// What is being downloaded. Server sources pick the endpoint from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadContext {
    Installer { version: String, filename: String },
    Addon { name: String, version: String },
    DependencyPackage { name: String, platform: Platform },
}

impl fmt::Display for DownloadContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DownloadContext::Installer { version, .. } => write!(f, "installer {version}"),
            DownloadContext::Addon { name, version } => write!(f, "addon {name} {version}"),
            DownloadContext::DependencyPackage { name, platform } => {
                write!(f, "dependency package {name} ({platform})")
            }
        }
    }
}

/// A way of obtaining a file for one [`SourceType`].
#[cfg_attr(test, mockall::automock)]
pub trait SourceDownloader: Send + Sync {
    /// Fetch the source into `dest_dir` and return the local file path.
    fn download(
        &self,
        source: &SourceInfo,
        dest_dir: &Path,
        context: &DownloadContext,
        progress: &mut TransferProgress,
    ) -> Result<PathBuf>;

    fn verify(&self, path: &Path, checksum: &str, algorithm: ChecksumAlgorithm) -> Result<()> {
        verify_checksum(path, checksum, algorithm)
    }

    /// Extract `path` into `dest_dir` and remove the archive.
    fn unzip(&self, path: &Path, dest_dir: &Path) -> Result<()> {
        extract_archive(path, dest_dir)?;
        fs::remove_file(path)?;
        Ok(())
    }

    /// Remove whatever `download` left behind. Safe to call repeatedly.
    fn cleanup(&self, source: &SourceInfo, dest_dir: &Path, context: &DownloadContext)
    -> Result<()>;
}

/// Maps source types to downloaders.
#[derive(Clone, Default)]
pub struct DownloaderRegistry {
    downloaders: HashMap<SourceType, Arc<dyn SourceDownloader>>,
}

impl DownloaderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the filesystem and HTTP downloaders, plus the server
    /// downloader when a catalog is available.
    pub fn with_defaults(catalog: Option<Arc<dyn Catalog>>, timeout: Duration) -> Self {
        let mut registry = Self::new();
        registry.register(SourceType::Filesystem, Arc::new(FilesystemDownloader));
        registry.register(SourceType::Http, Arc::new(HttpDownloader::new(timeout)));
        if let Some(catalog) = catalog {
            registry.register(SourceType::Server, Arc::new(ServerDownloader::new(catalog)));
        }
        registry
    }

    pub fn register(&mut self, source_type: SourceType, downloader: Arc<dyn SourceDownloader>) {
        self.downloaders.insert(source_type, downloader);
    }

    pub fn get(&self, source_type: SourceType) -> Result<Arc<dyn SourceDownloader>> {
        self.downloaders
            .get(&source_type)
            .cloned()
            .ok_or_else(|| DistError::UnknownDownloader(source_type.to_string()))
    }
}

impl fmt::Debug for DownloaderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut types: Vec<&str> = self.downloaders.keys().map(SourceType::as_str).collect();
        types.sort_unstable();
        f.debug_struct("DownloaderRegistry")
            .field("types", &types)
            .finish()
    }
}

/// Remove `dest_dir/filename` if it is a file.
pub(crate) fn remove_downloaded_file(dest_dir: &Path, filename: &str) -> Result<()> {
    let path = dest_dir.join(filename);
    if path.is_file() {
        fs::remove_file(path)?;
    }
    Ok(())
}
