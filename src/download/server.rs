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

use super::{DownloadContext, SourceDownloader, TransferProgress, remove_downloaded_file};
use crate::catalog::Catalog;
use crate::error::{DistError, Result};
use crate::models::SourceInfo;
use log::debug;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Downloads files hosted by the catalog server itself.
pub struct ServerDownloader {
    catalog: Arc<dyn Catalog>,
}

impl ServerDownloader {
    pub fn new(catalog: Arc<dyn Catalog>) -> Self {
        Self { catalog }
    }
}

/// Name of the downloaded file. A bare path falls back to its last segment.
fn server_filename(filename: Option<&str>, path: Option<&str>) -> Option<String> {
    filename
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .or_else(|| {
            path.and_then(|path| path.rsplit('/').find(|segment| !segment.is_empty()))
                .map(str::to_string)
        })
}

impl SourceDownloader for ServerDownloader {
    fn download(
        &self,
        source: &SourceInfo,
        dest_dir: &Path,
        context: &DownloadContext,
        progress: &mut TransferProgress,
    ) -> Result<PathBuf> {
        let SourceInfo::Server { filename, path } = source else {
            return Err(DistError::UnknownDownloader(format!(
                "server downloader cannot handle {} sources",
                source.source_type()
            )));
        };

        let path = path.as_deref().filter(|path| !path.is_empty());
        let filename = server_filename(filename.as_deref(), path).ok_or_else(|| {
            DistError::Download(format!("Server source for {context} has no filename"))
        })?;

        debug!("Downloading {filename} to {}", dest_dir.display());

        if let Some(path) = path {
            return self
                .catalog
                .download_file(path, &dest_dir.join(&filename), Some(progress));
        }

        match context {
            DownloadContext::DependencyPackage { name, .. } => self
                .catalog
                .download_dependency_package(name, dest_dir, &filename, Some(progress)),
            DownloadContext::Addon { name, version } => self
                .catalog
                .download_addon_private_file(name, version, &filename, dest_dir, Some(progress)),
            DownloadContext::Installer { .. } => {
                let destination = dest_dir.join(&filename);
                self.catalog
                    .download_installer(&filename, &destination, Some(progress))?;
                Ok(destination)
            }
        }
    }

    fn cleanup(
        &self,
        source: &SourceInfo,
        dest_dir: &Path,
        _context: &DownloadContext,
    ) -> Result<()> {
        if let SourceInfo::Server { filename, path } = source
            && let Some(filename) = server_filename(filename.as_deref(), path.as_deref())
        {
            remove_downloaded_file(dest_dir, &filename)?;
        }
        Ok(())
    }
}
