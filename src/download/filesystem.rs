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

use super::{DownloadContext, SourceDownloader, TransferProgress};
use crate::archive::extract_archive;
use crate::error::{DistError, Result};
use crate::models::SourceInfo;
use crate::platform::Platform;
use log::debug;
use std::path::{Path, PathBuf};

/// Uses files reachable on a local or mounted drive.
///
/// Nothing is copied: the declared path itself is returned and archives are
/// extracted straight from it.
#[derive(Debug, Default, Clone, Copy)]
pub struct FilesystemDownloader;

impl SourceDownloader for FilesystemDownloader {
    fn download(
        &self,
        source: &SourceInfo,
        _dest_dir: &Path,
        _context: &DownloadContext,
        progress: &mut TransferProgress,
    ) -> Result<PathBuf> {
        let SourceInfo::Filesystem { path } = source else {
            return Err(DistError::UnknownDownloader(format!(
                "filesystem downloader cannot handle {} sources",
                source.source_type()
            )));
        };

        let platform = Platform::current();
        let Some(filepath) = path.for_platform(platform) else {
            return Err(DistError::SourceNotAccessible(format!(
                "No path defined for {platform}"
            )));
        };

        let filepath = PathBuf::from(filepath);
        if !filepath.exists() {
            return Err(DistError::SourceNotAccessible(format!(
                "{} is not accessible",
                filepath.display()
            )));
        }

        debug!("Using local source {}", filepath.display());
        if let Ok(metadata) = filepath.metadata() {
            progress.set_content_size(metadata.len());
            progress.set_transferred(metadata.len());
        }
        Ok(filepath)
    }

    fn unzip(&self, path: &Path, dest_dir: &Path) -> Result<()> {
        // The archive belongs to the user, keep it
        extract_archive(path, dest_dir)
    }

    fn cleanup(
        &self,
        _source: &SourceInfo,
        _dest_dir: &Path,
        _context: &DownloadContext,
    ) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MultiPlatformPath;
    use std::fs;
    use tempfile::TempDir;

    fn source_for(path: &str) -> SourceInfo {
        let value = path.to_string();
        SourceInfo::Filesystem {
            path: MultiPlatformPath {
                windows: Some(value.clone()),
                linux: Some(value.clone()),
                darwin: Some(value),
            },
        }
    }

    fn context() -> DownloadContext {
        DownloadContext::Addon {
            name: "core".to_string(),
            version: "1.0.0".to_string(),
        }
    }

    #[test]
    fn test_existing_path_is_returned() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("core.zip");
        fs::write(&file, b"data").unwrap();

        let mut progress = TransferProgress::new();
        let result = FilesystemDownloader
            .download(
                &source_for(&file.to_string_lossy()),
                temp.path(),
                &context(),
                &mut progress,
            )
            .unwrap();

        assert_eq!(result, file);
        assert_eq!(progress.transferred(), 4);
    }

    #[test]
    fn test_missing_path_is_not_accessible() {
        let temp = TempDir::new().unwrap();
        let mut progress = TransferProgress::new();
        let err = FilesystemDownloader
            .download(
                &source_for("/missing/path/core.zip"),
                temp.path(),
                &context(),
                &mut progress,
            )
            .unwrap_err();

        assert!(matches!(err, DistError::SourceNotAccessible(_)));
        assert!(err.to_string().contains("is not accessible"));
    }

    #[test]
    fn test_path_for_other_platform_only() {
        let temp = TempDir::new().unwrap();
        let source = SourceInfo::Filesystem {
            path: MultiPlatformPath::default(),
        };
        let mut progress = TransferProgress::new();
        let err = FilesystemDownloader
            .download(&source, temp.path(), &context(), &mut progress)
            .unwrap_err();
        assert!(err.to_string().contains("No path defined"));
    }

    #[test]
    fn test_cleanup_is_noop() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("core.zip");
        fs::write(&file, b"data").unwrap();
        FilesystemDownloader
            .cleanup(&source_for(&file.to_string_lossy()), temp.path(), &context())
            .unwrap();
        assert!(file.exists());
    }
}
