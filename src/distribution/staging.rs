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

//! Scratch directories used while items download and unpack.
//!
//! Every download directory carries a `download_info.json` with an
//! expiration time, so directories left behind by a crashed run can be
//! removed by a later one.

use crate::error::Result;
use chrono::Utc;
use log::{debug, warn};
use serde_json::{Value, json};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const DOWNLOADS_DIR_NAME: &str = "distkit_dist_downloads";
pub const UNZIP_DIR_NAME: &str = ".unzip_temp";
pub const EXPIRE_FILE_NAME: &str = "download_info.json";
pub const EXPIRE_SECONDS: i64 = 60 * 60;

/// Root holding per-item download directories.
pub fn download_root(downloads_dir: Option<&Path>) -> PathBuf {
    downloads_dir
        .map(Path::to_path_buf)
        .unwrap_or_else(std::env::temp_dir)
        .join(DOWNLOADS_DIR_NAME)
}

/// Unique download directory below `root`. Created with its expire file
/// right before distribution starts.
pub fn new_download_dir(root: &Path) -> PathBuf {
    root.join(Uuid::new_v4().simple().to_string())
}

/// Unique unzip directory below an addons or dependencies root.
pub fn unzip_dir(root: &Path) -> PathBuf {
    root.join(UNZIP_DIR_NAME)
        .join(Uuid::new_v4().simple().to_string())
}

pub fn create_expire_file(dir: &Path) -> Result<()> {
    let info_path = dir.join(EXPIRE_FILE_NAME);
    if info_path.exists() {
        return Ok(());
    }

    fs::create_dir_all(dir)?;
    let info = json!({ "expiration_time": Utc::now().timestamp() + EXPIRE_SECONDS });
    fs::write(&info_path, serde_json::to_string(&info)?)?;
    Ok(())
}

/// A directory without an expire file is expired; one with an unreadable
/// expiration time is kept.
pub fn is_expired(dir: &Path) -> bool {
    let info_path = dir.join(EXPIRE_FILE_NAME);
    let Ok(contents) = fs::read_to_string(&info_path) else {
        return true;
    };

    let data: Value = serde_json::from_str(&contents).unwrap_or(Value::Null);
    match data.get("expiration_time").and_then(Value::as_i64) {
        Some(expiration_time) => expiration_time < Utc::now().timestamp(),
        None => false,
    }
}

/// Remove expired subdirectories of `root`. Returns how many were removed.
pub fn cleanup_expired_dirs(root: &Path) -> usize {
    let Ok(entries) = fs::read_dir(root) else {
        return 0;
    };

    let mut removed = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_dir() || !is_expired(&path) {
            continue;
        }
        match fs::remove_dir_all(&path) {
            Ok(()) => {
                debug!("Removed expired distribution directory {}", path.display());
                removed += 1;
            }
            Err(e) => warn!(
                "Failed to remove expired distribution directory {}: {e}",
                path.display()
            ),
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_download_root_defaults_to_temp() {
        assert_eq!(
            download_root(None),
            std::env::temp_dir().join(DOWNLOADS_DIR_NAME)
        );
        let temp = TempDir::new().unwrap();
        assert_eq!(
            download_root(Some(temp.path())),
            temp.path().join(DOWNLOADS_DIR_NAME)
        );
    }

    #[test]
    fn test_fresh_download_dir_is_not_expired() {
        let temp = TempDir::new().unwrap();
        let dir = new_download_dir(temp.path());
        create_expire_file(&dir).unwrap();
        assert!(dir.join(EXPIRE_FILE_NAME).exists());
        assert!(!is_expired(&dir));
        assert_eq!(cleanup_expired_dirs(temp.path()), 0);
        assert!(dir.exists());
    }

    #[test]
    fn test_cleanup_removes_expired_and_unmarked_dirs() {
        let temp = TempDir::new().unwrap();
        let expired = temp.path().join("expired");
        fs::create_dir_all(&expired).unwrap();
        fs::write(
            expired.join(EXPIRE_FILE_NAME),
            r#"{"expiration_time": 1000}"#,
        )
        .unwrap();
        let unmarked = temp.path().join("unmarked");
        fs::create_dir_all(&unmarked).unwrap();
        let unreadable = temp.path().join("unreadable");
        fs::create_dir_all(&unreadable).unwrap();
        fs::write(
            unreadable.join(EXPIRE_FILE_NAME),
            r#"{"expiration_time": "soon"}"#,
        )
        .unwrap();

        assert_eq!(cleanup_expired_dirs(temp.path()), 2);
        assert!(!expired.exists());
        assert!(!unmarked.exists());
        assert!(unreadable.exists());
    }

    #[test]
    fn test_cleanup_of_missing_root() {
        let temp = TempDir::new().unwrap();
        assert_eq!(cleanup_expired_dirs(&temp.path().join("nope")), 0);
    }

    #[test]
    fn test_unzip_dirs_are_unique() {
        let root = Path::new("/addons");
        let a = unzip_dir(root);
        let b = unzip_dir(root);
        assert_ne!(a, b);
        assert!(a.starts_with(root.join(UNZIP_DIR_NAME)));
    }
}
