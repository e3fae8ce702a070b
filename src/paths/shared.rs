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
use std::fs;
use std::path::PathBuf;

/// Ensure the provided path exists, returning it on success.
pub fn ensure_directory(path: PathBuf) -> Result<PathBuf> {
    fs::create_dir_all(&path).map_err(|error| {
        if error.kind() == std::io::ErrorKind::PermissionDenied {
            DistError::PermissionDenied(path.display().to_string())
        } else {
            DistError::ConfigError(format!(
                "Failed to create directory {}: {error}",
                path.display()
            ))
        }
    })?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn ensure_directory_creates_nested_path() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("addons").join("core");
        let created = ensure_directory(nested.clone()).unwrap();
        assert!(created.is_dir());
        assert_eq!(created, nested);
    }
}
