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

use std::path::{Path, PathBuf};

pub const ADDONS_DIR: &str = "addons";
pub const DEPENDENCIES_DIR: &str = "dependency_packages";
pub const CONFIG_FILE: &str = "config.toml";
pub const EXECUTABLES_FILE: &str = "executables.json";
pub const ADDONS_METADATA_FILE: &str = "addons.json";
pub const DEPENDENCY_METADATA_FILE: &str = "dependency.json";

pub fn addons_dir(home: &Path) -> PathBuf {
    home.join(ADDONS_DIR)
}

pub fn dependencies_dir(home: &Path) -> PathBuf {
    home.join(DEPENDENCIES_DIR)
}

pub fn config_file(home: &Path) -> PathBuf {
    home.join(CONFIG_FILE)
}

pub fn executables_file(home: &Path) -> PathBuf {
    home.join(EXECUTABLES_FILE)
}

/// Metadata of distributed addons lives next to the addon directories.
pub fn addons_metadata_file(addons_root: &Path) -> PathBuf {
    addons_root.join(ADDONS_METADATA_FILE)
}

pub fn dependency_metadata_file(dependencies_root: &Path) -> PathBuf {
    dependencies_root.join(DEPENDENCY_METADATA_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_helpers_join_expected_paths() {
        let home = Path::new("/tmp/distkit");
        assert_eq!(addons_dir(home), PathBuf::from("/tmp/distkit/addons"));
        assert_eq!(
            dependencies_dir(home),
            PathBuf::from("/tmp/distkit/dependency_packages")
        );
        assert_eq!(config_file(home), PathBuf::from("/tmp/distkit/config.toml"));
        assert_eq!(
            executables_file(home),
            PathBuf::from("/tmp/distkit/executables.json")
        );
    }

    #[test]
    fn metadata_files_live_in_their_roots() {
        assert_eq!(
            addons_metadata_file(Path::new("/data/addons")),
            PathBuf::from("/data/addons/addons.json")
        );
        assert_eq!(
            dependency_metadata_file(Path::new("/data/deps")),
            PathBuf::from("/data/deps/dependency.json")
        );
    }
}
