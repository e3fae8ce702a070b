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

//! Filesystem layout of the distkit home directory.

pub mod home;
pub mod shared;

pub use home::{
    ADDONS_DIR, ADDONS_METADATA_FILE, CONFIG_FILE, DEPENDENCIES_DIR, DEPENDENCY_METADATA_FILE,
    EXECUTABLES_FILE, addons_dir, addons_metadata_file, config_file, dependencies_dir,
    dependency_metadata_file, executables_file,
};
pub use shared::ensure_directory;
