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

//! Distribution engine: bundle resolution, per-artifact distribution items
//! and the controller driving a run.

mod bundle;
mod controller;
mod executables;
mod installer;
mod item;
mod metadata;
mod staging;
mod state;

pub use bundle::{
    BundleSelection, FlaggedBundles, effective_use_dev, effective_use_staging, resolve_bundle,
};
pub use controller::{
    AddonDistItem, ControllerOptions, DEPENDENCY_PACKAGE_LABEL, DistributionController,
    expand_env_placeholders,
};
pub use executables::{ExecutableEntry, ExecutablesInfo, ExecutablesRegistry};
pub use installer::{
    INSTALL_EXE_OUTPUT_ENV, InstallRoutine, PlatformInstaller, find_windows_executable,
};
pub use item::{DistributionItem, ItemConfig, SourceAttempt, UNEXPECTED_INSTALLER_ERROR};
pub use metadata::{
    AddonsMetadata, DependencyMetadata, DistributionRecord, read_addons_metadata,
    read_dependency_metadata,
};
pub use staging::{DOWNLOADS_DIR_NAME, UNZIP_DIR_NAME, cleanup_expired_dirs, download_root};
pub use state::UpdateState;
