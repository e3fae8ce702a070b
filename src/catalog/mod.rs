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

//! Read access to the server catalog of bundles and distributable artifacts.

mod client;
mod models;

pub use client::ServerCatalog;
pub use models::{
    AddonsResponse, ApiErrorResponse, BundlesResponse, DependencyPackagesResponse,
    InstallersResponse, UserResponse,
};

use crate::download::ProgressReporter;
use crate::error::Result;
use crate::models::{AddonInfo, Bundle, DependencyItem, Installer};
use std::path::{Path, PathBuf};

/// Remote catalog consumed by the distribution controller and the server
/// downloader.
pub trait Catalog: Send + Sync {
    fn get_bundles(&self) -> Result<Vec<Bundle>>;

    /// Addons with their versions. `details` requests version sources and
    /// checksums.
    fn get_addons_info(&self, details: bool) -> Result<Vec<AddonInfo>>;

    fn get_dependency_packages(&self) -> Result<Vec<DependencyItem>>;

    fn get_installers(&self) -> Result<Vec<Installer>>;

    /// Name of the authenticated user.
    fn current_user(&self) -> Result<String>;

    fn download_installer(
        &self,
        filename: &str,
        destination: &Path,
        reporter: Option<&mut dyn ProgressReporter>,
    ) -> Result<PathBuf>;

    fn download_dependency_package(
        &self,
        package_name: &str,
        dest_dir: &Path,
        filename: &str,
        reporter: Option<&mut dyn ProgressReporter>,
    ) -> Result<PathBuf>;

    fn download_addon_private_file(
        &self,
        addon_name: &str,
        addon_version: &str,
        filename: &str,
        dest_dir: &Path,
        reporter: Option<&mut dyn ProgressReporter>,
    ) -> Result<PathBuf>;

    /// Download a server-relative path such as `api/addons/core/1.0.0/private/core.zip`.
    fn download_file(
        &self,
        endpoint: &str,
        destination: &Path,
        reporter: Option<&mut dyn ProgressReporter>,
    ) -> Result<PathBuf>;
}
