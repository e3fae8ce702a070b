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

//! Typed catalog model: bundles, addons, dependency packages, installers and
//! the download sources they carry.

pub mod addon;
pub mod bundle;
pub mod dependency;
pub mod installer;
pub mod source;

pub use addon::{AddonInfo, AddonVersionInfo};
pub use bundle::{AddonDevInfo, Bundle};
pub use dependency::DependencyItem;
pub use installer::Installer;
pub use source::{MultiPlatformPath, SourceInfo, SourceType, parse_sources};
