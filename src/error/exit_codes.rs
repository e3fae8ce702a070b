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

use crate::error::DistError;

pub fn get_exit_code(error: &DistError) -> i32 {
    match error {
        DistError::ConfigError(_)
        | DistError::Config(_)
        | DistError::UnknownSourceType(_)
        | DistError::UnknownDownloader(_) => 2,

        DistError::BundleNotFound(_) | DistError::NoBundle(_) => 3,

        DistError::DistributionFailed { .. } | DistError::ValidationError(_) => 4,

        DistError::PermissionDenied(_) => 13,

        DistError::NetworkError(_) | DistError::Http(_) | DistError::CatalogFetch(_) => 20,

        _ => 1,
    }
}
