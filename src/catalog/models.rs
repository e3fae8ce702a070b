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

use serde::{Deserialize, Serialize};
use serde_json::Value;

// Items stay raw so one malformed entry only drops itself.

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BundlesResponse {
    #[serde(default)]
    pub bundles: Vec<Value>,
    #[serde(
        default,
        rename = "productionBundle",
        skip_serializing_if = "Option::is_none"
    )]
    pub production_bundle: Option<String>,
    #[serde(
        default,
        rename = "stagingBundle",
        skip_serializing_if = "Option::is_none"
    )]
    pub staging_bundle: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AddonsResponse {
    #[serde(default)]
    pub addons: Vec<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DependencyPackagesResponse {
    #[serde(default)]
    pub packages: Vec<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstallersResponse {
    #[serde(default)]
    pub installers: Vec<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    pub detail: String,
}
