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
use std::fmt;

/// Lifecycle of a distribution item.
///
/// `Outdated` is the only state from which work proceeds. The three terminal
/// states are reached by [`DistributionItem::distribute`](super::DistributionItem::distribute).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateState {
    #[default]
    Unknown,
    Outdated,
    Updated,
    UpdateFailed,
    MissSourceFiles,
}

impl UpdateState {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateState::Unknown => "unknown",
            UpdateState::Outdated => "outdated",
            UpdateState::Updated => "updated",
            UpdateState::UpdateFailed => "update_failed",
            UpdateState::MissSourceFiles => "miss_source_files",
        }
    }

    /// Terminal failure states.
    pub fn is_failure(&self) -> bool {
        matches!(self, UpdateState::UpdateFailed | UpdateState::MissSourceFiles)
    }
}

impl fmt::Display for UpdateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
