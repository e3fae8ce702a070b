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
use crate::models::Bundle;

/// How the caller asked for a bundle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BundleSelection {
    pub bundle_name: Option<String>,
    pub use_staging: bool,
    pub use_dev: bool,
}

impl BundleSelection {
    pub fn named(name: &str) -> Self {
        Self {
            bundle_name: Some(name.to_string()),
            ..Self::default()
        }
    }
}

/// Production, staging and dev bundles of a catalog.
#[derive(Debug, Clone, Default)]
pub struct FlaggedBundles {
    pub production: Option<Bundle>,
    pub staging: Option<Bundle>,
    pub dev: Option<Bundle>,
}

impl FlaggedBundles {
    /// The last flagged bundle wins. A dev bundle only counts when it is
    /// active for `active_user`.
    pub fn collect(bundles: &[Bundle], active_user: &str) -> Self {
        let mut flagged = Self::default();
        for bundle in bundles {
            if bundle.is_production {
                flagged.production = Some(bundle.clone());
            }
            if bundle.is_staging {
                flagged.staging = Some(bundle.clone());
            }
            if bundle.is_dev && bundle.active_dev_user.as_deref() == Some(active_user) {
                flagged.dev = Some(bundle.clone());
            }
        }
        flagged
    }
}

/// Whether dev mode applies. An explicitly named bundle decides by its own
/// dev flag.
pub fn effective_use_dev(bundles: &[Bundle], selection: &BundleSelection) -> bool {
    match &selection.bundle_name {
        Some(name) => bundles
            .iter()
            .find(|bundle| &bundle.name == name)
            .is_some_and(|bundle| bundle.is_dev),
        None => selection.use_dev,
    }
}

/// Staging is ignored when dev mode applies.
pub fn effective_use_staging(bundles: &[Bundle], selection: &BundleSelection) -> bool {
    selection.use_staging && !effective_use_dev(bundles, selection)
}

/// Pick the bundle to distribute.
///
/// An explicit name wins and must exist. Otherwise dev mode selects the dev
/// bundle of `active_user`, staging selects the staging bundle, and the
/// production bundle is used as the last resort. `active_user` is only
/// consulted in dev mode.
pub fn resolve_bundle(
    bundles: &[Bundle],
    selection: &BundleSelection,
    active_user: impl FnOnce() -> Result<String>,
) -> Result<Option<Bundle>> {
    if let Some(name) = &selection.bundle_name {
        return bundles
            .iter()
            .find(|bundle| &bundle.name == name)
            .cloned()
            .map(Some)
            .ok_or_else(|| DistError::BundleNotFound(name.clone()));
    }

    if selection.use_dev {
        let user = active_user()?;
        return Ok(FlaggedBundles::collect(bundles, &user).dev);
    }

    let flagged = FlaggedBundles::collect(bundles, "");
    if selection.use_staging {
        Ok(flagged.staging)
    } else {
        Ok(flagged.production)
    }
}
