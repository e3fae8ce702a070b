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

pub mod paths;
pub mod status;
pub mod sync;

use crate::catalog::{Catalog, ServerCatalog};
use crate::config::DistConfig;
use crate::distribution::{ControllerOptions, DistributionController, effective_use_dev};
use crate::download::DownloaderRegistry;
use crate::error::{DistError, Result};
use clap::Args;
use std::sync::Arc;
use std::time::Duration;

/// Bundle selection flags shared by the commands.
#[derive(Args, Debug, Clone, Default)]
pub struct SelectionArgs {
    /// Use this bundle instead of the configured one
    #[arg(long, value_name = "NAME")]
    pub bundle: Option<String>,

    /// Use the staging bundle
    #[arg(long)]
    pub staging: bool,

    /// Use the dev bundle of the active user
    #[arg(long)]
    pub dev: bool,
}

impl SelectionArgs {
    /// Layer the flags over the configured selection.
    pub fn apply(&self, options: &mut ControllerOptions) {
        if let Some(name) = &self.bundle {
            options.selection.bundle_name = Some(name.clone());
        }
        options.selection.use_staging |= self.staging;
        options.selection.use_dev |= self.dev;
    }
}

pub(crate) fn build_controller(
    config: &DistConfig,
    options: ControllerOptions,
    download_timeout: Duration,
) -> Result<DistributionController> {
    let catalog: Arc<dyn Catalog> = Arc::new(
        ServerCatalog::new(config.server_url()?)
            .with_api_key(config.server.api_key.as_deref())
            .with_timeout(config.catalog_timeout())
            .with_download_timeout(download_timeout),
    );
    let registry = DownloaderRegistry::with_defaults(Some(catalog.clone()), download_timeout);
    Ok(DistributionController::new(catalog, registry, options))
}

/// Name of the bundle the controller resolved, or [`DistError::NoBundle`].
pub(crate) fn require_bundle(controller: &DistributionController) -> Result<String> {
    if let Some(bundle) = controller.bundle_to_use()? {
        return Ok(bundle.name.clone());
    }

    let selection = &controller.options().selection;
    let kind = if effective_use_dev(controller.bundles()?, selection) {
        "dev"
    } else if selection.use_staging {
        "staging"
    } else {
        "production"
    };
    Err(DistError::NoBundle(kind.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distribution::BundleSelection;
    use tempfile::TempDir;

    #[test]
    fn test_selection_args_apply() {
        let temp_dir = TempDir::new().unwrap();
        let config = DistConfig::load(temp_dir.path()).unwrap();
        let mut options = ControllerOptions::from_config(&config);
        options.selection.use_staging = true;

        let args = SelectionArgs {
            bundle: Some("studio-2025".to_string()),
            staging: false,
            dev: true,
        };
        args.apply(&mut options);

        assert_eq!(
            options.selection,
            BundleSelection {
                bundle_name: Some("studio-2025".to_string()),
                use_staging: true,
                use_dev: true,
            }
        );
    }

    #[test]
    fn test_build_controller_requires_server() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = DistConfig::load(temp_dir.path()).unwrap();
        config.server.url = None;
        let options = ControllerOptions::from_config(&config);

        let result = build_controller(&config, options, Duration::from_secs(1));
        assert!(matches!(result, Err(DistError::ConfigError(_))));
    }
}
