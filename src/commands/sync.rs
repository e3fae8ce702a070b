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

use crate::commands::paths::print_paths;
use crate::commands::{SelectionArgs, build_controller, require_bundle};
use crate::config::DistConfig;
use crate::distribution::{ControllerOptions, DistributionController, UpdateState};
use crate::error::{DistError, Result};
use crate::indicator::ProgressFactory;
use colored::Colorize;
use log::{debug, info, warn};
use std::time::Duration;

pub struct SyncCommand<'a> {
    config: &'a DistConfig,
}

impl<'a> SyncCommand<'a> {
    pub fn new(config: &'a DistConfig) -> Result<Self> {
        Ok(Self { config })
    }

    /// Resolve the bundle, distribute it and print the module paths.
    pub fn execute(
        &self,
        selection: &SelectionArgs,
        threaded: bool,
        no_progress: bool,
        timeout: Option<u64>,
        skip_installer: bool,
    ) -> Result<()> {
        let mut options = ControllerOptions::from_config(self.config);
        selection.apply(&mut options);
        options.skip_installer_dist |= skip_installer;

        let download_timeout = timeout
            .map(Duration::from_secs)
            .unwrap_or_else(|| self.config.download_timeout());
        let mut controller = build_controller(self.config, options, download_timeout)?
            .with_progress(ProgressFactory::create(no_progress));

        let bundle_name = require_bundle(&controller)?;
        info!("Using bundle '{bundle_name}'");

        match controller.record_current_executable() {
            Ok(true) => debug!("Registered the running launcher"),
            Ok(false) => {}
            Err(e) => warn!("Failed to register the running launcher: {e}"),
        }

        if !controller.need_installer_change()? && controller.is_missing_permissions()? {
            return Err(DistError::PermissionDenied(
                "Your user does not have required permissions to write distribution \
                 directories. Please contact your administrator."
                    .to_string(),
            ));
        }

        let needed = controller.need_distribution()?;
        controller.distribute(threaded)?;

        if controller.need_installer_change()? {
            return report_installer(&mut controller);
        }

        report_failures(&mut controller)?;
        controller.validate_distribution()?;

        if needed {
            println!("{} Bundle '{bundle_name}' distributed", "✓".green().bold());
        } else {
            println!("Bundle '{bundle_name}' is up to date");
        }

        let python_paths = controller.get_python_paths()?;
        let sys_paths = controller.get_sys_paths()?;
        print_paths(&python_paths, &sys_paths, false)
    }
}

fn report_installer(controller: &mut DistributionController) -> Result<()> {
    if let Some(error) = controller.installer_dist_error() {
        let error = error.to_string();
        if let Some(path) = controller.installer_filepath() {
            eprintln!("Installer was downloaded to {}", path.display());
        }
        return Err(DistError::InstallerDistribution(error));
    }

    let version = controller
        .expected_installer_version()?
        .unwrap_or_default()
        .to_string();
    match controller.installer_executable()? {
        Some(executable) => {
            println!(
                "Launcher {version} is required. Restart with {}",
                executable.display().to_string().cyan()
            );
            Ok(())
        }
        None => Err(DistError::InstallerDistribution(format!(
            "Couldn't find installed launcher {version}."
        ))),
    }
}

fn report_failures(controller: &mut DistributionController) -> Result<()> {
    for item in controller.get_all_distribution_items()? {
        if item.state() == UpdateState::Updated {
            continue;
        }
        let message = item.error_message().unwrap_or(item.state().as_str());
        eprintln!("{} {}: {message}", "✗".red().bold(), item.label());
        for attempt in item.sources() {
            if let Some(reason) = attempt.progress.fail_reason() {
                eprintln!("    {}: {reason}", attempt.source.describe());
            }
        }
        if let Some(detail) = item.error_detail() {
            debug!("{}: {detail}", item.label());
        }
    }
    Ok(())
}
