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

use crate::commands::{SelectionArgs, build_controller, require_bundle};
use crate::config::DistConfig;
use crate::distribution::{ControllerOptions, DistributionItem, UpdateState};
use crate::error::Result;
use crate::platform::file_ops::dir_size;
use colored::Colorize;
use comfy_table::{Cell, CellAlignment, Color, Table};

pub struct StatusCommand<'a> {
    config: &'a DistConfig,
}

impl<'a> StatusCommand<'a> {
    pub fn new(config: &'a DistConfig) -> Result<Self> {
        Ok(Self { config })
    }

    /// Show what the selected bundle requires and what is already present.
    pub fn execute(&self, selection: &SelectionArgs) -> Result<()> {
        let mut options = ControllerOptions::from_config(self.config);
        selection.apply(&mut options);
        let mut controller =
            build_controller(self.config, options, self.config.download_timeout())?;

        let bundle_name = require_bundle(&controller)?;
        println!("Bundle: {}\n", bundle_name.cyan());

        let mut table = Table::new();
        table.load_preset(comfy_table::presets::UTF8_BORDERS_ONLY);
        table.set_header(vec![
            Cell::new("Artifact"),
            Cell::new("State"),
            Cell::new("Target"),
            Cell::new("Size"),
        ]);

        let items = controller.get_all_distribution_items()?;
        let pending = items.iter().filter(|item| item.need_distribution()).count();
        for item in &items {
            table.add_row(item_row(item));
        }
        let total = items.len();

        if total == 0 {
            println!("The bundle does not require any addons or dependency packages");
        } else {
            println!("{table}");
            println!("\n{pending} of {total} artifact(s) need distribution");
        }

        if let Some(expected) = controller.expected_installer_version()? {
            let current = controller.options().current_version.clone();
            let change = controller.need_installer_change()?;
            match current {
                Some(current) if change => println!(
                    "Launcher {} is required, running {current}",
                    expected.yellow()
                ),
                Some(_) => println!("Launcher {expected} is up to date"),
                None => println!("Launcher {expected} is pinned, running from source"),
            }
        }
        Ok(())
    }
}

fn item_row(item: &DistributionItem) -> Vec<Cell> {
    let state = item.state();
    let state_color = match state {
        UpdateState::Updated => Color::Green,
        UpdateState::Outdated => Color::Yellow,
        _ => Color::Red,
    };
    let target = item
        .target_dir()
        .map(|dir| dir.display().to_string())
        .unwrap_or_default();
    let size = match item.target_dir() {
        Some(dir) if state == UpdateState::Updated => format_size(dir_size(dir)),
        _ => "-".to_string(),
    };

    vec![
        Cell::new(item.label()),
        Cell::new(state.as_str()).fg(state_color),
        Cell::new(target),
        Cell::new(size).set_alignment(CellAlignment::Right),
    ]
}

/// Human readable byte count.
fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", size as u64, UNITS[unit_index])
    } else {
        format!("{size:.1} {}", UNITS[unit_index])
    }
}
