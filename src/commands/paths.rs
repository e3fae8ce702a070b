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

use crate::commands::{SelectionArgs, build_controller};
use crate::config::DistConfig;
use crate::distribution::ControllerOptions;
use crate::error::Result;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Serialize)]
struct PathsOutput<'a> {
    python_paths: &'a [PathBuf],
    sys_paths: &'a [PathBuf],
}

pub struct PathsCommand<'a> {
    config: &'a DistConfig,
}

impl<'a> PathsCommand<'a> {
    pub fn new(config: &'a DistConfig) -> Result<Self> {
        Ok(Self { config })
    }

    /// Print the module paths of the already distributed bundle. Nothing is
    /// downloaded.
    pub fn execute(&self, selection: &SelectionArgs, json: bool) -> Result<()> {
        let mut options = ControllerOptions::from_config(self.config);
        selection.apply(&mut options);
        let mut controller =
            build_controller(self.config, options, self.config.download_timeout())?;

        let python_paths = controller.get_python_paths()?;
        let sys_paths = controller.get_sys_paths()?;
        print_paths(&python_paths, &sys_paths, json)
    }
}

pub(crate) fn print_paths(
    python_paths: &[PathBuf],
    sys_paths: &[PathBuf],
    json: bool,
) -> Result<()> {
    if json {
        let output = PathsOutput {
            python_paths,
            sys_paths,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("Python paths:");
    for path in python_paths {
        println!("  {}", path.display());
    }
    if !sys_paths.is_empty() {
        println!("Sys paths:");
        for path in sys_paths {
            println!("  {}", path.display());
        }
    }
    Ok(())
}
