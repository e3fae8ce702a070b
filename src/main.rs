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

use clap::{Parser, Subcommand};
use distkit::commands::SelectionArgs;
use distkit::commands::paths::PathsCommand;
use distkit::commands::status::StatusCommand;
use distkit::commands::sync::SyncCommand;
use distkit::config::new_dist_config;
use distkit::error::{Result, format_error_chain, get_exit_code};
use distkit::logging;

#[derive(Parser)]
#[command(name = "distkit")]
#[command(author, version, about = "Bundle distribution for desktop launchers", long_about = None)]
struct Cli {
    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Distribute the selected bundle and print its module paths
    #[command(visible_alias = "s")]
    Sync {
        #[command(flatten)]
        selection: SelectionArgs,

        /// Distribute items in parallel
        #[arg(long)]
        threaded: bool,

        /// Disable progress indicators
        #[arg(long)]
        no_progress: bool,

        /// Download timeout in seconds
        #[arg(long, value_name = "SECONDS")]
        timeout: Option<u64>,

        /// Do not update the launcher itself
        #[arg(long)]
        skip_installer: bool,
    },

    /// Show the artifacts the selected bundle requires
    #[command(visible_alias = "st")]
    Status {
        #[command(flatten)]
        selection: SelectionArgs,
    },

    /// Print module paths of the distributed bundle
    Paths {
        #[command(flatten)]
        selection: SelectionArgs,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}

fn setup_logger(cli: &Cli) {
    logging::setup_logger(cli.verbose);
}

fn main() {
    let cli = Cli::parse();

    setup_logger(&cli);

    let config = match new_dist_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", format_error_chain(&e));
            std::process::exit(get_exit_code(&e));
        }
    };

    let result: Result<()> = (|| match cli.command {
        Commands::Sync {
            selection,
            threaded,
            no_progress,
            timeout,
            skip_installer,
        } => {
            let command = SyncCommand::new(&config)?;
            command.execute(&selection, threaded, no_progress, timeout, skip_installer)
        }
        Commands::Status { selection } => {
            let command = StatusCommand::new(&config)?;
            command.execute(&selection)
        }
        Commands::Paths { selection, json } => {
            let command = PathsCommand::new(&config)?;
            command.execute(&selection, json)
        }
    })();

    if let Err(e) = result {
        eprintln!("{}", format_error_chain(&e));
        std::process::exit(get_exit_code(&e));
    }
}
