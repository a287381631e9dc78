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
use std::io::IsTerminal;
use std::path::PathBuf;
use ticket_spin::commands::contend::ContendCommand;
use ticket_spin::commands::probe::ProbeCommand;
use ticket_spin::commands::stall::StallCommand;
use ticket_spin::config::SpinConfig;
use ticket_spin::error::{Result, format_error_with_color, get_exit_code};
use ticket_spin::locking::global_token;
use ticket_spin::logging;

#[derive(Parser)]
#[command(name = "ticket-spin")]
#[command(author, version, about = "Exercise the ticket spin lock under contention", long_about = None)]
struct Cli {
    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// TOML file with [lock] and [stress] settings
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run enter/exit pairs from many threads and verify mutual exclusion
    Contend {
        /// Worker threads (defaults to stress.threads)
        #[arg(short, long)]
        threads: Option<usize>,

        /// Critical sections per thread (defaults to stress.iterations)
        #[arg(short, long)]
        iterations: Option<u64>,

        /// Output the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Count bounded try_enter successes and timeouts under contention
    Probe {
        /// Worker threads (defaults to stress.threads)
        #[arg(short, long)]
        threads: Option<usize>,

        /// Attempts per thread (defaults to stress.iterations)
        #[arg(short, long)]
        attempts: Option<u64>,

        /// Timeout per attempt in milliseconds, -1, or "infinite"
        #[arg(long, value_name = "MILLIS", allow_hyphen_values = true)]
        timeout: Option<String>,

        /// Output the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Cancel queued waiters and check the ticket sequence still drains
    Stall {
        /// Waiters queued behind the held lock
        #[arg(short, long, default_value_t = 5)]
        waiters: usize,

        /// How many of them abandon their ticket
        #[arg(short, long, default_value_t = 2)]
        abandon: usize,

        /// Output the report as JSON
        #[arg(long)]
        json: bool,
    },
}

fn load_config(cli: &Cli) -> Result<SpinConfig> {
    match &cli.config {
        Some(path) => SpinConfig::load(path),
        None => Ok(SpinConfig::default()),
    }
}

fn main() {
    let cli = Cli::parse();

    // Initialize logger based on CLI flags and environment
    logging::setup_logger(cli.verbose);

    let result: Result<()> = (|| {
        let config = load_config(&cli)?;
        match &cli.command {
            Commands::Contend {
                threads,
                iterations,
                json,
            } => {
                let command = ContendCommand::new(&config, global_token())?;
                command.execute(*threads, *iterations, *json).map(|_| ())
            }
            Commands::Probe {
                threads,
                attempts,
                timeout,
                json,
            } => {
                let command = ProbeCommand::new(&config, global_token())?;
                command
                    .execute(*threads, *attempts, timeout.as_deref(), *json)
                    .map(|_| ())
            }
            Commands::Stall {
                waiters,
                abandon,
                json,
            } => {
                let command = StallCommand::new(&config)?;
                command.execute(*waiters, *abandon, *json).map(|_| ())
            }
        }
    })();

    if let Err(e) = result {
        let use_color = std::io::stderr().is_terminal();
        eprint!("{}", format_error_with_color(&e, use_color));
        std::process::exit(get_exit_code(&e));
    }
}
