// SPDX-FileCopyrightText: 2026 Commline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Commline - a real-time customer conversation workspace.
//!
//! Binary entry point: loads and validates configuration, then dispatches
//! to the selected subcommand.

mod shell;
mod sim;
mod status;

use clap::{Parser, Subcommand};

/// Commline - a real-time customer conversation workspace.
#[derive(Parser, Debug)]
#[command(name = "commline", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Launch the interactive inbox over a simulated backend.
    Shell,
    /// Validate configuration and print the effective TOML.
    Config,
    /// Show workspace and adapter status.
    Status {
        /// Emit structured JSON instead of human-readable output.
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("commline={log_level},warn")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match commline_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            commline_config::render_errors(&errors);
            std::process::exit(1);
        }
    };
    init_tracing(&config.workspace.log_level);

    let result = match cli.command {
        Some(Commands::Shell) => shell::run_shell(config).await,
        Some(Commands::Config) => match toml::to_string_pretty(&config) {
            Ok(rendered) => {
                print!("{rendered}");
                Ok(())
            }
            Err(e) => Err(commline_core::CommlineError::Internal(format!(
                "failed to render config: {e}"
            ))),
        },
        Some(Commands::Status { json }) => status::run_status(&config, json).await,
        None => {
            println!("commline: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("commline: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn binary_loads_config_defaults() {
        let config =
            commline_config::load_and_validate().expect("default config should be valid");
        assert_eq!(config.workspace.name, "commline");
    }
}
