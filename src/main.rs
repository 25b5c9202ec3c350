//! photovault command-line entry point.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use photovault::config::Config;
use photovault::{logging, server};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "photovault")]
#[command(version, about = "Photo storage backend with pluggable blob providers")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API
    Serve {
        /// Address to listen on (overrides config)
        #[arg(long)]
        listen: Option<SocketAddr>,

        /// TOML config file (default: $PHOTOVAULT_CONFIG)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Import blobs without a photo record into the persistent metadata
    /// store, print the report and exit
    Rescan {
        /// TOML config file (default: $PHOTOVAULT_CONFIG)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Validate configuration and print warnings
    CheckConfig {
        /// TOML config file (default: $PHOTOVAULT_CONFIG)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve { listen, config } => {
            let mut config = Config::load(config.as_deref())?;
            if let Some(listen) = listen {
                config.server.listen = listen;
            }
            logging::init(&config.logging)?;
            server::serve(config).await
        },
        Command::Rescan { config } => {
            let config = Config::load(config.as_deref())?;
            logging::init(&config.logging)?;

            let report = server::rescan(&config).await?;
            let json =
                serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
            println!("{json}");
            Ok(())
        },
        Command::CheckConfig { config } => {
            let config = Config::load(config.as_deref())?;
            let validation = config.validate()?;
            if validation.has_warnings() {
                for warning in &validation.warnings {
                    eprintln!("warning: {warning}");
                }
            }
            println!("Configuration OK (provider: {})", config.storage.provider.as_str());
            Ok(())
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_flag_is_optional() {
        let cli = Cli::try_parse_from(["photovault", "rescan"]).unwrap();
        assert!(matches!(cli.command, Command::Rescan { config: None }));
    }

    #[test]
    fn test_config_flag_parses_path() {
        let cli = Cli::try_parse_from(["photovault", "check-config", "-c", "vault.toml"]).unwrap();
        match cli.command {
            Command::CheckConfig { config } => {
                assert_eq!(config, Some(PathBuf::from("vault.toml")));
            },
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
