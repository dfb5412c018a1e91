//! gate-sim: inspect and replay the session route gate from the command line.
//!
//! ## Subcommands
//!
//! - `routes`: route table with guards evaluated for one session tag
//! - `resolve`: render decision for a location under a settled session
//! - `replay`: run a JSON script against a mounted gate, print observations
//! - `wishing-well`: load wishing well balances from a fixture
//!
//! Output is JSON on stdout. Logs go to stderr (`GATE_DEBUG_LOG=1` for debug).

mod fixture;
mod inspect;
mod logging;
mod replay;

use std::path::PathBuf;

use chrono::{DateTime, TimeZone, Utc};
use clap::{Parser, Subcommand};
use gate_core::{load_gate_config, load_wishing_well, GateConfig};
use serde::Serialize;
use session_protocol::SessionTag;

#[derive(Parser)]
#[command(name = "gate-sim")]
#[command(about = "Session route gate simulator")]
#[command(version)]
struct Cli {
    /// Gate config file (defaults to the user config directory)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Network name, overriding config and environment
    #[arg(long, global = true)]
    network: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List routes with guards evaluated for a session tag
    Routes {
        /// Session tag, e.g. connected.authorised
        #[arg(long)]
        tag: SessionTag,
    },

    /// Resolve what a location renders once the session has settled
    Resolve {
        #[arg(long)]
        tag: SessionTag,

        #[arg(long)]
        farm_id: Option<u64>,

        /// Location, with optional hash prefix and query (e.g. "#/retreat?item=axe")
        #[arg(value_name = "LOCATION")]
        location: String,
    },

    /// Replay a JSON script against a mounted gate
    Replay {
        #[arg(value_name = "SCRIPT")]
        script: PathBuf,
    },

    /// Load wishing well balances from a JSON fixture
    WishingWell {
        #[arg(value_name = "FIXTURE")]
        fixture: PathBuf,

        /// Current time as unix seconds (defaults to now)
        #[arg(long)]
        now: Option<i64>,
    },
}

fn main() {
    let _logging_guard = logging::init();
    let cli = Cli::parse();

    if let Err(message) = run(cli) {
        tracing::error!(error = %message, "gate-sim failed");
        eprintln!("gate-sim: {message}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), String> {
    let config = resolve_config(cli.config, cli.network)?;

    match cli.command {
        Commands::Routes { tag } => print_json(&inspect::routes_report(tag, &config)),
        Commands::Resolve {
            tag,
            farm_id,
            location,
        } => print_json(&inspect::resolve(tag, farm_id, &config, &location)),
        Commands::Replay { script } => {
            let script = replay::load_script(&script).map_err(|e| e.to_string())?;
            let observations = replay::run(script, config).map_err(|e| e.to_string())?;
            for observation in &observations {
                let line = serde_json::to_string(observation).map_err(|e| e.to_string())?;
                println!("{line}");
            }
            Ok(())
        }
        Commands::WishingWell { fixture, now } => {
            let fixture = fixture::WellFixture::load(&fixture)?;
            let now = match now {
                Some(secs) => timestamp(secs)?,
                None => Utc::now(),
            };
            let contract = fixture
                .well_contract
                .clone()
                .or_else(|| config.wishing_well_contract.clone())
                .ok_or_else(|| "No wishing well contract in fixture or config".to_string())?;
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .map_err(|e| e.to_string())?;
            let tokens = runtime.block_on(load_wishing_well(
                &fixture,
                &fixture.account,
                &contract,
                now,
            ))?;
            print_json(&tokens)
        }
    }
}

fn resolve_config(path: Option<PathBuf>, network: Option<String>) -> Result<GateConfig, String> {
    let mut config = match load_gate_config(path) {
        Ok(config) => config,
        Err(gate_core::GateError::ConfigDirNotFound) => {
            tracing::warn!("No config directory; using defaults");
            GateConfig::default()
        }
        Err(err) => return Err(err.into()),
    };
    if let Some(network) = network {
        config.network = network;
        config.validate()?;
    }
    Ok(config)
}

fn timestamp(secs: i64) -> Result<DateTime<Utc>, String> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .ok_or_else(|| format!("Invalid unix timestamp: {secs}"))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), String> {
    let json = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
    println!("{json}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_resolve_arguments() {
        let cli = Cli::try_parse_from([
            "gate-sim",
            "resolve",
            "--tag",
            "connected.authorised",
            "--farm-id",
            "42",
            "#/retreat?item=axe",
        ])
        .expect("parse");
        match cli.command {
            Commands::Resolve {
                tag,
                farm_id,
                location,
            } => {
                assert_eq!(tag, SessionTag::Authorised);
                assert_eq!(farm_id, Some(42));
                assert_eq!(location, "#/retreat?item=axe");
            }
            _ => panic!("expected resolve"),
        }
    }

    #[test]
    fn unknown_tag_is_rejected() {
        assert!(Cli::try_parse_from(["gate-sim", "routes", "--tag", "connected"]).is_err());
    }

    #[test]
    fn network_flag_overrides_config_file() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let path = temp_dir.path().join("gate.toml");
        fs_err::write(&path, "network = \"mainnet\"\n").expect("write config");

        let config = resolve_config(Some(path), Some("mumbai".to_string())).expect("config");
        assert!(config.is_test_network());
    }

    #[test]
    fn blank_network_flag_is_rejected() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let missing = temp_dir.path().join("absent.toml");
        assert!(resolve_config(Some(missing), Some("  ".to_string())).is_err());
    }
}
