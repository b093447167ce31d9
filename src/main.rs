//! Binary entry point for the `ess-target` operator CLI.

use std::io::{self, Write};
use std::process;

use clap::Parser;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use ess_target::config::{ConfigError, ConfigMap, EssConfig, REGION, SCALING_GROUP_ID};
use ess_target::nodes::DirectPool;
use ess_target::target::{ScalingAction, TargetAdapter, TargetError, plugin_info};

mod cli;

use cli::{Cli, GroupArgs, ScaleCommand};

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("{}: {}", .0.kind(), .0)]
    Target(#[from] TargetError),
}

type Adapter = TargetAdapter<ess_target::ess::EssFleet, DirectPool>;

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();
    let exit_code = match dispatch(cli).await {
        Ok(()) => 0,
        Err(err) => {
            report_error(&err);
            1
        }
    };
    process::exit(exit_code);
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

async fn dispatch(cli: Cli) -> Result<(), CliError> {
    match cli {
        Cli::Info => {
            let info = plugin_info();
            writeln!(io::stdout(), "name={} type={}", info.name, info.plugin_type).ok();
            Ok(())
        }
        Cli::Status(args) => {
            let adapter = load_adapter()?;
            let cancel = cancel_on_interrupt();
            let status = adapter.status(&per_call_config(&args), &cancel).await?;
            writeln!(io::stdout(), "ready={} count={}", status.ready, status.count).ok();
            Ok(())
        }
        Cli::Scale(command) => scale(command).await,
    }
}

async fn scale(command: ScaleCommand) -> Result<(), CliError> {
    let adapter = load_adapter()?;
    let cancel = cancel_on_interrupt();
    let mut action = ScalingAction::new(command.count);
    if command.dry_run {
        action = action.dry_run();
    }
    let outcome = adapter
        .scale(action, &per_call_config(&command.group), &cancel)
        .await?;
    writeln!(io::stdout(), "{outcome}").ok();
    Ok(())
}

fn load_adapter() -> Result<Adapter, CliError> {
    let config = EssConfig::load_without_cli_args()?;
    let map = config.to_config_map()?;
    Ok(TargetAdapter::from_config_map(map, DirectPool)?)
}

fn per_call_config(args: &GroupArgs) -> ConfigMap {
    let mut map = ConfigMap::new();
    if let Some(region) = &args.region {
        map.insert(REGION.to_owned(), region.clone());
    }
    if let Some(id) = &args.scaling_group_id {
        map.insert(SCALING_GROUP_ID.to_owned(), id.clone());
    }
    map
}

/// Returns a token that fires on Ctrl-C.
fn cancel_on_interrupt() -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling");
            trigger.cancel();
        }
    });
    cancel
}

fn report_error(err: &CliError) {
    write_error(io::stderr(), err);
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "{err}").ok();
}
