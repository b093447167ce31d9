//! Command-line interface definitions for the `ess-target` binary.
//!
//! This module centralises the clap parser structures so both the main binary
//! and the build script can reuse them when generating the manual page.

use clap::Parser;

/// Top-level CLI for the `ess-target` binary.
#[derive(Debug, Parser)]
#[command(
    name = "ess-target",
    about = "Drive an Alibaba Cloud ESS scaling group as an autoscaler target",
    arg_required_else_help = true
)]
pub(crate) enum Cli {
    /// Print the plugin name and type.
    #[command(name = "info", about = "Print the plugin name and type")]
    Info,
    /// Report whether the scaling group is ready and its current capacity.
    #[command(name = "status", about = "Report readiness and current capacity")]
    Status(GroupArgs),
    /// Set the scaling group to a desired total capacity.
    #[command(name = "scale", about = "Scale the group to a desired total capacity")]
    Scale(ScaleCommand),
}

/// Per-call overrides of the configured scaling group.
#[derive(Debug, Parser)]
pub(crate) struct GroupArgs {
    /// Region of the scaling group; overrides `ESS_REGION`.
    #[arg(long, value_name = "REGION")]
    pub(crate) region: Option<String>,
    /// Scaling group identifier; overrides `ESS_SCALING_GROUP_ID`.
    #[arg(long, value_name = "ID")]
    pub(crate) scaling_group_id: Option<String>,
}

/// Arguments for the `ess-target scale` subcommand.
#[derive(Debug, Parser)]
pub(crate) struct ScaleCommand {
    /// Desired total capacity. `-1` is treated as a dry run.
    #[arg(long, allow_negative_numbers = true)]
    pub(crate) count: i64,
    /// Report the action without changing the group.
    #[arg(long)]
    pub(crate) dry_run: bool,
    #[command(flatten)]
    pub(crate) group: GroupArgs,
}
