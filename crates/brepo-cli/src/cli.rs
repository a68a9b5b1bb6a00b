use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use brepo_types::CommitId;

#[derive(Parser)]
#[command(
    name = "brepo",
    about = "Bundle repository maintenance",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Log debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Update repository metadata, catalogs, static deltas and summary
    UpdateRepo(UpdateRepoArgs),
}

#[derive(Args)]
pub struct UpdateRepoArgs {
    /// Repository to update
    pub location: PathBuf,

    /// Read options from a TOML file; flags given here override it
    #[arg(long, value_name = "FILE")]
    pub options: Option<PathBuf>,

    /// Generate static deltas for all refs and delete unwanted ones
    #[arg(long, visible_alias = "generate-deltas")]
    pub generate_static_deltas: bool,

    /// Number of parallel delta workers (0 or less: one per processor)
    #[arg(long, allow_negative_numbers = true)]
    pub jobs: Option<i64>,

    /// Don't generate deltas for apps or runtimes whose id matches PATTERN
    #[arg(long = "static-delta-ignore-ref", visible_alias = "ignore-ref", value_name = "PATTERN")]
    pub ignore_ref: Vec<String>,

    /// Prune unused objects
    #[arg(long)]
    pub prune: bool,

    /// Show what pruning would remove, without removing anything
    #[arg(long)]
    pub prune_dry_run: bool,

    /// Commits to keep below each ref tip when pruning (-1: all)
    #[arg(
        long,
        value_name = "DEPTH",
        allow_negative_numbers = true,
        value_parser = clap::value_parser!(i32).range(-1..)
    )]
    pub prune_depth: Option<i32>,

    /// Don't update the summary
    #[arg(long)]
    pub no_update_summary: bool,

    /// Don't update the appstream branches
    #[arg(long)]
    pub no_update_appstream: bool,

    /// Don't write a summary index
    #[arg(long)]
    pub no_summary_index: bool,

    /// Run delta workers as threads instead of processes
    #[arg(long)]
    pub in_process: bool,

    #[command(flatten)]
    pub metadata: MetadataArgs,

    #[command(flatten)]
    pub worker: WorkerArgs,
}

/// Repository metadata. An empty value removes the key.
#[derive(Args, Default)]
pub struct MetadataArgs {
    /// A nice name to use for this repository
    #[arg(long)]
    pub title: Option<String>,

    /// A one-line comment for this repository
    #[arg(long)]
    pub comment: Option<String>,

    /// A full-paragraph description for this repository
    #[arg(long)]
    pub description: Option<String>,

    /// URL for a website for this repository
    #[arg(long)]
    pub homepage: Option<String>,

    /// URL for an icon for this repository
    #[arg(long)]
    pub icon: Option<String>,

    /// Default branch to use for this repository
    #[arg(long)]
    pub default_branch: Option<String>,

    /// Redirect this repository to a new URL
    #[arg(long)]
    pub redirect_url: Option<String>,

    /// Permanently deploy the collection ID to client remote configurations
    #[arg(long)]
    pub collection_id: Option<String>,

    /// Deploy the collection ID to client remote configurations
    #[arg(long, value_name = "BOOL", num_args = 0..=1, default_missing_value = "true")]
    pub deploy_collection_id: Option<bool>,

    /// Name of authenticator for this repository
    #[arg(long)]
    pub authenticator_name: Option<String>,

    /// Autoinstall the authenticator for this repository
    #[arg(long, value_name = "BOOL", num_args = 0..=1, default_missing_value = "true")]
    pub authenticator_install: Option<bool>,

    /// Authenticator option, repeatable
    #[arg(long = "authenticator-option", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub authenticator_options: Vec<(String, String)>,
}

/// Generate a single delta. Used by the parallel delta workers.
#[derive(Args, Default)]
pub struct WorkerArgs {
    #[arg(long, hide = true, value_name = "REF", requires = "generate_static_delta_to")]
    pub generate_static_delta_ref: Option<String>,

    #[arg(long, hide = true, value_name = "COMMIT", value_parser = parse_commit, requires = "generate_static_delta_ref")]
    pub generate_static_delta_to: Option<CommitId>,

    #[arg(long, hide = true, value_name = "COMMIT", value_parser = parse_commit, requires = "generate_static_delta_to")]
    pub generate_static_delta_from: Option<CommitId>,
}

fn parse_commit(s: &str) -> Result<CommitId, String> {
    s.parse::<CommitId>().map_err(|e| e.to_string())
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got {s:?}"))?;
    if key.is_empty() {
        return Err(format!("empty key in {s:?}"));
    }
    Ok((key.to_string(), value.to_string()))
}
