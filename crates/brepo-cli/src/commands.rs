use anyhow::Context;
use colored::Colorize;

use brepo_update::{
    update_repo, CancelToken, LaunchMode, MetadataUpdates, Outcome, UpdateOptions, UpdateReport,
    WorkerRequest,
};

use crate::cli::*;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::UpdateRepo(args) => cmd_update_repo(args, cli.verbose).await,
    }
}

async fn cmd_update_repo(args: UpdateRepoArgs, verbose: bool) -> anyhow::Result<()> {
    let options = resolve_options(&args)?;
    let worker = worker_request(&args.worker);

    let launch = if args.in_process {
        LaunchMode::InProcess
    } else {
        let program = std::env::current_exe().context("cannot locate the brepo executable")?;
        let leading_args = if verbose { vec!["--verbose".to_string()] } else { Vec::new() };
        LaunchMode::Program { program, leading_args }
    };

    let cancel = CancelToken::new();
    if worker.is_none() {
        let token = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("{} finishing running delta workers", "Interrupted:".yellow().bold());
                token.cancel();
            }
        });
    }

    match update_repo(&args.location, &options, worker.as_ref(), launch, cancel).await? {
        Outcome::Worker(_) => {}
        Outcome::Maintenance(report) => print_report(&report),
    }
    Ok(())
}

/// Options file (if any) overridden by command-line flags.
fn resolve_options(args: &UpdateRepoArgs) -> anyhow::Result<UpdateOptions> {
    let mut options = match &args.options {
        Some(path) => UpdateOptions::from_toml_file(path)?,
        None => UpdateOptions::default(),
    };

    options.generate_deltas |= args.generate_static_deltas;
    options.prune |= args.prune;
    options.prune_dry_run |= args.prune_dry_run;
    options.no_update_summary |= args.no_update_summary;
    options.no_update_appstream |= args.no_update_appstream;
    options.no_summary_index |= args.no_summary_index;
    if args.jobs.is_some() {
        options.jobs = args.jobs;
    }
    if let Some(depth) = args.prune_depth {
        options.prune_depth = depth;
    }
    options.ignore_ref.extend(args.ignore_ref.iter().cloned());
    merge_metadata(&mut options.metadata, &args.metadata);
    options.validate()?;
    Ok(options)
}

fn merge_metadata(into: &mut MetadataUpdates, args: &MetadataArgs) {
    let text = |target: &mut Option<String>, value: &Option<String>| {
        if value.is_some() {
            target.clone_from(value);
        }
    };
    text(&mut into.title, &args.title);
    text(&mut into.comment, &args.comment);
    text(&mut into.description, &args.description);
    text(&mut into.homepage, &args.homepage);
    text(&mut into.icon, &args.icon);
    text(&mut into.default_branch, &args.default_branch);
    text(&mut into.redirect_url, &args.redirect_url);
    text(&mut into.collection_id, &args.collection_id);
    text(&mut into.authenticator_name, &args.authenticator_name);
    if args.deploy_collection_id.is_some() {
        into.deploy_collection_id = args.deploy_collection_id;
    }
    if args.authenticator_install.is_some() {
        into.authenticator_install = args.authenticator_install;
    }
    for (key, value) in &args.authenticator_options {
        into.authenticator_options.insert(key.clone(), value.clone());
    }
}

fn worker_request(args: &WorkerArgs) -> Option<WorkerRequest> {
    let refname = args.generate_static_delta_ref.clone()?;
    let to = args.generate_static_delta_to?;
    Some(WorkerRequest {
        refname,
        from: args.generate_static_delta_from,
        to,
    })
}

fn print_report(report: &UpdateReport) {
    for key in &report.metadata {
        println!("{} {}", "Updated".green(), key.to_string().cyan());
    }
    if let Some(catalog) = &report.catalog {
        for name in &catalog.updated {
            println!("{} {}", "Updated".green(), name.yellow());
        }
    }
    if let Some(deltas) = &report.deltas {
        println!(
            "{} {} generated, {} deleted, {} retained",
            "Static deltas:".bold(),
            deltas.generation.generated.len().to_string().green(),
            deltas.deletion.deleted.len(),
            deltas.retained.len()
        );
        for warning in &deltas.warnings {
            eprintln!("{} {}", "Warning:".yellow().bold(), warning);
        }
        for failure in &deltas.generation.failures {
            eprintln!("{} {}", "Failed:".red().bold(), failure);
        }
        for failure in &deltas.deletion.failures {
            eprintln!(
                "{} deleting {}: {}",
                "Failed:".red().bold(),
                failure.name,
                failure.error
            );
        }
    }
    if let Some(summary) = &report.summary {
        println!(
            "{} Updated summary ({} refs, {} deltas)",
            "✓".green().bold(),
            summary.refs,
            summary.deltas
        );
    }
    if let Some(prune) = &report.prune {
        println!("{} {}", "✓".green().bold(), prune);
    }
}
