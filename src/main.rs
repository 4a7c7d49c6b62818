// src/main.rs

mod cli;

use anyhow::{Context, Result};
use chrono::{TimeZone, Utc};
use clap::Parser;
use cli::{Args, Command, Scope};
use committools::analysis::activity::ActiveCommitterData;
use committools::analysis::dedup::{commits_for_all, find_duplicates, ParallelDeduplicator};
use committools::analysis::keywords::count_matching_commits_at;
use committools::analysis::lifecycle::LineLifecycle;
use committools::analysis::repository_dirs;
use committools::analysis::retention::InternalExternalData;
use committools::signal::ShutdownListener;
use committools::{CommitOrdering, PathFilter, Terminator, WalkWindow, WalkerConfig};
use git2::Repository;
use indicatif::ProgressBar;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let start_time = Instant::now();
    run(args.command)?;
    info!("Total time: {:.2?}", start_time.elapsed());
    Ok(())
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn open(path: &Path) -> Result<Repository> {
    Repository::open(path).with_context(|| format!("Failed to open repository at {}", path.display()))
}

fn project_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Run `f` on every repository under `dir`, logging and skipping failures.
fn for_each_project<F>(dir: &Path, mut f: F) -> Result<()>
where
    F: FnMut(&Path) -> Result<String>,
{
    let projects = repository_dirs(dir).with_context(|| format!("Failed to list {}", dir.display()))?;
    let bar = ProgressBar::new(projects.len() as u64);
    for project in &projects {
        match f(project) {
            Ok(line) => bar.suspend(|| println!("{},{}", project_name(project), line)),
            Err(e) => warn!("Skipping {}: {:#}", project.display(), e),
        }
        bar.inc(1);
    }
    bar.finish_and_clear();
    Ok(())
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Order { repo, ordering } => print_order(&repo, ordering.into()),
        Command::Activity { scope, path, grace_days } => {
            let grace = grace_days * 86_400;
            match scope {
                Scope::Single => {
                    let data = ActiveCommitterData::build(&open(&path)?, grace)?;
                    println!("{}", join_series(&data));
                    println!("Activity ratio: {}", format_ratio(data.last_activity_ratio()));
                    Ok(())
                }
                Scope::Multiple => for_each_project(&path, |project| {
                    let data = ActiveCommitterData::build(&open(project)?, grace)?;
                    Ok(activity_summary(&data))
                }),
            }
        }
        Command::Retention { path, limit } => for_each_project(&path, |project| {
            let data = InternalExternalData::build(&open(project)?, limit)?;
            let retention = data
                .internal_retention_days
                .map_or_else(|| "NaN".to_string(), |days| format!("{days:.2}"));
            Ok(format!("{},{},{}", data.num_internal(), data.num_external(), retention))
        }),
        Command::Dedup { path, threshold, parallel } => dedup(&path, threshold, parallel),
        Command::Keywords { scope, path, keywords } => match scope {
            Scope::Single => {
                println!("{}", count_matching_commits_at(&path, &keywords)?);
                Ok(())
            }
            Scope::Multiple => for_each_project(&path, |project| {
                Ok(count_matching_commits_at(project, &keywords)?.to_string())
            }),
        },
        Command::Lifecycle { repo, suffix, glob, limit } => lifecycle(repo, suffix, glob, limit),
    }
}

fn join_series(data: &ActiveCommitterData) -> String {
    let series: Vec<String> = data.time_series().iter().map(ToString::to_string).collect();
    series.join(",")
}

fn format_ratio(ratio: Option<f64>) -> String {
    ratio.map_or_else(|| "NaN".to_string(), |ratio| format!("{ratio:.4}"))
}

/// `ratio,last active committers` for one project.
fn activity_summary(data: &ActiveCommitterData) -> String {
    format!(
        "{},{}",
        format_ratio(data.last_activity_ratio()),
        data.last_active_committers().unwrap_or(0)
    )
}

fn print_order(repo: &Path, ordering: CommitOrdering) -> Result<()> {
    let repo = open(repo)?;
    let commits = ordering.commits(&repo).context("Failed to order commits")?;
    for commit in &commits {
        let date = Utc
            .timestamp_opt(commit.time, 0)
            .single()
            .map_or_else(|| commit.time.to_string(), |date| date.to_rfc2822());
        println!(
            "{} {} {} {}",
            commit.id,
            date,
            commit.author.name,
            commit.message.lines().next().unwrap_or_default()
        );
    }
    info!("{} commits", commits.len());
    Ok(())
}

fn dedup(path: &Path, threshold: usize, parallel: bool) -> Result<()> {
    let projects = repository_dirs(path).with_context(|| format!("Failed to list {}", path.display()))?;
    let start_time = Instant::now();
    if parallel {
        let duplicates = ParallelDeduplicator::new(threshold).with_progress(true).find_duplicates(&projects);
        for (base, others) in &duplicates {
            for other in others {
                println!("{},{}", project_name(base), project_name(other));
            }
        }
    } else {
        let sets = commits_for_all(&projects);
        for (first, second) in find_duplicates(&sets, threshold) {
            println!("{},{}", project_name(&first), project_name(&second));
        }
    }
    info!("Compared {} repositories in {:.2?}", projects.len(), start_time.elapsed());
    Ok(())
}

fn lifecycle(repo: PathBuf, suffixes: Vec<String>, globs: Vec<String>, limit: Option<usize>) -> Result<()> {
    let filter = if !globs.is_empty() {
        PathFilter::globs(&globs)?
    } else if !suffixes.is_empty() {
        PathFilter::suffixes(suffixes)
    } else {
        PathFilter::All
    };
    let window = limit.map_or_else(WalkWindow::all, WalkWindow::first);
    let config = WalkerConfig::default();

    let terminator = Terminator::new();
    let listener = ShutdownListener::install(terminator.clone(), config.grace_period)
        .context("Failed to install shutdown signal handlers")?;
    let ages = LineLifecycle::new(&repo, filter)
        .with_config(config)
        .calculate(window, &terminator);
    listener.deregister();

    let ages = ages.with_context(|| format!("Line lifecycle of {} failed", repo.display()))?;
    for age in &ages {
        println!("{}", age.age);
    }
    info!("{} removed lines", ages.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activity_summary_has_ratio_and_last_count() {
        let data = ActiveCommitterData {
            start: 0,
            period: 100,
            series: vec![1, 3, 1, 2],
        };
        assert_eq!(join_series(&data), "1,3,1,2");
        assert_eq!(activity_summary(&data), "0.6667,2");
    }

    #[test]
    fn empty_activity_prints_nan() {
        let data = ActiveCommitterData {
            start: 0,
            period: 100,
            series: Vec::new(),
        };
        assert_eq!(activity_summary(&data), "NaN,0");
    }
}
