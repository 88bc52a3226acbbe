//! # hf-cache
//!
//! Inspects and prunes a local content-addressed model/dataset cache.
//!
//! ## Architecture
//!
//! ```text
//!                    ┌─────────────┐
//!                    │   CLI (clap) │
//!                    └──────┬──────┘
//!                           │
//!              ┌────────────┼────────────┐
//!              ▼            ▼            ▼
//!         ┌────────┐  ┌──────────┐  ┌──────────┐
//!         │  scan  │  │  report  │  │   plan   │
//!         └───┬────┘  └────┬─────┘  └────┬─────┘
//!             │            │             │
//!             ▼            ▼             ▼
//!         WalkDir     CachedRepo /   DeletionPlan
//!                      CachedRevision    │
//!                                        ▼
//!                                   fs_remove
//! ```

mod config;
mod error;
mod fs_remove;
mod naming;
mod plan;
mod report;
mod scan;
mod sizefmt;

use clap::{Parser, Subcommand};
use colored::Colorize;
use report::HFCacheInfo;
use std::path::PathBuf;
use std::time::Instant;

/// hf-cache — inspect and prune a local content-addressed model/dataset cache.
#[derive(Parser, Debug)]
#[command(
    name = "hf-cache",
    version,
    about = "Inspect and prune a local content-addressed model/dataset cache",
    long_about = "hf-cache walks a cache directory laid out as \
                  <type>s--<org>--<name>/{refs,blobs,snapshots}, reports \
                  deduplicated disk usage per repo and revision, and plans \
                  (then executes) deletions that only remove blobs no \
                  surviving revision still references."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan the cache and print a report
    Scan {
        /// Cache directory to scan (defaults to the HF cache search path)
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// List individual revisions per repo
        #[arg(short, long)]
        verbose: bool,

        /// Emit the report as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Print only the total size on disk
    Size {
        /// Cache directory to scan (defaults to the HF cache search path)
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },

    /// Delete one or more revisions by commit hash (or unique prefix)
    Delete {
        /// Commit hashes (or unique prefixes) of the revisions to delete
        #[arg(required = true)]
        hashes: Vec<String>,

        /// Cache directory to scan (defaults to the HF cache search path)
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Skip the confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,

        /// Print what would be deleted without touching the filesystem
        #[arg(long)]
        dry_run: bool,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("{} {}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> error::Result<()> {
    match cli.command {
        Command::Scan { dir, verbose, json } => cmd_scan(dir, verbose, json),
        Command::Size { dir } => cmd_size(dir),
        Command::Delete {
            hashes,
            dir,
            yes,
            dry_run,
        } => cmd_delete(dir, &hashes, yes, dry_run),
    }
}

fn resolve_dir(explicit: Option<PathBuf>) -> error::Result<PathBuf> {
    config::resolve_cache_root(explicit).ok_or_else(|| {
        error::CacheError::Other(anyhow::anyhow!(
            "could not determine a cache directory: pass --dir or set HUGGINGFACE_HUB_CACHE, \
             HF_HOME, or HOME"
        ))
    })
}

fn cmd_scan(dir: Option<PathBuf>, verbose: bool, json: bool) -> error::Result<()> {
    let cache_dir = resolve_dir(dir)?;
    let started = Instant::now();
    let info = scan::scan_cache_dir(&cache_dir)?;

    if json {
        let rendered = serde_json::to_string_pretty(&info)
            .map_err(|e| error::CacheError::Other(anyhow::anyhow!(e)))?;
        println!("{rendered}");
        return Ok(());
    }

    print_report(&info, verbose);
    print_summary(&info, started.elapsed().as_secs_f64());
    Ok(())
}

fn cmd_size(dir: Option<PathBuf>) -> error::Result<()> {
    let cache_dir = resolve_dir(dir)?;
    let info = scan::scan_cache_dir(&cache_dir)?;
    println!("{}", sizefmt::human_size(info.size_on_disk()));
    Ok(())
}

fn cmd_delete(dir: Option<PathBuf>, hashes: &[String], yes: bool, dry_run: bool) -> error::Result<()> {
    let cache_dir = resolve_dir(dir)?;
    let info = scan::scan_cache_dir(&cache_dir)?;

    let refs: Vec<&str> = hashes.iter().map(String::as_str).collect();
    let deletion_plan = info.delete_revisions(&refs);

    if deletion_plan.blobs.is_empty() && deletion_plan.repos.is_empty() {
        println!("Nothing to delete.");
        return Ok(());
    }

    println!(
        "Will free {} by removing:",
        sizefmt::human_size(deletion_plan.expected_freed_size).bold().red()
    );
    println!("  {} blob(s)", deletion_plan.blobs.len());
    println!("  {} snapshot dir(s)", deletion_plan.snapshots.len());
    println!("  {} ref(s)", deletion_plan.refs.len());
    println!("  {} whole repo(s)", deletion_plan.repos.len());

    if dry_run {
        println!("(dry run, nothing was deleted)");
        return Ok(());
    }

    if !yes && !confirm("Proceed?") {
        println!("Aborted.");
        return Ok(());
    }

    deletion_plan.execute();
    println!("Done.");
    Ok(())
}

fn confirm(prompt: &str) -> bool {
    use std::io::Write;
    print!("{prompt} [y/N] ");
    let _ = std::io::stdout().flush();
    let mut answer = String::new();
    if std::io::stdin().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

fn print_report(info: &HFCacheInfo, verbose: bool) {
    if verbose {
        println!(
            "{:<30} {:<10} {:<12} {:>10} {:>6} {:<20} {}",
            "REPO ID", "REPO TYPE", "REVISION", "SIZE ON DISK", "NB FILES", "REFS", "LOCAL PATH"
        );
    } else {
        println!(
            "{:<30} {:<10} {:>10} {:>6} {:<20} {}",
            "REPO ID", "REPO TYPE", "SIZE ON DISK", "NB FILES", "REFS", "LOCAL PATH"
        );
    }

    let mut repos: Vec<&report::CachedRepo> = info.repos.iter().collect();
    repos.sort_by(|a, b| a.repo_id.cmp(&b.repo_id));

    for repo in repos {
        let mut ref_names: Vec<&String> = repo.refs.keys().collect();
        ref_names.sort();
        let refs_joined = ref_names
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        if verbose {
            let mut revisions: Vec<&report::CachedRevision> = repo.revisions.values().collect();
            revisions.sort_by(|a, b| a.commit_hash.cmp(&b.commit_hash));
            for rev in revisions {
                println!(
                    "{:<30} {:<10} {:<12} {:>10} {:>6} {:<20} {}",
                    repo.repo_id,
                    repo.repo_type,
                    rev.commit_hash,
                    sizefmt::human_size(rev.size_on_disk()),
                    rev.nb_files(),
                    refs_joined,
                    repo.repo_path.display(),
                );
            }
        } else {
            println!(
                "{:<30} {:<10} {:>10} {:>6} {:<20} {}",
                repo.repo_id,
                repo.repo_type,
                sizefmt::human_size(repo.size_on_disk()),
                repo.nb_files(),
                refs_joined,
                repo.repo_path.display(),
            );
        }
    }
}

fn print_summary(info: &HFCacheInfo, elapsed_seconds: f64) {
    let size = sizefmt::human_size(info.size_on_disk());
    println!(
        "\nDone in {elapsed_seconds:.1}s. Scanned {} repo(s) for a total of {}.",
        info.repos.len(),
        size.bold().red(),
    );

    if !info.warnings.is_empty() {
        eprintln!("\n{} warning(s) were emitted during the scan:", info.warnings.len());
        for warning in &info.warnings {
            eprintln!("  - {warning}");
        }
    }
}
