//! Main entry point for the cloud-unzip CLI application.
//!
//! Lists or extracts entries of a ZIP archive given as an HTTP(S) URL or a
//! local path.

use anyhow::{Result, bail};
use clap::Parser;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing_subscriber::EnvFilter;

use cloud_unzip::listing::{format_size, glob_match, has_glob_chars, render_tree};
use cloud_unzip::{Cli, HttpRangeFetcher, LocalFileFetcher, RangeFetcher, ZipArchive};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);

    if cli.is_http_url() {
        let fetcher = HttpRangeFetcher::new(cli.archive.as_str())
            .await?
            .with_max_retry(cli.retries);
        let fetcher = Arc::new(fetcher);

        run(fetcher.clone(), &cli).await?;

        // Display network transfer statistics for HTTP sources
        if !cli.is_quiet() {
            eprintln!(
                "\nTotal bytes transferred: {}",
                format_size(fetcher.transferred_bytes())
            );
        }
    } else {
        let fetcher = Arc::new(LocalFileFetcher::open(Path::new(&cli.archive))?);
        run(fetcher, &cli).await?;
    }

    Ok(())
}

/// Log to stderr; `RUST_LOG` wins over the quiet flags.
fn init_tracing(cli: &Cli) {
    let default_level = if cli.is_very_quiet() { "error" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run<F: RangeFetcher + 'static>(fetcher: Arc<F>, cli: &Cli) -> Result<()> {
    let archive = ZipArchive::open(fetcher).await?;

    if cli.is_listing() {
        if cli.tree {
            println!("{}", render_tree(archive.file_names()));
        } else {
            list_entries(&archive, cli.verbose);
        }
        return Ok(());
    }

    let names = select_entries(&archive, cli)?;
    if names.is_empty() {
        if !cli.is_quiet() {
            eprintln!("Nothing to extract");
        }
        return Ok(());
    }

    if cli.pipe {
        pipe_entries(&archive, &names, cli).await
    } else {
        extract_entries(&archive, &names, cli).await
    }
}

/// Resolve the positional patterns and `-x` exclusions to entry names.
///
/// Plain names pass through untouched so that a name missing from the archive
/// surfaces as a missing-entry error during extraction. A wildcard pattern
/// that matches nothing is an error right away.
fn select_entries<F: RangeFetcher>(archive: &ZipArchive<F>, cli: &Cli) -> Result<Vec<String>> {
    let all = archive.file_names();

    let mut selected: Vec<&str> = Vec::new();
    if cli.files.is_empty() {
        selected.extend(all.iter().copied());
    } else {
        for pattern in &cli.files {
            if has_glob_chars(pattern) {
                let before = selected.len();
                selected.extend(all.iter().copied().filter(|name| glob_match(pattern, name)));
                if selected.len() == before {
                    bail!("{pattern}: no matching entries in {}", archive.location());
                }
            } else {
                selected.push(pattern);
            }
        }
    }

    let mut seen = HashSet::new();
    Ok(selected
        .into_iter()
        .filter(|name| !cli.exclude.iter().any(|x| x.as_str() == *name || glob_match(x, name)))
        .filter(|name| seen.insert(*name))
        .map(str::to_owned)
        .collect())
}

/// List files in the archive, plain or as a table.
fn list_entries<F: RangeFetcher>(archive: &ZipArchive<F>, verbose: bool) {
    let mut entries: Vec<_> = archive.entries().collect();
    entries.sort_unstable_by(|a, b| a.file_name.cmp(&b.file_name));

    if !verbose {
        for entry in entries {
            println!("{}", entry.file_name);
        }
        return;
    }

    println!(
        "{:>10}  {:>10}  {:>5}  {:<8}  {:>10}  {:>5}  Name",
        "Length", "Size", "Cmpr", "Method", "Date", "Time"
    );
    println!("{}", "-".repeat(80));

    let mut total_uncompressed = 0u64;
    let mut total_compressed = 0u64;
    let mut file_count = 0usize;

    for entry in entries {
        let (year, month, day) = entry.mod_date();
        let (hour, minute, _second) = entry.mod_time();

        println!(
            "{:>10}  {:>10}  {}  {:<8}  {:04}-{:02}-{:02}  {:02}:{:02}  {}",
            entry.uncompressed_size,
            entry.compressed_size,
            ratio(entry.compressed_size, entry.uncompressed_size),
            entry.compression_method.to_string(),
            year,
            month,
            day,
            hour,
            minute,
            entry.file_name
        );

        if !entry.is_directory {
            total_uncompressed += entry.uncompressed_size;
            total_compressed += entry.compressed_size;
            file_count += 1;
        }
    }

    println!("{}", "-".repeat(80));
    println!(
        "{:>10}  {:>10}  {}  {:>31}  {} files",
        total_uncompressed,
        total_compressed,
        ratio(total_compressed, total_uncompressed),
        "",
        file_count
    );
}

/// Percentage saved by compression
fn ratio(compressed: u64, uncompressed: u64) -> String {
    if uncompressed == 0 {
        return format!("{:>4}%", 0);
    }
    let kept = (u128::from(compressed) * 100 / u128::from(uncompressed)) as u64;
    format!("{:>4}%", 100u64.saturating_sub(kept))
}

/// Write entries to stdout one after another.
async fn pipe_entries<F: RangeFetcher>(
    archive: &ZipArchive<F>,
    names: &[String],
    cli: &Cli,
) -> Result<()> {
    let options = cli.extract_options();
    let mut stdout = tokio::io::stdout();
    let show_names = names.len() > 1;

    for name in names {
        if archive.entry(name)?.is_directory {
            continue;
        }
        if show_names {
            stdout.write_all(format!("--- {name} ---\n").as_bytes()).await?;
        }
        archive.extract_to_writer(name, &mut stdout, &options).await?;
    }

    stdout.flush().await?;
    Ok(())
}

/// Extract entries below `-d` (or the current directory) in parallel.
async fn extract_entries<F: RangeFetcher + 'static>(
    archive: &ZipArchive<F>,
    names: &[String],
    cli: &Cli,
) -> Result<()> {
    let dest = cli
        .extract_dir
        .as_deref()
        .map_or_else(|| PathBuf::from("."), PathBuf::from);
    let options = cli.extract_options();

    if !cli.is_quiet() {
        println!("Archive:  {}", archive.location());
    }

    let report = archive.extract_parallel(names, &dest, &options).await?;

    if !cli.is_quiet() {
        for path in &report.extracted {
            println!("  extracting: {}", path.display());
        }
    }
    for failed in &report.failed {
        eprintln!("  error:  {}: {}", failed.name, failed.error);
    }

    if !report.is_complete() {
        bail!(
            "{} of {} entries failed to extract",
            report.failed.len(),
            names.len()
        );
    }
    Ok(())
}
