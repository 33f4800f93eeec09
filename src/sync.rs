//! The sync pass: pair each discovered source with its rendered output,
//! decide freshness from filesystem metadata, and regenerate what is stale.

use crate::discover;
use crate::engine::RenderEngine;
use crate::render;
use crate::utils::{ProcessResult, SyncConfig, SyncSummary};
use eyre::Result;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Extension of rendered outputs.
const OUTPUT_EXT: &str = "svg";

/// State of a source/output pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// No rendered output exists yet.
    Missing,
    /// The source was modified after the output was last rendered.
    Outdated,
    /// The output is at least as recent as its source.
    Current,
}

/// Sibling output path: same directory, same stem, `.svg` extension.
pub fn svg_path(source: &Path) -> PathBuf {
    source.with_extension(OUTPUT_EXT)
}

/// Pure freshness decision. Equal timestamps count as current so a render
/// that completes within the filesystem's timestamp granularity is not
/// re-run on every pass.
pub fn freshness(source_mtime: SystemTime, output_mtime: Option<SystemTime>) -> Freshness {
    match output_mtime {
        None => Freshness::Missing,
        Some(out) if source_mtime > out => Freshness::Outdated,
        Some(_) => Freshness::Current,
    }
}

/// Stat both paths and decide freshness from their metadata.
fn check_freshness(source: &Path, output: &Path) -> io::Result<Freshness> {
    let source_mtime = fs::metadata(source)?.modified()?;
    let output_mtime = match fs::metadata(output) {
        Ok(meta) => Some(meta.modified()?),
        Err(e) if e.kind() == io::ErrorKind::NotFound => None,
        Err(e) => return Err(e),
    };
    Ok(freshness(source_mtime, output_mtime))
}

/// Run one full sync pass: discover, compare, regenerate, report.
///
/// Files are processed sequentially and independently; a single failed
/// render is collected and the pass moves on. The caller turns
/// `summary.errors > 0` into the process exit code.
pub fn execute(config: &SyncConfig, engine: &RenderEngine) -> Result<SyncSummary> {
    let sources = discover::find_sources(config);
    let mut summary = SyncSummary::default();

    if sources.is_empty() {
        if !config.quiet {
            eprintln!("No .mmd files found under {}", config.root.display());
        }
        return Ok(summary);
    }
    if config.verbose {
        eprintln!("Found {} diagram source(s).", sources.len());
    }

    let mut failures: Vec<(PathBuf, String)> = Vec::new();

    for source in sources {
        let output = svg_path(&source);

        let state = match check_freshness(&source, &output) {
            Ok(state) => state,
            Err(e) => {
                summary.errors += 1;
                failures.push((source, format!("cannot stat: {e}")));
                continue;
            }
        };

        let result = match state {
            Freshness::Current if !config.force => ProcessResult::Skipped,
            Freshness::Missing => ProcessResult::Generated,
            // Outdated, or current under --force.
            _ => ProcessResult::Updated,
        };

        if result == ProcessResult::Skipped {
            summary.record(result);
            if config.verbose {
                eprintln!("Skipped:   {}", output.display());
            }
            continue;
        }

        if config.dry_run {
            summary.record(result);
            if !config.quiet {
                match result {
                    ProcessResult::Generated => eprintln!("Would generate: {}", output.display()),
                    _ => eprintln!("Would update:   {}", output.display()),
                }
            }
            continue;
        }

        match render::render(engine, &source, &output, config.timeout) {
            Ok(()) => {
                summary.record(result);
                if config.verbose {
                    match result {
                        ProcessResult::Generated => eprintln!("Generated: {}", output.display()),
                        _ => eprintln!("Updated:   {}", output.display()),
                    }
                }
            }
            Err(e) => {
                summary.errors += 1;
                failures.push((source, format!("{e:#}")));
            }
        }
    }

    report_failures(&failures);
    Ok(summary)
}

fn report_failures(failures: &[(PathBuf, String)]) {
    if failures.is_empty() {
        return;
    }
    eprintln!("\nErrors:");
    for (source, message) in failures {
        eprintln!("  {}: {}", source.display(), message);
    }
    if failures
        .iter()
        .any(|(_, message)| render::looks_like_chrome_error(message))
    {
        eprintln!("\nNote: Chrome/Chromium is required by mermaid-cli.");
        eprintln!("Install it with: npx puppeteer browsers install chrome-headless-shell");
    }
}
