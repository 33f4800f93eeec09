mod discover;
mod engine;
mod render;
mod sync;
mod utils;

use clap::Parser;
use eyre::{Context, Result, eyre};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Keep rendered .svg files in sync with their Mermaid .mmd sources.
/// Designed to be cheap enough to run from an editor save hook.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory to scan for .mmd files.
    /// Defaults to the current directory if not set in config.
    #[arg(value_name = "ROOT")]
    root: Option<PathBuf>,

    /// Path to the mermaid-cli executable (mmdc).
    /// Auto-detected if omitted.
    #[arg(long, value_name = "PATH")]
    mmdc: Option<PathBuf>,

    /// Path to a Chrome/Chromium executable for mermaid-cli's puppeteer.
    /// Auto-detected if omitted.
    #[arg(long, value_name = "PATH")]
    chrome: Option<PathBuf>,

    /// Path to a specific configuration file.
    /// Defaults to $XDG_CONFIG_HOME/mermaid-svg-sync/config.toml
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Per-file render timeout in seconds (0 disables the timeout).
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Regenerate every diagram even if its output is current.
    #[arg(short, long)]
    force: bool,

    /// Report what would be regenerated without invoking the renderer.
    #[arg(long)]
    dry_run: bool,

    /// Descend into hidden (dot-prefixed) directories.
    #[arg(long)]
    include_hidden: bool,

    /// Follow symlinks during discovery.
    #[arg(long)]
    follow_symlinks: bool,

    /// Print each file generated, updated or skipped.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress the final summary line.
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Deserialize, Default)]
struct FileConfig {
    root: Option<PathBuf>,
    mmdc_path: Option<PathBuf>,
    chrome_path: Option<PathBuf>,
    timeout_secs: Option<u64>,
    include_hidden: Option<bool>,
    follow_symlinks: Option<bool>,
    exclude: Option<Vec<String>>,
}

fn load_file_config(explicit_path: Option<&Path>) -> Result<FileConfig> {
    let path = if let Some(p) = explicit_path {
        if !p.exists() {
            return Err(eyre!("Config file not found: {}", p.display()));
        }
        Some(p.to_path_buf())
    } else {
        // Search: XDG/OS config dir, then nothing
        dirs::config_dir()
            .map(|d| d.join("mermaid-svg-sync/config.toml"))
            .filter(|p| p.exists())
    };

    match path {
        None => Ok(FileConfig::default()),
        Some(p) => {
            let content = fs::read_to_string(&p)
                .wrap_err_with(|| format!("Failed to read config: {}", p.display()))?;
            toml::from_str(&content)
                .wrap_err_with(|| format!("Failed to parse config: {}", p.display()))
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1. Load config file (CLI path > default path)
    let file_cfg = load_file_config(cli.config.as_deref())?;

    // 2. Resolve the scan root (CLI > Config > Current directory)
    let root = cli
        .root
        .or(file_cfg.root)
        .unwrap_or_else(|| PathBuf::from("."));
    if !root.is_dir() {
        return Err(eyre!("Scan root is not a directory: {}", root.display()));
    }

    // 3. Resolve the timeout (CLI > Config > Default); 0 turns it off
    let timeout_secs = cli
        .timeout
        .or(file_cfg.timeout_secs)
        .unwrap_or(utils::DEFAULT_TIMEOUT_SECS);
    let timeout = (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs));

    // 4. Build the Sync Config
    let config = utils::SyncConfig {
        root,
        exclude: file_cfg.exclude.unwrap_or_else(utils::default_exclude),
        timeout,
        include_hidden: cli.include_hidden || file_cfg.include_hidden.unwrap_or(false),
        follow_symlinks: cli.follow_symlinks || file_cfg.follow_symlinks.unwrap_or(false),
        force: cli.force,
        dry_run: cli.dry_run,
        verbose: cli.verbose,
        quiet: cli.quiet,
    };

    // 5. Locate the renderer before touching any file; no engine means the
    //    whole run aborts here. Resolution also runs for --dry-run so the
    //    report reflects what a real run would do.
    let engine = engine::RenderEngine::resolve(
        cli.mmdc.or(file_cfg.mmdc_path).as_deref(),
        cli.chrome.or(file_cfg.chrome_path).as_deref(),
    )?;

    // 6. Run the sync pass
    let summary = sync::execute(&config, &engine)?;
    if !config.quiet {
        eprintln!("{summary}");
    }
    if summary.errors > 0 {
        return Err(eyre!("{} file(s) failed to regenerate", summary.errors));
    }
    Ok(())
}
