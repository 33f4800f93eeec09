use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Default per-file render timeout in seconds. mmdc launches a headless
/// browser, so a wedged render would otherwise block the scan forever.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Directory names pruned from the walk unless overridden in config.
pub fn default_exclude() -> Vec<String> {
    [".git", ".venv", "__pycache__", "node_modules", "target"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Configuration required to run a sync pass.
/// This decouples the logic from how the arguments were parsed (CLI/Config file).
#[derive(Clone)]
pub struct SyncConfig {
    pub root: PathBuf,
    pub exclude: Vec<String>,
    pub timeout: Option<Duration>,
    pub include_hidden: bool,
    pub follow_symlinks: bool,
    pub force: bool,
    pub dry_run: bool,
    pub verbose: bool,
    pub quiet: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcessResult {
    /// Output did not exist and was rendered for the first time.
    Generated,
    /// Output existed but was stale and was re-rendered.
    Updated,
    /// Output was already current.
    Skipped,
}

/// Aggregate outcome of one sync pass.
#[derive(Default, Debug)]
pub struct SyncSummary {
    pub generated: usize,
    pub updated: usize,
    pub skipped: usize,
    pub errors: usize,
}

impl SyncSummary {
    pub fn record(&mut self, result: ProcessResult) {
        match result {
            ProcessResult::Generated => self.generated += 1,
            ProcessResult::Updated => self.updated += 1,
            ProcessResult::Skipped => self.skipped += 1,
        }
    }
}

impl fmt::Display for SyncSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Done. {} generated, {} updated, {} skipped.",
            self.generated, self.updated, self.skipped
        )?;
        if self.errors > 0 {
            write!(f, " Completed with {} error(s).", self.errors)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_counts_each_variant() {
        let mut summary = SyncSummary::default();
        summary.record(ProcessResult::Generated);
        summary.record(ProcessResult::Updated);
        summary.record(ProcessResult::Skipped);
        summary.record(ProcessResult::Skipped);
        assert_eq!(summary.generated, 1);
        assert_eq!(summary.updated, 1);
        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.errors, 0);
    }

    #[test]
    fn summary_display_omits_errors_when_clean() {
        let summary = SyncSummary {
            generated: 2,
            updated: 0,
            skipped: 3,
            errors: 0,
        };
        assert_eq!(summary.to_string(), "Done. 2 generated, 0 updated, 3 skipped.");
    }

    #[test]
    fn summary_display_reports_errors() {
        let summary = SyncSummary {
            generated: 0,
            updated: 1,
            skipped: 0,
            errors: 2,
        };
        assert_eq!(
            summary.to_string(),
            "Done. 0 generated, 1 updated, 0 skipped. Completed with 2 error(s)."
        );
    }

    #[test]
    fn default_exclude_covers_vcs_and_build_dirs() {
        let exclude = default_exclude();
        assert!(exclude.iter().any(|d| d == ".git"));
        assert!(exclude.iter().any(|d| d == "node_modules"));
    }
}
