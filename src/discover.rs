//! Recursive discovery of Mermaid diagram sources.

use crate::utils::SyncConfig;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

/// File extension that marks a diagram source.
pub const SOURCE_EXT: &str = "mmd";

/// Walk the configured root and collect every `.mmd` file, sorted for a
/// deterministic processing order. Each call re-walks the tree; nothing is
/// cached between runs.
///
/// An unreadable directory is reported to stderr and its subtree skipped;
/// discovery itself never fails.
pub fn find_sources(config: &SyncConfig) -> Vec<PathBuf> {
    let mut sources = Vec::new();
    walk(&config.root, config, &mut sources);
    sources.sort();
    sources
}

fn walk(dir: &Path, config: &SyncConfig, sources: &mut Vec<PathBuf>) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            eprintln!("Warning: cannot read {}: {}", dir.display(), e);
            return;
        }
    };

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                eprintln!("Warning: cannot read entry in {}: {}", dir.display(), e);
                continue;
            }
        };
        let path = entry.path();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };

        // Symlinks are ignored entirely unless explicitly followed; once
        // followed, `is_dir`/`extension` below see the link target.
        if file_type.is_symlink() && !config.follow_symlinks {
            continue;
        }

        if path.is_dir() {
            if should_descend(&entry.file_name(), config) {
                walk(&path, config, sources);
            }
        } else if path.extension() == Some(OsStr::new(SOURCE_EXT)) {
            sources.push(path);
        }
    }
}

fn should_descend(name: &OsStr, config: &SyncConfig) -> bool {
    let Some(name) = name.to_str() else {
        return true;
    };
    if !config.include_hidden && name.starts_with('.') {
        return false;
    }
    !config.exclude.iter().any(|excluded| excluded == name)
}
