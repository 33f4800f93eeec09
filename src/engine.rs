//! Locates the external rendering toolchain.
//!
//! mermaid-cli (`mmdc`) does the actual SVG rendering and in turn needs a
//! Chrome or Chromium binary for its embedded puppeteer. Both are probed once
//! at startup; the resolved paths travel with the [`RenderEngine`] value
//! instead of living in process-global state.

use eyre::{Result, eyre};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Executable names probed for mermaid-cli. npm installs a `.cmd` shim on
/// Windows.
#[cfg(windows)]
const MMDC_NAMES: &[&str] = &["mmdc.cmd", "mmdc"];
#[cfg(not(windows))]
const MMDC_NAMES: &[&str] = &["mmdc"];

/// System Chrome/Chromium install locations, checked before puppeteer's cache.
const SYSTEM_CHROME_PATHS: &[&str] = &[
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    "/usr/bin/google-chrome",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
];

/// Resolved paths to the external rendering toolchain.
#[derive(Debug, Clone)]
pub struct RenderEngine {
    /// Path to the mermaid-cli executable.
    pub mmdc: PathBuf,
    /// Chrome/Chromium executable handed to puppeteer, when one was found.
    /// mmdc falls back to its own bundled download when this is `None`.
    pub chrome: Option<PathBuf>,
}

impl RenderEngine {
    /// Resolve the toolchain, preferring explicit overrides over probing.
    ///
    /// Fails when no mmdc executable can be located. A missing Chrome is not
    /// fatal here because mmdc may carry its own copy; if it does not, the
    /// failure surfaces per file with an install hint.
    pub fn resolve(mmdc: Option<&Path>, chrome: Option<&Path>) -> Result<Self> {
        let mmdc = match mmdc {
            Some(path) if path.exists() => path.to_path_buf(),
            Some(path) => return Err(eyre!("mmdc not found at: {}", path.display())),
            None => find_mmdc().ok_or_else(|| {
                eyre!(
                    "mermaid-cli (mmdc) not found.\n\
                     Install it with:\n  \
                     macOS: brew install mermaid-cli\n  \
                     Other: npm install -g @mermaid-js/mermaid-cli"
                )
            })?,
        };

        let chrome = match chrome {
            Some(path) if path.exists() => Some(path.to_path_buf()),
            Some(path) => return Err(eyre!("Chrome not found at: {}", path.display())),
            None => find_chrome(),
        };

        Ok(Self { mmdc, chrome })
    }
}

/// Probe `$PATH`, then common install prefixes, for an mmdc executable.
///
/// The extra prefixes matter because editor-spawned save hooks often run with
/// a minimal environment that misses Homebrew/npm bin directories.
fn find_mmdc() -> Option<PathBuf> {
    if let Some(path_var) = env::var_os("PATH") {
        for dir in env::split_paths(&path_var) {
            if let Some(found) = mmdc_in(&dir) {
                return Some(found);
            }
        }
    }

    let mut prefixes = vec![
        PathBuf::from("/opt/homebrew/bin"),
        PathBuf::from("/usr/local/bin"),
        PathBuf::from("/usr/bin"),
    ];
    if let Some(home) = dirs::home_dir() {
        prefixes.push(home.join(".local/bin"));
        prefixes.push(home.join(".npm-global/bin"));
    }
    prefixes.iter().find_map(|dir| mmdc_in(dir))
}

fn mmdc_in(dir: &Path) -> Option<PathBuf> {
    MMDC_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|candidate| candidate.is_file())
}

/// System Chrome first, then puppeteer's cache under `~/.cache/puppeteer`.
fn find_chrome() -> Option<PathBuf> {
    for path in SYSTEM_CHROME_PATHS {
        let path = Path::new(path);
        if path.exists() {
            return Some(path.to_path_buf());
        }
    }
    let cache = dirs::home_dir()?.join(".cache/puppeteer/chrome");
    find_in_puppeteer_cache(&cache)
}

/// Walk puppeteer's versioned cache layout for a usable binary, preferring
/// `chrome-headless-shell` over full Chrome. The newest version wins.
fn find_in_puppeteer_cache(cache: &Path) -> Option<PathBuf> {
    let mut headless: Vec<PathBuf> = Vec::new();
    let mut full: Vec<PathBuf> = Vec::new();

    let mut stack = vec![cache.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let Ok(entries) = fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                match name {
                    "chrome-headless-shell" => headless.push(path),
                    "chrome" | "Google Chrome" => full.push(path),
                    _ => {}
                }
            }
        }
    }

    // Version directories sort lexicographically within one major series;
    // good enough for picking the latest download.
    headless.sort();
    full.sort();
    headless.pop().or_else(|| full.pop())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        File::create(path).unwrap();
    }

    #[test]
    fn explicit_mmdc_override_is_honored() {
        let dir = TempDir::new().unwrap();
        let mmdc = dir.path().join("mmdc");
        touch(&mmdc);

        let engine = RenderEngine::resolve(Some(&mmdc), None).unwrap();
        assert_eq!(engine.mmdc, mmdc);
    }

    #[test]
    fn missing_mmdc_override_is_an_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("no-such-mmdc");

        let err = RenderEngine::resolve(Some(&missing), None).unwrap_err();
        assert!(err.to_string().contains("mmdc not found at"));
    }

    #[test]
    fn missing_chrome_override_is_an_error() {
        let dir = TempDir::new().unwrap();
        let mmdc = dir.path().join("mmdc");
        touch(&mmdc);
        let missing = dir.path().join("no-such-chrome");

        let err = RenderEngine::resolve(Some(&mmdc), Some(&missing)).unwrap_err();
        assert!(err.to_string().contains("Chrome not found at"));
    }

    #[test]
    fn puppeteer_cache_prefers_headless_shell() {
        let dir = TempDir::new().unwrap();
        let cache = dir.path().join("chrome");
        touch(&cache.join("linux-140.0.1/chrome-linux64/chrome"));
        touch(&cache.join("chrome-headless-shell/linux-140.0.1/chrome-headless-shell"));

        let found = find_in_puppeteer_cache(&cache).unwrap();
        assert!(found.ends_with("chrome-headless-shell"));
    }

    #[test]
    fn puppeteer_cache_picks_latest_version() {
        let dir = TempDir::new().unwrap();
        let cache = dir.path().join("chrome");
        touch(&cache.join("linux-139.0.2/chrome-linux64/chrome"));
        touch(&cache.join("linux-140.0.1/chrome-linux64/chrome"));

        let found = find_in_puppeteer_cache(&cache).unwrap();
        assert!(found.to_string_lossy().contains("140.0.1"));
    }

    #[test]
    fn empty_puppeteer_cache_yields_none() {
        let dir = TempDir::new().unwrap();
        assert!(find_in_puppeteer_cache(&dir.path().join("missing")).is_none());
    }
}
