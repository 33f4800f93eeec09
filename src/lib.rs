//! # mermaid-svg-sync
//!
//! A CLI tool that keeps rendered `.svg` files in sync with their
//! [Mermaid](https://mermaid.js.org) `.mmd` sources.
//!
//! ## What it does
//!
//! The tool recursively scans a directory tree for `.mmd` files and compares
//! each one against its sibling `.svg` by modification time. Any source that
//! is missing a render, or is newer than its render, is handed to
//! [mermaid-cli](https://github.com/mermaid-js/mermaid-cli) (`mmdc`) for
//! regeneration. Everything else is skipped, so a run over an up-to-date tree
//! is free.
//!
//! Rendering itself is fully delegated to `mmdc`; this tool only decides what
//! to render. `mmdc` and a usable Chrome/Chromium (system install or
//! puppeteer's cache) are located once at startup, and the run aborts with
//! install instructions if no renderer can be found.
//!
//! ## Usage
//!
//! ```sh
//! # Sync every diagram under the current directory
//! mermaid-svg-sync
//!
//! # Preview what a run over ./docs would do
//! mermaid-svg-sync docs --dry-run
//! ```
//!
//! The tool is cheap enough to wire into an editor save hook (e.g. VS Code's
//! "Run on Save") so diagrams re-render as you edit them. A single failed
//! render never aborts the pass; failures are reported at the end and turn
//! the exit code non-zero.
//!
//! Preferences can be persisted in `~/.config/mermaid-svg-sync/config.toml`.
