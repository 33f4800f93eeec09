//! Invocation of the external renderer.

use crate::engine::RenderEngine;
use crossbeam_channel::bounded;
use eyre::{Context, Result, eyre};
use std::io::Read;
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Maximum stderr lines quoted in a render error.
const MAX_STDERR_LINES: usize = 3;

/// Render `source` to `output` by spawning `mmdc -i <source> -o <output>`.
///
/// Blocks until the subprocess exits or `timeout` elapses; on timeout the
/// child is killed. A non-zero exit becomes an error carrying the leading
/// lines of the child's stderr. The scan is expected to keep going after a
/// failure, so nothing here is fatal to the process.
pub fn render(
    engine: &RenderEngine,
    source: &Path,
    output: &Path,
    timeout: Option<Duration>,
) -> Result<()> {
    let mut command = Command::new(&engine.mmdc);
    command
        .arg("-i")
        .arg(source)
        .arg("-o")
        .arg(output)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped());
    if let Some(chrome) = &engine.chrome {
        // Point puppeteer at the detected browser instead of letting it
        // download its own.
        command.env("PUPPETEER_EXECUTABLE_PATH", chrome);
        command.env("CHROME_PATH", chrome);
    }

    let mut child = command
        .spawn()
        .wrap_err_with(|| format!("Failed to launch {}", engine.mmdc.display()))?;

    // Drain stderr on its own thread so a chatty child cannot fill the pipe
    // and stall while we poll for exit.
    let stderr_pipe = child.stderr.take();
    let (tx, rx) = bounded::<Vec<u8>>(1);
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = stderr_pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        let _ = tx.send(buf);
    });

    let status = match timeout {
        None => child.wait().wrap_err("Failed to wait for renderer")?,
        Some(limit) => match wait_with_deadline(&mut child, limit)? {
            Some(status) => status,
            None => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(eyre!(
                    "mmdc timed out after {}s rendering {}",
                    limit.as_secs(),
                    source.display()
                ));
            }
        },
    };

    if status.success() {
        return Ok(());
    }

    // The child has exited, so the pipe is closed and the reader finishes
    // promptly.
    let stderr = rx.recv_timeout(Duration::from_secs(1)).unwrap_or_default();
    Err(eyre!(
        "mmdc exited with {}: {}",
        status,
        truncate_stderr(&String::from_utf8_lossy(&stderr))
    ))
}

/// Poll for child exit until the deadline. `None` means the deadline passed
/// with the child still running.
fn wait_with_deadline(child: &mut std::process::Child, limit: Duration) -> Result<Option<ExitStatus>> {
    let deadline = Instant::now() + limit;
    loop {
        if let Some(status) = child.try_wait().wrap_err("Failed to poll renderer")? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}

/// First few non-empty stderr lines, with a count of what was elided.
fn truncate_stderr(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.lines().filter(|l| !l.trim().is_empty()).collect();
    if lines.is_empty() {
        return "(no stderr output)".to_string();
    }
    let mut shown = lines[..lines.len().min(MAX_STDERR_LINES)].join(" | ");
    if lines.len() > MAX_STDERR_LINES {
        shown.push_str(&format!(" (... {} more lines)", lines.len() - MAX_STDERR_LINES));
    }
    shown
}

/// Heuristic for the most common failure mode: mmdc found no usable browser.
/// Used to append an install hint to the final error report.
pub fn looks_like_chrome_error(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("chrome") || lower.contains("chromium") || lower.contains("puppeteer")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_keeps_leading_lines() {
        let out = truncate_stderr("one\ntwo\nthree\nfour\nfive\n");
        assert_eq!(out, "one | two | three (... 2 more lines)");
    }

    #[test]
    fn truncate_handles_empty_stderr() {
        assert_eq!(truncate_stderr("\n  \n"), "(no stderr output)");
    }

    #[test]
    fn chrome_errors_are_recognized() {
        assert!(looks_like_chrome_error("Could not find Chrome (ver. 120)"));
        assert!(looks_like_chrome_error("Error: puppeteer launch failed"));
        assert!(!looks_like_chrome_error("syntax error in diagram"));
    }

    #[cfg(unix)]
    mod unix {
        use super::super::*;
        use std::fs;
        use std::os::unix::fs::PermissionsExt;
        use std::path::PathBuf;
        use tempfile::TempDir;

        fn fake_engine(dir: &Path, script: &str) -> RenderEngine {
            let path = dir.join("mmdc");
            fs::write(&path, script).unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
            RenderEngine {
                mmdc: path,
                chrome: None,
            }
        }

        fn diagram(dir: &Path) -> PathBuf {
            let source = dir.join("diagram.mmd");
            fs::write(&source, "graph TD; A-->B;\n").unwrap();
            source
        }

        #[test]
        fn successful_render_writes_output() {
            let dir = TempDir::new().unwrap();
            let engine = fake_engine(dir.path(), "#!/bin/sh\ncp \"$2\" \"$4\"\n");
            let source = diagram(dir.path());
            let output = dir.path().join("diagram.svg");

            render(&engine, &source, &output, None).unwrap();
            assert!(output.exists());
        }

        #[test]
        fn failing_render_surfaces_stderr() {
            let dir = TempDir::new().unwrap();
            let engine = fake_engine(dir.path(), "#!/bin/sh\necho 'boom' >&2\nexit 3\n");
            let source = diagram(dir.path());
            let output = dir.path().join("diagram.svg");

            let err = render(&engine, &source, &output, None).unwrap_err();
            let message = format!("{err:#}");
            assert!(message.contains("boom"), "unexpected error: {message}");
            assert!(!output.exists());
        }

        #[test]
        fn hung_render_is_killed_at_the_deadline() {
            let dir = TempDir::new().unwrap();
            let engine = fake_engine(dir.path(), "#!/bin/sh\nsleep 10\n");
            let source = diagram(dir.path());
            let output = dir.path().join("diagram.svg");

            let start = Instant::now();
            let err = render(&engine, &source, &output, Some(Duration::from_millis(200)))
                .unwrap_err();
            assert!(err.to_string().contains("timed out"));
            assert!(start.elapsed() < Duration::from_secs(5));
        }

        #[test]
        fn missing_executable_fails_to_launch() {
            let dir = TempDir::new().unwrap();
            let engine = RenderEngine {
                mmdc: dir.path().join("no-such-mmdc"),
                chrome: None,
            };
            let source = diagram(dir.path());
            let output = dir.path().join("diagram.svg");

            let err = render(&engine, &source, &output, None).unwrap_err();
            assert!(err.to_string().contains("Failed to launch"));
        }
    }
}
