//! Tracing subscriber setup
//!
//! Human-readable events go to stderr. When a log directory is given, the same
//! events are also appended as JSON lines to `tfvm.<date>.log` in that
//! directory. Files roll over daily and only the newest week is kept.

use std::fs;
use std::path::Path;

use anyhow::Context;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const LOG_FILE_PREFIX: &str = "tfvm";
const LOG_FILE_SUFFIX: &str = "log";
const MAX_LOG_FILES: usize = 7;

fn filter(verbose: bool) -> EnvFilter {
    let default = if verbose { "info,tfvm=debug" } else { "info" };
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default))
}

/// Install the global subscriber. `RUST_LOG` overrides the default levels.
pub fn init(log_dir: Option<&Path>, verbose: bool) -> anyhow::Result<()> {
    let console = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .with_filter(filter(verbose));

    let file = match log_dir {
        Some(dir) => {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            let appender = file_appender(dir)?;
            Some(
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(appender)
                    .with_filter(filter(verbose)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file)
        .try_init()
        .context("Failed to install tracing subscriber")?;
    Ok(())
}

/// Daily rolling JSON log. Blocking writer: no background thread or guard to
/// keep alive.
fn file_appender(dir: &Path) -> anyhow::Result<RollingFileAppender> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix(LOG_FILE_SUFFIX)
        .max_log_files(MAX_LOG_FILES)
        .build(dir)
        .with_context(|| format!("Failed to open log file in {}", dir.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn file_appender_writes_dated_log_file() {
        let temp_dir = TempDir::new().unwrap();

        let mut appender = file_appender(temp_dir.path()).unwrap();
        appender.write_all(b"{}\n").unwrap();
        appender.flush().unwrap();

        let names: Vec<String> = fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 1);
        assert!(names[0].starts_with("tfvm."), "unexpected log file {}", names[0]);
        assert!(names[0].ends_with(".log"), "unexpected log file {}", names[0]);
    }
}
