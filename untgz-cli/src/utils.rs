//! Utility functions for the CLI.

use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use untgz_archive::make_dir_all;

/// Install the log subscriber. `RUST_LOG` wins over `-v`.
pub fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "untgz_cli=debug,untgz_archive=debug,untgz_lzma=debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose > 1)
        .init();
}

/// Create a spinner with standard styling, hidden unless `enable`.
pub fn create_spinner(enable: bool) -> ProgressBar {
    if !enable {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .template("{spinner:.cyan} [{elapsed_precise}] {pos} entries {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Create the base directory `dir` and its missing parents.
///
/// The root (and drive prefix) of an absolute path is kept aside so the
/// archive-style directory primitive only sees relative components.
pub fn create_base_dir(dir: &Path) -> untgz_core::Result<()> {
    let mut root = PathBuf::new();
    let mut rest = Vec::new();
    for component in dir.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => root.push(component),
            other => rest.push(other.as_os_str().to_string_lossy().into_owned()),
        }
    }
    make_dir_all(&root, &rest.join("/"))
}

/// Process exit code for an extraction outcome code (0, -1, -2).
pub fn exit_code(outcome_code: i32) -> i32 {
    outcome_code.saturating_abs()
}
