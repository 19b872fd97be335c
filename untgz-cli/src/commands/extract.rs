//! Extract command implementation.

use crate::utils::{create_base_dir, create_spinner, exit_code};
use std::path::Path;
use untgz_archive::{ExtractOptions, extract_path};

/// Extract `archive` and return the process exit code.
pub fn cmd_extract(
    archive: &Path,
    options: ExtractOptions,
    progress: bool,
) -> Result<i32, Box<dyn std::error::Error>> {
    create_base_dir(&options.destination)?;
    tracing::debug!(?options, archive = %archive.display(), "extract");

    let pb = create_spinner(progress);
    let outcome = {
        let mut sink = |line: &str| {
            if progress {
                pb.inc(1);
                pb.println(line);
            } else {
                println!("{}", line);
            }
        };
        extract_path(archive, &options, &mut sink)
    };
    pb.finish_and_clear();

    if outcome.is_success() {
        println!("extraction complete.");
    } else {
        eprintln!("{}", outcome.status_text());
    }
    Ok(exit_code(outcome.code()))
}
