//! Detect command implementation.

use std::path::Path;
use untgz_archive::sniff_path;

pub fn cmd_detect(file: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if !file.is_file() {
        return Err(format!("{} is not a readable file", file.display()).into());
    }

    let tag = sniff_path(file);
    println!("File: {}", file.display());
    println!("Compression: {}", tag);
    println!("Extension: .{}", tag.extension());
    println!("Code: {}", tag.code());
    Ok(())
}
