//! untgz - extract tarballs
//!
//! Handles plain tar and tar wrapped in gzip, bzip2 or LZMA (`.lzma`).

mod commands;
mod utils;

use clap::{Args, Parser, Subcommand};
use commands::{cmd_detect, cmd_extract};
use std::path::PathBuf;
use untgz_archive::{CompressionMode, ExtractOptions, KeepPolicy, StripUnsafePrefix};

#[derive(Parser)]
#[command(name = "untgz")]
#[command(author, version, about = "Extract tar, tar.gz, tar.bz2 and tar.lzma archives")]
#[command(long_about = "
untgz extracts tar archives, optionally compressed with gzip, bzip2 or LZMA.
The compression is sniffed from the data unless -z names it.

Examples:
  untgz extract release.tar.gz
  untgz extract -d out -u sources.tbz
  untgz extract -I '*.txt' -X 'secret.txt' docs.tlz
  untgz extract-file installer.tgz setup.exe
  untgz detect mystery.bin
")]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract an archive
    #[command(alias = "x")]
    Extract {
        /// Archive file to extract
        archive: PathBuf,

        /// Drop directory components of entry paths
        #[arg(short, long)]
        junk_paths: bool,

        /// Keep existing files
        #[arg(short, long, conflicts_with = "update")]
        keep: bool,

        /// Replace existing files only when the archive entry is newer
        #[arg(short, long)]
        update: bool,

        /// Extract only entries matching a pattern
        #[arg(short = 'I', long)]
        include: Vec<String>,

        /// Skip entries matching a pattern
        #[arg(short = 'X', long)]
        exclude: Vec<String>,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Extract a single file, dropping its directory
    ExtractFile {
        /// Archive file to read
        archive: PathBuf,

        /// Name of the file to extract
        file: String,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Print the detected compression of a file
    Detect {
        /// File to inspect
        file: PathBuf,
    },
}

/// Options shared by the extracting subcommands.
#[derive(Args)]
struct CommonArgs {
    /// Base directory, created when missing
    #[arg(short = 'd', long, default_value = ".")]
    directory: PathBuf,

    /// Compression: auto, none, gz, bz2, lzma or Z
    #[arg(short = 'z', long, default_value = "auto")]
    compression: CompressionMode,

    /// Use entry paths as stored, including absolute and `../` paths
    #[arg(long)]
    unsafe_paths: bool,

    /// Show a spinner while extracting
    #[arg(short = 'P', long)]
    progress: bool,
}

fn main() {
    let cli = Cli::parse();
    utils::init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Extract {
            archive,
            junk_paths,
            keep,
            update,
            include,
            exclude,
            common,
        } => {
            let policy = if keep {
                KeepPolicy::SkipExisting
            } else if update {
                KeepPolicy::UpdateIfNewer
            } else {
                KeepPolicy::Overwrite
            };
            let options = common.options().junk_paths(junk_paths).keep(policy);
            let options = if include.is_empty() {
                options
            } else {
                options.include(include)
            };
            let options = if exclude.is_empty() {
                options
            } else {
                options.exclude(exclude)
            };
            cmd_extract(&archive, options, common.progress)
        }
        Commands::ExtractFile {
            archive,
            file,
            common,
        } => cmd_extract(&archive, common.options().single_file(file), common.progress),
        Commands::Detect { file } => cmd_detect(&file).map(|()| 0),
    };

    match result {
        Ok(0) => {}
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

impl CommonArgs {
    fn options(&self) -> ExtractOptions {
        let options = ExtractOptions::new()
            .destination(&self.directory)
            .compression(self.compression);
        if self.unsafe_paths {
            options
        } else {
            options.path_guard(StripUnsafePrefix)
        }
    }
}
