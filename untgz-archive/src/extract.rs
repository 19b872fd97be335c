//! The extraction driver.
//!
//! [`Extractor`] walks the archive one block at a time:
//!
//! ```text
//!            end marker
//! AwaitHeader ─────────────────────────────────────────────▶ Done
//!   │  ▲   ▲
//!   │  │   └──── directory / ignored entry / empty file
//!   │  │
//!   │  └──── last data block ──── InFileBody ◀── regular file with data
//!   │
//!   └── long name ──▶ AwaitShadowHeader ── next header uses the staged name
//! ```
//!
//! Any error ends the walk; files completed before it stay on disk.

use crate::backend::open_backend;
use crate::block::BlockReader;
use crate::filter::Selection;
use crate::fsutil::{make_dir_all, to_native_path};
use crate::options::{ExtractOptions, KeepPolicy};
use crate::sniff::{CompressionMode, sniff_stream};
use crate::tar::header::{ArchiveHeader, full_path, is_end_of_archive, verify_checksum};
use crate::tar::longname::{PendingLongName, read_long_name};
use crate::tar::{EntryKind, is_separator};
use filetime::FileTime;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use untgz_core::error::{Result, UntgzError};
use untgz_core::{BLOCK_SIZE, Backend, ExtractionOutcome, MessageSink};

/// Counts reported after a successful extraction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractStats {
    /// Files opened for writing.
    pub written: u64,
    /// Files left alone because of the keep policy.
    pub skipped: u64,
    /// Files not selected by the include / exclude lists.
    pub filtered: u64,
    /// Directory entries seen.
    pub directories: u64,
    /// Entries of a type that is not extracted.
    pub ignored: u64,
}

impl fmt::Display for ExtractStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} written, {} skipped, {} filtered, {} directories",
            self.written, self.skipped, self.filtered, self.directories
        )?;
        if self.ignored > 0 {
            write!(f, ", {} ignored", self.ignored)?;
        }
        Ok(())
    }
}

/// An output file being filled from entry data.
struct OutputFile {
    file: File,
    path: PathBuf,
    mtime: u64,
}

enum State {
    AwaitHeader,
    AwaitShadowHeader(PendingLongName),
    InFileBody {
        remaining: u64,
        output: Option<OutputFile>,
    },
    Done,
}

/// Drives one extraction over an initialised backend.
pub struct Extractor<'a, B: Backend> {
    reader: BlockReader<B>,
    options: &'a ExtractOptions,
    selection: Selection,
    sink: &'a mut dyn MessageSink,
    stats: ExtractStats,
}

impl<'a, B: Backend> Extractor<'a, B> {
    /// Prepare to extract from `backend`.
    pub fn new(backend: B, options: &'a ExtractOptions, sink: &'a mut dyn MessageSink) -> Self {
        Self {
            reader: BlockReader::new(backend),
            selection: options.selection(),
            options,
            sink,
            stats: ExtractStats::default(),
        }
    }

    /// Run until the end-of-archive marker or the first error.
    ///
    /// The backend is released on every exit path.
    pub fn run(mut self) -> Result<ExtractStats> {
        let mut state = State::AwaitHeader;
        loop {
            state = match state {
                State::AwaitHeader => self.next_header(None)?,
                State::AwaitShadowHeader(name) => self.next_header(Some(name))?,
                State::InFileBody { remaining, output } => self.next_data_block(remaining, output)?,
                State::Done => break,
            };
        }

        tracing::debug!(
            blocks = self.reader.blocks_read(),
            backend = self.reader.backend_name(),
            stats = %self.stats,
            "end of archive"
        );
        self.reader.release();
        Ok(self.stats)
    }

    fn next_header(&mut self, pending: Option<PendingLongName>) -> Result<State> {
        let block = *self.reader.read_block()?;

        if is_end_of_archive(&block) {
            return Ok(State::Done);
        }

        verify_checksum(&block)?;
        let header = ArchiveHeader::parse(&block);

        let path = match pending {
            None => full_path(&block),
            Some(name) => {
                self.message(format_args!("using GNU long filename [{}]", name.as_str()));
                name.into_string()
            }
        };

        tracing::debug!(
            path = path.as_str(),
            size = header.size,
            mtime = header.mtime,
            typeflag = %char::from(header.typeflag).escape_default(),
            "header"
        );

        match EntryKind::from_typeflag(header.typeflag) {
            EntryKind::Directory => self.directory(&path),
            EntryKind::Regular if path.bytes().last().is_some_and(is_separator) => {
                self.directory(&path)
            }
            EntryKind::Regular => self.begin_file(&header, &path),
            EntryKind::LongName => {
                let name = read_long_name(&mut self.reader, header.size)?;
                Ok(State::AwaitShadowHeader(name))
            }
            other => {
                self.stats.ignored += 1;
                self.message(format_args!("Ignoring {path} ({other:?} entry)"));
                Ok(Self::consume(header.size))
            }
        }
    }

    fn directory(&mut self, path: &str) -> Result<State> {
        self.stats.directories += 1;
        if !self.options.junk_paths {
            let path = self.options.path_guard.sanitize(path);
            make_dir_all(&self.options.destination, &path)?;
        }
        Ok(State::AwaitHeader)
    }

    fn begin_file(&mut self, header: &ArchiveHeader, path: &str) -> Result<State> {
        if !self.selection.is_selected(path) {
            self.stats.filtered += 1;
            self.message(format_args!("Filtered {path}"));
            return Ok(Self::consume(header.size));
        }

        let path = self.options.path_guard.sanitize(path);
        let split = path.rfind(['/', '\\']);
        let target = match split {
            Some(i) if self.options.junk_paths => &path[i + 1..],
            Some(i) => {
                make_dir_all(&self.options.destination, &path[..i])?;
                path.as_str()
            }
            None => path.as_str(),
        };

        if target.is_empty() {
            return Ok(Self::consume(header.size));
        }

        let output = self.open_output(target, header.mtime)?;
        if header.size == 0 {
            if let Some(output) = output {
                Self::finish(output);
            }
            return Ok(State::AwaitHeader);
        }

        Ok(State::InFileBody {
            remaining: header.size,
            output,
        })
    }

    /// Open the output for `target` under the keep policy. `None` means the
    /// entry is kept as it is on disk.
    fn open_output(&mut self, target: &str, mtime: u64) -> Result<Option<OutputFile>> {
        let native = self.options.destination.join(to_native_path(target));
        let keep = self.options.keep;

        let mut open = OpenOptions::new();
        open.write(true);
        if keep == KeepPolicy::Overwrite {
            open.create(true).truncate(true);
        } else {
            open.create_new(true);
        }

        let file = match open.open(&native) {
            Ok(file) => Some(file),
            Err(e) if keep != KeepPolicy::Overwrite && e.kind() == ErrorKind::AlreadyExists => {
                if keep == KeepPolicy::UpdateIfNewer && Self::archive_is_newer(&native, mtime)? {
                    let file = OpenOptions::new()
                        .write(true)
                        .create(true)
                        .truncate(true)
                        .open(&native)
                        .map_err(|e| UntgzError::file_open(&native, e))?;
                    Some(file)
                } else {
                    None
                }
            }
            Err(e) => return Err(UntgzError::file_open(native, e)),
        };

        match file {
            Some(file) => {
                self.stats.written += 1;
                self.message(format_args!("Writing {target}"));
                Ok(Some(OutputFile {
                    file,
                    path: native,
                    mtime,
                }))
            }
            None => {
                self.stats.skipped += 1;
                self.message(format_args!("Skipping {target}"));
                Ok(None)
            }
        }
    }

    fn archive_is_newer(existing: &Path, mtime: u64) -> Result<bool> {
        let metadata = fs::metadata(existing).map_err(|e| UntgzError::file_open(existing, e))?;
        let on_disk = FileTime::from_last_modification_time(&metadata);
        Ok(entry_time(mtime) > on_disk)
    }

    fn next_data_block(&mut self, remaining: u64, mut output: Option<OutputFile>) -> Result<State> {
        let block = self.reader.read_block()?;
        let len = remaining.min(BLOCK_SIZE as u64) as usize;

        let written = match output.as_mut() {
            Some(out) => out.file.write_all(&block[..len]),
            None => Ok(()),
        };
        if let Err(e) = written {
            if let Some(OutputFile { file, path, .. }) = output {
                drop(file);
                if let Err(remove) = fs::remove_file(&path) {
                    tracing::warn!(path = %path.display(), error = %remove, "could not remove partial file");
                }
                return Err(UntgzError::file_write(path, e));
            }
        }

        let remaining = remaining - len as u64;
        if remaining > 0 {
            return Ok(State::InFileBody { remaining, output });
        }
        if let Some(output) = output {
            Self::finish(output);
        }
        Ok(State::AwaitHeader)
    }

    /// Skip the data blocks of an entry that is not written.
    fn consume(size: u64) -> State {
        if size == 0 {
            State::AwaitHeader
        } else {
            State::InFileBody {
                remaining: size,
                output: None,
            }
        }
    }

    /// Apply the entry's modification time and close the file.
    fn finish(output: OutputFile) {
        let OutputFile { file, path, mtime } = output;
        if let Err(e) = filetime::set_file_handle_times(&file, None, Some(entry_time(mtime))) {
            tracing::warn!(path = %path.display(), error = %e, "could not set modification time");
        }
        drop(file);
    }

    fn message(&mut self, args: fmt::Arguments<'_>) {
        self.sink.message(&args.to_string());
    }
}

fn entry_time(mtime: u64) -> FileTime {
    FileTime::from_unix_time(i64::try_from(mtime).unwrap_or(i64::MAX), 0)
}

/// Extract an archive read from `stream`, returning the counts on success.
///
/// With [`CompressionMode::Auto`] the first block is sniffed from the stream
/// and replayed; `options.archive_name` feeds the extension rule.
pub fn extract_stream<R: Read>(
    stream: R,
    options: &ExtractOptions,
    sink: &mut dyn MessageSink,
) -> Result<ExtractStats> {
    run_extraction(stream, options, options.archive_name.as_deref(), sink)
}

fn run_extraction<R: Read>(
    stream: R,
    options: &ExtractOptions,
    name: Option<&str>,
    sink: &mut dyn MessageSink,
) -> Result<ExtractStats> {
    let backend = match options.compression {
        CompressionMode::Explicit(tag) => open_backend(tag, stream)?,
        CompressionMode::Auto => {
            let (tag, replay) = sniff_stream(stream, name);
            tracing::debug!(%tag, name, "compression sniffed");
            open_backend(tag, replay)?
        }
    };

    Extractor::new(backend, options, sink).run()
}

/// Extract an archive read from `stream`.
///
/// Errors are reported through `sink` and collapsed into the returned
/// outcome.
pub fn extract<R: Read>(
    stream: R,
    options: &ExtractOptions,
    sink: &mut dyn MessageSink,
) -> ExtractionOutcome {
    let result = extract_stream(stream, options, sink);
    report(&result, sink)
}

/// Open and extract the archive at `path`.
///
/// The file name is the sniffer's extension hint unless
/// `options.archive_name` is set.
pub fn extract_path(
    path: impl AsRef<Path>,
    options: &ExtractOptions,
    sink: &mut dyn MessageSink,
) -> ExtractionOutcome {
    let path = path.as_ref();
    let name = match &options.archive_name {
        Some(name) => name.clone(),
        None => path.to_string_lossy().into_owned(),
    };

    let result = File::open(path)
        .map_err(UntgzError::from)
        .and_then(|file| run_extraction(file, options, Some(&name), sink));
    report(&result, sink)
}

fn report(result: &Result<ExtractStats>, sink: &mut dyn MessageSink) -> ExtractionOutcome {
    match result {
        Ok(stats) => tracing::info!(%stats, "extraction complete"),
        Err(e) => {
            tracing::warn!(error = %e, "extraction failed");
            sink.message(&format!("Error: {e}"));
        }
    }
    ExtractionOutcome::from(result)
}
