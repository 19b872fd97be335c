//! Extraction settings.

use crate::filter::Selection;
use crate::fsutil::{PathGuard, TrustingGuard};
use crate::sniff::CompressionMode;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// What to do when an output file already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum KeepPolicy {
    /// Replace existing files.
    #[default]
    Overwrite = 0,
    /// Leave existing files alone.
    SkipExisting = 1,
    /// Replace existing files only when the archive entry is newer.
    UpdateIfNewer = 2,
}

impl KeepPolicy {
    /// Numeric code of this policy.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Parse a numeric code.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Overwrite),
            1 => Some(Self::SkipExisting),
            2 => Some(Self::UpdateIfNewer),
            _ => None,
        }
    }
}

impl fmt::Display for KeepPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Overwrite => "overwrite",
            Self::SkipExisting => "keep",
            Self::UpdateIfNewer => "update",
        })
    }
}

/// Error for an unrecognised keep policy name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseKeepPolicyError(String);

impl fmt::Display for ParseKeepPolicyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown keep policy '{}' (expected overwrite, keep or update)",
            self.0
        )
    }
}

impl std::error::Error for ParseKeepPolicyError {}

impl FromStr for KeepPolicy {
    type Err = ParseKeepPolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "overwrite" => Ok(Self::Overwrite),
            "keep" | "skip" | "skip-existing" => Ok(Self::SkipExisting),
            "update" | "update-if-newer" => Ok(Self::UpdateIfNewer),
            _ => Err(ParseKeepPolicyError(s.to_string())),
        }
    }
}

/// Settings for one extraction call.
pub struct ExtractOptions {
    /// Directory entries are extracted into.
    pub destination: PathBuf,
    /// Backend selection.
    pub compression: CompressionMode,
    /// Discard directory components of entry paths.
    pub junk_paths: bool,
    /// Conflict policy for existing files.
    pub keep: KeepPolicy,
    /// Entries to extract; `None` extracts everything.
    pub include: Option<Vec<String>>,
    /// Entries to skip.
    pub exclude: Option<Vec<String>>,
    /// Archive file name, used by the sniffer's extension rule.
    pub archive_name: Option<String>,
    /// Hook applied to entry paths before any filesystem use.
    pub path_guard: Box<dyn PathGuard>,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            destination: PathBuf::from("."),
            compression: CompressionMode::Auto,
            junk_paths: false,
            keep: KeepPolicy::Overwrite,
            include: None,
            exclude: None,
            archive_name: None,
            path_guard: Box::new(TrustingGuard),
        }
    }
}

impl fmt::Debug for ExtractOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractOptions")
            .field("destination", &self.destination)
            .field("compression", &self.compression)
            .field("junk_paths", &self.junk_paths)
            .field("keep", &self.keep)
            .field("include", &self.include)
            .field("exclude", &self.exclude)
            .field("archive_name", &self.archive_name)
            .finish_non_exhaustive()
    }
}

impl ExtractOptions {
    /// Default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the destination directory.
    pub fn destination(mut self, dir: impl AsRef<Path>) -> Self {
        self.destination = dir.as_ref().to_path_buf();
        self
    }

    /// Set the compression mode.
    pub fn compression(mut self, mode: impl Into<CompressionMode>) -> Self {
        self.compression = mode.into();
        self
    }

    /// Enable or disable junk paths.
    pub fn junk_paths(mut self, junk: bool) -> Self {
        self.junk_paths = junk;
        self
    }

    /// Set the keep policy.
    pub fn keep(mut self, keep: KeepPolicy) -> Self {
        self.keep = keep;
        self
    }

    /// Only extract entries matching one of `patterns`.
    pub fn include<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include = Some(patterns.into_iter().map(Into::into).collect());
        self
    }

    /// Skip entries matching one of `patterns`.
    pub fn exclude<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude = Some(patterns.into_iter().map(Into::into).collect());
        self
    }

    /// Name the archive for the sniffer.
    pub fn archive_name(mut self, name: impl Into<String>) -> Self {
        self.archive_name = Some(name.into());
        self
    }

    /// Install a path-safety hook.
    pub fn path_guard(mut self, guard: impl PathGuard + 'static) -> Self {
        self.path_guard = Box::new(guard);
        self
    }

    /// Extract only the entry whose final component is `name`.
    ///
    /// Turns on junk paths and replaces the include list.
    pub fn single_file(self, name: impl Into<String>) -> Self {
        self.junk_paths(true).include([name.into()])
    }

    /// Include / exclude selection derived from these options.
    pub fn selection(&self) -> Selection {
        Selection {
            include: self.include.clone(),
            exclude: self.exclude.clone(),
            junk_paths: self.junk_paths,
        }
    }
}
