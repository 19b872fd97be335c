//! Filesystem helpers: directory creation, path conversion and path-safety
//! hooks.

use crate::tar::is_separator;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use untgz_core::error::{Result, UntgzError};

/// Create `dir` and every missing parent.
///
/// `dir` is an archive-style path: both `/` and `\` separate components, and
/// one trailing separator is ignored. Directories that already exist are not
/// an error. An empty path does nothing.
pub fn make_dir_all(root: &Path, dir: &str) -> Result<()> {
    let dir = match dir.as_bytes().last() {
        Some(&c) if is_separator(c) => &dir[..dir.len() - 1],
        _ => dir,
    };
    if dir.is_empty() {
        return Ok(());
    }

    let full = root.join(to_native_path(dir));
    if fs::create_dir(&full).is_ok() {
        tracing::trace!(path = %full.display(), "created directory");
        return Ok(());
    }

    // Walk every prefix ending just before a separator, then the whole path.
    let ends = dir
        .bytes()
        .enumerate()
        .skip(1)
        .filter(|&(_, c)| is_separator(c))
        .map(|(i, _)| i)
        .chain(std::iter::once(dir.len()));

    for end in ends {
        let partial = root.join(to_native_path(&dir[..end]));
        match fs::create_dir(&partial) {
            Ok(()) => tracing::trace!(path = %partial.display(), "created directory"),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {}
            Err(e) => return Err(UntgzError::directory_create(partial, e)),
        }
    }
    Ok(())
}

/// Convert an archive path into a relative native path.
///
/// Splits on both separators and drops empty components, so repeated or
/// leading separators collapse.
pub fn to_native_path(archive_path: &str) -> PathBuf {
    archive_path
        .split(['/', '\\'])
        .filter(|component| !component.is_empty())
        .collect()
}

/// Hook applied to every entry path before it touches the filesystem.
pub trait PathGuard {
    /// Return the path to use for `path`. May only shorten it.
    fn sanitize(&self, path: &str) -> String;
}

impl<F: Fn(&str) -> String> PathGuard for F {
    fn sanitize(&self, path: &str) -> String {
        self(path)
    }
}

/// Uses archive paths unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct TrustingGuard;

impl PathGuard for TrustingGuard {
    fn sanitize(&self, path: &str) -> String {
        path.to_string()
    }
}

/// Removes one leading root separator, then any leading `../` or `..\`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StripUnsafePrefix;

impl PathGuard for StripUnsafePrefix {
    fn sanitize(&self, path: &str) -> String {
        let mut rest = path;
        if rest.as_bytes().first().is_some_and(|&c| is_separator(c)) {
            rest = &rest[1..];
        }
        while let [b'.', b'.', sep, ..] = rest.as_bytes() {
            if !is_separator(*sep) {
                break;
            }
            rest = &rest[3..];
        }
        if rest.len() != path.len() {
            tracing::debug!(original = path, sanitized = rest, "stripped unsafe path prefix");
        }
        rest.to_string()
    }
}
