//! Include / exclude path filtering.
//!
//! Patterns are compared against the trailing components of an entry path:
//! a pattern with `n` separators sees only the last `n + 1` components of the
//! candidate. The matcher knows two specials:
//!
//! - `/` matches either `/` or `\`
//! - `*` skips at least one character, then stops at the first occurrence of
//!   the next pattern character; it never backtracks
//!
//! Every other byte matches itself. Because `*` does not backtrack, patterns
//! such as `*a.txt` fail on `banana.txt` where a shell glob would succeed.

use crate::tar::is_separator;

/// Suffix of `path` keeping at most `separators` separators, that is, the
/// last `separators + 1` components.
///
/// The first byte of `path` is never treated as a separator, so a rooted path
/// with fewer separators than requested is returned whole.
pub fn strip_to_components(path: &str, separators: usize) -> &str {
    let bytes = path.as_bytes();
    if bytes.is_empty() {
        return path;
    }

    let at = |i: usize| bytes.get(i).copied().unwrap_or(0);
    let mut pos = bytes.len();
    let mut remaining = separators as isize;
    loop {
        if is_separator(at(pos)) {
            remaining -= 1;
            if remaining < 0 {
                pos += 1;
            } else {
                pos -= 1;
            }
        } else {
            pos -= 1;
        }
        if remaining < 0 || pos == 0 {
            break;
        }
    }

    // Separators are ASCII, so `pos` is always a char boundary.
    &path[pos..]
}

/// Match `candidate` against a single pattern.
pub fn match_expr(candidate: &str, pattern: &str) -> bool {
    let s = candidate.as_bytes();
    let p = pattern.as_bytes();
    let at = |bytes: &[u8], i: usize| bytes.get(i).copied().unwrap_or(0);

    let mut si = 0;
    let mut pi = 0;
    loop {
        match at(p, pi) {
            b'/' => {
                if !is_separator(at(s, si)) {
                    return false;
                }
                si += 1;
                pi += 1;
            }
            b'*' => {
                pi += 1;
                // `*` must consume a character.
                if at(s, si) == 0 {
                    return false;
                }
                let stop = at(p, pi);
                loop {
                    si += 1;
                    let c = at(s, si);
                    if c == stop {
                        break;
                    }
                    if c == 0 {
                        return false;
                    }
                }
            }
            c => {
                if at(s, si) != c {
                    return false;
                }
                if c == 0 {
                    return true;
                }
                si += 1;
                pi += 1;
            }
        }
    }
}

/// Number of separators in `pattern`.
fn separator_count(pattern: &str) -> usize {
    pattern.bytes().filter(|&c| is_separator(c)).count()
}

/// Whether `path` matches any pattern in `patterns`.
///
/// An absent or empty list matches nothing. With `junk_paths` every pattern is
/// compared against the final component only.
pub fn match_name<S: AsRef<str>>(path: &str, patterns: Option<&[S]>, junk_paths: bool) -> bool {
    let Some(patterns) = patterns else {
        return false;
    };

    patterns.iter().any(|pattern| {
        let pattern = pattern.as_ref();
        let depth = if junk_paths {
            0
        } else {
            separator_count(pattern)
        };
        match_expr(strip_to_components(path, depth), pattern)
    })
}

/// Include / exclude selection for archive entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    /// Entries to extract; `None` selects everything.
    pub include: Option<Vec<String>>,
    /// Entries to skip.
    pub exclude: Option<Vec<String>>,
    /// Compare final components only.
    pub junk_paths: bool,
}

impl Selection {
    /// Whether the entry at `path` should be extracted.
    pub fn is_selected(&self, path: &str) -> bool {
        let included = match &self.include {
            None => true,
            Some(list) => match_name(path, Some(list.as_slice()), self.junk_paths),
        };
        included && !match_name(path, self.exclude.as_deref(), self.junk_paths)
    }
}
