//! Path handling for the virtual filesystem.
//!
//! All paths are absolute, `/`-separated strings. Normalization collapses
//! repeated separators and strips a single trailing separator; it never
//! resolves `.` or `..` because callers hand the facade already-resolved
//! paths. Prefix matching is exact-segment, so a grant on `/Users` covers
//! `/Users/default` but never `/Users2`.

use crate::error::{Error, Result};

pub const SEPARATOR: char = '/';

/// Normalize a path into its canonical absolute form.
///
/// Rejects empty input, relative paths, embedded NUL, and `.`/`..`
/// segments with `EINVAL`.
pub fn normalize(path: &str) -> Result<String> {
    if path.is_empty() {
        return Err(Error::invalid_path("empty path"));
    }
    if !path.starts_with(SEPARATOR) {
        return Err(Error::invalid_path(format!("not absolute: {}", path)));
    }
    if path.contains('\0') {
        return Err(Error::invalid_path("path contains NUL"));
    }

    let mut out = String::with_capacity(path.len());
    for segment in path.split(SEPARATOR) {
        match segment {
            // Repeated separators and the leading/trailing empties collapse away.
            "" => continue,
            "." | ".." => {
                return Err(Error::invalid_path(format!(
                    "relative segment '{}' in {}",
                    segment, path
                )));
            }
            s => {
                out.push(SEPARATOR);
                out.push_str(s);
            }
        }
    }

    if out.is_empty() {
        Ok(String::from("/"))
    } else {
        Ok(out)
    }
}

/// The ordered path components of a normalized path. Root has none.
pub fn segments(path: &str) -> Vec<&str> {
    path.split(SEPARATOR).filter(|s| !s.is_empty()).collect()
}

/// Exact-segment prefix match: true iff `path` equals `prefix` or starts
/// with `prefix` followed by a separator.
pub fn is_prefix_of(prefix: &str, path: &str) -> bool {
    if prefix == "/" {
        return path.starts_with(SEPARATOR);
    }
    path == prefix
        || (path.len() > prefix.len()
            && path.starts_with(prefix)
            && path.as_bytes()[prefix.len()] == b'/')
}

/// The parent of a normalized path, or `None` for root.
pub fn parent_of(path: &str) -> Option<&str> {
    if path == "/" {
        return None;
    }
    match path.rfind(SEPARATOR) {
        Some(0) => Some("/"),
        Some(pos) => Some(&path[..pos]),
        None => None,
    }
}

/// The final component of a normalized path, or `None` for root.
pub fn basename(path: &str) -> Option<&str> {
    if path == "/" {
        return None;
    }
    path.rfind(SEPARATOR).map(|pos| &path[pos + 1..])
}

/// Join a single name onto a normalized directory path.
pub fn join(base: &str, name: &str) -> String {
    if base == "/" {
        format!("/{}", name)
    } else {
        format!("{}/{}", base, name)
    }
}
