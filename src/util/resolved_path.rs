use std::path::{Path, PathBuf};

use crate::config::ContentRoot;

#[inline]
fn decode_percents(string: &str) -> String {
    percent_encoding::percent_decode_str(string)
        .decode_utf8_lossy()
        .into_owned()
}

#[inline]
fn is_separator(c: char) -> bool {
    c == '/' || c == '\\'
}

/// The request path tried to leave the content root.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PathRejected;

/// A request path mapped onto the content root.
///
/// Construction is purely lexical; nothing here touches the filesystem.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedPath {
    /// Normalized path relative to the content root. Empty for the root itself.
    pub relative: PathBuf,
    /// The content root joined with `relative`.
    pub absolute: PathBuf,
}

impl ResolvedPath {
    /// Resolve the request path against the root.
    ///
    /// The path is percent-decoded once, then split on both `/` and `\`. Empty and `.` segments
    /// are dropped and `..` removes the preceding segment. The path is rejected if a `..` would
    /// climb above the root, if the decoded path is itself absolute (`//etc/passwd`), or if a
    /// segment contains a drive or stream separator (`:`) or a NUL byte.
    pub fn resolve(root: &ContentRoot, request_path: &str) -> Result<Self, PathRejected> {
        let decoded = decode_percents(request_path);
        let rest = decoded.strip_prefix('/').unwrap_or(&decoded);
        if rest.starts_with(is_separator) {
            return Err(PathRejected);
        }

        let mut segments: Vec<&str> = Vec::new();
        for segment in rest.split(is_separator) {
            match segment {
                "" | "." => {}
                ".." => {
                    if segments.pop().is_none() {
                        return Err(PathRejected);
                    }
                }
                s if s.contains(|c: char| c == ':' || c == '\0') => return Err(PathRejected),
                s => segments.push(s),
            }
        }

        let relative: PathBuf = segments.iter().collect();
        let absolute = root.path().join(&relative);

        // `Path::starts_with` compares whole components, so this holds for the root itself and
        // for anything below `root/`, but not for a sibling like `root-other`.
        if !absolute.starts_with(root.path()) {
            return Err(PathRejected);
        }

        Ok(Self { relative, absolute })
    }

    /// Whether this is the content root itself.
    pub fn is_root(&self) -> bool {
        self.relative.as_os_str().is_empty()
    }

    /// The absolute path.
    pub fn as_path(&self) -> &Path {
        &self.absolute
    }
}
