use std::{collections::HashSet, path::Path};

/// Extensions refused by default: secrets, backups and database files that tend to end up in a
/// content directory by accident.
pub const DEFAULT_BLOCKED_EXTENSIONS: &[&str] =
    &["env", "pem", "key", "crt", "bak", "swp", "sql", "sqlite", "log"];

/// Decides whether a resolved file may be served.
///
/// The response engine only queries this as a pair of predicates. A refused extension results in
/// 403, a refused size in 413.
pub trait AccessPolicy: Send + Sync {
    /// Whether a file with this path may be served, judged by its extension.
    fn allows_extension(&self, path: &Path) -> bool;

    /// Whether a file of this size in bytes may be served.
    fn allows_size(&self, size: u64) -> bool;
}

/// Policy that allows everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct AllowAll;

impl AccessPolicy for AllowAll {
    fn allows_extension(&self, _path: &Path) -> bool {
        true
    }

    fn allows_size(&self, _size: u64) -> bool {
        true
    }
}

/// Policy built from an extension blocklist and an optional size limit.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExtensionSizePolicy {
    blocked_extensions: HashSet<String>,
    max_file_size: Option<u64>,
}

impl ExtensionSizePolicy {
    /// Create a policy. Extensions are compared case-insensitively, with or without a leading dot.
    pub fn new<I, S>(blocked_extensions: I, max_file_size: Option<u64>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let blocked_extensions = blocked_extensions
            .into_iter()
            .map(|ext| ext.as_ref().trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();
        Self {
            blocked_extensions,
            max_file_size,
        }
    }

    /// The configured size limit, if any.
    pub fn max_file_size(&self) -> Option<u64> {
        self.max_file_size
    }
}

/// The extension the blocklist is matched against. A dotfile such as `.env` counts as having
/// the extension `env`, which `Path::extension` does not report.
fn blockable_extension(path: &Path) -> Option<&str> {
    path.extension().and_then(|ext| ext.to_str()).or_else(|| {
        path.file_name()
            .and_then(|name| name.to_str())
            .and_then(|name| name.strip_prefix('.'))
            .filter(|ext| !ext.is_empty())
    })
}

impl AccessPolicy for ExtensionSizePolicy {
    fn allows_extension(&self, path: &Path) -> bool {
        match blockable_extension(path) {
            Some(ext) => !self.blocked_extensions.contains(&ext.to_ascii_lowercase()),
            None => true,
        }
    }

    fn allows_size(&self, size: u64) -> bool {
        self.max_file_size.map_or(true, |max| size <= max)
    }
}
