use std::{collections::HashSet, fmt, path::Path};

/// The `Cache-Control` value sent with every response that is not file content.
pub const NO_CACHE: &str = "no-cache, no-store, must-revalidate";

/// A classification of a file, by extension, that determines its cache lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CacheCategory {
    /// Fingerprinted build output: scripts, stylesheets, fonts and images.
    StaticAsset,
    /// Audio and video, typically requested in ranges.
    Media,
    /// Downloadable documents and archives.
    Document,
    /// Markup and plain text that changes between deploys.
    Text,
    /// Anything not matched by the other categories.
    Default,
}

impl CacheCategory {
    /// Every category, in classification order.
    pub const ALL: [CacheCategory; 5] = [
        CacheCategory::StaticAsset,
        CacheCategory::Media,
        CacheCategory::Document,
        CacheCategory::Text,
        CacheCategory::Default,
    ];

    /// Short lowercase name, as used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            CacheCategory::StaticAsset => "static-asset",
            CacheCategory::Media => "media",
            CacheCategory::Document => "document",
            CacheCategory::Text => "text",
            CacheCategory::Default => "default",
        }
    }
}

impl fmt::Display for CacheCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const STATIC_ASSET_EXTENSIONS: &[&str] = &[
    "css", "js", "mjs", "map", "wasm", "woff", "woff2", "ttf", "otf", "eot", "png", "jpg", "jpeg",
    "gif", "webp", "avif", "svg", "ico", "bmp",
];

const MEDIA_EXTENSIONS: &[&str] = &[
    "mp3", "mp4", "m4a", "m4v", "webm", "ogg", "oga", "ogv", "opus", "wav", "flac", "aac", "mov",
    "mkv", "avi",
];

const DOCUMENT_EXTENSIONS: &[&str] = &[
    "pdf", "epub", "zip", "tar", "gz", "tgz", "bz2", "xz", "7z", "doc", "docx", "xls", "xlsx",
    "ppt", "pptx", "odt", "ods", "odp",
];

const TEXT_EXTENSIONS: &[&str] = &[
    "html", "htm", "txt", "md", "json", "xml", "csv", "tsv", "yaml", "yml", "toml",
];

/// Time-to-live, in seconds, for each cache category.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CacheTtls {
    /// TTL for `CacheCategory::StaticAsset`.
    pub static_asset: u64,
    /// TTL for `CacheCategory::Media`.
    pub media: u64,
    /// TTL for `CacheCategory::Document`.
    pub document: u64,
    /// TTL for `CacheCategory::Text`.
    pub text: u64,
    /// TTL for `CacheCategory::Default`.
    pub default: u64,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            static_asset: 31_536_000,
            media: 2_592_000,
            document: 604_800,
            text: 86_400,
            default: 3_600,
        }
    }
}

impl CacheTtls {
    /// The TTL for the given category.
    pub fn ttl(&self, category: CacheCategory) -> u64 {
        match category {
            CacheCategory::StaticAsset => self.static_asset,
            CacheCategory::Media => self.media,
            CacheCategory::Document => self.document,
            CacheCategory::Text => self.text,
            CacheCategory::Default => self.default,
        }
    }

    /// The cache directive for the given category.
    pub fn directive(&self, category: CacheCategory) -> CacheDirective {
        CacheDirective::new(self.ttl(category))
    }
}

/// A rendered `Cache-Control` value for file content.
///
/// Renders as `max-age=<ttl>, immutable, stale-while-revalidate=<ttl * 0.1>`. The stale window
/// is computed in exact tenths of a second, so `ttl = 7` renders `stale-while-revalidate=0.7`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CacheDirective {
    ttl: u64,
}

impl CacheDirective {
    /// Create a directive for the given TTL in seconds.
    pub fn new(ttl: u64) -> Self {
        Self { ttl }
    }

    /// The TTL in seconds.
    pub fn ttl(&self) -> u64 {
        self.ttl
    }
}

impl fmt::Display for CacheDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (whole, tenths) = (self.ttl / 10, self.ttl % 10);
        write!(f, "max-age={}, immutable, stale-while-revalidate={}", self.ttl, whole)?;
        if tenths != 0 {
            write!(f, ".{}", tenths)?;
        }
        Ok(())
    }
}

/// A set of lowercase extensions that all map to one category.
#[derive(Clone, Debug)]
pub struct ExtensionSet {
    category: CacheCategory,
    extensions: HashSet<&'static str>,
}

impl ExtensionSet {
    fn new(category: CacheCategory, extensions: &[&'static str]) -> Self {
        Self {
            category,
            extensions: extensions.iter().copied().collect(),
        }
    }

    /// The category this set maps to.
    pub fn category(&self) -> CacheCategory {
        self.category
    }

    /// Whether the (already lowercased) extension is in this set.
    pub fn contains(&self, extension: &str) -> bool {
        self.extensions.contains(extension)
    }

    /// Iterate the extensions in this set.
    pub fn iter(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.extensions.iter().copied()
    }
}

/// Maps file names to cache categories.
///
/// The extension sets are built once and are pairwise disjoint, so the order in which they are
/// checked does not affect the result. Classification never fails: files without a known
/// extension are `CacheCategory::Default`.
#[derive(Clone, Debug)]
pub struct Classifier {
    sets: [ExtensionSet; 4],
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Classifier {
    /// Build the classifier with the built-in extension sets.
    pub fn new() -> Self {
        Self {
            sets: [
                ExtensionSet::new(CacheCategory::StaticAsset, STATIC_ASSET_EXTENSIONS),
                ExtensionSet::new(CacheCategory::Media, MEDIA_EXTENSIONS),
                ExtensionSet::new(CacheCategory::Document, DOCUMENT_EXTENSIONS),
                ExtensionSet::new(CacheCategory::Text, TEXT_EXTENSIONS),
            ],
        }
    }

    /// The extension sets, in the order they are checked.
    pub fn sets(&self) -> &[ExtensionSet] {
        &self.sets
    }

    /// Classify a file by the extension of its name.
    pub fn classify(&self, filename: impl AsRef<Path>) -> CacheCategory {
        let extension = match filename.as_ref().extension().and_then(|ext| ext.to_str()) {
            Some(ext) => ext.to_ascii_lowercase(),
            None => return CacheCategory::Default,
        };
        self.sets
            .iter()
            .find(|set| set.contains(&extension))
            .map_or(CacheCategory::Default, ExtensionSet::category)
    }
}
