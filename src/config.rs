use std::{
    io::Error as IoError,
    net::SocketAddr,
    path::{Path, PathBuf},
};

use clap::Parser;
use thiserror::Error;

use crate::{
    cache::CacheTtls,
    policy::{ExtensionSizePolicy, DEFAULT_BLOCKED_EXTENSIONS},
};

/// Startup configuration errors. These are fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The content root could not be inspected.
    #[error("content root {} is not accessible: {source}", .path.display())]
    RootInaccessible {
        /// The configured path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: IoError,
    },

    /// The content root exists but is not a directory.
    #[error("content root {} is not a directory", .0.display())]
    RootNotDirectory(PathBuf),

    /// A path was expected to be absolute.
    #[error("content root {} is not an absolute path", .0.display())]
    RootNotAbsolute(PathBuf),
}

/// The absolute directory that every served file must resolve beneath.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContentRoot {
    path: PathBuf,
}

impl ContentRoot {
    /// Canonicalize and validate a directory to serve from.
    ///
    /// Fails if the path is missing or is not a directory.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let canonical = std::fs::canonicalize(path).map_err(|source| {
            ConfigError::RootInaccessible {
                path: path.to_path_buf(),
                source,
            }
        })?;
        if !canonical.is_dir() {
            return Err(ConfigError::RootNotDirectory(canonical));
        }
        Ok(Self { path: canonical })
    }

    /// Use an absolute path as-is, without touching the filesystem.
    pub fn from_absolute(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        if !path.is_absolute() {
            return Err(ConfigError::RootNotAbsolute(path));
        }
        Ok(Self { path })
    }

    /// The root directory.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Command line and environment arguments.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "CDN-friendly static file server", long_about = None)]
pub struct Args {
    /// Directory to serve files from
    #[arg(long, env = "CONTENT_ROOT", default_value = "./public")]
    pub content_root: PathBuf,

    /// Address to listen on
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:8080")]
    pub bind_addr: SocketAddr,

    /// Cache TTL in seconds for scripts, stylesheets, fonts and images
    #[arg(long, env = "CACHE_TTL_STATIC_ASSET", default_value_t = 31_536_000)]
    pub ttl_static_asset: u64,

    /// Cache TTL in seconds for audio and video
    #[arg(long, env = "CACHE_TTL_MEDIA", default_value_t = 2_592_000)]
    pub ttl_media: u64,

    /// Cache TTL in seconds for documents and archives
    #[arg(long, env = "CACHE_TTL_DOCUMENT", default_value_t = 604_800)]
    pub ttl_document: u64,

    /// Cache TTL in seconds for markup and text
    #[arg(long, env = "CACHE_TTL_TEXT", default_value_t = 86_400)]
    pub ttl_text: u64,

    /// Cache TTL in seconds for everything else
    #[arg(long, env = "CACHE_TTL_DEFAULT", default_value_t = 3_600)]
    pub ttl_default: u64,

    /// Comma separated file extensions that are never served
    #[arg(
        long,
        env = "BLOCKED_EXTENSIONS",
        value_delimiter = ',',
        default_values_t = DEFAULT_BLOCKED_EXTENSIONS.iter().map(|ext| ext.to_string()).collect::<Vec<_>>()
    )]
    pub blocked_extensions: Vec<String>,

    /// Largest file size in bytes that is served (unlimited if unset)
    #[arg(long, env = "MAX_FILE_SIZE")]
    pub max_file_size: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    pub log_json: bool,
}

/// Validated, immutable server configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// Directory to serve files from.
    pub root: ContentRoot,
    /// Address to listen on.
    pub bind_addr: SocketAddr,
    /// Per-category cache lifetimes.
    pub cache_ttls: CacheTtls,
    /// Extension and size restrictions.
    pub policy: ExtensionSizePolicy,
}

impl Config {
    /// Validate arguments into a configuration.
    pub fn from_args(args: &Args) -> Result<Self, ConfigError> {
        Ok(Self {
            root: ContentRoot::new(&args.content_root)?,
            bind_addr: args.bind_addr,
            cache_ttls: CacheTtls {
                static_asset: args.ttl_static_asset,
                media: args.ttl_media,
                document: args.ttl_document,
                text: args.ttl_text,
                default: args.ttl_default,
            },
            policy: ExtensionSizePolicy::new(&args.blocked_extensions, args.max_file_size),
        })
    }
}
