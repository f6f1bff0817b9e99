use std::{
    io::{Error as IoError, ErrorKind as IoErrorKind},
    path::PathBuf,
    sync::Arc,
    time::SystemTime,
};

use http::{Method, Request};
use mime_guess::MimeGuess;
use tokio::fs::File;
use tracing::warn;

use crate::{
    cache::{CacheCategory, Classifier},
    config::ContentRoot,
    error::ServeError,
    policy::{AccessPolicy, AllowAll},
    util::{PathRejected, ResolvedPath},
    vfs::{FileOpener, FileWithMetadata, TokioFileOpener},
};

/// A file found beneath the content root, ready to be served.
///
/// Built fresh for every request from a filesystem stat.
#[derive(Debug)]
pub struct ResolvedFile<F = File> {
    /// Open file handle.
    pub handle: F,
    /// Absolute path of the file.
    pub path: PathBuf,
    /// Size in bytes.
    pub size: u64,
    /// Last modification time.
    pub modified: Option<SystemTime>,
    /// `Content-Type` value.
    pub content_type: String,
    /// Cache category, by extension.
    pub category: CacheCategory,
}

impl<F> ResolvedFile<F> {
    /// The file extension, if any.
    pub fn extension(&self) -> Option<&str> {
        self.path.extension().and_then(|ext| ext.to_str())
    }
}

/// The successful result of `Resolver::resolve_request`.
#[derive(Debug)]
pub enum ResolveResult<F = File> {
    /// The content root itself was requested.
    RootDirectory,
    /// The requested file was found.
    Found(ResolvedFile<F>),
}

/// Some IO errors are expected when serving files, and mapped to a regular error here.
fn map_open_err(err: IoError) -> ServeError {
    match err.kind() {
        IoErrorKind::NotFound => ServeError::NotFound,
        IoErrorKind::PermissionDenied => ServeError::PermissionDenied,
        // A file used as a directory (`/file.txt/x`).
        #[cfg(unix)]
        _ if err.raw_os_error() == Some(20) => ServeError::NotFound,
        _ => ServeError::Io(err),
    }
}

/// Resolves request paths to files beneath a content root.
///
/// Every step is independent of other requests. The root, the classifier and the policy are
/// shared read-only between clones.
pub struct Resolver<O = TokioFileOpener> {
    /// The directory files are served from.
    pub root: ContentRoot,
    /// The (virtual) filesystem used to open files.
    pub opener: Arc<O>,
    /// Maps file names to cache categories.
    pub classifier: Arc<Classifier>,
    /// Decides which files may be served.
    pub policy: Arc<dyn AccessPolicy>,
}

impl Resolver<TokioFileOpener> {
    /// Create a resolver that serves real files from the given root.
    pub fn new(root: ContentRoot) -> Self {
        Self::with_opener(root, TokioFileOpener::new())
    }
}

impl<O: FileOpener> Resolver<O> {
    /// Create a resolver with a custom file opener.
    pub fn with_opener(root: ContentRoot, opener: O) -> Self {
        Self {
            root,
            opener: Arc::new(opener),
            classifier: Arc::new(Classifier::new()),
            policy: Arc::new(AllowAll),
        }
    }

    /// Resolve the request by trying to find the file in the root.
    ///
    /// Only `GET` and `HEAD` requests are handled.
    pub async fn resolve_request<B>(
        &self,
        req: &Request<B>,
    ) -> Result<ResolveResult<O::File>, ServeError> {
        match *req.method() {
            Method::HEAD | Method::GET => {}
            _ => return Err(ServeError::MethodNotAllowed),
        }

        // HTTP/2 and absolute-form requests carry a scheme and authority; only the path matters.
        self.resolve_path(req.uri().path()).await
    }

    /// Resolve the request path by trying to find the file in the root.
    ///
    /// The checks run in a fixed order: path confinement, existence and file type, extension
    /// policy, size policy. Note that, unlike `resolve_request`, it is up to the caller to check
    /// the request method.
    pub async fn resolve_path(
        &self,
        request_path: &str,
    ) -> Result<ResolveResult<O::File>, ServeError> {
        let resolved = ResolvedPath::resolve(&self.root, request_path).map_err(|PathRejected| {
            warn!(path = request_path, "rejected path outside the content root");
            ServeError::PathRejected
        })?;

        if resolved.is_root() {
            return Ok(ResolveResult::RootDirectory);
        }

        let FileWithMetadata {
            handle,
            size,
            modified,
        } = self.opener.open(&resolved).await.map_err(map_open_err)?;

        if !self.policy.allows_extension(resolved.as_path()) {
            return Err(ServeError::ExtensionForbidden);
        }
        if !self.policy.allows_size(size) {
            return Err(ServeError::TooLarge { size });
        }

        let category = self.classifier.classify(&resolved.absolute);
        let content_type = MimeGuess::from_path(&resolved.absolute)
            .first_or_octet_stream()
            .to_string();

        Ok(ResolveResult::Found(ResolvedFile {
            handle,
            path: resolved.absolute,
            size,
            modified,
            content_type,
            category,
        }))
    }
}

impl<O> Clone for Resolver<O> {
    fn clone(&self) -> Self {
        Self {
            root: self.root.clone(),
            opener: self.opener.clone(),
            classifier: self.classifier.clone(),
            policy: self.policy.clone(),
        }
    }
}
