#![crate_name = "edge_staticfile"]
#![deny(missing_docs)]

//! CDN-friendly static file serving for [Hyper 1.0](https://github.com/hyperium/hyper).
//!
//! This library serves files from a content root with cache headers chosen per file type,
//! conditional request handling (`ETag` / `Last-Modified`) and single byte-range streaming. It is
//! meant to sit behind a CDN edge, so every response carries explicit cache semantics: file
//! content is cacheable for a lifetime chosen by its extension, and everything else is not.
//!
//! ## Basic usage
//!
//! The `Static` type holds the content root and settings, and has a `serve` method to handle the
//! request. It also implements the `hyper::Service` trait. It can be used as:
//!
//! ```rust
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! # let dir = std::env::temp_dir();
//! // The content root is validated once, at startup.
//! let root = edge_staticfile::ContentRoot::new(&dir)?;
//! let static_ = edge_staticfile::Static::new(root);
//!
//! // A dummy request, but normally obtained from Hyper.
//! let request = http::Request::get("/foo/bar.txt").body(())?;
//!
//! // Serve the request. Returns a future for a `hyper::Response`.
//! let response_future = static_.serve(request);
//! # drop(response_future);
//! # Ok(())
//! # }
//! ```
//!
//! ## Advanced usage
//!
//! The `Static` type is a simple wrapper for `Resolver` and `ResponseBuilder`. Resolving maps the
//! request path onto the content root, opens the file and classifies it; building turns the
//! result (or the error) into a response.
//!
//! ```rust
//! use edge_staticfile::{ContentRoot, Resolver, ResponseBuilder};
//!
//! #[tokio::main]
//! async fn main() {
//!     let root = ContentRoot::new(std::env::temp_dir()).unwrap();
//!     let resolver = Resolver::new(root);
//!
//!     // A dummy request, but normally obtained from Hyper.
//!     let request = http::Request::get("/foo/bar.txt")
//!         .body(())
//!         .unwrap();
//!
//!     // First, resolve the request. Failures are `ServeError`s, which map to status codes.
//!     let result = resolver.resolve_request(&request).await;
//!
//!     // Then, build a response based on the result.
//!     let response = ResponseBuilder::new()
//!         .request(&request)
//!         .build(result);
//!     assert_eq!(response.status(), http::StatusCode::NOT_FOUND);
//! }
//! ```
//!
//! The pieces in between are public too. `ResolvedPath` confines a request path to the root
//! without touching the filesystem, `Classifier` picks a `CacheCategory` by extension,
//! `RequestConditions` evaluates `If-None-Match` / `If-Modified-Since`, and `range::process`
//! resolves a `Range` header against the file size. `FileResponseBuilder` combines them for a
//! single file, and streams the body through `FileBytesStream` or `FileBytesStreamRange`, which
//! never read outside the window they were given.

mod cache;
mod conditional;
mod config;
mod error;
mod policy;
pub mod range;
mod resolve;
mod response_builder;
pub mod server;
mod service;
mod util;
pub mod vfs;

pub use crate::cache::*;
pub use crate::conditional::{Conditional, EntityTag, RequestConditions};
pub use crate::config::*;
pub use crate::error::*;
pub use crate::policy::*;
pub use crate::range::{ByteRange, RangeOutcome};
pub use crate::resolve::*;
pub use crate::response_builder::*;
pub use crate::service::*;
pub use crate::util::{
    Body, FileBytesStream, FileBytesStreamRange, FileResponseBuilder, PathRejected, ResolvedPath,
    CDN_CACHE_CONTROL, X_CACHE_STATUS,
};
