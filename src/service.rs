use std::{convert::Infallible, future::Future, pin::Pin, sync::Arc};

use http::{request::Parts, Request, Response};
use hyper::service::Service;
use tokio::io::{AsyncRead, AsyncSeek};

use crate::{
    cache::CacheTtls,
    config::{Config, ContentRoot},
    policy::AccessPolicy,
    resolve::Resolver,
    util::Body,
    vfs::{FileOpener, TokioFileOpener},
    ResponseBuilder,
};

/// High-level interface for serving static files.
///
/// This struct serves files from a single content root. The request path is mapped onto the
/// filesystem beneath that root. Regular files are served with cache headers chosen by their
/// extension; the root itself is answered with a small JSON description, and everything else is
/// answered with a JSON error.
///
/// Only `GET` and `HEAD` requests are handled. Requests with a different method are answered with
/// 405.
///
/// This struct also implements the `hyper::Service` trait, which simply wraps `Static::serve`.
/// Cloning is cheap: the resolver state is shared.
pub struct Static<O = TokioFileOpener> {
    /// The resolver instance used to open files.
    pub resolver: Resolver<O>,
    /// Cache lifetimes per category.
    pub cache_ttls: CacheTtls,
}

impl Static<TokioFileOpener> {
    /// Create a new instance of `Static` with a given root path.
    pub fn new(root: ContentRoot) -> Self {
        Self {
            resolver: Resolver::new(root),
            cache_ttls: CacheTtls::default(),
        }
    }

    /// Create an instance from validated configuration.
    pub fn from_config(config: &Config) -> Self {
        let mut static_ = Self::new(config.root.clone());
        static_
            .cache_ttls(config.cache_ttls)
            .policy(config.policy.clone());
        static_
    }
}

impl<O: FileOpener> Static<O> {
    /// Create a new instance of `Static` with the given root and file opener.
    pub fn with_opener(root: ContentRoot, opener: O) -> Self {
        Self {
            resolver: Resolver::with_opener(root, opener),
            cache_ttls: CacheTtls::default(),
        }
    }

    /// Use the given cache lifetimes.
    pub fn cache_ttls(&mut self, value: CacheTtls) -> &mut Self {
        self.cache_ttls = value;
        self
    }

    /// Use the given access policy.
    pub fn policy(&mut self, policy: impl AccessPolicy + 'static) -> &mut Self {
        self.resolver.policy = Arc::new(policy);
        self
    }

    /// Serve a request.
    pub async fn serve<B>(&self, request: Request<B>) -> Response<Body<O::File>> {
        let (parts, _body) = request.into_parts();
        self.serve_parts(parts).await
    }

    /// Serve a request given only its head.
    pub async fn serve_parts(&self, parts: Parts) -> Response<Body<O::File>> {
        let request = Request::from_parts(parts, ());
        let result = self.resolver.resolve_request(&request).await;
        ResponseBuilder::new()
            .request(&request)
            .cache_ttls(self.cache_ttls)
            .build(result)
    }
}

impl<O> Clone for Static<O> {
    fn clone(&self) -> Self {
        Self {
            resolver: self.resolver.clone(),
            cache_ttls: self.cache_ttls,
        }
    }
}

impl<O, B> Service<Request<B>> for Static<O>
where
    O: FileOpener,
    O::File: AsyncRead + AsyncSeek + Send + Unpin + 'static,
    O::Future: Send,
{
    type Response = Response<Body<O::File>>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, request: Request<B>) -> Self::Future {
        let cloned = self.clone();
        let (parts, _body) = request.into_parts();
        Box::pin(async move { Ok(cloned.serve_parts(parts).await) })
    }
}
