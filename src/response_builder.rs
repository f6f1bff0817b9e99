use http::{
    header::{self, HeaderMap, HeaderValue},
    Method, Request, Response, StatusCode,
};
use serde::Serialize;
use tracing::error;

use crate::{
    cache::{CacheTtls, NO_CACHE},
    error::ServeError,
    range::unsatisfied_content_range,
    resolve::ResolveResult,
    util::{Body, FileResponseBuilder},
};

/// Body of the root-info response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RootInfo {
    /// Service name.
    pub service: &'static str,
    /// Service version.
    pub version: &'static str,
    /// Always `"ok"`.
    pub status: &'static str,
}

impl Default for RootInfo {
    fn default() -> Self {
        Self {
            service: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            status: "ok",
        }
    }
}

/// Utility to build the default response for a resolved request.
///
/// `ResponseBuilder` is typically a short-lived, per-request instance.
#[derive(Clone, Debug, Default)]
pub struct ResponseBuilder {
    /// Inner file response builder.
    pub file_response_builder: FileResponseBuilder,
}

impl ResponseBuilder {
    /// Create a new response builder with a default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply parameters based on a request.
    pub fn request<B>(&mut self, req: &Request<B>) -> &mut Self {
        self.request_parts(req.method(), req.headers())
    }

    /// Apply parameters based on request parts.
    pub fn request_parts(&mut self, method: &Method, headers: &HeaderMap) -> &mut Self {
        self.file_response_builder.request_parts(method, headers);
        self
    }

    /// Use the given cache lifetimes for file responses.
    pub fn cache_ttls(&mut self, value: CacheTtls) -> &mut Self {
        self.file_response_builder.cache_ttls(value);
        self
    }

    /// Build a response for the given resolve result.
    ///
    /// This never fails: a response that cannot be assembled becomes a 500.
    pub fn build<F>(&self, result: Result<ResolveResult<F>, ServeError>) -> Response<Body<F>> {
        let built = result.and_then(|result| match result {
            ResolveResult::RootDirectory => Ok(json_response(StatusCode::OK, &RootInfo::default())),
            ResolveResult::Found(file) => self.file_response_builder.build(file),
        });
        match built {
            Ok(response) => response,
            Err(err) => error_response(&err),
        }
    }
}

/// Build the response for an error.
///
/// The response always carries the non-caching directive. A 416 carries the file size in
/// `Content-Range` and no body; every other error carries a JSON `{error, message}` body.
pub fn error_response<F>(err: &ServeError) -> Response<Body<F>> {
    if err.is_internal() {
        error!(error = %err, "failed to serve request");
    }

    let mut res = match err {
        ServeError::RangeUnsatisfiable { size } => {
            let mut res = Response::new(Body::Empty);
            if let Ok(value) = HeaderValue::from_str(&unsatisfied_content_range(*size)) {
                res.headers_mut().insert(header::CONTENT_RANGE, value);
            }
            res.headers_mut()
                .insert(header::CONTENT_LENGTH, HeaderValue::from_static("0"));
            res
        }
        _ => json_response(err.status(), &err.body()),
    };
    *res.status_mut() = err.status();
    res.headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static(NO_CACHE));

    if let ServeError::MethodNotAllowed = err {
        res.headers_mut()
            .insert(header::ALLOW, HeaderValue::from_static("GET, HEAD"));
    }
    res
}

/// Build a non-cacheable JSON response.
pub fn json_response<F, T: Serialize>(status: StatusCode, value: &T) -> Response<Body<F>> {
    let bytes = match serde_json::to_vec(value) {
        Ok(bytes) => bytes,
        Err(err) => {
            error!(error = %err, "failed to serialize response body");
            let mut res = Response::new(Body::Empty);
            *res.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            res.headers_mut()
                .insert(header::CACHE_CONTROL, HeaderValue::from_static(NO_CACHE));
            return res;
        }
    };

    let mut res = Response::new(Body::Empty);
    *res.status_mut() = status;
    let headers = res.headers_mut();
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(NO_CACHE));
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(bytes.len()));
    *res.body_mut() = Body::buffered(bytes);
    res
}
