use http::{
    header::{self, HeaderMap, HeaderName, HeaderValue},
    response::Builder as HttpResponseBuilder,
    Method, Request, Response, StatusCode,
};

use crate::{
    cache::CacheTtls,
    conditional::{http_date, Conditional, EntityTag, RequestConditions},
    error::ServeError,
    range::{self, RangeOutcome},
    resolve::ResolvedFile,
    util::{Body, FileBytesStream, FileBytesStreamRange},
};

/// Mirror of `Cache-Control` addressed to CDN edges only.
pub const CDN_CACHE_CONTROL: HeaderName = HeaderName::from_static("cdn-cache-control");

/// Marks how the origin produced a file response: `MISS` when content was sent, `REVALIDATED`
/// for 304.
pub const X_CACHE_STATUS: HeaderName = HeaderName::from_static("x-cache-status");

/// Utility to build responses for serving a `ResolvedFile`.
///
/// This struct allows direct access to its fields, but these fields are typically initialized by
/// the accessors, using the builder pattern. The fields are basically a bunch of settings that
/// determine the response details.
#[derive(Clone, Debug, Default)]
pub struct FileResponseBuilder {
    /// Cache lifetimes per category.
    pub cache_ttls: CacheTtls,
    /// Whether this is a `HEAD` request, with no response body.
    pub is_head: bool,
    /// The conditional headers of the request.
    pub conditions: RequestConditions,
    /// The raw `Range` request header.
    pub range: Option<HeaderValue>,
}

impl FileResponseBuilder {
    /// Create a new builder with a default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply parameters based on a request.
    pub fn request<B>(&mut self, req: &Request<B>) -> &mut Self {
        self.request_parts(req.method(), req.headers())
    }

    /// Apply parameters based on request parts.
    pub fn request_parts(&mut self, method: &Method, headers: &HeaderMap) -> &mut Self {
        self.method(method);
        self.conditions = RequestConditions::from_headers(headers);
        self.range_header(headers.get(header::RANGE));
        self
    }

    /// Build responses for the given request method.
    pub fn method(&mut self, value: &Method) -> &mut Self {
        self.is_head = *value == Method::HEAD;
        self
    }

    /// Use the given cache lifetimes.
    pub fn cache_ttls(&mut self, value: CacheTtls) -> &mut Self {
        self.cache_ttls = value;
        self
    }

    /// Build responses for the given `Range` request header value.
    pub fn range_header(&mut self, value: Option<&HeaderValue>) -> &mut Self {
        self.range = value.cloned();
        self
    }

    /// Build a response for the given file.
    ///
    /// A range that starts past the end of the file is reported as
    /// `ServeError::RangeUnsatisfiable`, so the caller can render it like any other error.
    pub fn build<F>(&self, file: ResolvedFile<F>) -> Result<Response<Body<F>>, ServeError> {
        let ResolvedFile {
            handle,
            size,
            modified,
            content_type,
            category,
            ..
        } = file;

        let etag = modified.map(|modified| EntityTag::from_metadata(size, modified));
        let directive = self.cache_ttls.directive(category).to_string();

        let mut res = HttpResponseBuilder::new()
            .header(header::CACHE_CONTROL, directive.as_str())
            .header(CDN_CACHE_CONTROL, directive.as_str());
        if let Some(modified) = modified {
            res = res.header(header::LAST_MODIFIED, http_date(modified));
        }
        if let Some(ref etag) = etag {
            res = res.header(header::ETAG, etag.as_str());
        }

        // HEAD always describes the full file.
        if !self.is_head
            && self.conditions.evaluate(etag.as_ref(), modified) == Conditional::NotModified
        {
            return Ok(res
                .status(StatusCode::NOT_MODIFIED)
                .header(X_CACHE_STATUS, "REVALIDATED")
                .body(Body::Empty)?);
        }

        let res = res
            .header(header::ACCEPT_RANGES, "bytes")
            .header(header::CONTENT_TYPE, content_type)
            .header(X_CACHE_STATUS, "MISS");

        if self.is_head {
            return Ok(res
                .status(StatusCode::OK)
                .header(header::CONTENT_LENGTH, size)
                .body(Body::Empty)?);
        }

        match range::process(self.range.as_ref(), size) {
            RangeOutcome::NoRange => Ok(res
                .status(StatusCode::OK)
                .header(header::CONTENT_LENGTH, size)
                .body(Body::Full(FileBytesStream::new(handle, size)))?),
            RangeOutcome::Partial(range) => Ok(res
                .status(StatusCode::PARTIAL_CONTENT)
                .header(header::CONTENT_RANGE, range.content_range(size))
                .header(header::CONTENT_LENGTH, range.length())
                .body(Body::Range(FileBytesStreamRange::new(handle, range)))?),
            RangeOutcome::Unsatisfiable => Err(ServeError::RangeUnsatisfiable { size }),
        }
    }
}
