use std::{
    fmt,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use http::{header, HeaderMap, HeaderValue};

/// An entity tag derived from file size and modification time.
///
/// This is not a content hash: two files with the same size and modification time share a tag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntityTag(String);

impl EntityTag {
    /// Derive the tag for a file of the given size and modification time.
    pub fn from_metadata(size: u64, modified: SystemTime) -> Self {
        let since_epoch = duration_since_epoch(modified);
        Self(format!(
            "W/\"{0:x}-{1:x}.{2:x}\"",
            size,
            since_epoch.as_secs(),
            since_epoch.subsec_nanos()
        ))
    }

    /// The tag as sent in the `ETag` header, including quotes.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of evaluating conditional request headers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Conditional {
    /// The client's copy is current; respond with 304.
    NotModified,
    /// The representation must be sent.
    MustSend,
}

/// The conditional headers of a request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestConditions {
    /// Raw value of `If-None-Match`.
    pub if_none_match: Option<String>,
    /// Parsed value of `If-Modified-Since`. Unparseable values are dropped.
    pub if_modified_since: Option<SystemTime>,
}

impl RequestConditions {
    /// Collect the conditional headers from a request header map.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            if_none_match: headers
                .get(header::IF_NONE_MATCH)
                .and_then(|v| v.to_str().ok())
                .map(|v| v.to_owned()),
            if_modified_since: parse_http_date(headers.get(header::IF_MODIFIED_SINCE)),
        }
    }

    /// Decide whether a file with the given tag and modification time can be answered with 304.
    ///
    /// An exact `If-None-Match` match wins. Otherwise `If-Modified-Since` is compared at whole
    /// second resolution, because that is the resolution of the `Last-Modified` we send.
    pub fn evaluate(&self, etag: Option<&EntityTag>, modified: Option<SystemTime>) -> Conditional {
        if let (Some(expected), Some(etag)) = (&self.if_none_match, etag) {
            if expected.as_str() == etag.as_str() {
                return Conditional::NotModified;
            }
        }

        if let (Some(since), Some(modified)) = (self.if_modified_since, modified) {
            if duration_since_epoch(modified).as_secs() <= duration_since_epoch(since).as_secs() {
                return Conditional::NotModified;
            }
        }

        Conditional::MustSend
    }
}

fn parse_http_date(value: Option<&HeaderValue>) -> Option<SystemTime> {
    value
        .and_then(|v| v.to_str().ok())
        .and_then(|v| httpdate::parse_http_date(v.trim()).ok())
}

/// Format a modification time for `Last-Modified`.
pub(crate) fn http_date(time: SystemTime) -> String {
    httpdate::fmt_http_date(UNIX_EPOCH + duration_since_epoch(time))
}

/// Times before the epoch are treated as the epoch itself.
fn duration_since_epoch(time: SystemTime) -> Duration {
    time.duration_since(UNIX_EPOCH).unwrap_or_default()
}
