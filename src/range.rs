//! Single byte-range parsing and resolution.
//!
//! Only the `bytes=<start>-<end>` form is honored, with `<end>` optional. Malformed headers
//! degrade to a full-body response, except a start offset at or past the end of the file, which
//! is unsatisfiable. When a header lists several ranges, only the first one is considered.

use http::HeaderValue;

/// An inclusive byte window into a file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ByteRange {
    /// First byte offset.
    pub start: u64,
    /// Last byte offset, inclusive.
    pub end: u64,
}

impl ByteRange {
    /// Number of bytes in the window.
    pub fn length(&self) -> u64 {
        self.end - self.start + 1
    }

    /// The `Content-Range` value for this window of a file of the given size.
    pub fn content_range(&self, size: u64) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, size)
    }
}

/// The `Content-Range` value of a 416 response for a file of the given size.
pub fn unsatisfied_content_range(size: u64) -> String {
    format!("bytes */{}", size)
}

/// Outcome of processing a `Range` header against a file size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RangeOutcome {
    /// No usable range; serve the whole file.
    NoRange,
    /// Serve the given window with 206.
    Partial(ByteRange),
    /// The range starts past the end of the file; respond with 416.
    Unsatisfiable,
}

/// Process a raw `Range` header value against the file size.
pub fn process(range_header: Option<&HeaderValue>, file_size: u64) -> RangeOutcome {
    match range_header.and_then(|v| v.to_str().ok()) {
        Some(value) => process_str(value, file_size),
        None => RangeOutcome::NoRange,
    }
}

/// Process a `Range` header string against the file size.
pub fn process_str(value: &str, file_size: u64) -> RangeOutcome {
    let ranges = match value.split_once('=') {
        Some((unit, ranges)) if unit.trim().eq_ignore_ascii_case("bytes") => ranges,
        _ => return RangeOutcome::NoRange,
    };
    let first = ranges.split(',').next().unwrap_or_default();
    let (start, end) = match first.split_once('-') {
        Some((start, end)) => (start.trim(), end.trim()),
        None => return RangeOutcome::NoRange,
    };

    let start = match parse_offset(start) {
        Offset::Value(start) if start < file_size => start,
        Offset::Value(_) | Offset::Overflow => return RangeOutcome::Unsatisfiable,
        Offset::Invalid => return RangeOutcome::NoRange,
    };

    let last = file_size - 1;
    let end = if end.is_empty() {
        last
    } else {
        match parse_offset(end) {
            Offset::Value(end) => end.min(last),
            Offset::Overflow => last,
            Offset::Invalid => return RangeOutcome::NoRange,
        }
    };

    if end < start {
        return RangeOutcome::NoRange;
    }
    RangeOutcome::Partial(ByteRange { start, end })
}

enum Offset {
    Value(u64),
    /// All digits, but larger than `u64::MAX`.
    Overflow,
    Invalid,
}

fn parse_offset(s: &str) -> Offset {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Offset::Invalid;
    }
    s.parse().map_or(Offset::Overflow, Offset::Value)
}
