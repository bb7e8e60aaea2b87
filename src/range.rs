//! Byte-range resolution for partial GET.
//!
//! Only a single range of the form `bytes=<start>-<end>` is understood.
//! Either bound may be left out. Anything that does not look like that
//! is ignored, and the full content is sent.

use regex::Regex;

lazy_static! {
    static ref RANGE_RE: Regex = Regex::new(r"bytes=(\d*)-(\d*)").unwrap();
}

/// Inclusive byte range within a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// Number of bytes covered by the range.
    pub fn content_length(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Value for the `Content-Range` header of a 206 response.
    pub fn content_range(&self, size: u64) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, size)
    }
}

/// Outcome of resolving a `Range` header against a resource size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeOutcome {
    /// No (usable) range header: send everything.
    Full,
    /// Send this part only.
    Partial(ByteRange),
    /// Range is outside the resource.
    NotSatisfiable,
}

/// Resolve an optional `Range` header value against `size`.
pub fn resolve(header: Option<&str>, size: u64) -> RangeOutcome {
    let caps = match header.and_then(|h| RANGE_RE.captures(h)) {
        Some(caps) => caps,
        None => return RangeOutcome::Full,
    };

    // An empty capture means "bound left out". A bound that doesn't
    // fit in an u64 is certainly past the end of the resource.
    let bound = |idx: usize| -> Option<Option<u64>> {
        match caps.get(idx).map(|m| m.as_str()) {
            None | Some("") => Some(None),
            Some(s) => s.parse::<u64>().ok().map(Some),
        }
    };
    let (start, end) = match (bound(1), bound(2)) {
        (Some(start), Some(end)) => (start, end),
        _ => return RangeOutcome::NotSatisfiable,
    };

    let start = start.unwrap_or(0);
    let end = match end {
        Some(end) => end,
        // also covers a zero-sized resource, which has no last byte.
        None => match size.checked_sub(1) {
            Some(last) => last,
            None => return RangeOutcome::NotSatisfiable,
        },
    };

    if start > end || end >= size {
        return RangeOutcome::NotSatisfiable;
    }
    RangeOutcome::Partial(ByteRange { start, end })
}

/// Value for the `Content-Range` header of a 416 response.
pub fn unsatisfied_range(size: u64) -> String {
    format!("bytes */{size}")
}
