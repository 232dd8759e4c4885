//! `Range: bytes=...` parsing and resolution against a file size.
//!
//! Only single ranges are honored. Anything the parser does not understand
//! (other units, multi-range lists, garbage) is treated as "no range" and
//! the caller serves the full body.

/// Upper bound on bytes served for an open-ended `bytes=start-` request.
pub const MAX_OPEN_RANGE_CHUNK: u64 = 1024 * 1024;

/// A syntactically valid single range, not yet checked against a size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeSpec {
    /// `bytes=start-` or `bytes=start-end`.
    From { start: u64, end: Option<u64> },
    /// `bytes=-n`: the last `n` bytes.
    Suffix(u64),
}

/// A satisfiable, inclusive byte range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// Number of bytes covered, i.e. the `Content-Length` of a 206.
    pub fn length(&self) -> u64 {
        self.end - self.start + 1
    }

    /// `Content-Range` value for a 206 response.
    pub fn content_range(&self, size: u64) -> String {
        format!("bytes {}-{}/{size}", self.start, self.end)
    }
}

/// `Content-Range` value for a 416 response.
pub fn unsatisfied_content_range(size: u64) -> String {
    format!("bytes */{size}")
}

/// Parse a `Range` header value. Returns `None` when it should be ignored.
pub fn parse_range_header(value: &str) -> Option<RangeSpec> {
    let spec = value.trim().strip_prefix("bytes=")?.trim();
    if spec.contains(',') {
        return None;
    }
    let (start, end) = spec.split_once('-')?;
    let (start, end) = (start.trim(), end.trim());

    if start.is_empty() {
        return Some(RangeSpec::Suffix(parse_offset(end)?));
    }
    let start = parse_offset(start)?;
    let end = if end.is_empty() {
        None
    } else {
        Some(parse_offset(end)?)
    };
    Some(RangeSpec::From { start, end })
}

/// Digits only. Offsets past `u64::MAX` saturate, so an overflowing end is past EOF.
fn parse_offset(s: &str) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(s.parse().unwrap_or(u64::MAX))
}

/// Resolve a parsed range against a file of `size` bytes.
///
/// `None` means the range is not satisfiable (HTTP 416): an explicit end at
/// or past EOF is rejected rather than clamped.
pub fn resolve(spec: RangeSpec, size: u64) -> Option<ByteRange> {
    if size == 0 {
        return None;
    }
    match spec {
        RangeSpec::From {
            start,
            end: Some(end),
        } => (start <= end && end < size).then_some(ByteRange { start, end }),
        RangeSpec::From { start, end: None } => {
            if start >= size {
                return None;
            }
            let end = start.saturating_add(MAX_OPEN_RANGE_CHUNK - 1).min(size - 1);
            Some(ByteRange { start, end })
        }
        RangeSpec::Suffix(0) => None,
        RangeSpec::Suffix(n) => Some(ByteRange {
            start: size.saturating_sub(n),
            end: size - 1,
        }),
    }
}
