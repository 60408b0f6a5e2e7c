//! `Range` request header parsing.
//!
//! Only a single `bytes=` range is honored; anything after the first comma
//! is ignored. Every failure maps to `416 Range Not Satisfiable`.

/// An inclusive byte range within a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    /// Inclusive.
    pub end: u64,
}

impl ByteRange {
    /// Number of bytes covered; never zero.
    pub fn length(&self) -> u64 {
        self.end - self.start + 1
    }

    /// `Content-Range` header value for a file of `size` bytes.
    pub fn content_range(&self, size: u64) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, size)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RangeError {
    #[error("unsupported range unit: {0:?}")]
    UnsupportedUnit(String),

    #[error("malformed range: {0:?}")]
    Malformed(String),

    #[error("range {start}-{end} not satisfiable for {size} bytes")]
    Unsatisfiable { start: u64, end: u64, size: u64 },

    #[error("empty suffix range")]
    EmptySuffix,
}

/// `Content-Range` value sent with a 416 response.
pub fn unsatisfied_content_range(size: u64) -> String {
    format!("bytes */{size}")
}

/// Parse a `Range` header value against a file of `size` bytes.
///
/// - `bytes=a-b` selects `a..=b`
/// - `bytes=a-` selects `a..=size-1`
/// - `bytes=-n` selects the last `n` bytes (the whole file if `n > size`)
///
/// A range with `start > end` or `end >= size` is rejected, never clamped.
pub fn parse_range_header(value: &str, size: u64) -> Result<ByteRange, RangeError> {
    let spec = value
        .trim()
        .strip_prefix("bytes=")
        .ok_or_else(|| RangeError::UnsupportedUnit(value.to_string()))?;

    let first = spec.split(',').next().unwrap_or_default().trim();
    let (start_str, end_str) = first
        .split_once('-')
        .ok_or_else(|| RangeError::Malformed(first.to_string()))?;
    let (start_str, end_str) = (start_str.trim(), end_str.trim());

    let number = |s: &str| -> Result<u64, RangeError> {
        if !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(RangeError::Malformed(first.to_string()));
        }
        s.parse::<u64>()
            .map_err(|_| RangeError::Malformed(first.to_string()))
    };

    let (start, end) = match (start_str.is_empty(), end_str.is_empty()) {
        (true, true) => return Err(RangeError::Malformed(first.to_string())),
        (true, false) => {
            let suffix = number(end_str)?;
            if suffix == 0 {
                return Err(RangeError::EmptySuffix);
            }
            if size == 0 {
                return Err(RangeError::Unsatisfiable {
                    start: 0,
                    end: 0,
                    size,
                });
            }
            (size - suffix.min(size), size - 1)
        }
        (false, true) => {
            let start = number(start_str)?;
            (start, size.saturating_sub(1))
        }
        (false, false) => (number(start_str)?, number(end_str)?),
    };

    if start > end || end >= size {
        return Err(RangeError::Unsatisfiable { start, end, size });
    }

    Ok(ByteRange { start, end })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIZE: u64 = 10_000;

    fn ok(value: &str) -> (u64, u64) {
        let r = parse_range_header(value, SIZE).unwrap();
        (r.start, r.end)
    }

    #[test]
    fn closed_open_and_suffix_ranges() {
        assert_eq!(ok("bytes=100-199"), (100, 199));
        assert_eq!(ok("bytes=100-"), (100, SIZE - 1));
        assert_eq!(ok("bytes=-100"), (SIZE - 100, SIZE - 1));
        assert_eq!(ok("bytes=0-0"), (0, 0));
        assert_eq!(ok("bytes=0-9999"), (0, SIZE - 1));
    }

    #[test]
    fn oversized_suffix_selects_whole_file() {
        assert_eq!(ok("bytes=-20000"), (0, SIZE - 1));
    }

    #[test]
    fn only_first_range_is_honored() {
        assert_eq!(ok("bytes=0-99, 200-299"), (0, 99));
        assert_eq!(ok("bytes=5-9,garbage"), (5, 9));
    }

    #[test]
    fn rejects_reversed_and_out_of_bounds() {
        assert!(matches!(
            parse_range_header("bytes=500-100", SIZE),
            Err(RangeError::Unsatisfiable { start: 500, end: 100, .. })
        ));
        assert!(matches!(
            parse_range_header(&format!("bytes=0-{SIZE}"), SIZE),
            Err(RangeError::Unsatisfiable { .. })
        ));
        assert!(matches!(
            parse_range_header(&format!("bytes={SIZE}-"), SIZE),
            Err(RangeError::Unsatisfiable { .. })
        ));
    }

    #[test]
    fn rejects_malformed_values() {
        for value in ["bytes=-", "bytes=abc-def", "bytes=1-x", "bytes=", "bytes=12", "bytes=+1-2"] {
            assert!(
                matches!(parse_range_header(value, SIZE), Err(RangeError::Malformed(_))),
                "{value}"
            );
        }
        assert!(matches!(
            parse_range_header("items=0-1", SIZE),
            Err(RangeError::UnsupportedUnit(_))
        ));
        assert_eq!(parse_range_header("bytes=-0", SIZE), Err(RangeError::EmptySuffix));
    }

    #[test]
    fn empty_file_satisfies_nothing() {
        assert!(parse_range_header("bytes=0-", 0).is_err());
        assert!(parse_range_header("bytes=-5", 0).is_err());
        assert!(parse_range_header("bytes=0-0", 0).is_err());
    }

    #[test]
    fn header_values() {
        let r = ByteRange { start: 0, end: 999 };
        assert_eq!(r.length(), 1000);
        assert_eq!(r.content_range(4096), "bytes 0-999/4096");
        assert_eq!(unsatisfied_content_range(4096), "bytes */4096");
    }
}
