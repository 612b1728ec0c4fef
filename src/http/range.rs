//! HTTP Range request parsing module
//!
//! Single `bytes=` ranges only (RFC 9110 §14). Multi-range and other units
//! fall back to a full response.

/// Inclusive byte range within a representation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: usize,
    pub end: usize,
}

impl ByteRange {
    pub const fn len(self) -> usize {
        self.end - self.start + 1
    }
}

/// Range header parse result
#[derive(Debug, PartialEq, Eq)]
pub enum RangeOutcome {
    /// Serve the full representation
    Full,
    Partial(ByteRange),
    /// Respond 416
    NotSatisfiable,
}

/// Parse a `Range` header against a representation of `size` bytes.
///
/// Forms: `bytes=start-end`, `bytes=start-`, `bytes=-suffix`.
pub fn parse_range_header(range_header: Option<&str>, size: usize) -> RangeOutcome {
    let Some(spec) = range_header.and_then(|h| h.trim().strip_prefix("bytes=")) else {
        return RangeOutcome::Full;
    };
    if spec.contains(',') {
        return RangeOutcome::Full;
    }
    let Some((first, last)) = spec.split_once('-') else {
        return RangeOutcome::Full;
    };
    let (first, last) = (first.trim(), last.trim());

    if first.is_empty() {
        // Suffix: the final N bytes
        return match last.parse::<usize>() {
            Ok(0) => RangeOutcome::NotSatisfiable,
            Ok(_) if size == 0 => RangeOutcome::NotSatisfiable,
            Ok(n) => RangeOutcome::Partial(ByteRange {
                start: size.saturating_sub(n),
                end: size - 1,
            }),
            Err(_) => RangeOutcome::Full,
        };
    }

    let Ok(start) = first.parse::<usize>() else {
        return RangeOutcome::Full;
    };
    if start >= size {
        return RangeOutcome::NotSatisfiable;
    }

    let end = if last.is_empty() {
        size - 1
    } else {
        match last.parse::<usize>() {
            Ok(e) if e < start => return RangeOutcome::Full,
            Ok(e) => e.min(size - 1),
            Err(_) => return RangeOutcome::Full,
        }
    };

    RangeOutcome::Partial(ByteRange { start, end })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_or_foreign_range() {
        assert_eq!(parse_range_header(None, 100), RangeOutcome::Full);
        assert_eq!(parse_range_header(Some("items=0-1"), 100), RangeOutcome::Full);
        assert_eq!(
            parse_range_header(Some("bytes=0-9,20-29"), 100),
            RangeOutcome::Full
        );
        assert_eq!(parse_range_header(Some("bytes=a-b"), 100), RangeOutcome::Full);
        // Last position before first is syntactically invalid, so ignored
        assert_eq!(parse_range_header(Some("bytes=9-2"), 100), RangeOutcome::Full);
    }

    #[test]
    fn test_bounded_and_open_ranges() {
        assert_eq!(
            parse_range_header(Some("bytes=0-9"), 100),
            RangeOutcome::Partial(ByteRange { start: 0, end: 9 })
        );
        assert_eq!(
            parse_range_header(Some("bytes=50-"), 100),
            RangeOutcome::Partial(ByteRange { start: 50, end: 99 })
        );
        // End clamps to the last byte
        let RangeOutcome::Partial(r) = parse_range_header(Some("bytes=90-500"), 100) else {
            panic!("expected partial");
        };
        assert_eq!((r.end, r.len()), (99, 10));
    }

    #[test]
    fn test_suffix_range() {
        assert_eq!(
            parse_range_header(Some("bytes=-20"), 100),
            RangeOutcome::Partial(ByteRange { start: 80, end: 99 })
        );
        assert_eq!(
            parse_range_header(Some("bytes=-500"), 100),
            RangeOutcome::Partial(ByteRange { start: 0, end: 99 })
        );
        assert_eq!(
            parse_range_header(Some("bytes=-0"), 100),
            RangeOutcome::NotSatisfiable
        );
    }

    #[test]
    fn test_not_satisfiable() {
        assert_eq!(
            parse_range_header(Some("bytes=200-"), 100),
            RangeOutcome::NotSatisfiable
        );
        assert_eq!(
            parse_range_header(Some("bytes=0-"), 0),
            RangeOutcome::NotSatisfiable
        );
    }
}
