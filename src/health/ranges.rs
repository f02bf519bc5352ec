//! Expected HTTP status ranges.
//!
//! A range spec is a `/`-separated list of tokens, each either a single code
//! (`204`) or an inclusive range (`200-299`). Example: `200/204/401-429`.
//!
//! # Design Decisions
//! - One bad token invalidates the whole spec
//! - Health checks use `parse_lenient`, which falls back to the empty set
//! - The empty set means "any HTTP response counts as success"

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors produced while parsing a status range spec.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeParseError {
    #[error("empty token in status range spec")]
    EmptyToken,

    #[error("invalid status code: {0:?}")]
    InvalidCode(String),

    #[error("reversed status range {low}-{high}")]
    Reversed { low: u16, high: u16 },

    #[error("too many bounds in token {0:?}")]
    TooManyBounds(String),
}

/// Inclusive `[low, high]` interval over status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusRange {
    pub low: u16,
    pub high: u16,
}

impl StatusRange {
    pub fn contains(&self, code: u16) -> bool {
        self.low <= code && code <= self.high
    }
}

impl fmt::Display for StatusRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.low == self.high {
            write!(f, "{}", self.low)
        } else {
            write!(f, "{}-{}", self.low, self.high)
        }
    }
}

/// A set of accepted status ranges.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusRanges(Vec<StatusRange>);

impl StatusRanges {
    /// The empty set: default success determination.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Strict parse. Whitespace-only input is the empty set.
    pub fn parse(spec: &str) -> Result<Self, RangeParseError> {
        let spec = spec.trim();
        if spec.is_empty() {
            return Ok(Self::empty());
        }

        let mut ranges = Vec::new();
        for token in spec.split('/') {
            ranges.push(parse_token(token.trim())?);
        }
        Ok(Self(ranges))
    }

    /// Parse, degrading any malformed spec to the empty set.
    pub fn parse_lenient(spec: &str) -> Self {
        match Self::parse(spec) {
            Ok(ranges) => ranges,
            Err(e) => {
                tracing::debug!(spec = %spec, error = %e, "Ignoring malformed status range spec");
                Self::empty()
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn ranges(&self) -> &[StatusRange] {
        &self.0
    }

    /// True if any member range contains `code`.
    pub fn contains(&self, code: u16) -> bool {
        self.0.iter().any(|r| r.contains(code))
    }

    /// Success rule applied to a probe response.
    pub fn accepts(&self, code: u16) -> bool {
        self.is_empty() || self.contains(code)
    }
}

impl FromStr for StatusRanges {
    type Err = RangeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for StatusRanges {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, range) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{}", range)?;
        }
        Ok(())
    }
}

fn parse_token(token: &str) -> Result<StatusRange, RangeParseError> {
    if token.is_empty() {
        return Err(RangeParseError::EmptyToken);
    }

    let bounds: Vec<&str> = token.split('-').collect();
    match bounds.as_slice() {
        [single] => {
            let code = parse_code(single)?;
            Ok(StatusRange { low: code, high: code })
        }
        [low, high] => {
            let low = parse_code(low)?;
            let high = parse_code(high)?;
            if low > high {
                return Err(RangeParseError::Reversed { low, high });
            }
            Ok(StatusRange { low, high })
        }
        _ => Err(RangeParseError::TooManyBounds(token.to_string())),
    }
}

fn parse_code(s: &str) -> Result<u16, RangeParseError> {
    s.trim()
        .parse::<u16>()
        .map_err(|_| RangeParseError::InvalidCode(s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_codes() {
        let ranges = StatusRanges::parse("200/302").unwrap();
        assert!(ranges.accepts(200));
        assert!(ranges.accepts(302));
        assert!(!ranges.accepts(404));
        assert!(!ranges.accepts(301));
    }

    #[test]
    fn test_inclusive_range() {
        let ranges = StatusRanges::parse("400-404").unwrap();
        for code in 400..=404 {
            assert!(ranges.accepts(code), "{} should be accepted", code);
        }
        assert!(!ranges.accepts(399));
        assert!(!ranges.accepts(405));
    }

    #[test]
    fn test_mixed_spec_display() {
        let ranges = StatusRanges::parse(" 200 / 204/401-429 ").unwrap();
        assert_eq!(ranges.ranges().len(), 3);
        assert_eq!(ranges.to_string(), "200/204/401-429");
    }

    #[test]
    fn test_empty_spec_is_empty_set() {
        assert!(StatusRanges::parse("").unwrap().is_empty());
        assert!(StatusRanges::parse("   ").unwrap().is_empty());
    }

    #[test]
    fn test_empty_set_accepts_everything() {
        let ranges = StatusRanges::empty();
        assert!(ranges.accepts(200));
        assert!(ranges.accepts(503));
        assert!(!ranges.contains(200));
    }

    #[test]
    fn test_malformed_specs() {
        assert_eq!(
            StatusRanges::parse("abc"),
            Err(RangeParseError::InvalidCode("abc".into()))
        );
        assert_eq!(
            StatusRanges::parse("404-400"),
            Err(RangeParseError::Reversed { low: 404, high: 400 })
        );
        assert_eq!(StatusRanges::parse("200//302"), Err(RangeParseError::EmptyToken));
        assert!(StatusRanges::parse("1-2-3").is_err());
        assert!(StatusRanges::parse("70000").is_err());
        assert!(StatusRanges::parse("200-").is_err());
    }

    #[test]
    fn test_one_bad_token_discards_everything() {
        let ranges = StatusRanges::parse_lenient("200/abc");
        assert!(ranges.is_empty());
        // fail-open: falls back to accepting any status
        assert!(ranges.accepts(500));
    }

    #[test]
    fn test_lenient_keeps_valid_spec() {
        let ranges = StatusRanges::parse_lenient("204");
        assert!(ranges.accepts(204));
        assert!(!ranges.accepts(200));
    }
}
