//! Field-level parsers for the numeric GFF3 columns.
//!
//! Three range-parsing disciplines exist, matching the parser modes:
//! strict (reject anything odd), lenient (negative coordinates clamp to 1),
//! and tidy (reversed ranges are swapped and reported back to the caller).

use annograph_core::Range;
use annograph_error::{Error, Result};

fn parse_coordinate(token: &str, what: &str) -> Result<i64> {
    token.trim().parse::<i64>().map_err(|_| {
        Error::parse(format!("could not parse {} \"{}\"", what, token))
    })
}

/// Strict range parsing: unsigned coordinates, `start <= end`.
pub fn parse_range(start: &str, end: &str) -> Result<Range> {
    let start = parse_coordinate(start, "range start")?;
    let end = parse_coordinate(end, "range end")?;
    if start < 0 || end < 0 {
        return Err(Error::parse(format!(
            "range ({},{}) contains negative coordinates",
            start, end
        )));
    }
    if start > end {
        return Err(Error::parse(format!(
            "range start {} is larger than range end {}",
            start, end
        )));
    }
    Ok(Range::new(start as u64, end as u64))
}

/// Lenient parsing used by the default (relaxed) mode: negative coordinates
/// are corrected to 1.
pub fn parse_range_correct_neg(start: &str, end: &str) -> Result<Range> {
    let start = parse_coordinate(start, "range start")?.max(1);
    let end = parse_coordinate(end, "range end")?.max(1);
    if start > end {
        return Err(Error::parse(format!(
            "range start {} is larger than range end {}",
            start, end
        )));
    }
    Ok(Range::new(start as u64, end as u64))
}

/// Outcome of tidy range parsing; a swapped range is a recoverable finding
/// the caller reports.
pub struct TidyRange {
    pub range: Range,
    pub swapped: bool,
}

/// Tidy parsing: negative coordinates are corrected to 1 and reversed
/// ranges are swapped instead of rejected.
pub fn parse_range_tidy(start: &str, end: &str) -> Result<TidyRange> {
    let start = parse_coordinate(start, "range start")?.max(1);
    let end = parse_coordinate(end, "range end")?.max(1);
    let (start, end, swapped) = if start > end {
        (end, start, true)
    } else {
        (start, end, false)
    };
    Ok(TidyRange {
        range: Range::new(start as u64, end as u64),
        swapped,
    })
}

/// Score column: a decimal float or `.` for undefined.
pub fn parse_score(token: &str) -> Result<Option<f32>> {
    if token == "." {
        return Ok(None);
    }
    token
        .parse::<f32>()
        .map(Some)
        .map_err(|_| Error::parse(format!("could not parse score \"{}\"", token)))
}

/// Unsigned integer with a descriptive error.
pub fn parse_uint(token: &str, what: &str) -> Result<u64> {
    token
        .trim()
        .parse::<u64>()
        .map_err(|_| Error::parse(format!("could not parse {} \"{}\"", what, token)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_rejects_reversed_and_negative() {
        assert_eq!(parse_range("100", "400").unwrap(), Range::new(100, 400));
        assert!(parse_range("400", "100").is_err());
        assert!(parse_range("-5", "100").is_err());
        assert!(parse_range("abc", "100").is_err());
    }

    #[test]
    fn lenient_clamps_negatives() {
        assert_eq!(
            parse_range_correct_neg("-5", "100").unwrap(),
            Range::new(1, 100)
        );
        assert!(parse_range_correct_neg("50", "10").is_err());
    }

    #[test]
    fn tidy_swaps_reversed() {
        let tidy = parse_range_tidy("400", "100").unwrap();
        assert_eq!(tidy.range, Range::new(100, 400));
        assert!(tidy.swapped);
        let fine = parse_range_tidy("100", "400").unwrap();
        assert!(!fine.swapped);
    }

    #[test]
    fn score_dot_is_undefined() {
        assert_eq!(parse_score(".").unwrap(), None);
        assert_eq!(parse_score("0.97").unwrap(), Some(0.97));
        assert!(parse_score("high").is_err());
    }
}
