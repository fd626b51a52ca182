//! Normalization of textual coordinates at the API boundary.
//!
//! The codec only accepts integers. Front ends that take free-form numbers
//! (CLI arguments, JSON from a UI) truncate non-integral input toward zero
//! here, before encoding: `1.2` becomes `1`, `-3.9` becomes `-3`.

/// Errors from parsing a textual coordinate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoordinateParseError {
    #[error("empty coordinate")]
    Empty,
    #[error("not a decimal number: {0:?}")]
    Invalid(String),
    #[error("coordinate {0:?} does not fit in 128 bits")]
    OutOfRange(String),
}

/// Parse a decimal coordinate, truncating any fractional part toward zero.
///
/// Truncation is textual, so integers of any magnitude that fit `i128` are
/// exact; no float conversion happens.
pub fn parse_coordinate(input: &str) -> Result<i128, CoordinateParseError> {
    let text = input.trim();
    if text.is_empty() {
        return Err(CoordinateParseError::Empty);
    }

    let (negative, unsigned) = match text.as_bytes()[0] {
        b'-' => (true, &text[1..]),
        b'+' => (false, &text[1..]),
        _ => (false, text),
    };
    let (whole, fraction) = match unsigned.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (unsigned, ""),
    };

    let is_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
    if !is_digits(whole) || !is_digits(fraction) || (whole.is_empty() && fraction.is_empty()) {
        return Err(CoordinateParseError::Invalid(input.to_string()));
    }
    if whole.is_empty() {
        return Ok(0);
    }

    let signed = if negative {
        format!("-{whole}")
    } else {
        whole.to_string()
    };
    signed
        .parse::<i128>()
        .map_err(|_| CoordinateParseError::OutOfRange(input.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encode;
    use proptest::prelude::*;

    #[test]
    fn integers_pass_through() {
        assert_eq!(parse_coordinate("0"), Ok(0));
        assert_eq!(parse_coordinate("42"), Ok(42));
        assert_eq!(parse_coordinate("-17"), Ok(-17));
        assert_eq!(parse_coordinate("+5"), Ok(5));
        assert_eq!(parse_coordinate("  9 "), Ok(9));
    }

    #[test]
    fn fractions_truncate_toward_zero() {
        assert_eq!(parse_coordinate("1.2"), Ok(1));
        assert_eq!(parse_coordinate("3.1"), Ok(3));
        assert_eq!(parse_coordinate("2.9"), Ok(2));
        assert_eq!(parse_coordinate("-3.9"), Ok(-3));
        assert_eq!(parse_coordinate("-0.5"), Ok(0));
        assert_eq!(parse_coordinate(".75"), Ok(0));
        assert_eq!(parse_coordinate("7."), Ok(7));
    }

    #[test]
    fn truncated_input_encodes_like_integers() {
        let x = parse_coordinate("1.2").unwrap();
        let y = parse_coordinate("3.1").unwrap();
        assert_eq!(encode(0, x, y), encode(0, 1, 3));
    }

    #[test]
    fn extremes_are_exact() {
        assert_eq!(parse_coordinate(&i128::MAX.to_string()), Ok(i128::MAX));
        assert_eq!(parse_coordinate(&i128::MIN.to_string()), Ok(i128::MIN));
        assert!(matches!(
            parse_coordinate("170141183460469231731687303715884105728"),
            Err(CoordinateParseError::OutOfRange(_))
        ));
    }

    #[test]
    fn garbage_is_rejected() {
        assert_eq!(parse_coordinate(""), Err(CoordinateParseError::Empty));
        assert_eq!(parse_coordinate("   "), Err(CoordinateParseError::Empty));
        for bad in ["-", ".", "1e3", "0x10", "1.2.3", "--1", "one", "1 2"] {
            assert!(
                matches!(parse_coordinate(bad), Err(CoordinateParseError::Invalid(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    proptest! {
        #[test]
        fn prop_fraction_truncates_toward_zero(whole in -1_000_000i64..1_000_000, frac in 0u32..1000) {
            let text = format!("{whole}.{frac:03}");
            prop_assert_eq!(parse_coordinate(&text), Ok(whole as i128));
        }
    }
}
