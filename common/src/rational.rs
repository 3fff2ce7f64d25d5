//! Exact decimal arithmetic.
//!
//! Exchange rates and user quantities arrive as decimal strings. They are
//! turned into [`BigRational`] values without passing through floating point,
//! so `"0.959877"` becomes exactly `959877/1000000`.

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::Signed;

use crate::error::{ParseError, ParseResult};

/// Parse a decimal string into an exact rational number.
///
/// The denominator is `10^n` where `n` is the number of characters after the
/// first decimal point, but never less than `10` once a point is present:
/// `"12."` parses as `12/10`. Without a point the denominator is `1`.
///
/// The remaining digits (with the point removed) must form an optionally
/// signed integer of any size. Surrounding whitespace is ignored.
pub fn parse_exact(s: &str) -> ParseResult<BigRational> {
    let s = s.trim();
    if s.is_empty() {
        return Err(ParseError::Empty);
    }

    let (digits, scale) = match s.find('.') {
        Some(pos) => {
            let fraction_len = s.len() - pos - 1;
            let mut digits = String::with_capacity(s.len() - 1);
            digits.push_str(&s[..pos]);
            digits.push_str(&s[pos + 1..]);
            (digits, fraction_len.max(1))
        }
        None => (s.to_string(), 0),
    };

    let numerator =
        parse_integer(&digits).ok_or_else(|| ParseError::InvalidNumber(s.to_string()))?;

    Ok(BigRational::new(numerator, ten_pow(scale)))
}

/// Render a rational as a fixed-point decimal with `places` fractional digits.
///
/// The last digit is rounded to nearest, halves away from zero.
pub fn to_fixed(value: &BigRational, places: usize) -> String {
    let scale = BigRational::from_integer(ten_pow(places));
    let scaled = (value * &scale).round().to_integer();

    let negative = scaled.is_negative();
    let mut rendered = scaled.abs().to_string();

    if places > 0 {
        if rendered.len() <= places {
            let padding = "0".repeat(places + 1 - rendered.len());
            rendered.insert_str(0, &padding);
        }
        rendered.insert(rendered.len() - places, '.');
    }

    if negative {
        rendered.insert(0, '-');
    }

    rendered
}

fn parse_integer(digits: &str) -> Option<BigInt> {
    let (negative, unsigned) = match digits.as_bytes().first() {
        Some(b'-') => (true, &digits[1..]),
        Some(b'+') => (false, &digits[1..]),
        _ => (false, digits),
    };

    if unsigned.is_empty() || !unsigned.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let magnitude = BigInt::parse_bytes(unsigned.as_bytes(), 10)?;
    Some(if negative { -magnitude } else { magnitude })
}

fn ten_pow(exp: usize) -> BigInt {
    num_traits::pow(BigInt::from(10u32), exp)
}
