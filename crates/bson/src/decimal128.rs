//! IEEE-754-2008 decimal128 stored in the binary integer decimal (BID)
//! encoding, 16 bytes little-endian as on the BSON wire.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use thiserror::Error;

/// Largest canonical coefficient: 34 decimal digits.
const MAX_COEFFICIENT: u128 = 9_999_999_999_999_999_999_999_999_999_999_999;
const EXPONENT_BIAS: i32 = 6176;
const EXPONENT_MAX: i32 = 6111;
const EXPONENT_MIN: i32 = -6176;
const MAX_DIGITS: usize = 34;

const SIGN_BIT: u128 = 1 << 127;
const NAN_BITS: u128 = 0x7c00 << 112;
const INFINITY_BITS: u128 = 0x7800 << 112;

/// Error type for decimal literal parsing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseDecimalError {
    #[error("empty decimal literal")]
    Empty,
    #[error("invalid decimal literal {0:?}")]
    InvalidLiteral(String),
    #[error("exponent out of range in decimal literal {0:?}")]
    ExponentOutOfRange(String),
}

/// A 128-bit decimal floating point value.
///
/// Stored as the raw 16-byte wire encoding. Equality and hashing compare
/// the decoded value, so distinct encodings of the same number (for
/// example `1` and `1.0`, or non-canonical coefficients) compare equal.
/// `NaN` compares equal to `NaN` so containers holding one remain equal
/// to themselves.
#[derive(Clone, Copy)]
pub struct Decimal128 {
    bytes: [u8; 16],
}

enum Parts {
    Nan,
    Infinity { negative: bool },
    Finite { negative: bool, coeff: u128, exp: i32 },
}

impl Decimal128 {
    /// Positive zero.
    pub const ZERO: Decimal128 = Decimal128::from_bits((EXPONENT_BIAS as u128) << 113);
    /// Not a number.
    pub const NAN: Decimal128 = Decimal128::from_bits(NAN_BITS);
    /// Positive infinity.
    pub const INFINITY: Decimal128 = Decimal128::from_bits(INFINITY_BITS);
    /// Negative infinity.
    pub const NEG_INFINITY: Decimal128 = Decimal128::from_bits(INFINITY_BITS | SIGN_BIT);

    const fn from_bits(bits: u128) -> Self {
        Self {
            bytes: bits.to_le_bytes(),
        }
    }

    /// Constructs a value from its 16 raw bytes in wire (little-endian)
    /// order.
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self { bytes }
    }

    /// The raw 16 bytes in wire (little-endian) order.
    pub fn bytes(&self) -> [u8; 16] {
        self.bytes
    }

    fn from_parts(negative: bool, coeff: u128, exp: i32) -> Self {
        debug_assert!(coeff <= MAX_COEFFICIENT);
        debug_assert!((EXPONENT_MIN..=EXPONENT_MAX).contains(&exp));
        let biased = (exp + EXPONENT_BIAS) as u128;
        let mut bits = (biased << 113) | coeff;
        if negative {
            bits |= SIGN_BIT;
        }
        Self::from_bits(bits)
    }

    fn infinity(negative: bool) -> Self {
        if negative {
            Self::NEG_INFINITY
        } else {
            Self::INFINITY
        }
    }

    fn parts(&self) -> Parts {
        let bits = u128::from_le_bytes(self.bytes);
        let negative = bits & SIGN_BIT != 0;
        let combination = ((bits >> 122) & 0x1f) as u8;
        if combination == 0b11111 {
            Parts::Nan
        } else if combination == 0b11110 {
            Parts::Infinity { negative }
        } else if combination >> 3 == 0b11 {
            // Large-coefficient form: the implicit `100` significand
            // prefix always exceeds the canonical maximum, so the value
            // decodes as zero.
            let exp = ((bits >> 111) & 0x3fff) as i32 - EXPONENT_BIAS;
            Parts::Finite {
                negative,
                coeff: 0,
                exp,
            }
        } else {
            let exp = ((bits >> 113) & 0x3fff) as i32 - EXPONENT_BIAS;
            let coeff = bits & ((1u128 << 113) - 1);
            Parts::Finite {
                negative,
                coeff: if coeff > MAX_COEFFICIENT { 0 } else { coeff },
                exp,
            }
        }
    }

    /// True for either NaN encoding class.
    pub fn is_nan(&self) -> bool {
        matches!(self.parts(), Parts::Nan)
    }

    /// True for positive or negative infinity.
    pub fn is_infinite(&self) -> bool {
        matches!(self.parts(), Parts::Infinity { .. })
    }

    /// True for any zero encoding.
    pub fn is_zero(&self) -> bool {
        matches!(self.parts(), Parts::Finite { coeff: 0, .. })
    }

    /// Converts from a 32-bit integer; always exact.
    pub fn from_i32(value: i32) -> Self {
        Self::from_i64(value as i64)
    }

    /// Converts from a 64-bit integer; always exact.
    pub fn from_i64(value: i64) -> Self {
        Self::from_parts(value < 0, value.unsigned_abs() as u128, 0)
    }

    /// Converts from a double using its shortest decimal rendering, the
    /// digits a dynamic-language BSON library would carry over.
    pub fn from_f64(value: f64) -> Self {
        if value.is_nan() {
            return Self::NAN;
        }
        if value.is_infinite() {
            return Self::infinity(value < 0.0);
        }
        format!("{value}").parse().unwrap_or(Self::ZERO)
    }

    /// Converts to a 32-bit integer when the conversion is exact.
    pub fn to_i32(&self) -> Option<i32> {
        self.to_i64()?.try_into().ok()
    }

    /// Converts to a 64-bit integer when the conversion is exact.
    pub fn to_i64(&self) -> Option<i64> {
        let Parts::Finite {
            negative,
            mut coeff,
            exp,
        } = self.parts()
        else {
            return None;
        };
        let mut exp = exp as i64;
        while exp < 0 && coeff != 0 && coeff % 10 == 0 {
            coeff /= 10;
            exp += 1;
        }
        if coeff == 0 {
            return Some(0);
        }
        if exp < 0 {
            return None;
        }
        let mut value = coeff as i128;
        for _ in 0..exp {
            value = value.checked_mul(10)?;
            if value > 1i128 << 64 {
                return None;
            }
        }
        if negative {
            value = -value;
        }
        i64::try_from(value).ok()
    }

    /// Converts to a double when the conversion is exact under shortest
    /// round-trip rendering: the result formats back to this same decimal
    /// value.
    pub fn to_f64(&self) -> Option<f64> {
        match self.parts() {
            Parts::Nan => Some(f64::NAN),
            Parts::Infinity { negative } => Some(if negative {
                f64::NEG_INFINITY
            } else {
                f64::INFINITY
            }),
            Parts::Finite { .. } => {
                let value: f64 = self.to_string().parse().ok()?;
                if !value.is_finite() {
                    return None;
                }
                let back: Decimal128 = format!("{value}").parse().ok()?;
                if back == *self {
                    Some(value)
                } else {
                    None
                }
            }
        }
    }

    /// Normalized comparison key: class/sign, reduced coefficient,
    /// reduced exponent.
    fn normalized(&self) -> (u8, u128, i64) {
        match self.parts() {
            Parts::Nan => (4, 0, 0),
            Parts::Infinity { negative } => (if negative { 3 } else { 2 }, 0, 0),
            Parts::Finite {
                negative,
                mut coeff,
                exp,
            } => {
                if coeff == 0 {
                    return (0, 0, 0);
                }
                let mut exp = exp as i64;
                while coeff % 10 == 0 {
                    coeff /= 10;
                    exp += 1;
                }
                (if negative { 1 } else { 0 }, coeff, exp)
            }
        }
    }
}

impl PartialEq for Decimal128 {
    fn eq(&self, other: &Self) -> bool {
        self.normalized() == other.normalized()
    }
}

impl Eq for Decimal128 {}

impl Hash for Decimal128 {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.normalized().hash(state);
    }
}

impl FromStr for Decimal128 {
    type Err = ParseDecimalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ParseDecimalError::Empty);
        }
        let bytes = s.as_bytes();
        let mut start = 0;
        let negative = match bytes[0] {
            b'+' => {
                start = 1;
                false
            }
            b'-' => {
                start = 1;
                true
            }
            _ => false,
        };
        let rest = &s[start..];
        if rest.eq_ignore_ascii_case("nan") {
            return Ok(if negative {
                Self::from_bits(NAN_BITS | SIGN_BIT)
            } else {
                Self::NAN
            });
        }
        if rest.eq_ignore_ascii_case("inf") || rest.eq_ignore_ascii_case("infinity") {
            return Ok(Self::infinity(negative));
        }

        let rb = rest.as_bytes();
        let mut digits: Vec<u8> = Vec::new();
        let mut frac_len: i64 = 0;
        let mut seen_point = false;
        let mut seen_digit = false;
        let mut i = 0;
        while i < rb.len() {
            match rb[i] {
                b'0'..=b'9' => {
                    digits.push(rb[i] - b'0');
                    if seen_point {
                        frac_len += 1;
                    }
                    seen_digit = true;
                }
                b'.' => {
                    if seen_point {
                        return Err(ParseDecimalError::InvalidLiteral(s.to_owned()));
                    }
                    seen_point = true;
                }
                b'e' | b'E' => break,
                _ => return Err(ParseDecimalError::InvalidLiteral(s.to_owned())),
            }
            i += 1;
        }
        let mut exp: i64 = 0;
        if i < rb.len() {
            i += 1;
            let mut exp_negative = false;
            if i < rb.len() && (rb[i] == b'+' || rb[i] == b'-') {
                exp_negative = rb[i] == b'-';
                i += 1;
            }
            let mut any = false;
            let mut acc: i64 = 0;
            while i < rb.len() {
                match rb[i] {
                    b'0'..=b'9' => {
                        any = true;
                        acc = acc.saturating_mul(10).saturating_add((rb[i] - b'0') as i64);
                    }
                    _ => return Err(ParseDecimalError::InvalidLiteral(s.to_owned())),
                }
                i += 1;
            }
            if !any {
                return Err(ParseDecimalError::InvalidLiteral(s.to_owned()));
            }
            exp = if exp_negative { -acc } else { acc };
        }
        if !seen_digit {
            return Err(ParseDecimalError::InvalidLiteral(s.to_owned()));
        }
        exp -= frac_len;

        let first_nonzero = digits.iter().position(|&d| d != 0).unwrap_or(digits.len());
        let sig = &digits[first_nonzero..];

        let mut coeff: u128;
        if sig.len() > MAX_DIGITS {
            // Round half-even past 34 significant digits.
            let excess = sig.len() - MAX_DIGITS;
            exp += excess as i64;
            coeff = fold_digits(&sig[..MAX_DIGITS]);
            let first_dropped = sig[MAX_DIGITS];
            let rest_nonzero = sig[MAX_DIGITS + 1..].iter().any(|&d| d != 0);
            if first_dropped > 5 || (first_dropped == 5 && (rest_nonzero || coeff % 2 == 1)) {
                coeff += 1;
                if coeff > MAX_COEFFICIENT {
                    coeff /= 10;
                    exp += 1;
                }
            }
        } else {
            coeff = fold_digits(sig);
        }

        // Clamp the exponent by scaling the coefficient where that stays
        // exact; anything further is out of range.
        while exp > EXPONENT_MAX as i64 && coeff != 0 && coeff <= MAX_COEFFICIENT / 10 {
            coeff *= 10;
            exp -= 1;
        }
        if exp > EXPONENT_MAX as i64 {
            if coeff != 0 {
                return Err(ParseDecimalError::ExponentOutOfRange(s.to_owned()));
            }
            exp = EXPONENT_MAX as i64;
        }
        while exp < EXPONENT_MIN as i64 && coeff != 0 && coeff % 10 == 0 {
            coeff /= 10;
            exp += 1;
        }
        if exp < EXPONENT_MIN as i64 {
            if coeff != 0 {
                return Err(ParseDecimalError::ExponentOutOfRange(s.to_owned()));
            }
            exp = EXPONENT_MIN as i64;
        }

        Ok(Self::from_parts(negative, coeff, exp as i32))
    }
}

fn fold_digits(digits: &[u8]) -> u128 {
    digits.iter().fold(0u128, |acc, &d| acc * 10 + d as u128)
}

impl fmt::Display for Decimal128 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.parts() {
            Parts::Nan => f.write_str("NaN"),
            Parts::Infinity { negative } => {
                f.write_str(if negative { "-Infinity" } else { "Infinity" })
            }
            Parts::Finite {
                negative,
                coeff,
                exp,
            } => {
                let digits = coeff.to_string();
                let adjusted = exp as i64 + digits.len() as i64 - 1;
                let mut out = String::new();
                if negative {
                    out.push('-');
                }
                if exp > 0 || adjusted < -6 {
                    // Scientific notation.
                    out.push_str(&digits[..1]);
                    if digits.len() > 1 {
                        out.push('.');
                        out.push_str(&digits[1..]);
                    }
                    out.push('E');
                    out.push_str(&format!("{adjusted:+}"));
                } else if exp == 0 {
                    out.push_str(&digits);
                } else {
                    let point = digits.len() as i64 + exp as i64;
                    if point > 0 {
                        out.push_str(&digits[..point as usize]);
                        out.push('.');
                        out.push_str(&digits[point as usize..]);
                    } else {
                        out.push_str("0.");
                        for _ in 0..-point {
                            out.push('0');
                        }
                        out.push_str(&digits);
                    }
                }
                f.write_str(&out)
            }
        }
    }
}

impl fmt::Debug for Decimal128 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Decimal128({self})")
    }
}
