//! Coercion policy for host-to-native numeric conversion.
//!
//! The defaults follow Web IDL: integers wrap modulo 2^bits, `NaN` becomes
//! zero, and only number values are accepted for numeric types. Every knob is
//! configurable (see `[coercion]` in `widl-nan.toml`) and the same policy is
//! used to render the C++ decode helpers and by the in-process binding layer.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What happens to `NaN` (and, when wrapping, infinities) converted to an
/// integer type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntegerNan {
    /// Convert to `0`.
    #[default]
    Zero,
    /// Fail with a type mismatch.
    Reject,
}

/// What happens to a number outside the range of the target integer type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntegerOverflow {
    /// Truncate, then reduce modulo 2^bits.
    #[default]
    Wrap,
    /// Round half to even, then clamp to the type's range.
    Clamp,
    /// Truncate and fail when out of range.
    Reject,
}

/// Configurable coercion rules shared by codegen and the host layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CoercionPolicy {
    /// Accept strings that parse as numbers for numeric types.
    pub numeric_strings: bool,
    /// With `numeric_strings`, accept a blank string as `0`.
    pub empty_string_as_zero: bool,
    pub integer_nan: IntegerNan,
    pub integer_overflow: IntegerOverflow,
}

impl CoercionPolicy {
    /// Web IDL `[EnforceRange]` semantics: reject anything not exactly representable.
    pub fn strict() -> Self {
        Self {
            numeric_strings: false,
            empty_string_as_zero: false,
            integer_nan: IntegerNan::Reject,
            integer_overflow: IntegerOverflow::Reject,
        }
    }

    pub fn with_numeric_strings(mut self) -> Self {
        self.numeric_strings = true;
        self
    }

    pub fn with_overflow(mut self, overflow: IntegerOverflow) -> Self {
        self.integer_overflow = overflow;
        self
    }

    pub fn with_nan(mut self, nan: IntegerNan) -> Self {
        self.integer_nan = nan;
        self
    }
}

/// Why a dynamic value could not be decoded into native storage.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    #[error("expected a number but got {0}")]
    NotNumeric(&'static str),
    #[error("the string {0:?} is not numeric")]
    NonNumericString(String),
    #[error("the value is not a finite number")]
    NonFinite,
    #[error("{0} is outside the range of the target type")]
    OutOfRange(f64),
}

/// Bit width and signedness of an integer type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IntegerRange {
    pub bits: u32,
    pub signed: bool,
}

/// Largest integer the host's number type represents exactly.
pub const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

impl IntegerRange {
    pub const fn signed(bits: u32) -> Self {
        Self { bits, signed: true }
    }

    pub const fn unsigned(bits: u32) -> Self {
        Self {
            bits,
            signed: false,
        }
    }

    /// Lower bound used by `clamp` and `reject`. 64-bit types are limited to
    /// the host's safe-integer range.
    pub fn lower(&self) -> f64 {
        match (self.signed, self.bits) {
            (false, _) => 0.0,
            (true, 64) => -MAX_SAFE_INTEGER,
            (true, bits) => -(2f64.powi(bits as i32 - 1)),
        }
    }

    /// Upper bound used by `clamp` and `reject`.
    pub fn upper(&self) -> f64 {
        match (self.signed, self.bits) {
            (_, 64) => MAX_SAFE_INTEGER,
            (true, bits) => 2f64.powi(bits as i32 - 1) - 1.0,
            (false, bits) => 2f64.powi(bits as i32) - 1.0,
        }
    }

    pub fn contains_signed(&self, v: i64) -> bool {
        if !self.signed {
            return v >= 0 && self.contains_unsigned(v as u64);
        }
        if self.bits >= 64 {
            return true;
        }
        let half = 1i64 << (self.bits - 1);
        (-half..half).contains(&v)
    }

    pub fn contains_unsigned(&self, v: u64) -> bool {
        if self.signed {
            return i64::try_from(v).is_ok_and(|v| self.contains_signed(v));
        }
        self.bits >= 64 || v < (1u64 << self.bits)
    }
}

/// An integer produced by conversion, before it is tagged as native storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Converted {
    Signed(i64),
    Unsigned(u64),
}

/// Reduce an integral number modulo 2^64, two's complement for negatives.
fn wrap_to_u64(number: f64) -> u64 {
    let reduced = number.trunc() % 18_446_744_073_709_551_616.0;
    let magnitude = reduced.abs() as u64;
    if reduced < 0.0 {
        magnitude.wrapping_neg()
    } else {
        magnitude
    }
}

/// Narrow a 64-bit pattern to the target width, reinterpreting the sign.
fn narrow(bits: u64, range: IntegerRange) -> Converted {
    match (range.signed, range.bits) {
        (true, 8) => Converted::Signed(i64::from(bits as i8)),
        (true, 16) => Converted::Signed(i64::from(bits as i16)),
        (true, 32) => Converted::Signed(i64::from(bits as i32)),
        (true, _) => Converted::Signed(bits as i64),
        (false, 8) => Converted::Unsigned(u64::from(bits as u8)),
        (false, 16) => Converted::Unsigned(u64::from(bits as u16)),
        (false, 32) => Converted::Unsigned(u64::from(bits as u32)),
        (false, _) => Converted::Unsigned(bits),
    }
}

fn from_exact(value: f64, range: IntegerRange) -> Converted {
    if range.signed {
        Converted::Signed(value as i64)
    } else {
        Converted::Unsigned(value as u64)
    }
}

fn zero(range: IntegerRange) -> Converted {
    from_exact(0.0, range)
}

/// Convert a host number to an integer of the given range under `policy`.
pub fn convert_to_integer(
    number: f64,
    range: IntegerRange,
    policy: &CoercionPolicy,
) -> Result<Converted, DecodeError> {
    if number.is_nan() {
        return match policy.integer_nan {
            IntegerNan::Zero => Ok(zero(range)),
            IntegerNan::Reject => Err(DecodeError::NonFinite),
        };
    }

    match policy.integer_overflow {
        IntegerOverflow::Wrap => {
            if number.is_infinite() {
                return match policy.integer_nan {
                    IntegerNan::Zero => Ok(zero(range)),
                    IntegerNan::Reject => Err(DecodeError::NonFinite),
                };
            }
            Ok(narrow(wrap_to_u64(number), range))
        }
        IntegerOverflow::Clamp => {
            let clamped = number.clamp(range.lower(), range.upper());
            Ok(from_exact(clamped.round_ties_even(), range))
        }
        IntegerOverflow::Reject => {
            if number.is_infinite() {
                return Err(DecodeError::NonFinite);
            }
            let truncated = number.trunc();
            if truncated < range.lower() || truncated > range.upper() {
                return Err(DecodeError::OutOfRange(number));
            }
            Ok(from_exact(truncated, range))
        }
    }
}
