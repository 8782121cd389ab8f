//! Directional rounding at currency precision.
//!
//! The three modes are not interchangeable:
//!
//! * [`round`] is used for every amount that ends up displayed as currency.
//! * [`ceil2`] is used when solving for the minimum user margin, so the
//!   solved rate can never fall short of the policy floor after rounding.
//! * [`floor2`] is used for reported overall margin multipliers, so the
//!   displayed figure never overstates what was actually achieved.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::types::{Money, Multiplier};

/// Currency precision (2 decimal places).
pub const DECIMAL_PLACES: u32 = 2;

/// Anything smaller than this in absolute value is treated as zero.
pub const ZERO_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 9);

/// Round half away from zero to 2 decimal places.
#[inline]
pub fn round(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// Round toward negative infinity at 2 decimal places.
#[inline]
pub fn floor2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::ToNegativeInfinity)
}

/// Round toward positive infinity at 2 decimal places.
#[inline]
pub fn ceil2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::ToPositiveInfinity)
}

#[inline]
pub fn is_zero(value: Decimal) -> bool {
    value.abs() < ZERO_TOLERANCE
}

/// Division that yields zero instead of failing when the denominator is
/// (near) zero. An empty calculation divides by zero as a matter of course.
#[inline]
pub fn safe_divide(numerator: Decimal, denominator: Decimal) -> Decimal {
    if is_zero(denominator) {
        Decimal::ZERO
    } else {
        numerator / denominator
    }
}

/// `floor2(1 + amount / base)`, or zero when there is no base to relate to.
///
/// Used for the overall margin multiplier, both on the first pass and after
/// an adjustment.
pub fn floor_multiplier(amount: Money, base: Money) -> Multiplier {
    if is_zero(base) {
        Decimal::ZERO
    } else {
        floor2(Decimal::ONE + amount / base)
    }
}
