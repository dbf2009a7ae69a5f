//! Exact conversion between decimal strings and integer base units.
//!
//! Scales: 8 (satoshi), 18 (wei), 9 (lamport). Arithmetic is done on
//! [`U256`] only; decimal strings are for display and storage.

use alloy::primitives::U256;

use crate::error::{SendError, SendResult};

/// `10^scale`, or `None` past the range of [`U256`].
pub fn pow10(scale: u32) -> Option<U256> {
    let ten = U256::from(10u8);
    (0..scale).try_fold(U256::from(1u8), |acc, _| acc.checked_mul(ten))
}

/// Parses a plain decimal amount into base units.
///
/// Accepts `digits` or `digits.digits`. More fractional digits than `scale`
/// is rejected rather than rounded.
pub fn to_base_units(amount: &str, scale: u32) -> SendResult<U256> {
    if amount.is_empty() {
        return Err(SendError::InvalidAmount("amount is empty".to_string()));
    }
    if amount.starts_with('-') {
        return Err(SendError::InvalidAmount(format!(
            "'{}' is negative",
            amount
        )));
    }

    let (whole, fraction) = match amount.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (amount, None),
    };

    if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
        return Err(SendError::InvalidAmount(format!(
            "'{}' is not a decimal number",
            amount
        )));
    }
    let fraction = fraction.unwrap_or("");
    if amount.contains('.') && fraction.is_empty() {
        return Err(SendError::InvalidAmount(format!(
            "'{}' has an empty fractional part",
            amount
        )));
    }
    if !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return Err(SendError::InvalidAmount(format!(
            "'{}' is not a decimal number",
            amount
        )));
    }
    if fraction.len() > scale as usize {
        return Err(SendError::InvalidAmount(format!(
            "'{}' has more than {} decimal places",
            amount, scale
        )));
    }

    let overflow = || SendError::InvalidAmount(format!("'{}' overflows 256 bits", amount));

    let multiplier = pow10(scale).ok_or_else(overflow)?;
    let fraction_multiplier = pow10(scale - fraction.len() as u32).ok_or_else(overflow)?;

    let whole_units = parse_digits(whole).ok_or_else(overflow)?;
    let fraction_units = if fraction.is_empty() {
        U256::ZERO
    } else {
        parse_digits(fraction).ok_or_else(overflow)?
    };

    whole_units
        .checked_mul(multiplier)
        .and_then(|w| {
            fraction_units
                .checked_mul(fraction_multiplier)
                .and_then(|f| w.checked_add(f))
        })
        .ok_or_else(overflow)
}

fn parse_digits(digits: &str) -> Option<U256> {
    let ten = U256::from(10u8);
    digits.bytes().try_fold(U256::ZERO, |acc, b| {
        acc.checked_mul(ten)?.checked_add(U256::from(b - b'0'))
    })
}

/// Canonical decimal form: no trailing fractional zeros, `"0"` for zero.
///
/// `to_decimal_string(to_base_units(s)?)` returns `s` only when `s` is
/// already canonical; `"01"` and `"0.10"` come back as `"1"` and `"0.1"`.
/// Going the other way, base units always survive the round trip.
pub fn to_decimal_string(value: U256, scale: u32) -> String {
    let digits = value.to_string();
    let scale = scale as usize;
    if scale == 0 {
        return digits;
    }

    let padded = if digits.len() <= scale {
        format!("{}{}", "0".repeat(scale + 1 - digits.len()), digits)
    } else {
        digits
    };
    let (whole, fraction) = padded.split_at(padded.len() - scale);
    let fraction = fraction.trim_end_matches('0');

    if fraction.is_empty() {
        whole.to_string()
    } else {
        format!("{}.{}", whole, fraction)
    }
}

/// Fixed-width display form rounded half-up to `display_scale` places.
pub fn to_display_string(value: U256, scale: u32, display_scale: u32) -> String {
    if display_scale >= scale {
        return to_decimal_string(value, scale);
    }

    let Some(divisor) = pow10(scale - display_scale) else {
        return "0".to_string();
    };
    let quotient = value / divisor;
    let remainder = value % divisor;
    let rounded = if remainder.saturating_mul(U256::from(2u8)) >= divisor {
        quotient.saturating_add(U256::from(1u8))
    } else {
        quotient
    };

    let digits = rounded.to_string();
    let width = display_scale as usize;
    if width == 0 {
        return digits;
    }
    let padded = if digits.len() <= width {
        format!("{}{}", "0".repeat(width + 1 - digits.len()), digits)
    } else {
        digits
    };
    let (whole, fraction) = padded.split_at(padded.len() - width);
    format!("{}.{}", whole, fraction)
}

/// Narrows base units to `u64` for chains whose wire format uses 64-bit values.
pub fn to_u64(value: U256, what: &str) -> SendResult<u64> {
    u64::try_from(value).map_err(|_| {
        SendError::InvalidAmount(format!("{} {} does not fit in 64 bits", what, value))
    })
}

/// Narrows base units to `u128` (EVM gas prices).
pub fn to_u128(value: U256, what: &str) -> SendResult<u128> {
    u128::try_from(value).map_err(|_| {
        SendError::InvalidAmount(format!("{} {} does not fit in 128 bits", what, value))
    })
}
