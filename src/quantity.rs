// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Kubernetes resource quantity parsing.
//!
//! Only what sizing the OS disk needs: turning a quantity string such as
//! `120Gi`, `1.5Ti`, `500G`, `34359738368` or `1e9` into a byte count.
//! Fractional results are rounded up, matching `resource.Quantity.Value()`.

use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use thiserror::Error;

/// Bytes in one GiB.
pub const GIB: i64 = 1 << 30;

/// Errors returned when a quantity cannot be interpreted.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QuantityError {
    /// The string is empty.
    #[error("quantity is empty")]
    Empty,

    /// The numeric part is not a number.
    #[error("quantity '{0}' has an invalid number")]
    InvalidNumber(String),

    /// The suffix is not a known SI, binary SI or exponent suffix.
    #[error("quantity '{quantity}' has an unknown suffix '{suffix}'")]
    UnknownSuffix {
        /// The whole quantity string
        quantity: String,
        /// The unrecognised suffix
        suffix: String,
    },

    /// The value does not fit in an `i64`.
    #[error("quantity '{0}' is out of range")]
    OutOfRange(String),
}

/// Multiplier for a quantity suffix.
fn suffix_multiplier(suffix: &str) -> Option<f64> {
    let multiplier = match suffix {
        "" => 1.0,
        "m" => 1e-3,
        "k" => 1e3,
        "M" => 1e6,
        "G" => 1e9,
        "T" => 1e12,
        "P" => 1e15,
        "E" => 1e18,
        "Ki" => 1024.0,
        "Mi" => 1024.0_f64.powi(2),
        "Gi" => 1024.0_f64.powi(3),
        "Ti" => 1024.0_f64.powi(4),
        "Pi" => 1024.0_f64.powi(5),
        "Ei" => 1024.0_f64.powi(6),
        _ => return None,
    };
    Some(multiplier)
}

/// Parse a quantity string into its integer value, rounding up.
///
/// # Errors
///
/// Returns a [`QuantityError`] when the string is empty, malformed, uses an
/// unknown suffix or overflows `i64`.
pub fn parse_quantity(raw: &str) -> Result<i64, QuantityError> {
    let quantity = raw.trim();
    if quantity.is_empty() {
        return Err(QuantityError::Empty);
    }

    let split = quantity
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '+' || c == '-'))
        .unwrap_or(quantity.len());
    let (number, suffix) = quantity.split_at(split);

    let mantissa: f64 = number
        .parse()
        .map_err(|_| QuantityError::InvalidNumber(quantity.to_string()))?;

    // `1e3` is a decimal exponent, `1E` alone is the exa suffix.
    let multiplier = match suffix_multiplier(suffix) {
        Some(multiplier) => multiplier,
        None => {
            let exponent = suffix
                .strip_prefix('e')
                .or_else(|| suffix.strip_prefix('E'))
                .and_then(|exp| exp.parse::<i32>().ok())
                .ok_or_else(|| QuantityError::UnknownSuffix {
                    quantity: quantity.to_string(),
                    suffix: suffix.to_string(),
                })?;
            10f64.powi(exponent)
        }
    };

    let value = (mantissa * multiplier).ceil();
    if !value.is_finite() || value > i64::MAX as f64 || value < i64::MIN as f64 {
        return Err(QuantityError::OutOfRange(quantity.to_string()));
    }

    #[allow(clippy::cast_possible_truncation)]
    Ok(value as i64)
}

/// Byte value of a Kubernetes [`Quantity`].
///
/// # Errors
///
/// See [`parse_quantity`].
pub fn quantity_bytes(quantity: &Quantity) -> Result<i64, QuantityError> {
    parse_quantity(&quantity.0)
}
