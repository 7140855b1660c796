//! Money calculation utilities using rust_decimal for precision
//!
//! All arithmetic on monetary values goes through `Decimal` internally, then
//! converts back to `f64` for storage/serialization.

use rust_decimal::prelude::*;

/// Rounding to 2 decimal places, half-up
const DECIMAL_PLACES: u32 = 2;

/// Tolerance for monetary comparisons (0.01)
pub const MONEY_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Maximum allowed amount for a single payment or nightly rate (1,000,000)
pub const MAX_AMOUNT: f64 = 1_000_000.0;

/// Convert f64 to Decimal (lossless enough for 2-decimal money values)
pub fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or(Decimal::ZERO)
}

/// Convert Decimal back to f64, rounded to 2 places
pub fn to_f64(value: Decimal) -> f64 {
    value
        .round_dp(DECIMAL_PLACES)
        .to_f64()
        .unwrap_or(0.0)
}

/// Round an f64 monetary value to 2 places via Decimal
pub fn round_money(value: f64) -> f64 {
    to_f64(to_decimal(value))
}

/// Validate that an amount is finite, positive and within bounds
pub fn validate_amount(amount: f64, field_name: &str) -> Result<(), String> {
    if !amount.is_finite() {
        return Err(format!(
            "{} must be a finite number, got {}",
            field_name, amount
        ));
    }
    if amount <= 0.0 {
        return Err(format!("{} must be positive, got {}", field_name, amount));
    }
    if amount > MAX_AMOUNT {
        return Err(format!(
            "{} exceeds maximum allowed ({}), got {}",
            field_name, MAX_AMOUNT, amount
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_money_half_up() {
        assert_eq!(round_money(10.005), 10.01);
        assert_eq!(round_money(10.004), 10.0);
    }

    #[test]
    fn test_decimal_addition_avoids_float_drift() {
        // 0.1 + 0.2 != 0.3 in f64; via Decimal it is
        let sum = to_f64(to_decimal(0.1) + to_decimal(0.2));
        assert_eq!(sum, 0.3);
    }

    #[test]
    fn test_validate_amount_rejects_non_finite() {
        assert!(validate_amount(f64::NAN, "amount").is_err());
        assert!(validate_amount(f64::INFINITY, "amount").is_err());
    }

    #[test]
    fn test_validate_amount_rejects_zero_and_negative() {
        assert!(validate_amount(0.0, "amount").is_err());
        assert!(validate_amount(-5.0, "amount").is_err());
        assert!(validate_amount(5.0, "amount").is_ok());
    }

    #[test]
    fn test_validate_amount_rejects_over_max() {
        assert!(validate_amount(MAX_AMOUNT + 1.0, "amount").is_err());
    }
}
