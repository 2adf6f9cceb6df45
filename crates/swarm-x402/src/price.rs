//! Conversions between decimal USD strings and token base units.
//!
//! Integer-only: amounts never pass through `f64`.

use alloy::primitives::U256;

use crate::error::ConfigError;

/// Parse a decimal USD amount ("$1.00", "0.01", "5") into token base units.
///
/// Digits beyond `decimals` are truncated, not rounded.
pub fn parse_usd_amount(price: &str, decimals: u32) -> Result<U256, ConfigError> {
    let cleaned = price.trim();
    let cleaned = cleaned.strip_prefix('$').unwrap_or(cleaned).trim();

    let invalid = |why: &str| ConfigError::InvalidPrice(format!("'{price}': {why}"));

    if cleaned.is_empty() {
        return Err(invalid("no numeric content"));
    }
    if !cleaned.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return Err(invalid("unexpected character"));
    }

    let (integer_part, fractional_part) = cleaned.split_once('.').unwrap_or((cleaned, ""));
    if fractional_part.contains('.') {
        return Err(invalid("more than one decimal point"));
    }
    if integer_part.is_empty() && fractional_part.is_empty() {
        return Err(invalid("no digits"));
    }

    let decimals_usize = decimals as usize;
    let mut frac = fractional_part
        .get(..decimals_usize.min(fractional_part.len()))
        .unwrap_or_default()
        .to_string();
    while frac.len() < decimals_usize {
        frac.push('0');
    }

    let integer = if integer_part.is_empty() {
        U256::ZERO
    } else {
        integer_part
            .parse::<U256>()
            .map_err(|e| invalid(&format!("integer part: {e}")))?
    };
    let fractional = if frac.is_empty() {
        U256::ZERO
    } else {
        frac.parse::<U256>()
            .map_err(|e| invalid(&format!("fractional part: {e}")))?
    };

    let multiplier = U256::from(10u64).pow(U256::from(decimals));
    integer
        .checked_mul(multiplier)
        .and_then(|v| v.checked_add(fractional))
        .ok_or_else(|| invalid("overflow"))
}

/// Render base units as dollars: at least two decimals, trailing zeros trimmed
/// beyond that (`10000` → `$0.01`, `1000` → `$0.001`, `1500000` → `$1.50`).
pub fn format_usd_amount(amount: U256, decimals: u32) -> String {
    let divisor = U256::from(10u64).pow(U256::from(decimals));
    let whole = amount / divisor;
    let remainder = amount % divisor;

    let mut frac = if decimals == 0 {
        String::new()
    } else {
        let digits = remainder.to_string();
        "0".repeat((decimals as usize).saturating_sub(digits.len())) + &digits
    };
    while frac.len() > 2 && frac.ends_with('0') {
        frac.pop();
    }
    while frac.len() < 2 {
        frac.push('0');
    }
    format!("${whole}.{frac}")
}
