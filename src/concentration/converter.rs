//! Concentration conversion and form-value parsing
//!
//! Converts concentrations to and from ng/µL and reads numeric form fields the
//! way a browser form handler would.

use super::units::ng_per_ul_factor;

/// Convert a concentration in the given unit to ng/µL
///
/// Total: an unrecognized unit tag is treated as already being ng/µL.
pub fn convert_to_ng_per_ul(value: f64, unit: &str) -> f64 {
    match ng_per_ul_factor(unit) {
        Some(factor) => value * factor,
        None => {
            tracing::debug!("Unrecognized concentration unit '{}', treating as ng/µL", unit);
            value
        }
    }
}

/// Convert a concentration in ng/µL to the given unit
///
/// Mirrors [`convert_to_ng_per_ul`], including the identity fallback.
pub fn convert_from_ng_per_ul(value: f64, unit: &str) -> f64 {
    match ng_per_ul_factor(unit) {
        Some(factor) => value / factor,
        None => value,
    }
}

/// Convert a concentration between two unit tags
pub fn convert_concentration(value: f64, from_unit: &str, to_unit: &str) -> f64 {
    convert_from_ng_per_ul(convert_to_ng_per_ul(value, from_unit), to_unit)
}

/// Parse a decimal form field
///
/// Reads the longest numeric prefix after leading whitespace, so `"12.5 ng"`
/// yields 12.5 and `"abc"` yields None. Non-finite results are rejected.
///
/// Unlike a browser's `parseFloat`, `"Infinity"` and overflowing values such
/// as `"1e999"` are not accepted: they can only produce infinite or NaN volumes.
///
/// Examples:
/// - "100" -> Some(100.0)
/// - "  .5" -> Some(0.5)
/// - "1e3x" -> Some(1000.0)
/// - "-" -> None
pub fn parse_form_number(input: &str) -> Option<f64> {
    let s = input.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end += 1;
    }

    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut mantissa_digits = end - int_start;

    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        mantissa_digits += frac_end - frac_start;
        end = frac_end;
    }

    if mantissa_digits == 0 {
        return None;
    }

    // Exponent only counts when at least one digit follows it
    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && (bytes[exp_end] == b'+' || bytes[exp_end] == b'-') {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    s[..end].parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse an integer form field, truncating at the first non-digit
///
/// `"2"` and `"2.9"` both yield 2.
pub fn parse_form_integer(input: &str) -> Option<i64> {
    let s = input.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end += 1;
    }

    let digits_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }

    if end == digits_start {
        return None;
    }

    s[..end].parse::<i64>().ok()
}
