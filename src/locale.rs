// Locale Normalizer
// Canonicalizes numbers written in international ("1234.56") or Brazilian
// ("1.234,56") notation and dates in the single accepted YYYY-MM-DD form.

use crate::error::FieldError;
use chrono::NaiveDate;

/// Largest integer an f64 can hold without losing precision (2^53)
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

// ============================================================================
// NUMBERS
// ============================================================================

/// Strip currency symbols, spaces and letters, then resolve the separators.
///
/// - `.` and `,` both present: `.` is the thousands separator, `,` the decimal one
/// - only `,` present: it is the decimal separator
/// - only `.` or neither: used as-is
///
/// A `-` survives only in leading position.
pub fn clean_numeric(raw: &str) -> String {
    let mut cleaned = String::with_capacity(raw.len());

    for c in raw.trim().chars() {
        match c {
            '0'..='9' | '.' | ',' => cleaned.push(c),
            '-' if cleaned.is_empty() => cleaned.push(c),
            _ => {}
        }
    }

    if cleaned.contains(',') && cleaned.contains('.') {
        // 1.234,56 -> 1234.56
        cleaned = cleaned.replace('.', "").replace(',', ".");
    } else if cleaned.contains(',') {
        // 1234,56 -> 1234.56
        cleaned = cleaned.replace(',', ".");
    }

    cleaned
}

/// Parse a required decimal. Blank input is an error here.
pub fn parse_decimal(raw: &str) -> Result<f64, FieldError> {
    let cleaned = clean_numeric(raw);

    match cleaned.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(FieldError::InvalidNumber(raw.to_string())),
    }
}

/// Parse an optional decimal: absent or blank means zero
pub fn parse_optional_decimal(raw: Option<&str>) -> Result<f64, FieldError> {
    match raw {
        Some(value) if !value.trim().is_empty() => parse_decimal(value),
        _ => Ok(0.0),
    }
}

/// Parse a required whole number. "12,0" and "1.000,00" are accepted, "12,5" is not.
pub fn parse_integer(raw: &str) -> Result<i64, FieldError> {
    let value =
        parse_decimal(raw).map_err(|_| FieldError::InvalidInteger(raw.to_string()))?;

    if value.fract() != 0.0 || value.abs() > MAX_EXACT_INTEGER {
        return Err(FieldError::InvalidInteger(raw.to_string()));
    }

    Ok(value as i64)
}

/// Parse an optional whole number: absent or blank means zero
pub fn parse_optional_integer(raw: Option<&str>) -> Result<i64, FieldError> {
    match raw {
        Some(value) if !value.trim().is_empty() => parse_integer(value),
        _ => Ok(0),
    }
}

/// Parse-with-fallback for cross-field checks.
///
/// Returns `(value, was_valid)`; a failed parse yields zero so business rules
/// can still run on the row.
pub fn decimal_or_zero(raw: Option<&str>) -> (f64, bool) {
    match parse_optional_decimal(raw) {
        Ok(value) => (value, true),
        Err(_) => (0.0, false),
    }
}

/// Integer counterpart of [`decimal_or_zero`]
pub fn integer_or_zero(raw: Option<&str>) -> (i64, bool) {
    match parse_optional_integer(raw) {
        Ok(value) => (value, true),
        Err(_) => (0, false),
    }
}

// ============================================================================
// DATES
// ============================================================================

/// Canonical date format at every boundary
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a date in exactly `YYYY-MM-DD` form that denotes a real calendar day
pub fn parse_date(raw: &str) -> Result<NaiveDate, FieldError> {
    let value = raw.trim();
    let invalid = || FieldError::InvalidDate(raw.to_string());

    if !has_date_shape(value) {
        return Err(invalid());
    }

    let year: i32 = value[0..4].parse().map_err(|_| invalid())?;
    let month: u32 = value[5..7].parse().map_err(|_| invalid())?;
    let day: u32 = value[8..10].parse().map_err(|_| invalid())?;

    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid)
}

/// `true` when `raw` is present, non-blank and a valid date
pub fn is_valid_date(raw: Option<&str>) -> bool {
    matches!(raw, Some(value) if parse_date(value).is_ok())
}

// 4 digits, dash, 2 digits, dash, 2 digits
fn has_date_shape(value: &str) -> bool {
    let bytes = value.as_bytes();
    bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_brazilian_thousands_and_decimal() {
        assert_eq!(parse_decimal("1.234,56").unwrap(), 1234.56);
        assert_eq!(parse_decimal("1234,56").unwrap(), 1234.56);
        assert_eq!(parse_decimal("1234.56").unwrap(), 1234.56);
    }

    #[test]
    fn test_currency_symbols_are_stripped() {
        assert_eq!(parse_decimal("R$ 1.500,00").unwrap(), 1500.0);
        assert_eq!(parse_decimal(" $ 99.90 ").unwrap(), 99.9);
        assert_eq!(parse_decimal("-R$ 10,5").unwrap(), -10.5);
    }

    #[test]
    fn test_minus_only_kept_in_leading_position() {
        assert_eq!(clean_numeric("-1.234,56"), "-1234.56");
        assert_eq!(clean_numeric("12-34"), "1234");
    }

    #[test]
    fn test_invalid_numbers() {
        assert!(matches!(parse_decimal("abc"), Err(FieldError::InvalidNumber(_))));
        assert!(matches!(parse_decimal("-"), Err(FieldError::InvalidNumber(_))));
        assert!(matches!(parse_decimal("1.2.3"), Err(FieldError::InvalidNumber(_))));
        assert!(matches!(parse_decimal(""), Err(FieldError::InvalidNumber(_))));
    }

    #[test]
    fn test_optional_blank_is_zero() {
        assert_eq!(parse_optional_decimal(None).unwrap(), 0.0);
        assert_eq!(parse_optional_decimal(Some("   ")).unwrap(), 0.0);
        assert_eq!(parse_optional_integer(Some("")).unwrap(), 0);
    }

    #[test]
    fn test_integers() {
        assert_eq!(parse_integer("42").unwrap(), 42);
        assert_eq!(parse_integer("1.000,00").unwrap(), 1000);
        assert_eq!(parse_integer("12,0").unwrap(), 12);
        assert!(matches!(parse_integer("12,5"), Err(FieldError::InvalidInteger(_))));
        assert!(matches!(parse_integer("doze"), Err(FieldError::InvalidInteger(_))));
    }

    #[test]
    fn test_fallback_helpers() {
        assert_eq!(integer_or_zero(Some("7")), (7, true));
        assert_eq!(integer_or_zero(Some("7.5")), (0, false));
        assert_eq!(integer_or_zero(None), (0, true));
        assert_eq!(decimal_or_zero(Some("x")), (0.0, false));
        assert_eq!(decimal_or_zero(Some("-3,5")), (-3.5, true));
    }

    #[test]
    fn test_dates() {
        assert_eq!(
            parse_date("2024-02-29").unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
        assert!(parse_date("2023-02-29").is_err());
        assert!(parse_date("2024-13-01").is_err());
        assert!(parse_date("31/12/2024").is_err());
        assert!(parse_date("2024-1-5").is_err());
        assert!(parse_date("2024/01/05").is_err());
        assert!(parse_date("").is_err());
    }

    #[test]
    fn test_is_valid_date() {
        assert!(is_valid_date(Some("2024-01-31")));
        assert!(!is_valid_date(Some("2024-01-32")));
        assert!(!is_valid_date(None));
    }
}
