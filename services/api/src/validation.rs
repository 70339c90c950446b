//! Input validation utilities

use regex::Regex;
use rust_decimal::Decimal;
use std::sync::OnceLock;

use crate::error::ApiError;

/// Lowest year accepted by the monthly summary
pub const MIN_SUMMARY_YEAR: i32 = 2000;
/// Highest year accepted by the monthly summary
pub const MAX_SUMMARY_YEAR: i32 = 2100;

/// 10^10, the first amount that no longer fits NUMERIC(12, 2)
const MAX_AMOUNT: Decimal = Decimal::from_parts(1_410_065_408, 2, 0, false, 0);

/// Validate a contribution amount: positive, at most two decimal places,
/// below the storage bound
pub fn validate_amount(amount: Decimal) -> Result<Decimal, ApiError> {
    if amount <= Decimal::ZERO {
        return Err(ApiError::validation("Amount must be a number greater than 0"));
    }

    let amount = amount.normalize();
    if amount.scale() > 2 {
        return Err(ApiError::validation(
            "Amount must have at most two decimal places",
        ));
    }

    if amount >= MAX_AMOUNT {
        return Err(ApiError::validation("Amount is too large"));
    }

    Ok(amount)
}

/// Validate a summary year
pub fn validate_year(year: i32) -> Result<i32, ApiError> {
    if !(MIN_SUMMARY_YEAR..=MAX_SUMMARY_YEAR).contains(&year) {
        return Err(ApiError::validation(format!(
            "Year must be between {} and {}",
            MIN_SUMMARY_YEAR, MAX_SUMMARY_YEAR
        )));
    }
    Ok(year)
}

/// Validate username
pub fn validate_username(username: &str) -> Result<String, ApiError> {
    let username = username.trim();

    if username.is_empty() {
        return Err(ApiError::validation("Username is required"));
    }

    if username.chars().count() < 3 {
        return Err(ApiError::validation(
            "Username must be at least 3 characters long",
        ));
    }

    if username.chars().count() > 32 {
        return Err(ApiError::validation(
            "Username must be at most 32 characters long",
        ));
    }

    static USERNAME_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = USERNAME_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9_. ]+$").expect("Failed to compile username regex")
    });

    if !regex.is_match(username) {
        return Err(ApiError::validation(
            "Username can only contain letters, numbers, spaces, dots and underscores",
        ));
    }

    Ok(username.to_string())
}

/// Normalise a phone number to E.164, defaulting to the South African
/// country code for local numbers
pub fn normalize_phone(phone: &str) -> Result<String, ApiError> {
    let digits: String = phone
        .trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
        .collect();

    if digits.is_empty() {
        return Err(ApiError::validation("Phone number is required"));
    }

    let e164 = if let Some(rest) = digits.strip_prefix('+') {
        format!("+{}", rest)
    } else if let Some(rest) = digits.strip_prefix('0') {
        format!("+27{}", rest)
    } else if digits.starts_with("27") {
        format!("+{}", digits)
    } else {
        format!("+27{}", digits)
    };

    static E164_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = E164_REGEX
        .get_or_init(|| Regex::new(r"^\+[1-9][0-9]{7,14}$").expect("Failed to compile phone regex"));

    // South African numbers carry exactly nine digits after the country code.
    let za_ok = !e164.starts_with("+27") || e164.len() == 12;

    if !regex.is_match(&e164) || !za_ok {
        return Err(ApiError::validation("Invalid phone number"));
    }

    Ok(e164)
}

/// Trim an optional free-text field, mapping blank input to `None`
pub fn clean_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn amount_must_be_positive() {
        assert!(validate_amount(Decimal::ZERO).is_err());
        assert!(validate_amount(Decimal::from(-5)).is_err());
        assert_eq!(validate_amount(Decimal::from(500)).unwrap(), Decimal::from(500));
    }

    #[test]
    fn amount_precision_is_cents() {
        assert!(validate_amount(Decimal::from_str("10.25").unwrap()).is_ok());
        assert!(validate_amount(Decimal::from_str("10.255").unwrap()).is_err());
        // trailing zeros do not count as precision
        assert!(validate_amount(Decimal::from_str("10.2500").unwrap()).is_ok());
    }

    #[test]
    fn amount_upper_bound() {
        assert!(validate_amount(Decimal::from_str("9999999999.99").unwrap()).is_ok());
        assert!(validate_amount(Decimal::from(10_000_000_000_i64)).is_err());
    }

    #[test]
    fn year_bounds() {
        assert!(validate_year(1999).is_err());
        assert!(validate_year(2000).is_ok());
        assert!(validate_year(2025).is_ok());
        assert!(validate_year(2100).is_ok());
        assert!(validate_year(2101).is_err());
        assert!(validate_year(25).is_err());
    }

    #[test]
    fn usernames() {
        assert_eq!(validate_username("  Thandi M ").unwrap(), "Thandi M");
        assert!(validate_username("ab").is_err());
        assert!(validate_username("").is_err());
        assert!(validate_username("drop;table").is_err());
        assert!(validate_username(&"x".repeat(33)).is_err());
    }

    #[test]
    fn phone_numbers_normalise_to_e164() {
        assert_eq!(normalize_phone("0821234567").unwrap(), "+27821234567");
        assert_eq!(normalize_phone("27821234567").unwrap(), "+27821234567");
        assert_eq!(normalize_phone("821234567").unwrap(), "+27821234567");
        assert_eq!(normalize_phone("+27 82 123 4567").unwrap(), "+27821234567");
        assert_eq!(normalize_phone("+447911123456").unwrap(), "+447911123456");
    }

    #[test]
    fn malformed_phone_numbers_are_rejected() {
        assert!(normalize_phone("").is_err());
        assert!(normalize_phone("082123").is_err());
        assert!(normalize_phone("08212345678").is_err());
        assert!(normalize_phone("phone").is_err());
    }

    #[test]
    fn blank_text_becomes_none() {
        assert_eq!(clean_text(Some("  ".to_string())), None);
        assert_eq!(clean_text(Some(" paid cash ".to_string())), Some("paid cash".to_string()));
        assert_eq!(clean_text(None), None);
    }
}
