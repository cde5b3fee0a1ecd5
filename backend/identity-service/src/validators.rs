/// Input validation utilities for identity service
use once_cell::sync::Lazy;
use regex::Regex;
use validator::ValidationError;

// Compiled once; both patterns are constants
static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
        .expect("hardcoded email regex is invalid - fix source code")
});

// Optional +55, area code, 8 or 9 digit subscriber number
static PHONE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(55)?[1-9][0-9]9?[0-9]{8}$")
        .expect("hardcoded phone regex is invalid - fix source code")
});

/// Validate email format (RFC 5322 simplified)
pub fn validate_email(email: &str) -> bool {
    !email.is_empty() && email.len() <= 254 && EMAIL_REGEX.is_match(email.trim())
}

/// Canonical form used for uniqueness checks and lookups
pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

/// validator crate compatible custom validator for email shape
pub fn validate_email_shape_validator(email: &str) -> Result<(), ValidationError> {
    if validate_email(email) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_email"))
    }
}

/// Validate a Brazilian phone number, ignoring formatting characters
pub fn validate_phone(phone: &str) -> bool {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    PHONE_REGEX.is_match(&digits)
}

/// validator crate compatible custom validator for phone shape
pub fn validate_phone_shape_validator(phone: &str) -> Result<(), ValidationError> {
    if phone.trim().is_empty() || validate_phone(phone) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_phone"))
    }
}
