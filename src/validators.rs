/// Input validators for account registration
///
/// Login deliberately skips these checks: a malformed email simply finds no
/// account and fails like any other bad credential.

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321
const MIN_EMAIL_LENGTH: usize = 3;

lazy_static! {
    // RFC 5322 simplified email regex (practical validation)
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
    ).expect("email regex compiles");
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EmailError {
    #[error("email is empty")]
    Empty,
    #[error("email is too short (minimum 3 characters)")]
    TooShort,
    #[error("email is too long (maximum 254 characters)")]
    TooLong,
    #[error("email has invalid format")]
    InvalidFormat,
}

/// Validates an email address and returns it trimmed
pub fn is_valid_email(email: &str) -> Result<String, EmailError> {
    let trimmed = email.trim();

    if trimmed.is_empty() {
        return Err(EmailError::Empty);
    }

    if trimmed.len() < MIN_EMAIL_LENGTH {
        return Err(EmailError::TooShort);
    }

    if trimmed.len() > MAX_EMAIL_LENGTH {
        return Err(EmailError::TooLong);
    }

    if !EMAIL_REGEX.is_match(trimmed) {
        return Err(EmailError::InvalidFormat);
    }

    Ok(trimmed.to_string())
}
