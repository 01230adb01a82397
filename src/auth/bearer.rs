/// Bearer credential extraction
///
/// Parses an `Authorization` header value of the form `Bearer <token>`.
/// The token itself is returned untouched; checking it is the job of the
/// access-token codec or the refresh-token store.

use thiserror::Error;

const BEARER_SCHEME: &str = "Bearer";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BearerError {
    #[error("authorization header is missing")]
    MissingHeader,
    #[error("authorization header is not `<scheme> <token>`")]
    MalformedHeader,
    #[error("authorization scheme is not Bearer")]
    UnsupportedScheme,
    #[error("bearer token is empty")]
    EmptyToken,
}

/// Extract the bearer token from a header value
///
/// # Errors
/// - `MissingHeader` if the header is absent, empty or only whitespace
/// - `MalformedHeader` unless it splits into exactly two fields
/// - `UnsupportedScheme` if the first field is not exactly `Bearer`
/// - `EmptyToken` if the token field is empty
pub fn extract_bearer_token(header_value: Option<&str>) -> Result<&str, BearerError> {
    let value = match header_value {
        Some(value) if !value.trim().is_empty() => value,
        _ => return Err(BearerError::MissingHeader),
    };

    // Every whitespace character is a separator, so `"Bearer "` carries an
    // empty token field and `"Bearer  abc"` carries three fields
    let fields: Vec<&str> = value.split(char::is_whitespace).collect();
    let [scheme, token] = fields.as_slice() else {
        return Err(BearerError::MalformedHeader);
    };

    if *scheme != BEARER_SCHEME {
        return Err(BearerError::UnsupportedScheme);
    }

    if token.is_empty() {
        return Err(BearerError::EmptyToken);
    }

    Ok(*token)
}
