/// JWT Claims structure
///
/// Represents the payload of an access token: the issuing service, the
/// principal it speaks for, and its validity window (RFC 7519).

use serde::{Deserialize, Serialize};

use crate::auth::principal::Principal;

/// JWT Claims for access tokens
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Issuer
    pub iss: String,
    /// Subject (principal as UUID string)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    /// Create claims valid from now for `expiry_seconds`
    ///
    /// # Arguments
    /// * `principal` - Subject of the token
    /// * `expiry_seconds` - Token lifetime in seconds from now
    /// * `issuer` - Issuer identifier
    pub fn new(principal: Principal, expiry_seconds: i64, issuer: &str) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            iss: issuer.to_string(),
            sub: principal.to_string(),
            iat: now,
            exp: now + expiry_seconds,
        }
    }

    /// Parse the subject back into a principal
    ///
    /// Returns `None` if the subject is empty or not a UUID.
    pub fn principal(&self) -> Option<Principal> {
        if self.sub.is_empty() {
            return None;
        }
        self.sub.parse().ok()
    }
}
