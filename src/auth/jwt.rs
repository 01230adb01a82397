/// JWT Token Generation and Validation
///
/// Access tokens are HS256 JWTs signed with the server's signing secret.
/// They are stateless: nothing is persisted, and an issued token stays valid
/// until its `exp` even if the refresh token behind the session is revoked.
/// Revocation only stops future refreshes, so the access token lifetime is
/// capped at one hour.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Duration;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;

use crate::auth::claims::Claims;
use crate::auth::principal::Principal;

/// `iss` claim written into and required from every access token.
pub const TOKEN_ISSUER: &str = "chirpy";

/// Lifetime used when the caller asks for nothing or something out of range.
pub const DEFAULT_ACCESS_TOKEN_TTL_SECONDS: i64 = 3600;
const MIN_ACCESS_TOKEN_TTL_SECONDS: i64 = 1;
const MAX_ACCESS_TOKEN_TTL_SECONDS: i64 = 3600;

const SIGNING_ALGORITHM: Algorithm = Algorithm::HS256;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccessTokenError {
    #[error("token signature does not match")]
    BadSignature,
    #[error("token declares an unexpected signing algorithm")]
    AlgorithmMismatch,
    #[error("token issuer does not match")]
    IssuerMismatch,
    #[error("token has expired")]
    Expired,
    #[error("token is not valid yet")]
    NotYetValid,
    #[error("token subject is not a principal id")]
    InvalidSubject,
    #[error("token is malformed: {0}")]
    Malformed(String),
    #[error("token signing failed: {0}")]
    Signing(String),
}

/// Clamp a requested access token lifetime
///
/// Anything outside 1..=3600 seconds, or no request at all, becomes the
/// one hour default rather than an error.
pub fn clamp_ttl(requested_seconds: Option<i64>) -> Duration {
    let seconds = requested_seconds
        .filter(|s| (MIN_ACCESS_TOKEN_TTL_SECONDS..=MAX_ACCESS_TOKEN_TTL_SECONDS).contains(s))
        .unwrap_or(DEFAULT_ACCESS_TOKEN_TTL_SECONDS);
    Duration::seconds(seconds)
}

/// Issues and verifies access tokens with one signing secret
///
/// Built once at startup. Holds no mutable state, so a shared reference can
/// be used from any number of workers.
#[derive(Clone)]
pub struct AccessTokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl AccessTokenCodec {
    pub fn new(signing_secret: &SecretString) -> Self {
        let secret = signing_secret.expose_secret().as_bytes();

        let mut validation = Validation::new(SIGNING_ALGORITHM);
        validation.leeway = 0;
        validation.set_issuer(&[TOKEN_ISSUER]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Generate a new access token for a principal
    ///
    /// # Errors
    /// Returns error if token generation fails
    pub fn issue(&self, principal: Principal, ttl: Duration) -> Result<String, AccessTokenError> {
        let claims = Claims::new(principal, ttl.num_seconds(), TOKEN_ISSUER);
        self.sign(&claims)
    }

    /// Sign arbitrary claims with this codec's secret
    pub fn sign(&self, claims: &Claims) -> Result<String, AccessTokenError> {
        encode(&Header::new(SIGNING_ALGORITHM), claims, &self.encoding_key)
            .map_err(|e| AccessTokenError::Signing(e.to_string()))
    }

    /// Validate an access token and return the principal it was issued to
    ///
    /// # Errors
    /// Returns error if the token is tampered with, signed by another secret
    /// or algorithm, issued by someone else, outside its validity window, or
    /// names no valid principal
    pub fn verify(&self, token: &str) -> Result<Principal, AccessTokenError> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => AccessTokenError::BadSignature,
                ErrorKind::InvalidAlgorithm => AccessTokenError::AlgorithmMismatch,
                ErrorKind::InvalidIssuer => AccessTokenError::IssuerMismatch,
                ErrorKind::ExpiredSignature => AccessTokenError::Expired,
                ErrorKind::ImmatureSignature => AccessTokenError::NotYetValid,
                ErrorKind::MissingRequiredClaim(claim) if claim == "iss" => {
                    AccessTokenError::IssuerMismatch
                }
                ErrorKind::MissingRequiredClaim(claim) if claim == "sub" => {
                    AccessTokenError::InvalidSubject
                }
                // jsonwebtoken refuses to parse headers naming an algorithm
                // it does not know, `none` included
                _ => match declared_algorithm(token) {
                    Some(alg) if alg != "HS256" => AccessTokenError::AlgorithmMismatch,
                    _ => AccessTokenError::Malformed(e.to_string()),
                },
            })?;

        if claims.iat > chrono::Utc::now().timestamp() {
            return Err(AccessTokenError::NotYetValid);
        }

        claims.principal().ok_or(AccessTokenError::InvalidSubject)
    }
}

#[derive(Deserialize)]
struct RawHeader {
    alg: Option<String>,
}

/// The `alg` a token's header declares, read without any validation
fn declared_algorithm(token: &str) -> Option<String> {
    let segment = token.split('.').next()?;
    let bytes = URL_SAFE_NO_PAD.decode(segment).ok()?;
    serde_json::from_slice::<RawHeader>(&bytes).ok()?.alg
}
