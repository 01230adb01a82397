/// Authentication module
///
/// Password hashing, bearer header parsing, signed access tokens,
/// opaque refresh tokens, and the session service that ties them together.

mod bearer;
mod claims;
mod jwt;
mod password;
mod principal;
pub(crate) mod refresh_token;
mod session;

pub use bearer::{extract_bearer_token, BearerError};
pub use claims::Claims;
pub use jwt::{
    clamp_ttl, AccessTokenCodec, AccessTokenError, DEFAULT_ACCESS_TOKEN_TTL_SECONDS, TOKEN_ISSUER,
};
pub use password::{
    validate_password_policy, PasswordError, PasswordHasher, DEFAULT_HASH_COST, MAX_SECRET_BYTES,
};
pub use principal::Principal;
pub use refresh_token::{
    generate_refresh_token, hash_token, RefreshToken, RefreshTokenLookup, RefreshTokenStore,
    StoreError, REFRESH_TOKEN_TTL_DAYS,
};
pub use session::{AuthSessionService, LoginOutcome, SessionError};
