//! Session lifecycle against the in-memory stores

use std::sync::Arc;

use chirpy::accounts::{Account, AccountStore};
use chirpy::auth::{
    AccessTokenCodec, AccessTokenError, AuthSessionService, Claims, PasswordHasher,
    RefreshTokenStore, SessionError, TOKEN_ISSUER,
};
use chirpy::persistence::{InMemoryAccountStore, InMemoryRefreshTokenStore};
use chrono::{Duration, Utc};
use secrecy::SecretString;

const SECRET: &str = "integration-signing-secret";
const EMAIL: &str = "walt@breakingbad.com";
const PASSWORD: &str = "04234-heisenberg";

struct TestSessions {
    service: AuthSessionService,
    refresh_tokens: Arc<InMemoryRefreshTokenStore>,
    codec: AccessTokenCodec,
    account: Account,
}

async fn setup() -> TestSessions {
    let hasher = PasswordHasher::new(4).expect("valid cost");
    let codec = AccessTokenCodec::new(&SecretString::from(SECRET));

    let accounts = Arc::new(InMemoryAccountStore::new());
    let digest = hasher.hash(PASSWORD).expect("hash");
    let account = accounts.create(EMAIL, &digest).await.expect("create account");

    let refresh_tokens = Arc::new(InMemoryRefreshTokenStore::new());
    let service = AuthSessionService::new(
        accounts,
        refresh_tokens.clone(),
        hasher,
        codec.clone(),
    )
    .expect("build session service");

    TestSessions {
        service,
        refresh_tokens,
        codec,
        account,
    }
}

#[tokio::test]
async fn login_issues_access_and_refresh_tokens() {
    let app = setup().await;

    let outcome = app
        .service
        .login(EMAIL, PASSWORD, None)
        .await
        .expect("login");

    assert!(!outcome.access_token.is_empty());
    assert!(!outcome.refresh_token.is_empty());
    assert_eq!(outcome.account.id, app.account.id);
    assert_eq!(outcome.account.email, EMAIL);

    let principal = app.codec.verify(&outcome.access_token).expect("verify");
    assert_eq!(principal, app.account.id);

    let stored = app
        .refresh_tokens
        .lookup_principal(&outcome.refresh_token)
        .await
        .expect("refresh token persisted");
    assert_eq!(stored.principal, app.account.id);
    assert!(stored.revoked_at.is_none());

    let expected_expiry = Utc::now() + Duration::days(60);
    let drift = (stored.expires_at - expected_expiry).num_seconds().abs();
    assert!(drift < 60, "refresh token expiry off by {}s", drift);
}

#[tokio::test]
async fn wrong_password_and_unknown_email_fail_identically() {
    let app = setup().await;

    let wrong_password = app.service.login(EMAIL, "not-the-password", None).await;
    let unknown_email = app.service.login("jesse@breakingbad.com", PASSWORD, None).await;

    assert!(matches!(wrong_password, Err(SessionError::InvalidCredentials)));
    assert!(matches!(unknown_email, Err(SessionError::InvalidCredentials)));
    assert_eq!(
        wrong_password.err().map(|e| e.to_string()),
        unknown_email.err().map(|e| e.to_string())
    );
    assert!(app.refresh_tokens.is_empty());
}

#[tokio::test]
async fn refresh_mints_token_for_same_subject() {
    let app = setup().await;
    let outcome = app.service.login(EMAIL, PASSWORD, None).await.expect("login");

    let header = format!("Bearer {}", outcome.refresh_token);
    let token = app.service.refresh(Some(&header)).await.expect("refresh");

    assert_eq!(app.codec.verify(&token), Ok(app.account.id));

    let wrong_scheme = app.service.refresh(Some("Basic abc")).await;
    assert!(matches!(wrong_scheme, Err(SessionError::Unauthorized)));
}

#[tokio::test]
async fn refresh_with_unknown_token_is_unauthorized() {
    let app = setup().await;

    let result = app.service.refresh(Some("Bearer deadbeef")).await;
    assert!(matches!(result, Err(SessionError::Unauthorized)));
}

#[tokio::test]
async fn revoked_token_cannot_refresh() {
    let app = setup().await;
    let outcome = app.service.login(EMAIL, PASSWORD, None).await.expect("login");
    let header = format!("Bearer {}", outcome.refresh_token);

    app.service.revoke(Some(&header)).await.expect("revoke");

    let result = app.service.refresh(Some(&header)).await;
    assert!(matches!(result, Err(SessionError::Unauthorized)));

    // Revoking again is fine, and the record is kept
    app.service.revoke(Some(&header)).await.expect("second revoke");
    assert_eq!(app.refresh_tokens.len(), 1);
}

#[tokio::test]
async fn revoke_does_not_touch_access_tokens() {
    let app = setup().await;
    let outcome = app.service.login(EMAIL, PASSWORD, None).await.expect("login");
    let header = format!("Bearer {}", outcome.refresh_token);

    app.service.revoke(Some(&header)).await.expect("revoke");

    let access_header = format!("Bearer {}", outcome.access_token);
    assert_eq!(
        app.service.validate_access_token(Some(&access_header)).ok(),
        Some(app.account.id)
    );
}

#[tokio::test]
async fn each_login_gets_its_own_refresh_token() {
    let app = setup().await;

    let first = app.service.login(EMAIL, PASSWORD, None).await.expect("login");
    let second = app.service.login(EMAIL, PASSWORD, None).await.expect("login");
    assert_ne!(first.refresh_token, second.refresh_token);

    app.service
        .revoke(Some(&format!("Bearer {}", first.refresh_token)))
        .await
        .expect("revoke");

    let still_active = app
        .service
        .refresh(Some(&format!("Bearer {}", second.refresh_token)))
        .await;
    assert!(still_active.is_ok());
}

#[tokio::test]
async fn expired_access_token_is_rejected() {
    let app = setup().await;

    let now = Utc::now().timestamp();
    let claims = Claims {
        iss: TOKEN_ISSUER.to_string(),
        sub: app.account.id.to_string(),
        iat: now - 7200,
        exp: now - 3600,
    };
    let token = app.codec.sign(&claims).expect("sign");

    assert_eq!(app.codec.verify(&token), Err(AccessTokenError::Expired));
    assert!(matches!(
        app.service.validate_access_token(Some(&format!("Bearer {}", token))),
        Err(SessionError::Unauthorized)
    ));
}
