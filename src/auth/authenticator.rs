use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::extract::CookieJar;
use time::OffsetDateTime;
use tracing::{debug, warn};

use super::{
    claims::{SessionClaims, SessionToken},
    session::{SessionKeys, SESSION_COOKIE},
};
use crate::error::{AppError, AuthError};

/// Validates a decoded session against the current unix time.
///
/// Checks run in a fixed order: the session exists, it carries an expiry and
/// a user id, and the expiry has not passed (`now == exp` is still valid).
pub fn authenticate(session: Option<SessionToken>, now: i64) -> Result<SessionClaims, AuthError> {
    let session = session.ok_or(AuthError::Unauthenticated("failed to get session"))?;

    let expires_at = session
        .exp
        .ok_or(AuthError::Forbidden("failed to get EXPIRES value from session"))?;
    let user_id = session
        .uid
        .ok_or(AuthError::Unauthenticated("failed to get USERID value from session"))?;

    if now > expires_at {
        return Err(AuthError::Expired);
    }

    Ok(SessionClaims {
        session_id: session.sid,
        user_id,
        username: session.username,
        expires_at,
    })
}

/// Extracts and validates the session cookie.
pub struct AuthSession(pub SessionClaims);

#[async_trait]
impl<S> FromRequestParts<S> for AuthSession
where
    S: Send + Sync,
    SessionKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = SessionKeys::from_ref(state);
        let jar = CookieJar::from_headers(&parts.headers);
        let session = match jar.get(SESSION_COOKIE).map(|cookie| keys.decode(cookie.value())) {
            Some(Ok(token)) => Some(token),
            Some(Err(e)) => {
                warn!(error = %e, "unreadable session cookie");
                None
            }
            None => None,
        };

        let claims = authenticate(session, OffsetDateTime::now_utc().unix_timestamp())?;
        debug!(
            user_id = claims.user_id,
            session_id = ?claims.session_id,
            username = ?claims.username,
            expires_at = claims.expires_at,
            "session authenticated"
        );
        Ok(AuthSession(claims))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::session::test_keys;
    use crate::users::repo_types::UserModel;
    use axum::http::{header::COOKIE, Request};

    fn token(uid: Option<i64>, exp: Option<i64>) -> SessionToken {
        SessionToken {
            iss: "test-issuer".into(),
            sid: Some("sid".into()),
            uid,
            username: Some("alice".into()),
            exp,
        }
    }

    #[test]
    fn missing_session_is_unauthenticated() {
        assert!(matches!(
            authenticate(None, 0),
            Err(AuthError::Unauthenticated(_))
        ));
    }

    #[test]
    fn missing_expiry_is_forbidden() {
        assert!(matches!(
            authenticate(Some(token(Some(1), None)), 0),
            Err(AuthError::Forbidden(_))
        ));
    }

    #[test]
    fn missing_user_id_is_unauthenticated() {
        assert!(matches!(
            authenticate(Some(token(None, Some(100))), 0),
            Err(AuthError::Unauthenticated(_))
        ));
    }

    #[test]
    fn expiry_is_checked_after_presence() {
        assert_eq!(
            authenticate(Some(token(Some(1), Some(100))), 101),
            Err(AuthError::Expired)
        );
        let claims = authenticate(Some(token(Some(1), Some(100))), 100).expect("still valid");
        assert_eq!(claims.user_id, 1);
        assert_eq!(claims.expires_at, 100);
        assert_eq!(claims.username.as_deref(), Some("alice"));
    }

    async fn extract(cookie: Option<String>) -> Result<AuthSession, AppError> {
        let mut builder = Request::builder().uri("/api/user/me");
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        AuthSession::from_request_parts(&mut parts, &test_keys()).await
    }

    #[tokio::test]
    async fn extractor_accepts_issued_cookie() {
        let keys = test_keys();
        let user = UserModel {
            id: 9,
            name: "carol".into(),
            display_name: String::new(),
            description: String::new(),
            password_hash: String::new(),
        };
        let issued = keys.issue(&user).unwrap();

        let AuthSession(claims) = extract(Some(format!("theme=dark; SESSIONID={issued}; lang=ja")))
            .await
            .expect("authenticated");
        assert_eq!(claims.user_id, 9);
        assert_eq!(claims.username.as_deref(), Some("carol"));
    }

    #[tokio::test]
    async fn extractor_rejects_missing_and_forged_cookies() {
        let missing = extract(None).await.err().expect("rejected");
        assert!(matches!(missing, AppError::Auth(AuthError::Unauthenticated(_))));

        let forged = extract(Some("SESSIONID=not.a.jwt".into())).await.err().expect("rejected");
        assert!(matches!(forged, AppError::Auth(AuthError::Unauthenticated(_))));
    }

    #[tokio::test]
    async fn extractor_rejects_expired_cookie() {
        let keys = test_keys();
        let stale = keys.encode(&token(Some(1), Some(1))).unwrap();
        let err = extract(Some(format!("SESSIONID={stale}"))).await.err().expect("rejected");
        assert!(matches!(err, AppError::Auth(AuthError::Expired)));
    }
}
