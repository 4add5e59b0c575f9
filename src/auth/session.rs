use axum::extract::FromRef;
use cookie::Cookie;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use super::claims::SessionToken;
use crate::{config::SessionConfig, state::AppState, users::repo_types::UserModel};

pub const SESSION_COOKIE: &str = "SESSIONID";

/// Signs and reads session cookies.
#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    ttl: Duration,
    cookie_domain: Option<String>,
    cookie_max_age_secs: i64,
}

impl FromRef<AppState> for SessionKeys {
    fn from_ref(state: &AppState) -> Self {
        state.sessions.clone()
    }
}

impl SessionKeys {
    pub fn from_config(cfg: &SessionConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            ttl: Duration::minutes(cfg.ttl_minutes),
            cookie_domain: cfg.cookie_domain.clone(),
            cookie_max_age_secs: cfg.cookie_max_age_secs,
        }
    }

    /// Signed session token for `user`, valid for the configured ttl.
    pub fn issue(&self, user: &UserModel) -> anyhow::Result<String> {
        self.issue_at(user, OffsetDateTime::now_utc())
    }

    pub fn issue_at(&self, user: &UserModel, now: OffsetDateTime) -> anyhow::Result<String> {
        let expires_at = now + self.ttl;
        let token = self.encode(&SessionToken {
            iss: self.issuer.clone(),
            sid: Some(Uuid::new_v4().to_string()),
            uid: Some(user.id),
            username: Some(user.name.clone()),
            exp: Some(expires_at.unix_timestamp()),
        })?;
        debug!(user_id = user.id, %expires_at, "session issued");
        Ok(token)
    }

    pub fn encode(&self, token: &SessionToken) -> anyhow::Result<String> {
        Ok(encode(&Header::default(), token, &self.encoding)?)
    }

    /// Checks signature and issuer only; expiry is the authenticator's call.
    pub fn decode(&self, token: &str) -> anyhow::Result<SessionToken> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<SessionToken>(token, &self.decoding, &validation)?;
        Ok(data.claims)
    }

    /// Session cookie carrying `token`. Its lifetime is the configured
    /// max-age; the token's own expiry is enforced server side.
    pub fn session_cookie(&self, token: String) -> Cookie<'static> {
        let mut cookie = Cookie::build((SESSION_COOKIE, token))
            .path("/")
            .http_only(true)
            .max_age(Duration::seconds(self.cookie_max_age_secs));
        if let Some(domain) = &self.cookie_domain {
            cookie = cookie.domain(domain.clone());
        }
        cookie.build()
    }
}

#[cfg(test)]
pub(crate) fn test_keys() -> SessionKeys {
    SessionKeys::from_config(&SessionConfig {
        secret: "test-secret".into(),
        issuer: "test-issuer".into(),
        ttl_minutes: 60,
        cookie_domain: Some("u.isucon.local".into()),
        cookie_max_age_secs: 60000,
    })
}
