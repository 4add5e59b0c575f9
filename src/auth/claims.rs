use serde::{Deserialize, Serialize};

/// Signed payload carried by the session cookie.
///
/// Every field is optional on the wire so that a malformed session is rejected
/// by `authenticate` with the reason it failed, not by the decoder.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionToken {
    #[serde(default)]
    pub iss: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,      // session ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<i64>,         // user ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,         // expires at (unix timestamp)
}

/// Session facts validated once per request; handlers only ever see this.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionClaims {
    pub session_id: Option<String>,
    pub user_id: i64,
    pub username: Option<String>,
    pub expires_at: i64,
}
