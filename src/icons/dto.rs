use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Deserializer, Serialize};

/// Request body for icon upload; `image` is base64 in JSON.
#[derive(Debug, Deserialize)]
pub struct PostIconRequest {
    #[serde(deserialize_with = "base64_bytes")]
    pub image: Vec<u8>,
}

#[derive(Debug, Serialize)]
pub struct PostIconResponse {
    pub id: i64,
}

fn base64_bytes<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
    let encoded = String::deserialize(deserializer)?;
    STANDARD
        .decode(encoded.as_bytes())
        .map_err(serde::de::Error::custom)
}
