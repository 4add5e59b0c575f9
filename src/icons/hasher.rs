use std::fmt;

use serde::{Serialize, Serializer};
use sha2::{Digest, Sha256};

/// SHA-256 fingerprint of an icon image.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct IconHash([u8; 32]);

impl IconHash {
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Compares against an `If-None-Match` / `ETag` value, quoted or bare.
    pub fn matches_etag(&self, etag: &str) -> bool {
        let tag = etag.trim();
        let tag = tag.strip_prefix("W/").unwrap_or(tag);
        let tag = tag.trim_matches('"');
        tag.eq_ignore_ascii_case(&self.to_hex())
    }

    pub fn etag(&self) -> String {
        format!("\"{}\"", self.to_hex())
    }
}

impl fmt::Display for IconHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for IconHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IconHash({})", self.to_hex())
    }
}

impl Serialize for IconHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

pub fn hash_bytes(bytes: &[u8]) -> IconHash {
    IconHash(Sha256::digest(bytes).into())
}
