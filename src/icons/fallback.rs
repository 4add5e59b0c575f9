use std::path::Path;

use anyhow::Context;
use bytes::Bytes;
use tracing::info;

use super::hasher::{hash_bytes, IconHash};

/// Icon served for users without a stored image. Read-only after startup.
#[derive(Debug, Clone)]
pub struct FallbackIcon {
    bytes: Bytes,
    hash: IconHash,
}

impl FallbackIcon {
    pub async fn load(path: &Path) -> anyhow::Result<Self> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("read fallback icon {}", path.display()))?;
        let icon = Self::from_bytes(bytes);
        info!(path = %path.display(), hash = %icon.hash, "fallback icon loaded");
        Ok(icon)
    }

    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        let bytes = bytes.into();
        let hash = hash_bytes(&bytes);
        Self { bytes, hash }
    }

    pub fn bytes(&self) -> Bytes {
        self.bytes.clone()
    }

    pub fn hash(&self) -> IconHash {
        self.hash
    }
}
