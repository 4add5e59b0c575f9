use std::path::PathBuf;

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub secret: String,
    pub issuer: String,
    pub ttl_minutes: i64,
    pub cookie_domain: Option<String>,
    pub cookie_max_age_secs: i64,
}

/// PowerDNS zone the registration flow publishes `<name>.<zone>` A records into.
#[derive(Debug, Clone, Deserialize)]
pub struct DnsConfig {
    pub endpoint: String,
    pub api_key: String,
    pub zone: String,
    pub subdomain_address: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub session: SessionConfig,
    pub fallback_icon_path: PathBuf,
    pub dns: Option<DnsConfig>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let session = SessionConfig {
            secret: std::env::var("SESSION_SECRET").context("SESSION_SECRET is not set")?,
            issuer: std::env::var("SESSION_ISSUER").unwrap_or_else(|_| "profiled".into()),
            ttl_minutes: env_parse("SESSION_TTL_MINUTES").unwrap_or(60),
            cookie_domain: std::env::var("SESSION_COOKIE_DOMAIN").ok(),
            cookie_max_age_secs: env_parse("SESSION_COOKIE_MAX_AGE").unwrap_or(60000),
        };
        let dns = std::env::var("POWERDNS_ENDPOINT").ok().map(|endpoint| DnsConfig {
            endpoint,
            api_key: std::env::var("POWERDNS_API_KEY").unwrap_or_else(|_| "isudns".into()),
            zone: std::env::var("POWERDNS_ZONE").unwrap_or_else(|_| "u.isucon.local.".into()),
            subdomain_address: std::env::var("POWERDNS_SUBDOMAIN_ADDRESS")
                .unwrap_or_else(|_| "127.0.0.1".into()),
        });
        Ok(Self {
            database_url,
            db_max_connections: env_parse("DB_MAX_CONNECTIONS").unwrap_or(10),
            session,
            fallback_icon_path: std::env::var("FALLBACK_ICON_PATH")
                .unwrap_or_else(|_| "../img/NoImage.jpg".into())
                .into(),
            dns,
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}
