use std::sync::Arc;

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::warn;

use crate::{
    auth::SessionKeys,
    cache::{
        invalidation::{InvalidationHub, OwnerIndexedCache, OwnerSnapshot},
        CacheStore,
    },
    config::AppConfig,
    dns::{DnsRegistrar, NoopRegistrar, PowerDnsRegistrar},
    icons::fallback::FallbackIcon,
    service::ProfileService,
    users::repo::PgStore,
};

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<AppConfig>,
    pub profiles: Arc<ProfileService<PgStore>>,
    pub sessions: SessionKeys,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let db = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .connect(&config.database_url)
            .await
            .context("connect to database")?;

        let fallback = Arc::new(FallbackIcon::load(&config.fallback_icon_path).await?);

        // livestream and livecomment caches only need to hear about user changes
        let livestreams: Arc<OwnerIndexedCache<OwnerSnapshot>> =
            Arc::new(OwnerIndexedCache::new("livestreams"));
        let livecomments: Arc<OwnerIndexedCache<OwnerSnapshot>> =
            Arc::new(OwnerIndexedCache::new("livecomments"));
        let siblings = InvalidationHub::new()
            .register(livestreams)
            .register(livecomments);

        let dns: Arc<dyn DnsRegistrar> = match &config.dns {
            Some(dns) => Arc::new(PowerDnsRegistrar::new(dns.clone())),
            None => {
                warn!("POWERDNS_ENDPOINT not set; subdomain registration disabled");
                Arc::new(NoopRegistrar)
            }
        };

        let profiles = Arc::new(ProfileService::new(
            PgStore::new(db.clone()),
            Arc::new(CacheStore::new()),
            fallback,
            siblings,
            dns,
        ));
        let sessions = SessionKeys::from_config(&config.session);

        Ok(Self {
            db,
            config,
            profiles,
            sessions,
        })
    }
}
