use anyhow::Context;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::json;
use tracing::{debug, instrument};

use crate::config::DnsConfig;

/// Publishes a per-user subdomain at registration time.
#[async_trait]
pub trait DnsRegistrar: Send + Sync {
    async fn register_subdomain(&self, name: &str) -> anyhow::Result<()>;
}

/// Used when no PowerDNS endpoint is configured.
pub struct NoopRegistrar;

#[async_trait]
impl DnsRegistrar for NoopRegistrar {
    async fn register_subdomain(&self, name: &str) -> anyhow::Result<()> {
        debug!(name, "dns registration disabled");
        Ok(())
    }
}

pub struct PowerDnsRegistrar {
    client: reqwest::Client,
    config: DnsConfig,
}

impl PowerDnsRegistrar {
    pub fn new(config: DnsConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn zone_url(&self) -> String {
        format!(
            "{}/api/v1/servers/localhost/zones/{}",
            self.config.endpoint.trim_end_matches('/'),
            self.config.zone
        )
    }

    fn rrset_patch(&self, name: &str) -> serde_json::Value {
        json!({
            "rrsets": [{
                "name": format!("{}.{}", name, self.config.zone),
                "type": "A",
                "ttl": 3600,
                "changetype": "REPLACE",
                "records": [{ "content": self.config.subdomain_address, "disabled": false }],
            }]
        })
    }
}

#[async_trait]
impl DnsRegistrar for PowerDnsRegistrar {
    #[instrument(skip(self))]
    async fn register_subdomain(&self, name: &str) -> anyhow::Result<()> {
        let resp = self
            .client
            .patch(self.zone_url())
            .header("X-API-Key", &self.config.api_key)
            .json(&self.rrset_patch(name))
            .send()
            .await
            .context("request to powerdns")?;
        let status = resp.status();
        anyhow::ensure!(
            status == StatusCode::NO_CONTENT,
            "powerdns answered {status}, expected 204"
        );
        debug!(name, "subdomain registered");
        Ok(())
    }
}
