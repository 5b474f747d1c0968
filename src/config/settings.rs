//! Pool settings
//!
//! Loads the node pool configuration from environment variables (and a
//! `.env` file, if present) with sensible defaults.

use crate::node::NodeConfig;
use crate::pool::{PoolConfig, SelectorKind};
use crate::utils::{parse_cloud_id, url_to_node_config};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Node pool settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PoolSettings {
    /// Seed node URLs
    pub hosts: Vec<String>,
    /// Cloud ID, used when no hosts are configured
    #[serde(skip_serializing)]
    pub cloud_id: Option<String>,
    pub node_selector_class: String,
    pub randomize_nodes: bool,
    pub dead_node_backoff_factor_secs: f64,
    pub max_dead_node_backoff_secs: f64,

    // Logging
    pub log_level: String,
    pub log_json: bool,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            hosts: Vec::new(),
            cloud_id: None,
            node_selector_class: SelectorKind::Random.name().to_string(),
            randomize_nodes: true,
            dead_node_backoff_factor_secs: 1.0,
            max_dead_node_backoff_secs: 30.0,
            log_level: "info".to_string(),
            log_json: false,
        }
    }
}

impl PoolSettings {
    /// Load settings from environment variables with defaults
    pub fn load() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let settings = Self::from_lookup(|key| env::var(key).ok())?;
        settings.validate()?;

        Ok(settings)
    }

    /// Build settings from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let or_default = |key: &str, default: String| lookup(key).unwrap_or(default);

        Ok(Self {
            hosts: lookup("NODE_POOL_HOSTS")
                .map(|hosts| {
                    hosts
                        .split(',')
                        .map(str::trim)
                        .filter(|h| !h.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default(),
            cloud_id: lookup("NODE_POOL_CLOUD_ID").filter(|id| !id.is_empty()),
            node_selector_class: or_default("NODE_POOL_SELECTOR", defaults.node_selector_class),
            randomize_nodes: or_default("NODE_POOL_RANDOMIZE_NODES", "true".to_string())
                .parse()
                .context("Invalid NODE_POOL_RANDOMIZE_NODES value")?,
            dead_node_backoff_factor_secs: or_default(
                "NODE_POOL_DEAD_BACKOFF_FACTOR_SECS",
                defaults.dead_node_backoff_factor_secs.to_string(),
            )
            .parse()
            .context("Invalid NODE_POOL_DEAD_BACKOFF_FACTOR_SECS value")?,
            max_dead_node_backoff_secs: or_default(
                "NODE_POOL_MAX_DEAD_BACKOFF_SECS",
                defaults.max_dead_node_backoff_secs.to_string(),
            )
            .parse()
            .context("Invalid NODE_POOL_MAX_DEAD_BACKOFF_SECS value")?,
            log_level: or_default("LOG_LEVEL", defaults.log_level),
            log_json: or_default("LOG_JSON", "false".to_string())
                .parse()
                .context("Invalid LOG_JSON value")?,
        })
    }

    /// Validate settings
    pub fn validate(&self) -> Result<()> {
        if self.hosts.is_empty() && self.cloud_id.is_none() {
            anyhow::bail!("Either NODE_POOL_HOSTS or NODE_POOL_CLOUD_ID must be set");
        }

        if !self.dead_node_backoff_factor_secs.is_finite()
            || self.dead_node_backoff_factor_secs <= 0.0
        {
            anyhow::bail!("Dead node backoff factor must be a positive number of seconds");
        }
        if !self.max_dead_node_backoff_secs.is_finite()
            || self.max_dead_node_backoff_secs < self.dead_node_backoff_factor_secs
        {
            anyhow::bail!("Max dead node backoff must be at least the backoff factor");
        }

        if !self.hosts.is_empty() && self.cloud_id.is_some() {
            tracing::warn!("NODE_POOL_CLOUD_ID is ignored because NODE_POOL_HOSTS is set");
        }

        Ok(())
    }

    /// Pool options described by these settings
    pub fn pool_config(&self) -> Result<PoolConfig> {
        let factor = Duration::try_from_secs_f64(self.dead_node_backoff_factor_secs)
            .context("Invalid dead node backoff factor")?;
        let max = Duration::try_from_secs_f64(self.max_dead_node_backoff_secs)
            .context("Invalid max dead node backoff")?;

        Ok(PoolConfig::new(self.node_selector_class.clone())
            .with_randomize_nodes(self.randomize_nodes)
            .with_dead_node_backoff(factor, max))
    }

    /// Seed node configs: the configured hosts, or the Cloud ID's
    /// Elasticsearch endpoint when no hosts are given
    pub fn node_configs(&self) -> Result<Vec<NodeConfig>> {
        if !self.hosts.is_empty() {
            return self
                .hosts
                .iter()
                .map(|host| {
                    url_to_node_config(host, true)
                        .with_context(|| format!("Invalid host in NODE_POOL_HOSTS: {}", host))
                })
                .collect();
        }

        let cloud_id = self
            .cloud_id
            .as_deref()
            .context("No hosts or Cloud ID configured")?;
        let config = parse_cloud_id(cloud_id)
            .and_then(|id| id.es_node_config())
            .context("Invalid NODE_POOL_CLOUD_ID")?;
        Ok(vec![config])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_settings() {
        let settings = PoolSettings::default();
        assert_eq!(settings.node_selector_class, "random");
        assert!(settings.randomize_nodes);
        assert_eq!(settings.log_level, "info");
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_hosts_from_env() {
        let settings = PoolSettings::from_lookup(lookup(&[
            ("NODE_POOL_HOSTS", "http://es1:9200, https://es2 ,"),
            ("NODE_POOL_SELECTOR", "round_robin"),
            ("NODE_POOL_RANDOMIZE_NODES", "false"),
            ("NODE_POOL_DEAD_BACKOFF_FACTOR_SECS", "0.5"),
        ]))
        .unwrap();
        settings.validate().unwrap();
        assert_eq!(settings.hosts, vec!["http://es1:9200", "https://es2"]);

        let configs = settings.node_configs().unwrap();
        assert_eq!(configs[0].url(), "http://es1:9200");
        assert_eq!(configs[1].url(), "https://es2:443");

        let pool_config = settings.pool_config().unwrap();
        assert_eq!(pool_config.node_selector_class, "round_robin");
        assert!(!pool_config.randomize_nodes);
        assert_eq!(pool_config.dead_node_backoff_factor, Duration::from_millis(500));
        assert_eq!(pool_config.max_dead_node_backoff, Duration::from_secs(30));
    }

    #[test]
    fn test_cloud_id_from_env() {
        let settings = PoolSettings::from_lookup(lookup(&[(
            "NODE_POOL_CLOUD_ID",
            "cluster:dXMtZWFzdC0xLmF3cy5mb3VuZC5pbyQ0ZmE4ODIxZTc1NjM0MDMyYmVkMWNmMjIxMTBlMmY5NyQ=",
        )]))
        .unwrap();
        settings.validate().unwrap();

        let configs = settings.node_configs().unwrap();
        assert_eq!(
            configs[0].url(),
            "https://4fa8821e75634032bed1cf22110e2f97.us-east-1.aws.found.io:443"
        );
        assert!(configs[0].http_compress());
    }

    #[test]
    fn test_invalid_values() {
        let randomize = lookup(&[("NODE_POOL_RANDOMIZE_NODES", "maybe")]);
        assert!(PoolSettings::from_lookup(randomize).is_err());

        let settings = PoolSettings::from_lookup(lookup(&[
            ("NODE_POOL_HOSTS", "http://es1:9200"),
            ("NODE_POOL_DEAD_BACKOFF_FACTOR_SECS", "10"),
            ("NODE_POOL_MAX_DEAD_BACKOFF_SECS", "5"),
        ]))
        .unwrap();
        assert!(settings.validate().is_err());

        let settings =
            PoolSettings::from_lookup(lookup(&[("NODE_POOL_HOSTS", "es1:9200")])).unwrap();
        let err = settings.node_configs().unwrap_err();
        assert!(format!("{:#}", err).contains("URL must include a 'scheme'"));
    }

    #[test]
    fn test_serialization_skips_cloud_id() {
        let settings = PoolSettings {
            cloud_id: Some("secret:abc".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_value(&settings).unwrap();
        assert!(json.get("cloud_id").is_none());
        assert_eq!(json["node_selector_class"], "random");
    }
}
