// src/registry.rs
use log::{info, warn};
use parking_lot::RwLock;
use std::collections::HashSet;
use std::net::IpAddr;
use tokio::sync::Mutex;

use crate::models::server::{ServerConfig, ServerId, ServerState};
use crate::state::StateTable;

/// Result of diffing a new config list against the registry.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RefreshSummary {
    pub removed: Vec<ServerId>,
    pub added: Vec<ServerId>,
}

/// Connection parameters of the configured fleet.
#[derive(Debug, Default)]
pub struct ServerRegistry {
    configs: RwLock<Vec<ServerConfig>>,
    refreshing: Mutex<()>,
}

impl ServerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_by_id(&self, server_id: ServerId) -> Option<ServerConfig> {
        self.configs
            .read()
            .iter()
            .find(|c| c.server_id == server_id)
            .cloned()
    }

    pub fn get_all(&self) -> Vec<ServerConfig> {
        self.configs.read().clone()
    }

    pub fn enabled(&self) -> Vec<ServerConfig> {
        self.configs
            .read()
            .iter()
            .filter(|c| c.enabled)
            .cloned()
            .collect()
    }

    /// Replaces the config list. Servers that disappeared lose their state entry,
    /// newly seen enabled servers get an initial one. DNS lookups happen before any
    /// lock is taken. Concurrent refreshes run one after another.
    pub async fn refresh(&self, configs: Vec<ServerConfig>, state: &StateTable) -> RefreshSummary {
        let _refreshing = self.refreshing.lock().await;

        let incoming: HashSet<ServerId> = configs.iter().map(|c| c.server_id).collect();
        let removed: Vec<ServerId> = self
            .configs
            .read()
            .iter()
            .map(|c| c.server_id)
            .filter(|id| !incoming.contains(id))
            .collect();

        let mut added = Vec::new();
        for config in configs.iter().filter(|c| c.enabled && !state.contains(c.server_id)) {
            let ip = match resolve_ip(&config.host).await {
                Ok(ip) => ip.to_string(),
                Err(e) => {
                    warn!("Failed to resolve server ip for {}: {}", config.host, e);
                    config.host.clone()
                }
            };
            added.push(ServerState::from_config(config, ip));
        }

        let added_ids: Vec<ServerId> = added.iter().map(|s| s.server_id).collect();
        state.apply_refresh(&removed, added);
        *self.configs.write() = configs;

        if !removed.is_empty() || !added_ids.is_empty() {
            info!("Server configs refreshed: {} added, {} removed", added_ids.len(), removed.len());
        }

        RefreshSummary {
            removed,
            added: added_ids,
        }
    }
}

/// Returns `host` itself when it is already an address, else its first A/AAAA record.
pub async fn resolve_ip(host: &str) -> std::io::Result<IpAddr> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(ip);
    }

    tokio::net::lookup_host((host, 0))
        .await?
        .map(|addr| addr.ip())
        .next()
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, format!("no addresses for {}", host)))
}
