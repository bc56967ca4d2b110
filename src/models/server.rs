// src/models/server.rs
use serde::{Deserialize, Serialize};

use super::player::Player;

pub type ServerId = i64;

/// A server row as handed over by the persistence layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerRecord {
    pub server_id: ServerId,
    pub short_name: String,
    pub name: String,
    pub address: String,
    pub port: u16,
    pub rcon: String,
    #[serde(default)]
    pub reserved_slots: i32,
    #[serde(default)]
    pub cc: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
    #[serde(default = "enabled_default")]
    pub is_enabled: bool,
}

fn enabled_default() -> bool {
    true
}

/// Connection parameters for one managed server.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub server_id: ServerId,
    pub tag: String,
    pub default_hostname: String,
    pub host: String,
    pub port: u16,
    pub rcon_password: String,
    pub reserved_slots: i32,
    pub cc: String,
    pub region: String,
    pub latitude: f64,
    pub longitude: f64,
    pub enabled: bool,
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl From<ServerRecord> for ServerConfig {
    fn from(record: ServerRecord) -> Self {
        Self {
            server_id: record.server_id,
            tag: record.short_name,
            default_hostname: record.name,
            host: record.address,
            port: record.port,
            rcon_password: record.rcon,
            reserved_slots: record.reserved_slots,
            cc: record.cc,
            region: record.region,
            latitude: record.latitude,
            longitude: record.longitude,
            enabled: record.is_enabled,
        }
    }
}

/// Latest known live state of a server.
///
/// Map, counts, tags and players come from the most recent successful poll (or
/// self-reported update); everything else is seeded from the config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerState {
    pub server_id: ServerId,
    pub name_short: String,
    pub name: String,
    pub host: String,
    /// Resolved address; steam:// links do not accept hostnames.
    pub ip: String,
    pub port: u16,
    pub ip_public: String,
    pub port_public: u16,
    pub enabled: bool,
    pub region: String,
    pub cc: String,
    pub latitude: f64,
    pub longitude: f64,
    pub reserved_slots: i32,
    pub last_update: u64,
    pub map: String,
    pub player_count: i32,
    pub max_players: i32,
    pub bots: i32,
    pub humans: i32,
    pub version: String,
    pub tags: Vec<String>,
    pub edicts: Vec<i32>,
    pub players: Vec<Player>,
    pub stv_ip: String,
    pub stv_port: u16,
}

impl ServerState {
    /// Initial state for a server that has never been polled.
    pub fn from_config(config: &ServerConfig, ip: String) -> Self {
        Self {
            server_id: config.server_id,
            name_short: config.tag.clone(),
            name: config.default_hostname.clone(),
            host: config.host.clone(),
            ip,
            port: config.port,
            enabled: config.enabled,
            region: config.region.clone(),
            cc: config.cc.clone(),
            latitude: config.latitude,
            longitude: config.longitude,
            reserved_slots: config.reserved_slots,
            ..Default::default()
        }
    }
}

/// Fields a game server reports about itself through the HTTP API.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PartialStateUpdate {
    #[serde(default)]
    pub hostname: String,
    #[serde(default)]
    pub short_name: String,
    #[serde(default)]
    pub current_map: String,
    #[serde(default)]
    pub players_real: i32,
    #[serde(default)]
    pub players_total: i32,
    #[serde(default)]
    pub players_visible: i32,
}
