use std::env;
use std::time::Duration;
use std::num::NonZeroU32;
use governor::Quota;

use crate::collector::CollectorSettings;

#[derive(Clone, Debug)]
pub struct Config {
    // HTTP
    pub bind_address: String,
    pub port: u16,

    // Fleet source
    pub servers_file: String,

    // Collector timings
    pub status_update_secs: u64,
    pub config_update_secs: u64,
    pub rcon_timeout_secs: u64,
    pub log_address: Option<String>,

    // Rate limiting for server self-reports
    pub state_update_period_secs: u64,
    pub state_update_burst_limit: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8080,
            servers_file: "servers.json".to_string(),
            status_update_secs: 20,
            config_update_secs: 30 * 60,
            rcon_timeout_secs: 5,
            log_address: None,
            state_update_period_secs: 1,
            state_update_burst_limit: 10,
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind_address: env::var("BIND_ADDRESS").unwrap_or(defaults.bind_address),
            port: env_or("PORT", defaults.port),
            servers_file: env::var("SERVERS_FILE").unwrap_or(defaults.servers_file),
            status_update_secs: env_or("STATUS_UPDATE_SECS", defaults.status_update_secs),
            config_update_secs: env_or("CONFIG_UPDATE_SECS", defaults.config_update_secs),
            rcon_timeout_secs: env_or("RCON_TIMEOUT_SECS", defaults.rcon_timeout_secs),
            log_address: env::var("LOG_ADDRESS").ok().filter(|v| !v.is_empty()),
            state_update_period_secs: env_or("STATE_UPDATE_PERIOD_SECS", defaults.state_update_period_secs),
            state_update_burst_limit: env_or("STATE_UPDATE_BURST_LIMIT", defaults.state_update_burst_limit),
        }
    }

    pub fn bind(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    pub fn collector_settings(&self) -> CollectorSettings {
        // zero intervals would make tokio's interval panic
        let rcon_timeout = Duration::from_secs(self.rcon_timeout_secs.max(1));
        CollectorSettings {
            status_update_freq: Duration::from_secs(self.status_update_secs.max(1)),
            config_update_freq: Duration::from_secs(self.config_update_secs.max(1)),
            rcon_timeout,
            exec_timeout: rcon_timeout * 2,
            log_address: self.log_address.clone(),
        }
    }

    pub fn state_update_quota(&self) -> Quota {
        let burst = NonZeroU32::new(self.state_update_burst_limit).unwrap_or(NonZeroU32::MIN);
        Quota::with_period(Duration::from_secs(self.state_update_period_secs.max(1)))
            .unwrap_or_else(|| Quota::per_second(NonZeroU32::MIN))
            .allow_burst(burst)
    }
}
