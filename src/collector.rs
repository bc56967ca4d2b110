// src/collector.rs
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::error::{FleetError, RconError, StoreError};
use crate::fleet::{self, FindOpts, FindResult};
use steamid_ng::SteamID;
use crate::models::server::{PartialStateUpdate, ServerConfig, ServerId, ServerState};
use crate::rcon::RconTransport;
use crate::registry::{RefreshSummary, ServerRegistry};
use crate::state::StateTable;
use crate::status::{parse_status, parse_visible_max_players, Status};
use crate::storage::ServerStore;

#[derive(Debug, Clone)]
pub struct CollectorSettings {
    pub status_update_freq: Duration,
    pub config_update_freq: Duration,
    /// Handed to the transport as its dial/read timeout.
    pub rcon_timeout: Duration,
    /// Upper bound on one complete command round trip.
    pub exec_timeout: Duration,
    /// Broadcast as `logaddress_add` after every config refresh.
    pub log_address: Option<String>,
}

impl Default for CollectorSettings {
    fn default() -> Self {
        Self {
            status_update_freq: Duration::from_secs(20),
            config_update_freq: Duration::from_secs(30 * 60),
            rcon_timeout: Duration::from_secs(5),
            exec_timeout: Duration::from_secs(10),
            log_address: None,
        }
    }
}

/// Outcome counters of one status poll cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CycleStats {
    pub success: usize,
    pub fail: usize,
    pub duration: Duration,
}

/// Keeps the fleet's state table fresh and runs commands against the fleet.
///
/// Construct one per process and share it behind an `Arc`.
pub struct Collector<T, S> {
    transport: Arc<T>,
    store: Arc<S>,
    registry: ServerRegistry,
    state: StateTable,
    settings: CollectorSettings,
    last_cycle: Mutex<CycleStats>,
}

impl<T: RconTransport, S: ServerStore> Collector<T, S> {
    pub fn new(transport: T, store: S, settings: CollectorSettings) -> Self {
        Self::with_shared(Arc::new(transport), Arc::new(store), settings)
    }

    pub fn with_shared(transport: Arc<T>, store: Arc<S>, settings: CollectorSettings) -> Self {
        Self {
            transport,
            store,
            registry: ServerRegistry::new(),
            state: StateTable::new(),
            settings,
            last_cycle: Mutex::new(CycleStats::default()),
        }
    }

    pub fn registry(&self) -> &ServerRegistry {
        &self.registry
    }

    pub fn state(&self) -> &StateTable {
        &self.state
    }

    pub fn settings(&self) -> &CollectorSettings {
        &self.settings
    }

    pub fn last_cycle(&self) -> CycleStats {
        *self.last_cycle.lock()
    }

    /// Runs until `token` is cancelled: one config refresh right away and then every
    /// `config_update_freq`, with the status loop running alongside.
    pub async fn start(self: Arc<Self>, token: CancellationToken) {
        if let Err(e) = self.update_server_configs().await {
            debug!("Initial config refresh failed: {}", e);
        }

        let status_loop = tokio::spawn(Arc::clone(&self).run_status_loop(token.clone()));

        let mut ticker = interval(self.settings.config_update_freq);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => {
                    if let Err(e) = self.update_server_configs().await {
                        debug!("Config refresh failed, keeping previous configs: {}", e);
                    }
                }
            }
        }

        if let Err(e) = status_loop.await {
            error!("Status loop ended abnormally: {}", e);
        }
        info!("Collector stopped");
    }

    async fn run_status_loop(self: Arc<Self>, token: CancellationToken) {
        let mut ticker = interval(self.settings.status_update_freq);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = token.cancelled() => return,
                _ = ticker.tick() => {
                    self.update_status(&token).await;
                }
            }
        }
    }

    /// Pulls the server list from the store and refreshes the registry. Store
    /// failures leave the registry as it was.
    pub async fn update_server_configs(&self) -> Result<RefreshSummary, StoreError> {
        let records = match self.store.list_enabled_servers().await {
            Ok(records) => records,
            Err(StoreError::NoRows) => Vec::new(),
            Err(e) => {
                error!("Failed to fetch servers, cannot update state: {}", e);
                return Err(e);
            }
        };

        let configs: Vec<ServerConfig> = records.into_iter().map(ServerConfig::from).collect();
        let summary = self.registry.refresh(configs, &self.state).await;

        if let Some(addr) = self.settings.log_address.as_deref() {
            self.log_address_add(addr).await;
        }

        Ok(summary)
    }

    /// Polls every enabled server once, concurrently, and merges each successful
    /// result as it arrives.
    pub async fn update_status(&self, token: &CancellationToken) -> CycleStats {
        let configs = self.registry.enabled();
        let started = Instant::now();
        let mut tasks = JoinSet::new();

        for config in configs {
            let transport = Arc::clone(&self.transport);
            let settings = self.settings.clone();
            let token = token.clone();
            tasks.spawn(async move {
                let result = poll_server(transport.as_ref(), &config, &settings, &token).await;
                (config.server_id, config.tag, result)
            });
        }

        let mut stats = CycleStats::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((server_id, _, Ok((status, max_visible)))) => {
                    if self.state.apply_status(server_id, status, max_visible) {
                        stats.success += 1;
                    }
                }
                Ok((server_id, tag, Err(e))) => {
                    error!("Failed to update status of {} ({}): {}", tag, server_id, e);
                    stats.fail += 1;
                }
                Err(e) => {
                    error!("Status task failed: {}", e);
                    stats.fail += 1;
                }
            }
        }
        stats.duration = started.elapsed();

        debug!(
            "RCON update cycle complete: success={} fail={} duration={:?}",
            stats.success, stats.fail, stats.duration
        );
        *self.last_cycle.lock() = stats;

        stats
    }

    pub fn current(&self) -> Vec<ServerState> {
        self.state.current()
    }

    pub fn update(&self, server_id: ServerId, update: PartialStateUpdate) -> Result<(), FleetError> {
        self.state.update(server_id, update)
    }

    pub fn find(&self, opts: &FindOpts) -> Vec<FindResult> {
        fleet::find(&self.current(), opts)
    }

    pub fn by_name(&self, name: &str, wildcard_ok: bool) -> Vec<ServerState> {
        fleet::by_name(&self.current(), name, wildcard_ok)
    }

    pub fn by_server_id(&self, server_id: ServerId) -> Option<ServerState> {
        self.state.get(server_id)
    }

    pub fn server_ids_by_name(&self, name: &str, wildcard_ok: bool) -> Result<Vec<ServerId>, FleetError> {
        let ids: Vec<ServerId> = self
            .by_name(name, wildcard_ok)
            .iter()
            .map(|s| s.server_id)
            .collect();
        if ids.is_empty() {
            return Err(FleetError::ServerNotFound(name.to_string()));
        }
        Ok(ids)
    }

    pub fn sort_region(&self) -> BTreeMap<String, Vec<ServerState>> {
        fleet::sort_region(&self.current())
    }

    pub async fn exec_raw(&self, addr: &str, password: &str, cmd: &str) -> Result<String, RconError> {
        exec_bounded(self.transport.as_ref(), addr, password, &self.settings, cmd).await
    }

    pub async fn exec_server(&self, server_id: ServerId, cmd: &str) -> Result<String, FleetError> {
        let config = self
            .registry
            .get_by_id(server_id)
            .ok_or(FleetError::UnknownServer(server_id))?;
        Ok(self.exec_raw(&config.addr(), &config.rcon_password, cmd).await?)
    }

    /// Runs `cmd` on the given servers, or on every enabled server when `server_ids`
    /// is empty. Failing servers are logged and left out of the result. Cancelling
    /// `token` ends the calls still in flight; responses that already arrived are
    /// returned.
    pub async fn broadcast(
        &self,
        server_ids: &[ServerId],
        cmd: &str,
        token: &CancellationToken,
    ) -> HashMap<ServerId, String> {
        let configs: Vec<ServerConfig> = if server_ids.is_empty() {
            self.registry.enabled()
        } else {
            server_ids
                .iter()
                .filter_map(|id| {
                    let config = self.registry.get_by_id(*id);
                    if config.is_none() {
                        warn!("Skipping broadcast to unknown server {}", id);
                    }
                    config
                })
                .collect()
        };

        let mut tasks = JoinSet::new();
        for config in configs {
            let transport = Arc::clone(&self.transport);
            let settings = self.settings.clone();
            let cmd = cmd.to_string();
            let token = token.clone();
            tasks.spawn(async move {
                let result = exec_cancellable(transport.as_ref(), &config, &settings, &token, &cmd).await;
                (config.server_id, config.tag, result)
            });
        }

        let mut results = HashMap::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((server_id, _, Ok(resp))) => {
                    results.insert(server_id, resp);
                }
                Ok((server_id, tag, Err(e))) if e.is_cancellation() => {
                    debug!("Broadcast to {} ({}) cancelled: {}", tag, server_id, e);
                }
                Ok((server_id, tag, Err(e))) => {
                    error!("Failed to exec server command on {} ({}): {}", tag, server_id, e);
                }
                Err(e) => error!("Broadcast task failed: {}", e),
            }
        }

        results
    }

    /// Runs the command built by `on_found` on the server of every matched player.
    pub async fn find_exec<F>(&self, opts: &FindOpts, on_found: F) -> Result<(), FleetError>
    where
        F: Fn(&FindResult) -> String,
    {
        let found = self.find(opts);
        if found.is_empty() {
            return Err(FleetError::PlayerNotFound);
        }

        let mut errors = Vec::new();
        for result in &found {
            if let Err(e) = self.exec_server(result.server_id, &on_found(result)).await {
                errors.push(e);
            }
        }

        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(FleetError::Multiple(errors)),
        }
    }

    /// Kicks the player from whichever server they are on.
    pub async fn kick(&self, target: SteamID, reason: &str) -> Result<(), FleetError> {
        self.find_exec(&FindOpts::steam_id(target), |found| {
            format!("sm_kick #{} {}", found.player.user_id, reason)
        })
        .await
    }

    pub async fn kick_player_id(&self, player_id: i32, server_id: ServerId, reason: &str) -> Result<(), FleetError> {
        self.exec_server(server_id, &format!("sm_kick #{} {}", player_id, reason))
            .await
            .map(|_| ())
    }

    /// Gags and mutes the player.
    pub async fn silence(&self, target: SteamID, reason: &str) -> Result<(), FleetError> {
        self.find_exec(&FindOpts::steam_id(target), |found| {
            format!(r##"sm_silence "#{}" {}"##, found.player.steam_id.steam3(), reason)
        })
        .await
    }

    pub async fn say(&self, server_id: ServerId, message: &str) -> Result<(), FleetError> {
        self.exec_server(server_id, &format!("sm_say {}", message)).await.map(|_| ())
    }

    pub async fn csay(&self, server_id: ServerId, message: &str) -> Result<(), FleetError> {
        self.exec_server(server_id, &format!("sm_csay {}", message)).await.map(|_| ())
    }

    /// Private message to a player on whichever server they are on.
    pub async fn psay(&self, target: SteamID, message: &str) -> Result<(), FleetError> {
        self.find_exec(&FindOpts::steam_id(target), |_| {
            format!(r##"sm_psay "#{}" "{}""##, target.steam3(), message)
        })
        .await
    }

    pub async fn log_address_add(&self, addr: &str) {
        info!("Enabling log forwarding to {}", addr);
        self.broadcast(&[], &format!("logaddress_add {}", addr), &CancellationToken::new())
            .await;
    }

    pub async fn log_address_del(&self, addr: &str) {
        info!("Disabling log forwarding to {}", addr);
        self.broadcast(&[], &format!("logaddress_del {}", addr), &CancellationToken::new())
            .await;
    }
}

async fn exec_bounded<T: RconTransport>(
    transport: &T,
    addr: &str,
    password: &str,
    settings: &CollectorSettings,
    cmd: &str,
) -> Result<String, RconError> {
    match timeout(settings.exec_timeout, transport.exec(addr, password, settings.rcon_timeout, cmd)).await {
        Ok(res) => res,
        Err(_) => Err(RconError::Timeout(addr.to_string())),
    }
}

async fn exec_cancellable<T: RconTransport>(
    transport: &T,
    config: &ServerConfig,
    settings: &CollectorSettings,
    token: &CancellationToken,
    cmd: &str,
) -> Result<String, RconError> {
    let addr = config.addr();
    tokio::select! {
        _ = token.cancelled() => Err(RconError::Cancelled),
        res = exec_bounded(transport, &addr, &config.rcon_password, settings, cmd) => res,
    }
}

/// `status` must succeed; `sv_visiblemaxplayers` failing only costs the visible cap.
async fn poll_server<T: RconTransport>(
    transport: &T,
    config: &ServerConfig,
    settings: &CollectorSettings,
    token: &CancellationToken,
) -> Result<(Status, Option<i32>), FleetError> {
    let resp = exec_cancellable(transport, config, settings, token, "status").await?;
    let status = parse_status(&resp, true)?;

    let max_visible = match exec_cancellable(transport, config, settings, token, "sv_visiblemaxplayers").await {
        Ok(resp) => match parse_visible_max_players(&resp) {
            Ok(max) => Some(max),
            Err(e) => {
                warn!("Got invalid max players value from {}: {}", config.tag, e);
                None
            }
        },
        Err(RconError::Cancelled) => return Err(RconError::Cancelled.into()),
        Err(e) => {
            warn!("Failed to fetch sv_visiblemaxplayers from {}: {}", config.tag, e);
            None
        }
    };

    Ok((status, max_visible))
}
