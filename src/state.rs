// src/state.rs
//! The table of live server states.
//!
//! This is a best-effort cache of remote state, not a system of record: there is
//! no consistency between entries, and each entry is at most one status interval
//! (20s by default) old while its server answers. Entries of unreachable servers
//! keep their last known values.
use log::debug;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::FleetError;
use crate::models::server::{PartialStateUpdate, ServerId, ServerState};
use crate::status::Status;

#[derive(Debug, Default)]
pub struct StateTable {
    servers: RwLock<HashMap<ServerId, ServerState>>,
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

impl StateTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every entry, stable-sorted by display name.
    pub fn current(&self) -> Vec<ServerState> {
        let mut current: Vec<ServerState> = self.servers.read().values().cloned().collect();
        current.sort_by(|a, b| a.name.cmp(&b.name));
        current
    }

    pub fn get(&self, server_id: ServerId) -> Option<ServerState> {
        self.servers.read().get(&server_id).cloned()
    }

    pub fn contains(&self, server_id: ServerId) -> bool {
        self.servers.read().contains_key(&server_id)
    }

    pub fn len(&self) -> usize {
        self.servers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.read().is_empty()
    }

    /// Drops `removed` and inserts every state in `added` whose id is not present
    /// yet, in one critical section. Returns the number of inserted entries.
    pub(crate) fn apply_refresh(&self, removed: &[ServerId], added: Vec<ServerState>) -> usize {
        let mut servers = self.servers.write();
        for server_id in removed {
            servers.remove(server_id);
        }

        let mut inserted = 0;
        for state in added {
            if servers.contains_key(&state.server_id) {
                continue;
            }
            servers.insert(state.server_id, state);
            inserted += 1;
        }
        inserted
    }

    /// Merges a parsed status into an existing entry. `max_visible` wins over the
    /// reported slot count when it is set. Returns false if the server was removed
    /// while it was being polled.
    pub(crate) fn apply_status(&self, server_id: ServerId, status: Status, max_visible: Option<i32>) -> bool {
        let mut servers = self.servers.write();
        let Some(server) = servers.get_mut(&server_id) else {
            debug!("Dropping status for removed server {}", server_id);
            return false;
        };

        server.player_count = status.players_count;
        server.max_players = match max_visible {
            Some(max) if max >= 0 => max,
            _ => status.players_max,
        };
        if !status.server_name.is_empty() {
            server.name = status.server_name;
        }
        if !status.map.is_empty() {
            server.map = status.map;
        }
        server.version = status.version;
        server.edicts = status.edicts;
        server.tags = status.tags;
        server.players = status.players;
        server.humans = status.humans;
        server.bots = status.bots;
        if !status.ip_info.public_ip.is_empty() {
            server.ip_public = status.ip_info.public_ip;
            server.port_public = status.ip_info.local_port;
        }
        server.stv_ip = status.ip_info.sourcetv_ip;
        server.stv_port = status.ip_info.sourcetv_port;
        server.last_update = now_secs();

        true
    }

    /// Applies a self-reported update. Unknown ids are rejected, never inserted.
    pub fn update(&self, server_id: ServerId, update: PartialStateUpdate) -> Result<(), FleetError> {
        let mut servers = self.servers.write();
        let server = servers
            .get_mut(&server_id)
            .ok_or(FleetError::UnknownServer(server_id))?;

        if !update.hostname.is_empty() {
            server.name = update.hostname;
        }
        if !update.short_name.is_empty() {
            server.name_short = update.short_name;
        }
        server.map = update.current_map;
        server.player_count = update.players_real;
        server.max_players = update.players_visible;
        server.bots = update.players_total - update.players_real;
        server.last_update = now_secs();

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(id: ServerId, name: &str) -> ServerState {
        ServerState {
            server_id: id,
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn current_is_sorted_copy() {
        let table = StateTable::new();
        table.apply_refresh(&[], vec![state(1, "b"), state(2, "a"), state(3, "c")]);

        let mut current = table.current();
        let names: Vec<&str> = current.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);

        current[0].name = "mutated".to_string();
        assert_eq!(table.get(2).unwrap().name, "a");
    }

    #[test]
    fn refresh_never_duplicates() {
        let table = StateTable::new();
        assert_eq!(table.apply_refresh(&[], vec![state(1, "a")]), 1);
        assert_eq!(table.apply_refresh(&[], vec![state(1, "other")]), 0);
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(1).unwrap().name, "a");

        table.apply_refresh(&[1], vec![]);
        assert!(table.is_empty());
    }

    #[test]
    fn status_merge_replaces_players_and_prefers_visible_max() {
        let table = StateTable::new();
        table.apply_refresh(&[], vec![state(1, "default")]);

        let status = Status {
            server_name: "Live name".to_string(),
            map: "cp_badlands".to_string(),
            players_count: 0,
            players_max: 32,
            ..Default::default()
        };
        assert!(table.apply_status(1, status.clone(), Some(24)));
        let merged = table.get(1).unwrap();
        assert_eq!(merged.name, "Live name");
        assert_eq!(merged.map, "cp_badlands");
        assert_eq!(merged.max_players, 24);

        assert!(table.apply_status(1, Status { server_name: String::new(), ..status.clone() }, Some(-1)));
        let merged = table.get(1).unwrap();
        assert_eq!(merged.name, "Live name");
        assert_eq!(merged.max_players, 32);

        assert!(!table.apply_status(9, status, None));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn update_unknown_server_is_rejected() {
        let table = StateTable::new();
        table.apply_refresh(&[], vec![state(1, "a"), state(2, "b"), state(3, "c")]);
        let before = table.current();

        let err = table
            .update(99, PartialStateUpdate { hostname: "x".to_string(), ..Default::default() })
            .unwrap_err();
        assert!(matches!(err, FleetError::UnknownServer(99)));

        let after = table.current();
        assert_eq!(after.len(), 3);
        assert_eq!(
            before.iter().map(|s| &s.name).collect::<Vec<_>>(),
            after.iter().map(|s| &s.name).collect::<Vec<_>>()
        );
    }

    #[test]
    fn update_applies_self_report() {
        let table = StateTable::new();
        table.apply_refresh(&[], vec![state(1, "a")]);
        table
            .update(
                1,
                PartialStateUpdate {
                    hostname: "Renamed".to_string(),
                    short_name: String::new(),
                    current_map: "koth_lakeside".to_string(),
                    players_real: 10,
                    players_total: 12,
                    players_visible: 24,
                },
            )
            .unwrap();
        let s = table.get(1).unwrap();
        assert_eq!(s.name, "Renamed");
        assert_eq!(s.map, "koth_lakeside");
        assert_eq!(s.player_count, 10);
        assert_eq!(s.bots, 2);
        assert_eq!(s.max_players, 24);
    }
}
