// src/fleet.rs
//! Read-only queries over a fleet snapshot.
use glob::Pattern;
use ipnetwork::IpNetwork;
use serde::Serialize;
use std::collections::BTreeMap;
use std::net::IpAddr;

use steamid_ng::SteamID;

use crate::models::player::Player;
use crate::models::server::{ServerId, ServerState};

/// Player search criteria. A player matches when any one of the set fields does.
#[derive(Debug, Clone, Default)]
pub struct FindOpts {
    pub name: Option<String>,
    pub steam_id: Option<SteamID>,
    pub addr: Option<IpAddr>,
    pub cidr: Option<IpNetwork>,
}

impl FindOpts {
    pub fn steam_id(steam_id: SteamID) -> Self {
        Self {
            steam_id: Some(steam_id),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.as_deref().map_or(true, str::is_empty)
            && self.steam_id.is_none()
            && self.addr.is_none()
            && self.cidr.is_none()
    }

    fn name_pattern(&self) -> Option<Pattern> {
        self.name.as_deref().filter(|n| !n.is_empty()).and_then(name_pattern)
    }

    fn matches(&self, player: &Player, name: Option<&Pattern>) -> bool {
        if self.steam_id.is_some_and(|sid| sid == player.steam_id) {
            return true;
        }

        if name.is_some_and(|pattern| pattern.matches(&player.name.to_lowercase())) {
            return true;
        }

        match player.ip {
            Some(ip) => {
                self.addr.is_some_and(|addr| addr == ip) || self.cidr.is_some_and(|cidr| cidr.contains(ip))
            }
            None => false,
        }
    }
}

/// A matched player and the server it is connected to.
#[derive(Debug, Clone, Serialize)]
pub struct FindResult {
    pub player: Player,
    pub server_id: ServerId,
    pub server_name: String,
}

pub fn find(servers: &[ServerState], opts: &FindOpts) -> Vec<FindResult> {
    let name = opts.name_pattern();
    let mut found = Vec::new();
    for server in servers {
        for player in server.players.iter().filter(|p| opts.matches(p, name.as_ref())) {
            found.push(FindResult {
                player: player.clone(),
                server_id: server.server_id,
                server_name: server.name_short.clone(),
            });
        }
    }
    found
}

/// `*` selects everything when wildcards are allowed; otherwise the first server
/// whose short name matches the wrapped glob.
pub fn by_name(servers: &[ServerState], name: &str, wildcard_ok: bool) -> Vec<ServerState> {
    if name == "*" && wildcard_ok {
        return servers.to_vec();
    }

    let pattern = name_pattern(name);
    servers
        .iter()
        .find(|s| {
            pattern.as_ref().is_some_and(|p| p.matches(&s.name_short.to_lowercase()))
                || s.name_short.eq_ignore_ascii_case(name)
        })
        .cloned()
        .into_iter()
        .collect()
}

/// Groups servers by region, keeping snapshot order inside each group.
pub fn sort_region(servers: &[ServerState]) -> BTreeMap<String, Vec<ServerState>> {
    let mut regions: BTreeMap<String, Vec<ServerState>> = BTreeMap::new();
    for server in servers {
        regions.entry(server.region.clone()).or_default().push(server.clone());
    }
    regions
}

/// Builds the case-folded glob for a name query. The query is wrapped in wildcards
/// and `*` stays the only wildcard; every other character matches literally.
pub fn name_pattern(query: &str) -> Option<Pattern> {
    let mut glob = String::from("*");
    for piece in query.to_lowercase().split('*').filter(|p| !p.is_empty()) {
        glob.push_str(&Pattern::escape(piece));
        glob.push('*');
    }
    Pattern::new(&glob).ok()
}
