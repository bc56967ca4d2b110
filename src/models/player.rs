// src/models/player.rs
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::time::Duration;

use steamid_ng::{AccountType, SteamID};

/// Accepts the `[U:1:N]` form printed by `status` or a 64-bit id of an individual account.
pub fn parse_steam_id(value: &str) -> Option<SteamID> {
    if let Ok(sid) = SteamID::from_steam3(value) {
        return Some(sid);
    }
    let sid = SteamID::from(value.parse::<u64>().ok()?);
    (sid.account_type() == AccountType::Individual).then_some(sid)
}

/// One row of the status player table. Rebuilt on every poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub user_id: i32,
    pub name: String,
    pub steam_id: SteamID,
    pub connected: Duration,
    pub ping: i32,
    pub loss: i32,
    pub state: String,
    pub ip: Option<IpAddr>,
    pub port: u16,
    pub score: i32,
}
