// src/status.rs
//! Parsers for the text returned by the `status` and `sv_visiblemaxplayers`
//! remote console commands.
//!
//! Both functions build into a local value and only hand it back once every field
//! parsed, so callers never see a half-filled [`Status`].
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use std::net::IpAddr;
use std::time::Duration;

use crate::error::ParseError;
use steamid_ng::SteamID;

use crate::models::player::Player;

/// `sv_visiblemaxplayers` values above this are leftovers from broken configs.
pub const MAX_PLAYERS_SUPPORTED: i32 = 101;

const PLAYER_GROUPS: usize = 8;
const PLAYER_GROUPS_FULL: usize = 10;

lazy_static! {
    static ref PLAYER_RE: Regex = Regex::new(
        r#"^#\s+(\d+)\s+"(.*)"\s+(\[U:\d:\d+\])\s+(\d+:\d{2}(?::\d{2})?)\s+(\d+)\s+(\d+)\s+(\w+)\s*$"#
    ).unwrap();
    static ref PLAYER_FULL_RE: Regex = Regex::new(
        r#"^#\s+(\d+)\s+"(.*)"\s+(\[U:\d:\d+\])\s+(\d+:\d{2}(?::\d{2})?)\s+(\d+)\s+(\d+)\s+(\w+)\s+(\S+?):(\d+)\s*$"#
    ).unwrap();
    static ref HUMANS_BOTS_RE: Regex = Regex::new(r"(\d+)\s+humans?,\s+(\d+)\s+bots?").unwrap();
    static ref MAX_RE: Regex = Regex::new(r"\((\d+)\s+max\)").unwrap();
    static ref EDICTS_RE: Regex = Regex::new(r"^(\d+)\s+used\s+of\s+(\d+)\s+max").unwrap();
    static ref PUBLIC_IP_RE: Regex = Regex::new(r"(?i)\(public ip(?: from steam)?:\s*([^)\s]+)\)").unwrap();
    static ref ADDR_RE: Regex = Regex::new(r"^(\S+?):(\d+)").unwrap();
    static ref VISIBLE_MAX_RE: Regex = Regex::new(r#"^"sv_visiblemaxplayers" = "(-?\d+)""#).unwrap();
}

/// Network details printed in the status header.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IpInfo {
    pub local_ip: String,
    pub local_port: u16,
    pub public_ip: String,
    pub sourcetv_ip: String,
    pub sourcetv_port: u16,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Status {
    pub server_name: String,
    pub version: String,
    pub map: String,
    pub tags: Vec<String>,
    pub players_count: i32,
    pub players_max: i32,
    pub humans: i32,
    pub bots: i32,
    pub edicts: Vec<i32>,
    pub ip_info: IpInfo,
    pub players: Vec<Player>,
}

/// Parses a `status` response. With `full` set the player rows must carry the
/// `ip:port` column, which is only printed for rcon/console callers.
pub fn parse_status(text: &str, full: bool) -> Result<Status, ParseError> {
    let mut status = Status::default();
    let mut bots_seen = false;

    for line in text.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }

        if line.starts_with('#') {
            if let Some(player) = parse_player_row(line, full)? {
                status.players.push(player);
            }
            continue;
        }

        let Some((key, value)) = line.split_once(": ") else {
            continue;
        };
        let value = value.trim();

        match key.trim_end() {
            "hostname" => status.server_name = value.to_string(),
            "version" => status.version = value.to_string(),
            // spawn args may be appended after the map name
            "map" => status.map = value.split(' ').next().unwrap_or_default().to_string(),
            "tags" => status.tags = value.split(',').map(str::to_string).collect(),
            "players" => {
                if let Some(caps) = HUMANS_BOTS_RE.captures(value) {
                    status.humans = number(&caps, 1, "humans")?;
                    status.bots = number(&caps, 2, "bots")?;
                    bots_seen = true;
                }
                let caps = MAX_RE
                    .captures(value)
                    .ok_or(ParseError::MalformedHeader("players"))?;
                status.players_max = number(&caps, 1, "max players")?;
            }
            "edicts" => {
                let caps = EDICTS_RE
                    .captures(value)
                    .ok_or(ParseError::MalformedHeader("edicts"))?;
                status.edicts = vec![number(&caps, 1, "edicts used")?, number(&caps, 2, "edicts max")?];
            }
            "udp/ip" => {
                if let Some(caps) = ADDR_RE.captures(value) {
                    status.ip_info.local_ip = caps[1].to_string();
                    status.ip_info.local_port = caps[2]
                        .parse()
                        .map_err(ParseError::number("udp/ip port"))?;
                }
                if let Some(caps) = PUBLIC_IP_RE.captures(value) {
                    status.ip_info.public_ip = caps[1].to_string();
                }
            }
            "sourcetv" => {
                if let Some(caps) = ADDR_RE.captures(value) {
                    status.ip_info.sourcetv_ip = caps[1].to_string();
                    status.ip_info.sourcetv_port = caps[2]
                        .parse()
                        .map_err(ParseError::number("sourcetv port"))?;
                }
            }
            _ => {}
        }
    }

    // An odd slot count means SourceTV is holding one of them. The legacy header
    // has no bot figure to take it from.
    if bots_seen && status.players_max % 2 != 0 {
        status.bots -= 1;
        status.players_max -= 1;
    }

    status.players_count = status.players.len() as i32;

    Ok(status)
}

fn parse_player_row(line: &str, full: bool) -> Result<Option<Player>, ParseError> {
    let (re, expected) = if full {
        (&*PLAYER_FULL_RE, PLAYER_GROUPS_FULL)
    } else {
        (&*PLAYER_RE, PLAYER_GROUPS)
    };

    let Some(caps) = re.captures(line) else {
        return Ok(None);
    };
    if caps.iter().filter(|m| m.is_some()).count() != expected {
        return Ok(None);
    }

    let steam_id = SteamID::from_steam3(&caps[3]).map_err(|_| ParseError::MalformedHeader("steam id"))?;

    let mut player = Player {
        user_id: number(&caps, 1, "userid")?,
        name: caps[2].to_string(),
        steam_id,
        connected: parse_connected(&caps[4])?,
        ping: number(&caps, 5, "ping")?,
        loss: number(&caps, 6, "loss")?,
        state: caps[7].to_string(),
        ip: None,
        port: 0,
        score: 0,
    };

    if full {
        let ip: IpAddr = caps[8]
            .parse()
            .map_err(|_| ParseError::InvalidAddress(caps[8].to_string()))?;
        player.ip = Some(ip);
        player.port = caps[9].parse().map_err(ParseError::number("port"))?;
    }

    Ok(Some(player))
}

/// `H:MM:SS` or `MM:SS`.
fn parse_connected(value: &str) -> Result<Duration, ParseError> {
    const WEIGHTS: [u64; 3] = [1, 60, 3600];

    let mut total = 0u64;
    for (part, weight) in value.rsplit(':').zip(WEIGHTS) {
        let v: u64 = part.parse().map_err(ParseError::number("connected"))?;
        total = v
            .checked_mul(weight)
            .and_then(|secs| total.checked_add(secs))
            .ok_or(ParseError::OutOfRange("connected"))?;
    }

    Ok(Duration::from_secs(total))
}

fn number(caps: &Captures<'_>, idx: usize, field: &'static str) -> Result<i32, ParseError> {
    caps[idx].parse().map_err(ParseError::number(field))
}

/// Parses the convar echo of `sv_visiblemaxplayers`. Returns `-1` when the value
/// is unset or beyond what a server can actually hold.
pub fn parse_visible_max_players(text: &str) -> Result<i32, ParseError> {
    let caps = VISIBLE_MAX_RE
        .captures(text.trim_start())
        .ok_or(ParseError::VisibleMaxPlayers)?;

    let max_players: i32 = caps[1].parse().map_err(ParseError::number("sv_visiblemaxplayers"))?;
    if max_players > MAX_PLAYERS_SUPPORTED {
        return Ok(-1);
    }

    Ok(max_players)
}
