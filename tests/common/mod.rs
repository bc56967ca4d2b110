// tests/common/mod.rs
#![allow(dead_code)]

use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use fleetstate::{
    Collector, CollectorSettings, MemoryServerStore, RconError, RconTransport, ServerId, ServerRecord,
};

/// Transport answering from canned per-address output and recording every call.
#[derive(Debug, Default)]
pub struct ScriptedRcon {
    status: Mutex<HashMap<String, String>>,
    down: Mutex<HashSet<String>>,
    hang: Mutex<HashSet<String>>,
    calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedRcon {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_status(&self, addr: &str, text: String) {
        self.status.lock().insert(addr.to_string(), text);
    }

    pub fn set_down(&self, addr: &str, down: bool) {
        let mut set = self.down.lock();
        if down {
            set.insert(addr.to_string());
        } else {
            set.remove(addr);
        }
    }

    /// Calls to `addr` never complete.
    pub fn set_hang(&self, addr: &str) {
        self.hang.lock().insert(addr.to_string());
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().clone()
    }

    pub fn commands_to(&self, addr: &str) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter(|(a, _)| a == addr)
            .map(|(_, c)| c.clone())
            .collect()
    }

    fn respond(&self, addr: &str, command: &str) -> Result<String, RconError> {
        self.calls.lock().push((addr.to_string(), command.to_string()));

        if self.down.lock().contains(addr) {
            return Err(RconError::Dial {
                addr: addr.to_string(),
                source: io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused"),
            });
        }

        match command {
            "status" => self
                .status
                .lock()
                .get(addr)
                .cloned()
                .ok_or_else(|| RconError::Protocol(format!("no script for {}", addr))),
            "sv_visiblemaxplayers" => Ok(r#""sv_visiblemaxplayers" = "-1" ( def. "-1" )"#.to_string()),
            _ => Ok(format!("ok: {}", command)),
        }
    }
}

impl RconTransport for ScriptedRcon {
    fn exec(
        &self,
        addr: &str,
        _password: &str,
        _timeout: Duration,
        command: &str,
    ) -> impl Future<Output = Result<String, RconError>> + Send {
        let hang = self.hang.lock().contains(addr);
        let result = self.respond(addr, command);
        async move {
            if hang {
                std::future::pending::<()>().await;
            }
            result
        }
    }
}

pub type TestCollector = Collector<ScriptedRcon, MemoryServerStore>;

pub fn addr(id: ServerId) -> String {
    format!("127.0.0.1:{}", 27000 + id)
}

pub fn record(id: ServerId, name: &str) -> ServerRecord {
    ServerRecord {
        server_id: id,
        short_name: name.to_lowercase(),
        name: format!("{} default", name),
        address: "127.0.0.1".to_string(),
        port: 27000 + id as u16,
        rcon: "hunter2".to_string(),
        reserved_slots: 0,
        cc: "us".to_string(),
        region: if id % 2 == 0 { "eu".to_string() } else { "na".to_string() },
        latitude: 0.0,
        longitude: 0.0,
        is_enabled: true,
    }
}

pub fn settings() -> CollectorSettings {
    CollectorSettings {
        rcon_timeout: Duration::from_millis(200),
        exec_timeout: Duration::from_millis(400),
        ..Default::default()
    }
}

pub fn collector(
    records: Vec<ServerRecord>,
) -> (Arc<TestCollector>, Arc<ScriptedRcon>, Arc<MemoryServerStore>) {
    let transport = Arc::new(ScriptedRcon::new());
    let store = Arc::new(MemoryServerStore::with_records(records));
    let collector = Arc::new(Collector::with_shared(Arc::clone(&transport), Arc::clone(&store), settings()));
    (collector, transport, store)
}

/// A player row as printed by `status`; the steam account id doubles as user id.
pub fn player_row(user_id: i32, name: &str, ip: &str) -> String {
    format!(
        "#    {} \"{}\"    [U:1:{}]    12:34    50    0 active {}:27005",
        user_id, name, user_id, ip
    )
}

pub fn status_text(hostname: &str, map: &str, players: &[String], max: i32) -> String {
    let mut text = format!(
        "hostname: {}\n\
         version : 8622567/24 8622567 secure\n\
         udp/ip  : 0.0.0.0:27015  (public ip: 23.239.22.163)\n\
         map     : {} at: 0 x, 0 y, 0 z\n\
         tags    : payload,uncletopia\n\
         players : {} humans, 0 bots ({} max)\n\
         edicts  : 1000 used of 2048 max\n\
         # userid name                uniqueid            connected ping loss state  adr\n",
        hostname,
        map,
        players.len(),
        max
    );
    for row in players {
        text.push_str(row);
        text.push('\n');
    }
    text
}

pub fn numbered_players(count: i32, first_id: i32, ip_prefix: &str) -> Vec<String> {
    (0..count)
        .map(|i| player_row(first_id + i, &format!("player{}", first_id + i), &format!("{}.{}", ip_prefix, i + 1)))
        .collect()
}
