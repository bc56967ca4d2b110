//! Fleet state collection for remotely hosted game servers.
//!
//! A [`Collector`] keeps an eventually fresh table of every configured server's
//! live state by polling each one over RCON, and runs commands across the fleet.
//! Remote failures stay isolated to the server they happened on.

pub mod collector;
pub mod config;
pub mod error;
pub mod fleet;
pub mod handlers;
pub mod models;
pub mod rcon;
pub mod registry;
pub mod state;
pub mod status;
pub mod storage;
pub mod utils;

pub use collector::{Collector, CollectorSettings, CycleStats};
pub use error::{FleetError, ParseError, RconError, StoreError};
pub use fleet::{FindOpts, FindResult};
pub use models::player::{parse_steam_id, Player};
pub use steamid_ng::SteamID;
pub use models::server::{PartialStateUpdate, ServerConfig, ServerId, ServerRecord, ServerState};
pub use rcon::{RconTransport, SourceRcon};
pub use storage::memory::MemoryServerStore;
pub use storage::ServerStore;

pub type FleetCollector = Collector<SourceRcon, MemoryServerStore>;
