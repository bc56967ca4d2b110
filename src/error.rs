// src/error.rs
use std::num::ParseIntError;
use thiserror::Error;

use crate::models::server::ServerId;

/// Raised when remote console output does not have the expected shape.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid {field} value: {source}")]
    InvalidNumber {
        field: &'static str,
        #[source]
        source: ParseIntError,
    },
    #[error("{0} value out of range")]
    OutOfRange(&'static str),
    #[error("invalid address {0}")]
    InvalidAddress(String),
    #[error("malformed {0} header")]
    MalformedHeader(&'static str),
    #[error("failed to parse sv_visiblemaxplayers response")]
    VisibleMaxPlayers,
}

impl ParseError {
    pub(crate) fn number(field: &'static str) -> impl FnOnce(ParseIntError) -> Self {
        move |source| Self::InvalidNumber { field, source }
    }
}

#[derive(Debug, Error)]
pub enum RconError {
    #[error("failed to dial {addr}: {source}")]
    Dial {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("timed out talking to {0}")]
    Timeout(String),
    #[error("bad rcon password for {0}")]
    AuthRejected(String),
    #[error("rcon protocol error: {0}")]
    Protocol(String),
    #[error("rcon io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("rcon call cancelled")]
    Cancelled,
}

impl RconError {
    /// Cancellation and timeouts are expected during shutdown or when a server is down.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Timeout(_))
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no rows")]
    NoRows,
    #[error("store io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to decode server records: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum FleetError {
    #[error("unknown server: {0}")]
    UnknownServer(ServerId),
    #[error("could not find player")]
    PlayerNotFound,
    #[error("could not find server: {0}")]
    ServerNotFound(String),
    #[error(transparent)]
    Rcon(#[from] RconError),
    #[error("failed to parse status response: {0}")]
    Parse(#[from] ParseError),
    #[error("{} commands failed", .0.len())]
    Multiple(Vec<FleetError>),
}
