// src/rcon.rs
use log::debug;
use rcon::Connection;
use std::future::Future;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::error::RconError;

/// Executes one remote console command against one server.
///
/// No connection is kept between calls.
pub trait RconTransport: Send + Sync + 'static {
    fn exec(
        &self,
        addr: &str,
        password: &str,
        timeout: Duration,
        command: &str,
    ) -> impl Future<Output = Result<String, RconError>> + Send;
}

/// Source engine RCON client. Opens a fresh session for every command.
#[derive(Debug, Clone, Default)]
pub struct SourceRcon;

impl SourceRcon {
    pub fn new() -> Self {
        Self
    }
}

impl RconTransport for SourceRcon {
    fn exec(
        &self,
        addr: &str,
        password: &str,
        limit: Duration,
        command: &str,
    ) -> impl Future<Output = Result<String, RconError>> + Send {
        let addr = addr.to_string();
        let password = password.to_string();
        let command = command.to_string();
        async move {
            let mut conn = match timeout(limit, connect(&addr, &password)).await {
                Ok(res) => res?,
                Err(_) => return Err(RconError::Timeout(addr)),
            };

            let resp = match timeout(limit, conn.cmd(&command)).await {
                Ok(res) => res.map_err(|e| command_error(&addr, e))?,
                Err(_) => return Err(RconError::Timeout(addr)),
            };
            debug!("rcon {} -> {} ({} bytes)", command, addr, resp.len());

            Ok(resp)
        }
    }
}

async fn connect(addr: &str, password: &str) -> Result<Connection<TcpStream>, RconError> {
    Connection::<TcpStream>::builder()
        .connect(addr, password)
        .await
        .map_err(|e| match e {
            rcon::Error::Auth => RconError::AuthRejected(addr.to_string()),
            rcon::Error::Io(source) => RconError::Dial {
                addr: addr.to_string(),
                source,
            },
            other => RconError::Protocol(other.to_string()),
        })
}

fn command_error(addr: &str, e: rcon::Error) -> RconError {
    match e {
        rcon::Error::Io(source) => RconError::Io(source),
        rcon::Error::Auth => RconError::AuthRejected(addr.to_string()),
        other => RconError::Protocol(other.to_string()),
    }
}
