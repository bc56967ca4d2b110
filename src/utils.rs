// src/utils.rs
use actix_web::{HttpRequest, HttpResponse, ResponseError};
use std::net::IpAddr;
use log::debug;
use std::fmt;

use crate::error::FleetError;
use crate::models::server::ServerId;

#[derive(Debug)]
pub enum RequestError {
    MissingPeerIP,
    RateLimitExceeded,
    UnknownServer(ServerId),
    NotFound(&'static str),
    InvalidQuery(String),
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingPeerIP => write!(f, "Failed to extract client IP"),
            Self::RateLimitExceeded => write!(f, "Rate limit exceeded"),
            Self::UnknownServer(id) => write!(f, "Unknown server: {}", id),
            Self::NotFound(what) => write!(f, "No matching {} found", what),
            Self::InvalidQuery(msg) => write!(f, "Invalid query: {}", msg),
        }
    }
}

impl ResponseError for RequestError {
    fn error_response(&self) -> HttpResponse {
        match self {
            Self::RateLimitExceeded => {
                HttpResponse::TooManyRequests().body(self.to_string())
            }
            Self::UnknownServer(_) | Self::NotFound(_) => {
                HttpResponse::NotFound().body(self.to_string())
            }
            _ => HttpResponse::BadRequest().body(self.to_string())
        }
    }
}

impl From<FleetError> for RequestError {
    fn from(e: FleetError) -> Self {
        match e {
            FleetError::UnknownServer(id) => Self::UnknownServer(id),
            FleetError::PlayerNotFound => Self::NotFound("player"),
            FleetError::ServerNotFound(_) => Self::NotFound("server"),
            other => Self::InvalidQuery(other.to_string()),
        }
    }
}

/// The address of the connecting peer, used as the rate limiting key.
pub fn extract_peer_ip(req: &HttpRequest) -> Result<IpAddr, RequestError> {
    let peer_ip = req
        .peer_addr()
        .map(|addr| addr.ip())
        .ok_or(RequestError::MissingPeerIP)?;
    debug!("Request from {}", peer_ip);
    Ok(peer_ip)
}
