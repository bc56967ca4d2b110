// src/handlers/state.rs
use actix_web::{web, HttpRequest, HttpResponse};
use log::{debug, error};

use super::KeyedRateLimiter;
use crate::collector::Collector;
use crate::models::server::{PartialStateUpdate, ServerId};
use crate::rcon::RconTransport;
use crate::storage::ServerStore;
use crate::utils::{extract_peer_ip, RequestError};

pub async fn get_state<T: RconTransport, S: ServerStore>(
    collector: web::Data<Collector<T, S>>,
) -> Result<HttpResponse, RequestError> {
    let servers = collector.current();
    debug!("Returning state of {} servers", servers.len());
    Ok(HttpResponse::Ok().json(servers))
}

pub async fn get_regions<T: RconTransport, S: ServerStore>(
    collector: web::Data<Collector<T, S>>,
) -> Result<HttpResponse, RequestError> {
    Ok(HttpResponse::Ok().json(collector.sort_region()))
}

/// A game server reporting its own state between polls.
pub async fn update_state<T: RconTransport, S: ServerStore>(
    req: HttpRequest,
    path: web::Path<ServerId>,
    update: web::Json<PartialStateUpdate>,
    collector: web::Data<Collector<T, S>>,
    rate_limiter: web::Data<KeyedRateLimiter>,
) -> Result<HttpResponse, RequestError> {
    let peer_ip = extract_peer_ip(&req)?;

    if rate_limiter.check_key(&peer_ip).is_err() {
        error!("Rate limit exceeded for state update for ip: {}", peer_ip);
        return Err(RequestError::RateLimitExceeded);
    }

    let server_id = path.into_inner();
    if let Err(e) = collector.update(server_id, update.into_inner()) {
        error!("Rejected state update from {} for server {}: {}", peer_ip, server_id, e);
        return Err(e.into());
    }

    debug!("Applied state update for server {}", server_id);
    Ok(HttpResponse::Ok().finish())
}
