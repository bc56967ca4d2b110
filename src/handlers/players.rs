// src/handlers/players.rs
use actix_web::{web, HttpResponse};
use ipnetwork::IpNetwork;
use log::debug;
use serde::Deserialize;
use std::net::IpAddr;

use crate::collector::Collector;
use crate::fleet::FindOpts;
use crate::models::player::parse_steam_id;
use crate::rcon::RconTransport;
use crate::storage::ServerStore;
use crate::utils::RequestError;

#[derive(Debug, Default, Deserialize)]
pub struct FindQuery {
    pub name: Option<String>,
    pub steam_id: Option<String>,
    pub ip: Option<String>,
    pub cidr: Option<String>,
}

impl FindQuery {
    pub fn into_opts(self) -> Result<FindOpts, RequestError> {
        let steam_id = self
            .steam_id
            .map(|s| parse_steam_id(&s).ok_or_else(|| RequestError::InvalidQuery(format!("steam_id: {}", s))))
            .transpose()?;
        let addr = self
            .ip
            .map(|s| s.parse::<IpAddr>())
            .transpose()
            .map_err(|e| RequestError::InvalidQuery(format!("ip: {}", e)))?;
        let cidr = self
            .cidr
            .map(|s| s.parse::<IpNetwork>())
            .transpose()
            .map_err(|e| RequestError::InvalidQuery(format!("cidr: {}", e)))?;

        let opts = FindOpts {
            name: self.name,
            steam_id,
            addr,
            cidr,
        };
        if opts.is_empty() {
            return Err(RequestError::InvalidQuery("no search criteria given".to_string()));
        }
        Ok(opts)
    }
}

pub async fn find_players<T: RconTransport, S: ServerStore>(
    query: web::Query<FindQuery>,
    collector: web::Data<Collector<T, S>>,
) -> Result<HttpResponse, RequestError> {
    let opts = query.into_inner().into_opts()?;
    let found = collector.find(&opts);
    if found.is_empty() {
        return Err(RequestError::NotFound("player"));
    }

    debug!("Player search matched {} players", found.len());
    Ok(HttpResponse::Ok().json(found))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_conversion() {
        let opts = FindQuery {
            steam_id: Some("[U:1:5]".to_string()),
            cidr: Some("10.0.0.0/8".to_string()),
            ..Default::default()
        }
        .into_opts()
        .unwrap();
        assert_eq!(opts.steam_id, parse_steam_id("[U:1:5]"));
        assert!(opts.cidr.is_some());

        assert!(matches!(FindQuery::default().into_opts(), Err(RequestError::InvalidQuery(_))));
        let bad = FindQuery { ip: Some("nope".to_string()), ..Default::default() };
        assert!(matches!(bad.into_opts(), Err(RequestError::InvalidQuery(_))));
    }
}
