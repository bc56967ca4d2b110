// src/main.rs
use actix_web::{web, App, HttpServer};
use env_logger::Env;
use governor::RateLimiter;
use log::{error, info};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use dotenv;

use fleetstate::config::Config;
use fleetstate::handlers::{self, KeyedRateLimiter};
use fleetstate::{Collector, FleetCollector, MemoryServerStore, SourceRcon};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();

    // Initialize logger only once at the start
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let config = Config::from_env();

    let store = match MemoryServerStore::load_file(&config.servers_file) {
        Ok(store) => store,
        Err(e) => {
            error!("Failed to load servers from {}: {}", config.servers_file, e);
            MemoryServerStore::new()
        }
    };

    let collector: Arc<FleetCollector> = Arc::new(Collector::new(
        SourceRcon::new(),
        store,
        config.collector_settings(),
    ));

    let token = CancellationToken::new();
    let collector_task = tokio::spawn(Arc::clone(&collector).start(token.clone()));

    let collector_data = web::Data::from(Arc::clone(&collector));
    let state_update_rate_limiter: web::Data<KeyedRateLimiter> =
        web::Data::new(RateLimiter::keyed(config.state_update_quota()));

    let bind = config.bind();
    info!("Starting server on {}", bind);
    let result = HttpServer::new(move || {
        App::new()
            .app_data(collector_data.clone())
            .app_data(state_update_rate_limiter.clone())
            .route("/servers/state", web::get().to(handlers::state::get_state::<SourceRcon, MemoryServerStore>))
            .route("/servers/regions", web::get().to(handlers::state::get_regions::<SourceRcon, MemoryServerStore>))
            .route("/servers/{id}/state", web::post().to(handlers::state::update_state::<SourceRcon, MemoryServerStore>))
            .route("/players/find", web::get().to(handlers::players::find_players::<SourceRcon, MemoryServerStore>))
    })
        .bind(&bind)?
        .run().await;

    info!("HTTP server stopped, shutting down collector");
    token.cancel();
    if let Err(e) = collector_task.await {
        error!("Collector task failed: {}", e);
    }

    result
}
