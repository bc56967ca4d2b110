// tests/http.rs
mod common;

use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use governor::{Quota, RateLimiter};
use serde_json::Value;
use std::num::NonZeroU32;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use common::*;
use fleetstate::handlers::{self, KeyedRateLimiter};
use fleetstate::{MemoryServerStore, PartialStateUpdate};

macro_rules! app {
    ($collector:expr, $burst:expr) => {{
        let limiter: web::Data<KeyedRateLimiter> = web::Data::new(RateLimiter::keyed(
            Quota::per_minute(NonZeroU32::new(1).unwrap()).allow_burst(NonZeroU32::new($burst).unwrap()),
        ));
        test::init_service(
            App::new()
                .app_data(web::Data::from(Arc::clone(&$collector)))
                .app_data(limiter)
                .route("/servers/state", web::get().to(handlers::state::get_state::<ScriptedRcon, MemoryServerStore>))
                .route("/servers/regions", web::get().to(handlers::state::get_regions::<ScriptedRcon, MemoryServerStore>))
                .route("/servers/{id}/state", web::post().to(handlers::state::update_state::<ScriptedRcon, MemoryServerStore>))
                .route("/players/find", web::get().to(handlers::players::find_players::<ScriptedRcon, MemoryServerStore>)),
        )
        .await
    }};
}

async fn polled_fleet() -> Arc<TestCollector> {
    let (collector, transport, _store) = collector(vec![record(1, "Alpha"), record(2, "Bravo")]);
    transport.set_status(&addr(1), status_text("Alpha | 1", "pl_upward", &numbered_players(2, 100, "10.0.1"), 24));
    transport.set_status(&addr(2), status_text("Bravo | 2", "cp_gullywash_final1", &numbered_players(1, 200, "10.0.2"), 24));
    collector.update_server_configs().await.unwrap();
    collector.update_status(&CancellationToken::new()).await;
    collector
}

#[actix_web::test]
async fn state_listing() {
    let collector = polled_fleet().await;
    let app = app!(collector, 10);

    let req = test::TestRequest::get().uri("/servers/state").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let servers = body.as_array().unwrap();
    assert_eq!(servers.len(), 2);
    assert_eq!(servers[0]["name"], "Alpha | 1");
    assert_eq!(servers[0]["player_count"], 2);

    let req = test::TestRequest::get().uri("/servers/regions").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["na"].as_array().unwrap().len(), 1);
    assert_eq!(body["eu"][0]["server_id"], 2);
}

#[actix_web::test]
async fn player_search() {
    let collector = polled_fleet().await;
    let app = app!(collector, 10);

    let req = test::TestRequest::get().uri("/players/find?cidr=10.0.0.0/16").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body.as_array().unwrap().len(), 3);

    let req = test::TestRequest::get().uri("/players/find?steam_id=%5BU:1:200%5D").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body[0]["server_id"], 2);
    assert_eq!(body[0]["player"]["name"], "player200");

    let req = test::TestRequest::get().uri("/players/find?ip=192.168.1.1").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::get().uri("/players/find").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn state_update_route() {
    let collector = polled_fleet().await;
    let app = app!(collector, 2);
    let peer = "10.20.30.40:5555".parse().unwrap();
    let update = PartialStateUpdate {
        current_map: "koth_product_final".to_string(),
        players_real: 20,
        players_total: 22,
        players_visible: 24,
        ..Default::default()
    };

    let req = test::TestRequest::post()
        .uri("/servers/1/state")
        .peer_addr(peer)
        .set_json(&update)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
    let alpha = collector.by_server_id(1).unwrap();
    assert_eq!(alpha.map, "koth_product_final");
    assert_eq!(alpha.bots, 2);

    let req = test::TestRequest::post()
        .uri("/servers/99/state")
        .peer_addr(peer)
        .set_json(&update)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    assert!(collector.by_server_id(99).is_none());

    let req = test::TestRequest::post()
        .uri("/servers/1/state")
        .peer_addr(peer)
        .set_json(&update)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::TOO_MANY_REQUESTS);
}
