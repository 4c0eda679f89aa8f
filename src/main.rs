// region:    --- Imports
use crate::broadcast::RoomBroadcaster;
use crate::catalog::PostgresCatalogStore;
use crate::database::DatabaseManager;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};
// endregion: --- Imports

// region:    --- Modules
mod bidding;
mod broadcast;
mod catalog;
mod database;
mod handlers;
mod notification;
mod query;
mod wish;

// endregion: --- Modules

// region:    --- Main
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // logging 초기화
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .without_time()
        .with_target(false)
        .init();

    // DatabaseManager 생성
    let db_manager = Arc::new(DatabaseManager::new().await);

    // 데이터베이스 초기화
    if let Err(e) = db_manager.initialize_database().await {
        error!("{:<12} --> 데이터베이스 초기화 실패: {:?}", "Main", e);
        return Err(e.into());
    }
    info!("{:<12} --> 데이터베이스 초기화 성공", "Main");

    // 방 브로드캐스터는 프로세스당 하나를 만들어 상태로 넘긴다
    let broadcaster = Arc::new(RoomBroadcaster::new());

    // 카탈로그 읽기 어댑터
    let catalog = Arc::new(PostgresCatalogStore::new(db_manager.get_pool()));

    // 테스트 페이지를 위한 cors 설정
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // 라우터 설정
    let routes_all = Router::new()
        .route("/bid", post(handlers::handle_bid))
        .route("/rooms/:id", get(handlers::handle_get_room_state))
        .route(
            "/rooms/:id/highest-bid",
            get(handlers::handle_get_highest_bid),
        )
        .route("/rooms/:id/bids", get(handlers::handle_get_bid_history))
        .route("/rooms/:id/stream", get(handlers::handle_room_stream))
        .route(
            "/products/:id/created",
            post(handlers::handle_product_created),
        )
        .layer(cors)
        .with_state((db_manager, broadcaster, catalog));

    // 리스너 생성
    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = TcpListener::bind(&bind_addr).await?;
    info!(
        "{:<12} --> Web Server: Listening on {}",
        "Main",
        listener.local_addr()?
    );

    // 서버 실행
    if let Err(err) = axum::serve(listener, routes_all.into_make_service()).await {
        error!("{:<12} --> Server error: {}", "Main", err);
    }
    Ok(())
}
// endregion: --- Main
