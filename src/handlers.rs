// region:    --- Imports
use crate::bidding::commands::{handle_place_bid, PlaceBidCommand};
use crate::broadcast::{ObserverGuard, RoomBroadcaster};
use crate::catalog::PostgresCatalogStore;
use crate::database::DatabaseManager;
use crate::notification;
use crate::query;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive};
use axum::response::{IntoResponse, Sse};
use axum::Json;
use std::convert::Infallible;
use std::sync::Arc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::{Stream, StreamExt};
use tracing::{error, info};

// endregion: --- Imports

/// 핸들러 공유 상태
pub type AppState = (
    Arc<DatabaseManager>,
    Arc<RoomBroadcaster>,
    Arc<PostgresCatalogStore>,
);

// region:    --- Command Handlers

/// 입찰 요청 처리
/// 인증은 상위 계층 담당이라 명령 바디의 user_id를 그대로 신뢰한다.
pub async fn handle_bid(
    State((db_manager, broadcaster, _)): State<AppState>,
    Json(cmd): Json<PlaceBidCommand>,
) -> impl IntoResponse {
    match handle_place_bid(cmd, &db_manager, &broadcaster).await {
        Ok(bid) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "message": "입찰이 성공적으로 처리되었습니다.",
                "bid": bid,
            })),
        )
            .into_response(),
        Err(rejection) if rejection.is_store_error() => {
            error!("{:<12} --> 입찰 저장소 오류: {:?}", "Handler", rejection);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(rejection.response_body()),
            )
                .into_response()
        }
        Err(rejection) => {
            info!(
                "{:<12} --> 입찰 거절: code={}",
                "Handler",
                rejection.code()
            );
            (StatusCode::BAD_REQUEST, Json(rejection.response_body())).into_response()
        }
    }
}

/// 상품 등록 후처리 트리거
/// 상품 행이 커밋된 직후 등록 플로우가 호출한다. 즉시 202를 돌려주고
/// 위시 매칭과 알림 발행은 백그라운드 태스크로 넘긴다.
pub async fn handle_product_created(
    State((db_manager, _, catalog)): State<AppState>,
    Path(product_id): Path<i64>,
) -> impl IntoResponse {
    info!(
        "{:<12} --> 상품 등록 후처리 트리거: product_id={}",
        "Handler", product_id
    );
    notification::dispatch_product_created(db_manager, catalog, product_id);
    (
        StatusCode::ACCEPTED,
        Json(serde_json::json!({
            "message": "위시 매칭이 백그라운드에서 진행됩니다.",
        })),
    )
}

// endregion: --- Command Handlers

// region:    --- Stream Handler

/// 방 실시간 스트림
/// 접속 시점부터의 입찰 수락 이벤트를 SSE로 내려준다.
/// 과거 입찰은 재전송하지 않는다. 늦게 합류하면 그 이전 입찰은 빠진다.
pub async fn handle_room_stream(
    State((_, broadcaster, _)): State<AppState>,
    Path(room_id): Path<i64>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (observer_id, rx) = broadcaster.subscribe(room_id);
    let guard = ObserverGuard::new(Arc::clone(&broadcaster), room_id, observer_id);

    // 클라이언트가 끊으면 스트림과 함께 가드가 드롭되어 관찰자가 해제된다
    let stream = ReceiverStream::new(rx).map(move |bid| {
        let _ = &guard;
        let event = Event::default()
            .json_data(&bid)
            .unwrap_or_else(|_| Event::default().data("{}"));
        Ok::<Event, Infallible>(event)
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

// endregion: --- Stream Handler

// region:    --- Query Handlers

/// 방 상태 조회
pub async fn handle_get_room_state(
    State((db_manager, _, _)): State<AppState>,
    Path(room_id): Path<i64>,
) -> impl IntoResponse {
    info!("{:<12} --> 방 상태 조회 id: {}", "HandlerQuery", room_id);
    match query::handlers::get_room_state(&db_manager, room_id).await {
        Ok(state) => Json(state).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

/// 최고 입찰가 조회
pub async fn handle_get_highest_bid(
    State((db_manager, _, _)): State<AppState>,
    Path(room_id): Path<i64>,
) -> impl IntoResponse {
    info!(
        "{:<12} --> 최고 입찰가 조회 id: {}",
        "HandlerQuery", room_id
    );
    match query::handlers::get_highest_bid(&db_manager, room_id).await {
        Ok(price) => Json(price).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

/// 입찰 이력 조회
pub async fn handle_get_bid_history(
    State((db_manager, _, _)): State<AppState>,
    Path(room_id): Path<i64>,
) -> impl IntoResponse {
    info!("{:<12} --> 입찰 이력 조회 id: {}", "HandlerQuery", room_id);
    match query::handlers::get_bid_history(&db_manager, room_id).await {
        Ok(history) => Json(history).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

// endregion: --- Query Handlers
