// region:    --- Imports
use super::queries;
use crate::bidding::model::{Bid, RoomState};
use crate::database::DatabaseManager;
use sqlx::Error as SqlxError;
use sqlx::Row;
use tracing::info;

// endregion: --- Imports

// region:    --- Query Handlers

/// 방 상태 조회
pub async fn get_room_state(
    db_manager: &DatabaseManager,
    room_id: i64,
) -> Result<RoomState, SqlxError> {
    info!("{:<12} --> 방 상태 조회 id: {}", "Query", room_id);
    db_manager
        .transaction(move |tx| {
            Box::pin(async move {
                sqlx::query_as::<_, RoomState>(queries::GET_ROOM_STATE)
                    .bind(room_id)
                    .fetch_one(&mut **tx)
                    .await
            })
        })
        .await
}

/// 최고 입찰가 조회
/// 아직 입찰이 없는 방은 None
pub async fn get_highest_bid(
    db_manager: &DatabaseManager,
    room_id: i64,
) -> Result<Option<i64>, SqlxError> {
    info!("{:<12} --> 최고 입찰가 조회 id: {}", "Query", room_id);
    db_manager
        .transaction(move |tx| {
            Box::pin(async move {
                let result = sqlx::query(queries::GET_HIGHEST_BID_PRICE)
                    .bind(room_id)
                    .fetch_optional(&mut **tx)
                    .await?;

                Ok(result.map(|row| row.get("highest_price")))
            })
        })
        .await
}

/// 입찰 이력 조회
pub async fn get_bid_history(
    db_manager: &DatabaseManager,
    room_id: i64,
) -> Result<Vec<Bid>, SqlxError> {
    info!("{:<12} --> 입찰 이력 조회 id: {}", "Query", room_id);
    db_manager
        .transaction(move |tx| {
            Box::pin(async move {
                sqlx::query_as::<_, Bid>(queries::GET_BID_HISTORY)
                    .bind(room_id)
                    .fetch_all(&mut **tx)
                    .await
            })
        })
        .await
}

// endregion: --- Query Handlers
