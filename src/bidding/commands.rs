/// 입찰 원장
/// 방 행을 잠근 단일 트랜잭션 안에서 전제 조건 검사와 최고가 교체를 수행한다.
/// 같은 방을 향한 동시 입찰은 행 잠금으로 직렬화되고,
/// 두 번째로 잠금을 잡은 쪽은 방금 갱신된 최고가를 기준으로 재평가된다.
// region:    --- Imports
use crate::bidding::model::{Bid, BidBroadcast, BidRejection};
use crate::broadcast::RoomBroadcaster;
use crate::database::DatabaseManager;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Row;
use tracing::info;
// endregion: --- Imports

// region:    --- Queries

/// 방 행과 상품 행을 함께 잠근다. 최고가 포인터와 판매 여부가
/// 같은 트랜잭션 경계 안에서 읽히고 쓰이도록 하는 잠금이다.
const LOCK_ROOM_FOR_BID: &str = r#"
    SELECT r.closing_time, r.highest_bid_id,
           p.price AS listed_price, p.seller_id, p.buyer_id
    FROM rooms r
    JOIN products p ON p.id = r.product_id
    WHERE r.id = $1
    FOR UPDATE OF r, p
"#;

const GET_HIGHEST_BID_PRICE: &str = "SELECT price FROM bids WHERE id = $1";

const INSERT_BID: &str = r#"
    INSERT INTO bids (room_id, user_id, price, is_highest, created_at)
    VALUES ($1, $2, $3, TRUE, $4)
    RETURNING id, room_id, user_id, price, is_highest, created_at
"#;

const UNLINK_PREVIOUS_HIGHEST: &str = "UPDATE bids SET is_highest = FALSE WHERE id = $1";

const UPDATE_ROOM_HIGHEST: &str = "UPDATE rooms SET highest_bid_id = $1 WHERE id = $2";

// endregion: --- Queries

// region:    --- Commands

/// 입찰 명령
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PlaceBidCommand {
    pub room_id: i64,
    pub user_id: i64,
    pub price: i64,
}

/// 입찰 처리
/// 성공 시 수락된 입찰을 반환하고, 커밋이 끝난 뒤에야 방 관찰자에게 전파한다.
/// 실패 시 트랜잭션은 롤백되며 부분 상태는 남지 않는다.
pub async fn handle_place_bid(
    cmd: PlaceBidCommand,
    db_manager: &DatabaseManager,
    broadcaster: &RoomBroadcaster,
) -> Result<Bid, BidRejection> {
    info!("{:<12} --> 입찰 요청 처리 시작: {:?}", "Command", cmd);

    // 금액 검증은 잠금을 잡기 전에 끝낸다
    if cmd.price <= 0 {
        return Err(BidRejection::InvalidPrice);
    }

    let PlaceBidCommand {
        room_id,
        user_id,
        price,
    } = cmd;

    let accepted = db_manager
        .transaction(move |tx| {
            Box::pin(async move {
                // 방 + 상품 행 잠금, 이후 검증과 쓰기는 전부 이 잠금 아래에서 진행
                let row = sqlx::query(LOCK_ROOM_FOR_BID)
                    .bind(room_id)
                    .fetch_optional(&mut **tx)
                    .await?;

                let row = match row {
                    Some(row) => row,
                    None => return Err(BidRejection::RoomNotFound),
                };

                let closing_time: DateTime<Utc> = row.get("closing_time");
                let highest_bid_id: Option<i64> = row.get("highest_bid_id");
                let listed_price: i64 = row.get("listed_price");
                let seller_id: i64 = row.get("seller_id");
                let buyer_id: Option<i64> = row.get("buyer_id");

                // 이미 구매자가 확정된 상품은 입찰 불가
                if buyer_id.is_some() {
                    return Err(BidRejection::AlreadySold);
                }

                // 판매자 본인 입찰 차단
                if seller_id == user_id {
                    return Err(BidRejection::OwnProduct);
                }

                // 마감은 제출 시점에 지연 판정한다
                let now = Utc::now();
                if now >= closing_time {
                    return Err(BidRejection::AlreadyClosed);
                }

                // 기준 가격: 현재 최고 입찰가, 없으면 상품 시작가
                let current_price = match highest_bid_id {
                    Some(bid_id) => {
                        sqlx::query_scalar::<_, i64>(GET_HIGHEST_BID_PRICE)
                            .bind(bid_id)
                            .fetch_one(&mut **tx)
                            .await?
                    }
                    None => listed_price,
                };

                if price <= current_price {
                    return Err(BidRejection::LowBid { current_price });
                }

                // 직전 최고 입찰 해제 → 새 입찰 삽입 → 방 포인터 갱신
                // 해제를 먼저 해야 방당 최고 입찰 1건 유니크 제약을 지킨다
                if let Some(previous_id) = highest_bid_id {
                    sqlx::query(UNLINK_PREVIOUS_HIGHEST)
                        .bind(previous_id)
                        .execute(&mut **tx)
                        .await?;
                }

                let bid = sqlx::query_as::<_, Bid>(INSERT_BID)
                    .bind(room_id)
                    .bind(user_id)
                    .bind(price)
                    .bind(now)
                    .fetch_one(&mut **tx)
                    .await?;

                sqlx::query(UPDATE_ROOM_HIGHEST)
                    .bind(bid.id)
                    .bind(room_id)
                    .execute(&mut **tx)
                    .await?;

                Ok(bid)
            })
        })
        .await?;

    info!(
        "{:<12} --> 입찰 수락: room_id={}, bid_id={}, price={}",
        "Command", accepted.room_id, accepted.id, accepted.price
    );

    // 커밋 이후에만 전파한다. 전파 실패는 수락된 입찰에 영향을 주지 않는다.
    let delivered = broadcaster.publish(accepted.room_id, &BidBroadcast::from(&accepted));
    info!(
        "{:<12} --> 입찰 전파: room_id={}, 관찰자 {}명에게 전달",
        "Command", accepted.room_id, delivered
    );

    Ok(accepted)
}

// endregion: --- Commands
