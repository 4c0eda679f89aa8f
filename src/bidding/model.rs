use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// 경매 방 모델
// 상품 하나당 방 하나, 최고 입찰 포인터는 항상 0개 또는 1개
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Room {
    pub id: i64,
    pub product_id: i64,
    pub closing_time: DateTime<Utc>,
    pub highest_bid_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

// 입찰 모델
// 생성 이후 불변, 최고가 자리를 내줄 때 is_highest 해제만 일어난다
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Bid {
    pub id: i64,
    pub room_id: i64,
    pub user_id: i64,
    pub price: i64,
    pub is_highest: bool,
    pub created_at: DateTime<Utc>,
}

// 방 상태 조회 모델 (방 + 상품 + 현재 최고 입찰)
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct RoomState {
    pub id: i64,
    pub product_id: i64,
    pub closing_time: DateTime<Utc>,
    pub highest_bid_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub listed_price: i64,
    pub slug: String,
    pub buyer_id: Option<i64>,
    pub highest_price: Option<i64>,
    pub highest_bidder_id: Option<i64>,
}

/// 방 스트림으로 내보내는 입찰 수락 페이로드
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BidBroadcast {
    pub id: i64,
    pub price: i64,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
}

impl From<&Bid> for BidBroadcast {
    fn from(bid: &Bid) -> Self {
        Self {
            id: bid.id,
            price: bid.price,
            user_id: bid.user_id,
            created_at: bid.created_at,
        }
    }
}

// region:    --- Bid Rejection

/// 입찰 거절 사유
/// 원장 트랜잭션이 실패한 지점에 따라 호출자에게 그대로 반환된다.
#[derive(Debug)]
pub enum BidRejection {
    /// 방이 존재하지 않음 (잠금 전 검증)
    RoomNotFound,
    /// 금액이 양수가 아님 (잠금 전 검증)
    InvalidPrice,
    /// 현재 최고가(또는 시작가) 이하 입찰
    LowBid { current_price: i64 },
    /// 이미 구매자가 확정된 상품
    AlreadySold,
    /// 마감 시각이 지난 방
    AlreadyClosed,
    /// 판매자 본인의 입찰
    OwnProduct,
    /// 저장소 오류, 입찰은 반영되지 않았으며 재시도 가능
    Store(sqlx::Error),
}

impl BidRejection {
    pub fn code(&self) -> &'static str {
        match self {
            BidRejection::RoomNotFound => "ROOM_NOT_FOUND",
            BidRejection::InvalidPrice => "INVALID_PRICE",
            BidRejection::LowBid { .. } => "LOW_BID",
            BidRejection::AlreadySold => "ALREADY_SOLD",
            BidRejection::AlreadyClosed => "ALREADY_CLOSED",
            BidRejection::OwnProduct => "OWN_PRODUCT",
            BidRejection::Store(_) => "STORE_ERROR",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            BidRejection::RoomNotFound => "경매 방을 찾을 수 없습니다.",
            BidRejection::InvalidPrice => "입찰 금액은 0보다 커야 합니다.",
            BidRejection::LowBid { .. } => "입찰 금액이 현재 가격보다 낮거나 같습니다.",
            BidRejection::AlreadySold => "이미 판매 완료된 상품입니다.",
            BidRejection::AlreadyClosed => "경매가 이미 종료되었습니다.",
            BidRejection::OwnProduct => "본인이 등록한 상품에는 입찰할 수 없습니다.",
            BidRejection::Store(_) => "일시적인 오류로 입찰을 처리하지 못했습니다. 다시 시도해주세요.",
        }
    }

    /// 저장소 장애 여부 (500으로 응답할 대상)
    pub fn is_store_error(&self) -> bool {
        matches!(self, BidRejection::Store(_))
    }

    /// 핸들러 응답 바디
    pub fn response_body(&self) -> serde_json::Value {
        match self {
            BidRejection::LowBid { current_price } => serde_json::json!({
                "error": self.message(),
                "code": self.code(),
                "current_price": current_price,
            }),
            _ => serde_json::json!({
                "error": self.message(),
                "code": self.code(),
            }),
        }
    }
}

impl From<sqlx::Error> for BidRejection {
    fn from(e: sqlx::Error) -> Self {
        BidRejection::Store(e)
    }
}

// endregion: --- Bid Rejection

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_codes() {
        assert_eq!(BidRejection::RoomNotFound.code(), "ROOM_NOT_FOUND");
        assert_eq!(BidRejection::InvalidPrice.code(), "INVALID_PRICE");
        assert_eq!(BidRejection::LowBid { current_price: 100 }.code(), "LOW_BID");
        assert_eq!(BidRejection::AlreadySold.code(), "ALREADY_SOLD");
        assert_eq!(BidRejection::AlreadyClosed.code(), "ALREADY_CLOSED");
        assert_eq!(BidRejection::OwnProduct.code(), "OWN_PRODUCT");
        assert_eq!(
            BidRejection::Store(sqlx::Error::PoolTimedOut).code(),
            "STORE_ERROR"
        );
    }

    #[test]
    fn test_low_bid_body_carries_current_price() {
        let body = BidRejection::LowBid { current_price: 150 }.response_body();
        assert_eq!(body["code"], "LOW_BID");
        assert_eq!(body["current_price"], 150);
    }

    #[test]
    fn test_only_store_errors_are_retryable() {
        assert!(BidRejection::Store(sqlx::Error::PoolTimedOut).is_store_error());
        assert!(!BidRejection::LowBid { current_price: 1 }.is_store_error());
        assert!(!BidRejection::AlreadyClosed.is_store_error());
    }

    #[test]
    fn test_broadcast_payload_is_camel_case() {
        let payload = BidBroadcast {
            id: 1,
            price: 200,
            user_id: 7,
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["price"], 200);
        assert_eq!(json["userId"], 7);
        assert!(json.get("createdAt").is_some());
    }
}
