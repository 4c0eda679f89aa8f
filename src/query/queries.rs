/// 방 상태 조회 (방 + 상품 + 현재 최고 입찰)
pub const GET_ROOM_STATE: &str = r#"
    SELECT r.id, r.product_id, r.closing_time, r.highest_bid_id, r.created_at,
           p.price AS listed_price, p.slug, p.buyer_id,
           b.price AS highest_price, b.user_id AS highest_bidder_id
    FROM rooms r
    JOIN products p ON p.id = r.product_id
    LEFT JOIN bids b ON b.id = r.highest_bid_id
    WHERE r.id = $1
"#;

/// 최고 입찰가 조회 (포인터 기준)
pub const GET_HIGHEST_BID_PRICE: &str = r#"
    SELECT b.price AS highest_price
    FROM rooms r
    JOIN bids b ON b.id = r.highest_bid_id
    WHERE r.id = $1
"#;

/// 입찰 이력 조회
pub const GET_BID_HISTORY: &str = r#"
    SELECT id, room_id, user_id, price, is_highest, created_at
    FROM bids
    WHERE room_id = $1
    ORDER BY created_at DESC
"#;
