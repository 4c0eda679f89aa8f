/// 카탈로그 저장소 어댑터
/// 상품, 모델, 브랜드, 카테고리와 위시 구독은 카탈로그 쪽이 소유한다.
/// 이 코어는 읽기만 하므로 읽기 전용 접근자로 경계를 둔다.
// region:    --- Imports
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use std::sync::Arc;
use tracing::info;
// endregion: --- Imports

// region:    --- Models

/// 관계가 채워진 상품 조회 모델
#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct ProductDetail {
    pub id: i64,
    pub slug: String,
    pub price: i64,
    pub seller_id: i64,
    pub seller_name: String,
    pub buyer_id: Option<i64>,
    pub model_id: i64,
    pub model_name: String,
    pub brand_id: i64,
    pub brand_name: String,
    pub category_id: i64,
    pub category_name: String,
}

/// 위시 구독 모델
/// 카테고리/모델/브랜드 중 정확히 하나만 설정된다
#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Wish {
    pub id: i64,
    pub user_id: i64,
    pub category_id: Option<i64>,
    pub model_id: Option<i64>,
    pub brand_id: Option<i64>,
    pub lower_bound: i64,
    pub upper_bound: i64,
    pub status: String,
}

/// 위시 매칭 차원
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WishDimension {
    Category,
    Model,
    Brand,
}

// endregion: --- Models

// region:    --- Queries

const GET_PRODUCT_DETAIL: &str = r#"
    SELECT p.id, p.slug, p.price, p.seller_id, u.name AS seller_name, p.buyer_id,
           p.model_id, m.name AS model_name,
           m.brand_id, b.name AS brand_name,
           m.category_id, c.name AS category_name
    FROM products p
    JOIN users u ON u.id = p.seller_id
    JOIN models m ON m.id = p.model_id
    JOIN brands b ON b.id = m.brand_id
    JOIN categories c ON c.id = m.category_id
    WHERE p.id = $1
"#;

const FIND_WISHES_BY_CATEGORY: &str = r#"
    SELECT id, user_id, category_id, model_id, brand_id, lower_bound, upper_bound, status
    FROM wishes
    WHERE category_id = $1 AND status = 'PENDING'
      AND lower_bound <= $2 AND upper_bound >= $2
"#;

const FIND_WISHES_BY_MODEL: &str = r#"
    SELECT id, user_id, category_id, model_id, brand_id, lower_bound, upper_bound, status
    FROM wishes
    WHERE model_id = $1 AND status = 'PENDING'
      AND lower_bound <= $2 AND upper_bound >= $2
"#;

const FIND_WISHES_BY_BRAND: &str = r#"
    SELECT id, user_id, category_id, model_id, brand_id, lower_bound, upper_bound, status
    FROM wishes
    WHERE brand_id = $1 AND status = 'PENDING'
      AND lower_bound <= $2 AND upper_bound >= $2
"#;

impl WishDimension {
    fn query(self) -> &'static str {
        match self {
            WishDimension::Category => FIND_WISHES_BY_CATEGORY,
            WishDimension::Model => FIND_WISHES_BY_MODEL,
            WishDimension::Brand => FIND_WISHES_BY_BRAND,
        }
    }
}

// endregion: --- Queries

// region:    --- Catalog Store

/// 카탈로그 저장소 트레이트
#[async_trait]
pub trait CatalogStore {
    /// 상품과 모델/브랜드/카테고리/판매자 관계를 함께 조회
    async fn get_product(&self, product_id: i64) -> Result<ProductDetail, sqlx::Error>;

    /// 차원 값과 가격을 만족하는 대기 상태 위시 조회
    async fn find_wishes_by_dimension(
        &self,
        dimension: WishDimension,
        value: i64,
        price: i64,
    ) -> Result<Vec<Wish>, sqlx::Error>;
}

/// 카탈로그 저장소 구현체
pub struct PostgresCatalogStore {
    pool: Arc<PgPool>,
}

impl PostgresCatalogStore {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogStore for PostgresCatalogStore {
    async fn get_product(&self, product_id: i64) -> Result<ProductDetail, sqlx::Error> {
        info!("{:<12} --> 상품 조회 id: {}", "Catalog", product_id);
        sqlx::query_as::<_, ProductDetail>(GET_PRODUCT_DETAIL)
            .bind(product_id)
            .fetch_one(&*self.pool)
            .await
    }

    async fn find_wishes_by_dimension(
        &self,
        dimension: WishDimension,
        value: i64,
        price: i64,
    ) -> Result<Vec<Wish>, sqlx::Error> {
        sqlx::query_as::<_, Wish>(dimension.query())
            .bind(value)
            .bind(price)
            .fetch_all(&*self.pool)
            .await
    }
}

// endregion: --- Catalog Store
