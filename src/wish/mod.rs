/// 위시 매처
/// 새로 등록된 상품에 대해 카테고리/모델/브랜드 세 차원의
/// 대기 중 위시 구독을 독립적으로 조회해 합집합을 만든다.
/// 읽기 전용이며 세 조회는 동시에 실행된다.
// region:    --- Imports
use crate::catalog::{CatalogStore, ProductDetail, Wish, WishDimension};
use std::collections::HashSet;
use tracing::info;
// endregion: --- Imports

// region:    --- Wish Matcher

/// 매칭 결과
/// user_ids는 중복 제거되어 있다. 여러 차원에 걸린 사용자도 알림은 한 번만 받는다.
#[derive(Debug, Clone)]
pub struct WishMatches {
    pub wish_ids: Vec<i64>,
    pub user_ids: Vec<i64>,
}

impl WishMatches {
    pub fn is_empty(&self) -> bool {
        self.wish_ids.is_empty()
    }
}

/// 상품 가격과 차원을 만족하는 위시 구독 집합 계산
pub async fn find_matches(
    catalog: &(impl CatalogStore + Sync),
    product: &ProductDetail,
) -> Result<WishMatches, sqlx::Error> {
    // 세 차원 조회는 서로 순서가 없으므로 동시에 실행하고 합류 지점에서 모은다
    let (by_category, by_model, by_brand) = tokio::try_join!(
        catalog.find_wishes_by_dimension(WishDimension::Category, product.category_id, product.price),
        catalog.find_wishes_by_dimension(WishDimension::Model, product.model_id, product.price),
        catalog.find_wishes_by_dimension(WishDimension::Brand, product.brand_id, product.price),
    )?;

    let matches = collect_matches(by_category, by_model, by_brand);
    info!(
        "{:<12} --> 위시 매칭: product_id={}, 위시 {}건, 사용자 {}명",
        "Matcher",
        product.id,
        matches.wish_ids.len(),
        matches.user_ids.len()
    );
    Ok(matches)
}

/// 세 차원 결과의 합집합과 사용자 중복 제거
pub fn collect_matches(by_category: Vec<Wish>, by_model: Vec<Wish>, by_brand: Vec<Wish>) -> WishMatches {
    let mut wish_ids = Vec::new();
    let mut user_ids = Vec::new();
    let mut seen_wishes = HashSet::new();
    let mut seen_users = HashSet::new();

    for wish in by_category.into_iter().chain(by_model).chain(by_brand) {
        if seen_wishes.insert(wish.id) {
            wish_ids.push(wish.id);
        }
        if seen_users.insert(wish.user_id) {
            user_ids.push(wish.user_id);
        }
    }

    WishMatches { wish_ids, user_ids }
}

// endregion: --- Wish Matcher
