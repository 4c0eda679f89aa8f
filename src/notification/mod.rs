/// 알림 발행기
/// 매칭된 위시의 상태 전환과 알림 생성을 하나의 트랜잭션으로 묶는다.
/// 상품 등록 요청과는 분리된 최선 노력 경로라 실패해도 등록은 성공한다.
// region:    --- Imports
use crate::catalog::{CatalogStore, PostgresCatalogStore, ProductDetail};
use crate::database::DatabaseManager;
use crate::wish::{self, WishMatches};
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info};
// endregion: --- Imports

// region:    --- Queries

const MARK_WISHES_AVAILABLE: &str = "UPDATE wishes SET status = 'AVAILABLE' WHERE id = ANY($1)";

const INSERT_NOTIFICATION: &str = r#"
    INSERT INTO notifications (user_id, title, description, link, created_at)
    VALUES ($1, $2, $3, $4, $5)
"#;

// endregion: --- Queries

// region:    --- Notification Emitter

/// 상품 등록 트리거
/// 상품 행이 커밋된 직후 호출된다. 매칭과 발행은 분리된 태스크로 넘어가
/// 호출자는 기다리지 않고, 여기서 난 실패가 등록 요청으로 올라가지 않는다.
pub fn dispatch_product_created(
    db_manager: Arc<DatabaseManager>,
    catalog: Arc<PostgresCatalogStore>,
    product_id: i64,
) {
    tokio::spawn(async move {
        if let Err(e) = notify_matching_wishes(&db_manager, &*catalog, product_id).await {
            error!(
                "{:<12} --> 위시 알림 처리 실패: product_id={}, {:?}",
                "Notify", product_id, e
            );
        }
    });
}

/// 매칭 계산 후 상태 전환과 알림 생성까지 수행
pub async fn notify_matching_wishes(
    db_manager: &DatabaseManager,
    catalog: &(impl CatalogStore + Sync),
    product_id: i64,
) -> Result<(), sqlx::Error> {
    let product = catalog.get_product(product_id).await?;
    let matches = wish::find_matches(catalog, &product).await?;

    if matches.is_empty() {
        info!("{:<12} --> 매칭된 위시 없음: product_id={}", "Notify", product_id);
        return Ok(());
    }

    if let Err(e) = emit(db_manager, &product, &matches).await {
        // 재현에 필요한 입력(상품, 계산된 id 집합)을 전부 남기고 삼킨다
        error!(
            "{:<12} --> 알림 발행 실패: product_id={}, wish_ids={:?}, user_ids={:?}, {:?}",
            "Notify", product_id, matches.wish_ids, matches.user_ids, e
        );
        return Ok(());
    }

    info!(
        "{:<12} --> 알림 발행 완료: product_id={}, 위시 {}건, 알림 {}건",
        "Notify",
        product_id,
        matches.wish_ids.len(),
        matches.user_ids.len()
    );
    Ok(())
}

/// 상태 전환 + 알림 생성
/// 매칭된 위시 전체를 AVAILABLE로 바꾸고 사용자당 알림 한 건을 만든다.
/// 전부 반영되거나 전부 반영되지 않거나 둘 중 하나다.
pub async fn emit(
    db_manager: &DatabaseManager,
    product: &ProductDetail,
    matches: &WishMatches,
) -> Result<(), sqlx::Error> {
    let wish_ids = matches.wish_ids.clone();
    let user_ids = matches.user_ids.clone();
    let link = format!("/products/{}", product.slug);
    let title = format!("관심 상품 입고: {}", product.model_name);
    let description = format!(
        "{}님이 등록한 {} 상품이 관심 가격대에 올라왔습니다.",
        product.seller_name, product.model_name
    );

    db_manager
        .transaction::<_, _, sqlx::Error>(move |tx| {
            Box::pin(async move {
                sqlx::query(MARK_WISHES_AVAILABLE)
                    .bind(&wish_ids)
                    .execute(&mut **tx)
                    .await?;

                let now = Utc::now();
                for &user_id in &user_ids {
                    sqlx::query(INSERT_NOTIFICATION)
                        .bind(user_id)
                        .bind(&title)
                        .bind(&description)
                        .bind(&link)
                        .bind(now)
                        .execute(&mut **tx)
                        .await?;
                }
                Ok(())
            })
        })
        .await
}

// endregion: --- Notification Emitter
