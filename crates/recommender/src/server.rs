//! HTTP transport
//!
//! Routes are registered through `configure_routes` so that the binary and the
//! endpoint tests build the exact same application.

use crate::error::RecommenderError;
use crate::interaction::Product;
use crate::service::RecommendationService;
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Shared handler state
pub struct AppState {
    pub service: Arc<RecommendationService>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub skip: Option<i64>,
    pub take: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ViewedRequest {
    pub ids: Vec<String>,
    #[serde(default)]
    pub skip: Option<i64>,
    #[serde(default)]
    pub take: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserRecommendationsResponse {
    pub user_id: String,
    pub product_ids: Vec<String>,
    pub products: Vec<Product>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ViewedRecommendationsResponse {
    pub product_ids: Vec<String>,
    pub products: Vec<Product>,
}

/// Convert wire paging values, rejecting negatives and clamping `take` to `max_take`
fn page_window(
    skip: Option<i64>,
    take: Option<i64>,
    default_take: usize,
    max_take: usize,
) -> Result<(usize, usize), RecommenderError> {
    let skip = usize::try_from(skip.unwrap_or(0))
        .map_err(|_| RecommenderError::InvalidRequest("skip must not be negative".to_string()))?;
    let take = match take {
        Some(take) => usize::try_from(take).map_err(|_| {
            RecommenderError::InvalidRequest("take must not be negative".to_string())
        })?,
        None => default_take,
    };
    Ok((skip, take.min(max_take)))
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/ready", web::get().to(readiness_check))
        .service(
            web::scope("/api/v1")
                .route(
                    "/users/{user_id}/recommendations",
                    web::get().to(get_user_recommendations),
                )
                .route(
                    "/recommendations/viewed",
                    web::post().to(post_viewed_recommendations),
                )
                .route("/model/train", web::post().to(train_model))
                .route("/model/status", web::get().to(model_status)),
        );
}

async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "recommender-service",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn readiness_check(state: web::Data<AppState>) -> HttpResponse {
    if state.service.is_ready() {
        HttpResponse::Ok().json(serde_json::json!({
            "status": "ready",
            "model": "trained"
        }))
    } else {
        HttpResponse::ServiceUnavailable().json(serde_json::json!({
            "status": "not_ready",
            "model": "untrained"
        }))
    }
}

async fn get_user_recommendations(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, RecommenderError> {
    let user_id = path.into_inner();
    let (skip, take) = page_window(
        query.skip,
        query.take,
        state.service.default_top_n(),
        state.service.max_top_n(),
    )?;

    let product_ids = state
        .service
        .recommend_page(&user_id, skip, take)
        .await?;
    let products = state.service.product_details(&product_ids).await?;

    Ok(HttpResponse::Ok().json(UserRecommendationsResponse {
        user_id,
        product_ids,
        products,
    }))
}

async fn post_viewed_recommendations(
    state: web::Data<AppState>,
    request: web::Json<ViewedRequest>,
) -> Result<HttpResponse, RecommenderError> {
    let request = request.into_inner();
    let (skip, take) = page_window(
        request.skip,
        request.take,
        state.service.default_top_n(),
        state.service.max_top_n(),
    )?;

    let product_ids = state
        .service
        .recommend_for_viewed(&request.ids, skip, take)
        .await?;
    let products = state.service.product_details(&product_ids).await?;

    Ok(HttpResponse::Ok().json(ViewedRecommendationsResponse {
        product_ids,
        products,
    }))
}

async fn train_model(state: web::Data<AppState>) -> Result<HttpResponse, RecommenderError> {
    let report = state.service.train().await?;
    Ok(HttpResponse::Ok().json(report))
}

async fn model_status(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(state.service.status())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_window_defaults() {
        assert_eq!(page_window(None, None, 5, 100).unwrap(), (0, 5));
        assert_eq!(page_window(Some(10), Some(3), 5, 100).unwrap(), (10, 3));
    }

    #[test]
    fn test_page_window_clamps_large_take() {
        assert_eq!(page_window(None, Some(5000), 5, 100).unwrap(), (0, 100));
        assert_eq!(page_window(Some(2), Some(0), 5, 100).unwrap(), (2, 0));
    }

    #[test]
    fn test_page_window_rejects_negatives() {
        assert!(matches!(
            page_window(Some(-1), None, 5, 100),
            Err(RecommenderError::InvalidRequest(_))
        ));
        assert!(matches!(
            page_window(None, Some(-5), 5, 100),
            Err(RecommenderError::InvalidRequest(_))
        ));
    }
}
