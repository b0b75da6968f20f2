use actix_web::{test, web, App};
use recommender_engine::server::{
    configure_routes, AppState, UserRecommendationsResponse, ViewedRecommendationsResponse,
};
use recommender_engine::{
    InMemoryInteractionStore, Interaction, InteractionKind, Product, RecommendationService,
    RecommenderConfig,
};
use serde_json::Value;
use std::sync::Arc;

fn product(id: &str, price: f64) -> Product {
    Product {
        id: id.to_string(),
        name: format!("Item {}", id),
        description: format!("Description of {}", id),
        price,
    }
}

fn store() -> Arc<InMemoryInteractionStore> {
    Arc::new(
        InMemoryInteractionStore::new()
            .with_products([
                product("p1", 10.0),
                product("p2", 20.0),
                product("p3", 30.0),
                product("p4", 40.0),
            ])
            .with_interactions([
                Interaction::new("u1", "p1", InteractionKind::Purchase),
                Interaction::new("u1", "p2", InteractionKind::View),
                Interaction::new("u2", "p1", InteractionKind::View),
                Interaction::new("u2", "p3", InteractionKind::Purchase),
            ]),
    )
}

fn state(store: Arc<InMemoryInteractionStore>) -> web::Data<AppState> {
    web::Data::new(AppState {
        service: Arc::new(RecommendationService::new(
            store,
            &RecommenderConfig::default(),
        )),
    })
}

#[actix_web::test]
async fn test_health_endpoint() {
    let app = test::init_service(
        App::new()
            .app_data(state(store()))
            .configure(configure_routes),
    )
    .await;

    let req = test::TestRequest::get().uri("/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "recommender-service");
}

#[actix_web::test]
async fn test_readiness_follows_training() {
    let state = state(store());
    let app = test::init_service(
        App::new()
            .app_data(state.clone())
            .configure(configure_routes),
    )
    .await;

    let req = test::TestRequest::get().uri("/ready").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 503);

    state.service.train().await.unwrap();

    let req = test::TestRequest::get().uri("/ready").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
}

#[actix_web::test]
async fn test_recommendations_before_training_return_503() {
    let app = test::init_service(
        App::new()
            .app_data(state(store()))
            .configure(configure_routes),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/api/v1/users/u1/recommendations")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 503);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "model_not_ready");
}

#[actix_web::test]
async fn test_train_then_recommend() {
    let app = test::init_service(
        App::new()
            .app_data(state(store()))
            .configure(configure_routes),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/v1/model/train")
        .to_request();
    let report: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(report["ratings"], 4);
    assert_eq!(report["solver"], "sgd");

    let req = test::TestRequest::get()
        .uri("/api/v1/users/u1/recommendations")
        .to_request();
    let body: UserRecommendationsResponse = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body.user_id, "u1");
    assert_eq!(body.product_ids.len(), 2);
    assert!(body
        .product_ids
        .iter()
        .all(|id| id == "p3" || id == "p4"));

    let detail_ids: Vec<_> = body.products.iter().map(|p| p.id.clone()).collect();
    assert_eq!(detail_ids, body.product_ids);
    assert!(body.products.iter().all(|p| p.name.starts_with("Item ")));
}

#[actix_web::test]
async fn test_paging_parameters() {
    let state = state(store());
    state.service.train().await.unwrap();
    let app = test::init_service(
        App::new()
            .app_data(state.clone())
            .configure(configure_routes),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/api/v1/users/newcomer/recommendations?skip=1&take=2")
        .to_request();
    let page: UserRecommendationsResponse = test::call_and_read_body_json(&app, req).await;

    let full = state.service.recommend("newcomer", 4).await.unwrap();
    assert_eq!(page.product_ids, full[1..3]);
}

#[actix_web::test]
async fn test_oversized_take_is_clamped() {
    let state = state(store());
    state.service.train().await.unwrap();
    let app = test::init_service(
        App::new()
            .app_data(state.clone())
            .configure(configure_routes),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/api/v1/users/newcomer/recommendations?take=1000")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let page: UserRecommendationsResponse = test::read_body_json(resp).await;
    assert_eq!(page.product_ids.len(), 4);
}

#[actix_web::test]
async fn test_invalid_paging_returns_400() {
    let state = state(store());
    state.service.train().await.unwrap();
    let app = test::init_service(
        App::new()
            .app_data(state.clone())
            .configure(configure_routes),
    )
    .await;

    for uri in [
        "/api/v1/users/u1/recommendations?take=0",
        "/api/v1/users/u1/recommendations?take=-3",
        "/api/v1/users/u1/recommendations?skip=-1",
    ] {
        let req = test::TestRequest::get().uri(uri).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400, "{}", uri);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "invalid_request");
    }
}

#[actix_web::test]
async fn test_store_outage_returns_502() {
    let store = store();
    let state = state(store.clone());
    state.service.train().await.unwrap();
    let app = test::init_service(
        App::new()
            .app_data(state.clone())
            .configure(configure_routes),
    )
    .await;

    store.set_available(false);

    let req = test::TestRequest::get()
        .uri("/api/v1/users/u1/recommendations")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 502);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "store_unavailable");

    let req = test::TestRequest::post()
        .uri("/api/v1/model/train")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 502);

    // Previous model still published
    let req = test::TestRequest::get()
        .uri("/api/v1/model/status")
        .to_request();
    let status: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(status["trained"], true);
    assert_eq!(status["last_training"]["ratings"], 4);
}

#[actix_web::test]
async fn test_viewed_recommendations() {
    let state = state(store());
    state.service.train().await.unwrap();
    let app = test::init_service(
        App::new()
            .app_data(state.clone())
            .configure(configure_routes),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/v1/recommendations/viewed")
        .set_json(serde_json::json!({ "ids": ["p1"], "take": 10 }))
        .to_request();
    let body: ViewedRecommendationsResponse = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body.product_ids.len(), 3);
    assert!(!body.product_ids.contains(&"p1".to_string()));
    assert_eq!(body.products.len(), 3);

    let req = test::TestRequest::post()
        .uri("/api/v1/recommendations/viewed")
        .set_json(serde_json::json!({ "ids": [] }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
}

#[actix_web::test]
async fn test_model_status_before_training() {
    let app = test::init_service(
        App::new()
            .app_data(state(store()))
            .configure(configure_routes),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/api/v1/model/status")
        .to_request();
    let status: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(status["trained"], false);
    assert!(status["last_training"].is_null());
}
