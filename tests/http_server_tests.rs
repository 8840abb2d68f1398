use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use std::sync::Arc;
use tour_sales_bot::catalog::Catalog;
use tour_sales_bot::handlers::TourAssistant;
use tour_sales_bot::http_server::{create_router, AppState};
use tour_sales_bot::leads::SqliteLeadStore;
use tower::ServiceExt;

const TOURS_JSON: &str = r#"[
    {"destination": "Dubai", "price": 500, "duration": "5 شب",
     "satisfaction": 5, "details": "هتل ۵ ستاره"}
]"#;

#[tokio::test]
async fn health_reports_catalog_and_fallback() {
    let store = SqliteLeadStore::connect("sqlite::memory:").await.unwrap();
    let assistant = Arc::new(TourAssistant::new(
        Arc::new(Catalog::from_json(TOURS_JSON).unwrap()),
        Arc::new(store),
        None,
    ));
    let app = create_router(AppState { assistant });

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["catalog_size"], 1);
    assert_eq!(json["completion_enabled"], false);
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let store = SqliteLeadStore::connect("sqlite::memory:").await.unwrap();
    let assistant = Arc::new(TourAssistant::new(Arc::new(Catalog::default()), Arc::new(store), None));
    let app = create_router(AppState { assistant });

    let response = app
        .oneshot(Request::builder().uri("/sync").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
