use actix_web::{web, HttpResponse};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::order::OrderRequest;
use crate::health::SystemHealth;
use crate::placement::{PlacementOutcome, ACCEPTED_MESSAGE, FALLBACK_MESSAGE};
use super::error::{ApiError, ErrorBody};
use super::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedResponse {
    pub order_id: Uuid,
    pub message: &'static str,
}

/// POST /orders
pub async fn place_order(
    state: web::Data<AppState>,
    request: web::Json<OrderRequest>,
) -> Result<HttpResponse, ApiError> {
    let outcome = state.coordinator.dispatch(request.into_inner()).await?;

    let response = match outcome {
        PlacementOutcome::Accepted { order_id } => HttpResponse::Created().json(PlacedResponse {
            order_id,
            message: ACCEPTED_MESSAGE,
        }),
        PlacementOutcome::OutOfStock { item_code } => {
            HttpResponse::Conflict().json(ErrorBody::out_of_stock(&item_code))
        }
        PlacementOutcome::Degraded { .. } => HttpResponse::Ok()
            .content_type("text/plain; charset=utf-8")
            .body(FALLBACK_MESSAGE),
    };

    Ok(response)
}

/// GET /orders/{id}
pub async fn get_order(
    state: web::Data<AppState>,
    id: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let id = id.into_inner();

    match state.coordinator.store().get(id).await? {
        Some(order) => Ok(HttpResponse::Ok().json(order)),
        None => Err(ApiError::NotFound(id)),
    }
}

/// GET /health. A degraded service still answers 200: placements fall back
/// rather than fail.
pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    let report = SystemHealth::from_registry(state.coordinator.gate().registry());
    if !report.is_healthy() {
        tracing::debug!(reason = ?report.reason, "Health check reports degraded service");
    }
    HttpResponse::Ok().json(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::configure;
    use crate::metrics::Metrics;
    use crate::placement::{OrderPlacementCoordinator, PlacementSettings, INVENTORY_DEPENDENCY};
    use crate::testing::{FakeStockClient, RecordingPublisher, RecordingStore, StockBehaviour};
    use crate::utils::{BreakerRegistry, CircuitBreakerConfig, ResilienceGate};
    use actix_web::http::{header, StatusCode};
    use actix_web::{test, App};
    use serde_json::{json, Value};
    use std::sync::Arc;

    fn state(client: FakeStockClient, store: RecordingStore) -> web::Data<AppState> {
        let metrics = Arc::new(Metrics::new().unwrap());
        let registry = Arc::new(BreakerRegistry::new(CircuitBreakerConfig::default()));
        let gate = Arc::new(ResilienceGate::new(registry).with_metrics(metrics.clone()));

        let coordinator = OrderPlacementCoordinator::new(
            gate,
            Arc::new(client),
            Arc::new(store),
            Arc::new(RecordingPublisher::new()),
            PlacementSettings::default(),
        )
        .with_metrics(metrics);

        web::Data::new(AppState::new(Arc::new(coordinator)))
    }

    fn order_body() -> Value {
        json!({
            "lineItems": [
                { "itemCode": "SKU1", "quantity": 2, "unitPrice": "10.00" },
                { "itemCode": "SKU2", "quantity": 1, "unitPrice": 5 }
            ]
        })
    }

    macro_rules! app {
        ($state:expr) => {
            test::init_service(App::new().app_data($state.clone()).configure(configure)).await
        };
    }

    #[actix_web::test]
    async fn test_accepted_order_returns_created_and_is_readable() {
        let state = state(FakeStockClient::all_in_stock(), RecordingStore::new());
        let app = app!(state);

        let req = test::TestRequest::post().uri("/orders").set_json(order_body()).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Order was placed!");
        let order_id = body["orderId"].as_str().unwrap().to_string();

        let req = test::TestRequest::get().uri(&format!("/orders/{order_id}")).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let order: Value = test::read_body_json(resp).await;
        assert_eq!(order["id"], order_id);
        assert_eq!(order["lineItems"].as_array().unwrap().len(), 2);
    }

    #[actix_web::test]
    async fn test_legacy_route_is_served() {
        let state = state(FakeStockClient::all_in_stock(), RecordingStore::new());
        let app = app!(state);

        let req = test::TestRequest::post().uri("/api/order").set_json(order_body()).to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    #[actix_web::test]
    async fn test_out_of_stock_is_conflict() {
        let client = FakeStockClient::answering(&[("SKU1", true), ("SKU2", false)]);
        let state = state(client, RecordingStore::new());
        let app = app!(state);

        let req = test::TestRequest::post().uri("/orders").set_json(order_body()).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "out_of_stock");
        assert_eq!(body["itemCode"], "SKU2");
    }

    #[actix_web::test]
    async fn test_degraded_returns_fallback_text() {
        let state = state(FakeStockClient::new(StockBehaviour::Unreachable), RecordingStore::new());
        let app = app!(state);

        let req = test::TestRequest::post().uri("/orders").set_json(order_body()).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body = test::read_body(resp).await;
        assert_eq!(body, "Please order later!");
    }

    #[actix_web::test]
    async fn test_invalid_request_is_bad_request() {
        let state = state(FakeStockClient::all_in_stock(), RecordingStore::new());
        let app = app!(state);

        let req = test::TestRequest::post()
            .uri("/orders")
            .set_json(json!({ "lineItems": [] }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "invalid_request");
    }

    #[actix_web::test]
    async fn test_total_beyond_decimal_range_is_bad_request() {
        let state = state(FakeStockClient::all_in_stock(), RecordingStore::new());
        let app = app!(state);

        let body = json!({
            "lineItems": [
                { "itemCode": "SKU1", "quantity": 2, "unitPrice": "79228162514264337593543950335" }
            ]
        });
        let req = test::TestRequest::post().uri("/orders").set_json(body).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "invalid_request");
    }

    #[actix_web::test]
    async fn test_malformed_body_is_bad_request() {
        let state = state(FakeStockClient::all_in_stock(), RecordingStore::new());
        let app = app!(state);

        let req = test::TestRequest::post()
            .uri("/orders")
            .insert_header((header::CONTENT_TYPE, "application/json"))
            .set_payload("{\"lineItems\": [{\"itemCode\": 7}")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "invalid_request");
    }

    #[actix_web::test]
    async fn test_storage_failure_is_service_unavailable() {
        let state = state(FakeStockClient::all_in_stock(), RecordingStore::failing());
        let app = app!(state);

        let req = test::TestRequest::post().uri("/orders").set_json(order_body()).to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(resp.headers().contains_key(header::RETRY_AFTER));
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "storage_unavailable");
    }

    #[actix_web::test]
    async fn test_interrupted_placement_is_internal_error() {
        let state = state(FakeStockClient::new(StockBehaviour::Panic), RecordingStore::new());
        let app = app!(state);

        let req = test::TestRequest::post().uri("/orders").set_json(order_body()).to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "internal");
    }

    #[actix_web::test]
    async fn test_unknown_order_is_not_found() {
        let state = state(FakeStockClient::all_in_stock(), RecordingStore::new());
        let app = app!(state);

        let req = test::TestRequest::get()
            .uri(&format!("/orders/{}", Uuid::new_v4()))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_health_reports_open_breaker_as_degraded() {
        let state = state(FakeStockClient::all_in_stock(), RecordingStore::new());
        state
            .coordinator
            .gate()
            .registry()
            .breaker(INVENTORY_DEPENDENCY)
            .force_open();
        let app = app!(state);

        let req = test::TestRequest::get().uri("/health").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], "degraded");
        assert_eq!(body["components"][0]["name"], "inventory");
        assert_eq!(body["components"][0]["breakerState"], "OPEN");
    }
}
