use std::sync::Arc;

use axum::extract::State;
use axum::http::{header::{ACCEPT, CONTENT_TYPE}, HeaderName, HeaderValue, Method, StatusCode};
use axum::response::IntoResponse;
use axum::{middleware, routing::{get, post}, Router};
use common_http_errors::{http_error_metrics_layer, ERROR_REGISTRY};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::warn;

use crate::discount_handlers::{auto_apply_discount, first_order_discount, price_variants, validate_discount};
use crate::pricing::PricingService;
use crate::tax_handlers::calculate_tax;

#[derive(Clone)]
pub struct AppState {
    pub pricing: Arc<PricingService>,
}

pub async fn health() -> &'static str { "ok" }

async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    match state.pricing.metrics().render(&[&*ERROR_REGISTRY]) {
        Ok(text) => (StatusCode::OK, text),
        Err(err) => {
            warn!(error = %err, "Failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, String::new())
        }
    }
}

pub fn build_router(state: AppState, allowed_origins: &[String]) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(
            allowed_origins.iter().filter_map(|o| o.parse::<HeaderValue>().ok()).collect::<Vec<_>>(),
        ))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            ACCEPT,
            CONTENT_TYPE,
            HeaderName::from_static("authorization"),
            HeaderName::from_static("x-user-id"),
            HeaderName::from_static("x-trace-id"),
        ]);

    Router::new()
        .route("/healthz", get(health))
        .route("/metrics", get(metrics))
        .route("/discounts/validate", post(validate_discount))
        .route("/discounts/auto-apply", post(auto_apply_discount))
        .route("/discounts/first-order", get(first_order_discount))
        .route("/discounts/variants", post(price_variants))
        .route("/tax/calculate", post(calculate_tax))
        .with_state(state)
        .layer(middleware::from_fn(http_error_metrics_layer("pricing-service")))
        .layer(cors)
}
