#![allow(dead_code)]

use std::str::FromStr;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use bigdecimal::BigDecimal;
use common_observability::PricingMetrics;
use http_body_util::BodyExt;
use pricing_service::model::{DiscountCode, DiscountType, TaxRate};
use pricing_service::repo::memory::MemoryStores;
use pricing_service::repo::Repositories;
use pricing_service::{build_router, AppState, PricingService, PricingSettings};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

pub fn dec(s: &str) -> BigDecimal {
    BigDecimal::from_str(s).unwrap()
}

/// Decimal fields are serialized as strings; accept numbers too.
pub fn dec_field(body: &Value, key: &str) -> BigDecimal {
    match &body[key] {
        Value::String(s) => dec(s),
        Value::Number(n) => dec(&n.to_string()),
        other => panic!("field {key} is not a decimal: {other:?}"),
    }
}

pub fn discount(code: &str) -> DiscountCode {
    DiscountCode {
        id: Uuid::new_v4(),
        code: code.to_string(),
        discount_type: DiscountType::Percentage,
        discount_value: dec("10"),
        maximum_discount: None,
        minimum_purchase: None,
        stackable: false,
        auto_apply: false,
        first_purchase_only: false,
        priority: 0,
        valid_from: None,
        valid_until: None,
        is_active: true,
    }
}

pub fn tax_rate(country: &str, state: Option<&str>, rate: &str) -> TaxRate {
    TaxRate {
        country_code: country.to_string(),
        state_code: state.map(str::to_string),
        state_name: None,
        rate: dec(rate),
        tax_type: None,
        gst: None,
        pst: None,
        qst: None,
        hst: None,
    }
}

pub fn app_with(repos: Repositories) -> Router {
    let service = PricingService::new(repos, PricingSettings::default(), Arc::new(PricingMetrics::new()));
    build_router(AppState { pricing: Arc::new(service) }, &["http://localhost:3000".to_string()])
}

pub fn app(stores: MemoryStores) -> Router {
    app_with(stores.into_repositories())
}

pub fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn send(app: Router, req: Request<Body>) -> (StatusCode, HeaderMap, Value) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let headers = resp.headers().clone();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap_or(Value::Null) };
    (status, headers, body)
}
