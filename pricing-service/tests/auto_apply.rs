mod support;

use std::sync::Arc;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use common_observability::PricingMetrics;
use common_security::test_request_headers;
use pricing_service::model::DiscountCode;
use pricing_service::repo::memory::{faulty_repositories, Fault, InMemoryDiscounts, MemoryStores};
use pricing_service::retry::RetryPolicy;
use serde_json::{json, Value};
use support::{app, app_with, dec, dec_field, discount, post_json, send};
use uuid::Uuid;

fn auto(code: &str, priority: i32) -> DiscountCode {
    let mut d = discount(code);
    d.auto_apply = true;
    d.priority = priority;
    d
}

fn stores(rows: Vec<DiscountCode>) -> MemoryStores {
    MemoryStores { discounts: InMemoryDiscounts::new(rows), ..Default::default() }
}

#[tokio::test]
async fn highest_priority_eligible_discount_wins() {
    let mut ineligible = auto("BIG", 30);
    ineligible.minimum_purchase = Some(dec("500"));
    let router = app(stores(vec![auto("LOW", 10), auto("MID", 20), ineligible]));
    let (status, _, body) = send(router, post_json("/discounts/auto-apply", json!({"subtotal": "100"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["hasAutoApply"], true);
    assert_eq!(body["discount"]["code"], "MID");
    assert_eq!(body["discount"]["isAutoApply"], true);
    assert_eq!(body["discount"]["stackable"], false);
    assert_eq!(dec_field(&body["discount"], "amountOff"), dec("10"));
}

#[tokio::test]
async fn expired_and_future_discounts_are_skipped() {
    let mut expired = auto("EXPIRED", 50);
    expired.valid_until = Some(Utc::now() - Duration::hours(1));
    let mut future = auto("FUTURE", 40);
    future.valid_from = Some(Utc::now() + Duration::hours(1));
    let router = app(stores(vec![expired, future]));
    let (status, _, body) = send(router, post_json("/discounts/auto-apply", json!({"subtotal": "100"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["hasAutoApply"], false);
    assert_eq!(body["discount"], Value::Null);
}

#[tokio::test]
async fn first_purchase_auto_discount_needs_identity() {
    let mut welcome = auto("HELLO", 5);
    welcome.first_purchase_only = true;
    let router = app(stores(vec![welcome]));

    let (_, _, anon) = send(router.clone(), post_json("/discounts/auto-apply", json!({"subtotal": "20"}))).await;
    assert_eq!(anon["hasAutoApply"], false);

    let mut req = post_json("/discounts/auto-apply", json!({"subtotal": "20"}));
    test_request_headers!(req, user = &Uuid::new_v4().to_string());
    let (_, _, known) = send(router, req).await;
    assert_eq!(known["hasAutoApply"], true);
    assert_eq!(known["discount"]["code"], "HELLO");
}

#[tokio::test]
async fn store_failure_means_no_discount() {
    let router = app_with(faulty_repositories(Fault::Error));
    let (status, _, body) = send(router, post_json("/discounts/auto-apply", json!({"subtotal": "20"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["hasAutoApply"], false);
}

#[tokio::test]
async fn first_purchase_rows_beyond_the_limit_do_not_hide_universal_discount() {
    let mut rows: Vec<DiscountCode> = (10..15)
        .map(|p| {
            let mut d = auto(&format!("NEWBIE{p}"), p);
            d.first_purchase_only = true;
            d
        })
        .collect();
    rows.push(auto("EVERYONE", 1));
    let router = app(stores(rows));

    let (status, _, body) = send(router, post_json("/discounts/auto-apply", json!({"subtotal": "100"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["hasAutoApply"], true);
    assert_eq!(body["discount"]["code"], "EVERYONE");
}

#[tokio::test]
async fn hung_store_times_out_to_no_discount() {
    let policy = RetryPolicy {
        timeout: std::time::Duration::from_millis(50),
        retries: 1,
        base_delay: std::time::Duration::from_millis(1),
        max_delay: std::time::Duration::from_millis(5),
    };
    let repos = faulty_repositories(Fault::Hang).guarded(policy, Arc::new(PricingMetrics::new()));
    let router = app_with(repos);
    let started = std::time::Instant::now();

    let (status, _, body) =
        send(router.clone(), post_json("/discounts/auto-apply", json!({"subtotal": "20"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["hasAutoApply"], false);
    assert_eq!(body["discount"], Value::Null);

    let mut req = post_json("/discounts/auto-apply", json!({"subtotal": "20"}));
    test_request_headers!(req, user = &Uuid::new_v4().to_string());
    let (status, _, body) = send(router, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["hasAutoApply"], false);
    assert!(started.elapsed() < std::time::Duration::from_secs(2));
}

#[tokio::test]
async fn subtotal_is_required() {
    let router = app(stores(vec![]));
    let (status, _, body) = send(router.clone(), post_json("/discounts/auto-apply", json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_subtotal");
    assert_eq!(body["field"], "subtotal");

    let (status, _, _) = send(router, post_json("/discounts/auto-apply", json!({"subtotal": "-5"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
