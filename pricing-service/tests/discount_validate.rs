mod support;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use common_security::test_request_headers;
use pricing_service::repo::memory::{faulty_repositories, Fault, InMemoryDiscounts, InMemoryOrders, MemoryStores};
use serde_json::json;
use support::{app, app_with, dec, dec_field, discount, post_json, send};
use uuid::Uuid;

fn stores(rows: Vec<pricing_service::model::DiscountCode>) -> MemoryStores {
    MemoryStores { discounts: InMemoryDiscounts::new(rows), ..Default::default() }
}

#[tokio::test]
async fn valid_code_returns_amount_and_display() {
    let mut d = discount("SAVE15");
    d.discount_value = dec("15");
    d.maximum_discount = Some(dec("10"));
    let router = app(stores(vec![d.clone()]));
    let (status, _, body) = send(
        router,
        post_json("/discounts/validate", json!({"code": "save15", "subtotal": "100.00", "items": []})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isValid"], true);
    assert_eq!(body["discountId"], d.id.to_string());
    assert_eq!(body["discountType"], "percentage");
    assert_eq!(dec_field(&body, "amountOff"), dec("10"));
    assert_eq!(dec_field(&body, "maximumDiscount"), dec("10"));
    assert_eq!(body["display"], "15% off");
}

#[tokio::test]
async fn unknown_code_is_a_business_outcome() {
    let router = app(stores(vec![]));
    let (status, _, body) = send(
        router,
        post_json("/discounts/validate", json!({"code": "NOPE", "subtotal": "20"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isValid"], false);
    assert_eq!(body["message"], "Invalid discount code");
    assert_eq!(dec_field(&body, "amountOff"), dec("0"));
    assert!(body.get("discountId").is_none());
}

#[tokio::test]
async fn expired_and_minimum_purchase_reasons() {
    let mut expired = discount("OLD");
    expired.valid_until = Some(Utc::now() - Duration::days(2));
    let mut min = discount("MIN50");
    min.minimum_purchase = Some(dec("50"));
    let router = app(stores(vec![expired, min]));

    let (_, _, body) = send(router.clone(), post_json("/discounts/validate", json!({"code": "OLD", "subtotal": "100"}))).await;
    assert_eq!(body["isValid"], false);
    assert_eq!(body["message"], "This discount code has expired");

    let (_, _, body) = send(router.clone(), post_json("/discounts/validate", json!({"code": "MIN50", "subtotal": "49.99"}))).await;
    assert_eq!(body["isValid"], false);
    assert_eq!(body["message"], "A minimum purchase of $50 is required for this discount");

    let (_, _, body) = send(router, post_json("/discounts/validate", json!({"code": "MIN50", "subtotal": "50.00"}))).await;
    assert_eq!(body["isValid"], true);
    assert_eq!(dec_field(&body, "amountOff"), dec("5"));
}

#[tokio::test]
async fn subtotal_is_derived_from_items_when_absent() {
    let mut fixed = discount("FIVE");
    fixed.discount_type = pricing_service::model::DiscountType::Fixed;
    fixed.discount_value = dec("5");
    let router = app(stores(vec![fixed]));
    let items = json!([
        {"productId": Uuid::new_v4(), "quantity": 2, "unitPrice": "1.50"},
        {"productId": Uuid::new_v4(), "quantity": 1, "unitPrice": "0.75"}
    ]);
    let (status, _, body) = send(router, post_json("/discounts/validate", json!({"code": "FIVE", "items": items}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isValid"], true);
    // 2 x 1.50 + 0.75, fixed 5 clamped to the cart
    assert_eq!(dec_field(&body, "amountOff"), dec("3.75"));
    assert_eq!(body["display"], "$5 off");
}

#[tokio::test]
async fn first_purchase_code_needs_a_new_signed_in_customer() {
    let mut welcome = discount("WELCOME30");
    welcome.discount_value = dec("30");
    welcome.first_purchase_only = true;
    let returning = Uuid::new_v4();
    let router = app(MemoryStores {
        discounts: InMemoryDiscounts::new(vec![welcome]),
        orders: InMemoryOrders::with_completed([returning]),
        ..Default::default()
    });

    let (_, _, body) = send(router.clone(), post_json("/discounts/validate", json!({"code": "WELCOME30", "subtotal": "100"}))).await;
    assert_eq!(body["isValid"], false);
    assert_eq!(body["message"], "This discount is only available on your first order");

    let mut req = post_json("/discounts/validate", json!({"code": "WELCOME30", "subtotal": "100"}));
    test_request_headers!(req, user = &returning.to_string());
    let (_, _, body) = send(router.clone(), req).await;
    assert_eq!(body["isValid"], false);

    let mut req = post_json("/discounts/validate", json!({"code": "WELCOME30", "subtotal": "100"}));
    test_request_headers!(req, user = &Uuid::new_v4().to_string());
    let (_, _, body) = send(router, req).await;
    assert_eq!(body["isValid"], true);
    assert_eq!(body["display"], "30% off - Welcome discount!");
}

#[tokio::test]
async fn auto_apply_discount_is_surfaced_alongside() {
    let mut code = discount("STACK10");
    code.stackable = true;
    let mut auto = discount("AUTO5");
    auto.auto_apply = true;
    auto.discount_type = pricing_service::model::DiscountType::Fixed;
    auto.discount_value = dec("5");
    let router = app(stores(vec![code, auto.clone()]));
    let (_, _, body) = send(router, post_json("/discounts/validate", json!({"code": "STACK10", "subtotal": "40"}))).await;
    assert_eq!(body["isValid"], true);
    let surfaced = &body["autoApplyDiscount"];
    assert_eq!(surfaced["discountId"], auto.id.to_string());
    assert_eq!(surfaced["code"], "AUTO5");
    assert_eq!(surfaced["isAutoApply"], true);
    assert_eq!(dec_field(surfaced, "amountOff"), dec("5"));
}

#[tokio::test]
async fn identical_requests_give_identical_bodies() {
    let router = app(stores(vec![discount("SAME")]));
    let req = || post_json("/discounts/validate", json!({"code": "SAME", "subtotal": "33.33"}));
    let (_, _, a) = send(router.clone(), req()).await;
    let (_, _, b) = send(router, req()).await;
    assert_eq!(a, b);
}

#[tokio::test]
async fn input_errors_are_field_level() {
    let router = app(stores(vec![discount("X")]));

    let (status, headers, body) = send(router.clone(), post_json("/discounts/validate", json!({"subtotal": "10"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(headers.get("X-Error-Code").unwrap(), "missing_code");
    assert_eq!(body["code"], "missing_code");
    assert_eq!(body["field"], "code");

    let (status, _, body) = send(router.clone(), post_json("/discounts/validate", json!({"code": "X", "subtotal": "-1"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_subtotal");

    let bad_qty = json!({"code": "X", "items": [{"productId": Uuid::new_v4(), "quantity": 0, "unitPrice": "1"}]});
    let (status, _, body) = send(router.clone(), post_json("/discounts/validate", bad_qty)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_quantity");

    let bad_price = json!({"code": "X", "items": [{"productId": Uuid::new_v4(), "quantity": 1, "unitPrice": "-2"}]});
    let (_, _, body) = send(router.clone(), post_json("/discounts/validate", bad_price)).await;
    assert_eq!(body["code"], "invalid_unit_price");

    let req = axum::http::Request::builder()
        .method("POST")
        .uri("/discounts/validate")
        .header("content-type", "application/json")
        .body(axum::body::Body::from("{not json"))
        .unwrap();
    let (status, _, body) = send(router, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_body");
    assert!(body["trace_id"].is_string());
}

#[tokio::test]
async fn store_failure_yields_generic_error() {
    let router = app_with(faulty_repositories(Fault::Error));
    let (status, headers, body) = send(router, post_json("/discounts/validate", json!({"code": "ANY", "subtotal": "10"}))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(headers.get("X-Error-Code").unwrap(), "internal_error");
    assert_eq!(body["message"], "Failed to validate discount code");
    assert!(!body.to_string().contains("relation does not exist"));
}
