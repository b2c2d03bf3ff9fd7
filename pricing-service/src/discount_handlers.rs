use std::str::FromStr;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::Json;
use bigdecimal::{BigDecimal, Zero};
use common_http_errors::{ApiError, ApiResult};
use common_money::Money;
use common_security::RequestCtxExtractor;
use serde::{Deserialize, Serialize};
use tracing::{info_span, Instrument};
use uuid::Uuid;

use crate::app::AppState;
use crate::model::{cart_subtotal, CartItem, DiscountType, PricedVariant, VariantPriceRequest};
use crate::pricing::{AppliedDiscount, PricingError, ValidateInput};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateDiscountRequest {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub subtotal: Option<BigDecimal>,
    #[serde(default)]
    pub items: Vec<CartItem>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateDiscountResponse {
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_type: Option<DiscountType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_value: Option<BigDecimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum_discount: Option<BigDecimal>,
    pub amount_off: Money,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_apply_discount: Option<AppliedDiscount>,
}

fn validate_items(items: &[CartItem], trace_id: Option<Uuid>) -> ApiResult<()> {
    for item in items {
        if item.quantity <= 0 {
            return Err(ApiError::invalid_field("invalid_quantity", "items", "Item quantity must be greater than zero", trace_id));
        }
        if item.unit_price < BigDecimal::zero() {
            return Err(ApiError::invalid_field("invalid_unit_price", "items", "Item unit price cannot be negative", trace_id));
        }
    }
    Ok(())
}

fn non_negative(value: BigDecimal, code: &'static str, field: &'static str, trace_id: Option<Uuid>) -> ApiResult<BigDecimal> {
    if value < BigDecimal::zero() {
        return Err(ApiError::invalid_field(code, field, format!("{field} cannot be negative"), trace_id));
    }
    Ok(value)
}

pub async fn validate_discount(
    State(state): State<AppState>,
    RequestCtxExtractor(ctx): RequestCtxExtractor,
    payload: Result<Json<ValidateDiscountRequest>, JsonRejection>,
) -> ApiResult<Json<ValidateDiscountResponse>> {
    let trace_id = ctx.trace_id;
    let Json(req) = payload.map_err(|rej| with_trace(ApiError::from(rej), trace_id))?;
    let code = req
        .code
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::invalid_field("missing_code", "code", "Discount code is required", trace_id))?
        .to_string();
    validate_items(&req.items, trace_id)?;
    let subtotal = match req.subtotal {
        Some(value) => non_negative(value, "invalid_subtotal", "subtotal", trace_id)?,
        None => cart_subtotal(&req.items),
    };

    let span = info_span!("validate_discount", trace_id = ?trace_id, user_id = ?ctx.user_id);
    let outcome = state
        .pricing
        .validate(ValidateInput { code: &code, subtotal: &subtotal, items: &req.items, user_id: ctx.user_id })
        .instrument(span)
        .await
        .map_err(|PricingError::Store(_)| ApiError::internal("Failed to validate discount code", trace_id))?;

    let discount = outcome.discount.as_ref();
    Ok(Json(ValidateDiscountResponse {
        is_valid: outcome.is_valid,
        discount_id: discount.map(|d| d.id),
        discount_type: discount.map(|d| d.discount_type),
        discount_value: discount.map(|d| d.discount_value.clone()),
        maximum_discount: discount.and_then(|d| d.maximum_discount.clone()),
        amount_off: outcome.amount_off,
        message: outcome.message,
        display: outcome.display,
        auto_apply_discount: outcome.auto_apply,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoApplyRequest {
    #[serde(default)]
    pub subtotal: Option<BigDecimal>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoApplyResponse {
    pub has_auto_apply: bool,
    pub discount: Option<AppliedDiscount>,
}

pub async fn auto_apply_discount(
    State(state): State<AppState>,
    RequestCtxExtractor(ctx): RequestCtxExtractor,
    payload: Result<Json<AutoApplyRequest>, JsonRejection>,
) -> ApiResult<Json<AutoApplyResponse>> {
    let trace_id = ctx.trace_id;
    let Json(req) = payload.map_err(|rej| with_trace(ApiError::from(rej), trace_id))?;
    let subtotal = req
        .subtotal
        .ok_or_else(|| ApiError::invalid_field("invalid_subtotal", "subtotal", "subtotal is required", trace_id))?;
    let subtotal = non_negative(subtotal, "invalid_subtotal", "subtotal", trace_id)?;

    let span = info_span!("auto_apply_discount", trace_id = ?trace_id, user_id = ?ctx.user_id);
    let discount = state.pricing.auto_apply(&subtotal, ctx.user_id).instrument(span).await;
    Ok(Json(AutoApplyResponse { has_auto_apply: discount.is_some(), discount }))
}

#[derive(Debug, Deserialize)]
pub struct FirstOrderQuery {
    pub total: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FirstOrderResponse {
    pub has_first_order_discount: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount: Option<AppliedDiscount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

pub async fn first_order_discount(
    State(state): State<AppState>,
    RequestCtxExtractor(ctx): RequestCtxExtractor,
    query: Result<Query<FirstOrderQuery>, QueryRejection>,
) -> ApiResult<Json<FirstOrderResponse>> {
    let trace_id = ctx.trace_id;
    let Query(params) = query.map_err(|rej| with_trace(ApiError::from(rej), trace_id))?;
    let total = match params.total.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        Some(raw) => BigDecimal::from_str(raw)
            .map_err(|_| ApiError::invalid_field("invalid_total", "total", "total must be a decimal amount", trace_id))
            .and_then(|v| non_negative(v, "invalid_total", "total", trace_id))?,
        None => BigDecimal::zero(),
    };

    let span = info_span!("first_order_discount", trace_id = ?trace_id, user_id = ?ctx.user_id);
    let offer = state.pricing.first_order(ctx.user_id, &total).instrument(span).await;
    Ok(Json(FirstOrderResponse {
        has_first_order_discount: offer.has_first_order_discount,
        discount: offer.discount,
        message: offer.message,
    }))
}

#[derive(Debug, Deserialize)]
pub struct VariantPricingRequest {
    pub variants: Vec<VariantPriceRequest>,
}

#[derive(Debug, Serialize)]
pub struct VariantPricingResponse {
    pub variants: Vec<PricedVariant>,
}

pub async fn price_variants(
    State(state): State<AppState>,
    RequestCtxExtractor(ctx): RequestCtxExtractor,
    payload: Result<Json<VariantPricingRequest>, JsonRejection>,
) -> ApiResult<Json<VariantPricingResponse>> {
    let trace_id = ctx.trace_id;
    let Json(req) = payload.map_err(|rej| with_trace(ApiError::from(rej), trace_id))?;
    if req.variants.iter().any(|v| v.base_price < BigDecimal::zero()) {
        return Err(ApiError::invalid_field("invalid_base_price", "variants", "basePrice cannot be negative", trace_id));
    }
    let span = info_span!("price_variants", trace_id = ?trace_id, count = req.variants.len());
    let variants = state.pricing.price_variants(req.variants).instrument(span).await;
    Ok(Json(VariantPricingResponse { variants }))
}

/// Attach the request trace id to an error built without one.
pub(crate) fn with_trace(err: ApiError, trace: Option<Uuid>) -> ApiError {
    match err {
        ApiError::BadRequest { code, field, trace_id: None, message } => {
            ApiError::BadRequest { code, field, trace_id: trace, message }
        }
        other => other,
    }
}
