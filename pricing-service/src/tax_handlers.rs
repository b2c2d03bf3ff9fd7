use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use common_http_errors::{ApiError, ApiResult};
use common_security::RequestCtxExtractor;
use serde::Deserialize;
use tracing::{info_span, Instrument};

use crate::app::AppState;
use crate::discount_handlers::with_trace;
use crate::tax::TaxResult;

#[derive(Debug, Deserialize)]
pub struct TaxRequest {
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

pub async fn calculate_tax(
    State(state): State<AppState>,
    RequestCtxExtractor(ctx): RequestCtxExtractor,
    payload: Result<Json<TaxRequest>, JsonRejection>,
) -> ApiResult<Json<TaxResult>> {
    let trace_id = ctx.trace_id;
    let Json(req) = payload.map_err(|rej| with_trace(ApiError::from(rej), trace_id))?;
    let country = req
        .country
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::invalid_field("missing_country", "country", "country is required", trace_id))?;

    let span = info_span!("calculate_tax", trace_id = ?trace_id);
    let result = state
        .pricing
        .resolve_tax(country, req.state.as_deref())
        .instrument(span)
        .await;
    Ok(Json(result))
}
