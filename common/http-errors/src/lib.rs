use axum::{
    body::Body,
    extract::rejection::{JsonRejection, QueryRejection},
    http::{HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use once_cell::sync::Lazy;
use prometheus::{IntCounter, IntCounterVec, IntGauge, Opts, Registry};
use serde::Serialize;
use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Serialize, Debug)]
pub struct ErrorBody {
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")] pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")] pub trace_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")] pub message: Option<String>,
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest { code: &'static str, field: Option<&'static str>, trace_id: Option<Uuid>, message: Option<String> },
    Internal { trace_id: Option<Uuid>, message: Option<String> },
}

impl ApiError {
    pub fn internal<E: std::fmt::Display>(e: E, trace_id: Option<Uuid>) -> Self { Self::Internal { trace_id, message: Some(e.to_string()) } }
    pub fn bad_request(code: &'static str, trace_id: Option<Uuid>) -> Self { Self::BadRequest { code, field: None, trace_id, message: None } }

    /// Input error bound to a single request field.
    pub fn invalid_field(code: &'static str, field: &'static str, message: impl Into<String>, trace_id: Option<Uuid>) -> Self {
        Self::BadRequest { code, field: Some(field), trace_id, message: Some(message.into()) }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest { code, .. } => *code,
            ApiError::Internal { .. } => "internal_error",
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest { code: "invalid_body", field: None, trace_id: None, message: Some(rejection.body_text()) }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest { code: "invalid_query", field: None, trace_id: None, message: Some(rejection.body_text()) }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let error_code = self.code();
        let (status, body) = match self {
            ApiError::BadRequest { code, field, trace_id, message } => (
                StatusCode::BAD_REQUEST,
                ErrorBody { code: code.into(), field: field.map(Into::into), trace_id, message },
            ),
            ApiError::Internal { trace_id, message } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody { code: "internal_error".into(), field: None, trace_id, message },
            ),
        };
        let mut resp = (status, Json(body)).into_response();
        if let Ok(val) = HeaderValue::from_str(error_code) {
            resp.headers_mut().insert("X-Error-Code", val);
        }
        resp
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

// --- Error metrics ---

/// Distinct error codes tracked as labels before folding into `overflow`.
pub const MAX_ERROR_CODES: usize = 40;

pub static ERROR_REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

static HTTP_ERRORS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let v = IntCounterVec::new(
        Opts::new("http_errors_total", "Count of HTTP error responses emitted (status >= 400)"),
        &["service", "code", "status"],
    ).expect("valid http_errors_total opts");
    ERROR_REGISTRY.register(Box::new(v.clone())).ok();
    v
});

static ERROR_CODES_DISTINCT: Lazy<IntGauge> = Lazy::new(|| {
    let g = IntGauge::new("http_error_codes_distinct", "Distinct error codes observed as labels").expect("valid gauge opts");
    ERROR_REGISTRY.register(Box::new(g.clone())).ok();
    g
});

static ERROR_CODE_OVERFLOW: Lazy<IntCounter> = Lazy::new(|| {
    let c = IntCounter::new("http_error_code_overflow_total", "Error responses whose code exceeded the label guard").expect("valid counter opts");
    ERROR_REGISTRY.register(Box::new(c.clone())).ok();
    c
});

static SEEN_CODES: Lazy<Mutex<HashSet<String>>> = Lazy::new(|| Mutex::new(HashSet::new()));

fn guarded_code_label(code: &str) -> String {
    let Ok(mut seen) = SEEN_CODES.lock() else { return "overflow".to_string(); };
    if seen.contains(code) {
        return code.to_string();
    }
    if seen.len() >= MAX_ERROR_CODES {
        ERROR_CODE_OVERFLOW.inc();
        return "overflow".to_string();
    }
    seen.insert(code.to_string());
    ERROR_CODES_DISTINCT.set(seen.len() as i64);
    code.to_string()
}

pub fn record_http_error(service: &str, code: &str, status: StatusCode) {
    let label = guarded_code_label(code);
    HTTP_ERRORS_TOTAL.with_label_values(&[service, &label, status.as_str()]).inc();
}

type LayerFuture = Pin<Box<dyn Future<Output = Response> + Send>>;

/// Middleware counting responses with status >= 400, labelled by the `X-Error-Code` header.
pub fn http_error_metrics_layer(service: &'static str) -> impl Fn(Request<Body>, Next) -> LayerFuture + Clone + Send + Sync + 'static {
    move |req: Request<Body>, next: Next| -> LayerFuture {
        Box::pin(async move {
            let resp = next.run(req).await;
            let status = resp.status();
            if status.as_u16() >= 400 {
                let code = resp.headers().get("X-Error-Code").and_then(|v| v.to_str().ok()).unwrap_or("unknown");
                record_http_error(service, code, status);
            }
            resp
        })
    }
}

#[doc(hidden)]
pub mod test_helpers {
    use super::*;

    pub fn simulate_error_code(code: &str) {
        record_http_error("test-helpers", code, StatusCode::BAD_REQUEST);
    }

    pub fn distinct_gauge() -> i64 {
        ERROR_CODES_DISTINCT.get()
    }

    pub fn overflow_count() -> u64 {
        ERROR_CODE_OVERFLOW.get()
    }
}
