use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::{request::Parts, HeaderMap};
use common_http_errors::ApiError;
use serde::{Deserialize, Serialize};
use tracing::{warn, Span};
use uuid::Uuid;

/// Caller identity as forwarded by the upstream session layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RequestContext {
    pub user_id: Option<Uuid>,
    pub trace_id: Option<Uuid>,
}

impl RequestContext {
    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }
}

pub struct RequestCtxExtractor(pub RequestContext);

/// A malformed `X-User-ID` is treated as anonymous rather than rejected.
fn user_from_headers(headers: &HeaderMap) -> Option<Uuid> {
    let raw = headers.get("X-User-ID")?;
    let value = raw.to_str().ok()?.trim();
    if value.is_empty() {
        return None;
    }
    match Uuid::parse_str(value) {
        Ok(id) => Some(id),
        Err(_) => {
            warn!("Ignoring malformed X-User-ID header");
            None
        }
    }
}

fn trace_id_from_headers(headers: &HeaderMap) -> Option<Uuid> {
    headers.get("X-Trace-ID")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s.trim()).ok())
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestCtxExtractor where S: Send + Sync {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let headers = &parts.headers;
        let trace_id = trace_id_from_headers(headers).or_else(|| Some(Uuid::new_v4()));
        let user_id = user_from_headers(headers);

        if let Some(tid) = trace_id.as_ref() {
            Span::current().record("trace_id", tracing::field::display(tid));
        }
        if let Some(uid) = user_id.as_ref() {
            Span::current().record("user_id", tracing::field::display(uid));
        }

        Ok(RequestCtxExtractor(RequestContext { user_id, trace_id }))
    }
}
