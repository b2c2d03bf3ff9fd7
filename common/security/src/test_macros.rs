//! Shared test helper macro for attaching identity headers quickly.
//! Usage: test_request_headers!(req, user="<uuid>", trace="<uuid>");
#[macro_export]
macro_rules! test_request_headers {
    ($req:expr, user=$user:expr, trace=$trace:expr) => {{
        let h = $req.headers_mut();
        h.insert("X-User-ID", ::axum::http::HeaderValue::from_str($user).unwrap());
        h.insert("X-Trace-ID", ::axum::http::HeaderValue::from_str($trace).unwrap());
    }};
    ($req:expr, user=$user:expr) => {{
        let h = $req.headers_mut();
        h.insert("X-User-ID", ::axum::http::HeaderValue::from_str($user).unwrap());
    }};
}
