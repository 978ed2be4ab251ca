use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

pub static REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Tag every request and its response with an `x-request-id`, keeping one the
/// client sent if it is a valid header value.
pub async fn request_id_middleware(mut req: Request, next: Next) -> Response {
    let request_id = req
        .headers()
        .get(&REQUEST_ID_HEADER)
        .filter(|v| !v.is_empty())
        .cloned()
        .unwrap_or_else(fresh_id);

    req.headers_mut()
        .insert(REQUEST_ID_HEADER.clone(), request_id.clone());

    let mut response = next.run(req).await;
    response
        .headers_mut()
        .insert(REQUEST_ID_HEADER.clone(), request_id);
    response
}

fn fresh_id() -> HeaderValue {
    // A hyphenated UUID is always a valid header value
    HeaderValue::from_str(&Uuid::new_v4().to_string())
        .unwrap_or_else(|_| HeaderValue::from_static("unknown"))
}
