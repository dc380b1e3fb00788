use crate::metrics_defs::{REQUEST_DURATION, REQUESTS_INFLIGHT};
use axum::extract::{ConnectInfo, Request};
use axum::http::{HeaderName, HeaderValue, header};
use axum::middleware::Next;
use axum::response::Response;
use shared::{gauge, histogram};
use std::net::SocketAddr;
use std::time::Instant;
use tracing::Instrument;

pub static REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Trace identifier of the request being handled, available as a request extension.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestId(pub String);

/// Outermost layer. Reuses the caller's `X-Request-Id` or makes up a new one, echoes it
/// in the response and runs the rest of the stack inside a span carrying it, so every
/// log line for the request is tagged with `request_id`.
pub async fn trace_request(mut req: Request, next: Next) -> Response {
    let request_id = req
        .headers()
        .get(&REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
        .unwrap_or_else(next_request_id);

    req.extensions_mut().insert(RequestId(request_id.clone()));

    let span = tracing::info_span!("request", request_id = %request_id);
    let mut response = next.run(req).instrument(span).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response
            .headers_mut()
            .insert(REQUEST_ID_HEADER.clone(), value);
    }
    response
}

fn next_request_id() -> String {
    format!("{:016x}", rand::random::<u64>())
}

/// Logs one line per request once the response is ready.
pub async fn log_request(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_owned();
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_else(|| "unknown".into());
    let user_agent = req
        .headers()
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_owned();

    let inflight = gauge!(REQUESTS_INFLIGHT);
    inflight.increment(1.0);
    let start = Instant::now();

    let response = next.run(req).await;

    let elapsed = start.elapsed();
    inflight.decrement(1.0);
    histogram!(REQUEST_DURATION).record(elapsed.as_secs_f64());

    tracing::info!(
        %method,
        %path,
        %peer,
        %user_agent,
        status = response.status().as_u16(),
        elapsed_ms = elapsed.as_millis() as u64,
        "handled request"
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::body::Body;
    use axum::extract::Extension;
    use axum::routing::get;
    use tower::ServiceExt;

    fn app() -> Router {
        Router::new()
            .route(
                "/",
                get(|Extension(RequestId(id)): Extension<RequestId>| async move { id }),
            )
            .layer(axum::middleware::from_fn(log_request))
            .layer(axum::middleware::from_fn(trace_request))
    }

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_propagates_inbound_request_id() {
        let request = axum::http::Request::builder()
            .uri("/")
            .header("x-request-id", "abc123")
            .body(Body::empty())
            .unwrap();

        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.headers()["x-request-id"], "abc123");
        assert_eq!(body_string(response).await, "abc123");
    }

    #[tokio::test]
    async fn test_generates_request_id() {
        let request = axum::http::Request::builder().uri("/").body(Body::empty()).unwrap();

        let response = app().oneshot(request).await.unwrap();
        let header = response.headers()["x-request-id"].to_str().unwrap().to_owned();
        assert_eq!(header.len(), 16);
        assert_eq!(body_string(response).await, header);
    }

    #[tokio::test]
    async fn test_empty_inbound_request_id_is_replaced() {
        let request = axum::http::Request::builder()
            .uri("/")
            .header("x-request-id", "")
            .body(Body::empty())
            .unwrap();

        let response = app().oneshot(request).await.unwrap();
        assert!(!response.headers()["x-request-id"].is_empty());
    }

    #[test]
    fn test_generated_ids_differ() {
        assert_ne!(next_request_id(), next_request_id());
    }
}
