use crate::types::RelayPayload;
use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::routing::post;
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use url::Url;

#[derive(Clone, Debug)]
pub struct Received {
    pub payload: RelayPayload,
    pub content_type: Option<String>,
}

#[derive(Clone)]
struct DownstreamState {
    status: StatusCode,
    delay: Duration,
    received: Arc<Mutex<Vec<Received>>>,
}

/// Stand-in for the next stage: records every payload posted to `/post`, then
/// waits `delay` and answers `status`.
pub struct Downstream {
    addr: SocketAddr,
    received: Arc<Mutex<Vec<Received>>>,
    handle: JoinHandle<()>,
}

impl Downstream {
    pub fn url(&self) -> Url {
        Url::parse(&format!("http://{}/post", self.addr)).unwrap()
    }

    pub fn received(&self) -> Vec<Received> {
        self.received.lock().clone()
    }

    /// A URL nothing is listening on.
    pub async fn unreachable_url() -> Url {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        Url::parse(&format!("http://{addr}/post")).unwrap()
    }
}

impl Drop for Downstream {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub async fn spawn_downstream(status: StatusCode, delay: Duration) -> Downstream {
    let received = Arc::new(Mutex::new(Vec::new()));
    let state = DownstreamState {
        status,
        delay,
        received: received.clone(),
    };

    let app = Router::new()
        .route("/post", post(record_post))
        .with_state(state);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Downstream {
        addr,
        received,
        handle,
    }
}

async fn record_post(
    State(state): State<DownstreamState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let payload = serde_json::from_slice(&body).expect("downstream got invalid payload");
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    state.received.lock().push(Received {
        payload,
        content_type,
    });

    tokio::time::sleep(state.delay).await;
    state.status
}
