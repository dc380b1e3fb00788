use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::service::Service;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::{TokioExecutor, TokioIo, TokioTimer};
use hyper_util::server::conn::auto::Builder;
use hyper_util::server::graceful::GracefulShutdown;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// How a listener finished draining its connections after shutdown was requested.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// Every in-flight request completed before the drain timeout.
    Clean,
    /// The drain timeout elapsed while connections were still open.
    Forced,
}

impl ShutdownOutcome {
    /// Combines the outcomes of several listeners. Any forced drain makes the whole stop forced.
    pub fn combine(self, other: ShutdownOutcome) -> ShutdownOutcome {
        match (self, other) {
            (ShutdownOutcome::Clean, ShutdownOutcome::Clean) => ShutdownOutcome::Clean,
            _ => ShutdownOutcome::Forced,
        }
    }
}

/// Per-connection time limits for [`run_http_service`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConnectionTimeouts {
    /// How long to wait for open connections once shutdown starts.
    pub drain: Duration,
    /// How long an HTTP/1 client may take to send a complete request head.
    pub header_read: Duration,
}

/// Accepts connections on `listener` and serves each one with the service built by
/// `make_service` until `shutdown` is cancelled.
///
/// Once cancelled the listener is dropped so no new connections are accepted, every
/// open connection is told to finish its current request (keep-alive is disabled for
/// HTTP/1) and the function waits up to `timeouts.drain` for them to close. Clients
/// that stall while sending headers are dropped after `timeouts.header_read`.
pub async fn run_http_service<M, S, B>(
    listener: TcpListener,
    make_service: M,
    shutdown: CancellationToken,
    timeouts: ConnectionTimeouts,
) -> ShutdownOutcome
where
    M: Fn(SocketAddr) -> S + Send + 'static,
    S: Service<Request<Incoming>, Response = Response<B>> + Send + Sync + 'static,
    S::Future: Send + 'static,
    S::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    B: hyper::body::Body + Send + 'static,
    B::Data: Send,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let graceful = GracefulShutdown::new();
    let mut builder = Builder::new(TokioExecutor::new());
    builder
        .http1()
        .timer(TokioTimer::new())
        .header_read_timeout(timeouts.header_read);

    loop {
        let (stream, peer_addr) = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok(conn) => conn,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to accept connection");
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    continue;
                }
            },
            _ = shutdown.cancelled() => break,
        };
        let _ = stream.set_nodelay(true);
        let io = TokioIo::new(stream);

        // Hand the connection to hyper; auto-detect h1/h2 on this socket
        let conn = builder
            .serve_connection(io, make_service(peer_addr))
            .into_owned();
        let conn = graceful.watch(conn);

        tokio::spawn(async move {
            if let Err(e) = conn.await {
                tracing::debug!(error = %e, peer = %peer_addr, "connection closed with error");
            }
        });
    }

    drop(listener);

    tokio::select! {
        _ = graceful.shutdown() => ShutdownOutcome::Clean,
        _ = tokio::time::sleep(timeouts.drain) => ShutdownOutcome::Forced,
    }
}

pub fn make_boxed_error_response(status_code: StatusCode) -> Response<BoxBody<Bytes, Infallible>> {
    let message = status_code
        .canonical_reason()
        .unwrap_or("an error occurred");

    let mut response = Response::new(Full::new(Bytes::from(message)).boxed());
    *response.status_mut() = status_code;
    response
}
