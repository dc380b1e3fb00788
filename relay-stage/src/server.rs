use crate::api::{self, StageState};
use crate::config::{Config, Listener};
use crate::errors::StageError;
use crate::lifecycle::{Lifecycle, LifecycleState};
use crate::relay::HttpForwarder;
use crate::store::ValueStore;
use axum::Extension;
use axum::Router;
use axum::extract::ConnectInfo;
use hyper_util::service::TowerToHyperService;
use shared::admin_service::AdminService;
use shared::http::{ConnectionTimeouts, ShutdownOutcome, run_http_service};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower::Layer;

/// A stage whose listeners are bound but not yet serving.
///
/// Binding happens in [`bind`](StageServer::bind) so a port conflict fails before the
/// process reports itself ready. [`serve`](StageServer::serve) then runs until the
/// shutdown future resolves and the listeners have drained.
pub struct StageServer {
    listener: TcpListener,
    admin_listener: Option<TcpListener>,
    router: Router,
    store: ValueStore,
    lifecycle: Lifecycle,
    timeouts: ConnectionTimeouts,
}

impl StageServer {
    pub async fn bind(config: &Config) -> Result<Self, StageError> {
        let lifecycle = Lifecycle::new();
        tracing::info!(
            service = %config.service_name,
            terminal = config.is_terminal(),
            "stage is starting"
        );

        let store = ValueStore::new();
        let state = match &config.relay {
            Some(relay) => {
                let forwarder = HttpForwarder::new(
                    &config.service_name,
                    relay.url.clone(),
                    relay.timeout_secs.map(Duration::from_secs),
                )?;
                tracing::info!(url = %relay.url, policy = ?relay.on_failure, "relaying downstream");
                StageState::relay(
                    &config.service_name,
                    store.clone(),
                    Arc::new(forwarder),
                    relay.on_failure,
                )
            }
            None => StageState::terminal(&config.service_name, store.clone()),
        };

        let listener = bind_listener(&config.listener).await?;
        let admin_listener = match &config.admin_listener {
            Some(admin) => Some(bind_listener(admin).await?),
            None => None,
        };

        Ok(StageServer {
            listener,
            admin_listener,
            router: api::router(state),
            store,
            lifecycle,
            timeouts: ConnectionTimeouts {
                drain: Duration::from_millis(config.shutdown_timeout_ms),
                header_read: Duration::from_millis(config.header_read_timeout_ms),
            },
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn admin_addr(&self) -> Option<SocketAddr> {
        self.admin_listener
            .as_ref()
            .and_then(|l| l.local_addr().ok())
    }

    /// Handle to the stage's value store.
    pub fn store(&self) -> ValueStore {
        self.store.clone()
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle.clone()
    }

    /// Serves until `shutdown` resolves, then stops accepting connections and waits up
    /// to the shutdown timeout for in-flight requests before returning how it stopped.
    pub async fn serve<F>(self, shutdown: F) -> Result<ShutdownOutcome, StageError>
    where
        F: Future<Output = ()>,
    {
        let token = CancellationToken::new();
        let timeouts = self.timeouts;
        let addr = self.local_addr().ok();

        let router = self.router;
        let main_task = tokio::spawn(run_http_service(
            self.listener,
            move |peer: SocketAddr| {
                TowerToHyperService::new(Extension(ConnectInfo(peer)).layer(router.clone()))
            },
            token.clone(),
            timeouts,
        ));

        let admin_task = self.admin_listener.map(|listener| {
            let lifecycle = self.lifecycle.clone();
            let admin = AdminService::new(move || lifecycle.is_serving());
            tokio::spawn(run_http_service(
                listener,
                move |_| admin.clone(),
                token.clone(),
                timeouts,
            ))
        });

        self.lifecycle.transition(LifecycleState::Serving);
        tracing::info!(addr = ?addr, "ready to handle requests");

        shutdown.await;

        self.lifecycle.transition(LifecycleState::ShuttingDown);
        tracing::info!(
            timeout_ms = timeouts.drain.as_millis() as u64,
            "shutting down, waiting for in-flight requests"
        );
        token.cancel();

        let mut outcome = main_task.await?;
        if let Some(admin_task) = admin_task {
            outcome = outcome.combine(admin_task.await?);
        }

        self.lifecycle.transition(LifecycleState::Stopped(outcome));
        match outcome {
            ShutdownOutcome::Clean => tracing::info!("server stopped"),
            ShutdownOutcome::Forced => tracing::warn!(
                "forced stop: in-flight requests did not finish within the shutdown timeout"
            ),
        }

        Ok(outcome)
    }
}

async fn bind_listener(listener: &Listener) -> Result<TcpListener, StageError> {
    let addr = listener.addr();
    TcpListener::bind(&addr)
        .await
        .map_err(|source| StageError::Bind { addr, source })
}
