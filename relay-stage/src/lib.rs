pub mod api;
pub mod config;
pub mod errors;
pub mod lifecycle;
pub mod metrics_defs;
pub mod middleware;
pub mod relay;
pub mod server;
pub mod store;
pub mod types;

#[cfg(test)]
mod testutils;

pub use errors::StageError;
pub use server::StageServer;
pub use shared::http::ShutdownOutcome;

use std::future::Future;

/// Binds the stage described by `config` and serves it until `shutdown` resolves.
pub async fn run<F>(config: config::Config, shutdown: F) -> Result<ShutdownOutcome, StageError>
where
    F: Future<Output = ()>,
{
    StageServer::bind(&config).await?.serve(shutdown).await
}
