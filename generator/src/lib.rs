pub mod config;
pub mod metrics_defs;

use crate::metrics_defs::VALUES_SENT;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use relay_stage::types::RelayPayload;
use shared::counter;
use std::future::Future;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

#[derive(thiserror::Error, Debug)]
pub enum GeneratorError {
    #[error("invalid generator config: {0}")]
    Config(#[from] config::ValidationError),

    #[error("error connecting to {url}: {source}")]
    Send {
        url: url::Url,
        #[source]
        source: reqwest::Error,
    },
}

/// Why the generator stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    Signal,
    CountReached,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Summary {
    pub sent: u64,
    pub reason: StopReason,
}

/// Posts a random value to the configured target on every tick until `shutdown`
/// resolves or `count` values were sent.
///
/// A connection failure ends the run with an error. A non-2xx answer is only logged.
/// A send still in flight when `shutdown` resolves is abandoned.
pub async fn run<F>(config: config::Config, shutdown: F) -> Result<Summary, GeneratorError>
where
    F: Future<Output = ()>,
{
    config.validate()?;

    let client = reqwest::Client::new();
    let mut rng = StdRng::from_entropy();
    let mut ticker = tokio::time::interval(Duration::from_millis(config.interval_ms));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::info!(
        target_url = %config.target,
        interval_ms = config.interval_ms,
        "generator started"
    );

    tokio::pin!(shutdown);
    let mut sent = 0;

    loop {
        if config.count.is_some_and(|count| sent >= count) {
            return Ok(Summary {
                sent,
                reason: StopReason::CountReached,
            });
        }

        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!(sent, "generator stopping");
                return Ok(Summary { sent, reason: StopReason::Signal });
            }
            _ = ticker.tick() => {}
        }

        let payload = RelayPayload {
            service_name: config.service_name.clone(),
            value: rng.gen_range(0..config.max_value),
        };
        // A target that never answers must not hold up shutdown
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!(sent, "generator stopping, abandoning in-flight value");
                return Ok(Summary { sent, reason: StopReason::Signal });
            }
            result = send_value(&client, &config.target, &payload) => result?,
        }
        sent += 1;
    }
}

async fn send_value(
    client: &reqwest::Client,
    target: &url::Url,
    payload: &RelayPayload,
) -> Result<(), GeneratorError> {
    tracing::info!(value = payload.value, "sending value");

    let response = client
        .post(target.clone())
        .json(payload)
        .send()
        .await
        .map_err(|source| GeneratorError::Send {
            url: target.clone(),
            source,
        })?;
    counter!(VALUES_SENT).increment(1);

    let status = response.status();
    if status.is_success() {
        tracing::debug!(%status, "value accepted");
    } else {
        let body = response.text().await.unwrap_or_default();
        tracing::warn!(%status, %body, "value rejected");
    }
    Ok(())
}
