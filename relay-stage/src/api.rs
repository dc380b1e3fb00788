use crate::config::RelayFailurePolicy;
use crate::errors::StageApiError;
use crate::metrics_defs::{DECODE_FAILURES, RECORDS_ACCEPTED, RECORDS_STORED, RELAY_FAILURES};
use crate::middleware::{log_request, trace_request};
use crate::relay::Forwarder;
use crate::store::ValueStore;
use crate::types::{Record, RelayPayload};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router, middleware};
use shared::{counter, gauge};
use std::sync::Arc;

/// Added to every inbound value before it is stored and forwarded.
pub const VALUE_OFFSET: i64 = 100;

pub const ACKNOWLEDGEMENT: &str = "POST done";

#[derive(Clone)]
struct Relay {
    forwarder: Arc<dyn Forwarder>,
    policy: RelayFailurePolicy,
}

/// Everything the handlers of one stage share.
#[derive(Clone)]
pub struct StageState {
    service_name: Arc<str>,
    store: ValueStore,
    relay: Option<Relay>,
}

impl StageState {
    pub fn terminal(service_name: &str, store: ValueStore) -> Self {
        StageState {
            service_name: service_name.into(),
            store,
            relay: None,
        }
    }

    pub fn relay(
        service_name: &str,
        store: ValueStore,
        forwarder: Arc<dyn Forwarder>,
        policy: RelayFailurePolicy,
    ) -> Self {
        StageState {
            service_name: service_name.into(),
            store,
            relay: Some(Relay { forwarder, policy }),
        }
    }
}

/// Builds the stage's routes. Only the terminal stage exposes `/get`.
///
/// Layers run outermost first: request tracing, then request logging, then the handler.
pub fn router(state: StageState) -> Router {
    let mut router = Router::new()
        .route("/", get(index))
        .route("/post", post(post_value));

    if state.relay.is_none() {
        router = router.route("/get", get(get_values));
    }

    router
        .layer(middleware::from_fn(log_request))
        .layer(middleware::from_fn(trace_request))
        .with_state(state)
}

async fn index(State(state): State<StageState>) -> impl IntoResponse {
    (
        [(header::X_CONTENT_TYPE_OPTIONS, "nosniff")],
        format!("This is {}!\n", state.service_name),
    )
}

/// Decodes the body regardless of its content type.
fn transformed_value(body: &[u8]) -> Result<i64, StageApiError> {
    let payload: RelayPayload = serde_json::from_slice(body)?;
    tracing::info!(sender = %payload.service_name, value = payload.value, "received value");

    payload
        .value
        .checked_add(VALUE_OFFSET)
        .ok_or(StageApiError::ValueOutOfRange(payload.value))
}

// The record is stored before forwarding and a failed relay never removes it.
// The failure policy only decides what the caller is told.
async fn post_value(
    State(state): State<StageState>,
    body: Bytes,
) -> Result<&'static str, StageApiError> {
    let value = transformed_value(&body).inspect_err(|e| {
        counter!(DECODE_FAILURES).increment(1);
        tracing::warn!(error = %e, "rejected request");
    })?;

    let (record, stored) = state.store.append(&state.service_name, value);
    counter!(RECORDS_ACCEPTED).increment(1);
    gauge!(RECORDS_STORED).set(stored as f64);
    tracing::debug!(value = record.value(), timestamp = %record.timestamp(), "stored record");

    if let Some(relay) = &state.relay
        && let Err(e) = relay.forwarder.forward(value).await
    {
        counter!(RELAY_FAILURES).increment(1);
        tracing::error!(error = %e, value, "relay failed");
        if relay.policy == RelayFailurePolicy::Reject {
            return Err(e.into());
        }
    }

    Ok(ACKNOWLEDGEMENT)
}

async fn get_values(State(state): State<StageState>) -> Json<Vec<Record>> {
    Json(state.store.snapshot())
}
