use crate::types::RelayPayload;
use async_trait::async_trait;
use http::StatusCode;
use std::time::Duration;
use url::Url;

#[derive(thiserror::Error, Debug)]
pub enum RelayError {
    #[error("relay to {url} failed: {source}")]
    Transport {
        url: Url,
        #[source]
        source: reqwest::Error,
    },

    #[error("relay to {url} failed: downstream responded {status}")]
    Status { url: Url, status: StatusCode },
}

/// Sends a transformed value to the next stage.
#[async_trait]
pub trait Forwarder: Send + Sync {
    async fn forward(&self, value: i64) -> Result<(), RelayError>;
}

/// Posts values as JSON to a fixed downstream URL. There are no retries: a single
/// transport error or non-2xx answer is reported as a failed relay.
pub struct HttpForwarder {
    client: reqwest::Client,
    url: Url,
    service_name: String,
}

impl HttpForwarder {
    pub fn new(
        service_name: &str,
        url: Url,
        timeout: Option<Duration>,
    ) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(HttpForwarder {
            client: builder.build()?,
            url,
            service_name: service_name.to_string(),
        })
    }
}

#[async_trait]
impl Forwarder for HttpForwarder {
    async fn forward(&self, value: i64) -> Result<(), RelayError> {
        let payload = RelayPayload {
            service_name: self.service_name.clone(),
            value,
        };

        tracing::debug!(url = %self.url, value, "sending value downstream");

        let response = self
            .client
            .post(self.url.clone())
            .json(&payload)
            .send()
            .await
            .map_err(|source| RelayError::Transport {
                url: self.url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RelayError::Status {
                url: self.url.clone(),
                status,
            });
        }

        tracing::debug!(url = %self.url, %status, "downstream accepted value");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::{Downstream, spawn_downstream};
    use axum::http::StatusCode as AxumStatus;

    #[tokio::test]
    async fn test_forward_sends_json_payload() {
        let downstream = spawn_downstream(AxumStatus::OK, Duration::ZERO).await;
        let forwarder = HttpForwarder::new("serviceB", downstream.url(), None).unwrap();

        forwarder.forward(108).await.unwrap();

        let received = downstream.received();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].content_type.as_deref(), Some("application/json"));
        assert_eq!(
            received[0].payload,
            RelayPayload {
                service_name: "serviceB".into(),
                value: 108
            }
        );
    }

    #[tokio::test]
    async fn test_non_success_status_is_a_failure() {
        let downstream = spawn_downstream(AxumStatus::INTERNAL_SERVER_ERROR, Duration::ZERO).await;
        let forwarder = HttpForwarder::new("serviceB", downstream.url(), None).unwrap();

        let err = forwarder.forward(1).await.unwrap_err();
        assert!(matches!(
            err,
            RelayError::Status { status, .. } if status == StatusCode::INTERNAL_SERVER_ERROR
        ));
    }

    #[tokio::test]
    async fn test_connection_failure() {
        let url = Downstream::unreachable_url().await;
        let forwarder = HttpForwarder::new("serviceB", url, None).unwrap();

        let err = forwarder.forward(1).await.unwrap_err();
        assert!(matches!(err, RelayError::Transport { .. }));
    }

    #[tokio::test]
    async fn test_timeout() {
        let downstream = spawn_downstream(AxumStatus::OK, Duration::from_secs(5)).await;
        let forwarder = HttpForwarder::new(
            "serviceB",
            downstream.url(),
            Some(Duration::from_millis(100)),
        )
        .unwrap();

        let err = forwarder.forward(1).await.unwrap_err();
        match err {
            RelayError::Transport { source, .. } => assert!(source.is_timeout()),
            other => panic!("unexpected error: {other}"),
        }
    }
}
