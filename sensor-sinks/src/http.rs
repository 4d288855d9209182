use std::time::Duration;

use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use sensor::bail;
use sensor::error::{EngineResult, ErrorKind};
use sensor::sensor_error;
use sensor::sink::Sink;
use sensor::types::{Batch, Envelope};
use serde::Serialize;
use tracing::debug;

/// Header carrying the optional API key.
const API_KEY_HEADER: &str = "apikey";

/// Sink posting envelopes as JSON to an HTTP endpoint.
///
/// A single envelope is sent as a JSON object and a batch as a JSON array, both with a
/// `POST` to the same endpoint. Any status outside `2xx` fails the publish.
#[derive(Debug, Clone)]
pub struct HttpSink {
    client: Client,
    endpoint: String,
    api_key: Option<SecretString>,
}

impl HttpSink {
    /// Creates a sink posting to `endpoint`, giving up on requests after `timeout`.
    pub fn new(
        endpoint: impl Into<String>,
        timeout: Duration,
        api_key: Option<SecretString>,
    ) -> EngineResult<Self> {
        let client = Client::builder().timeout(timeout).build().map_err(|err| {
            sensor_error!(
                ErrorKind::ConfigError,
                "Failed to build HTTP client",
                source: err
            )
        })?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn post<P: Serialize + ?Sized>(&self, payload: &P) -> EngineResult<()> {
        let mut request = self.client.post(&self.endpoint).json(payload);
        if let Some(api_key) = &self.api_key {
            request = request.header(API_KEY_HEADER, api_key.expose_secret().as_str());
        }

        let response = request.send().await.map_err(|err| {
            sensor_error!(
                ErrorKind::SinkConnectionFailed,
                "HTTP request failed",
                format!("endpoint: {}", self.endpoint),
                source: err
            )
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!(
                ErrorKind::SinkPublishFailed,
                "HTTP endpoint rejected the payload",
                describe_rejection(status, &body)
            );
        }

        debug!(%status, "payload accepted by HTTP endpoint");

        Ok(())
    }
}

fn describe_rejection(status: StatusCode, body: &str) -> String {
    if body.is_empty() {
        format!("status {status}")
    } else {
        format!("status {status}: {body}")
    }
}

impl<T> Sink<T> for HttpSink
where
    T: Serialize + Send + Sync + 'static,
{
    fn name() -> &'static str {
        "http"
    }

    async fn publish_one(&self, envelope: Envelope<T>) -> EngineResult<()> {
        self.post(&envelope).await
    }

    async fn publish_batch(&self, batch: Batch<T>) -> EngineResult<()> {
        self.post(&batch).await
    }

    async fn close(&self) -> EngineResult<()> {
        // Connections are pooled by the client and released when it is dropped.
        Ok(())
    }
}
