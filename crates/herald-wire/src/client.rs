//! HTTP client for the generation endpoint

use crate::error::{Error, Result};
use crate::request::ChatRequest;
use futures::StreamExt;
use std::pin::Pin;
use tokio_stream::Stream;
use tokio_util::sync::CancellationToken;

/// Endpoint used when none is configured
pub const DEFAULT_ENDPOINT: &str = "http://localhost:3000/api/chat-stream";

/// Raw response body, chunk by chunk
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>>> + Send>>;

/// Client for the streaming chat endpoint
#[derive(Debug, Clone)]
pub struct GenerationClient {
    client: reqwest::Client,
    endpoint: String,
}

impl GenerationClient {
    /// Create a client for the given endpoint URL
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        let endpoint = endpoint.into();
        reqwest::Url::parse(&endpoint)
            .map_err(|e| Error::InvalidConfig(format!("endpoint '{}': {}", endpoint, e)))?;
        Ok(Self {
            client: reqwest::Client::new(),
            endpoint,
        })
    }

    /// The endpoint URL
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// POST the request and return the response body as a byte stream.
    ///
    /// Cancelling `cancel` before the headers arrive yields [`Error::Aborted`];
    /// cancelling later ends the returned stream at the next chunk boundary.
    /// A non-2xx status is returned as [`Error::Status`] without reading the
    /// body.
    pub async fn open(&self, request: &ChatRequest, cancel: CancellationToken) -> Result<ByteStream> {
        tracing::debug!(
            endpoint = %self.endpoint,
            ai_model = %request.ai_model,
            use_grounding = request.use_grounding,
            "opening generation stream"
        );

        let send = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send();

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Aborted),
            response = send => response?,
        };

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()).map_err(Error::from))
            .take_until(cancel.cancelled_owned());

        Ok(Box::pin(body))
    }
}
