//! Transport abstraction for reaching the generation service

use async_trait::async_trait;
use herald_wire::{ByteStream, ChatRequest, GenerationClient, Result};
use tokio_util::sync::CancellationToken;

/// Opens one streamed generation per call.
///
/// Implementations must honour `cancel`: before the response is available
/// they return [`herald_wire::Error::Aborted`], afterwards the body stream
/// ends.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn stream(&self, request: ChatRequest, cancel: CancellationToken) -> Result<ByteStream>;
}

#[async_trait]
impl Transport for GenerationClient {
    async fn stream(&self, request: ChatRequest, cancel: CancellationToken) -> Result<ByteStream> {
        self.open(&request, cancel).await
    }
}
