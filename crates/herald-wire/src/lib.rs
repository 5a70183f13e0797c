//! herald-wire: wire protocol for the generation service
//!
//! This crate covers everything between the HTTP connection and typed
//! events: the request body, the `data: <JSON>` line protocol and the
//! incremental decoder that turns response chunks into [`StreamEvent`]s.

pub mod client;
pub mod decoder;
pub mod error;
pub mod event;
pub mod request;

pub use client::{ByteStream, GenerationClient};
pub use decoder::{EventStream, StreamDecoder, decode};
pub use error::{Error, ProtocolError, Result};
pub use event::StreamEvent;
pub use request::ChatRequest;
