//! Streaming ingestion client for the assistant chat API.
//!
//! Receives an assistant reply as it is generated, token by token, over one
//! long-lived HTTP response: the transport yields raw byte deltas, the frame
//! decoder reassembles `data:` records split across delivery boundaries, the
//! router interprets each payload, and the session state machine delivers
//! ordered events with at-most-once completion and cooperative cancellation.
//!
//! # Usage
//!
//! ```no_run
//! use chat_stream::{ChatClient, ChatRequest, ClientConfig, StreamEvent};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), chat_stream::StreamError> {
//! let client = ChatClient::new(ClientConfig::new("https://api.example.com"))?;
//! let mut stream = client.start_stream(ChatRequest::new("Explain X"), "bearer-token")?;
//!
//! while let Some(event) = stream.next_event().await {
//!     match event {
//!         StreamEvent::Chunk { text } => print!("{text}"),
//!         StreamEvent::Completed { metadata } => println!("\ndone: {metadata:?}"),
//!         StreamEvent::Failed { error } => eprintln!("stream failed: {error}"),
//!     }
//! }
//! # Ok(())
//! # }
//! ```

/// Client entry point.
pub mod client;
/// HTTP client configuration.
pub mod config;
/// Frame reassembly from raw transport deltas.
pub mod decoder;
/// Public error types.
pub mod errors;
/// Request body, per-session options, and the aggregated reply.
pub mod request;
/// Payload interpretation into tagged events.
pub mod router;
/// Session state machine, stream handle, and cancellation handle.
pub mod session;
/// Transport seam and the reqwest-backed implementation.
pub mod transport;

pub use client::ChatClient;
pub use config::ClientConfig;
pub use decoder::{Frame, FrameDecoder};
pub use errors::{StreamError, StreamFailure, TransportError};
pub use request::{ChatReply, ChatRequest, ClosePolicy, MessageKind, StreamOptions};
pub use router::{ChatEvent, EventRouter};
pub use session::{CancelHandle, ChatStream, StreamEvent, StreamState};
pub use transport::{ByteStream, HttpTransport, StreamTransport};
