//! # SQS Handler
//!
//! A configurable façade over AWS SQS for sending validated messages,
//! chunked batch sends, receiving, batch deletes and queue attribute lookups.
//!
//! This library provides:
//! - A validated outbound message model with single and batch scenarios
//! - Immutable configuration snapshots, rebuilt into a fresh client on every change
//! - Batch sends split into chunks of ten with fail-fast partial counts
//! - Provider abstraction over the AWS SDK with an in-memory implementation
//! - Structured `tracing` records under the `sqs` target for every failure
//!
//! ## Module Organization
//!
//! - [`error`] - Error types for all operations
//! - [`message`] - Outbound message model and validation
//! - [`request`] - Provider request and response shapes
//! - [`config`] - Handler configuration and settings loading
//! - [`provider`] - Provider and factory traits
//! - [`providers`] - AWS SDK and in-memory providers
//! - [`handler`] - The [`SqsHandler`] façade
//!
//! ## Example
//!
//! ```no_run
//! use sqs_handler::{HandlerConfig, SqsHandler, SqsMessage};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut handler = SqsHandler::new(HandlerConfig::default())?;
//! handler.set_region("us-east-1")?;
//! handler.set_endpoint("https://sqs.us-east-1.amazonaws.com/123456789012/orders")?;
//!
//! let mut messages: Vec<SqsMessage> = (0..25)
//!     .map(|i| SqsMessage::new(format!("order {}", i)))
//!     .collect();
//! let sent = handler.send_message_batch(&mut messages).await;
//! assert_eq!(sent, Some(25));
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod handler;
pub mod message;
pub mod provider;
pub mod providers;
pub mod request;

pub use config::{Credentials, HandlerConfig, HandlerSettings, DEFAULT_API_VERSION};
pub use error::{ConfigurationError, SqsError, ValidationError, ValidationErrors};
pub use handler::{SendOperation, SqsHandler, LOG_TARGET};
pub use message::{MessageAttributeValue, OutboundMessage, SqsMessage, ValidationScenario};
pub use provider::{ProviderFactory, SqsProvider};
pub use providers::{AwsProviderFactory, AwsSqsProvider, InMemoryProvider};
pub use request::{
    BatchEntry, BatchFailure, BatchOutput, DeleteEntry, DeleteMessageBatchRequest,
    GetQueueAttributesRequest, Operation, ProviderResponse, ReceiveMessageRequest,
    ReceivedMessage, SendMessageBatchRequest, SendMessageOutput, SendMessageRequest,
    MAX_BATCH_SIZE,
};
