//! Request and response shapes exchanged with an [`SqsProvider`](crate::provider::SqsProvider).
//!
//! These types follow the SQS API shapes (queue URL, batch entries with
//! local IDs, attribute name lists) without exposing any SDK types.

use crate::error::SqsError;
use crate::message::{MessageAttributeValue, OutboundMessage};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fmt;

/// Maximum number of entries in a single SQS batch request
pub const MAX_BATCH_SIZE: usize = 10;

/// Queue attribute holding the approximate number of visible messages
pub const APPROXIMATE_NUMBER_OF_MESSAGES: &str = "ApproximateNumberOfMessages";

/// HTTP status code SQS returns for a successful call
pub const HTTP_OK: u16 = 200;

// ============================================================================
// Operations
// ============================================================================

/// SQS API operations used by the handler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    SendMessage,
    SendMessageBatch,
    ReceiveMessage,
    DeleteMessageBatch,
    GetQueueAttributes,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SendMessage => "SendMessage",
            Self::SendMessageBatch => "SendMessageBatch",
            Self::ReceiveMessage => "ReceiveMessage",
            Self::DeleteMessageBatch => "DeleteMessageBatch",
            Self::GetQueueAttributes => "GetQueueAttributes",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Response Envelope
// ============================================================================

/// Provider output together with the HTTP status of the call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderResponse<T> {
    pub status: u16,
    pub output: T,
}

impl<T> ProviderResponse<T> {
    /// Wrap output of a call that completed with HTTP 200
    pub fn ok(output: T) -> Self {
        Self {
            status: HTTP_OK,
            output,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == HTTP_OK
    }

    /// Unwrap the output, treating any status other than 200 as a failure
    pub fn into_output(self, operation: Operation) -> Result<T, SqsError> {
        if self.is_success() {
            Ok(self.output)
        } else {
            Err(SqsError::UnexpectedStatus {
                operation,
                status: self.status,
            })
        }
    }
}

// ============================================================================
// Send
// ============================================================================

/// Single message send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendMessageRequest {
    pub queue_url: String,
    pub message: OutboundMessage,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendMessageOutput {
    pub message_id: Option<String>,
}

/// One message inside a batch send, tagged with a request-local ID
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchEntry {
    pub id: String,
    pub message: OutboundMessage,
}

/// Batch send to a single queue; at most [`MAX_BATCH_SIZE`] entries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendMessageBatchRequest {
    pub queue_url: String,
    pub entries: Vec<BatchEntry>,
}

/// Per-entry failure inside an acknowledged batch call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFailure {
    pub id: String,
    pub code: String,
    pub message: Option<String>,
    pub sender_fault: bool,
}

/// Per-entry outcome of a batch send or batch delete
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutput {
    pub successful: Vec<String>,
    pub failed: Vec<BatchFailure>,
}

// ============================================================================
// Receive
// ============================================================================

/// Receive request; `queue_url` falls back to the handler endpoint when unset
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReceiveMessageRequest {
    pub queue_url: Option<String>,
    pub max_number_of_messages: Option<i32>,
    pub visibility_timeout: Option<i32>,
    pub wait_time_seconds: Option<i32>,
    /// System attributes to return, e.g. `ApproximateReceiveCount` or `All`
    pub attribute_names: Vec<String>,
    /// Message attributes to return, e.g. `All`
    pub message_attribute_names: Vec<String>,
}

impl ReceiveMessageRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_queue_url(mut self, queue_url: impl Into<String>) -> Self {
        self.queue_url = Some(queue_url.into());
        self
    }

    pub fn with_max_number_of_messages(mut self, max: i32) -> Self {
        self.max_number_of_messages = Some(max);
        self
    }

    pub fn with_visibility_timeout(mut self, seconds: i32) -> Self {
        self.visibility_timeout = Some(seconds);
        self
    }

    pub fn with_wait_time_seconds(mut self, seconds: i32) -> Self {
        self.wait_time_seconds = Some(seconds);
        self
    }

    pub fn with_attribute_name(mut self, name: impl Into<String>) -> Self {
        self.attribute_names.push(name.into());
        self
    }

    pub fn with_message_attribute_name(mut self, name: impl Into<String>) -> Self {
        self.message_attribute_names.push(name.into());
        self
    }
}

/// Message returned by a receive call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReceivedMessage {
    pub message_id: Option<String>,
    pub receipt_handle: Option<String>,
    pub body: Option<String>,
    pub attributes: HashMap<String, String>,
    pub message_attributes: HashMap<String, MessageAttributeValue>,
}

impl ReceivedMessage {
    /// Parse the body as JSON
    pub fn deserialize_body<T: DeserializeOwned>(&self) -> Result<T, SqsError> {
        let body = self.body.as_deref().unwrap_or_default();
        Ok(serde_json::from_str(body)?)
    }
}

// ============================================================================
// Delete
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteEntry {
    pub id: String,
    pub receipt_handle: String,
}

/// Batch delete; `queue_url` falls back to the handler endpoint when unset
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteMessageBatchRequest {
    pub queue_url: Option<String>,
    pub entries: Vec<DeleteEntry>,
}

impl DeleteMessageBatchRequest {
    /// Build delete entries for every received message carrying a receipt handle
    ///
    /// Entry IDs are the message's position in `messages`.
    pub fn from_received(messages: &[ReceivedMessage]) -> Self {
        let entries = messages
            .iter()
            .enumerate()
            .filter_map(|(index, message)| {
                message.receipt_handle.as_ref().map(|handle| DeleteEntry {
                    id: index.to_string(),
                    receipt_handle: handle.clone(),
                })
            })
            .collect();

        Self {
            queue_url: None,
            entries,
        }
    }

    pub fn with_queue_url(mut self, queue_url: impl Into<String>) -> Self {
        self.queue_url = Some(queue_url.into());
        self
    }
}

// ============================================================================
// Queue Attributes
// ============================================================================

/// Queue attribute lookup; `queue_url` falls back to the handler endpoint when unset
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetQueueAttributesRequest {
    pub queue_url: Option<String>,
    pub attribute_names: Vec<String>,
}

impl GetQueueAttributesRequest {
    pub fn new<I, S>(attribute_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            queue_url: None,
            attribute_names: attribute_names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn with_queue_url(mut self, queue_url: impl Into<String>) -> Self {
        self.queue_url = Some(queue_url.into());
        self
    }
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
