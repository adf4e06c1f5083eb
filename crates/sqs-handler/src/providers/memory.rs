//! In-memory SQS provider for testing and development.
//!
//! This module provides a process-local stand-in for SQS that:
//! - Stores messages per queue URL, creating queues on first send
//! - Honors per-message delays and receive visibility timeouts
//! - Issues receipt handles and deletes by them
//! - Enforces SQS batch rules (non-empty, at most ten entries, distinct IDs)
//! - Reports the `ApproximateNumberOfMessages*` queue attributes
//!
//! Long polling is not simulated; `wait_time_seconds` is accepted and ignored.

use crate::config::HandlerConfig;
use crate::error::SqsError;
use crate::message::OutboundMessage;
use crate::provider::{ProviderFactory, SqsProvider};
use crate::request::{
    BatchFailure, BatchOutput, DeleteMessageBatchRequest, GetQueueAttributesRequest, Operation,
    ProviderResponse, ReceiveMessageRequest, ReceivedMessage, SendMessageBatchRequest,
    SendMessageOutput, SendMessageRequest, APPROXIMATE_NUMBER_OF_MESSAGES, MAX_BATCH_SIZE,
};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;

/// Visibility timeout applied when a receive request does not set one
const DEFAULT_VISIBILITY_TIMEOUT: Duration = Duration::from_secs(30);

const APPROXIMATE_NUMBER_OF_MESSAGES_NOT_VISIBLE: &str = "ApproximateNumberOfMessagesNotVisible";
const APPROXIMATE_NUMBER_OF_MESSAGES_DELAYED: &str = "ApproximateNumberOfMessagesDelayed";
const APPROXIMATE_RECEIVE_COUNT: &str = "ApproximateReceiveCount";
const ALL_ATTRIBUTES: &str = "All";

// ============================================================================
// Internal Storage Structures
// ============================================================================

/// A message stored in the queue with metadata
#[derive(Clone)]
struct StoredMessage {
    message_id: String,
    message: OutboundMessage,
    available_at: Instant,
    receive_count: u32,
}

/// A received message waiting for deletion or visibility expiry
struct InFlightMessage {
    stored: StoredMessage,
    visible_again_at: Instant,
}

/// Internal queue state for a single queue
#[derive(Default)]
struct InMemoryQueue {
    messages: VecDeque<StoredMessage>,
    in_flight: HashMap<String, InFlightMessage>,
}

impl InMemoryQueue {
    /// Return in-flight messages whose visibility timeout has passed
    fn release_expired(&mut self, now: Instant) {
        let expired: Vec<String> = self
            .in_flight
            .iter()
            .filter(|(_, m)| now >= m.visible_again_at)
            .map(|(handle, _)| handle.clone())
            .collect();

        for handle in expired {
            if let Some(in_flight) = self.in_flight.remove(&handle) {
                self.messages.push_back(in_flight.stored);
            }
        }
    }

    fn visible_count(&self, now: Instant) -> usize {
        self.messages.iter().filter(|m| now >= m.available_at).count()
    }

    fn delayed_count(&self, now: Instant) -> usize {
        self.messages.len() - self.visible_count(now)
    }
}

type QueueStorage = HashMap<String, InMemoryQueue>;

fn service_error(operation: Operation, code: &str, message: impl Into<String>) -> SqsError {
    SqsError::Service {
        operation,
        code: code.to_string(),
        message: message.into(),
        status: Some(400),
    }
}

fn lock_poisoned(operation: Operation) -> SqsError {
    SqsError::Transport {
        operation,
        message: "in-memory queue storage lock poisoned".to_string(),
    }
}

fn require_queue_url(operation: Operation, queue_url: Option<String>) -> Result<String, SqsError> {
    queue_url
        .filter(|url| !url.is_empty())
        .ok_or_else(|| service_error(operation, "MissingParameter", "QueueUrl is required"))
}

fn check_batch_ids<'a>(
    operation: Operation,
    ids: impl ExactSizeIterator<Item = &'a str>,
) -> Result<(), SqsError> {
    if ids.len() == 0 {
        return Err(service_error(
            operation,
            "AWS.SimpleQueueService.EmptyBatchRequest",
            "There should be at least one entry in the request",
        ));
    }
    if ids.len() > MAX_BATCH_SIZE {
        return Err(service_error(
            operation,
            "AWS.SimpleQueueService.TooManyEntriesInBatchRequest",
            format!("Maximum number of entries per request are {}", MAX_BATCH_SIZE),
        ));
    }

    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(service_error(
                operation,
                "AWS.SimpleQueueService.BatchEntryIdsNotDistinct",
                format!("Id {} repeated", id),
            ));
        }
    }
    Ok(())
}

fn wants(names: &[String], name: &str) -> bool {
    names.iter().any(|n| n == ALL_ATTRIBUTES || n == name)
}

// ============================================================================
// InMemoryProvider
// ============================================================================

/// In-memory SQS provider
///
/// Clones share the same storage, so a provider handed out by
/// [`ProviderFactory::create_provider`] keeps its messages across handler
/// reconfiguration.
#[derive(Clone, Default)]
pub struct InMemoryProvider {
    storage: Arc<RwLock<QueueStorage>>,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty queue so it can be received from before the first send
    pub fn create_queue(&self, queue_url: impl Into<String>) {
        if let Ok(mut storage) = self.storage.write() {
            storage.entry(queue_url.into()).or_default();
        }
    }

    /// Number of messages stored for a queue, visible or not
    pub fn message_count(&self, queue_url: &str) -> usize {
        self.storage
            .read()
            .ok()
            .and_then(|storage| {
                storage
                    .get(queue_url)
                    .map(|q| q.messages.len() + q.in_flight.len())
            })
            .unwrap_or(0)
    }

    fn store(
        &self,
        operation: Operation,
        queue_url: String,
        messages: Vec<StoredMessage>,
    ) -> Result<(), SqsError> {
        let mut storage = self.storage.write().map_err(|_| lock_poisoned(operation))?;
        storage.entry(queue_url).or_default().messages.extend(messages);
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let queues = self.storage.read().map(|s| s.len()).unwrap_or(0);
        f.debug_struct("InMemoryProvider")
            .field("queues", &queues)
            .finish()
    }
}

fn stored(message: OutboundMessage, now: Instant) -> StoredMessage {
    let delay = Duration::from_secs(u64::from(message.delay_seconds.unwrap_or(0)));
    StoredMessage {
        message_id: uuid::Uuid::new_v4().to_string(),
        message,
        available_at: now + delay,
        receive_count: 0,
    }
}

#[async_trait]
impl SqsProvider for InMemoryProvider {
    async fn send_message(
        &self,
        request: SendMessageRequest,
    ) -> Result<ProviderResponse<SendMessageOutput>, SqsError> {
        let operation = Operation::SendMessage;
        let queue_url = require_queue_url(operation, Some(request.queue_url))?;

        let message = stored(request.message, Instant::now());
        let message_id = message.message_id.clone();
        self.store(operation, queue_url, vec![message])?;

        Ok(ProviderResponse::ok(SendMessageOutput {
            message_id: Some(message_id),
        }))
    }

    async fn send_message_batch(
        &self,
        request: SendMessageBatchRequest,
    ) -> Result<ProviderResponse<BatchOutput>, SqsError> {
        let operation = Operation::SendMessageBatch;
        let queue_url = require_queue_url(operation, Some(request.queue_url))?;
        check_batch_ids(operation, request.entries.iter().map(|e| e.id.as_str()))?;

        let now = Instant::now();
        let successful = request.entries.iter().map(|e| e.id.clone()).collect();
        let messages = request
            .entries
            .into_iter()
            .map(|entry| stored(entry.message, now))
            .collect();
        self.store(operation, queue_url, messages)?;

        Ok(ProviderResponse::ok(BatchOutput {
            successful,
            failed: Vec::new(),
        }))
    }

    async fn receive_message(
        &self,
        request: ReceiveMessageRequest,
    ) -> Result<ProviderResponse<Vec<ReceivedMessage>>, SqsError> {
        let operation = Operation::ReceiveMessage;
        let queue_url = require_queue_url(operation, request.queue_url.clone())?;

        let max = request.max_number_of_messages.unwrap_or(1);
        if !(1..=MAX_BATCH_SIZE as i32).contains(&max) {
            return Err(service_error(
                operation,
                "InvalidParameterValue",
                format!("MaxNumberOfMessages must be between 1 and {}", MAX_BATCH_SIZE),
            ));
        }
        let visibility = request
            .visibility_timeout
            .map(|s| Duration::from_secs(u64::try_from(s).unwrap_or(0)))
            .unwrap_or(DEFAULT_VISIBILITY_TIMEOUT);

        let mut storage = self.storage.write().map_err(|_| lock_poisoned(operation))?;
        let queue = storage.get_mut(&queue_url).ok_or_else(|| {
            service_error(
                operation,
                "AWS.SimpleQueueService.NonExistentQueue",
                "The specified queue does not exist",
            )
        })?;

        let now = Instant::now();
        queue.release_expired(now);

        let mut received = Vec::new();
        let mut remaining = VecDeque::with_capacity(queue.messages.len());
        while let Some(mut message) = queue.messages.pop_front() {
            if received.len() >= max as usize || now < message.available_at {
                remaining.push_back(message);
                continue;
            }

            message.receive_count += 1;
            let receipt_handle = uuid::Uuid::new_v4().to_string();
            received.push(to_received(&message, &receipt_handle, &request));
            queue.in_flight.insert(
                receipt_handle,
                InFlightMessage {
                    stored: message,
                    visible_again_at: now + visibility,
                },
            );
        }
        queue.messages = remaining;

        Ok(ProviderResponse::ok(received))
    }

    async fn delete_message_batch(
        &self,
        request: DeleteMessageBatchRequest,
    ) -> Result<ProviderResponse<BatchOutput>, SqsError> {
        let operation = Operation::DeleteMessageBatch;
        let queue_url = require_queue_url(operation, request.queue_url)?;
        check_batch_ids(operation, request.entries.iter().map(|e| e.id.as_str()))?;

        let mut storage = self.storage.write().map_err(|_| lock_poisoned(operation))?;
        let queue = storage.get_mut(&queue_url).ok_or_else(|| {
            service_error(
                operation,
                "AWS.SimpleQueueService.NonExistentQueue",
                "The specified queue does not exist",
            )
        })?;

        let mut output = BatchOutput::default();
        for entry in request.entries {
            if queue.in_flight.remove(&entry.receipt_handle).is_some() {
                output.successful.push(entry.id);
            } else {
                output.failed.push(BatchFailure {
                    id: entry.id,
                    code: "ReceiptHandleIsInvalid".to_string(),
                    message: Some("The receipt handle is not valid".to_string()),
                    sender_fault: true,
                });
            }
        }

        Ok(ProviderResponse::ok(output))
    }

    async fn get_queue_attributes(
        &self,
        request: GetQueueAttributesRequest,
    ) -> Result<ProviderResponse<HashMap<String, String>>, SqsError> {
        let operation = Operation::GetQueueAttributes;
        let queue_url = require_queue_url(operation, request.queue_url)?;

        let mut storage = self.storage.write().map_err(|_| lock_poisoned(operation))?;
        let queue = storage.get_mut(&queue_url).ok_or_else(|| {
            service_error(
                operation,
                "AWS.SimpleQueueService.NonExistentQueue",
                "The specified queue does not exist",
            )
        })?;

        let now = Instant::now();
        queue.release_expired(now);

        let counts = [
            (APPROXIMATE_NUMBER_OF_MESSAGES, queue.visible_count(now)),
            (APPROXIMATE_NUMBER_OF_MESSAGES_NOT_VISIBLE, queue.in_flight.len()),
            (APPROXIMATE_NUMBER_OF_MESSAGES_DELAYED, queue.delayed_count(now)),
        ];

        let attributes = counts
            .into_iter()
            .filter(|(name, _)| wants(&request.attribute_names, name))
            .map(|(name, count)| (name.to_string(), count.to_string()))
            .collect();

        Ok(ProviderResponse::ok(attributes))
    }
}

fn to_received(
    message: &StoredMessage,
    receipt_handle: &str,
    request: &ReceiveMessageRequest,
) -> ReceivedMessage {
    let mut attributes = HashMap::new();
    if wants(&request.attribute_names, APPROXIMATE_RECEIVE_COUNT) {
        attributes.insert(
            APPROXIMATE_RECEIVE_COUNT.to_string(),
            message.receive_count.to_string(),
        );
    }
    if let Some(ref group_id) = message.message.group_id {
        if wants(&request.attribute_names, "MessageGroupId") {
            attributes.insert("MessageGroupId".to_string(), group_id.clone());
        }
    }
    if let Some(ref dedup_id) = message.message.deduplication_id {
        if wants(&request.attribute_names, "MessageDeduplicationId") {
            attributes.insert("MessageDeduplicationId".to_string(), dedup_id.clone());
        }
    }

    let message_attributes = message
        .message
        .message_attributes
        .iter()
        .filter(|(name, _)| wants(&request.message_attribute_names, name))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();

    ReceivedMessage {
        message_id: Some(message.message_id.clone()),
        receipt_handle: Some(receipt_handle.to_string()),
        body: Some(message.message.message_body.clone()),
        attributes,
        message_attributes,
    }
}

impl ProviderFactory for InMemoryProvider {
    fn create_provider(&self, config: &HandlerConfig) -> Result<Arc<dyn SqsProvider>, SqsError> {
        config.validate()?;
        Ok(Arc::new(self.clone()))
    }
}
