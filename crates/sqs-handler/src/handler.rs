//! SQS handler façade.
//!
//! [`SqsHandler`] owns one provider built from its current configuration
//! snapshot. Every setter derives a new snapshot and rebuilds the provider
//! before returning, so no operation ever observes a partially applied
//! configuration.
//!
//! Operations never return transport errors to the caller: failures are
//! logged under the `sqs` target and converted to `false`, an empty
//! collection, or a partial count. The `try_*` variants return the error
//! instead for callers that need to tell "nothing there" from "call failed".

use crate::config::{Credentials, HandlerConfig, HandlerSettings};
use crate::error::{ConfigurationError, SqsError};
use crate::message::{SqsMessage, ValidationScenario};
use crate::provider::{ProviderFactory, SqsProvider};
use crate::providers::AwsProviderFactory;
use crate::request::{
    BatchEntry, BatchOutput, DeleteMessageBatchRequest, GetQueueAttributesRequest, Operation,
    ReceiveMessageRequest, ReceivedMessage, SendMessageBatchRequest, SendMessageOutput,
    SendMessageRequest, APPROXIMATE_NUMBER_OF_MESSAGES, MAX_BATCH_SIZE,
};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn, Instrument};

#[cfg(test)]
#[path = "handler_tests.rs"]
mod tests;

/// Log target for every record emitted by the handler
pub const LOG_TARGET: &str = "sqs";

/// Selects how a single message is handed to the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOperation {
    /// Await the call and report its outcome
    Send,
    /// Spawn the call on the current runtime; failures are only logged
    SendAsync,
}

/// Configurable SQS façade
pub struct SqsHandler {
    config: HandlerConfig,
    factory: Arc<dyn ProviderFactory>,
    provider: Arc<dyn SqsProvider>,
}

impl SqsHandler {
    /// Create handler backed by the AWS SDK
    pub fn new(config: HandlerConfig) -> Result<Self, SqsError> {
        Self::with_factory(config, Arc::new(AwsProviderFactory))
    }

    /// Create handler whose providers come from `factory`
    pub fn with_factory(
        config: HandlerConfig,
        factory: Arc<dyn ProviderFactory>,
    ) -> Result<Self, SqsError> {
        config.validate()?;
        let provider = factory.create_provider(&config)?;
        Ok(Self {
            config,
            factory,
            provider,
        })
    }

    /// Create AWS-backed handler from loaded settings
    pub fn from_settings(settings: HandlerSettings) -> Result<Self, SqsError> {
        Self::new(HandlerConfig::try_from(settings)?)
    }

    /// Current configuration snapshot
    pub fn config(&self) -> &HandlerConfig {
        &self.config
    }

    // ------------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------------

    /// Set the default queue URL
    pub fn set_endpoint(&mut self, endpoint: impl Into<String>) -> Result<(), SqsError> {
        self.reconfigure(self.config.clone().with_endpoint(endpoint))
    }

    pub fn set_region(&mut self, region: impl Into<String>) -> Result<(), SqsError> {
        self.reconfigure(self.config.clone().with_region(region))
    }

    pub fn set_version(&mut self, version: impl Into<String>) -> Result<(), SqsError> {
        self.reconfigure(self.config.clone().with_version(version))
    }

    pub fn set_credentials(
        &mut self,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: Option<String>,
    ) -> Result<(), SqsError> {
        let credentials = Credentials::new(access_key_id, secret_access_key, session_token);
        self.reconfigure(self.config.clone().with_credentials(credentials))
    }

    pub fn set_timeout(&mut self, timeout: Duration) -> Result<(), SqsError> {
        self.reconfigure(self.config.clone().with_timeout(timeout))
    }

    /// Replace the configuration and rebuild the provider
    ///
    /// On failure the previous configuration and provider stay in place.
    pub fn reconfigure(&mut self, config: HandlerConfig) -> Result<(), SqsError> {
        config.validate()?;
        let provider = self.factory.create_provider(&config)?;

        debug!(
            target: LOG_TARGET,
            region = ?config.region,
            endpoint = ?config.endpoint,
            version = %config.version,
            "Rebuilt SQS client"
        );

        self.config = config;
        self.provider = provider;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Send
    // ------------------------------------------------------------------------

    /// Send message and wait for the outcome
    pub async fn send_message(&self, message: &mut SqsMessage) -> bool {
        self.send(message, SendOperation::Send).await
    }

    /// Send message without waiting for the outcome
    ///
    /// Returns `true` once the call has been dispatched.
    pub async fn send_message_async(&self, message: &mut SqsMessage) -> bool {
        self.send(message, SendOperation::SendAsync).await
    }

    /// Validate and send a single message
    ///
    /// A message without a queue URL is addressed to the configured endpoint.
    /// Validation errors stay readable on the message afterwards.
    #[instrument(skip_all, fields(operation = ?operation))]
    pub async fn send(&self, message: &mut SqsMessage, operation: SendOperation) -> bool {
        let request = match self.prepare_single(message) {
            Ok(request) => request,
            Err(e) => {
                warn!(
                    target: LOG_TARGET,
                    operation = %Operation::SendMessage,
                    errors = %e,
                    "Message failed validation"
                );
                return false;
            }
        };

        match operation {
            SendOperation::Send => match self.try_send(request).await {
                Ok(_) => true,
                Err(e) => {
                    log_failure(Operation::SendMessage, &e);
                    false
                }
            },
            SendOperation::SendAsync => {
                let provider = Arc::clone(&self.provider);
                spawn_detached(Operation::SendMessage, async move {
                    provider
                        .send_message(request)
                        .await?
                        .into_output(Operation::SendMessage)
                        .map(|_| ())
                })
            }
        }
    }

    /// Validate and send a single message, returning the outcome
    ///
    /// Fails with [`SqsError::Validation`] before any call is made when the
    /// message is invalid.
    #[instrument(skip_all)]
    pub async fn try_send_message(
        &self,
        message: &mut SqsMessage,
    ) -> Result<SendMessageOutput, SqsError> {
        let request = self.prepare_single(message)?;
        self.try_send(request).await
    }

    /// Send an already validated request, returning the provider outcome
    pub async fn try_send(&self, request: SendMessageRequest) -> Result<SendMessageOutput, SqsError> {
        self.provider
            .send_message(request)
            .await?
            .into_output(Operation::SendMessage)
    }

    /// Send messages to the configured endpoint in chunks of ten
    ///
    /// Every message is validated as a batch entry; invalid ones are logged
    /// and skipped, and their errors stay readable on the message. Chunks are
    /// sent in order and the first failed chunk stops the batch.
    ///
    /// Returns `None` when no endpoint is configured, otherwise the number of
    /// messages in chunks acknowledged before the first failure.
    #[instrument(skip_all, fields(messages = messages.len(), endpoint = ?self.config.endpoint))]
    pub async fn send_message_batch(&self, messages: &mut [SqsMessage]) -> Option<usize> {
        let operation = Operation::SendMessageBatch;

        let Some(queue_url) = self.config.endpoint.clone() else {
            let error = SqsError::from(ConfigurationError::Missing {
                key: "endpoint".to_string(),
            });
            log_failure(operation, &error);
            return None;
        };

        let mut entries = Vec::with_capacity(messages.len());
        for (index, message) in messages.iter_mut().enumerate() {
            message.set_scenario(ValidationScenario::Batch);
            if !message.validate() {
                warn!(
                    target: LOG_TARGET,
                    operation = %operation,
                    index,
                    errors = %message.errors(),
                    "Skipping message that failed validation"
                );
                continue;
            }

            entries.push(BatchEntry {
                id: batch_entry_id(),
                message: message.attributes(),
            });
        }

        if entries.is_empty() {
            return Some(0);
        }

        let mut sent = 0;
        for chunk in entries.chunks(MAX_BATCH_SIZE) {
            let request = SendMessageBatchRequest {
                queue_url: queue_url.clone(),
                entries: chunk.to_vec(),
            };

            match self.try_send_batch(request).await {
                Ok(output) => {
                    log_rejected_entries(operation, &output);
                    sent += chunk.len();
                }
                Err(e) => {
                    log_failure(operation, &e);
                    return Some(sent);
                }
            }
        }

        info!(target: LOG_TARGET, sent, queue_url = %queue_url, "Sent to SQS");
        Some(sent)
    }

    /// Send one batch request as-is
    pub async fn try_send_batch(
        &self,
        request: SendMessageBatchRequest,
    ) -> Result<BatchOutput, SqsError> {
        self.provider
            .send_message_batch(request)
            .await?
            .into_output(Operation::SendMessageBatch)
    }

    // ------------------------------------------------------------------------
    // Receive / Delete
    // ------------------------------------------------------------------------

    /// Receive messages; an empty result may also mean the call failed
    pub async fn receive_message(&self, request: ReceiveMessageRequest) -> Vec<ReceivedMessage> {
        self.try_receive_message(request)
            .await
            .unwrap_or_else(|e| {
                log_failure(Operation::ReceiveMessage, &e);
                Vec::new()
            })
    }

    #[instrument(skip_all)]
    pub async fn try_receive_message(
        &self,
        mut request: ReceiveMessageRequest,
    ) -> Result<Vec<ReceivedMessage>, SqsError> {
        request.queue_url = Some(self.resolve_queue_url(request.queue_url.take())?);
        self.provider
            .receive_message(request)
            .await?
            .into_output(Operation::ReceiveMessage)
    }

    /// Delete messages by receipt handle
    pub async fn delete_message_batch(&self, request: DeleteMessageBatchRequest) -> bool {
        match self.try_delete_message_batch(request).await {
            Ok(output) => {
                log_rejected_entries(Operation::DeleteMessageBatch, &output);
                true
            }
            Err(e) => {
                log_failure(Operation::DeleteMessageBatch, &e);
                false
            }
        }
    }

    /// Delete messages without waiting for the outcome
    ///
    /// Returns `true` once the call has been dispatched.
    pub fn delete_message_batch_async(&self, mut request: DeleteMessageBatchRequest) -> bool {
        let operation = Operation::DeleteMessageBatch;
        match self.resolve_queue_url(request.queue_url.take()) {
            Ok(queue_url) => request.queue_url = Some(queue_url),
            Err(e) => {
                log_failure(operation, &e);
                return false;
            }
        }

        let provider = Arc::clone(&self.provider);
        spawn_detached(operation, async move {
            let output = provider
                .delete_message_batch(request)
                .await?
                .into_output(operation)?;
            log_rejected_entries(operation, &output);
            Ok(())
        })
    }

    #[instrument(skip_all)]
    pub async fn try_delete_message_batch(
        &self,
        mut request: DeleteMessageBatchRequest,
    ) -> Result<BatchOutput, SqsError> {
        request.queue_url = Some(self.resolve_queue_url(request.queue_url.take())?);
        self.provider
            .delete_message_batch(request)
            .await?
            .into_output(Operation::DeleteMessageBatch)
    }

    // ------------------------------------------------------------------------
    // Queue Attributes
    // ------------------------------------------------------------------------

    /// Look up queue attributes; an empty result may also mean the call failed
    pub async fn get_queue_attributes(
        &self,
        request: GetQueueAttributesRequest,
    ) -> HashMap<String, String> {
        self.try_get_queue_attributes(request)
            .await
            .unwrap_or_else(|e| {
                log_failure(Operation::GetQueueAttributes, &e);
                HashMap::new()
            })
    }

    #[instrument(skip_all)]
    pub async fn try_get_queue_attributes(
        &self,
        mut request: GetQueueAttributesRequest,
    ) -> Result<HashMap<String, String>, SqsError> {
        request.queue_url = Some(self.resolve_queue_url(request.queue_url.take())?);
        self.provider
            .get_queue_attributes(request)
            .await?
            .into_output(Operation::GetQueueAttributes)
    }

    /// Approximate number of visible messages in the configured queue
    ///
    /// Returns 0 when the attribute is missing or the lookup failed.
    pub async fn get_total_messages_amount(&self) -> u64 {
        let attributes = self
            .get_queue_attributes(GetQueueAttributesRequest::new([
                APPROXIMATE_NUMBER_OF_MESSAGES,
            ]))
            .await;

        match attributes.get(APPROXIMATE_NUMBER_OF_MESSAGES) {
            Some(value) => value.parse().unwrap_or_else(|e| {
                warn!(
                    target: LOG_TARGET,
                    value = %value,
                    error = %e,
                    "Unparseable message count"
                );
                0
            }),
            None => 0,
        }
    }

    /// Address a single message and validate it
    ///
    /// A message without a queue URL is addressed to the configured endpoint.
    fn prepare_single(&self, message: &mut SqsMessage) -> Result<SendMessageRequest, SqsError> {
        if message.queue_url.is_empty() {
            if let Some(ref endpoint) = self.config.endpoint {
                message.queue_url = endpoint.clone();
            }
        }

        message.set_scenario(ValidationScenario::Single);
        if !message.validate() {
            return Err(SqsError::Validation(message.errors().clone()));
        }

        Ok(SendMessageRequest {
            queue_url: message.queue_url.clone(),
            message: message.attributes(),
        })
    }

    fn resolve_queue_url(&self, explicit: Option<String>) -> Result<String, SqsError> {
        explicit
            .filter(|url| !url.is_empty())
            .or_else(|| self.config.endpoint.clone())
            .ok_or_else(|| {
                ConfigurationError::Missing {
                    key: "endpoint".to_string(),
                }
                .into()
            })
    }
}

impl fmt::Debug for SqsHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqsHandler")
            .field("config", &self.config)
            .finish()
    }
}

/// Request-local ID for a batch entry
fn batch_entry_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

fn log_failure(operation: Operation, error: &SqsError) {
    error!(
        target: LOG_TARGET,
        operation = %operation,
        code = error.code(),
        status = ?error.status(),
        error = %error,
        details = ?error,
        "SQS operation failed"
    );
}

fn log_rejected_entries(operation: Operation, output: &BatchOutput) {
    for failure in &output.failed {
        warn!(
            target: LOG_TARGET,
            operation = %operation,
            id = %failure.id,
            code = %failure.code,
            reason = ?failure.message,
            sender_fault = failure.sender_fault,
            "Batch entry rejected"
        );
    }
}

/// Run `call` on the current runtime without waiting for it
fn spawn_detached<F>(operation: Operation, call: F) -> bool
where
    F: Future<Output = Result<(), SqsError>> + Send + 'static,
{
    match tokio::runtime::Handle::try_current() {
        Ok(runtime) => {
            runtime.spawn(
                async move {
                    if let Err(e) = call.await {
                        log_failure(operation, &e);
                    }
                }
                .in_current_span(),
            );
            true
        }
        Err(e) => {
            error!(
                target: LOG_TARGET,
                operation = %operation,
                error = %e,
                "No async runtime available for fire-and-forget call"
            );
            false
        }
    }
}
