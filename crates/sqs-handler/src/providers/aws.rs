//! AWS SQS provider backed by the official AWS SDK.
//!
//! The SDK owns transport, request signing, retries and wire encoding. This
//! module only converts between the handler's request shapes and the SDK
//! builders, and maps SDK errors into [`SqsError`] so that no SDK type
//! leaves the module.
//!
//! ## Client construction
//!
//! A client is built synchronously from a [`HandlerConfig`] snapshot:
//!
//! - **Region**: taken from the configuration when set
//! - **Credentials**: static key/secret/token, or environment variables when none are configured
//! - **Endpoint**: the origin of the configured queue URL, so queue URLs pointing at
//!   LocalStack or another SQS-compatible service reach that service
//! - **Timeout**: applied as the SDK operation timeout

use crate::config::{HandlerConfig, DEFAULT_API_VERSION};
use crate::error::{ConfigurationError, SqsError};
use crate::message::{MessageAttributeValue, OutboundMessage};
use crate::provider::{ProviderFactory, SqsProvider};
use crate::request::{
    BatchFailure, BatchOutput, DeleteMessageBatchRequest, GetQueueAttributesRequest, Operation,
    ProviderResponse, ReceiveMessageRequest, ReceivedMessage, SendMessageBatchRequest,
    SendMessageOutput, SendMessageRequest,
};
use async_trait::async_trait;
use aws_config::environment::EnvironmentVariableCredentialsProvider;
use aws_sdk_sqs::config::timeout::TimeoutConfig;
use aws_sdk_sqs::config::{BehaviorVersion, Region};
use aws_sdk_sqs::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_sqs::primitives::Blob;
use aws_sdk_sqs::types as sdk;
use bytes::Bytes;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use url::Url;

#[cfg(test)]
#[path = "aws_tests.rs"]
mod tests;

/// Name reported by static credentials built from the handler configuration
const CREDENTIALS_PROVIDER_NAME: &str = "sqs-handler";

// ============================================================================
// Client Configuration
// ============================================================================

/// Build the SDK client configuration for a handler configuration snapshot
pub fn sdk_config(config: &HandlerConfig) -> aws_sdk_sqs::Config {
    let mut builder =
        aws_sdk_sqs::config::Builder::new().behavior_version(BehaviorVersion::latest());

    if let Some(ref region) = config.region {
        builder = builder.region(Region::new(region.clone()));
    }

    builder = match config.credentials {
        Some(ref credentials) => builder.credentials_provider(aws_sdk_sqs::config::Credentials::new(
            credentials.access_key_id(),
            credentials.secret_access_key(),
            credentials.session_token().map(str::to_owned),
            None,
            CREDENTIALS_PROVIDER_NAME,
        )),
        None => builder.credentials_provider(EnvironmentVariableCredentialsProvider::new()),
    };

    if let Some(endpoint_url) = config.endpoint.as_deref().and_then(service_endpoint) {
        builder = builder.endpoint_url(endpoint_url);
    }

    if let Some(timeout) = config.timeout {
        builder = builder.timeout_config(TimeoutConfig::builder().operation_timeout(timeout).build());
    }

    builder.build()
}

/// Service endpoint for a queue URL: its scheme, host and port
///
/// Returns `None` when the value is not an absolute HTTP(S) URL, leaving
/// endpoint resolution to the SDK.
pub fn service_endpoint(queue_url: &str) -> Option<String> {
    let url = Url::parse(queue_url).ok()?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return None;
    }
    Some(url.origin().ascii_serialization())
}

// ============================================================================
// AWS SQS Provider
// ============================================================================

/// AWS SQS provider implementation
///
/// Wraps one `aws_sdk_sqs::Client`. The client is cheap to clone and safe to
/// share across tasks.
#[derive(Clone)]
pub struct AwsSqsProvider {
    client: aws_sdk_sqs::Client,
}

impl AwsSqsProvider {
    /// Create provider for a configuration snapshot
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the snapshot is invalid or names an
    /// API version the SDK does not speak.
    pub fn new(config: &HandlerConfig) -> Result<Self, SqsError> {
        config.validate()?;
        if config.version != DEFAULT_API_VERSION {
            return Err(ConfigurationError::Invalid {
                message: format!(
                    "unsupported SQS API version '{}' (supported: {})",
                    config.version, DEFAULT_API_VERSION
                ),
            }
            .into());
        }

        Ok(Self::from_client(aws_sdk_sqs::Client::from_conf(sdk_config(
            config,
        ))))
    }

    /// Wrap an existing SDK client
    pub fn from_client(client: aws_sdk_sqs::Client) -> Self {
        Self { client }
    }
}

impl fmt::Debug for AwsSqsProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsSqsProvider")
            .field("region", &self.client.config().region())
            .finish()
    }
}

#[async_trait]
impl SqsProvider for AwsSqsProvider {
    async fn send_message(
        &self,
        request: SendMessageRequest,
    ) -> Result<ProviderResponse<SendMessageOutput>, SqsError> {
        let operation = Operation::SendMessage;
        let message = request.message;

        let output = self
            .client
            .send_message()
            .queue_url(request.queue_url)
            .set_delay_seconds(delay_to_sdk(message.delay_seconds))
            .set_message_attributes(to_sdk_attributes(operation, message.message_attributes)?)
            .set_message_deduplication_id(message.deduplication_id)
            .set_message_group_id(message.group_id)
            .message_body(message.message_body)
            .send()
            .await
            .map_err(|e| map_sdk_error(operation, e))?;

        Ok(ProviderResponse::ok(SendMessageOutput {
            message_id: output.message_id().map(str::to_owned),
        }))
    }

    async fn send_message_batch(
        &self,
        request: SendMessageBatchRequest,
    ) -> Result<ProviderResponse<BatchOutput>, SqsError> {
        let operation = Operation::SendMessageBatch;

        let entries = request
            .entries
            .into_iter()
            .map(|entry| to_sdk_batch_entry(operation, entry.id, entry.message))
            .collect::<Result<Vec<_>, _>>()?;

        let output = self
            .client
            .send_message_batch()
            .queue_url(request.queue_url)
            .set_entries(Some(entries))
            .send()
            .await
            .map_err(|e| map_sdk_error(operation, e))?;

        Ok(ProviderResponse::ok(BatchOutput {
            successful: output
                .successful()
                .iter()
                .map(|entry| entry.id().to_owned())
                .collect(),
            failed: output.failed().iter().map(from_sdk_failure).collect(),
        }))
    }

    async fn receive_message(
        &self,
        request: ReceiveMessageRequest,
    ) -> Result<ProviderResponse<Vec<ReceivedMessage>>, SqsError> {
        let operation = Operation::ReceiveMessage;

        let system_attributes = request
            .attribute_names
            .iter()
            .map(|name| sdk::MessageSystemAttributeName::from(name.as_str()))
            .collect::<Vec<_>>();

        let output = self
            .client
            .receive_message()
            .set_queue_url(request.queue_url)
            .set_max_number_of_messages(request.max_number_of_messages)
            .set_visibility_timeout(request.visibility_timeout)
            .set_wait_time_seconds(request.wait_time_seconds)
            .set_message_system_attribute_names(non_empty(system_attributes))
            .set_message_attribute_names(non_empty(request.message_attribute_names))
            .send()
            .await
            .map_err(|e| map_sdk_error(operation, e))?;

        Ok(ProviderResponse::ok(
            output.messages().iter().map(from_sdk_message).collect(),
        ))
    }

    async fn delete_message_batch(
        &self,
        request: DeleteMessageBatchRequest,
    ) -> Result<ProviderResponse<BatchOutput>, SqsError> {
        let operation = Operation::DeleteMessageBatch;

        let entries = request
            .entries
            .into_iter()
            .map(|entry| {
                sdk::DeleteMessageBatchRequestEntry::builder()
                    .id(entry.id)
                    .receipt_handle(entry.receipt_handle)
                    .build()
                    .map_err(|e| invalid_request(operation, e))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let output = self
            .client
            .delete_message_batch()
            .set_queue_url(request.queue_url)
            .set_entries(Some(entries))
            .send()
            .await
            .map_err(|e| map_sdk_error(operation, e))?;

        Ok(ProviderResponse::ok(BatchOutput {
            successful: output
                .successful()
                .iter()
                .map(|entry| entry.id().to_owned())
                .collect(),
            failed: output.failed().iter().map(from_sdk_failure).collect(),
        }))
    }

    async fn get_queue_attributes(
        &self,
        request: GetQueueAttributesRequest,
    ) -> Result<ProviderResponse<HashMap<String, String>>, SqsError> {
        let operation = Operation::GetQueueAttributes;

        let names = request
            .attribute_names
            .iter()
            .map(|name| sdk::QueueAttributeName::from(name.as_str()))
            .collect::<Vec<_>>();

        let output = self
            .client
            .get_queue_attributes()
            .set_queue_url(request.queue_url)
            .set_attribute_names(non_empty(names))
            .send()
            .await
            .map_err(|e| map_sdk_error(operation, e))?;

        let attributes = output
            .attributes()
            .map(|attributes| {
                attributes
                    .iter()
                    .map(|(name, value)| (name.as_str().to_owned(), value.clone()))
                    .collect()
            })
            .unwrap_or_default();

        Ok(ProviderResponse::ok(attributes))
    }
}

/// Factory producing [`AwsSqsProvider`] instances
#[derive(Debug, Clone, Copy, Default)]
pub struct AwsProviderFactory;

impl ProviderFactory for AwsProviderFactory {
    fn create_provider(&self, config: &HandlerConfig) -> Result<Arc<dyn SqsProvider>, SqsError> {
        Ok(Arc::new(AwsSqsProvider::new(config)?))
    }
}

// ============================================================================
// Conversions
// ============================================================================

fn non_empty<T>(values: Vec<T>) -> Option<Vec<T>> {
    if values.is_empty() {
        None
    } else {
        Some(values)
    }
}

fn delay_to_sdk(delay_seconds: Option<u32>) -> Option<i32> {
    delay_seconds.map(|d| i32::try_from(d).unwrap_or(i32::MAX))
}

fn invalid_request(operation: Operation, error: aws_sdk_sqs::error::BuildError) -> SqsError {
    SqsError::InvalidRequest {
        operation,
        message: error.to_string(),
    }
}

fn to_sdk_attribute(
    operation: Operation,
    value: MessageAttributeValue,
) -> Result<sdk::MessageAttributeValue, SqsError> {
    let binary_list = value
        .binary_list_values
        .iter()
        .map(|b| Blob::new(b.to_vec()))
        .collect();

    sdk::MessageAttributeValue::builder()
        .data_type(value.data_type)
        .set_string_value(value.string_value)
        .set_binary_value(value.binary_value.map(|b| Blob::new(b.to_vec())))
        .set_string_list_values(non_empty(value.string_list_values))
        .set_binary_list_values(non_empty(binary_list))
        .build()
        .map_err(|e| invalid_request(operation, e))
}

fn to_sdk_attributes(
    operation: Operation,
    attributes: HashMap<String, MessageAttributeValue>,
) -> Result<Option<HashMap<String, sdk::MessageAttributeValue>>, SqsError> {
    if attributes.is_empty() {
        return Ok(None);
    }

    attributes
        .into_iter()
        .map(|(name, value)| Ok((name, to_sdk_attribute(operation, value)?)))
        .collect::<Result<HashMap<_, _>, SqsError>>()
        .map(Some)
}

fn to_sdk_batch_entry(
    operation: Operation,
    id: String,
    message: OutboundMessage,
) -> Result<sdk::SendMessageBatchRequestEntry, SqsError> {
    sdk::SendMessageBatchRequestEntry::builder()
        .id(id)
        .set_delay_seconds(delay_to_sdk(message.delay_seconds))
        .set_message_attributes(to_sdk_attributes(operation, message.message_attributes)?)
        .set_message_deduplication_id(message.deduplication_id)
        .set_message_group_id(message.group_id)
        .message_body(message.message_body)
        .build()
        .map_err(|e| invalid_request(operation, e))
}

fn from_sdk_attribute(value: &sdk::MessageAttributeValue) -> MessageAttributeValue {
    MessageAttributeValue {
        data_type: value.data_type().to_owned(),
        string_value: value.string_value().map(str::to_owned),
        binary_value: value
            .binary_value()
            .map(|b| Bytes::copy_from_slice(b.as_ref())),
        string_list_values: value.string_list_values().to_vec(),
        binary_list_values: value
            .binary_list_values()
            .iter()
            .map(|b| Bytes::copy_from_slice(b.as_ref()))
            .collect(),
    }
}

fn from_sdk_message(message: &sdk::Message) -> ReceivedMessage {
    ReceivedMessage {
        message_id: message.message_id().map(str::to_owned),
        receipt_handle: message.receipt_handle().map(str::to_owned),
        body: message.body().map(str::to_owned),
        attributes: message
            .attributes()
            .map(|attributes| {
                attributes
                    .iter()
                    .map(|(name, value)| (name.as_str().to_owned(), value.clone()))
                    .collect()
            })
            .unwrap_or_default(),
        message_attributes: message
            .message_attributes()
            .map(|attributes| {
                attributes
                    .iter()
                    .map(|(name, value)| (name.clone(), from_sdk_attribute(value)))
                    .collect()
            })
            .unwrap_or_default(),
    }
}

fn from_sdk_failure(entry: &sdk::BatchResultErrorEntry) -> BatchFailure {
    BatchFailure {
        id: entry.id().to_owned(),
        code: entry.code().to_owned(),
        message: entry.message().map(str::to_owned),
        sender_fault: entry.sender_fault(),
    }
}

/// Map an SDK error into the handler's error type
fn map_sdk_error<E>(operation: Operation, error: SdkError<E>) -> SqsError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
{
    let status = error.raw_response().map(|response| response.status().as_u16());

    match &error {
        SdkError::ServiceError(_) => SqsError::Service {
            operation,
            code: error.code().unwrap_or("Unknown").to_string(),
            message: error
                .message()
                .unwrap_or("no error message returned")
                .to_string(),
            status,
        },
        SdkError::TimeoutError(_) => SqsError::Transport {
            operation,
            message: "request timed out".to_string(),
        },
        _ => SqsError::Transport {
            operation,
            message: DisplayErrorContext(&error).to_string(),
        },
    }
}
