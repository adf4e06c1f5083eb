//! Provider traits: the seam between the handler and the queue transport.

use crate::config::HandlerConfig;
use crate::error::SqsError;
use crate::request::{
    BatchOutput, DeleteMessageBatchRequest, GetQueueAttributesRequest, ProviderResponse,
    ReceiveMessageRequest, ReceivedMessage, SendMessageBatchRequest, SendMessageOutput,
    SendMessageRequest,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Interface implemented by SQS transports (AWS SDK, in-memory, test doubles)
///
/// Providers report transport failures as `Err`; a response with a status
/// other than 200 is returned as `Ok` and judged by the caller.
#[async_trait]
pub trait SqsProvider: Send + Sync {
    /// Send single message
    async fn send_message(
        &self,
        request: SendMessageRequest,
    ) -> Result<ProviderResponse<SendMessageOutput>, SqsError>;

    /// Send up to ten messages in one call
    async fn send_message_batch(
        &self,
        request: SendMessageBatchRequest,
    ) -> Result<ProviderResponse<BatchOutput>, SqsError>;

    /// Receive messages
    async fn receive_message(
        &self,
        request: ReceiveMessageRequest,
    ) -> Result<ProviderResponse<Vec<ReceivedMessage>>, SqsError>;

    /// Delete up to ten messages by receipt handle
    async fn delete_message_batch(
        &self,
        request: DeleteMessageBatchRequest,
    ) -> Result<ProviderResponse<BatchOutput>, SqsError>;

    /// Look up queue attributes
    async fn get_queue_attributes(
        &self,
        request: GetQueueAttributesRequest,
    ) -> Result<ProviderResponse<HashMap<String, String>>, SqsError>;
}

/// Builds a provider from a complete configuration snapshot
pub trait ProviderFactory: Send + Sync {
    fn create_provider(&self, config: &HandlerConfig) -> Result<Arc<dyn SqsProvider>, SqsError>;
}
