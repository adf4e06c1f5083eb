//! Common test utilities for sqs-handler integration tests
//!
//! This module provides:
//! - Test logging setup
//! - Handlers wired to a shared in-memory provider

use sqs_handler::{HandlerConfig, InMemoryProvider, SqsHandler, SqsMessage};
use std::sync::Arc;

#[allow(dead_code)]
pub const QUEUE_URL: &str = "http://localhost:4566/000000000000/orders";

/// Route handler logs to the test harness output
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("sqs=debug")
        .with_test_writer()
        .try_init();
}

/// Handler addressed to [`QUEUE_URL`] and the provider backing it
#[allow(dead_code)]
pub fn in_memory_handler() -> (SqsHandler, InMemoryProvider) {
    init_logging();

    let provider = InMemoryProvider::new();
    provider.create_queue(QUEUE_URL);

    let config = HandlerConfig::new()
        .with_region("us-east-1")
        .with_endpoint(QUEUE_URL);
    let handler = SqsHandler::with_factory(config, Arc::new(provider.clone()))
        .expect("in-memory handler should build");

    (handler, provider)
}

#[allow(dead_code)]
pub fn numbered_messages(count: usize) -> Vec<SqsMessage> {
    (0..count)
        .map(|i| SqsMessage::new(format!("order {}", i)))
        .collect()
}
