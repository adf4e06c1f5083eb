//! SQS provider implementations.
//!
//! This module contains concrete implementations of the `SqsProvider` and
//! `ProviderFactory` traits.

pub mod aws;
pub mod memory;

pub use aws::{AwsProviderFactory, AwsSqsProvider};
pub use memory::InMemoryProvider;
