//! Outbound message model with scenario-based validation.

use crate::error::{SqsError, ValidationError, ValidationErrors};
use bytes::Bytes;
use serde::Serialize;
use std::collections::HashMap;

/// Maximum delivery delay accepted by SQS (15 minutes)
pub const MAX_DELAY_SECONDS: u32 = 900;

/// Maximum number of message attributes SQS accepts per message
pub const MAX_MESSAGE_ATTRIBUTES: usize = 10;

// ============================================================================
// Attribute Values
// ============================================================================

/// Typed message attribute value, mirroring the SQS `MessageAttributeValue` shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageAttributeValue {
    /// SQS data type: `String`, `Number`, `Binary`, optionally with a custom suffix
    pub data_type: String,
    pub string_value: Option<String>,
    pub binary_value: Option<Bytes>,
    pub string_list_values: Vec<String>,
    pub binary_list_values: Vec<Bytes>,
}

impl MessageAttributeValue {
    /// Create attribute with an explicit data type and string value
    pub fn new(data_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            data_type: data_type.into(),
            string_value: Some(value.into()),
            binary_value: None,
            string_list_values: Vec::new(),
            binary_list_values: Vec::new(),
        }
    }

    /// Create `String` attribute
    pub fn string(value: impl Into<String>) -> Self {
        Self::new("String", value)
    }

    /// Create `Number` attribute
    pub fn number(value: impl ToString) -> Self {
        Self::new("Number", value.to_string())
    }

    /// Create `Binary` attribute
    pub fn binary(value: impl Into<Bytes>) -> Self {
        Self {
            data_type: "Binary".to_string(),
            string_value: None,
            binary_value: Some(value.into()),
            string_list_values: Vec::new(),
            binary_list_values: Vec::new(),
        }
    }

    /// Check whether the attribute carries any value at all
    pub fn has_value(&self) -> bool {
        self.string_value.is_some()
            || self.binary_value.is_some()
            || !self.string_list_values.is_empty()
            || !self.binary_list_values.is_empty()
    }
}

// ============================================================================
// Validation Scenario
// ============================================================================

/// Selects which fields a message must carry to pass validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationScenario {
    /// Standalone send: body and queue URL are both required
    #[default]
    Single,
    /// Batch entry: the queue URL comes from the batch envelope
    Batch,
}

// ============================================================================
// Message
// ============================================================================

/// One outbound SQS message
///
/// Fields are public so callers can build messages directly; validation
/// errors are recorded on the message and stay readable after a send
/// attempt.
#[derive(Debug, Clone, Default)]
pub struct SqsMessage {
    pub message_body: String,
    pub queue_url: String,
    /// `None` leaves the queue's default delay in effect
    pub delay_seconds: Option<u32>,
    pub message_attributes: HashMap<String, MessageAttributeValue>,
    pub deduplication_id: Option<String>,
    pub group_id: Option<String>,
    scenario: ValidationScenario,
    errors: ValidationErrors,
}

impl SqsMessage {
    /// Create new message with body
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            message_body: body.into(),
            ..Self::default()
        }
    }

    /// Create message whose body is the JSON encoding of `value`
    pub fn json<T: Serialize>(value: &T) -> Result<Self, SqsError> {
        Ok(Self::new(serde_json::to_string(value)?))
    }

    /// Set destination queue URL
    pub fn with_queue_url(mut self, queue_url: impl Into<String>) -> Self {
        self.queue_url = queue_url.into();
        self
    }

    /// Set delivery delay
    pub fn with_delay_seconds(mut self, delay_seconds: u32) -> Self {
        self.delay_seconds = Some(delay_seconds);
        self
    }

    /// Add message attribute
    pub fn with_attribute(mut self, name: impl Into<String>, value: MessageAttributeValue) -> Self {
        self.message_attributes.insert(name.into(), value);
        self
    }

    /// Set FIFO deduplication ID
    pub fn with_deduplication_id(mut self, id: impl Into<String>) -> Self {
        self.deduplication_id = Some(id.into());
        self
    }

    /// Set FIFO message group ID
    pub fn with_group_id(mut self, id: impl Into<String>) -> Self {
        self.group_id = Some(id.into());
        self
    }

    pub fn scenario(&self) -> ValidationScenario {
        self.scenario
    }

    pub fn set_scenario(&mut self, scenario: ValidationScenario) {
        self.scenario = scenario;
    }

    /// Errors recorded by the last call to [`SqsMessage::validate`]
    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Validate the message for its current scenario
    ///
    /// Replaces any previously recorded errors and returns `true` when the
    /// message may be sent.
    pub fn validate(&mut self) -> bool {
        let mut errors = Vec::new();

        if self.message_body.is_empty() {
            errors.push(ValidationError::Required {
                field: "message_body".to_string(),
            });
        }

        if self.scenario == ValidationScenario::Single && self.queue_url.is_empty() {
            errors.push(ValidationError::Required {
                field: "queue_url".to_string(),
            });
        }

        if let Some(delay) = self.delay_seconds {
            if delay > MAX_DELAY_SECONDS {
                errors.push(ValidationError::OutOfRange {
                    field: "delay_seconds".to_string(),
                    message: format!("must be at most {} seconds", MAX_DELAY_SECONDS),
                });
            }
        }

        if self.message_attributes.len() > MAX_MESSAGE_ATTRIBUTES {
            errors.push(ValidationError::OutOfRange {
                field: "message_attributes".to_string(),
                message: format!("at most {} attributes allowed", MAX_MESSAGE_ATTRIBUTES),
            });
        }

        for (name, value) in &self.message_attributes {
            if name.is_empty() {
                errors.push(ValidationError::InvalidFormat {
                    field: "message_attributes".to_string(),
                    message: "attribute name cannot be empty".to_string(),
                });
                continue;
            }
            if value.data_type.is_empty() {
                errors.push(ValidationError::Required {
                    field: format!("message_attributes.{}.data_type", name),
                });
            }
            if !value.has_value() {
                errors.push(ValidationError::Required {
                    field: format!("message_attributes.{}.value", name),
                });
            }
        }

        self.errors = ValidationErrors::new(errors);
        self.errors.is_empty()
    }

    /// Outgoing fields with empty values dropped
    ///
    /// Empty strings and an empty attribute map are omitted. A delay that
    /// was explicitly set is always carried, including zero.
    pub fn attributes(&self) -> OutboundMessage {
        OutboundMessage {
            message_body: self.message_body.clone(),
            delay_seconds: self.delay_seconds,
            message_attributes: self.message_attributes.clone(),
            deduplication_id: non_empty(self.deduplication_id.as_deref()),
            group_id: non_empty(self.group_id.as_deref()),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_owned)
}

/// Message fields as they are handed to the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub message_body: String,
    pub delay_seconds: Option<u32>,
    pub message_attributes: HashMap<String, MessageAttributeValue>,
    pub deduplication_id: Option<String>,
    pub group_id: Option<String>,
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
