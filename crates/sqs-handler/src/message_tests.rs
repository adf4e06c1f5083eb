//! Tests for message types.

use super::*;

fn valid_message() -> SqsMessage {
    SqsMessage::new("order created").with_queue_url("https://sqs.us-east-1.amazonaws.com/1/orders")
}

// ============================================================================
// Validation Tests
// ============================================================================

mod validation_tests {
    use super::*;

    /// Verify that single sends require a body and a queue URL.
    #[test]
    fn test_single_requires_body_and_queue_url() {
        let mut message = SqsMessage::default();

        assert!(!message.validate());
        assert!(message.errors().contains_field("message_body"));
        assert!(message.errors().contains_field("queue_url"));
    }

    /// Verify that a body and queue URL are enough for a single send.
    #[test]
    fn test_single_accepts_body_and_queue_url_only() {
        let mut message = valid_message();

        assert!(message.validate());
        assert!(!message.has_errors());
    }

    /// Verify that batch entries do not need a queue URL.
    #[test]
    fn test_batch_does_not_require_queue_url() {
        let mut message = SqsMessage::new("payload");
        message.set_scenario(ValidationScenario::Batch);

        assert!(message.validate());
    }

    /// Verify that batch entries still need a body.
    #[test]
    fn test_batch_still_requires_body() {
        let mut message = SqsMessage::new("").with_queue_url("q");
        message.set_scenario(ValidationScenario::Batch);

        assert!(!message.validate());
        assert!(message.errors().contains_field("message_body"));
        assert!(!message.errors().contains_field("queue_url"));
    }

    /// Verify that new messages validate as single sends.
    #[test]
    fn test_default_scenario_is_single() {
        assert_eq!(SqsMessage::default().scenario(), ValidationScenario::Single);
    }

    /// Verify that delays above 900 seconds are rejected.
    #[test]
    fn test_delay_above_limit_is_rejected() {
        let mut message = valid_message().with_delay_seconds(MAX_DELAY_SECONDS + 1);

        assert!(!message.validate());
        assert!(message.errors().contains_field("delay_seconds"));
    }

    /// Verify that a delay of exactly 900 seconds is accepted.
    #[test]
    fn test_delay_at_limit_is_accepted() {
        let mut message = valid_message().with_delay_seconds(MAX_DELAY_SECONDS);
        assert!(message.validate());
    }

    /// Verify that more than ten attributes are rejected.
    #[test]
    fn test_too_many_attributes_are_rejected() {
        let mut message = valid_message();
        for i in 0..=MAX_MESSAGE_ATTRIBUTES {
            message = message.with_attribute(format!("attr{}", i), MessageAttributeValue::number(i));
        }

        assert!(!message.validate());
        assert!(message.errors().contains_field("message_attributes"));
    }

    /// Verify that an attribute without a value is rejected.
    #[test]
    fn test_attribute_without_value_is_rejected() {
        let mut value = MessageAttributeValue::string("x");
        value.string_value = None;
        let mut message = valid_message().with_attribute("tenant", value);

        assert!(!message.validate());
        assert!(message.errors().contains_field("message_attributes.tenant.value"));
    }

    /// Verify that an attribute without a data type is rejected.
    #[test]
    fn test_attribute_without_data_type_is_rejected() {
        let mut message = valid_message().with_attribute("tenant", MessageAttributeValue::new("", "acme"));

        assert!(!message.validate());
        assert!(message
            .errors()
            .contains_field("message_attributes.tenant.data_type"));
    }

    /// Verify that validating again replaces earlier errors.
    #[test]
    fn test_revalidation_replaces_errors() {
        let mut message = SqsMessage::new("");
        assert!(!message.validate());

        message.message_body = "now set".to_string();
        message.queue_url = "q".to_string();
        assert!(message.validate());
        assert!(message.errors().is_empty());
    }
}

// ============================================================================
// Attribute Mapping Tests
// ============================================================================

mod attributes_tests {
    use super::*;

    /// Verify that empty optional fields are left out of the outbound message.
    #[test]
    fn test_empty_optional_fields_are_omitted() {
        let message = valid_message()
            .with_deduplication_id("")
            .with_group_id("");

        let outbound = message.attributes();

        assert_eq!(outbound.message_body, "order created");
        assert_eq!(outbound.delay_seconds, None);
        assert!(outbound.message_attributes.is_empty());
        assert_eq!(outbound.deduplication_id, None);
        assert_eq!(outbound.group_id, None);
    }

    /// Verify that an explicit zero delay is kept.
    #[test]
    fn test_explicit_zero_delay_is_kept() {
        let outbound = valid_message().with_delay_seconds(0).attributes();
        assert_eq!(outbound.delay_seconds, Some(0));
    }

    /// Verify that FIFO fields and attributes are carried to the outbound message.
    #[test]
    fn test_fifo_fields_and_attributes_are_carried() {
        let outbound = valid_message()
            .with_delay_seconds(30)
            .with_deduplication_id("dedup-1")
            .with_group_id("customer-42")
            .with_attribute("priority", MessageAttributeValue::number(5))
            .attributes();

        assert_eq!(outbound.delay_seconds, Some(30));
        assert_eq!(outbound.deduplication_id.as_deref(), Some("dedup-1"));
        assert_eq!(outbound.group_id.as_deref(), Some("customer-42"));
        assert_eq!(
            outbound.message_attributes.get("priority"),
            Some(&MessageAttributeValue::new("Number", "5"))
        );
    }

    /// Verify that a serializable value becomes a JSON body.
    #[test]
    fn test_json_body() {
        #[derive(serde::Serialize)]
        struct Order {
            id: u32,
        }

        let message = SqsMessage::json(&Order { id: 7 }).unwrap();
        assert_eq!(message.message_body, r#"{"id":7}"#);
    }

    /// Verify that binary attributes count as carrying a value.
    #[test]
    fn test_binary_attribute_has_value() {
        let value = MessageAttributeValue::binary(vec![1u8, 2, 3]);
        assert_eq!(value.data_type, "Binary");
        assert!(value.has_value());
        assert_eq!(value.string_value, None);
    }
}
