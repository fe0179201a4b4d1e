//! Event publisher trait and implementations.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use domain::DomainEvent;

use crate::error::FulfillmentError;

/// Trait for publishing domain events to the message broker.
///
/// Delivery is at-least-once. Every event is keyed by its order number,
/// so all events for one order land on the same partition and a single
/// consumer observes them in send order.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publishes one event to its topic.
    async fn publish(&self, event: &DomainEvent) -> Result<(), FulfillmentError>;
}

#[derive(Debug, Default)]
struct InMemoryPublisherState {
    published: Vec<DomainEvent>,
    fail_on_publish: bool,
}

/// In-memory event publisher for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEventPublisher {
    state: Arc<RwLock<InMemoryPublisherState>>,
}

impl InMemoryEventPublisher {
    /// Creates a new in-memory publisher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the publisher to fail publish calls.
    pub fn set_fail_on_publish(&self, fail: bool) {
        self.state.write().unwrap().fail_on_publish = fail;
    }

    /// Returns all published events in send order.
    pub fn published(&self) -> Vec<DomainEvent> {
        self.state.read().unwrap().published.clone()
    }

    /// Returns the number of published events.
    pub fn published_count(&self) -> usize {
        self.state.read().unwrap().published.len()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventPublisher {
    async fn publish(&self, event: &DomainEvent) -> Result<(), FulfillmentError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_publish {
            return Err(FulfillmentError::Publish("broker unavailable".to_string()));
        }

        state.published.push(event.clone());
        Ok(())
    }
}

#[cfg(feature = "kafka")]
pub use self::kafka::KafkaEventPublisher;

#[cfg(feature = "kafka")]
mod kafka {
    use std::time::Duration;

    use async_trait::async_trait;
    use domain::DomainEvent;
    use rdkafka::config::ClientConfig;
    use rdkafka::producer::{FutureProducer, FutureRecord};
    use rdkafka::util::Timeout;

    use super::EventPublisher;
    use crate::error::FulfillmentError;

    /// Kafka-backed event publisher.
    pub struct KafkaEventPublisher {
        producer: FutureProducer,
        send_timeout: Duration,
    }

    impl KafkaEventPublisher {
        /// Creates a producer connected to the given brokers.
        pub fn new(brokers: &str) -> Result<Self, FulfillmentError> {
            let producer: FutureProducer = ClientConfig::new()
                .set("bootstrap.servers", brokers)
                .set("message.timeout.ms", "5000")
                .create()
                .map_err(|e| FulfillmentError::Publish(e.to_string()))?;

            Ok(Self {
                producer,
                send_timeout: Duration::from_secs(5),
            })
        }
    }

    #[async_trait]
    impl EventPublisher for KafkaEventPublisher {
        async fn publish(&self, event: &DomainEvent) -> Result<(), FulfillmentError> {
            let payload = serde_json::to_string(event)
                .map_err(|e| FulfillmentError::Publish(e.to_string()))?;
            let key = event.partition_key().to_string();
            let topic = event.topic();

            let record = FutureRecord::to(topic).key(&key).payload(&payload);

            self.producer
                .send(record, Timeout::After(self.send_timeout))
                .await
                .map_err(|(e, _)| FulfillmentError::Publish(e.to_string()))?;

            tracing::info!(topic, key = %key, event_type = event.event_type(), "event published");
            Ok(())
        }
    }
}
