//! [`PublisherComponent`]: the producer capability.

use async_trait::async_trait;

use crate::event::Event;

use super::base::Component;

/// A component capable of publishing events through its attached broker.
#[async_trait]
pub trait PublisherComponent: Component {
    /// Forwards `event` to the attached broker. If no broker is attached,
    /// logs a warning naming this component's type and returns without
    /// error.
    async fn publish(&self, event: Event) {
        match self.core().broker() {
            Some(broker) => broker.publish(event).await,
            None => tracing::warn!(
                component = self.core().type_name(),
                "publish called with no attached broker"
            ),
        }
    }

    /// A long-running producer loop, spawned as a background task by the
    /// broker during `start()`. Default: no-op, returns immediately.
    async fn run(&self) {}
}
