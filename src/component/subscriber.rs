//! [`SubscriberComponent`]: the consumer capability.

use async_trait::async_trait;

use crate::event::{Event, EventType};

use super::base::Component;

/// A component capable of subscribing to event tags and handling delivered
/// events.
#[async_trait]
pub trait SubscriberComponent: Component {
    /// Subscribes this component to `tag`.
    ///
    /// If a broker is attached and this component's self-reference has
    /// been set (i.e. it has already been registered with a broker), the
    /// subscription is installed immediately. Otherwise `tag` is appended
    /// to the pending list, to be drained the next time this component is
    /// registered with a broker.
    fn subscribe_to(&self, tag: EventType) {
        let core = self.core();
        match (core.broker(), core.self_subscriber()) {
            (Some(broker), Some(weak)) => broker.subscribe_component(tag, weak),
            _ => core.push_pending(tag),
        }
    }

    /// Invoked by the broker when an event this component subscribed to is
    /// dispatched. Default: logs a warning naming the tag and this
    /// component's type.
    async fn handle_event(&self, event: Event) {
        tracing::warn!(
            tag = %event.event_type(),
            component = self.core().type_name(),
            "unhandled event"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::ComponentCore;

    struct Probe {
        core: ComponentCore,
    }

    impl Component for Probe {
        fn core(&self) -> &ComponentCore {
            &self.core
        }
    }

    impl SubscriberComponent for Probe {}

    const TAG: EventType = EventType::new("tag");

    #[test]
    fn subscribe_before_attachment_queues_pending() {
        let probe = Probe {
            core: ComponentCore::new("Probe"),
        };
        probe.subscribe_to(TAG);
        assert_eq!(probe.core().take_pending(), vec![TAG]);
    }

    #[test]
    fn duplicate_subscriptions_are_preserved() {
        let probe = Probe {
            core: ComponentCore::new("Probe"),
        };
        probe.subscribe_to(TAG);
        probe.subscribe_to(TAG);
        assert_eq!(probe.core().take_pending(), vec![TAG, TAG]);
    }

    #[tokio::test]
    async fn default_handle_event_does_not_panic() {
        let probe = Probe {
            core: ComponentCore::new("Probe"),
        };
        probe.handle_event(Event::bare(TAG, "source")).await;
    }
}
