//! [`ComponentCore`] and the [`Component`] base capability.

use std::sync::{Arc, Weak};

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};

use crate::broker::Broker;
use crate::event::EventType;

use super::subscriber::SubscriberComponent;

/// The Base capability set, embedded by composition in every concrete
/// component rather than inherited.
///
/// Holds the (optional) attached [`Broker`] handle, a self-reference used to
/// register subscriptions taken out after attachment, and the list of tags
/// subscribed to before a broker was attached.
pub struct ComponentCore {
    broker: RwLock<Option<Broker>>,
    self_subscriber: RwLock<Option<Weak<dyn SubscriberComponent>>>,
    pending: Mutex<Vec<EventType>>,
    type_name: &'static str,
}

impl ComponentCore {
    /// Builds a fresh, unattached core for a component of the given type.
    pub fn new(type_name: &'static str) -> Self {
        Self {
            broker: RwLock::new(None),
            self_subscriber: RwLock::new(None),
            pending: Mutex::new(Vec::new()),
            type_name,
        }
    }

    /// The concrete component's declared type name, used in log lines.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// The attached broker, if any.
    pub fn broker(&self) -> Option<Broker> {
        self.broker.read().clone()
    }

    /// Attaches (or replaces) the broker handle.
    pub fn set_broker(&self, broker: Broker) {
        *self.broker.write() = Some(broker);
    }

    /// A weak handle to this component as a [`SubscriberComponent`], set by
    /// the broker at registration time so that `subscribe_to` calls made
    /// after attachment can register immediately instead of queuing.
    pub fn self_subscriber(&self) -> Option<Weak<dyn SubscriberComponent>> {
        self.self_subscriber.read().clone()
    }

    /// Sets the self-reference described by [`ComponentCore::self_subscriber`].
    pub fn set_self_subscriber(&self, weak: Weak<dyn SubscriberComponent>) {
        *self.self_subscriber.write() = Some(weak);
    }

    /// Appends `tag` to the pending-subscription list, preserving
    /// insertion order and permitting duplicates.
    pub fn push_pending(&self, tag: EventType) {
        self.pending.lock().push(tag);
    }

    /// Drains and returns the pending-subscription list in insertion order.
    pub fn take_pending(&self) -> Vec<EventType> {
        std::mem::take(&mut self.pending.lock())
    }
}

/// The Base capability: every component exposes its [`ComponentCore`] and
/// may override the no-op `startup`/`shutdown` lifecycle hooks.
#[async_trait]
pub trait Component: Send + Sync {
    /// Accesses this component's shared core state.
    fn core(&self) -> &ComponentCore;

    /// Runs once when the broker starts this component.
    ///
    /// A returned error is logged by the broker ("Startup failed for
    /// `<id>`: `<detail>`") and does not prevent other components from
    /// starting. Default: no-op, always succeeds.
    async fn startup(&self) -> Result<(), ComponentError> {
        Ok(())
    }

    /// Runs once when the broker stops this component. Default: no-op,
    /// always succeeds.
    async fn shutdown(&self) -> Result<(), ComponentError> {
        Ok(())
    }
}

/// An error raised from a component's `startup`/`shutdown` hook.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct ComponentError(pub String);

impl ComponentError {
    /// Builds a component error from any displayable value.
    pub fn new(detail: impl std::fmt::Display) -> Self {
        Self(detail.to_string())
    }
}
