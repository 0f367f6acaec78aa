//! Component capability traits (`Component`/`Publisher`/`Subscriber`/`Transceiver`)
//! and the shared [`ComponentCore`].

pub mod base;
pub mod publisher;
pub mod subscriber;
pub mod transceiver;

pub use base::{Component, ComponentCore, ComponentError};
pub use publisher::PublisherComponent;
pub use subscriber::SubscriberComponent;
pub use transceiver::TransceiverComponent;

use std::sync::{Arc, Weak};

use crate::state_machine::StateMachine;

/// A live component handle, held by the broker without needing to name the
/// component's concrete type.
///
/// Enumerating the capability combinations (rather than a single
/// `Arc<dyn Component>` plus capability-query/downcast machinery) keeps
/// dispatch on a plain `match` instead of runtime type-casting.
#[derive(Clone)]
pub enum ComponentHandle {
    /// A publish-only component.
    Publisher(Arc<dyn PublisherComponent>),
    /// A subscribe-only component.
    Subscriber(Arc<dyn SubscriberComponent>),
    /// A publish-and-subscribe component.
    Transceiver(Arc<dyn TransceiverComponent>),
    /// A polled state machine (itself a transceiver under the hood).
    StateMachine(Arc<StateMachine>),
}

/// The capability label reported by [`crate::broker::Broker::get_component_info`].
///
/// A component satisfying more than one label (a `StateMachine` is also a
/// `Transceiver`) is always reported by its most specific label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentKind {
    /// Reported for [`ComponentHandle::Publisher`].
    Publisher,
    /// Reported for [`ComponentHandle::Subscriber`].
    Subscriber,
    /// Reported for [`ComponentHandle::Transceiver`].
    Transceiver,
    /// Reported for [`ComponentHandle::StateMachine`].
    StateMachine,
}

impl ComponentHandle {
    /// This handle's capability label.
    pub fn kind(&self) -> ComponentKind {
        match self {
            ComponentHandle::Publisher(_) => ComponentKind::Publisher,
            ComponentHandle::Subscriber(_) => ComponentKind::Subscriber,
            ComponentHandle::Transceiver(_) => ComponentKind::Transceiver,
            ComponentHandle::StateMachine(_) => ComponentKind::StateMachine,
        }
    }

    /// This handle's declared type name, for logging and introspection.
    pub fn type_name(&self) -> &'static str {
        match self {
            ComponentHandle::Publisher(c) => c.core().type_name(),
            ComponentHandle::Subscriber(c) => c.core().type_name(),
            ComponentHandle::Transceiver(c) => c.core().type_name(),
            ComponentHandle::StateMachine(c) => c.core().type_name(),
        }
    }

    /// Runs the `startup` hook for whichever capability this handle has.
    pub async fn startup(&self) -> Result<(), ComponentError> {
        match self {
            ComponentHandle::Publisher(c) => c.startup().await,
            ComponentHandle::Subscriber(c) => c.startup().await,
            ComponentHandle::Transceiver(c) => c.startup().await,
            ComponentHandle::StateMachine(c) => c.startup().await,
        }
    }

    /// Runs the `shutdown` hook for whichever capability this handle has.
    pub async fn shutdown(&self) -> Result<(), ComponentError> {
        match self {
            ComponentHandle::Publisher(c) => c.shutdown().await,
            ComponentHandle::Subscriber(c) => c.shutdown().await,
            ComponentHandle::Transceiver(c) => c.shutdown().await,
            ComponentHandle::StateMachine(c) => c.shutdown().await,
        }
    }

    /// Runs the long-running `run` hook, if this handle is publish-capable.
    /// `Subscriber`-only handles have no `run` loop and return immediately.
    pub async fn run(&self) {
        match self {
            ComponentHandle::Publisher(c) => c.run().await,
            ComponentHandle::Subscriber(_) => {}
            ComponentHandle::Transceiver(c) => c.run().await,
            ComponentHandle::StateMachine(c) => c.run().await,
        }
    }

    /// If this handle is subscriber-capable, returns a weak reference to it
    /// as such.
    ///
    /// Downgrades the handle's own stored `Arc` directly (rather than
    /// cloning into a fresh owned `Arc` first) so the resulting `Weak`'s
    /// strong count tracks the component's actual lifetime in the broker's
    /// component table.
    pub fn as_subscriber(&self) -> Option<Weak<dyn SubscriberComponent>> {
        match self {
            ComponentHandle::Publisher(_) => None,
            ComponentHandle::Subscriber(c) => Some(Arc::downgrade(c)),
            ComponentHandle::Transceiver(c) => {
                let weak: Weak<dyn SubscriberComponent> = Arc::downgrade(c);
                Some(weak)
            }
            ComponentHandle::StateMachine(c) => {
                let weak: Weak<dyn SubscriberComponent> = Arc::downgrade(c);
                Some(weak)
            }
        }
    }
}
