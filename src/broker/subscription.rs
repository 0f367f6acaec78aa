//! Subscription handler storage.

use std::sync::{Arc, Weak};

use futures::future::BoxFuture;

use crate::component::SubscriberComponent;
use crate::event::Event;

/// A single subscriber-side handler, as registered with [`super::Broker::subscribe`]
/// or attached automatically from a registered [`crate::component::ComponentHandle`].
#[derive(Clone)]
pub enum Subscription {
    /// A plain synchronous callback, invoked directly on the dispatcher
    /// task. Expected to be short-running.
    Sync(Arc<dyn Fn(&Event) + Send + Sync>),
    /// An asynchronous callback, awaited on the dispatcher task.
    Async(Arc<dyn Fn(Event) -> BoxFuture<'static, ()> + Send + Sync>),
    /// A registered component's own `handle_event`, held weakly so a
    /// subscription never keeps a component alive after its last strong
    /// reference is dropped.
    Component(Weak<dyn SubscriberComponent>),
}

impl Subscription {
    /// Invokes this handler with `event`, tolerating a vanished weak
    /// component reference by doing nothing.
    pub(crate) async fn invoke(&self, event: &Event) {
        match self {
            Subscription::Sync(f) => f(event),
            Subscription::Async(f) => f(event.clone()).await,
            Subscription::Component(weak) => {
                if let Some(component) = weak.upgrade() {
                    component.handle_event(event.clone()).await;
                }
            }
        }
    }
}
