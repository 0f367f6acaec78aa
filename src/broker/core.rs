//! [`Broker`]: the event queue, subscriber table, and component lifecycle owner.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use futures::FutureExt;
use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::component::{ComponentHandle, ComponentKind, SubscriberComponent};
use crate::event::{Event, EventType};
use crate::registry::COMPONENT_REGISTRY;
use crate::util::{ComponentId, HandlerId};

use super::error::BrokerError;
use super::subscription::Subscription;

const DEFAULT_MAX_QUEUE_SIZE: usize = 500;

/// Extracts a human-readable message from a `catch_unwind` payload.
/// `panic!("...")` and `panic!("{}", ...)` unwind with a `&'static str` or
/// `String` payload respectively; anything else falls back to a fixed label.
fn panic_detail(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// A snapshot of a registered component's identity and status, returned by
/// [`Broker::get_component_info`].
#[derive(Debug, Clone)]
pub struct ComponentInfo {
    /// The id this component is registered under.
    pub id: ComponentId,
    /// The component's declared type name.
    pub type_name: &'static str,
    /// The component's capability label.
    pub kind: ComponentKind,
    /// Whether the broker is currently running.
    pub running: bool,
}

struct BrokerState {
    components: DashMap<ComponentId, ComponentHandle>,
    subscribers: DashMap<EventType, Vec<(HandlerId, Subscription)>>,
    sender: RwLock<mpsc::Sender<Event>>,
    component_tasks: DashMap<ComponentId, JoinHandle<()>>,
    dispatcher_task: Mutex<Option<JoinHandle<()>>>,
    running: AtomicBool,
    auto_discover: bool,
    max_queue_size: usize,
}

/// The event bus: owns the bounded event queue, the subscriber table, the
/// component table, and every component's background task.
///
/// Cheaply `Clone`-able (an `Arc` handle internally); components hold a
/// clone of their attached broker rather than a raw reference.
#[derive(Clone)]
pub struct Broker(Arc<BrokerState>);

impl Broker {
    /// Builds a broker with default settings (`auto_discover = true`,
    /// `max_queue_size = 500`).
    pub fn new() -> Self {
        BrokerBuilder::default().build()
    }

    /// Starts a [`BrokerBuilder`] for explicit configuration.
    pub fn builder() -> BrokerBuilder {
        BrokerBuilder::default()
    }

    /// Registers a live component under `id` (defaulting to the handle's
    /// declared type name), attaches the broker back-reference, and drains
    /// any pending subscriptions.
    ///
    /// Fails with [`BrokerError::DuplicateComponentId`] if `id` is already
    /// registered.
    pub fn register_component(
        &self,
        handle: ComponentHandle,
        id: Option<ComponentId>,
    ) -> Result<ComponentId, BrokerError> {
        let id = id.unwrap_or_else(|| ComponentId::new(handle.type_name()));
        if self.0.components.contains_key(&id) {
            return Err(BrokerError::DuplicateComponentId(id));
        }
        self.attach(&handle);
        self.0.components.insert(id.clone(), handle);
        Ok(id)
    }

    fn attach(&self, handle: &ComponentHandle) {
        let core = match handle {
            ComponentHandle::Publisher(c) => c.core(),
            ComponentHandle::Subscriber(c) => c.core(),
            ComponentHandle::Transceiver(c) => c.core(),
            ComponentHandle::StateMachine(c) => c.core(),
        };
        core.set_broker(self.clone());

        if let Some(weak) = handle.as_subscriber() {
            if let Some(subscriber) = weak.upgrade() {
                subscriber.core().set_self_subscriber(weak.clone());
                for tag in subscriber.core().take_pending() {
                    self.subscribe_component(tag, weak.clone());
                }
            }
        }
    }

    /// Registers a plain synchronous or asynchronous handler for `tag`.
    /// Returns a [`HandlerId`] usable with [`Broker::unsubscribe`].
    pub fn subscribe(&self, tag: EventType, handler: Subscription) -> HandlerId {
        let id = HandlerId::new();
        self.0
            .subscribers
            .entry(tag)
            .or_default()
            .push((id, handler));
        id
    }

    /// Registers a component's `handle_event` as a handler for `tag`.
    pub(crate) fn subscribe_component(
        &self,
        tag: EventType,
        component: Weak<dyn SubscriberComponent>,
    ) -> HandlerId {
        self.subscribe(tag, Subscription::Component(component))
    }

    /// Removes a previously registered handler. Returns `true` if a handler
    /// with that id was found and removed. Removing the last handler for a
    /// tag removes the tag entry entirely.
    pub fn unsubscribe(&self, tag: EventType, handler_id: HandlerId) -> bool {
        let Some(mut entry) = self.0.subscribers.get_mut(&tag) else {
            return false;
        };
        let before = entry.len();
        entry.retain(|(id, _)| *id != handler_id);
        let removed = entry.len() != before;
        let now_empty = entry.is_empty();
        drop(entry);
        if now_empty {
            self.0.subscribers.remove(&tag);
        }
        removed
    }

    /// Enqueues `event` for dispatch. Blocks (backpressure) if the queue is
    /// full. If the broker is not running, logs a warning and drops the
    /// event.
    pub async fn publish(&self, event: Event) {
        if !self.is_running() {
            tracing::warn!("broker not running");
            return;
        }
        let sender = self.0.sender.read().clone();
        if sender.send(event).await.is_err() {
            tracing::error!("event dropped: dispatcher channel closed");
        }
    }

    /// Starts the broker: rebuilds the bounded event queue, optionally
    /// auto-discovers and instantiates registered components, spawns the
    /// dispatcher task, and spawns a lifecycle task per registered
    /// component.
    ///
    /// The queue is rebuilt fresh on every `start()` so a broker stopped and
    /// restarted dispatches again instead of silently dropping events on a
    /// channel closed by the previous `stop()`.
    ///
    /// A second call while already running logs "already running" and is a
    /// no-op.
    pub async fn start(&self) {
        if self.0.running.swap(true, Ordering::SeqCst) {
            tracing::warn!("already running");
            return;
        }

        if self.0.auto_discover {
            self.discover_components();
        }

        let (sender, receiver) = mpsc::channel(self.0.max_queue_size.max(1));
        *self.0.sender.write() = sender;

        let broker = self.clone();
        let task = tokio::spawn(async move { broker.run_dispatcher(receiver).await });
        *self.0.dispatcher_task.lock() = Some(task);

        let ids: Vec<ComponentId> = self.0.components.iter().map(|e| e.key().clone()).collect();
        for id in ids {
            let Some(handle) = self.0.components.get(&id).map(|e| e.value().clone()) else {
                continue;
            };
            let task = tokio::spawn(Self::run_component(id.clone(), handle));
            self.0.component_tasks.insert(id, task);
        }
    }

    fn discover_components(&self) {
        let snapshot = COMPONENT_REGISTRY.get_all_registrations();
        for registration in snapshot
            .publishers
            .iter()
            .chain(snapshot.subscribers.iter())
            .chain(snapshot.transceivers.iter())
        {
            if !registration.auto_start() {
                continue;
            }
            let handle = registration.instantiate();
            if let Err(err) = self.register_component(handle, Some(registration.component_id().clone()))
            {
                tracing::warn!(error = %err, "auto-discovery registration failed");
            }
        }
    }

    async fn run_component(id: ComponentId, handle: ComponentHandle) {
        if let Err(err) = handle.startup().await {
            tracing::warn!(id = %id, error = %err, "Startup failed for {id}: {err}");
        }
        if let ComponentHandle::StateMachine(sm) = &handle {
            if !sm.start().await {
                tracing::warn!(id = %id, "Failed to start state machine for {id}");
            }
        }
        handle.run().await;
    }

    /// Stops the broker: cancels the dispatcher and every component task,
    /// and invokes each component's `shutdown` hook (and, for state
    /// machines, `stop` first). Clears all internal tables.
    ///
    /// A call while not running logs "not running" and is a no-op.
    pub async fn stop(&self) {
        if !self.0.running.swap(false, Ordering::SeqCst) {
            tracing::warn!("not running");
            return;
        }

        if let Some(task) = self.0.dispatcher_task.lock().take() {
            task.abort();
        }

        for entry in self.0.components.iter() {
            let handle = entry.value().clone();
            if let ComponentHandle::StateMachine(sm) = &handle {
                sm.stop().await;
            }
            if let Err(err) = handle.shutdown().await {
                tracing::warn!(id = %entry.key(), error = %err, "shutdown failed");
            }
        }
        for entry in self.0.component_tasks.iter() {
            entry.value().abort();
        }

        self.0.components.clear();
        self.0.subscribers.clear();
        self.0.component_tasks.clear();
    }

    async fn run_dispatcher(&self, mut receiver: mpsc::Receiver<Event>) {
        while let Some(event) = receiver.recv().await {
            self.dispatch(event).await;
        }
    }

    async fn dispatch(&self, event: Event) {
        let tag = event.event_type();
        let handlers = self.0.subscribers.get(&tag).map(|entry| entry.value().clone());
        let handlers = match handlers {
            Some(h) if !h.is_empty() => h,
            _ => {
                tracing::debug!(tag = %tag, "No subscribers for event type: {tag}");
                return;
            }
        };

        for (_, handler) in handlers {
            let result = AssertUnwindSafe(handler.invoke(&event)).catch_unwind().await;
            if let Err(payload) = result {
                let detail = panic_detail(&payload);
                tracing::warn!(tag = %tag, "Handler error for event {tag}: {detail}");
            }
        }
    }

    /// Looks up a registered component's identity and status.
    pub fn get_component_info(&self, id: &ComponentId) -> Option<ComponentInfo> {
        self.0.components.get(id).map(|entry| ComponentInfo {
            id: id.clone(),
            type_name: entry.value().type_name(),
            kind: entry.value().kind(),
            running: self.is_running(),
        })
    }

    /// All currently registered component ids.
    pub fn list_components(&self) -> Vec<ComponentId> {
        self.0.components.iter().map(|e| e.key().clone()).collect()
    }

    /// All event tags with at least one subscriber.
    pub fn list_event_types(&self) -> Vec<EventType> {
        self.0.subscribers.iter().map(|e| *e.key()).collect()
    }

    /// How many handlers are subscribed to `tag`.
    pub fn get_subscriber_count(&self, tag: EventType) -> usize {
        self.0.subscribers.get(&tag).map(|e| e.len()).unwrap_or(0)
    }

    /// Whether the broker is currently running.
    pub fn is_running(&self) -> bool {
        self.0.running.load(Ordering::SeqCst)
    }

    /// How many components are currently registered.
    pub fn component_count(&self) -> usize {
        self.0.components.len()
    }

    /// An approximation of how many events are currently queued awaiting
    /// dispatch.
    pub fn pending_events(&self) -> usize {
        self.0
            .max_queue_size
            .saturating_sub(self.0.sender.read().capacity())
    }
}

impl Default for Broker {
    fn default() -> Self {
        Self::new()
    }
}

/// Fluent builder for a [`Broker`].
pub struct BrokerBuilder {
    auto_discover: bool,
    max_queue_size: usize,
}

impl Default for BrokerBuilder {
    fn default() -> Self {
        Self {
            auto_discover: true,
            max_queue_size: DEFAULT_MAX_QUEUE_SIZE,
        }
    }
}

impl BrokerBuilder {
    /// Overrides whether `start()` auto-discovers components from
    /// [`COMPONENT_REGISTRY`] (default: `true`).
    pub fn auto_discover(mut self, auto_discover: bool) -> Self {
        self.auto_discover = auto_discover;
        self
    }

    /// Overrides the bounded event queue's capacity (default: 500).
    pub fn max_queue_size(mut self, size: usize) -> Self {
        self.max_queue_size = size;
        self
    }

    /// Builds the broker. The dispatcher channel itself is created fresh on
    /// each `start()`; this placeholder pair is never read from or sent on.
    pub fn build(self) -> Broker {
        let (sender, _receiver) = mpsc::channel(self.max_queue_size.max(1));
        Broker(Arc::new(BrokerState {
            components: DashMap::new(),
            subscribers: DashMap::new(),
            sender: RwLock::new(sender),
            component_tasks: DashMap::new(),
            dispatcher_task: Mutex::new(None),
            running: AtomicBool::new(false),
            auto_discover: self.auto_discover,
            max_queue_size: self.max_queue_size,
        }))
    }
}
