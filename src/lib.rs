//! An in-process event bus, component runtime, and polled state-machine
//! engine.
//!
//! Producers ("publishers"), consumers ("subscribers"), and bidirectional
//! components ("transceivers") register against a central [`Broker`], which
//! owns a bounded event queue and fans events out to every subscribed
//! handler. A [`StateMachine`] is a polled, event-aware component with
//! transition validation and consecutive-error recovery.
//!
//! # Example
//!
//! ```
//! use eventry::{Broker, Event, EventType};
//!
//! const PING: EventType = EventType::new("ping");
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let broker = Broker::new();
//!     broker.start().await;
//!     broker.publish(Event::bare(PING, "main")).await;
//!     broker.stop().await;
//! }
//! ```

pub mod broker;
pub mod component;
pub mod event;
pub mod prelude;
pub mod registry;
pub mod state_machine;
pub mod util;

pub use broker::{Broker, BrokerBuilder, BrokerError, ComponentInfo, Subscription};
pub use component::{
    Component, ComponentCore, ComponentError, ComponentHandle, ComponentKind, PublisherComponent,
    SubscriberComponent, TransceiverComponent,
};
pub use event::{Event, EventType};
pub use registry::{
    register_multiple, ComponentRegistration, ComponentRegistry, ConstructorKwargs, RegistryError,
    COMPONENT_REGISTRY,
};
pub use state_machine::{StateHandler, StateMachine, StateMachineBuilder, StateMachineError, StateOutcome};
pub use util::{ComponentId, HandlerId};
