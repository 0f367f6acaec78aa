//! Convenience re-exports for typical downstream usage.
//!
//! ```
//! use eventry::prelude::*;
//! ```

pub use crate::broker::{Broker, BrokerBuilder, BrokerError, Subscription};
pub use crate::component::{
    Component, ComponentHandle, PublisherComponent, SubscriberComponent, TransceiverComponent,
};
pub use crate::event::{Event, EventType};
pub use crate::registry::{ComponentRegistration, ComponentRegistry, COMPONENT_REGISTRY};
pub use crate::state_machine::{StateMachine, StateMachineBuilder, StateMachineError, StateOutcome};
