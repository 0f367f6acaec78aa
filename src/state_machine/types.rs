//! Shared types for the polled state machine: outcomes, errors, handlers.

use std::sync::Arc;

use futures::future::BoxFuture;
use thiserror::Error;

use crate::event::Event;

/// What a state handler asks the run loop to do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateOutcome {
    /// Transition to the named state. Transitioning to the current state is
    /// treated as "stay and poll again" rather than a no-op self-transition.
    Transition(String),
    /// Remain in the current state and poll again after the configured
    /// interval.
    Stay,
    /// Stop the state machine.
    Stop,
}

/// Errors raised while running a state machine.
#[derive(Debug, Error)]
pub enum StateMachineError {
    /// A state handler returned an error.
    #[error("{0}")]
    Handler(String),
    /// `transition_to` targeted a state with no registered handler.
    #[error("Unknown state: {0}")]
    UnknownState(String),
    /// `transition_to` targeted a state not allowed by the transition map.
    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition {
        /// The state being left.
        from: String,
        /// The state that was rejected.
        to: String,
    },
}

/// A state's polled handler: given the currently pending event (if any),
/// returns what the run loop should do next.
pub type StateHandler = Arc<
    dyn Fn(Option<Event>) -> BoxFuture<'static, Result<StateOutcome, StateMachineError>>
        + Send
        + Sync,
>;

/// A registered state: its handler plus an optional builder-supplied
/// default poll interval.
#[derive(Clone)]
pub(crate) struct StateHandlerSpec {
    pub(crate) handler: StateHandler,
    pub(crate) default_poll_interval: Option<std::time::Duration>,
}

/// A builder-supplied hook invoked whenever `StateMachine::handle_event`
/// receives an event, after `current_event` is set but before the run loop
/// consumes it.
pub type OnEventHook = Arc<dyn Fn(Event) -> BoxFuture<'static, ()> + Send + Sync>;
