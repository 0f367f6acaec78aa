//! The polled, event-aware state machine.

pub mod machine;
pub mod types;

pub use machine::{StateMachine, StateMachineBuilder};
pub use types::{StateHandler, StateMachineError, StateOutcome};
