//! Shared identifier newtypes used across the event bus, registry, and broker.

pub mod ids;

pub use ids::{ComponentId, HandlerId};
