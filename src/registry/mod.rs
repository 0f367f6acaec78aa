//! The process-wide declarative component catalogue.
//!
//! Components destined for auto-discovery by a [`crate::broker::Broker`]
//! are described declaratively (a factory, constructor arguments, and an
//! auto-start flag) and appended to [`COMPONENT_REGISTRY`] ahead of time,
//! rather than instantiated directly by user code.

pub mod catalogue;
pub mod registration;

pub use catalogue::{ComponentRegistry, RegistrationSnapshot, COMPONENT_REGISTRY};
pub use registration::{register_multiple, ComponentRegistration, ConstructorKwargs, RegistryError};
