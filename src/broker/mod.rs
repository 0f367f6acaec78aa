//! The event bus core: queueing, dispatch, subscriptions, and component
//! lifecycle management.

pub mod core;
pub mod error;
pub mod subscription;

pub use core::{Broker, BrokerBuilder, ComponentInfo};
pub use error::BrokerError;
pub use subscription::Subscription;
