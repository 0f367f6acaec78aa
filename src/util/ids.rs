//! Identifier newtypes.

use std::fmt;

use uuid::Uuid;

/// A component's identity within a [`crate::broker::Broker`].
///
/// Defaults to the component's type name at registration time, but may be
/// overridden explicitly (see [`crate::registry::ComponentRegistration`]).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(String);

impl ComponentId {
    /// Builds a component id from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrows the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ComponentId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ComponentId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Opaque handle identifying a single subscription, returned by
/// [`crate::broker::Broker::subscribe`] so it can later be passed to
/// [`crate::broker::Broker::unsubscribe`].
///
/// Rust closures carry no stable, comparable identity the way Python bound
/// methods do, so subscriptions are tracked by an explicit id instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(Uuid);

impl HandlerId {
    /// Generates a fresh, random handler id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for HandlerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_id_from_str() {
        let id: ComponentId = "sensor".into();
        assert_eq!(id.as_str(), "sensor");
        assert_eq!(id.to_string(), "sensor");
    }

    #[test]
    fn handler_ids_are_unique() {
        let a = HandlerId::new();
        let b = HandlerId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn component_id_equality_is_value_equality() {
        assert_eq!(ComponentId::new("x"), ComponentId::new("x"));
        assert_ne!(ComponentId::new("x"), ComponentId::new("y"));
    }
}
