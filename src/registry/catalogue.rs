//! [`ComponentRegistry`]: the process-wide declarative catalogue.

use std::sync::LazyLock;

use parking_lot::Mutex;

use super::registration::{ComponentRegistration, RegistryError};

/// A point-in-time copy of the registry's three buckets.
#[derive(Debug, Clone, Default)]
pub struct RegistrationSnapshot {
    /// Registrations added via [`ComponentRegistration::publisher`].
    pub publishers: Vec<ComponentRegistration>,
    /// Registrations added via [`ComponentRegistration::subscriber`].
    pub subscribers: Vec<ComponentRegistration>,
    /// Registrations added via [`ComponentRegistration::transceiver`].
    pub transceivers: Vec<ComponentRegistration>,
}

/// Process-wide catalogue of declarative component registrations,
/// partitioned into three buckets.
///
/// A single instance is exposed as [`COMPONENT_REGISTRY`]; a
/// [`crate::broker::Broker`] performing auto-discovery reads from that
/// instance at `start()` time. Tests that register fixtures should call
/// [`ComponentRegistry::clear`] in teardown to avoid leaking state across
/// test cases sharing the same process.
#[derive(Debug, Default)]
pub struct ComponentRegistry {
    publishers: Mutex<Vec<ComponentRegistration>>,
    subscribers: Mutex<Vec<ComponentRegistration>>,
    transceivers: Mutex<Vec<ComponentRegistration>>,
}

impl ComponentRegistry {
    /// Builds an empty registry. Most callers want [`COMPONENT_REGISTRY`]
    /// instead; this constructor exists for tests and for embedding a
    /// private registry in a non-default broker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `registration` to the named bucket.
    ///
    /// `bucket` must be one of `"publishers"`, `"subscribers"`, or
    /// `"transceivers"`; any other value is rejected with
    /// [`RegistryError::UnknownBucket`].
    pub fn add_registration(
        &self,
        bucket: &str,
        registration: ComponentRegistration,
    ) -> Result<(), RegistryError> {
        match bucket {
            "publishers" => self.publishers.lock().push(registration),
            "subscribers" => self.subscribers.lock().push(registration),
            "transceivers" => self.transceivers.lock().push(registration),
            other => return Err(RegistryError::UnknownBucket(other.to_string())),
        }
        Ok(())
    }

    /// Returns a snapshot of all three buckets.
    pub fn get_all_registrations(&self) -> RegistrationSnapshot {
        RegistrationSnapshot {
            publishers: self.publishers.lock().clone(),
            subscribers: self.subscribers.lock().clone(),
            transceivers: self.transceivers.lock().clone(),
        }
    }

    /// Empties all three buckets.
    pub fn clear(&self) {
        self.publishers.lock().clear();
        self.subscribers.lock().clear();
        self.transceivers.lock().clear();
    }

    /// Total number of registrations across all buckets.
    pub fn total_count(&self) -> usize {
        self.publishers.lock().len() + self.subscribers.lock().len() + self.transceivers.lock().len()
    }
}

/// The process-wide singleton registry.
///
/// Every call to `ComponentRegistration::*::register(&COMPONENT_REGISTRY)`
/// from anywhere in the process observes the same instance.
pub static COMPONENT_REGISTRY: LazyLock<ComponentRegistry> = LazyLock::new(ComponentRegistry::new);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::component::{ComponentCore, ComponentHandle, PublisherComponent};
    use crate::registry::registration::ConstructorKwargs;
    use std::sync::Arc;

    struct NoopPublisher {
        core: ComponentCore,
    }

    impl crate::component::Component for NoopPublisher {
        fn core(&self) -> &ComponentCore {
            &self.core
        }
    }

    impl PublisherComponent for NoopPublisher {}

    fn make_handle(_: &ConstructorKwargs) -> ComponentHandle {
        ComponentHandle::Publisher(Arc::new(NoopPublisher {
            core: ComponentCore::new("NoopPublisher"),
        }))
    }

    #[test]
    fn clear_empties_all_buckets() {
        let registry = ComponentRegistry::new();
        ComponentRegistration::publisher("P", make_handle)
            .register(&registry)
            .unwrap();
        assert_eq!(registry.total_count(), 1);
        registry.clear();
        assert_eq!(registry.total_count(), 0);
    }

    #[test]
    fn singleton_is_shared_across_accesses() {
        COMPONENT_REGISTRY.clear();
        ComponentRegistration::publisher("SingletonProbe", make_handle)
            .register(&COMPONENT_REGISTRY)
            .unwrap();
        assert!(COMPONENT_REGISTRY.total_count() >= 1);
        COMPONENT_REGISTRY.clear();
    }

    #[test]
    fn total_count_sums_all_buckets() {
        let registry = ComponentRegistry::new();
        ComponentRegistration::publisher("P", make_handle)
            .register(&registry)
            .unwrap();
        ComponentRegistration::subscriber("S", make_handle)
            .register(&registry)
            .unwrap();
        ComponentRegistration::transceiver("T", make_handle)
            .register(&registry)
            .unwrap();
        assert_eq!(registry.total_count(), 3);
    }
}
