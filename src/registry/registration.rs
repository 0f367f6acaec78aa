//! Declarative [`ComponentRegistration`] records and their builders.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::component::ComponentHandle;
use crate::util::ComponentId;

use super::catalogue::ComponentRegistry;

/// Opaque constructor keyword arguments, passed through to a registration's
/// factory closure unparsed.
pub type ConstructorKwargs = HashMap<String, Value>;

/// A component factory: builds a live [`ComponentHandle`] from constructor
/// kwargs. Stored as an `Arc` so registrations remain `Clone`.
pub type Factory = Arc<dyn Fn(&ConstructorKwargs) -> ComponentHandle + Send + Sync>;

/// Errors raised while manipulating the [`ComponentRegistry`].
#[derive(Debug, Error)]
pub enum RegistryError {
    /// `add_registration` was called with a bucket name other than
    /// `"publishers"`, `"subscribers"`, or `"transceivers"`.
    #[error("Unknown component type: {0}")]
    UnknownBucket(String),
}

/// A declarative record describing how to instantiate a component.
///
/// Built via [`ComponentRegistration::publisher`], [`ComponentRegistration::subscriber`],
/// or [`ComponentRegistration::transceiver`], then registered into a
/// [`ComponentRegistry`] with [`ComponentRegistrationBuilder::register`].
#[derive(Clone)]
pub struct ComponentRegistration {
    pub(crate) type_name: &'static str,
    pub(crate) factory: Factory,
    pub(crate) constructor_kwargs: ConstructorKwargs,
    pub(crate) auto_start: bool,
    pub(crate) component_id: ComponentId,
}

impl fmt::Debug for ComponentRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentRegistration")
            .field("type_name", &self.type_name)
            .field("constructor_kwargs", &self.constructor_kwargs)
            .field("auto_start", &self.auto_start)
            .field("component_id", &self.component_id)
            .finish_non_exhaustive()
    }
}

impl ComponentRegistration {
    /// Starts building a registration destined for the `publishers` bucket.
    pub fn publisher(
        type_name: &'static str,
        factory: impl Fn(&ConstructorKwargs) -> ComponentHandle + Send + Sync + 'static,
    ) -> ComponentRegistrationBuilder {
        ComponentRegistrationBuilder::new("publishers", type_name, factory)
    }

    /// Starts building a registration destined for the `subscribers` bucket.
    pub fn subscriber(
        type_name: &'static str,
        factory: impl Fn(&ConstructorKwargs) -> ComponentHandle + Send + Sync + 'static,
    ) -> ComponentRegistrationBuilder {
        ComponentRegistrationBuilder::new("subscribers", type_name, factory)
    }

    /// Starts building a registration destined for the `transceivers` bucket.
    ///
    /// A transceiver registration always lands in the `transceivers` bucket,
    /// never split across `publishers`/`subscribers` — the bucket is chosen
    /// explicitly at the call site rather than inferred from a capability
    /// check on a live instance.
    pub fn transceiver(
        type_name: &'static str,
        factory: impl Fn(&ConstructorKwargs) -> ComponentHandle + Send + Sync + 'static,
    ) -> ComponentRegistrationBuilder {
        ComponentRegistrationBuilder::new("transceivers", type_name, factory)
    }

    /// The declared type name.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// The id this component will be registered under.
    pub fn component_id(&self) -> &ComponentId {
        &self.component_id
    }

    /// Whether the broker should start this component automatically.
    pub fn auto_start(&self) -> bool {
        self.auto_start
    }

    /// Instantiates the component via the stored factory.
    pub fn instantiate(&self) -> ComponentHandle {
        (self.factory)(&self.constructor_kwargs)
    }
}

/// Fluent builder for a [`ComponentRegistration`], mirroring the style of
/// other builders in this crate (see [`crate::broker::BrokerBuilder`]).
pub struct ComponentRegistrationBuilder {
    bucket: &'static str,
    type_name: &'static str,
    factory: Factory,
    constructor_kwargs: ConstructorKwargs,
    auto_start: bool,
    component_id: Option<String>,
}

impl ComponentRegistrationBuilder {
    fn new(
        bucket: &'static str,
        type_name: &'static str,
        factory: impl Fn(&ConstructorKwargs) -> ComponentHandle + Send + Sync + 'static,
    ) -> Self {
        Self {
            bucket,
            type_name,
            factory: Arc::new(factory),
            constructor_kwargs: ConstructorKwargs::new(),
            auto_start: true,
            component_id: None,
        }
    }

    /// Overrides the constructor keyword arguments (default: empty).
    pub fn kwargs(mut self, kwargs: ConstructorKwargs) -> Self {
        self.constructor_kwargs = kwargs;
        self
    }

    /// Overrides whether the broker starts this component automatically
    /// (default: `true`).
    pub fn auto_start(mut self, auto_start: bool) -> Self {
        self.auto_start = auto_start;
        self
    }

    /// Overrides the component id (default: the declared `type_name`).
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.component_id = Some(id.into());
        self
    }

    fn build(self) -> (&'static str, ComponentRegistration) {
        let component_id = self
            .component_id
            .unwrap_or_else(|| self.type_name.to_string());
        (
            self.bucket,
            ComponentRegistration {
                type_name: self.type_name,
                factory: self.factory,
                constructor_kwargs: self.constructor_kwargs,
                auto_start: self.auto_start,
                component_id: ComponentId::new(component_id),
            },
        )
    }

    /// Finalizes the registration and appends it to `registry`.
    pub fn register(self, registry: &ComponentRegistry) -> Result<(), RegistryError> {
        let (bucket, registration) = self.build();
        registry.add_registration(bucket, registration)
    }
}

/// Registers `instances.len()` copies of a component type in one call.
///
/// Component id for instance `i` is `"<base>_<i>"`, where `<base>` is
/// `id_base` if given, else `type_name`. Instance `i`'s constructor kwargs
/// are `instances[i]`. An empty `instances` slice registers nothing.
#[allow(clippy::too_many_arguments)]
pub fn register_multiple(
    registry: &ComponentRegistry,
    bucket: &'static str,
    type_name: &'static str,
    factory: impl Fn(&ConstructorKwargs) -> ComponentHandle + Send + Sync + 'static,
    instances: &[ConstructorKwargs],
    auto_start: bool,
    id_base: Option<&str>,
) -> Result<(), RegistryError> {
    let factory: Factory = Arc::new(factory);
    let base = id_base.unwrap_or(type_name);
    for (i, kwargs) in instances.iter().enumerate() {
        let registration = ComponentRegistration {
            type_name,
            factory: Arc::clone(&factory),
            constructor_kwargs: kwargs.clone(),
            auto_start,
            component_id: ComponentId::new(format!("{base}_{i}")),
        };
        registry.add_registration(bucket, registration)?;
    }
    Ok(())
}
