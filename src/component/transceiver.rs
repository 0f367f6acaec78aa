//! [`TransceiverComponent`]: publisher and subscriber combined.

use super::publisher::PublisherComponent;
use super::subscriber::SubscriberComponent;

/// A component that is both a [`PublisherComponent`] and a
/// [`SubscriberComponent`], sharing a single [`super::ComponentCore`].
///
/// Blanket-implemented for any type satisfying both capabilities, so a
/// transceiver is declared simply by implementing both traits.
pub trait TransceiverComponent: PublisherComponent + SubscriberComponent {}

impl<T: PublisherComponent + SubscriberComponent> TransceiverComponent for T {}
