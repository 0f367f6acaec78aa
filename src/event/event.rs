//! [`Event`]: an immutable record flowing through the broker.

use std::collections::HashMap;
use std::sync::OnceLock;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::types::EventType;

/// Process-wide monotonic epoch. The first call to [`Event::new`] anywhere
/// in the process fixes `t = 0`; every later event's `timestamp` is seconds
/// elapsed since that moment. Using a single shared epoch (rather than each
/// `Event` capturing `Instant::now()` directly) is what makes timestamps
/// comparable and non-decreasing across events from the same creator,
/// without ever depending on wall-clock adjustments.
fn epoch() -> Instant {
    static EPOCH: OnceLock<Instant> = OnceLock::new();
    *EPOCH.get_or_init(Instant::now)
}

/// An immutable event flowing through a [`crate::broker::Broker`].
///
/// `timestamp` is monotonic (seconds since the process's first `Event`) and
/// is the only field ordering decisions should ever use. `recorded_at` is a
/// wall-clock stamp carried purely for human-facing log lines.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    event_type: EventType,
    source: String,
    payload: HashMap<String, Value>,
    timestamp: f64,
    recorded_at: DateTime<Utc>,
}

impl Event {
    /// Constructs a new event, stamping it with the current monotonic time
    /// and wall-clock time.
    pub fn new(
        event_type: EventType,
        source: impl Into<String>,
        payload: HashMap<String, Value>,
    ) -> Self {
        Self {
            event_type,
            source: source.into(),
            payload,
            timestamp: epoch().elapsed().as_secs_f64(),
            recorded_at: Utc::now(),
        }
    }

    /// Convenience constructor for events with no payload.
    pub fn bare(event_type: EventType, source: impl Into<String>) -> Self {
        Self::new(event_type, source, HashMap::new())
    }

    /// The event's subscription tag.
    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    /// The identifier of whatever produced this event.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The event's payload map.
    pub fn payload(&self) -> &HashMap<String, Value> {
        &self.payload
    }

    /// Monotonic seconds since the process's first event. Never use
    /// [`Event::recorded_at`] for ordering; only this field is guaranteed
    /// non-decreasing.
    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    /// Wall-clock stamp, informational only.
    pub fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_EVENT: EventType = EventType::new("test_event");

    #[test]
    fn bare_event_has_empty_payload() {
        let evt = Event::bare(TEST_EVENT, "unit-test");
        assert!(evt.payload().is_empty());
        assert_eq!(evt.source(), "unit-test");
        assert_eq!(evt.event_type(), TEST_EVENT);
    }

    #[test]
    fn timestamps_are_monotonic_non_decreasing() {
        let first = Event::bare(TEST_EVENT, "a");
        let second = Event::bare(TEST_EVENT, "b");
        assert!(second.timestamp() >= first.timestamp());
    }

    #[test]
    fn payload_round_trips() {
        let mut payload = HashMap::new();
        payload.insert("key".to_string(), Value::String("value".to_string()));
        let evt = Event::new(TEST_EVENT, "src", payload);
        assert_eq!(
            evt.payload().get("key"),
            Some(&Value::String("value".to_string()))
        );
    }
}
