//! Broker error types.

use thiserror::Error;

use crate::util::ComponentId;

/// All possible failure modes raised synchronously from broker operations.
///
/// Dispatch-time and lifecycle-time failures (handler errors, startup
/// failures) are not represented here: they are logged and contained rather
/// than surfaced as `Result`s, per this crate's error-handling design.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// `register_component` was called with an id already present in the
    /// component table.
    #[error("{0} already registered")]
    DuplicateComponentId(ComponentId),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_component_id_message() {
        let error = BrokerError::DuplicateComponentId(ComponentId::new("sensor"));
        assert_eq!(error.to_string(), "sensor already registered");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<BrokerError>();
    }
}
